//! Immutable content-addressed block.

use bytes::Bytes;

use crate::Cid;

/// An immutable byte payload together with its content identifier.
///
/// Block identity is the identifier: two blocks with equal [`Cid`]s are the
/// same block. Cloning is cheap, the payload is reference counted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Block {
    cid: Cid,
    data: Bytes,
}

impl Block {
    /// Create a block from an identifier and the payload it was derived from.
    pub fn new(cid: Cid, data: impl Into<Bytes>) -> Self {
        Self {
            cid,
            data: data.into(),
        }
    }

    /// The block's content identifier.
    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    /// The block payload.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Split into identifier and payload.
    pub fn into_parts(self) -> (Cid, Bytes) {
        (self.cid, self.data)
    }
}
