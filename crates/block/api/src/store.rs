//! Local block storage.

use crate::BlockStoreResult;
use vertex_block_primitives::{Block, Cid};

/// Local content-addressed block storage.
///
/// This is the local persistence layer, separate from network operations.
/// Calls are synchronous and may block on disk I/O. Implementations must be
/// safe to share between concurrent callers; the block service adds no
/// locking of its own.
#[auto_impl::auto_impl(&, Box, Arc)]
pub trait BlockStore: Send + Sync {
    /// Check whether a block is stored.
    fn has(&self, cid: &Cid) -> BlockStoreResult<bool>;

    /// Get a stored block.
    ///
    /// Returns [`BlockStoreError::NotFound`](crate::BlockStoreError::NotFound)
    /// if the block is not stored.
    fn get(&self, cid: &Cid) -> BlockStoreResult<Block>;

    /// Store a block.
    ///
    /// Storing a block that is already present may be a silent no-op.
    fn put(&self, block: &Block) -> BlockStoreResult<()>;

    /// Store several blocks, batching where the backend allows it.
    fn put_many(&self, blocks: &[Block]) -> BlockStoreResult<()>;

    /// Remove a block.
    fn delete(&self, cid: &Cid) -> BlockStoreResult<()>;
}
