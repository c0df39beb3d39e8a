//! Ordered call recording.

use std::sync::Arc;

use parking_lot::Mutex;
use vertex_block_primitives::Cid;

/// A collaborator call observed by a mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `BlockStore::has`.
    Has(Cid),
    /// `BlockStore::get`.
    Get(Cid),
    /// `BlockStore::put`.
    Put(Cid),
    /// `BlockStore::put_many`.
    PutMany(Vec<Cid>),
    /// `BlockStore::delete`.
    Delete(Cid),
    /// `Fetcher::get_block`, with the session id when made through a session.
    FetchBlock {
        /// Requested identifier.
        cid: Cid,
        /// Session the request went through, if any.
        session: Option<u64>,
    },
    /// `Fetcher::get_blocks`, with the session id when made through a session.
    FetchBlocks {
        /// Requested identifiers.
        cids: Vec<Cid>,
        /// Session the request went through, if any.
        session: Option<u64>,
    },
    /// `Exchange::announce_have`.
    Announce(Cid),
    /// `Exchange::close`.
    Close,
    /// `SessionExchange::new_session`, with the id of the new session.
    NewSession(u64),
}

impl Call {
    /// Returns true for network fetches, single or batched.
    pub fn is_fetch(&self) -> bool {
        matches!(self, Call::FetchBlock { .. } | Call::FetchBlocks { .. })
    }

    /// Returns true for store writes, single or batched.
    pub fn is_write(&self) -> bool {
        matches!(self, Call::Put(_) | Call::PutMany(_))
    }

    /// Returns true for announcements.
    pub fn is_announce(&self) -> bool {
        matches!(self, Call::Announce(_))
    }
}

/// Shared, ordered log of [`Call`]s.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl CallLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a call.
    pub fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    /// Snapshot of all calls so far.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Number of calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|&c| pred(c)).count()
    }

    /// Index of the first call equal to `call`.
    pub fn position(&self, call: &Call) -> Option<usize> {
        self.calls.lock().iter().position(|c| c == call)
    }

    /// Index of the first call matching `pred`.
    pub fn position_where(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.calls.lock().iter().position(pred)
    }

    /// Identifiers announced so far, in order.
    pub fn announced(&self) -> Vec<Cid> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Announce(cid) => Some(cid.clone()),
                _ => None,
            })
            .collect()
    }

    /// Forget all recorded calls.
    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}
