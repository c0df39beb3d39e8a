//! Error types for block operations.
//!
//! One error type per tier: [`BlockStoreError`] for local persistence,
//! [`ExchangeError`] for the network, and [`BlockServiceError`] for what the
//! service hands back to callers. Each variant carries typed data so callers
//! can match on the failure rather than parse messages.

use std::string::String;
use vertex_block_primitives::Cid;

/// Error type for local block store operations.
#[derive(Debug, thiserror::Error)]
pub enum BlockStoreError {
    /// The block is not in the store.
    #[error("block not found in store: {cid}")]
    NotFound {
        /// Identifier that was looked up.
        cid: Cid,
    },

    /// The storage backend failed.
    #[error("store backend error: {message}")]
    Backend {
        /// Description of the backend failure.
        message: String,
    },

    /// IO error.
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for block store operations.
pub type BlockStoreResult<T> = core::result::Result<T, BlockStoreError>;

/// Error type for exchange operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    /// No peer could supply the block.
    #[error("block not found in exchange: {cid}")]
    NotFound {
        /// Identifier that was requested.
        cid: Cid,
    },

    /// The exchange has shut down and no longer accepts requests.
    #[error("exchange is closed")]
    Closed,

    /// The request was cancelled by the caller.
    #[error("request cancelled")]
    Cancelled,

    /// Network or protocol failure.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },
}

/// Result type for exchange operations.
pub type ExchangeResult<T> = core::result::Result<T, ExchangeError>;

/// Error type returned by the block service and its sessions.
#[derive(Debug, thiserror::Error)]
pub enum BlockServiceError {
    /// Neither the store nor the exchange (when consulted) has the block.
    ///
    /// Raised identically whichever tier reported the miss.
    #[error("blockservice: key not found: {cid}")]
    NotFound {
        /// Identifier that was looked up.
        cid: Cid,
    },

    /// The local store failed with something other than a miss.
    #[error(transparent)]
    Store(#[from] BlockStoreError),

    /// The fetcher failed with something other than a miss.
    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    /// A single-block announcement hit an exchange that is no longer running.
    #[error("blockservice is closed")]
    Closed,

    /// A batch announcement hit an exchange that is no longer running.
    ///
    /// Blocks before `cid` were announced; `cid` and everything after it
    /// were written to the store but not announced.
    #[error("blockservice is closed ({source})")]
    ClosedWhileAnnouncing {
        /// First block whose announcement failed.
        cid: Cid,
        /// Announcement failure reported by the exchange.
        #[source]
        source: ExchangeError,
    },
}

impl BlockServiceError {
    /// Returns true for the uniform not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if the write path found the exchange shut down.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed | Self::ClosedWhileAnnouncing { .. })
    }
}

/// Result type for block service operations.
pub type BlockServiceResult<T> = core::result::Result<T, BlockServiceError>;
