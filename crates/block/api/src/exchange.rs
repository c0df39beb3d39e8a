//! Network-facing block exchange.

use std::sync::Arc;

use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;
use vertex_block_primitives::{Block, Cid};

use crate::ExchangeResult;

/// Blocks delivered by a batch network request, in arrival order.
pub type RemoteBlocks = BoxStream<'static, Block>;

/// Read-only network retrieval.
///
/// The subset of exchange behaviour needed by the read path. Both a full
/// [`Exchange`] and a scoped session fetcher implement it.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a single block from the network.
    ///
    /// Returns [`ExchangeError::NotFound`](crate::ExchangeError::NotFound)
    /// when no peer can supply it.
    async fn get_block(&self, ctx: &CancellationToken, cid: &Cid) -> ExchangeResult<Block>;

    /// Request several blocks at once.
    ///
    /// The returned stream yields blocks as peers deliver them, in no
    /// particular order, and ends when the exchange gives up on the rest or
    /// `ctx` is cancelled. Blocks that never arrive are simply not yielded.
    async fn get_blocks(
        &self,
        ctx: &CancellationToken,
        cids: Vec<Cid>,
    ) -> ExchangeResult<RemoteBlocks>;
}

/// Network fetcher and announcer, e.g. a peer-to-peer block trading protocol.
#[async_trait::async_trait]
pub trait Exchange: Fetcher {
    /// Tell peers this node now has `block`.
    ///
    /// Fails with [`ExchangeError::Closed`](crate::ExchangeError::Closed)
    /// once the exchange has shut down.
    async fn announce_have(&self, block: &Block) -> ExchangeResult<()>;

    /// Shut the exchange down.
    async fn close(&self) -> ExchangeResult<()>;

    /// Session capability, if this exchange supports scoped sessions.
    ///
    /// Returns `None` by default; the session then falls back to using the
    /// exchange itself as its fetcher.
    fn session_support(&self) -> Option<&dyn SessionExchange> {
        None
    }
}

/// Capability to derive a scoped fetcher.
///
/// A scoped fetcher reuses negotiated state (want-lists, peer selection)
/// across the requests made through it, lowering per-request overhead.
pub trait SessionExchange: Send + Sync {
    /// Start a retrieval session bound to `ctx`.
    fn new_session(&self, ctx: &CancellationToken) -> Arc<dyn Fetcher>;
}
