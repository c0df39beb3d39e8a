//! Read surface shared by the block service and its sessions.

use tokio_util::sync::CancellationToken;
use vertex_block_primitives::{Block, Cid};

use crate::{BlockServiceResult, BlockStream};

/// Retrieves blocks from local storage, falling back to the network.
#[async_trait::async_trait]
pub trait BlockGetter: Send + Sync {
    /// Get the requested block.
    ///
    /// A miss in every consulted tier is reported as
    /// [`BlockServiceError::NotFound`](crate::BlockServiceError::NotFound).
    async fn get_block(&self, ctx: &CancellationToken, cid: &Cid) -> BlockServiceResult<Block>;

    /// Batch request for the given identifiers, yielding blocks as they are
    /// found, in no particular order.
    ///
    /// The stream may end before every block is delivered (some blocks may
    /// be unavailable, or `ctx` may be cancelled). It is up to the consumer
    /// to track which blocks it received.
    fn get_blocks(&self, ctx: &CancellationToken, cids: Vec<Cid>) -> BlockStream;
}
