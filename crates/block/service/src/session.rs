//! Retrieval sessions.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use vertex_block_api::{BlockGetter, BlockServiceResult, BlockStream, CancellationToken, Fetcher};
use vertex_block_primitives::{Block, Cid};

use crate::{BlockService, retrieval::Retriever};

/// Read-only retrieval scope over a [`BlockService`].
///
/// Binds the service's store and one fetcher for the session's lifetime.
/// When the exchange supports scoped sessions, all requests share one
/// exchange-side session, cutting want-list negotiation overhead; otherwise
/// the exchange itself is used. Sessions cannot write.
#[derive(Clone)]
pub struct Session {
    retriever: Retriever,
}

impl Session {
    /// Create a session over `service`.
    pub fn new(ctx: &CancellationToken, service: &BlockService) -> Self {
        let fetcher: Option<Arc<dyn Fetcher>> = service.exchange().map(|exchange| {
            match exchange.session_support() {
                Some(sessions) => {
                    debug!("Starting exchange session");
                    sessions.new_session(ctx)
                }
                None => {
                    debug!("Exchange has no session support, using it directly");
                    Arc::clone(exchange) as Arc<dyn Fetcher>
                }
            }
        });

        Self {
            retriever: service.retriever().with_fetcher(fetcher),
        }
    }

    /// Returns true if the session can fall back to the network.
    pub fn is_online(&self) -> bool {
        self.retriever.has_fetcher()
    }

    /// Get a block in the context of this session.
    pub async fn get_block(
        &self,
        ctx: &CancellationToken,
        cid: &Cid,
    ) -> BlockServiceResult<Block> {
        self.retriever.get_block(ctx, cid).await
    }

    /// Get many blocks in the context of this session.
    pub fn get_blocks(&self, ctx: &CancellationToken, cids: Vec<Cid>) -> BlockStream {
        self.retriever.get_blocks(ctx, cids)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("online", &self.is_online())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl BlockGetter for Session {
    async fn get_block(&self, ctx: &CancellationToken, cid: &Cid) -> BlockServiceResult<Block> {
        Session::get_block(self, ctx, cid).await
    }

    fn get_blocks(&self, ctx: &CancellationToken, cids: Vec<Cid>) -> BlockStream {
        Session::get_blocks(self, ctx, cids)
    }
}
