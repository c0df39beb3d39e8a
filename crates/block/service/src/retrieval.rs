//! Block retrieval shared by the block service and its sessions.
//!
//! Lookups always try the local store first and fall back to the bound
//! fetcher only on a miss. Batch lookups run on a spawned task that feeds a
//! bounded queue: local hits are emitted in request order while probing,
//! then all misses go to the fetcher in a single request whose deliveries
//! are relayed as they arrive.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{Instrument, debug, trace};
use vertex_block_api::{
    BlockServiceError, BlockServiceResult, BlockStore, BlockStoreError, BlockStream,
    CancellationToken, ExchangeError, Fetcher,
};
use vertex_block_primitives::{Block, Cid};

use crate::BlockServiceMetrics;

/// A store and an optional fetcher, bound together for lookups.
#[derive(Clone)]
pub(crate) struct Retriever {
    store: Arc<dyn BlockStore>,
    fetcher: Option<Arc<dyn Fetcher>>,
    metrics: BlockServiceMetrics,
    batch_buffer: usize,
}

impl Retriever {
    pub(crate) fn new(
        store: Arc<dyn BlockStore>,
        fetcher: Option<Arc<dyn Fetcher>>,
        metrics: BlockServiceMetrics,
        batch_buffer: usize,
    ) -> Self {
        Self {
            store,
            fetcher,
            metrics,
            batch_buffer: batch_buffer.max(1),
        }
    }

    /// Same store, metrics and buffering with a different fetcher.
    pub(crate) fn with_fetcher(&self, fetcher: Option<Arc<dyn Fetcher>>) -> Self {
        Self {
            fetcher,
            ..self.clone()
        }
    }

    pub(crate) fn with_metrics(self, metrics: BlockServiceMetrics) -> Self {
        Self { metrics, ..self }
    }

    pub(crate) fn store(&self) -> &Arc<dyn BlockStore> {
        &self.store
    }

    pub(crate) fn metrics(&self) -> &BlockServiceMetrics {
        &self.metrics
    }

    pub(crate) fn batch_buffer(&self) -> usize {
        self.batch_buffer
    }

    pub(crate) fn has_fetcher(&self) -> bool {
        self.fetcher.is_some()
    }

    /// Look up one block, locally first, then through the fetcher.
    pub(crate) async fn get_block(
        &self,
        ctx: &CancellationToken,
        cid: &Cid,
    ) -> BlockServiceResult<Block> {
        match self.store.get(cid) {
            Ok(block) => {
                self.metrics.inc_local_hits();
                return Ok(block);
            }
            Err(BlockStoreError::NotFound { .. }) => self.metrics.inc_local_misses(1),
            Err(err) => return Err(err.into()),
        }

        let Some(fetcher) = self.fetcher.as_ref() else {
            debug!(%cid, "Block not found locally, no exchange bound");
            return Err(BlockServiceError::NotFound { cid: cid.clone() });
        };

        debug!(%cid, "Searching exchange");
        self.metrics.inc_remote_fetches();
        let fetched = tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(ExchangeError::Cancelled),
            res = fetcher.get_block(ctx, cid) => res,
        };

        match fetched {
            Ok(block) => {
                self.metrics.inc_remote_blocks();
                Ok(block)
            }
            Err(ExchangeError::NotFound { .. }) => {
                debug!(%cid, "Block not found in exchange");
                Err(BlockServiceError::NotFound { cid: cid.clone() })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Look up many blocks, yielding them as they are found.
    ///
    /// Must be called within a Tokio runtime.
    pub(crate) fn get_blocks(&self, ctx: &CancellationToken, cids: Vec<Cid>) -> BlockStream {
        let (tx, rx) = mpsc::channel(self.batch_buffer);
        let ctx = ctx.clone();
        tokio::spawn(
            self.clone()
                .produce(ctx.clone(), cids, tx)
                .in_current_span(),
        );
        BlockStream::new(rx, ctx)
    }

    async fn produce(self, ctx: CancellationToken, cids: Vec<Cid>, tx: mpsc::Sender<Block>) {
        let requested = cids.len();
        let mut misses = Vec::new();

        for cid in cids {
            if ctx.is_cancelled() {
                return;
            }
            match self.store.get(&cid) {
                Ok(block) => {
                    trace!(%cid, "Got block from store");
                    self.metrics.inc_local_hits();
                    if !emit(&ctx, &tx, block).await {
                        return;
                    }
                }
                Err(BlockStoreError::NotFound { .. }) => misses.push(cid),
                Err(err) => {
                    debug!(%cid, %err, "Store lookup failed, treating as miss");
                    misses.push(cid);
                }
            }
        }

        if misses.is_empty() {
            trace!(requested, "All blocks found locally");
            return;
        }
        self.metrics.inc_local_misses(misses.len() as u64);

        let Some(fetcher) = self.fetcher.as_ref() else {
            debug!(requested, misses = misses.len(), "No exchange bound, batch ends short");
            return;
        };

        debug!(requested, misses = misses.len(), "Requesting missing blocks from exchange");
        self.metrics.inc_remote_fetches();
        let remote = tokio::select! {
            biased;
            _ = ctx.cancelled() => return,
            res = fetcher.get_blocks(&ctx, misses) => res,
        };
        let mut remote = match remote {
            Ok(remote) => remote,
            Err(err) => {
                debug!(%err, "Batch fetch failed");
                return;
            }
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = ctx.cancelled() => return,
                next = remote.next() => next,
            };
            let Some(block) = next else {
                return;
            };
            self.metrics.inc_remote_blocks();
            if !emit(&ctx, &tx, block).await {
                return;
            }
        }
    }
}

/// Hand a block to the consumer. Returns false once the batch must stop,
/// either because `ctx` was cancelled or the consumer went away.
async fn emit(ctx: &CancellationToken, tx: &mpsc::Sender<Block>, block: Block) -> bool {
    tokio::select! {
        biased;
        _ = ctx.cancelled() => false,
        res = tx.send(block) => res.is_ok(),
    }
}
