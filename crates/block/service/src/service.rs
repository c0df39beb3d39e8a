//! Block service facade.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use tracing::{debug, trace, warn};
use vertex_block_api::{
    BlockGetter, BlockServiceConfig, BlockServiceError, BlockServiceResult, BlockStore,
    BlockStream, CancellationToken, Exchange, Fetcher, WriteMode,
};
use vertex_block_primitives::{Block, Cid};

use crate::{BlockServiceMetrics, DEFAULT_BATCH_BUFFER, Session, retrieval::Retriever};

/// Hybrid block store: local storage with network fallback.
///
/// Stores blocks in a local [`BlockStore`] and retrieves missing ones
/// through an [`Exchange`]. Without an exchange the service runs in local
/// (offline) mode: no network fallback and no announcements.
///
/// The write mode and the exchange binding are fixed at construction.
///
/// # Examples
///
/// ```ignore
/// let service = BlockService::new(store, Some(exchange));
/// service.add_block(&block).await?;
/// let block = service.get_block(&ctx, &cid).await?;
/// ```
pub struct BlockService {
    exchange: Option<Arc<dyn Exchange>>,
    mode: WriteMode,
    retriever: Retriever,
}

impl BlockService {
    /// Create a deduplicating block service.
    pub fn new(store: Arc<dyn BlockStore>, exchange: Option<Arc<dyn Exchange>>) -> Self {
        Self::with_mode(store, exchange, WriteMode::Deduplicate)
    }

    /// Create a block service that guarantees writes go through to the store
    /// and the exchange, never skipped by existence checks.
    pub fn new_write_through(
        store: Arc<dyn BlockStore>,
        exchange: Option<Arc<dyn Exchange>>,
    ) -> Self {
        Self::with_mode(store, exchange, WriteMode::WriteThrough)
    }

    /// Create a block service with an explicit write mode.
    pub fn with_mode(
        store: Arc<dyn BlockStore>,
        exchange: Option<Arc<dyn Exchange>>,
        mode: WriteMode,
    ) -> Self {
        Self::build(store, exchange, mode, DEFAULT_BATCH_BUFFER)
    }

    /// Create a block service from configuration.
    pub fn from_config(
        store: Arc<dyn BlockStore>,
        exchange: Option<Arc<dyn Exchange>>,
        config: &impl BlockServiceConfig,
    ) -> Self {
        Self::build(store, exchange, config.write_mode(), config.batch_buffer())
    }

    fn build(
        store: Arc<dyn BlockStore>,
        exchange: Option<Arc<dyn Exchange>>,
        mode: WriteMode,
        batch_buffer: usize,
    ) -> Self {
        let metrics = BlockServiceMetrics::default();
        if exchange.is_none() {
            warn!("blockservice running in local (offline) mode");
            metrics.inc_offline_instances();
        }

        let fetcher = exchange.clone().map(|e| e as Arc<dyn Fetcher>);
        Self {
            exchange,
            mode,
            retriever: Retriever::new(store, fetcher, metrics, batch_buffer),
        }
    }

    /// Replace the metrics this service and its sessions report into.
    ///
    /// An offline service reports its offline status into `metrics` too.
    pub fn with_metrics(mut self, metrics: BlockServiceMetrics) -> Self {
        if self.exchange.is_none() {
            metrics.inc_offline_instances();
        }
        self.retriever = self.retriever.with_metrics(metrics);
        self
    }

    /// The underlying block store.
    pub fn store(&self) -> &Arc<dyn BlockStore> {
        self.retriever.store()
    }

    /// The underlying exchange, if any.
    pub fn exchange(&self) -> Option<&Arc<dyn Exchange>> {
        self.exchange.as_ref()
    }

    /// The write mode fixed at construction.
    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Metrics this service reports into.
    pub fn metrics(&self) -> &BlockServiceMetrics {
        self.retriever.metrics()
    }

    pub(crate) fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Start a retrieval session. See [`Session::new`].
    pub fn new_session(&self, ctx: &CancellationToken) -> Session {
        Session::new(ctx, self)
    }

    /// Add a block, storing it locally and announcing it to the exchange.
    ///
    /// In deduplicating mode a block already in the store is neither
    /// rewritten nor re-announced. If the exchange has stopped accepting
    /// announcements, fails with [`BlockServiceError::Closed`].
    pub async fn add_block(&self, block: &Block) -> BlockServiceResult<()> {
        let cid = block.cid();
        if self.mode.checks_first() && self.store().has(cid)? {
            trace!(%cid, "Block already stored");
            self.metrics().inc_writes_skipped(1);
            return Ok(());
        }

        self.store().put(block)?;
        self.metrics().inc_blocks_written(1);

        if let Some(exchange) = &self.exchange {
            if let Err(err) = exchange.announce_have(block).await {
                debug!(%cid, %err, "Announcement rejected");
                return Err(BlockServiceError::Closed);
            }
            self.metrics().inc_announces();
        }

        debug!(%cid, "Added block");
        Ok(())
    }

    /// Add several blocks using the store's batch write.
    ///
    /// In deduplicating mode blocks already stored are filtered out first;
    /// any failed existence check aborts the whole batch. Written blocks are
    /// announced one by one in input order, stopping at the first failure.
    pub async fn add_blocks(&self, blocks: &[Block]) -> BlockServiceResult<()> {
        let filtered;
        let to_put: &[Block] = if self.mode.checks_first() {
            let mut absent = Vec::with_capacity(blocks.len());
            for block in blocks {
                if !self.store().has(block.cid())? {
                    absent.push(block.clone());
                }
            }
            filtered = absent;
            &filtered
        } else {
            blocks
        };

        let skipped = blocks.len() - to_put.len();
        if skipped > 0 {
            trace!(skipped, "Blocks already stored");
            self.metrics().inc_writes_skipped(skipped as u64);
        }
        if to_put.is_empty() {
            return Ok(());
        }

        self.store().put_many(to_put)?;
        self.metrics().inc_blocks_written(to_put.len() as u64);

        if let Some(exchange) = &self.exchange {
            for block in to_put {
                if let Err(source) = exchange.announce_have(block).await {
                    // TODO: decide whether a closed exchange should skip the
                    // remaining announcements instead of failing the batch.
                    return Err(BlockServiceError::ClosedWhileAnnouncing {
                        cid: block.cid().clone(),
                        source,
                    });
                }
                self.metrics().inc_announces();
            }
        }

        debug!(count = to_put.len(), "Added blocks");
        Ok(())
    }

    /// Get a block, from the store or, failing that, the exchange.
    pub async fn get_block(
        &self,
        ctx: &CancellationToken,
        cid: &Cid,
    ) -> BlockServiceResult<Block> {
        debug!(%cid, "BlockService get_block");
        self.retriever.get_block(ctx, cid).await
    }

    /// Get many blocks, yielding them as they are found, in no particular
    /// order. Must be called within a Tokio runtime.
    pub fn get_blocks(&self, ctx: &CancellationToken, cids: Vec<Cid>) -> BlockStream {
        self.retriever.get_blocks(ctx, cids)
    }

    /// Delete a block from the local store.
    ///
    /// The exchange is not told; deletion is purely local.
    pub fn delete_block(&self, cid: &Cid) -> BlockServiceResult<()> {
        self.store().delete(cid)?;
        Ok(())
    }

    /// Shut down the exchange. The store is left untouched.
    pub async fn close(&self) -> BlockServiceResult<()> {
        debug!("blockservice is shutting down");
        match &self.exchange {
            Some(exchange) => Ok(exchange.close().await?),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for BlockService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockService")
            .field("mode", &self.mode)
            .field("online", &self.exchange.is_some())
            .field("batch_buffer", &self.retriever.batch_buffer())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl BlockGetter for BlockService {
    async fn get_block(&self, ctx: &CancellationToken, cid: &Cid) -> BlockServiceResult<Block> {
        BlockService::get_block(self, ctx, cid).await
    }

    fn get_blocks(&self, ctx: &CancellationToken, cids: Vec<Cid>) -> BlockStream {
        BlockService::get_blocks(self, ctx, cids)
    }
}
