//! Scriptable exchange.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use futures::{StreamExt, stream};
use parking_lot::{Mutex, RwLock};
use tracing::trace;
use vertex_block_api::{
    CancellationToken, Exchange, ExchangeError, ExchangeResult, Fetcher, RemoteBlocks,
    SessionExchange,
};
use vertex_block_primitives::{Block, Cid};

use crate::{Call, CallLog};

/// State shared between the exchange and the sessions it hands out.
#[derive(Debug, Default)]
struct Shared {
    /// Blocks "held by peers".
    remote: RwLock<HashMap<Cid, Block>>,
    log: CallLog,
    closed: AtomicBool,
    /// Successful announcements left before the exchange reports closed.
    announce_budget: Mutex<Option<usize>>,
    /// Error returned by every fetch, if set.
    fetch_error: Mutex<Option<ExchangeError>>,
    /// Keep batch streams open after the last available block.
    stall: AtomicBool,
    next_session: AtomicU64,
}

impl Shared {
    fn fetch_one(&self, cid: &Cid, session: Option<u64>) -> ExchangeResult<Block> {
        self.log.record(Call::FetchBlock {
            cid: cid.clone(),
            session,
        });
        self.check_fetch()?;
        self.remote
            .read()
            .get(cid)
            .cloned()
            .ok_or_else(|| ExchangeError::NotFound { cid: cid.clone() })
    }

    fn fetch_many(&self, cids: Vec<Cid>, session: Option<u64>) -> ExchangeResult<RemoteBlocks> {
        self.log.record(Call::FetchBlocks {
            cids: cids.clone(),
            session,
        });
        self.check_fetch()?;

        let found: Vec<Block> = {
            let remote = self.remote.read();
            cids.iter().filter_map(|cid| remote.get(cid).cloned()).collect()
        };
        trace!(requested = cids.len(), found = found.len(), "mock batch fetch");

        let blocks = stream::iter(found);
        if self.stall.load(Ordering::SeqCst) {
            Ok(blocks.chain(stream::pending()).boxed())
        } else {
            Ok(blocks.boxed())
        }
    }

    fn check_fetch(&self) -> ExchangeResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ExchangeError::Closed);
        }
        match self.fetch_error.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Mock [`Exchange`] backed by an in-memory set of "remote" blocks.
///
/// Records every call in its [`CallLog`]. Session support is on by default
/// and can be switched off to exercise the fallback path.
#[derive(Debug, Clone)]
pub struct MockExchange {
    shared: Arc<Shared>,
    sessions: bool,
}

impl MockExchange {
    /// Create an exchange with no remote blocks and its own log.
    pub fn new() -> Self {
        Self::with_log(CallLog::new())
    }

    /// Create an exchange recording into `log`.
    pub fn with_log(log: CallLog) -> Self {
        Self {
            shared: Arc::new(Shared {
                log,
                ..Default::default()
            }),
            sessions: true,
        }
    }

    /// Disable the session capability.
    pub fn without_sessions(mut self) -> Self {
        self.sessions = false;
        self
    }

    /// Make `block` retrievable from the network.
    pub fn add_remote(&self, block: Block) {
        self.shared.remote.write().insert(block.cid().clone(), block);
    }

    /// Make every fetch fail with `err`.
    pub fn fail_fetches_with(&self, err: ExchangeError) {
        *self.shared.fetch_error.lock() = Some(err);
    }

    /// Keep batch streams pending after the last available block.
    pub fn stall_batches(&self) {
        self.shared.stall.store(true, Ordering::SeqCst);
    }

    /// Report closed after `n` more successful announcements.
    pub fn close_after_announces(&self, n: usize) {
        *self.shared.announce_budget.lock() = Some(n);
    }

    /// Returns true once closed.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// The log this exchange records into.
    pub fn log(&self) -> &CallLog {
        &self.shared.log
    }
}

impl Default for MockExchange {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for MockExchange {
    async fn get_block(&self, _ctx: &CancellationToken, cid: &Cid) -> ExchangeResult<Block> {
        self.shared.fetch_one(cid, None)
    }

    async fn get_blocks(
        &self,
        _ctx: &CancellationToken,
        cids: Vec<Cid>,
    ) -> ExchangeResult<RemoteBlocks> {
        self.shared.fetch_many(cids, None)
    }
}

#[async_trait]
impl Exchange for MockExchange {
    async fn announce_have(&self, block: &Block) -> ExchangeResult<()> {
        self.shared.log.record(Call::Announce(block.cid().clone()));
        {
            let mut budget = self.shared.announce_budget.lock();
            match budget.as_mut() {
                Some(0) => self.shared.closed.store(true, Ordering::SeqCst),
                Some(left) => *left -= 1,
                None => {}
            }
        }
        if self.is_closed() {
            return Err(ExchangeError::Closed);
        }
        Ok(())
    }

    async fn close(&self) -> ExchangeResult<()> {
        self.shared.log.record(Call::Close);
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return Err(ExchangeError::Closed);
        }
        Ok(())
    }

    fn session_support(&self) -> Option<&dyn SessionExchange> {
        if self.sessions {
            Some(self as &dyn SessionExchange)
        } else {
            None
        }
    }
}

impl SessionExchange for MockExchange {
    fn new_session(&self, _ctx: &CancellationToken) -> Arc<dyn Fetcher> {
        let id = self.shared.next_session.fetch_add(1, Ordering::SeqCst);
        self.shared.log.record(Call::NewSession(id));
        Arc::new(MockSession {
            id,
            shared: Arc::clone(&self.shared),
        })
    }
}

/// Scoped fetcher handed out by [`MockExchange::new_session`].
#[derive(Debug)]
struct MockSession {
    id: u64,
    shared: Arc<Shared>,
}

#[async_trait]
impl Fetcher for MockSession {
    async fn get_block(&self, _ctx: &CancellationToken, cid: &Cid) -> ExchangeResult<Block> {
        self.shared.fetch_one(cid, Some(self.id))
    }

    async fn get_blocks(
        &self,
        _ctx: &CancellationToken,
        cids: Vec<Cid>,
    ) -> ExchangeResult<RemoteBlocks> {
        self.shared.fetch_many(cids, Some(self.id))
    }
}
