//! In-memory block store.

use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicBool, Ordering},
};

use parking_lot::RwLock;
use vertex_block_api::{BlockStore, BlockStoreError, BlockStoreResult};
use vertex_block_primitives::{Block, Cid};

use crate::{Call, CallLog};

/// Simple in-memory block store.
///
/// Every trait call is recorded in the attached [`CallLog`]. Seeding through
/// [`insert`](Self::insert) and inspecting through [`contains`](Self::contains)
/// bypass the log. Putting a block that is already present is a silent
/// no-op, like most content-addressed backends.
#[derive(Debug, Default)]
pub struct MemoryBlockStore {
    blocks: RwLock<HashMap<Cid, Block>>,
    failing: RwLock<HashSet<Cid>>,
    failing_writes: AtomicBool,
    log: CallLog,
}

impl MemoryBlockStore {
    /// Create a new empty store with its own log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty store recording into `log`.
    pub fn with_log(log: CallLog) -> Self {
        Self {
            log,
            ..Default::default()
        }
    }

    /// Create a store pre-populated with `blocks`.
    pub fn with_blocks(log: CallLog, blocks: impl IntoIterator<Item = Block>) -> Self {
        let store = Self::with_log(log);
        for block in blocks {
            store.insert(block);
        }
        store
    }

    /// Seed a block without recording a call.
    pub fn insert(&self, block: Block) {
        self.blocks.write().insert(block.cid().clone(), block);
    }

    /// Check for a block without recording a call.
    pub fn contains(&self, cid: &Cid) -> bool {
        self.blocks.read().contains_key(cid)
    }

    /// Number of stored blocks.
    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every `has` and `get` for `cid` fail with a backend error.
    pub fn fail_on(&self, cid: Cid) {
        self.failing.write().insert(cid);
    }

    /// Make every `put` and `put_many` fail with a backend error.
    pub fn fail_writes(&self) {
        self.failing_writes.store(true, Ordering::SeqCst);
    }

    /// The log this store records into.
    pub fn log(&self) -> &CallLog {
        &self.log
    }

    fn check_failing(&self, cid: &Cid) -> BlockStoreResult<()> {
        if self.failing.read().contains(cid) {
            return Err(BlockStoreError::Backend {
                message: format!("injected failure for {cid}"),
            });
        }
        Ok(())
    }

    fn check_writes(&self) -> BlockStoreResult<()> {
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(BlockStoreError::Backend {
                message: "injected write failure".into(),
            });
        }
        Ok(())
    }
}

impl BlockStore for MemoryBlockStore {
    fn has(&self, cid: &Cid) -> BlockStoreResult<bool> {
        self.log.record(Call::Has(cid.clone()));
        self.check_failing(cid)?;
        Ok(self.contains(cid))
    }

    fn get(&self, cid: &Cid) -> BlockStoreResult<Block> {
        self.log.record(Call::Get(cid.clone()));
        self.check_failing(cid)?;
        self.blocks
            .read()
            .get(cid)
            .cloned()
            .ok_or_else(|| BlockStoreError::NotFound { cid: cid.clone() })
    }

    fn put(&self, block: &Block) -> BlockStoreResult<()> {
        self.log.record(Call::Put(block.cid().clone()));
        self.check_writes()?;
        self.blocks
            .write()
            .entry(block.cid().clone())
            .or_insert_with(|| block.clone());
        Ok(())
    }

    fn put_many(&self, blocks: &[Block]) -> BlockStoreResult<()> {
        self.log
            .record(Call::PutMany(blocks.iter().map(|b| b.cid().clone()).collect()));
        self.check_writes()?;
        let mut stored = self.blocks.write();
        for block in blocks {
            stored
                .entry(block.cid().clone())
                .or_insert_with(|| block.clone());
        }
        Ok(())
    }

    fn delete(&self, cid: &Cid) -> BlockStoreResult<()> {
        self.log.record(Call::Delete(cid.clone()));
        self.blocks.write().remove(cid);
        Ok(())
    }
}
