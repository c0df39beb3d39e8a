//! Test utilities and mocks for the block service.
//!
//! - [`MemoryBlockStore`] - in-memory [`BlockStore`](vertex_block_api::BlockStore)
//! - [`MockExchange`] - scriptable [`Exchange`](vertex_block_api::Exchange)
//! - [`CallLog`] - ordered record of every collaborator call, shareable
//!   between a store and an exchange so tests can assert cross-tier ordering
//! - [`test_block`] - deterministic block fixtures

mod exchange;
mod log;
mod store;

pub use exchange::MockExchange;
pub use log::{Call, CallLog};
pub use store::MemoryBlockStore;

use alloy_primitives::keccak256;
use vertex_block_primitives::{Block, Cid};

/// Build a block from a payload, identified by the payload's keccak256.
pub fn block_from(data: impl AsRef<[u8]>) -> Block {
    let data = data.as_ref();
    Block::new(Cid::from_slice(keccak256(data).as_slice()), data.to_vec())
}

/// Deterministic test block number `n`.
pub fn test_block(n: u8) -> Block {
    block_from(format!("test block {n}"))
}

/// Deterministic test blocks for each number in `ns`.
pub fn test_blocks(ns: impl IntoIterator<Item = u8>) -> Vec<Block> {
    ns.into_iter().map(test_block).collect()
}

/// Identifiers of `blocks`, in order.
pub fn cids_of(blocks: &[Block]) -> Vec<Cid> {
    blocks.iter().map(|b| b.cid().clone()).collect()
}
