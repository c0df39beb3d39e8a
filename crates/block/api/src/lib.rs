//! Block API - abstractions around the block service.
//!
//! This crate defines the contracts between the block service and its two
//! external collaborators, plus the surface the service exposes to
//! applications. Implementations (persistent stores, peer-to-peer exchanges)
//! live elsewhere.
//!
//! # Core Concepts
//!
//! - [`BlockStore`] - Local content-addressed persistence
//! - [`Fetcher`] - Read-only network retrieval (one block or a batch)
//! - [`Exchange`] - Fetcher plus announcements and shutdown
//! - [`SessionExchange`] - Optional capability to derive a scoped fetcher
//! - [`BlockGetter`] - Read surface shared by the service and its sessions
//! - [`BlockStream`] - Lazy, cancellable batch retrieval output
//!
//! # Design Principles
//!
//! - The store is synchronous, the exchange is asynchronous
//! - Capabilities are queried through the trait, never by downcasting
//! - Misses are typed errors for single lookups and silent for batches

#![warn(missing_docs)]

mod config;
mod error;
mod exchange;
mod getter;
mod store;
mod stream;

pub use config::*;
pub use error::*;
pub use exchange::*;
pub use getter::*;
pub use store::*;
pub use stream::*;

// Re-export block types and the cancellation context for convenience
pub use tokio_util::sync::CancellationToken;
pub use vertex_block_primitives::{Block, Cid};
