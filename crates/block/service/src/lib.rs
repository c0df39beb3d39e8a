//! Block service - a single get/put surface over local storage and the
//! network.
//!
//! [`BlockService`] stores blocks in a local [`BlockStore`] and falls back to
//! an [`Exchange`] for blocks it does not have. New blocks are announced to
//! the exchange so peers learn this node holds them. A [`Session`] reuses one
//! exchange-side retrieval context across many reads.
//!
//! # Write modes
//!
//! - [`WriteMode::Deduplicate`] - skip blocks already stored (default)
//! - [`WriteMode::WriteThrough`] - always write and announce
//!
//! # Retrieval
//!
//! Single lookups return [`BlockServiceError::NotFound`] when no consulted
//! tier has the block. Batch lookups return a [`BlockStream`] that omits
//! blocks it could not find rather than failing.
//!
//! [`BlockStore`]: vertex_block_api::BlockStore
//! [`Exchange`]: vertex_block_api::Exchange
//! [`WriteMode::Deduplicate`]: vertex_block_api::WriteMode::Deduplicate
//! [`WriteMode::WriteThrough`]: vertex_block_api::WriteMode::WriteThrough
//! [`BlockServiceError::NotFound`]: vertex_block_api::BlockServiceError::NotFound
//! [`BlockStream`]: vertex_block_api::BlockStream

#![warn(missing_docs)]

mod args;
mod metrics;
mod retrieval;
mod service;
mod session;

pub use args::{BlockServiceArgs, DEFAULT_BATCH_BUFFER};
pub use metrics::BlockServiceMetrics;
pub use service::BlockService;
pub use session::Session;
