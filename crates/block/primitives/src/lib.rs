//! Core primitive types for content-addressed blocks.
//!
//! This crate provides the value types shared across the block stack,
//! kept separate to avoid circular dependencies between the collaborator
//! traits and the block service.
//!
//! Identifiers are opaque: nothing here computes a hash. Whoever constructs
//! a [`Block`] supplies the [`Cid`] derived from its payload.

#![warn(missing_docs)]

mod block;
mod cid;

pub use block::Block;
pub use cid::Cid;
