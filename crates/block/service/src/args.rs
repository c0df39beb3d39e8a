//! Block service CLI arguments.

use clap::Args;
use serde::{Deserialize, Serialize};
use vertex_block_api::{BlockServiceConfig, WriteMode};

/// Default capacity of the queue between a batch retrieval and its consumer.
pub const DEFAULT_BATCH_BUFFER: usize = 16;

/// Block service configuration arguments.
#[derive(Debug, Args, Clone, Serialize, Deserialize)]
#[command(next_help_heading = "Block Service")]
#[serde(default)]
pub struct BlockServiceArgs {
    /// Always write and announce blocks, even ones already stored.
    #[arg(long = "blockservice.write-through")]
    pub write_through: bool,

    /// Blocks buffered between a batch retrieval and its consumer.
    #[arg(long = "blockservice.batch-buffer", default_value_t = DEFAULT_BATCH_BUFFER)]
    pub batch_buffer: usize,
}

impl Default for BlockServiceArgs {
    fn default() -> Self {
        Self {
            write_through: false,
            batch_buffer: DEFAULT_BATCH_BUFFER,
        }
    }
}

impl BlockServiceConfig for BlockServiceArgs {
    fn write_mode(&self) -> WriteMode {
        if self.write_through {
            WriteMode::WriteThrough
        } else {
            WriteMode::Deduplicate
        }
    }

    fn batch_buffer(&self) -> usize {
        self.batch_buffer.max(1)
    }
}
