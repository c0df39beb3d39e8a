//! Block service metrics.

use metrics::Counter;

/// Block service metrics.
///
/// Handed to a service at construction and inherited by its sessions, so
/// every retrieval path reports into the same counters.
#[derive(Clone, Debug)]
pub struct BlockServiceMetrics {
    /// Lookups answered by the local store
    pub(crate) local_hits_total: Counter,
    /// Lookups the local store could not answer
    pub(crate) local_misses_total: Counter,
    /// Requests sent to the exchange, single or batched
    pub(crate) remote_fetches_total: Counter,
    /// Blocks delivered by the exchange
    pub(crate) remote_blocks_total: Counter,
    /// Blocks written to the local store
    pub(crate) blocks_written_total: Counter,
    /// Writes skipped because the block was already stored
    pub(crate) writes_skipped_total: Counter,
    /// Successful announcements to the exchange
    pub(crate) announces_total: Counter,
    /// Services constructed without an exchange
    pub(crate) offline_instances_total: Counter,
}

impl Default for BlockServiceMetrics {
    fn default() -> Self {
        Self {
            local_hits_total: metrics::counter!("blockservice.local_hits_total"),
            local_misses_total: metrics::counter!("blockservice.local_misses_total"),
            remote_fetches_total: metrics::counter!("blockservice.remote_fetches_total"),
            remote_blocks_total: metrics::counter!("blockservice.remote_blocks_total"),
            blocks_written_total: metrics::counter!("blockservice.blocks_written_total"),
            writes_skipped_total: metrics::counter!("blockservice.writes_skipped_total"),
            announces_total: metrics::counter!("blockservice.announces_total"),
            offline_instances_total: metrics::counter!("blockservice.offline_instances_total"),
        }
    }
}

impl BlockServiceMetrics {
    /// Metrics that record nothing.
    pub fn noop() -> Self {
        Self {
            local_hits_total: Counter::noop(),
            local_misses_total: Counter::noop(),
            remote_fetches_total: Counter::noop(),
            remote_blocks_total: Counter::noop(),
            blocks_written_total: Counter::noop(),
            writes_skipped_total: Counter::noop(),
            announces_total: Counter::noop(),
            offline_instances_total: Counter::noop(),
        }
    }

    pub(crate) fn inc_local_hits(&self) {
        self.local_hits_total.increment(1);
    }

    pub(crate) fn inc_local_misses(&self, n: u64) {
        self.local_misses_total.increment(n);
    }

    pub(crate) fn inc_remote_fetches(&self) {
        self.remote_fetches_total.increment(1);
    }

    pub(crate) fn inc_remote_blocks(&self) {
        self.remote_blocks_total.increment(1);
    }

    pub(crate) fn inc_blocks_written(&self, n: u64) {
        self.blocks_written_total.increment(n);
    }

    pub(crate) fn inc_writes_skipped(&self, n: u64) {
        self.writes_skipped_total.increment(n);
    }

    pub(crate) fn inc_announces(&self) {
        self.announces_total.increment(1);
    }

    pub(crate) fn inc_offline_instances(&self) {
        self.offline_instances_total.increment(1);
    }
}
