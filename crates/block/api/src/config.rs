//! Block service configuration.

/// Write policy of a block service, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, strum::Display, strum::EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[strum(serialize_all = "kebab-case")]
pub enum WriteMode {
    /// Check the store first and skip blocks already present.
    ///
    /// Avoids rewriting and re-announcing blocks the node already has.
    #[default]
    Deduplicate,

    /// Always write and always announce.
    ///
    /// Guarantees the exchange hears about every block even when the store
    /// silently ignores duplicate writes.
    WriteThrough,
}

impl WriteMode {
    /// Returns true if writes check the store for existing blocks first.
    pub fn checks_first(&self) -> bool {
        matches!(self, WriteMode::Deduplicate)
    }
}

/// Configuration for a block service.
pub trait BlockServiceConfig {
    /// Write policy.
    fn write_mode(&self) -> WriteMode;

    /// Capacity of the queue between a batch retrieval and its consumer.
    fn batch_buffer(&self) -> usize;
}
