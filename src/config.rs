//! Engine configuration.
//!
//! A single `serde`-deserializable struct rather than a global/singleton —
//! construction is always explicit, matching the teacher's pattern of
//! passing configuration into constructors instead of reading ambient
//! state. Defaults mirror the Environment table of the specification this
//! crate implements.

use crate::types::StpPolicy;
use serde::Deserialize;
use std::path::PathBuf;

fn default_shard_count() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DurabilityModeConfig {
    Async,
    SyncCritical,
    ZeroLoss,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_shard_count")]
    pub num_trading_shards: u32,

    #[serde(default = "default_shard_count")]
    pub num_matching_shards: u32,

    pub durability_mode: DurabilityModeConfig,

    #[serde(default)]
    pub critical_quantity_threshold: i64,

    #[serde(default)]
    pub critical_price_threshold: i64,

    pub wal_dir: PathBuf,

    #[serde(default = "default_sync_interval_ms")]
    pub sync_interval_ms: u32,

    #[serde(default = "default_sync_batch_size")]
    pub sync_batch_size: u32,

    #[serde(default = "default_wal_queue_capacity")]
    pub wal_queue_capacity: u32,

    #[serde(default)]
    pub stp_policy: StpPolicy,

    #[serde(default = "default_max_match_iterations")]
    pub max_match_iterations: u32,
}

fn default_sync_interval_ms() -> u32 {
    50
}
fn default_sync_batch_size() -> u32 {
    5000
}
fn default_wal_queue_capacity() -> u32 {
    65536
}
fn default_max_match_iterations() -> u32 {
    10_000
}

impl EngineConfig {
    /// Convenience constructor for call sites that build a config directly
    /// in code rather than deserializing one — `serde`'s per-field
    /// `#[serde(default = ...)]` attributes only kick in when deserializing,
    /// so a plain struct literal would have to repeat every default itself.
    pub fn new(wal_dir: impl Into<PathBuf>, durability_mode: DurabilityModeConfig, stp_policy: StpPolicy) -> Self {
        Self {
            num_trading_shards: default_shard_count(),
            num_matching_shards: default_shard_count(),
            durability_mode,
            critical_quantity_threshold: 0,
            critical_price_threshold: 0,
            wal_dir: wal_dir.into(),
            sync_interval_ms: default_sync_interval_ms(),
            sync_batch_size: default_sync_batch_size(),
            wal_queue_capacity: default_wal_queue_capacity(),
            stp_policy,
            max_match_iterations: default_max_match_iterations(),
        }
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.wal_queue_capacity.is_power_of_two() {
            return Err("wal_queue_capacity must be a power of two");
        }
        if self.num_trading_shards == 0 || self.num_matching_shards == 0 {
            return Err("shard counts must be non-zero");
        }
        if self.max_match_iterations == 0 {
            return Err("max_match_iterations must be non-zero");
        }
        Ok(())
    }

    /// Converts the deserializable durability-mode tag plus its threshold
    /// fields into the runtime `wal::DurabilityMode` the WAL actually uses.
    pub fn durability_mode(&self) -> crate::wal::DurabilityMode {
        match self.durability_mode {
            DurabilityModeConfig::Async => crate::wal::DurabilityMode::AsyncBatched,
            DurabilityModeConfig::ZeroLoss => crate::wal::DurabilityMode::ZeroLoss,
            DurabilityModeConfig::SyncCritical => crate::wal::DurabilityMode::SyncCritical {
                qty_threshold: self.critical_quantity_threshold,
                price_threshold: self.critical_price_threshold,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_constructor_produces_a_valid_config() {
        let config = EngineConfig::new("/tmp/wal", DurabilityModeConfig::ZeroLoss, StpPolicy::Allow);
        assert!(config.validate().is_ok());
        assert!(matches!(config.durability_mode(), crate::wal::DurabilityMode::ZeroLoss));
    }

    #[test]
    fn rejects_non_power_of_two_queue_capacity() {
        let mut config = EngineConfig::new("/tmp/wal", DurabilityModeConfig::Async, StpPolicy::Allow);
        config.wal_queue_capacity = 100;
        assert!(config.validate().is_err());
    }
}
