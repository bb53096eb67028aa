//! Engine configuration.

use crate::error::ConfigError;
use crate::neighbor::{DispatchLimits, DEFAULT_MAX_CHAINED_UPDATES, DEFAULT_MAX_UPDATE_DEPTH};
use crate::signal::{SourceAttenuation, StrategyKind, WireRules};
use redwire_core::DirectionOrder;
use serde::{Deserialize, Serialize};

/// Knobs for one [`RedstoneEngine`](crate::RedstoneEngine).
///
/// Every field has a default, so a partial TOML table is enough:
///
/// ```toml
/// strategy = "graph"
/// max_update_depth = 256
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Wire propagation strategy.
    pub strategy: StrategyKind,
    /// Depth budget for shape-update chains.
    pub max_update_depth: u32,
    /// Updates one cascade may process.
    pub max_chained_updates: usize,
    /// Order of the shape-update fan-out.
    pub shape_order: DirectionOrder,
    /// Cost of the hop from a source into the first wire.
    pub source_attenuation: SourceAttenuation,
    /// Entries kept in the wire shape cache.
    pub shape_cache_capacity: usize,
    /// Largest wire network the batch strategies solve at once.
    pub max_network_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            max_update_depth: DEFAULT_MAX_UPDATE_DEPTH,
            max_chained_updates: DEFAULT_MAX_CHAINED_UPDATES,
            shape_order: DirectionOrder::default(),
            source_attenuation: SourceAttenuation::default(),
            shape_cache_capacity: 256,
            max_network_size: 65_536,
        }
    }
}

impl EngineConfig {
    /// Same configuration with another strategy.
    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks: [(&'static str, u64, u64); 3] = [
            ("max_chained_updates", 1, self.max_chained_updates as u64),
            ("shape_cache_capacity", 1, self.shape_cache_capacity as u64),
            ("max_network_size", 1, self.max_network_size as u64),
        ];
        for (field, min, value) in checks {
            if value < min {
                return Err(ConfigError::TooSmall { field, min, value });
            }
        }
        Ok(())
    }

    /// Dispatcher limits.
    pub fn limits(&self) -> DispatchLimits {
        DispatchLimits {
            max_depth: self.max_update_depth,
            max_chained_updates: self.max_chained_updates,
            shape_order: self.shape_order,
        }
    }

    /// Wire evaluation rules.
    pub fn rules(&self) -> WireRules {
        WireRules {
            attenuation: self.source_attenuation,
            max_network_size: self.max_network_size,
        }
    }
}
