//! Redstone circuit simulation on a voxel grid.

pub mod block;
pub mod blocks;
pub mod config;
pub mod connectivity;
mod engine;
mod error;
pub mod grid;
pub mod hook;
pub mod level;
pub mod neighbor;
pub mod redstone;
pub mod signal;
pub mod tick;

pub use block::{BlockKind, BlockState, RailShape, RedstoneSide};
pub use config::EngineConfig;
pub use connectivity::{ConnectivityResolver, VoxelShape};
pub use engine::{EngineStats, RedstoneEngine};
pub use error::{ConfigError, EngineError, EngineResult};
pub use grid::{ChunkPos, VoxelGrid};
pub use hook::{NeighborUpdateHook, Passthrough, RedstoneChangeHook};
pub use level::Level;
pub use neighbor::{DispatchLimits, DispatchStats, NeighborUpdateDispatcher};
pub use signal::{SignalStrategy, SourceAttenuation, StrategyKind, WireRules};
pub use tick::ScheduledTick;
