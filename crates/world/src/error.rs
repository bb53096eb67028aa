use crate::block::BlockKind;
use redwire_core::Position;
use thiserror::Error;

/// Caller mistakes on the engine's public operations.
///
/// Nothing inside a cascade returns these; the simulation itself never fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Cell {0} is not loaded")]
    Unloaded(Position),

    #[error("Expected redstone wire at {pos}, found {found}")]
    NotAWire { pos: Position, found: BlockKind },

    #[error("Expected {expected} at {pos}, found {found}")]
    UnexpectedBlock {
        pos: Position,
        expected: BlockKind,
        found: BlockKind,
    },
}

/// Rejected engine configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be at least {min}, got {value}")]
    TooSmall {
        field: &'static str,
        min: u64,
        value: u64,
    },
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
