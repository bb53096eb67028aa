#![warn(missing_docs)]
//! Core primitives shared across the workspace.

mod direction;
mod flags;
mod pos;

use serde::{Deserialize, Serialize};

pub use direction::{Axis, Direction, DirectionOrder};
pub use flags::UpdateFlags;
pub use pos::Position;

/// Fixed tick type (20 TPS => 50 ms per tick).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTick(pub u64);

impl SimTick {
    /// First tick in any deterministic timeline.
    pub const ZERO: Self = Self(0);

    /// Advance by `delta` ticks.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0 + delta)
    }
}
