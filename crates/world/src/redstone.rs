//! Signal queries against the world.
//!
//! These mirror how a consumer looks at its surroundings: a block is powered
//! when any neighbor emits towards it, either weakly through [`signal_at`] or
//! strongly into a conductor that then passes the power on.

use crate::blocks::signal_source;
use crate::level::Level;
use crate::block::BlockState;
use redwire_core::{Direction, Position};

/// Maximum redstone power level
pub const MAX_POWER: u8 = 15;

/// Whether wires count as emitters for the current query.
///
/// A wire computing its own target must not see the power of other wires as
/// a source, otherwise two wires would keep each other alive. Passing the flag
/// explicitly replaces a global toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalContext {
    /// Wires report their power when true.
    pub wires_emit: bool,
}

impl SignalContext {
    /// Normal queries.
    pub const EMITTING: SignalContext = SignalContext { wires_emit: true };
    /// Queries made while a wire computes its own target.
    pub const WIRES_SILENT: SignalContext = SignalContext { wires_emit: false };
}

impl Default for SignalContext {
    fn default() -> Self {
        Self::EMITTING
    }
}

/// Clamp an out-of-range power value. Debug builds treat it as a bug.
pub fn clamp_power(value: u8) -> u8 {
    debug_assert!(value <= MAX_POWER, "power {value} out of range");
    value.min(MAX_POWER)
}

/// Whether `state` emits signal at all.
pub fn is_signal_source(state: BlockState, ctx: SignalContext) -> bool {
    signal_source(state.kind()).is_some_and(|source| source.is_signal_source(state, ctx))
}

/// Weak signal emitted by the block at `pos` towards a querier that looks at
/// it in `direction`.
pub fn emitted_signal(
    level: &dyn Level,
    pos: Position,
    state: BlockState,
    direction: Direction,
    ctx: SignalContext,
) -> u8 {
    signal_source(state.kind())
        .map_or(0, |source| source.signal(level, state, pos, direction, ctx))
}

/// Strong signal emitted by the block at `pos` towards `direction`.
pub fn emitted_direct_signal(
    level: &dyn Level,
    pos: Position,
    state: BlockState,
    direction: Direction,
    ctx: SignalContext,
) -> u8 {
    signal_source(state.kind())
        .map_or(0, |source| source.direct_signal(level, state, pos, direction, ctx))
}

/// Signal arriving from the block at `pos`, seen from its neighbor on the
/// `direction.opposite()` side. Conductors forward any strong power they receive.
pub fn signal_at(level: &dyn Level, pos: Position, direction: Direction, ctx: SignalContext) -> u8 {
    let Some(state) = level.block_state(pos) else {
        return 0;
    };
    let weak = emitted_signal(level, pos, state, direction, ctx);
    if state.is_conductor() {
        weak.max(direct_signal_to(level, pos, ctx))
    } else {
        weak
    }
}

/// Strongest strong signal any neighbor pushes into `pos`.
pub fn direct_signal_to(level: &dyn Level, pos: Position, ctx: SignalContext) -> u8 {
    let mut best = 0;
    for direction in Direction::ALL {
        let neighbor = pos.relative(direction);
        let Some(state) = level.block_state(neighbor) else {
            continue;
        };
        best = best.max(emitted_direct_signal(level, neighbor, state, direction, ctx));
        if best >= MAX_POWER {
            break;
        }
    }
    best
}

/// Strongest signal arriving at `pos` from any side.
pub fn best_neighbor_signal(level: &dyn Level, pos: Position, ctx: SignalContext) -> u8 {
    let mut best = 0;
    for direction in Direction::ALL {
        best = best.max(signal_at(level, pos.relative(direction), direction, ctx));
        if best >= MAX_POWER {
            return MAX_POWER;
        }
    }
    best
}

/// Whether any neighbor powers `pos`.
pub fn has_neighbor_signal(level: &dyn Level, pos: Position, ctx: SignalContext) -> bool {
    Direction::ALL
        .into_iter()
        .any(|direction| signal_at(level, pos.relative(direction), direction, ctx) > 0)
}
