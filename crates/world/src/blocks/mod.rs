//! Per-kind block behavior expressed as small capability traits.
//!
//! Each block kind is a zero-sized struct that implements only the
//! capabilities it has. Lookups by [`BlockKind`] return `&'static dyn` trait
//! objects, so callers ask "is this a signal source?" instead of walking a
//! class hierarchy.

pub mod consumers;
pub mod rail;
pub mod sources;
pub mod wire;

use crate::block::{BlockKind, BlockState, RailShape, RedstoneSide, RAIL_SHAPE};
use crate::engine::EngineStats;
use crate::hook::RedstoneChangeHook;
use crate::level::Level;
use crate::neighbor::Cascade;
use crate::redstone::{SignalContext, MAX_POWER};
use crate::signal::WireRules;
use redwire_core::{Direction, Position};
use tracing::warn;

/// Something that emits redstone signal.
pub trait SignalSource: Sync {
    /// Whether the block currently counts as a source.
    fn is_signal_source(&self, _state: BlockState, _ctx: SignalContext) -> bool {
        true
    }

    /// Weak signal seen by a querier looking at this block in `direction`.
    fn signal(
        &self,
        level: &dyn Level,
        state: BlockState,
        pos: Position,
        direction: Direction,
        ctx: SignalContext,
    ) -> u8;

    /// Strong signal pushed into the block the querier sits in.
    fn direct_signal(
        &self,
        _level: &dyn Level,
        _state: BlockState,
        _pos: Position,
        _direction: Direction,
        _ctx: SignalContext,
    ) -> u8 {
        0
    }
}

/// Blocks that carry a decaying power level and connect on four sides.
pub trait WireLike: Sync {
    /// Stored power.
    fn power(&self, state: BlockState) -> u8;
    /// Copy with a new power level.
    fn with_power(&self, state: BlockState, power: u8) -> BlockState;
    /// Connection towards a horizontal direction.
    fn side(&self, state: BlockState, direction: Direction) -> RedstoneSide;
}

/// Track blocks that derive their shape from neighboring tracks.
pub trait RailLike: Sync {
    /// Straight-only rails never take a curved shape.
    fn is_straight(&self) -> bool;

    /// Current layout.
    fn shape(&self, state: BlockState) -> RailShape {
        state.get(RAIL_SHAPE)
    }

    /// Whether the rail accepts `shape`.
    fn accepts(&self, shape: RailShape) -> bool {
        !(self.is_straight() && shape.is_curve())
    }
}

/// Blocks that react to scheduled ticks.
pub trait Tickable: Sync {
    /// Run a due tick for the block at `pos`.
    fn tick(&self, cx: &mut BlockContext<'_, '_>, state: BlockState, pos: Position);
}

/// Capabilities a block needs while it reacts inside a cascade.
pub struct BlockContext<'c, 'w> {
    /// The running cascade.
    pub cascade: &'c mut Cascade<'w>,
    /// Authorizes every power transition.
    pub hook: &'c mut dyn RedstoneChangeHook,
    /// Wire evaluation rules.
    pub rules: WireRules,
    /// Counters.
    pub stats: &'c mut EngineStats,
}

impl BlockContext<'_, '_> {
    /// Read access to the world.
    pub fn level(&self) -> &dyn Level {
        self.cascade.level()
    }

    /// Ask the hook whether `pos` may move from `old` to `proposed`.
    ///
    /// The hook is consulted only for real changes, and its answer is final
    /// once capped at [`MAX_POWER`].
    pub fn authorize(&mut self, pos: Position, old: u8, proposed: u8) -> u8 {
        if old == proposed {
            return old;
        }
        self.stats.hook_calls += 1;
        let answer = self.hook.on_redstone_change(pos, old, proposed);
        let authorized = if answer > MAX_POWER {
            warn!(pos = %pos, answer, "Change hook answered above max power; capping");
            MAX_POWER
        } else {
            answer
        };
        if authorized != proposed {
            self.stats.hook_overrides += 1;
        }
        authorized
    }
}

/// Signal source capability of `kind`.
pub fn signal_source(kind: BlockKind) -> Option<&'static dyn SignalSource> {
    match kind {
        BlockKind::RedstoneWire => Some(&wire::RedstoneWire),
        BlockKind::RedstoneBlock => Some(&sources::RedstoneBlock),
        BlockKind::Lever => Some(&sources::Lever),
        BlockKind::Button => Some(&sources::Button),
        BlockKind::Repeater => Some(&sources::Repeater),
        BlockKind::Observer => Some(&sources::Observer),
        BlockKind::DetectorRail => Some(&rail::DetectorRail),
        _ => None,
    }
}

/// Wire capability of `kind`.
pub fn wire_like(kind: BlockKind) -> Option<&'static dyn WireLike> {
    match kind {
        BlockKind::RedstoneWire => Some(&wire::RedstoneWire),
        _ => None,
    }
}

/// Rail capability of `kind`.
pub fn rail_like(kind: BlockKind) -> Option<&'static dyn RailLike> {
    match kind {
        BlockKind::Rail => Some(&rail::PlainRail),
        BlockKind::PoweredRail => Some(&rail::PoweredRail),
        BlockKind::DetectorRail => Some(&rail::DetectorRail),
        _ => None,
    }
}

/// Scheduled-tick capability of `kind`.
pub fn tickable(kind: BlockKind) -> Option<&'static dyn Tickable> {
    match kind {
        BlockKind::Button => Some(&sources::Button),
        BlockKind::Lamp => Some(&consumers::Lamp),
        BlockKind::DetectorRail => Some(&rail::DetectorRail),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_lookup() {
        assert!(signal_source(BlockKind::Lever).is_some());
        assert!(signal_source(BlockKind::Stone).is_none());
        assert!(wire_like(BlockKind::RedstoneWire).is_some());
        assert!(rail_like(BlockKind::Rail).is_some_and(|rail| !rail.is_straight()));
        assert!(rail_like(BlockKind::PoweredRail).is_some_and(|rail| rail.is_straight()));
        assert!(tickable(BlockKind::Lamp).is_some());
        assert!(tickable(BlockKind::Lever).is_none());
    }

    #[test]
    fn test_straight_rails_refuse_curves() {
        let powered = rail_like(BlockKind::PoweredRail).expect("rail");
        assert!(!powered.accepts(RailShape::NorthEast));
        assert!(powered.accepts(RailShape::AscendingEast));
        let plain = rail_like(BlockKind::Rail).expect("rail");
        assert!(plain.accepts(RailShape::NorthEast));
    }
}
