//! Redstone wire.

use super::{SignalSource, WireLike};
use crate::block::{side_property, BlockKind, BlockState, RedstoneSide, POWER};
use crate::connectivity::{cross_state, is_cross, is_dot, resolve_wire};
use crate::level::Level;
use crate::neighbor::Cascade;
use crate::redstone::{clamp_power, SignalContext};
use redwire_core::{Direction, Position, UpdateFlags};

/// Wire carrying a power level that drops by one per hop.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedstoneWire;

impl SignalSource for RedstoneWire {
    fn is_signal_source(&self, _state: BlockState, ctx: SignalContext) -> bool {
        ctx.wires_emit
    }

    fn signal(
        &self,
        level: &dyn Level,
        state: BlockState,
        pos: Position,
        direction: Direction,
        ctx: SignalContext,
    ) -> u8 {
        if !ctx.wires_emit || direction == Direction::Down {
            return 0;
        }
        let power = state.get(POWER);
        if power == 0 {
            return 0;
        }
        if direction == Direction::Up {
            return power;
        }
        let resolved = resolve_wire(level, pos, state);
        if self.side(resolved, direction.opposite()).is_connected() {
            power
        } else {
            0
        }
    }

    fn direct_signal(
        &self,
        level: &dyn Level,
        state: BlockState,
        pos: Position,
        direction: Direction,
        ctx: SignalContext,
    ) -> u8 {
        self.signal(level, state, pos, direction, ctx)
    }
}

impl WireLike for RedstoneWire {
    fn power(&self, state: BlockState) -> u8 {
        state.get(POWER)
    }

    fn with_power(&self, state: BlockState, power: u8) -> BlockState {
        state.with(POWER, clamp_power(power))
    }

    fn side(&self, state: BlockState, direction: Direction) -> RedstoneSide {
        side_property(direction).map_or(RedstoneSide::None, |prop| state.get(prop))
    }
}

fn is_wire(level: &dyn Level, pos: Position) -> bool {
    level.state_or_air(pos).is(BlockKind::RedstoneWire)
}

/// Neighbor-update a wire and the blocks around it, so a corner it turns
/// around notices a change two blocks away.
fn check_corner_change(cascade: &mut Cascade<'_>, pos: Position) {
    if !is_wire(cascade.level(), pos) {
        return;
    }
    cascade.update_neighbors_at(pos, BlockKind::RedstoneWire);
    for direction in Direction::ALL {
        cascade.update_neighbors_at(pos.relative(direction), BlockKind::RedstoneWire);
    }
}

/// Wake the wires beside `pos`, and the ones a step up or down from them.
pub fn update_neighbors_of_neighboring_wires(cascade: &mut Cascade<'_>, pos: Position) {
    for direction in Direction::HORIZONTAL {
        check_corner_change(cascade, pos.relative(direction));
    }
    for direction in Direction::HORIZONTAL {
        let side = pos.relative(direction);
        let corner = if cascade.level().state_or_air(side).is_conductor() {
            side.above()
        } else {
            side.below()
        };
        check_corner_change(cascade, corner);
    }
}

/// Shape-update the wires diagonally above and below every connected side
/// whose lateral neighbor is not itself wire.
pub fn update_indirect_shapes(
    cascade: &mut Cascade<'_>,
    state: BlockState,
    pos: Position,
    flags: UpdateFlags,
    depth: u32,
) {
    for direction in Direction::HORIZONTAL {
        if !RedstoneWire.side(state, direction).is_connected() {
            continue;
        }
        let side = pos.relative(direction);
        if is_wire(cascade.level(), side) {
            continue;
        }
        for diagonal in [side.below(), side.above()] {
            if !is_wire(cascade.level(), diagonal) {
                continue;
            }
            let neighbor_pos = diagonal.relative(direction.opposite());
            let neighbor_state = cascade.level().state_or_air(neighbor_pos);
            cascade.shape_update(
                diagonal,
                direction.opposite(),
                neighbor_pos,
                neighbor_state,
                flags,
                depth,
            );
        }
    }
}

/// Shape the wire at `pos` takes when a player toggles it: a cross turns into
/// a dot and a dot into a cross, then both are fitted to the neighbors.
/// `None` when the wire is neither or the result would not differ.
pub fn toggled(level: &dyn Level, pos: Position, state: BlockState) -> Option<BlockState> {
    let base = if is_cross(state) {
        BlockState::new(BlockKind::RedstoneWire)
    } else if is_dot(state) {
        cross_state()
    } else {
        return None;
    };
    let toggled = resolve_wire(level, pos, base.with(POWER, state.get(POWER)));
    (toggled != state).then_some(toggled)
}

/// Neighbor-update conductors that a toggled wire started or stopped pointing into.
pub fn updates_on_shape_change(
    cascade: &mut Cascade<'_>,
    pos: Position,
    old: BlockState,
    new: BlockState,
) {
    for direction in Direction::HORIZONTAL {
        let neighbor = pos.relative(direction);
        let changed = RedstoneWire.side(old, direction).is_connected()
            != RedstoneWire.side(new, direction).is_connected();
        if changed && cascade.level().state_or_air(neighbor).is_conductor() {
            cascade.update_neighbors_at_except(neighbor, BlockKind::RedstoneWire, direction.opposite());
        }
    }
}
