//! Blocks that only emit: redstone blocks, levers, buttons, and the two
//! directional sources.
//!
//! Levers and buttons store the direction towards the block they hang on in
//! `FACING`. Repeaters and observers store their output direction there.

use super::{BlockContext, SignalSource, Tickable};
use crate::block::{BlockKind, BlockState, FACING, POWERED};
use crate::level::Level;
use crate::neighbor::Cascade;
use crate::redstone::{SignalContext, MAX_POWER};
use redwire_core::{Direction, Position, UpdateFlags};

/// Ticks a pressed button stays down.
pub const BUTTON_PRESS_TICKS: u32 = 20;

fn level_of(powered: bool) -> u8 {
    if powered {
        MAX_POWER
    } else {
        0
    }
}

/// Full block that powers everything around it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedstoneBlock;

impl SignalSource for RedstoneBlock {
    fn signal(
        &self,
        _level: &dyn Level,
        _state: BlockState,
        _pos: Position,
        _direction: Direction,
        _ctx: SignalContext,
    ) -> u8 {
        MAX_POWER
    }
}

/// Emits while on, and strongly powers the block it hangs on.
fn attached_signal(state: BlockState) -> u8 {
    level_of(state.get(POWERED))
}

fn attached_direct_signal(state: BlockState, direction: Direction) -> u8 {
    if direction == state.get(FACING).opposite() {
        attached_signal(state)
    } else {
        0
    }
}

/// Toggle switch.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lever;

impl SignalSource for Lever {
    fn signal(
        &self,
        _level: &dyn Level,
        state: BlockState,
        _pos: Position,
        _direction: Direction,
        _ctx: SignalContext,
    ) -> u8 {
        attached_signal(state)
    }

    fn direct_signal(
        &self,
        _level: &dyn Level,
        state: BlockState,
        _pos: Position,
        direction: Direction,
        _ctx: SignalContext,
    ) -> u8 {
        attached_direct_signal(state, direction)
    }
}

impl Lever {
    /// Flip the lever at `pos`. Returns false when the hook kept it as it was.
    pub fn toggle(&self, cx: &mut BlockContext<'_, '_>, state: BlockState, pos: Position) -> bool {
        let old = attached_signal(state);
        let authorized = cx.authorize(pos, old, MAX_POWER - old);
        if authorized == old {
            return false;
        }
        let updated = state.with(POWERED, authorized > 0);
        if !cx.cascade.set_block(pos, updated, UpdateFlags::CLIENTS) {
            return false;
        }
        update_attached_neighbors(cx.cascade, updated, pos);
        true
    }
}

/// Momentary switch that releases itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct Button;

impl SignalSource for Button {
    fn signal(
        &self,
        _level: &dyn Level,
        state: BlockState,
        _pos: Position,
        _direction: Direction,
        _ctx: SignalContext,
    ) -> u8 {
        attached_signal(state)
    }

    fn direct_signal(
        &self,
        _level: &dyn Level,
        state: BlockState,
        _pos: Position,
        direction: Direction,
        _ctx: SignalContext,
    ) -> u8 {
        attached_direct_signal(state, direction)
    }
}

impl Button {
    /// Press the button and schedule its release. Pressing a pressed button
    /// does nothing.
    pub fn press(&self, cx: &mut BlockContext<'_, '_>, state: BlockState, pos: Position) -> bool {
        if state.get(POWERED) {
            return false;
        }
        if cx.authorize(pos, 0, MAX_POWER) == 0 {
            return false;
        }
        let pressed = state.with(POWERED, true);
        if !cx.cascade.set_block(pos, pressed, UpdateFlags::CLIENTS) {
            return false;
        }
        update_attached_neighbors(cx.cascade, pressed, pos);
        cx.cascade.schedule_tick(pos, BlockKind::Button, BUTTON_PRESS_TICKS);
        true
    }
}

impl Tickable for Button {
    fn tick(&self, cx: &mut BlockContext<'_, '_>, state: BlockState, pos: Position) {
        if !state.get(POWERED) {
            return;
        }
        if cx.authorize(pos, MAX_POWER, 0) != 0 {
            cx.cascade.schedule_tick(pos, BlockKind::Button, BUTTON_PRESS_TICKS);
            return;
        }
        let released = state.with(POWERED, false);
        if cx.cascade.set_block(pos, released, UpdateFlags::CLIENTS) {
            update_attached_neighbors(cx.cascade, released, pos);
        }
    }
}

/// Neighbor-update around an attached switch and around the block it hangs on.
pub fn update_attached_neighbors(cascade: &mut Cascade<'_>, state: BlockState, pos: Position) {
    cascade.update_neighbors_at(pos, state.kind());
    cascade.update_neighbors_at(pos.relative(state.get(FACING)), state.kind());
}

/// Shape update for levers and buttons: they pop off when the face they hang
/// on stops being sturdy.
pub fn attached_update_shape(
    state: BlockState,
    direction: Direction,
    neighbor_state: BlockState,
) -> BlockState {
    let facing = state.get(FACING);
    if direction == facing && !neighbor_state.is_face_sturdy(facing.opposite()) {
        BlockState::AIR
    } else {
        state
    }
}

/// Emits from its output face only.
fn output_signal(state: BlockState, direction: Direction) -> u8 {
    if state.get(POWERED) && direction == state.get(FACING).opposite() {
        MAX_POWER
    } else {
        0
    }
}

/// Diode that outputs along its facing. Its delay logic is not modelled;
/// `POWERED` is set directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct Repeater;

impl SignalSource for Repeater {
    fn signal(
        &self,
        _level: &dyn Level,
        state: BlockState,
        _pos: Position,
        direction: Direction,
        _ctx: SignalContext,
    ) -> u8 {
        output_signal(state, direction)
    }

    fn direct_signal(
        &self,
        _level: &dyn Level,
        state: BlockState,
        _pos: Position,
        direction: Direction,
        _ctx: SignalContext,
    ) -> u8 {
        output_signal(state, direction)
    }
}

/// Pulses out of its back. Like the repeater, driven through `POWERED`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Observer;

impl SignalSource for Observer {
    fn signal(
        &self,
        _level: &dyn Level,
        state: BlockState,
        _pos: Position,
        direction: Direction,
        _ctx: SignalContext,
    ) -> u8 {
        output_signal(state, direction)
    }

    fn direct_signal(
        &self,
        _level: &dyn Level,
        state: BlockState,
        _pos: Position,
        direction: Direction,
        _ctx: SignalContext,
    ) -> u8 {
        output_signal(state, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::VoxelGrid;

    #[test]
    fn test_lever_direct_signal_only_into_support() {
        let grid = VoxelGrid::new();
        let lever = BlockState::new(BlockKind::Lever)
            .with(FACING, Direction::Down)
            .with(POWERED, true);
        let ctx = SignalContext::EMITTING;
        // The support below looks up at the lever.
        assert_eq!(Lever.direct_signal(&grid, lever, Position::ORIGIN, Direction::Up, ctx), 15);
        assert_eq!(Lever.direct_signal(&grid, lever, Position::ORIGIN, Direction::East, ctx), 0);
        assert_eq!(Lever.signal(&grid, lever, Position::ORIGIN, Direction::East, ctx), 15);
        let off = lever.with(POWERED, false);
        assert_eq!(Lever.signal(&grid, off, Position::ORIGIN, Direction::East, ctx), 0);
    }

    #[test]
    fn test_repeater_emits_forward_only() {
        let grid = VoxelGrid::new();
        let repeater = BlockState::new(BlockKind::Repeater)
            .with(FACING, Direction::East)
            .with(POWERED, true);
        let ctx = SignalContext::EMITTING;
        // The block east of the repeater looks west at it.
        assert_eq!(Repeater.signal(&grid, repeater, Position::ORIGIN, Direction::West, ctx), 15);
        assert_eq!(Repeater.signal(&grid, repeater, Position::ORIGIN, Direction::East, ctx), 0);
    }

    #[test]
    fn test_redstone_block_has_no_direct_signal() {
        let grid = VoxelGrid::new();
        let block = BlockState::new(BlockKind::RedstoneBlock);
        let ctx = SignalContext::EMITTING;
        assert_eq!(RedstoneBlock.signal(&grid, block, Position::ORIGIN, Direction::Up, ctx), 15);
        assert_eq!(
            RedstoneBlock.direct_signal(&grid, block, Position::ORIGIN, Direction::Up, ctx),
            0
        );
    }

    #[test]
    fn test_attachment_pops_off_without_support() {
        let lever = BlockState::new(BlockKind::Lever).with(FACING, Direction::Down);
        assert!(attached_update_shape(lever, Direction::Down, BlockState::AIR).is_air());
        assert_eq!(
            attached_update_shape(lever, Direction::Down, BlockState::new(BlockKind::Stone)),
            lever
        );
        assert_eq!(attached_update_shape(lever, Direction::North, BlockState::AIR), lever);
    }
}
