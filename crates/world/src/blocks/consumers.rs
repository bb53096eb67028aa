//! Blocks that react to signal without emitting any.

use super::{BlockContext, Tickable};
use crate::block::{BlockKind, BlockState, POWERED};
use crate::redstone::{has_neighbor_signal, SignalContext, MAX_POWER};
use redwire_core::{Position, UpdateFlags};

/// Delay before a lamp that lost power goes dark.
pub const LAMP_OFF_DELAY: u32 = 4;

/// Lights as soon as it is powered and goes dark a few ticks after it is not.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lamp;

impl Lamp {
    /// Re-check the lamp after a neighbor changed.
    pub fn neighbor_changed(&self, cx: &mut BlockContext<'_, '_>, state: BlockState, pos: Position) {
        let lit = state.get(POWERED);
        let powered = has_neighbor_signal(cx.level(), pos, SignalContext::EMITTING);
        if lit == powered {
            return;
        }
        if lit {
            if !cx.cascade.has_scheduled_tick(pos, BlockKind::Lamp) {
                cx.cascade.schedule_tick(pos, BlockKind::Lamp, LAMP_OFF_DELAY);
            }
        } else if cx.authorize(pos, 0, MAX_POWER) > 0 {
            cx.cascade.set_block(pos, state.with(POWERED, true), UpdateFlags::CLIENTS);
        }
    }
}

impl Tickable for Lamp {
    fn tick(&self, cx: &mut BlockContext<'_, '_>, state: BlockState, pos: Position) {
        if !state.get(POWERED) || has_neighbor_signal(cx.level(), pos, SignalContext::EMITTING) {
            return;
        }
        if cx.authorize(pos, MAX_POWER, 0) == 0 {
            cx.cascade.set_block(pos, state.with(POWERED, false), UpdateFlags::CLIENTS);
        }
    }
}
