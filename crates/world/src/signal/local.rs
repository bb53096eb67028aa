//! Per-wire local decrement.

use super::{local_target, notify_power_change, wire_power, wire_state, write_power};
use super::{SignalStrategy, StrategyKind};
use crate::blocks::BlockContext;
use redwire_core::Position;

/// Re-evaluates one wire against its immediate surroundings and lets the
/// resulting neighbor updates carry the change along the line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStrategy;

impl SignalStrategy for LocalStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Local
    }

    fn settle(&mut self, cx: &mut BlockContext<'_, '_>, pos: Position) -> u8 {
        settle_locally(cx, pos)
    }
}

/// Settle the single wire at `pos`.
pub(super) fn settle_locally(cx: &mut BlockContext<'_, '_>, pos: Position) -> u8 {
    let Some(state) = wire_state(cx.level(), pos) else {
        return 0;
    };
    let old = wire_power(state);
    let target = local_target(cx.level(), pos, cx.rules);
    if target == old {
        return old;
    }

    let authorized = cx.authorize(pos, old, target);
    if authorized == old || !write_power(cx, pos, state, authorized) {
        return old;
    }
    notify_power_change(cx, &[pos]);
    authorized
}
