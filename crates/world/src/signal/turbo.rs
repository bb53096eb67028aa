//! Whole-network breadth-first solve.

use super::local::settle_locally;
use super::{local_target, notify_power_change, settle_network, wire_power, wire_state};
use super::{Network, SignalStrategy, StrategyKind};
use crate::blocks::BlockContext;
use redwire_core::Position;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Solves the network a wire belongs to as soon as that wire is found
/// inconsistent, then writes every changed wire strongest first.
///
/// Wires that are already consistent with their neighbors cost one local
/// evaluation, so the flood of neighbor updates that follows a batch write
/// settles immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct TurboStrategy;

impl SignalStrategy for TurboStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Turbo
    }

    fn settle(&mut self, cx: &mut BlockContext<'_, '_>, pos: Position) -> u8 {
        let Some(state) = wire_state(cx.level(), pos) else {
            return 0;
        };
        let old = wire_power(state);
        if local_target(cx.level(), pos, cx.rules) == old {
            return old;
        }

        let Some(network) = Network::discover(cx.level(), pos, cx.rules) else {
            cx.stats.fallbacks += 1;
            warn!(
                pos = %pos,
                limit = cx.rules.max_network_size,
                "Wire network too large; settling locally"
            );
            return settle_locally(cx, pos);
        };

        cx.stats.network_solves += 1;
        let written = settle_network(cx, &network, HashMap::new());
        debug!(pos = %pos, wires = network.len(), written = written.len(), "Solved wire network");
        notify_power_change(cx, &written);
        cx.level().block_state(pos).map_or(0, wire_power)
    }
}
