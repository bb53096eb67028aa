//! Wire power propagation.
//!
//! Every wire settles to `max(source, strongest wire input - 1)`, where the
//! source is the strongest non-wire signal next to it. The unique solution of
//! that rule over a connected network is the stable state; the strategies in
//! this module only differ in how they reach it:
//!
//! * [`LocalStrategy`] re-evaluates one wire at a time and lets neighbor
//!   updates carry the change outward.
//! * [`TurboStrategy`] solves the whole network in one bucketed breadth-first
//!   pass and writes the result strongest first.
//! * [`GraphStrategy`] keeps an explicit wire graph for the duration of a
//!   cascade and updates it incrementally.

mod graph;
mod local;
mod turbo;

pub use graph::GraphStrategy;
pub use local::LocalStrategy;
pub use turbo::TurboStrategy;

use crate::block::{BlockKind, BlockState};
use crate::blocks::{wire_like, BlockContext};
use crate::level::Level;
use crate::redstone::{best_neighbor_signal, SignalContext, MAX_POWER};
use redwire_core::{Direction, Position, UpdateFlags};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Selects a propagation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Per-wire local decrement.
    #[default]
    Local,
    /// Whole-network breadth-first solve.
    Turbo,
    /// Incremental wire graph.
    Graph,
}

impl StrategyKind {
    /// Every strategy.
    pub const ALL: [StrategyKind; 3] = [StrategyKind::Local, StrategyKind::Turbo, StrategyKind::Graph];

    /// Stable lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::Local => "local",
            StrategyKind::Turbo => "turbo",
            StrategyKind::Graph => "graph",
        }
    }
}

/// How much a source loses when it feeds the first wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceAttenuation {
    /// The hop from a source into a wire costs one level, like every other hop.
    #[default]
    Hop,
    /// The first wire takes the source's full strength.
    Direct,
}

/// Evaluation rules shared by every strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireRules {
    /// Source-to-wire attenuation.
    pub attenuation: SourceAttenuation,
    /// Largest network the batch strategies will solve at once.
    pub max_network_size: usize,
}

impl Default for WireRules {
    fn default() -> Self {
        Self {
            attenuation: SourceAttenuation::Hop,
            max_network_size: 65_536,
        }
    }
}

/// A way of settling wire power.
pub trait SignalStrategy {
    /// Which strategy this is.
    fn kind(&self) -> StrategyKind;

    /// Recompute the wire at `pos` (and whatever its change implies) and
    /// return its stored power afterwards.
    fn settle(&mut self, cx: &mut BlockContext<'_, '_>, pos: Position) -> u8;

    /// A neighbor of the wire at `pos` changed.
    fn on_neighbor_changed(
        &mut self,
        cx: &mut BlockContext<'_, '_>,
        pos: Position,
        _source_pos: Position,
    ) -> u8 {
        self.settle(cx, pos)
    }

    /// A wire was placed at `pos`.
    fn on_wire_added(&mut self, cx: &mut BlockContext<'_, '_>, pos: Position) -> u8 {
        self.settle(cx, pos)
    }

    /// The wire `old` at `pos` was removed.
    fn on_wire_removed(&mut self, cx: &mut BlockContext<'_, '_>, pos: Position, old: BlockState) {
        if wire_power(old) > 0 {
            notify_power_change(cx, &[pos]);
        }
    }

    /// The cascade drained.
    fn cascade_finished(&mut self) {}
}

/// Build the strategy for `kind`.
pub fn strategy_for(kind: StrategyKind) -> Box<dyn SignalStrategy> {
    match kind {
        StrategyKind::Local => Box::new(LocalStrategy),
        StrategyKind::Turbo => Box::new(TurboStrategy),
        StrategyKind::Graph => Box::new(GraphStrategy::default()),
    }
}

/// Power stored in `state`, zero for anything but wire.
pub fn wire_power(state: BlockState) -> u8 {
    wire_like(state.kind()).map_or(0, |wire| wire.power(state))
}

fn wire_state(level: &dyn Level, pos: Position) -> Option<BlockState> {
    level
        .block_state(pos)
        .filter(|state| state.is(BlockKind::RedstoneWire))
}

/// Strongest non-wire signal feeding the wire at `pos`, after attenuation.
pub fn source_level(level: &dyn Level, pos: Position, rules: WireRules) -> u8 {
    let best = best_neighbor_signal(level, pos, SignalContext::WIRES_SILENT);
    match rules.attenuation {
        SourceAttenuation::Hop => best.saturating_sub(1),
        SourceAttenuation::Direct => best,
    }
}

/// Wires the wire at `pos` reads power from: the four lateral neighbors, plus
/// the wire on top of a lateral conductor when nothing conducts above `pos`,
/// or the wire below a lateral non-conductor.
pub fn wire_inputs(level: &dyn Level, pos: Position) -> Vec<Position> {
    let open_above = !level.state_or_air(pos.above()).is_conductor();
    let mut inputs = Vec::with_capacity(8);
    for direction in Direction::HORIZONTAL {
        let side = pos.relative(direction);
        let state = level.state_or_air(side);
        if state.is(BlockKind::RedstoneWire) {
            inputs.push(side);
        }
        let diagonal = if state.is_conductor() {
            open_above.then(|| side.above())
        } else {
            Some(side.below())
        };
        if let Some(diagonal) = diagonal {
            if level.state_or_air(diagonal).is(BlockKind::RedstoneWire) {
                inputs.push(diagonal);
            }
        }
    }
    inputs
}

/// Every wire that could read from or feed the wire at `pos`.
fn wire_candidates(level: &dyn Level, pos: Position) -> Vec<Position> {
    let mut candidates = Vec::with_capacity(12);
    for direction in Direction::HORIZONTAL {
        let side = pos.relative(direction);
        for candidate in [side, side.above(), side.below()] {
            if level.state_or_air(candidate).is(BlockKind::RedstoneWire) {
                candidates.push(candidate);
            }
        }
    }
    candidates
}

/// Power the wire at `pos` should hold given its current surroundings.
pub fn local_target(level: &dyn Level, pos: Position, rules: WireRules) -> u8 {
    let source = source_level(level, pos, rules);
    if source >= MAX_POWER {
        return MAX_POWER;
    }
    let strongest = wire_inputs(level, pos)
        .into_iter()
        .map(|input| wire_power(level.state_or_air(input)))
        .max()
        .unwrap_or(0);
    source.max(strongest.saturating_sub(1))
}

/// Store `power` in the wire `state` at `pos`.
fn write_power(
    cx: &mut BlockContext<'_, '_>,
    pos: Position,
    state: BlockState,
    power: u8,
) -> bool {
    let Some(wire) = wire_like(state.kind()) else {
        return false;
    };
    let written = cx.cascade.set_block(
        pos,
        wire.with_power(state, power),
        UpdateFlags::CLIENTS | UpdateFlags::KNOWN_SHAPE,
    );
    if written {
        cx.stats.power_writes += 1;
    }
    written
}

/// Neighbor-update each changed wire and its six neighbors, once each.
fn notify_power_change(cx: &mut BlockContext<'_, '_>, changed: &[Position]) {
    let mut seen = HashSet::new();
    for pos in changed {
        for target in std::iter::once(*pos).chain(pos.neighbors()) {
            if seen.insert(target) {
                cx.cascade.update_neighbors_at(target, BlockKind::RedstoneWire);
            }
        }
    }
}

/// Write `changes` strongest first through the hook.
///
/// Returns the first wire that ended up at a value other than the proposal,
/// together with the value it holds now, so the caller can pin it and solve
/// again. Every successful write is appended to `written`.
fn commit(
    cx: &mut BlockContext<'_, '_>,
    changes: &[(Position, u8)],
    written: &mut Vec<Position>,
) -> Option<(Position, u8)> {
    for &(pos, proposed) in changes {
        let Some(state) = wire_state(cx.level(), pos) else {
            continue;
        };
        let old = wire_power(state);
        if old == proposed {
            continue;
        }
        let authorized = cx.authorize(pos, old, proposed);
        if authorized != old {
            if !write_power(cx, pos, state, authorized) {
                return Some((pos, old));
            }
            written.push(pos);
        }
        if authorized != proposed {
            return Some((pos, authorized));
        }
    }
    None
}

/// A connected set of wires with their read relations.
pub(crate) struct Network {
    nodes: Vec<Position>,
    index: HashMap<Position, usize>,
    dependents: Vec<Vec<usize>>,
    sources: Vec<u8>,
}

impl Network {
    /// Collect every wire reachable from `origin`. Gives up above the size limit.
    pub(crate) fn discover(level: &dyn Level, origin: Position, rules: WireRules) -> Option<Self> {
        let mut nodes = Vec::new();
        let mut index = HashMap::new();
        let mut queue = VecDeque::new();
        if wire_state(level, origin).is_none() {
            return None;
        }
        index.insert(origin, 0);
        nodes.push(origin);
        queue.push_back(origin);

        while let Some(pos) = queue.pop_front() {
            for candidate in wire_candidates(level, pos) {
                if index.contains_key(&candidate) {
                    continue;
                }
                if nodes.len() >= rules.max_network_size {
                    return None;
                }
                index.insert(candidate, nodes.len());
                nodes.push(candidate);
                queue.push_back(candidate);
            }
        }

        let mut dependents = vec![Vec::new(); nodes.len()];
        let mut sources = Vec::with_capacity(nodes.len());
        for (reader, pos) in nodes.iter().enumerate() {
            sources.push(source_level(level, *pos, rules));
            for input in wire_inputs(level, *pos) {
                if let Some(&supplier) = index.get(&input) {
                    dependents[supplier].push(reader);
                }
            }
        }

        Some(Self {
            nodes,
            index,
            dependents,
            sources,
        })
    }

    /// Number of wires.
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Fixed point with `pins` held constant.
    ///
    /// Seeds every wire with its source level and relaxes from the strongest
    /// bucket down, so each wire is finalized the first time it is popped.
    pub(crate) fn solve(&self, pins: &HashMap<Position, u8>) -> Vec<u8> {
        let mut power = self.sources.clone();
        let mut pinned = vec![false; self.nodes.len()];
        for (pos, value) in pins {
            if let Some(&node) = self.index.get(pos) {
                pinned[node] = true;
                power[node] = *value;
            }
        }

        let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); usize::from(MAX_POWER) + 1];
        for (node, seed) in power.iter().enumerate() {
            if *seed > 0 {
                buckets[usize::from(*seed)].push(node);
            }
        }

        for level in (1..=usize::from(MAX_POWER)).rev() {
            while let Some(node) = buckets[level].pop() {
                if usize::from(power[node]) != level {
                    continue;
                }
                let next = power[node] - 1;
                for &dependent in &self.dependents[node] {
                    if !pinned[dependent] && next > power[dependent] {
                        power[dependent] = next;
                        buckets[usize::from(next)].push(dependent);
                    }
                }
            }
        }
        power
    }

    /// Wires whose stored power differs from `solution`, strongest first and
    /// in discovery order within a level.
    pub(crate) fn changes(&self, level: &dyn Level, solution: &[u8]) -> Vec<(Position, u8)> {
        let mut changes: Vec<(usize, u8)> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(node, pos)| wire_power(level.state_or_air(**pos)) != solution[*node])
            .map(|(node, _)| (node, solution[node]))
            .collect();
        changes.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        changes
            .into_iter()
            .map(|(node, power)| (self.nodes[node], power))
            .collect()
    }
}

/// Solve `network`, write the result, and re-solve around every wire the
/// hook pinned to a different value. Returns the wires written.
fn settle_network(
    cx: &mut BlockContext<'_, '_>,
    network: &Network,
    mut pins: HashMap<Position, u8>,
) -> Vec<Position> {
    let mut written = Vec::new();
    loop {
        let solution = network.solve(&pins);
        let changes = network.changes(cx.level(), &solution);
        if changes.is_empty() {
            break;
        }
        match commit(cx, &changes, &mut written) {
            Some((pos, value)) => {
                pins.insert(pos, value);
            }
            None => break,
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::VoxelGrid;

    fn line(len: i32) -> VoxelGrid {
        let mut grid = VoxelGrid::new();
        grid.load_area(Position::new(-1, 0, 0), Position::new(len + 1, 0, 0));
        for x in -1..=len + 1 {
            grid.put(Position::new(x, 0, 0), BlockState::new(BlockKind::Stone));
        }
        grid.put(Position::new(0, 1, 0), BlockState::new(BlockKind::RedstoneBlock));
        for x in 1..=len {
            grid.put(Position::new(x, 1, 0), BlockState::new(BlockKind::RedstoneWire));
        }
        grid
    }

    #[test]
    fn test_source_level_attenuation() {
        let grid = line(3);
        let first = Position::new(1, 1, 0);
        assert_eq!(source_level(&grid, first, WireRules::default()), 14);
        let direct = WireRules {
            attenuation: SourceAttenuation::Direct,
            ..WireRules::default()
        };
        assert_eq!(source_level(&grid, first, direct), 15);
        assert_eq!(source_level(&grid, Position::new(2, 1, 0), direct), 0);
    }

    #[test]
    fn test_inputs_include_lateral_wires() {
        let grid = line(3);
        let inputs = wire_inputs(&grid, Position::new(2, 1, 0));
        assert_eq!(inputs, vec![Position::new(3, 1, 0), Position::new(1, 1, 0)]);
    }

    #[test]
    fn test_network_solve_decays_per_hop() {
        let grid = line(5);
        let network = Network::discover(&grid, Position::new(3, 1, 0), WireRules::default())
            .expect("network");
        assert_eq!(network.len(), 5);
        let solution = network.solve(&HashMap::new());
        let mut by_x: Vec<(i32, u8)> = network
            .nodes
            .iter()
            .zip(solution)
            .map(|(pos, power)| (pos.x, power))
            .collect();
        by_x.sort();
        assert_eq!(by_x, vec![(1, 14), (2, 13), (3, 12), (4, 11), (5, 10)]);
    }

    #[test]
    fn test_pins_hold_and_cut_downstream() {
        let grid = line(4);
        let network = Network::discover(&grid, Position::new(1, 1, 0), WireRules::default())
            .expect("network");
        let mut pins = HashMap::new();
        pins.insert(Position::new(2, 1, 0), 3);
        let solution = network.solve(&pins);
        let at = |x: i32| solution[network.index[&Position::new(x, 1, 0)]];
        assert_eq!(at(1), 14);
        assert_eq!(at(2), 3);
        assert_eq!(at(3), 2);
        assert_eq!(at(4), 1);
    }

    #[test]
    fn test_pins_outside_network_are_ignored() {
        let grid = line(3);
        let network = Network::discover(&grid, Position::new(1, 1, 0), WireRules::default())
            .expect("network");
        let mut pins = HashMap::new();
        pins.insert(Position::new(9, 1, 0), 15);
        pins.insert(Position::new(0, 1, 0), 0);
        assert_eq!(network.solve(&pins), network.solve(&HashMap::new()));
    }

    #[test]
    fn test_discovery_respects_size_limit() {
        let grid = line(10);
        let rules = WireRules {
            max_network_size: 4,
            ..WireRules::default()
        };
        assert!(Network::discover(&grid, Position::new(1, 1, 0), rules).is_none());
    }

    #[test]
    fn test_changes_sorted_strongest_first() {
        let grid = line(3);
        let network = Network::discover(&grid, Position::new(3, 1, 0), WireRules::default())
            .expect("network");
        let solution = network.solve(&HashMap::new());
        let changes = network.changes(&grid, &solution);
        assert_eq!(
            changes,
            vec![
                (Position::new(1, 1, 0), 14),
                (Position::new(2, 1, 0), 13),
                (Position::new(3, 1, 0), 12),
            ]
        );
        assert!(network.index.contains_key(&Position::new(2, 1, 0)));
    }
}
