//! Incremental wire graph.
//!
//! Wire nodes (inputs, dependents, source level, power) are cached for the
//! length of one cascade and kept in step with the world through the
//! cascade's write journal. A wire that must rise floods outward from itself;
//! a wire that must fall first clears everything that may have depended on
//! it and then relights the cleared region from its remaining sources and
//! its boundary, the way block light removal works.

use super::local::settle_locally;
use super::{commit, notify_power_change, settle_network, source_level};
use super::{wire_candidates, wire_inputs, wire_power, wire_state};
use super::{Network, SignalStrategy, StrategyKind, WireRules};
use crate::block::{BlockKind, BlockState, POWER};
use crate::blocks::BlockContext;
use crate::level::Level;
use crate::redstone::MAX_POWER;
use redwire_core::Position;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::warn;

/// Radius around a non-power write inside which cached nodes are dropped.
const INVALIDATION_RADIUS: i32 = 2;

#[derive(Debug, Clone)]
struct WireNode {
    inputs: Vec<Position>,
    dependents: Option<Vec<Position>>,
    source: u8,
    power: u8,
}

#[derive(Debug, Default)]
struct WireGraph {
    nodes: HashMap<Position, WireNode>,
}

impl WireGraph {
    fn ensure(&mut self, level: &dyn Level, rules: WireRules, pos: Position) -> bool {
        if self.nodes.contains_key(&pos) {
            return true;
        }
        let Some(state) = wire_state(level, pos) else {
            return false;
        };
        self.nodes.insert(
            pos,
            WireNode {
                inputs: wire_inputs(level, pos),
                dependents: None,
                source: source_level(level, pos, rules),
                power: wire_power(state),
            },
        );
        true
    }

    fn refresh(&mut self, level: &dyn Level, rules: WireRules, pos: Position) -> bool {
        self.nodes.remove(&pos);
        self.ensure(level, rules, pos)
    }

    fn power(&mut self, level: &dyn Level, rules: WireRules, pos: Position) -> u8 {
        if self.ensure(level, rules, pos) {
            self.nodes.get(&pos).map_or(0, |node| node.power)
        } else {
            0
        }
    }

    fn source(&mut self, level: &dyn Level, rules: WireRules, pos: Position) -> u8 {
        if self.ensure(level, rules, pos) {
            self.nodes.get(&pos).map_or(0, |node| node.source)
        } else {
            0
        }
    }

    fn inputs(&mut self, level: &dyn Level, rules: WireRules, pos: Position) -> Vec<Position> {
        if self.ensure(level, rules, pos) {
            self.nodes
                .get(&pos)
                .map(|node| node.inputs.clone())
                .unwrap_or_default()
        } else {
            Vec::new()
        }
    }

    fn dependents(&mut self, level: &dyn Level, rules: WireRules, pos: Position) -> Vec<Position> {
        if let Some(cached) = self.nodes.get(&pos).and_then(|node| node.dependents.clone()) {
            return cached;
        }
        let dependents: Vec<Position> = wire_candidates(level, pos)
            .into_iter()
            .filter(|candidate| {
                self.ensure(level, rules, *candidate)
                    && self
                        .nodes
                        .get(candidate)
                        .is_some_and(|node| node.inputs.contains(&pos))
            })
            .collect();
        if let Some(node) = self.nodes.get_mut(&pos) {
            node.dependents = Some(dependents.clone());
        }
        dependents
    }

    fn invalidate_around(&mut self, pos: Position) {
        let r = INVALIDATION_RADIUS;
        for dx in -r..=r {
            for dy in -r..=r {
                for dz in -r..=r {
                    self.nodes
                        .remove(&Position::new(pos.x + dx, pos.y + dy, pos.z + dz));
                }
            }
        }
    }

    /// Target of the node at `pos` from cached neighbor data.
    fn target(&mut self, level: &dyn Level, rules: WireRules, pos: Position) -> u8 {
        let source = self.source(level, rules, pos);
        let strongest = self
            .inputs(level, rules, pos)
            .into_iter()
            .map(|input| self.power(level, rules, input))
            .max()
            .unwrap_or(0);
        source.max(strongest.saturating_sub(1))
    }
}

/// Tentative values during one relight.
struct Relight<'g> {
    graph: &'g mut WireGraph,
    level: &'g dyn Level,
    rules: WireRules,
    tentative: HashMap<Position, u8>,
    cleared: HashSet<Position>,
    visited: usize,
}

impl Relight<'_> {
    fn value(&mut self, pos: Position) -> u8 {
        match self.tentative.get(&pos) {
            Some(value) => *value,
            None => self.graph.power(self.level, self.rules, pos),
        }
    }

    fn visit(&mut self) -> bool {
        self.visited += 1;
        self.visited <= self.rules.max_network_size
    }

    /// Clear every wire that may have been supported by the `lowered`
    /// entries. Returns the positions to relight from.
    fn clear(&mut self, lowered: &[(Position, u8)]) -> Option<Vec<Position>> {
        let mut queue: VecDeque<(Position, u8)> = VecDeque::new();
        for &(pos, old) in lowered {
            if self.graph.ensure(self.level, self.rules, pos) {
                self.tentative.insert(pos, 0);
            }
            self.cleared.insert(pos);
            queue.push_back((pos, old));
        }

        let mut seeds = Vec::new();
        while let Some((pos, old)) = queue.pop_front() {
            if !self.visit() {
                return None;
            }
            let is_wire = self.graph.ensure(self.level, self.rules, pos);
            let dependents = if is_wire {
                self.graph.dependents(self.level, self.rules, pos)
            } else {
                wire_candidates(self.level, pos)
            };
            for dependent in dependents {
                if self.cleared.contains(&dependent) {
                    continue;
                }
                let value = self.value(dependent);
                if value == 0 {
                    continue;
                }
                if value < old {
                    self.tentative.insert(dependent, 0);
                    self.cleared.insert(dependent);
                    queue.push_back((dependent, value));
                } else {
                    seeds.push(dependent);
                }
            }
            if is_wire {
                seeds.push(pos);
                for input in self.graph.inputs(self.level, self.rules, pos) {
                    if !self.cleared.contains(&input) && self.value(input) > 0 {
                        seeds.push(input);
                    }
                }
            }
        }
        Some(seeds)
    }

    /// Flood from the seeds, strongest first.
    fn raise(&mut self, seeds: Vec<(Position, u8)>) -> Option<()> {
        let mut buckets: Vec<Vec<Position>> = vec![Vec::new(); usize::from(MAX_POWER) + 1];
        for (pos, level) in seeds {
            if level > 0 && level >= self.value(pos) {
                self.tentative.insert(pos, level);
                buckets[usize::from(level)].push(pos);
            }
        }

        for level in (1..=usize::from(MAX_POWER)).rev() {
            while let Some(pos) = buckets[level].pop() {
                if usize::from(self.value(pos)) != level {
                    continue;
                }
                if !self.visit() {
                    return None;
                }
                let next = level as u8 - 1;
                for dependent in self.graph.dependents(self.level, self.rules, pos) {
                    if next > self.value(dependent) {
                        self.tentative.insert(dependent, next);
                        buckets[usize::from(next)].push(dependent);
                    }
                }
            }
        }
        Some(())
    }

    /// Wires whose tentative value differs from what they store.
    fn changes(mut self) -> Vec<(Position, u8)> {
        let tentative = std::mem::take(&mut self.tentative);
        let mut changes: Vec<(Position, u8)> = tentative
            .into_iter()
            .filter(|(pos, value)| self.graph.power(self.level, self.rules, *pos) != *value)
            .collect();
        changes.sort_by_key(|(pos, value)| (Reverse(*value), *pos));
        changes
    }
}

/// Incremental propagation over a cached wire graph.
#[derive(Debug, Default)]
pub struct GraphStrategy {
    graph: WireGraph,
    cursor: usize,
}

impl GraphStrategy {
    /// Bring the cache in line with every write made since the last call.
    fn sync(&mut self, cx: &BlockContext<'_, '_>) {
        let journal_len = cx.cascade.journal_len();
        if self.cursor > journal_len {
            self.graph.nodes.clear();
            self.cursor = 0;
        }
        for record in cx.cascade.journal_since(self.cursor) {
            if is_power_only(record.old, record.new) {
                if let Some(node) = self.graph.nodes.get_mut(&record.pos) {
                    node.power = wire_power(record.new);
                }
            } else {
                self.graph.invalidate_around(record.pos);
            }
        }
        self.cursor = journal_len;
    }

    fn plan(
        &mut self,
        level: &dyn Level,
        rules: WireRules,
        lowered: &[(Position, u8)],
        raised: &[(Position, u8)],
    ) -> Option<Vec<(Position, u8)>> {
        let mut relight = Relight {
            graph: &mut self.graph,
            level,
            rules,
            tentative: HashMap::new(),
            cleared: HashSet::new(),
            visited: 0,
        };
        let cleared_seeds = relight.clear(lowered)?;
        let mut seeds: Vec<(Position, u8)> = Vec::with_capacity(cleared_seeds.len() + raised.len());
        for pos in cleared_seeds {
            let level = if relight.cleared.contains(&pos) {
                relight.graph.source(relight.level, relight.rules, pos)
            } else {
                relight.value(pos)
            };
            seeds.push((pos, level));
        }
        seeds.extend_from_slice(raised);
        relight.raise(seeds)?;
        Some(relight.changes())
    }

    fn apply(
        &mut self,
        cx: &mut BlockContext<'_, '_>,
        origin: Position,
        plan: Option<Vec<(Position, u8)>>,
    ) -> u8 {
        let Some(changes) = plan else {
            cx.stats.fallbacks += 1;
            warn!(
                pos = %origin,
                limit = cx.rules.max_network_size,
                "Wire graph region too large; settling locally"
            );
            return settle_locally(cx, origin);
        };

        cx.stats.graph_relights += 1;
        let mut written = Vec::new();
        if let Some((pinned, value)) = commit(cx, &changes, &mut written) {
            if let Some(network) = Network::discover(cx.level(), pinned, cx.rules) {
                cx.stats.network_solves += 1;
                let pins = HashMap::from([(pinned, value)]);
                written.extend(settle_network(cx, &network, pins));
            }
        }
        notify_power_change(cx, &written);
        cx.level().block_state(origin).map_or(0, wire_power)
    }
}

fn is_power_only(old: BlockState, new: BlockState) -> bool {
    old.is(BlockKind::RedstoneWire)
        && new.is(BlockKind::RedstoneWire)
        && old.with(POWER, 0) == new.with(POWER, 0)
}

impl SignalStrategy for GraphStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Graph
    }

    fn settle(&mut self, cx: &mut BlockContext<'_, '_>, pos: Position) -> u8 {
        self.sync(cx);
        let rules = cx.rules;
        let plan = {
            let level = cx.level();
            if !self.graph.refresh(level, rules, pos) {
                return 0;
            }
            let old = self.graph.power(level, rules, pos);
            let target = self.graph.target(level, rules, pos);
            if target == old {
                return old;
            }
            if target > old {
                self.plan(level, rules, &[], &[(pos, target)])
            } else {
                self.plan(level, rules, &[(pos, old)], &[])
            }
        };
        self.apply(cx, pos, plan)
    }

    fn on_wire_removed(&mut self, cx: &mut BlockContext<'_, '_>, pos: Position, old: BlockState) {
        self.sync(cx);
        let power = wire_power(old);
        if power == 0 {
            return;
        }
        let plan = self.plan(cx.level(), cx.rules, &[(pos, power)], &[]);
        self.apply(cx, pos, plan);
    }

    fn cascade_finished(&mut self) {
        self.graph.nodes.clear();
        self.cursor = 0;
    }
}
