//! The circuit engine: one dispatcher, one resolver, one propagation strategy
//! and the hook that authorizes every power change.

use crate::block::{BlockKind, BlockState, POWERED, RAIL_SHAPE};
use crate::blocks::consumers::Lamp;
use crate::blocks::rail::{self, DetectorRail};
use crate::blocks::sources::{self, Button, Lever};
use crate::blocks::{tickable, wire, BlockContext};
use crate::config::EngineConfig;
use crate::connectivity::{wire_can_survive, wire_update_shape, ConnectivityResolver, VoxelShape};
use crate::error::{ConfigError, EngineError, EngineResult};
use crate::grid::VoxelGrid;
use crate::hook::{NeighborUpdateHook, Passthrough, RedstoneChangeHook};
use crate::level::Level;
use crate::neighbor::{BlockBehavior, Cascade, DispatchStats, NeighborUpdateDispatcher};
use crate::redstone::{self, SignalContext};
use crate::signal::{strategy_for, SignalStrategy, StrategyKind, WireRules};
use crate::tick::ScheduledTick;
use redwire_core::{Direction, DirectionOrder, Position, UpdateFlags};
use serde::Serialize;
use tracing::debug;

/// Counters kept by the engine across cascades.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Wire evaluations requested.
    pub settles: u64,
    /// Wire power writes that the world accepted.
    pub power_writes: u64,
    /// Times the change hook was consulted.
    pub hook_calls: u64,
    /// Times the hook answered something other than the proposal.
    pub hook_overrides: u64,
    /// Whole networks solved at once.
    pub network_solves: u64,
    /// Incremental graph relights.
    pub graph_relights: u64,
    /// Batch evaluations that fell back to local settling.
    pub fallbacks: u64,
    /// Scheduled ticks run.
    pub ticks: u64,
}

/// Per-kind reactions to dispatcher updates.
struct CircuitLogic {
    resolver: ConnectivityResolver,
    strategy: Box<dyn SignalStrategy>,
    hook: Box<dyn RedstoneChangeHook>,
    rules: WireRules,
    stats: EngineStats,
}

impl CircuitLogic {
    fn split<'c, 'w>(
        &'c mut self,
        cascade: &'c mut Cascade<'w>,
    ) -> (BlockContext<'c, 'w>, &'c mut dyn SignalStrategy) {
        let CircuitLogic {
            strategy,
            hook,
            rules,
            stats,
            ..
        } = self;
        let cx = BlockContext {
            cascade,
            hook: hook.as_mut(),
            rules: *rules,
            stats,
        };
        (cx, strategy.as_mut())
    }

    fn context<'c, 'w>(&'c mut self, cascade: &'c mut Cascade<'w>) -> BlockContext<'c, 'w> {
        self.split(cascade).0
    }

    fn settle(&mut self, cascade: &mut Cascade<'_>, pos: Position) -> u8 {
        self.stats.settles += 1;
        let (mut cx, strategy) = self.split(cascade);
        strategy.settle(&mut cx, pos)
    }
}

impl BlockBehavior for CircuitLogic {
    fn update_shape(
        &mut self,
        level: &dyn Level,
        state: BlockState,
        direction: Direction,
        neighbor_state: BlockState,
        pos: Position,
        _neighbor_pos: Position,
    ) -> BlockState {
        match state.kind() {
            BlockKind::RedstoneWire => wire_update_shape(level, state, direction, neighbor_state, pos),
            BlockKind::Lever | BlockKind::Button => {
                sources::attached_update_shape(state, direction, neighbor_state)
            }
            _ => state,
        }
    }

    fn neighbor_changed(
        &mut self,
        cascade: &mut Cascade<'_>,
        state: BlockState,
        pos: Position,
        source: BlockKind,
        source_pos: Position,
    ) {
        match state.kind() {
            BlockKind::RedstoneWire => {
                if !wire_can_survive(cascade.level(), pos) {
                    cascade.destroy_block(pos, true);
                    return;
                }
                self.stats.settles += 1;
                let (mut cx, strategy) = self.split(cascade);
                strategy.on_neighbor_changed(&mut cx, pos, source_pos);
            }
            BlockKind::Lamp => Lamp.neighbor_changed(&mut self.context(cascade), state, pos),
            kind if kind.is_rail() => {
                rail::neighbor_changed(&mut self.context(cascade), state, pos, source)
            }
            _ => {}
        }
    }

    fn on_place(
        &mut self,
        cascade: &mut Cascade<'_>,
        state: BlockState,
        pos: Position,
        _old_state: BlockState,
    ) {
        match state.kind() {
            BlockKind::RedstoneWire => {
                self.stats.settles += 1;
                {
                    let (mut cx, strategy) = self.split(cascade);
                    strategy.on_wire_added(&mut cx, pos);
                }
                cascade.update_neighbors_at(pos.above(), BlockKind::RedstoneWire);
                cascade.update_neighbors_at(pos.below(), BlockKind::RedstoneWire);
                wire::update_neighbors_of_neighboring_wires(cascade, pos);
            }
            BlockKind::Lamp => {
                let current = cascade.level().state_or_air(pos);
                Lamp.neighbor_changed(&mut self.context(cascade), current, pos);
            }
            kind if kind.is_rail() => rail::on_place(&mut self.context(cascade), pos),
            _ => {}
        }
    }

    fn on_remove(
        &mut self,
        cascade: &mut Cascade<'_>,
        old_state: BlockState,
        pos: Position,
        _new_state: BlockState,
    ) {
        match old_state.kind() {
            BlockKind::RedstoneWire => {
                for direction in Direction::ALL {
                    cascade.update_neighbors_at(pos.relative(direction), BlockKind::RedstoneWire);
                }
                {
                    let (mut cx, strategy) = self.split(cascade);
                    strategy.on_wire_removed(&mut cx, pos, old_state);
                }
                wire::update_neighbors_of_neighboring_wires(cascade, pos);
            }
            BlockKind::Lever | BlockKind::Button if old_state.get(POWERED) => {
                sources::update_attached_neighbors(cascade, old_state, pos);
            }
            kind if kind.is_rail() => rail::on_remove(cascade, old_state, pos),
            _ => {}
        }
    }

    fn update_indirect_shapes(
        &mut self,
        cascade: &mut Cascade<'_>,
        state: BlockState,
        pos: Position,
        flags: UpdateFlags,
        depth: u32,
    ) {
        if state.is(BlockKind::RedstoneWire) {
            wire::update_indirect_shapes(cascade, state, pos, flags, depth);
        }
    }

    fn cascade_finished(&mut self) {
        self.strategy.cascade_finished();
    }
}

/// Redstone circuit engine.
///
/// Every public mutation runs as one cascade: the root change is applied,
/// then every update it causes is drained before the call returns.
pub struct RedstoneEngine {
    config: EngineConfig,
    dispatcher: NeighborUpdateDispatcher,
    logic: CircuitLogic,
}

impl RedstoneEngine {
    /// Build an engine. Out-of-range sizes are tolerated; use
    /// [`RedstoneEngine::try_new`] to reject them.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            dispatcher: NeighborUpdateDispatcher::new(config.limits()),
            logic: CircuitLogic {
                resolver: ConnectivityResolver::new(config.shape_cache_capacity),
                strategy: strategy_for(config.strategy),
                hook: Box::new(Passthrough),
                rules: config.rules(),
                stats: EngineStats::default(),
            },
        }
    }

    /// Build an engine from a validated configuration.
    pub fn try_new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Replace the change hook.
    pub fn with_hook(mut self, hook: impl RedstoneChangeHook + 'static) -> Self {
        self.set_hook(hook);
        self
    }

    /// Replace the change hook in place.
    pub fn set_hook(&mut self, hook: impl RedstoneChangeHook + 'static) {
        self.logic.hook = Box::new(hook);
    }

    /// Install a hook that may veto neighbor updates.
    pub fn with_neighbor_hook(mut self, hook: impl NeighborUpdateHook + 'static) -> Self {
        self.dispatcher.set_neighbor_hook(Box::new(hook));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.logic.strategy.kind()
    }

    pub fn stats(&self) -> EngineStats {
        self.logic.stats
    }

    pub fn dispatch_stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    /// Connection resolver and its shape cache.
    pub fn resolver(&self) -> &ConnectivityResolver {
        &self.logic.resolver
    }

    /// Write `state` at `pos` with `flags` and drain the cascade.
    pub fn set_block(
        &mut self,
        level: &mut dyn Level,
        pos: Position,
        state: BlockState,
        flags: UpdateFlags,
    ) -> bool {
        self.dispatcher
            .run(level, &mut self.logic, |cascade, _| cascade.set_block(pos, state, flags))
    }

    /// Place a block the way a player would.
    ///
    /// Wires take the shape their neighbors ask for and start unpowered,
    /// rails lay themselves out once written, and lamps start lit when
    /// powered. Returns `Ok(false)` when the block cannot stand at `pos` or
    /// the world refused the write.
    pub fn place_block(
        &mut self,
        level: &mut dyn Level,
        pos: Position,
        state: BlockState,
    ) -> EngineResult<bool> {
        loaded_state(level, pos)?;
        let placed = match state.kind() {
            BlockKind::RedstoneWire => {
                if !wire_can_survive(level, pos) {
                    return Ok(false);
                }
                self.logic.resolver.wire_placement(level, pos)
            }
            kind if kind.is_rail() => {
                if !rail::can_survive(level, pos, state.get(RAIL_SHAPE)) {
                    return Ok(false);
                }
                state
            }
            BlockKind::Lamp => state.with(
                POWERED,
                redstone::has_neighbor_signal(level, pos, SignalContext::EMITTING),
            ),
            _ => state,
        };
        debug!(pos = %pos, block = %placed.kind(), "Placing block");
        Ok(self.set_block(level, pos, placed, UpdateFlags::ALL))
    }

    /// Remove the block at `pos` without drops.
    pub fn remove_block(&mut self, level: &mut dyn Level, pos: Position) -> EngineResult<bool> {
        if loaded_state(level, pos)?.is_air() {
            return Ok(false);
        }
        Ok(self
            .dispatcher
            .run(level, &mut self.logic, |cascade, _| cascade.destroy_block(pos, false)))
    }

    /// Shape-update the neighbors of `pos` in `order`, then neighbor-update
    /// them when `flags` carries [`UpdateFlags::NEIGHBORS`].
    pub fn notify(
        &mut self,
        level: &mut dyn Level,
        pos: Position,
        order: DirectionOrder,
        source: BlockKind,
        flags: UpdateFlags,
        max_depth: u32,
    ) {
        self.dispatcher.run(level, &mut self.logic, |cascade, _| {
            let state = cascade.level().state_or_air(pos);
            cascade.update_neighbor_shapes_in(order, pos, state, flags, max_depth);
            if flags.contains(UpdateFlags::NEIGHBORS) {
                cascade.update_neighbors_at(pos, source);
            }
        });
    }

    /// Deliver one neighbor update to the block at `pos`.
    pub fn neighbor_changed(
        &mut self,
        level: &mut dyn Level,
        pos: Position,
        source: BlockKind,
        source_pos: Position,
    ) {
        self.dispatcher.run(level, &mut self.logic, |cascade, _| {
            cascade.neighbor_changed(pos, source, source_pos);
        });
    }

    /// Bring the wire at `pos` (and whatever its change implies) to its
    /// stable power, returning the power it stores afterwards.
    pub fn settle(&mut self, level: &mut dyn Level, pos: Position) -> EngineResult<u8> {
        let state = loaded_state(level, pos)?;
        if !state.is(BlockKind::RedstoneWire) {
            return Err(EngineError::NotAWire {
                pos,
                found: state.kind(),
            });
        }
        Ok(self
            .dispatcher
            .run(level, &mut self.logic, |cascade, logic| logic.settle(cascade, pos)))
    }

    /// Connection state `candidate` would take at `pos`.
    pub fn resolve_connections(
        &self,
        level: &dyn Level,
        pos: Position,
        candidate: BlockState,
    ) -> BlockState {
        self.logic.resolver.resolve_connections(level, pos, candidate)
    }

    /// Outline of a wire state.
    pub fn wire_shape(&mut self, state: BlockState) -> VoxelShape {
        self.logic.resolver.shape(state)
    }

    /// Flip the lever at `pos`.
    pub fn toggle_lever(&mut self, level: &mut dyn Level, pos: Position) -> EngineResult<bool> {
        let state = expect_kind(level, pos, BlockKind::Lever)?;
        Ok(self.dispatcher.run(level, &mut self.logic, |cascade, logic| {
            Lever.toggle(&mut logic.context(cascade), state, pos)
        }))
    }

    /// Press the button at `pos`.
    pub fn press_button(&mut self, level: &mut dyn Level, pos: Position) -> EngineResult<bool> {
        let state = expect_kind(level, pos, BlockKind::Button)?;
        Ok(self.dispatcher.run(level, &mut self.logic, |cascade, logic| {
            Button.press(&mut logic.context(cascade), state, pos)
        }))
    }

    /// Toggle the wire at `pos` between dot and cross.
    pub fn use_wire(&mut self, level: &mut dyn Level, pos: Position) -> EngineResult<bool> {
        let state = loaded_state(level, pos)?;
        if !state.is(BlockKind::RedstoneWire) {
            return Err(EngineError::NotAWire {
                pos,
                found: state.kind(),
            });
        }
        let Some(toggled) = wire::toggled(level, pos, state) else {
            return Ok(false);
        };
        Ok(self.dispatcher.run(level, &mut self.logic, |cascade, _| {
            if !cascade.set_block(pos, toggled, UpdateFlags::ALL) {
                return false;
            }
            wire::updates_on_shape_change(cascade, pos, state, toggled);
            true
        }))
    }

    /// An entity entered the cell at `pos`. Only detector rails care.
    ///
    /// Returns true when a released detector rail re-checked its occupancy.
    pub fn entity_inside(&mut self, level: &mut dyn Level, pos: Position) -> EngineResult<bool> {
        let state = loaded_state(level, pos)?;
        if !state.is(BlockKind::DetectorRail) || state.get(POWERED) {
            return Ok(false);
        }
        self.dispatcher.run(level, &mut self.logic, |cascade, logic| {
            DetectorRail.check_pressed(&mut logic.context(cascade), state, pos);
        });
        Ok(true)
    }

    /// Run a tick that came due. Ticks for blocks that changed kind since
    /// they were scheduled are dropped.
    pub fn run_scheduled_tick(&mut self, level: &mut dyn Level, tick: &ScheduledTick) -> bool {
        let Some(state) = level.block_state(tick.pos).filter(|state| state.is(tick.kind)) else {
            return false;
        };
        let Some(block) = tickable(tick.kind) else {
            return false;
        };
        self.logic.stats.ticks += 1;
        self.dispatcher.run(level, &mut self.logic, |cascade, logic| {
            block.tick(&mut logic.context(cascade), state, tick.pos);
        });
        true
    }

    /// Advance `grid` by one tick and run everything that came due.
    /// Returns the number of ticks run.
    pub fn step(&mut self, grid: &mut VoxelGrid) -> usize {
        let mut ran = 0;
        for tick in grid.advance_tick() {
            if self.run_scheduled_tick(grid, &tick) {
                ran += 1;
            }
        }
        ran
    }

    /// Weak signal the block at `pos` sends towards a querier that looks at
    /// it in `direction`.
    pub fn signal(&self, level: &dyn Level, pos: Position, direction: Direction) -> u8 {
        redstone::signal_at(level, pos, direction, SignalContext::EMITTING)
    }

    /// Whether any neighbor powers `pos`.
    pub fn has_neighbor_signal(&self, level: &dyn Level, pos: Position) -> bool {
        redstone::has_neighbor_signal(level, pos, SignalContext::EMITTING)
    }
}

impl Default for RedstoneEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn loaded_state(level: &dyn Level, pos: Position) -> EngineResult<BlockState> {
    level.block_state(pos).ok_or(EngineError::Unloaded(pos))
}

fn expect_kind(level: &dyn Level, pos: Position, expected: BlockKind) -> EngineResult<BlockState> {
    let state = loaded_state(level, pos)?;
    if state.is(expected) {
        Ok(state)
    } else {
        Err(EngineError::UnexpectedBlock {
            pos,
            expected,
            found: state.kind(),
        })
    }
}
