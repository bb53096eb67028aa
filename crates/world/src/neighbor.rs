//! Neighbor-update cascade.
//!
//! Every block write fans out to the six neighbors: a *shape update* lets the
//! neighbor recompute its own state from the changed block, and a *neighbor
//! update* tells it that something next to it changed. Reactions write more
//! blocks, which fan out again.
//!
//! The cascade runs on an explicit stack rather than the call stack. Updates
//! enqueued while one update executes form a layer; the layer is pushed so
//! that its first entry runs next, which keeps the depth-first order a
//! recursive implementation would have. Shape updates carry a depth budget and
//! the whole cascade is capped by a count of chained updates.

use crate::block::{BlockKind, BlockState};
use crate::hook::NeighborUpdateHook;
use crate::level::Level;
use redwire_core::{Direction, DirectionOrder, Position, UpdateFlags};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, error, warn};

/// Default depth budget for shape-update chains.
pub const DEFAULT_MAX_UPDATE_DEPTH: u32 = 512;

/// Default cap on updates processed by one cascade.
pub const DEFAULT_MAX_CHAINED_UPDATES: usize = 1_000_000;

/// How blocks react to updates delivered by the dispatcher.
pub trait BlockBehavior {
    /// Recompute `state` at `pos` after its neighbor in `direction` became
    /// `neighbor_state`. Returning air destroys the block.
    fn update_shape(
        &mut self,
        _level: &dyn Level,
        state: BlockState,
        _direction: Direction,
        _neighbor_state: BlockState,
        _pos: Position,
        _neighbor_pos: Position,
    ) -> BlockState {
        state
    }

    /// Something next to `pos` changed.
    fn neighbor_changed(
        &mut self,
        _cascade: &mut Cascade<'_>,
        _state: BlockState,
        _pos: Position,
        _source: BlockKind,
        _source_pos: Position,
    ) {
    }

    /// `state` was written at `pos`, replacing a block of another kind.
    fn on_place(
        &mut self,
        _cascade: &mut Cascade<'_>,
        _state: BlockState,
        _pos: Position,
        _old_state: BlockState,
    ) {
    }

    /// `old_state` at `pos` was replaced by a block of another kind.
    fn on_remove(
        &mut self,
        _cascade: &mut Cascade<'_>,
        _old_state: BlockState,
        _pos: Position,
        _new_state: BlockState,
    ) {
    }

    /// Shape updates for blocks that are not face neighbors, e.g. wires one
    /// block up or down a slope.
    fn update_indirect_shapes(
        &mut self,
        _cascade: &mut Cascade<'_>,
        _state: BlockState,
        _pos: Position,
        _flags: UpdateFlags,
        _depth: u32,
    ) {
    }

    /// The cascade drained. Drop anything cached for it.
    fn cascade_finished(&mut self) {}
}

/// Limits applied to every cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchLimits {
    /// Depth budget handed to root writes.
    pub max_depth: u32,
    /// Updates processed before the rest of the cascade is skipped.
    pub max_chained_updates: usize,
    /// Order of the shape-update fan-out.
    pub shape_order: DirectionOrder,
}

impl Default for DispatchLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_UPDATE_DEPTH,
            max_chained_updates: DEFAULT_MAX_CHAINED_UPDATES,
            shape_order: DirectionOrder::default(),
        }
    }
}

/// Cumulative dispatcher counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    /// Cascades run.
    pub cascades: u64,
    /// Updates executed.
    pub updates: u64,
    /// Successful block writes.
    pub writes: u64,
    /// Shape chains cut at the depth budget.
    pub depth_truncations: u64,
    /// Cascades that hit the chained update cap.
    pub overflows: u64,
    /// Shape updates skipped because the edge was already handled.
    pub repeated_edges: u64,
    /// Neighbor updates vetoed by the hook.
    pub vetoed: u64,
}

/// A block write recorded during the current cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRecord {
    /// Written cell.
    pub pos: Position,
    /// State before.
    pub old: BlockState,
    /// State after.
    pub new: BlockState,
}

#[derive(Debug, Clone, Copy)]
enum Update {
    Shape {
        pos: Position,
        direction: Direction,
        neighbor_pos: Position,
        neighbor_state: BlockState,
        flags: UpdateFlags,
        depth: u32,
    },
    Neighbor {
        pos: Position,
        source: BlockKind,
        source_pos: Position,
    },
    Placed {
        pos: Position,
        state: BlockState,
        old: BlockState,
    },
    Removed {
        pos: Position,
        old: BlockState,
        new: BlockState,
    },
    IndirectShapes {
        pos: Position,
        state: BlockState,
        flags: UpdateFlags,
        depth: u32,
    },
}

/// Transient per-cascade state.
#[derive(Default)]
struct CascadeState {
    stack: Vec<Update>,
    layer: Vec<Update>,
    processed: usize,
    write_counts: HashMap<Position, u32>,
    edges: HashMap<(Position, Direction), u32>,
    journal: Vec<WriteRecord>,
    depth_warned: bool,
    stats: DispatchStats,
}

impl CascadeState {
    fn reset(&mut self) {
        self.stack.clear();
        self.layer.clear();
        self.processed = 0;
        self.write_counts.clear();
        self.edges.clear();
        self.journal.clear();
        self.depth_warned = false;
    }

    fn flush_layer(&mut self) {
        while let Some(update) = self.layer.pop() {
            self.stack.push(update);
        }
    }
}

/// Handle through which blocks read the world and enqueue follow-up work
/// while a cascade runs.
pub struct Cascade<'w> {
    level: &'w mut dyn Level,
    state: &'w mut CascadeState,
    limits: DispatchLimits,
}

impl<'w> Cascade<'w> {
    /// Read access to the world.
    pub fn level(&self) -> &dyn Level {
        &*self.level
    }

    /// Depth budget for root writes.
    pub fn max_depth(&self) -> u32 {
        self.limits.max_depth
    }

    /// Write `state` with the full depth budget.
    pub fn set_block(&mut self, pos: Position, state: BlockState, flags: UpdateFlags) -> bool {
        self.set_block_with_depth(pos, state, flags, self.limits.max_depth)
    }

    /// Write `state` at `pos` and enqueue the resulting updates.
    ///
    /// Returns false when the cell is unloaded, already holds `state`, or the
    /// world refused the write. Nothing is enqueued in those cases.
    pub fn set_block_with_depth(
        &mut self,
        pos: Position,
        state: BlockState,
        flags: UpdateFlags,
        depth: u32,
    ) -> bool {
        let Some(old) = self.level.block_state(pos) else {
            return false;
        };
        if old == state || !self.level.set_block(pos, state, flags) {
            return false;
        }

        self.state.stats.writes += 1;
        *self.state.write_counts.entry(pos).or_insert(0) += 1;
        self.state.journal.push(WriteRecord { pos, old, new: state });

        if old.kind() != state.kind() {
            self.state.layer.push(Update::Removed { pos, old, new: state });
            self.state.layer.push(Update::Placed { pos, state, old });
        }

        if flags.contains(UpdateFlags::NEIGHBORS) {
            self.update_neighbors_at(pos, old.kind());
        }

        if !flags.contains(UpdateFlags::KNOWN_SHAPE) {
            if depth > 0 {
                let next = flags - UpdateFlags::NEIGHBORS - UpdateFlags::SUPPRESS_DROPS;
                self.state.layer.push(Update::IndirectShapes {
                    pos,
                    state: old,
                    flags: next,
                    depth: depth - 1,
                });
                self.update_neighbor_shapes(pos, state, next, depth - 1);
                self.state.layer.push(Update::IndirectShapes {
                    pos,
                    state,
                    flags: next,
                    depth: depth - 1,
                });
            } else {
                self.note_depth_exhausted(pos);
            }
        }
        true
    }

    /// Apply the result of a shape update: air destroys the block, anything
    /// else is written without the piston flag.
    pub fn update_or_destroy(
        &mut self,
        old: BlockState,
        new: BlockState,
        pos: Position,
        flags: UpdateFlags,
        depth: u32,
    ) {
        if new == old {
            return;
        }
        if new.is_air() {
            if !old.is_air() {
                self.destroy_block_with_depth(
                    pos,
                    !flags.contains(UpdateFlags::SUPPRESS_DROPS),
                    depth,
                );
            }
        } else {
            self.set_block_with_depth(pos, new, flags - UpdateFlags::MOVE_BY_PISTON, depth);
        }
    }

    /// Replace the block at `pos` with air, optionally dropping its items.
    pub fn destroy_block(&mut self, pos: Position, drop: bool) -> bool {
        self.destroy_block_with_depth(pos, drop, self.limits.max_depth)
    }

    fn destroy_block_with_depth(&mut self, pos: Position, drop: bool, depth: u32) -> bool {
        let Some(state) = self.level.block_state(pos) else {
            return false;
        };
        if state.is_air() {
            return false;
        }
        if drop {
            self.level.drop_items(pos, state);
        }
        self.set_block_with_depth(pos, BlockState::AIR, UpdateFlags::ALL, depth)
    }

    /// Shape-update the six neighbors of `pos`, which now holds `state`.
    pub fn update_neighbor_shapes(
        &mut self,
        pos: Position,
        state: BlockState,
        flags: UpdateFlags,
        depth: u32,
    ) {
        self.update_neighbor_shapes_in(self.limits.shape_order, pos, state, flags, depth);
    }

    /// Like [`Cascade::update_neighbor_shapes`] with an explicit order.
    pub fn update_neighbor_shapes_in(
        &mut self,
        order: DirectionOrder,
        pos: Position,
        state: BlockState,
        flags: UpdateFlags,
        depth: u32,
    ) {
        for direction in order.directions() {
            let neighbor = pos.relative(direction);
            self.shape_update(neighbor, direction.opposite(), pos, state, flags, depth);
        }
    }

    /// Tell the block at `pos` that its neighbor in `direction`, at
    /// `neighbor_pos`, became `neighbor_state`.
    pub fn shape_update(
        &mut self,
        pos: Position,
        direction: Direction,
        neighbor_pos: Position,
        neighbor_state: BlockState,
        flags: UpdateFlags,
        depth: u32,
    ) {
        self.state.layer.push(Update::Shape {
            pos,
            direction,
            neighbor_pos,
            neighbor_state,
            flags,
            depth,
        });
    }

    /// Neighbor-update the six blocks around `pos`.
    pub fn update_neighbors_at(&mut self, pos: Position, source: BlockKind) {
        for direction in Direction::UPDATE_ORDER {
            self.neighbor_changed(pos.relative(direction), source, pos);
        }
    }

    /// Neighbor-update the blocks around `pos` except the one in `skip`.
    pub fn update_neighbors_at_except(
        &mut self,
        pos: Position,
        source: BlockKind,
        skip: Direction,
    ) {
        for direction in Direction::UPDATE_ORDER {
            if direction != skip {
                self.neighbor_changed(pos.relative(direction), source, pos);
            }
        }
    }

    /// Neighbor-update the single block at `pos`.
    pub fn neighbor_changed(&mut self, pos: Position, source: BlockKind, source_pos: Position) {
        self.state.layer.push(Update::Neighbor {
            pos,
            source,
            source_pos,
        });
    }

    /// Forward a tick request to the world.
    pub fn schedule_tick(&mut self, pos: Position, kind: BlockKind, delay: u32) {
        self.level.schedule_tick(pos, kind, delay);
    }

    /// Whether a tick of `kind` at `pos` is pending.
    pub fn has_scheduled_tick(&self, pos: Position, kind: BlockKind) -> bool {
        self.level.has_scheduled_tick(pos, kind)
    }

    /// Whether an entity stands at `pos`.
    pub fn is_occupied(&self, pos: Position) -> bool {
        self.level.is_occupied(pos)
    }

    /// Number of writes recorded so far in this cascade.
    pub fn journal_len(&self) -> usize {
        self.state.journal.len()
    }

    /// Writes recorded since index `from`.
    pub fn journal_since(&self, from: usize) -> &[WriteRecord] {
        self.state.journal.get(from..).unwrap_or(&[])
    }

    fn note_depth_exhausted(&mut self, pos: Position) {
        self.state.stats.depth_truncations += 1;
        if !self.state.depth_warned {
            self.state.depth_warned = true;
            warn!(
                pos = %pos,
                max_depth = self.limits.max_depth,
                "Shape update depth exhausted; truncating the chain"
            );
        }
    }
}

/// Runs cascades to completion.
pub struct NeighborUpdateDispatcher {
    limits: DispatchLimits,
    state: CascadeState,
    veto: Option<Box<dyn NeighborUpdateHook>>,
}

impl NeighborUpdateDispatcher {
    /// Create a dispatcher with the given limits.
    pub fn new(limits: DispatchLimits) -> Self {
        Self {
            limits,
            state: CascadeState::default(),
            veto: None,
        }
    }

    /// Install a hook that may veto individual neighbor updates.
    pub fn set_neighbor_hook(&mut self, hook: Box<dyn NeighborUpdateHook>) {
        self.veto = Some(hook);
    }

    /// Active limits.
    pub fn limits(&self) -> DispatchLimits {
        self.limits
    }

    /// Cumulative counters.
    pub fn stats(&self) -> DispatchStats {
        self.state.stats
    }

    /// Run `root` as the start of a cascade, then drain every update it causes.
    pub fn run<B, R>(
        &mut self,
        level: &mut dyn Level,
        behavior: &mut B,
        root: impl FnOnce(&mut Cascade<'_>, &mut B) -> R,
    ) -> R
    where
        B: BlockBehavior + ?Sized,
    {
        self.state.reset();
        self.state.stats.cascades += 1;
        let limits = self.limits;

        let result = {
            let mut cascade = Cascade {
                level: &mut *level,
                state: &mut self.state,
                limits,
            };
            root(&mut cascade, behavior)
        };
        self.state.flush_layer();

        while let Some(update) = self.state.stack.pop() {
            if self.state.processed >= limits.max_chained_updates {
                self.state.stats.overflows += 1;
                error!(
                    limit = limits.max_chained_updates,
                    first_skipped = ?update,
                    "Too many chained neighbor updates. Skipping the rest"
                );
                self.state.stack.clear();
                break;
            }
            self.state.processed += 1;
            self.state.stats.updates += 1;

            let mut cascade = Cascade {
                level: &mut *level,
                state: &mut self.state,
                limits,
            };
            execute(&mut cascade, self.veto.as_deref_mut(), behavior, update);
            self.state.flush_layer();
        }

        behavior.cascade_finished();
        debug!(
            updates = self.state.processed,
            writes = self.state.journal.len(),
            "Cascade finished"
        );
        self.state.reset();
        result
    }
}

impl Default for NeighborUpdateDispatcher {
    fn default() -> Self {
        Self::new(DispatchLimits::default())
    }
}

fn execute<B>(
    cascade: &mut Cascade<'_>,
    veto: Option<&mut (dyn NeighborUpdateHook + 'static)>,
    behavior: &mut B,
    update: Update,
) where
    B: BlockBehavior + ?Sized,
{
    match update {
        Update::Shape {
            pos,
            direction,
            neighbor_pos,
            neighbor_state,
            flags,
            depth,
        } => {
            let Some(state) = cascade.level.block_state(pos) else {
                return;
            };
            let seen = cascade
                .state
                .write_counts
                .get(&neighbor_pos)
                .copied()
                .unwrap_or(0);
            if cascade.state.edges.insert((pos, direction), seen) == Some(seen) {
                cascade.state.stats.repeated_edges += 1;
                return;
            }
            let updated = behavior.update_shape(
                cascade.level(),
                state,
                direction,
                neighbor_state,
                pos,
                neighbor_pos,
            );
            cascade.update_or_destroy(state, updated, pos, flags, depth);
        }
        Update::Neighbor {
            pos,
            source,
            source_pos,
        } => {
            let Some(state) = cascade.level.block_state(pos) else {
                return;
            };
            if let Some(veto) = veto {
                if !veto.allow_neighbor_update(pos, state, source_pos) {
                    cascade.state.stats.vetoed += 1;
                    return;
                }
            }
            behavior.neighbor_changed(cascade, state, pos, source, source_pos);
        }
        Update::Placed { pos, state, old } => {
            let still_there = cascade
                .level
                .block_state(pos)
                .is_some_and(|current| current.kind() == state.kind());
            if still_there {
                behavior.on_place(cascade, state, pos, old);
            }
        }
        Update::Removed { pos, old, new } => behavior.on_remove(cascade, old, pos, new),
        Update::IndirectShapes {
            pos,
            state,
            flags,
            depth,
        } => behavior.update_indirect_shapes(cascade, state, pos, flags, depth),
    }
}
