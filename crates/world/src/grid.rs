//! In-memory chunked world used by the runner and the tests.

use crate::block::{BlockKind, BlockState, POWER};
use crate::level::Level;
use crate::tick::{ScheduledTick, ScheduledTickQueue};
use redwire_core::{Position, SimTick, UpdateFlags};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

/// Chunk width along X and Z.
pub const CHUNK_SIZE: i32 = 16;
/// Lowest buildable Y.
pub const MIN_Y: i32 = -64;
/// One past the highest buildable Y.
pub const MAX_Y: i32 = 320;

/// Chunk coordinate (X,Z) in chunk space.
/// Implements Ord for deterministic iteration in BTreeMap/BTreeSet (sorts by x, then z).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chunk containing `pos`.
    pub fn containing(pos: Position) -> Self {
        Self {
            x: pos.x.div_euclid(CHUNK_SIZE),
            z: pos.z.div_euclid(CHUNK_SIZE),
        }
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Sparse column of blocks; missing entries are air.
#[derive(Debug, Default, Clone)]
struct Chunk {
    blocks: HashMap<Position, BlockState>,
}

/// A world made of loaded chunks held in memory.
///
/// Cells outside loaded chunks or outside `MIN_Y..MAX_Y` read as unloaded.
/// Individual cells can be locked to simulate writes refused by the host.
#[derive(Debug, Default)]
pub struct VoxelGrid {
    chunks: BTreeMap<ChunkPos, Chunk>,
    ticks: ScheduledTickQueue,
    occupied: HashSet<Position>,
    locked: HashSet<Position>,
    dirty: BTreeSet<ChunkPos>,
    drops: Vec<(Position, BlockState)>,
    writes: u64,
}

impl VoxelGrid {
    /// Empty world with nothing loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an empty chunk. Already loaded chunks are kept.
    pub fn load_chunk(&mut self, chunk: ChunkPos) {
        self.chunks.entry(chunk).or_default();
    }

    /// Unload a chunk, discarding its blocks.
    pub fn unload_chunk(&mut self, chunk: ChunkPos) {
        self.chunks.remove(&chunk);
    }

    /// Whether `chunk` is loaded.
    pub fn is_chunk_loaded(&self, chunk: ChunkPos) -> bool {
        self.chunks.contains_key(&chunk)
    }

    /// Load every chunk within `radius` chunks of the one holding `center`.
    pub fn load_around(&mut self, center: Position, radius: i32) {
        let origin = ChunkPos::containing(center);
        for x in -radius..=radius {
            for z in -radius..=radius {
                self.load_chunk(ChunkPos::new(origin.x + x, origin.z + z));
            }
        }
    }

    /// Load every chunk touching the box spanned by `a` and `b`.
    pub fn load_area(&mut self, a: Position, b: Position) {
        let lo = ChunkPos::containing(Position::new(a.x.min(b.x), 0, a.z.min(b.z)));
        let hi = ChunkPos::containing(Position::new(a.x.max(b.x), 0, a.z.max(b.z)));
        for x in lo.x..=hi.x {
            for z in lo.z..=hi.z {
                self.load_chunk(ChunkPos::new(x, z));
            }
        }
    }

    /// Store a block without any update logic. Used to build fixtures.
    /// Returns false when `pos` is not loaded.
    pub fn put(&mut self, pos: Position, state: BlockState) -> bool {
        if !Self::in_height(pos) {
            return false;
        }
        let Some(chunk) = self.chunks.get_mut(&ChunkPos::containing(pos)) else {
            return false;
        };
        if state.is_air() {
            chunk.blocks.remove(&pos);
        } else {
            chunk.blocks.insert(pos, state);
        }
        true
    }

    /// State at `pos`, air when unloaded.
    pub fn state(&self, pos: Position) -> BlockState {
        self.state_or_air(pos)
    }

    /// Wire power at `pos`, or `None` when there is no wire.
    pub fn power_at(&self, pos: Position) -> Option<u8> {
        let state = self.state(pos);
        state.is(BlockKind::RedstoneWire).then(|| state.get(POWER))
    }

    /// Refuse every future write to `pos`.
    pub fn lock(&mut self, pos: Position) {
        self.locked.insert(pos);
    }

    /// Accept writes to `pos` again.
    pub fn unlock(&mut self, pos: Position) {
        self.locked.remove(&pos);
    }

    /// Mark whether an entity stands at `pos`.
    pub fn set_occupied(&mut self, pos: Position, occupied: bool) {
        if occupied {
            self.occupied.insert(pos);
        } else {
            self.occupied.remove(&pos);
        }
    }

    /// Items dropped by destroyed blocks, in order.
    pub fn drops(&self) -> &[(Position, BlockState)] {
        &self.drops
    }

    /// Writes accepted so far.
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    /// Drain the set of chunks whose changes must be sent to clients.
    pub fn take_dirty_chunks(&mut self) -> Vec<ChunkPos> {
        std::mem::take(&mut self.dirty).into_iter().collect()
    }

    /// Current tick of the scheduled tick queue.
    pub fn now(&self) -> SimTick {
        self.ticks.now()
    }

    /// Pending scheduled ticks.
    pub fn pending_ticks(&self) -> usize {
        self.ticks.len()
    }

    /// Advance one tick and return the ticks that came due.
    pub fn advance_tick(&mut self) -> Vec<ScheduledTick> {
        self.ticks.advance()
    }

    /// Loaded non-air blocks, sorted by position.
    pub fn blocks(&self) -> Vec<(Position, BlockState)> {
        let mut blocks: Vec<_> = self
            .chunks
            .values()
            .flat_map(|chunk| chunk.blocks.iter().map(|(pos, state)| (*pos, *state)))
            .collect();
        blocks.sort_by_key(|(pos, _)| *pos);
        blocks
    }

    fn in_height(pos: Position) -> bool {
        (MIN_Y..MAX_Y).contains(&pos.y)
    }
}

impl Level for VoxelGrid {
    fn block_state(&self, pos: Position) -> Option<BlockState> {
        if !Self::in_height(pos) {
            return None;
        }
        let chunk = self.chunks.get(&ChunkPos::containing(pos))?;
        Some(chunk.blocks.get(&pos).copied().unwrap_or(BlockState::AIR))
    }

    fn set_block(&mut self, pos: Position, state: BlockState, flags: UpdateFlags) -> bool {
        if self.locked.contains(&pos) || !self.put(pos, state) {
            return false;
        }
        self.writes += 1;
        if flags.contains(UpdateFlags::CLIENTS) && !flags.contains(UpdateFlags::INVISIBLE) {
            self.dirty.insert(ChunkPos::containing(pos));
        }
        true
    }

    fn schedule_tick(&mut self, pos: Position, kind: BlockKind, delay: u32) {
        self.ticks.schedule(pos, kind, delay);
    }

    fn has_scheduled_tick(&self, pos: Position, kind: BlockKind) -> bool {
        self.ticks.contains(pos, kind)
    }

    fn is_occupied(&self, pos: Position) -> bool {
        self.occupied.contains(&pos)
    }

    fn drop_items(&mut self, pos: Position, state: BlockState) {
        self.drops.push((pos, state));
    }
}
