//! Connection shapes for wires and rails.
//!
//! A wire looks at its four horizontal neighbors and decides for each side
//! whether it runs along the floor, climbs the neighbor, or stays open. The
//! result is canonicalized so a wire never shows a single dangling arm: a lone
//! connection is always paired with its opposite side.

use crate::block::{BlockKind, BlockState, RedstoneSide, FACING, POWER};
use crate::block::{side_property, EAST, NORTH, SOUTH, WEST};
use crate::blocks::rail;
use crate::level::Level;
use crate::redstone::{has_neighbor_signal, is_signal_source, SignalContext};
use lru::LruCache;
use redwire_core::{Axis, Direction, Position};
use std::num::NonZeroUsize;

/// True when no side is connected.
pub fn is_dot(state: BlockState) -> bool {
    Direction::HORIZONTAL.iter().all(|dir| !side(state, *dir).is_connected())
}

/// True when all four sides are connected.
pub fn is_cross(state: BlockState) -> bool {
    Direction::HORIZONTAL.iter().all(|dir| side(state, *dir).is_connected())
}

/// Unpowered wire running in all four directions.
pub fn cross_state() -> BlockState {
    BlockState::new(BlockKind::RedstoneWire)
        .with(NORTH, RedstoneSide::Side)
        .with(EAST, RedstoneSide::Side)
        .with(SOUTH, RedstoneSide::Side)
        .with(WEST, RedstoneSide::Side)
}

fn side(state: BlockState, direction: Direction) -> RedstoneSide {
    side_property(direction).map_or(RedstoneSide::None, |prop| state.get(prop))
}

fn with_side(state: BlockState, direction: Direction, value: RedstoneSide) -> BlockState {
    match side_property(direction) {
        Some(prop) => state.with(prop, value),
        None => state,
    }
}

/// Whether a wire reaches out to `state`. `direction` points from the wire
/// towards the block; `None` means the block sits diagonally.
fn should_connect_to(state: BlockState, direction: Option<Direction>) -> bool {
    match state.kind() {
        BlockKind::RedstoneWire => true,
        BlockKind::Repeater => {
            direction.is_some_and(|dir| state.get(FACING).axis() == dir.axis() && dir.axis() != Axis::Y)
        }
        BlockKind::Observer => direction.is_some_and(|dir| state.get(FACING) == dir.opposite()),
        _ => is_signal_source(state, SignalContext::EMITTING) && direction.is_some(),
    }
}

/// Connection of the wire at `pos` towards `direction`.
pub fn connecting_side(level: &dyn Level, pos: Position, direction: Direction) -> RedstoneSide {
    let open_above = !level.state_or_air(pos.above()).is_conductor();
    connecting_side_with(level, pos, direction, open_above)
}

fn connecting_side_with(
    level: &dyn Level,
    pos: Position,
    direction: Direction,
    open_above: bool,
) -> RedstoneSide {
    let neighbor_pos = pos.relative(direction);
    let neighbor = level.state_or_air(neighbor_pos);

    if open_above
        && neighbor.can_support_wire()
        && should_connect_to(level.state_or_air(neighbor_pos.above()), None)
    {
        return if neighbor.is_face_sturdy(direction.opposite()) {
            RedstoneSide::Up
        } else {
            RedstoneSide::Side
        };
    }

    let reaches_down = !neighbor.is_conductor()
        && should_connect_to(level.state_or_air(neighbor_pos.below()), None);
    if should_connect_to(neighbor, Some(direction)) || reaches_down {
        RedstoneSide::Side
    } else {
        RedstoneSide::None
    }
}

/// Fill in every side of `state` that is currently open but should connect.
fn missing_connections(level: &dyn Level, mut state: BlockState, pos: Position) -> BlockState {
    let open_above = !level.state_or_air(pos.above()).is_conductor();
    for direction in Direction::HORIZONTAL {
        if !side(state, direction).is_connected() {
            let resolved = connecting_side_with(level, pos, direction, open_above);
            state = with_side(state, direction, resolved);
        }
    }
    state
}

/// Resolve the connection shape of the wire at `pos`, starting from `candidate`.
///
/// A candidate that is a dot and still has nothing to connect to stays a dot.
/// Otherwise each open side whose perpendicular pair is also open is forced
/// to [`RedstoneSide::Side`], so a single connection always runs straight
/// through and an unconnected wire becomes a cross.
pub fn resolve_wire(level: &dyn Level, pos: Position, candidate: BlockState) -> BlockState {
    let was_dot = is_dot(candidate);
    let base = BlockState::new(BlockKind::RedstoneWire).with(POWER, candidate.get(POWER));
    let mut state = missing_connections(level, base, pos);
    if was_dot && is_dot(state) {
        return state;
    }

    let north = side(state, Direction::North).is_connected();
    let south = side(state, Direction::South).is_connected();
    let east = side(state, Direction::East).is_connected();
    let west = side(state, Direction::West).is_connected();
    let no_north_south = !north && !south;
    let no_east_west = !east && !west;

    if !west && no_north_south {
        state = state.with(WEST, RedstoneSide::Side);
    }
    if !east && no_north_south {
        state = state.with(EAST, RedstoneSide::Side);
    }
    if !north && no_east_west {
        state = state.with(NORTH, RedstoneSide::Side);
    }
    if !south && no_east_west {
        state = state.with(SOUTH, RedstoneSide::Side);
    }
    state
}

/// Whether wire can rest at `pos`. Unloaded support counts as missing.
pub fn wire_can_survive(level: &dyn Level, pos: Position) -> bool {
    level.state_or_air(pos.below()).can_support_wire()
}

/// New state of the wire at `pos` after its neighbor in `direction` changed.
/// Returns air when the wire lost its support.
pub fn wire_update_shape(
    level: &dyn Level,
    state: BlockState,
    direction: Direction,
    neighbor_state: BlockState,
    pos: Position,
) -> BlockState {
    match direction {
        Direction::Down => {
            if neighbor_state.can_support_wire() {
                state
            } else {
                BlockState::AIR
            }
        }
        Direction::Up => resolve_wire(level, pos, state),
        _ => {
            let resolved = connecting_side(level, pos, direction);
            let current = side(state, direction);
            if resolved.is_connected() == current.is_connected() && !is_cross(state) {
                with_side(state, direction, resolved)
            } else {
                let candidate = with_side(
                    cross_state().with(POWER, state.get(POWER)),
                    direction,
                    resolved,
                );
                resolve_wire(level, pos, candidate)
            }
        }
    }
}

/// Axis-aligned box in 1/16 block units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Aabb {
    /// Minimum corner.
    pub min: [u8; 3],
    /// Maximum corner.
    pub max: [u8; 3],
}

impl Aabb {
    const fn new(min_x: u8, min_y: u8, min_z: u8, max_x: u8, max_y: u8, max_z: u8) -> Self {
        Self {
            min: [min_x, min_y, min_z],
            max: [max_x, max_y, max_z],
        }
    }
}

const SHAPE_DOT: Aabb = Aabb::new(3, 0, 3, 13, 1, 13);

fn floor_arm(direction: Direction) -> Aabb {
    match direction {
        Direction::North => Aabb::new(3, 0, 0, 13, 1, 13),
        Direction::South => Aabb::new(3, 0, 3, 13, 1, 16),
        Direction::East => Aabb::new(3, 0, 3, 16, 1, 13),
        _ => Aabb::new(0, 0, 3, 13, 1, 13),
    }
}

fn climbing_arm(direction: Direction) -> Aabb {
    match direction {
        Direction::North => Aabb::new(3, 0, 0, 13, 16, 1),
        Direction::South => Aabb::new(3, 0, 15, 13, 16, 16),
        Direction::East => Aabb::new(15, 0, 3, 16, 16, 13),
        _ => Aabb::new(0, 0, 3, 1, 16, 13),
    }
}

/// Union of boxes describing a block's outline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VoxelShape {
    boxes: Vec<Aabb>,
}

impl VoxelShape {
    /// Component boxes.
    pub fn boxes(&self) -> &[Aabb] {
        &self.boxes
    }

    /// Outline of a wire state. Power does not change the outline.
    pub fn of_wire(state: BlockState) -> Self {
        let mut boxes = vec![SHAPE_DOT];
        for direction in Direction::HORIZONTAL {
            match side(state, direction) {
                RedstoneSide::None => {}
                RedstoneSide::Side => boxes.push(floor_arm(direction)),
                RedstoneSide::Up => {
                    boxes.push(floor_arm(direction));
                    boxes.push(climbing_arm(direction));
                }
            }
        }
        Self { boxes }
    }
}

/// Bounded memo from power-stripped wire states to their outline.
pub struct ShapeCache {
    entries: LruCache<BlockState, VoxelShape>,
    hits: u64,
    misses: u64,
}

impl ShapeCache {
    /// Create a cache holding at most `capacity` shapes.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Outline for `state`, computed on first use.
    pub fn get(&mut self, state: BlockState) -> VoxelShape {
        let key = state.with(POWER, 0);
        if let Some(shape) = self.entries.get(&key) {
            self.hits += 1;
            return shape.clone();
        }
        self.misses += 1;
        let shape = VoxelShape::of_wire(key);
        self.entries.put(key, shape.clone());
        shape
    }

    /// Number of cached shapes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(hits, misses)` since creation.
    pub fn hit_stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

/// Derives connection state for wires and rails from their neighbors.
pub struct ConnectivityResolver {
    shapes: ShapeCache,
}

impl ConnectivityResolver {
    /// Create a resolver with a shape cache of the given capacity.
    pub fn new(shape_cache_capacity: usize) -> Self {
        Self {
            shapes: ShapeCache::new(shape_cache_capacity),
        }
    }

    /// Connection state for `candidate` placed at `pos`.
    ///
    /// Wires get their four sides resolved, rails get the track layout their
    /// neighbors ask for; other kinds are returned unchanged.
    pub fn resolve_connections(
        &self,
        level: &dyn Level,
        pos: Position,
        candidate: BlockState,
    ) -> BlockState {
        if candidate.is(BlockKind::RedstoneWire) {
            resolve_wire(level, pos, candidate)
        } else if candidate.kind().is_rail() {
            let powered = has_neighbor_signal(level, pos, SignalContext::EMITTING);
            rail::resolved_state(level, pos, candidate, powered)
        } else {
            candidate
        }
    }

    /// State a freshly placed wire takes at `pos`.
    pub fn wire_placement(&self, level: &dyn Level, pos: Position) -> BlockState {
        resolve_wire(level, pos, cross_state())
    }

    /// Outline of a wire state.
    pub fn shape(&mut self, state: BlockState) -> VoxelShape {
        self.shapes.get(state)
    }

    /// Shape cache counters.
    pub fn shape_cache(&self) -> &ShapeCache {
        &self.shapes
    }
}

impl Default for ConnectivityResolver {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::VoxelGrid;

    fn floor() -> VoxelGrid {
        let mut grid = VoxelGrid::new();
        grid.load_around(Position::ORIGIN, 1);
        for x in -4..=4 {
            for z in -4..=4 {
                grid.put(Position::new(x, 0, z), BlockState::new(BlockKind::Stone));
            }
        }
        grid
    }

    fn wire() -> BlockState {
        BlockState::new(BlockKind::RedstoneWire)
    }

    #[test]
    fn test_lone_wire_becomes_cross() {
        let grid = floor();
        let state = resolve_wire(&grid, Position::new(0, 1, 0), cross_state());
        assert!(is_cross(state));
    }

    #[test]
    fn test_single_neighbor_runs_straight_through() {
        let mut grid = floor();
        let pos = Position::new(0, 1, 0);
        grid.put(pos.relative(Direction::North), wire());
        let state = resolve_wire(&grid, pos, cross_state());
        assert_eq!(state.get(NORTH), RedstoneSide::Side);
        assert_eq!(state.get(SOUTH), RedstoneSide::Side);
        assert_eq!(state.get(EAST), RedstoneSide::None);
        assert_eq!(state.get(WEST), RedstoneSide::None);
    }

    #[test]
    fn test_explicit_dot_stays_dot_without_neighbors() {
        let grid = floor();
        let state = resolve_wire(&grid, Position::new(0, 1, 0), wire());
        assert!(is_dot(state));
    }

    #[test]
    fn test_dot_gains_arms_when_neighbor_appears() {
        let mut grid = floor();
        let pos = Position::new(0, 1, 0);
        grid.put(pos.relative(Direction::East), wire());
        let state = resolve_wire(&grid, pos, wire());
        assert_eq!(state.get(EAST), RedstoneSide::Side);
        assert_eq!(state.get(WEST), RedstoneSide::Side);
        assert!(!is_dot(state));
    }

    #[test]
    fn test_climbs_onto_block_with_wire_on_top() {
        let mut grid = floor();
        let pos = Position::new(0, 1, 0);
        let step = pos.relative(Direction::East);
        grid.put(step, BlockState::new(BlockKind::Stone));
        grid.put(step.above(), wire());
        assert_eq!(connecting_side(&grid, pos, Direction::East), RedstoneSide::Up);

        // A conductor above the wire blocks the climb.
        grid.put(pos.above(), BlockState::new(BlockKind::Stone));
        assert_eq!(connecting_side(&grid, pos, Direction::East), RedstoneSide::None);
    }

    #[test]
    fn test_steps_down_past_open_neighbor() {
        let mut grid = floor();
        let pos = Position::new(0, 2, 0);
        grid.put(pos.below(), BlockState::new(BlockKind::Stone));
        grid.put(pos.relative(Direction::West), BlockState::AIR);
        grid.put(Position::new(-1, 1, 0), wire());
        assert_eq!(connecting_side(&grid, pos, Direction::West), RedstoneSide::Side);
    }

    #[test]
    fn test_repeater_connects_only_on_its_axis() {
        let mut grid = floor();
        let pos = Position::new(0, 1, 0);
        grid.put(
            pos.relative(Direction::North),
            BlockState::new(BlockKind::Repeater).with(FACING, Direction::South),
        );
        assert_eq!(connecting_side(&grid, pos, Direction::North), RedstoneSide::Side);
        grid.put(
            pos.relative(Direction::North),
            BlockState::new(BlockKind::Repeater).with(FACING, Direction::East),
        );
        assert_eq!(connecting_side(&grid, pos, Direction::North), RedstoneSide::None);
    }

    #[test]
    fn test_lost_support_turns_to_air() {
        let grid = floor();
        let pos = Position::new(0, 1, 0);
        let state = wire_update_shape(&grid, cross_state(), Direction::Down, BlockState::AIR, pos);
        assert!(state.is_air());
    }

    #[test]
    fn test_shape_cache_ignores_power() {
        let mut cache = ShapeCache::new(4);
        let dim = cross_state().with(POWER, 1);
        let bright = cross_state().with(POWER, 15);
        assert_eq!(cache.get(dim), cache.get(bright));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.hit_stats(), (1, 1));
        assert_eq!(cache.get(dim).boxes().len(), 5);
    }

    #[test]
    fn test_shape_cache_evicts_least_recent() {
        let mut cache = ShapeCache::new(1);
        cache.get(cross_state());
        cache.get(wire());
        assert_eq!(cache.len(), 1);
        cache.get(cross_state());
        assert_eq!(cache.hit_stats(), (0, 3));
    }
}
