//! Rails.
//!
//! A rail lays itself out against the rails next to it, one level up, or one
//! level down. Placing a rail also pulls neighboring rails that still have a
//! free end towards it. Powered and detector rails only run straight.

use super::{rail_like, BlockContext, RailLike, SignalSource, Tickable};
use crate::block::{BlockKind, BlockState, RailShape, POWERED, RAIL_SHAPE};
use crate::level::Level;
use crate::neighbor::Cascade;
use crate::redstone::{has_neighbor_signal, is_signal_source, SignalContext, MAX_POWER};
use redwire_core::{Direction, Position, UpdateFlags};

/// How far a powered rail passes power along a line of powered rails.
pub const POWERED_RAIL_REACH: u32 = 8;

/// Ticks between occupancy checks of a pressed detector rail.
pub const DETECTOR_CHECK_PERIOD: u32 = 20;

/// Rail that may curve.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainRail;

impl RailLike for PlainRail {
    fn is_straight(&self) -> bool {
        false
    }
}

/// Straight rail switched by neighboring signal or by a chain of powered rails.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoweredRail;

impl RailLike for PoweredRail {
    fn is_straight(&self) -> bool {
        true
    }
}

/// Straight rail that emits while something stands on it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectorRail;

impl RailLike for DetectorRail {
    fn is_straight(&self) -> bool {
        true
    }
}

impl SignalSource for DetectorRail {
    fn signal(
        &self,
        _level: &dyn Level,
        state: BlockState,
        _pos: Position,
        _direction: Direction,
        _ctx: SignalContext,
    ) -> u8 {
        if state.get(POWERED) {
            MAX_POWER
        } else {
            0
        }
    }

    fn direct_signal(
        &self,
        _level: &dyn Level,
        state: BlockState,
        _pos: Position,
        direction: Direction,
        _ctx: SignalContext,
    ) -> u8 {
        if state.get(POWERED) && direction == Direction::Up {
            MAX_POWER
        } else {
            0
        }
    }
}

impl Tickable for DetectorRail {
    fn tick(&self, cx: &mut BlockContext<'_, '_>, state: BlockState, pos: Position) {
        if state.get(POWERED) {
            self.check_pressed(cx, state, pos);
        }
    }
}

impl DetectorRail {
    /// Compare the rail's pressed flag with the world's occupancy and switch it.
    pub fn check_pressed(&self, cx: &mut BlockContext<'_, '_>, state: BlockState, pos: Position) {
        if !can_survive(cx.level(), pos, state.get(RAIL_SHAPE)) {
            return;
        }
        let was_pressed = state.get(POWERED);
        let mut pressed = cx.cascade.is_occupied(pos);
        if pressed != was_pressed {
            let old = if was_pressed { MAX_POWER } else { 0 };
            pressed = cx.authorize(pos, old, MAX_POWER - old) > 0;
        }

        if pressed != was_pressed {
            let updated = state.with(POWERED, pressed);
            cx.cascade.set_block(pos, updated, UpdateFlags::ALL);
            update_power_to_connected(cx.cascade, updated, pos);
            cx.cascade.update_neighbors_at(pos, BlockKind::DetectorRail);
            cx.cascade.update_neighbors_at(pos.below(), BlockKind::DetectorRail);
        }
        if pressed {
            cx.cascade.schedule_tick(pos, BlockKind::DetectorRail, DETECTOR_CHECK_PERIOD);
        }
    }
}

fn update_power_to_connected(cascade: &mut Cascade<'_>, state: BlockState, pos: Position) {
    let Some(track) = TrackLayout::new(pos, state) else {
        return;
    };
    for connection in track.connections {
        if cascade.level().is_loaded(connection) {
            cascade.neighbor_changed(connection, BlockKind::DetectorRail, pos);
        }
    }
}

fn is_rail_at(level: &dyn Level, pos: Position) -> bool {
    level.state_or_air(pos).kind().is_rail()
}

/// The two cells a track shape links.
fn connections(pos: Position, shape: RailShape) -> [Position; 2] {
    let north = pos.relative(Direction::North);
    let south = pos.relative(Direction::South);
    let west = pos.relative(Direction::West);
    let east = pos.relative(Direction::East);
    match shape {
        RailShape::NorthSouth => [north, south],
        RailShape::EastWest => [west, east],
        RailShape::AscendingEast => [west, east.above()],
        RailShape::AscendingWest => [west.above(), east],
        RailShape::AscendingNorth => [north.above(), south],
        RailShape::AscendingSouth => [north, south.above()],
        RailShape::SouthEast => [east, south],
        RailShape::SouthWest => [west, south],
        RailShape::NorthWest => [west, north],
        RailShape::NorthEast => [east, north],
    }
}

/// Tilt a straight shape towards a rail one level up.
fn ascend(level: &dyn Level, pos: Position, shape: Option<RailShape>) -> Option<RailShape> {
    let rail_above = |direction: Direction| is_rail_at(level, pos.relative(direction).above());
    match shape {
        Some(RailShape::NorthSouth) => {
            let mut shape = RailShape::NorthSouth;
            if rail_above(Direction::North) {
                shape = RailShape::AscendingNorth;
            }
            if rail_above(Direction::South) {
                shape = RailShape::AscendingSouth;
            }
            Some(shape)
        }
        Some(RailShape::EastWest) => {
            let mut shape = RailShape::EastWest;
            if rail_above(Direction::East) {
                shape = RailShape::AscendingEast;
            }
            if rail_above(Direction::West) {
                shape = RailShape::AscendingWest;
            }
            Some(shape)
        }
        other => other,
    }
}

/// Working copy of one rail and the cells it links to.
#[derive(Debug, Clone)]
struct TrackLayout {
    pos: Position,
    state: BlockState,
    straight: bool,
    connections: Vec<Position>,
}

impl TrackLayout {
    fn new(pos: Position, state: BlockState) -> Option<Self> {
        let rail = rail_like(state.kind())?;
        Some(Self {
            pos,
            state,
            straight: rail.is_straight(),
            connections: connections(pos, rail.shape(state)).to_vec(),
        })
    }

    fn at(level: &dyn Level, pos: Position) -> Option<Self> {
        Self::new(pos, level.block_state(pos)?)
    }

    /// The rail at `pos`, or one level above or below it.
    fn near(level: &dyn Level, pos: Position) -> Option<Self> {
        [pos, pos.above(), pos.below()]
            .into_iter()
            .find_map(|candidate| Self::at(level, candidate))
    }

    fn shape(&self) -> RailShape {
        self.state.get(RAIL_SHAPE)
    }

    fn set_shape(&mut self, shape: RailShape) {
        self.connections = connections(self.pos, shape).to_vec();
        self.state = self.state.with(RAIL_SHAPE, shape);
    }

    /// Keep only links that the rail on the other end returns.
    fn remove_soft_connections(&mut self, level: &dyn Level) {
        let pos = self.pos;
        self.connections = self
            .connections
            .iter()
            .filter_map(|connection| Self::near(level, *connection))
            .filter(|other| other.has_connection(pos))
            .map(|other| other.pos)
            .collect();
    }

    /// Links are compared on the horizontal plane only.
    fn has_connection(&self, pos: Position) -> bool {
        self.connections
            .iter()
            .any(|connection| connection.x == pos.x && connection.z == pos.z)
    }

    fn can_connect_to(&self, pos: Position) -> bool {
        self.has_connection(pos) || self.connections.len() != 2
    }

    fn count_potential_connections(&self, level: &dyn Level) -> usize {
        Direction::HORIZONTAL
            .into_iter()
            .filter(|direction| {
                let side = self.pos.relative(*direction);
                is_rail_at(level, side) || is_rail_at(level, side.above()) || is_rail_at(level, side.below())
            })
            .count()
    }

    /// Whether the rail next to us in some direction would link back.
    fn has_neighbor_rail(&self, level: &dyn Level, pos: Position) -> bool {
        match Self::near(level, pos) {
            Some(mut other) => {
                other.remove_soft_connections(level);
                other.can_connect_to(self.pos)
            }
            None => false,
        }
    }

    /// Add a link towards `other` and return the state that results.
    fn connect_to(&mut self, level: &dyn Level, other: Position) -> BlockState {
        self.connections.push(other);
        let north = self.has_connection(self.pos.relative(Direction::North));
        let south = self.has_connection(self.pos.relative(Direction::South));
        let west = self.has_connection(self.pos.relative(Direction::West));
        let east = self.has_connection(self.pos.relative(Direction::East));

        let mut shape = None;
        if north || south {
            shape = Some(RailShape::NorthSouth);
        }
        if west || east {
            shape = Some(RailShape::EastWest);
        }
        if !self.straight {
            if south && east && !north && !west {
                shape = Some(RailShape::SouthEast);
            }
            if south && west && !north && !east {
                shape = Some(RailShape::SouthWest);
            }
            if north && west && !south && !east {
                shape = Some(RailShape::NorthWest);
            }
            if north && east && !south && !west {
                shape = Some(RailShape::NorthEast);
            }
        }
        let shape = ascend(level, self.pos, shape).unwrap_or(RailShape::NorthSouth);
        self.state = self.state.with(RAIL_SHAPE, shape);
        self.state
    }

    /// Shape the rail takes given its neighbors. `current` is kept when
    /// nothing decides otherwise.
    fn choose_shape(&self, level: &dyn Level, powered: bool, current: RailShape) -> RailShape {
        let north = self.has_neighbor_rail(level, self.pos.relative(Direction::North));
        let south = self.has_neighbor_rail(level, self.pos.relative(Direction::South));
        let west = self.has_neighbor_rail(level, self.pos.relative(Direction::West));
        let east = self.has_neighbor_rail(level, self.pos.relative(Direction::East));

        let north_south = north || south;
        let east_west = west || east;
        let south_east = south && east;
        let south_west = south && west;
        let north_east = north && east;
        let north_west = north && west;

        let mut shape = None;
        if north_south && !east_west {
            shape = Some(RailShape::NorthSouth);
        }
        if east_west && !north_south {
            shape = Some(RailShape::EastWest);
        }
        if !self.straight {
            if south_east && !north && !west {
                shape = Some(RailShape::SouthEast);
            }
            if south_west && !north && !east {
                shape = Some(RailShape::SouthWest);
            }
            if north_west && !south && !east {
                shape = Some(RailShape::NorthWest);
            }
            if north_east && !south && !west {
                shape = Some(RailShape::NorthEast);
            }
        }

        if shape.is_none() {
            if north_south && east_west {
                shape = Some(current);
            } else if north_south {
                shape = Some(RailShape::NorthSouth);
            } else if east_west {
                shape = Some(RailShape::EastWest);
            }

            // Later assignments win, so these lists run from least to most preferred.
            if !self.straight {
                let corners = if powered {
                    [
                        (south_east, RailShape::SouthEast),
                        (south_west, RailShape::SouthWest),
                        (north_east, RailShape::NorthEast),
                        (north_west, RailShape::NorthWest),
                    ]
                } else {
                    [
                        (north_west, RailShape::NorthWest),
                        (north_east, RailShape::NorthEast),
                        (south_west, RailShape::SouthWest),
                        (south_east, RailShape::SouthEast),
                    ]
                };
                for (present, corner) in corners {
                    if present {
                        shape = Some(corner);
                    }
                }
            }
        }

        ascend(level, self.pos, shape).unwrap_or(current)
    }
}

/// Whether a rail of `shape` has the support it needs at `pos`.
pub fn can_survive(level: &dyn Level, pos: Position, shape: RailShape) -> bool {
    if !level.state_or_air(pos.below()).can_support_rail() {
        return false;
    }
    match shape.ascending_towards() {
        Some(direction) => level.state_or_air(pos.relative(direction)).can_support_rail(),
        None => true,
    }
}

/// Layout `candidate` would take at `pos` without touching the world.
pub fn resolved_state(
    level: &dyn Level,
    pos: Position,
    candidate: BlockState,
    powered: bool,
) -> BlockState {
    let Some(rail) = rail_like(candidate.kind()) else {
        return candidate;
    };
    let Some(track) = TrackLayout::new(pos, candidate) else {
        return candidate;
    };
    let shape = track.choose_shape(level, powered, track.shape());
    if rail.accepts(shape) {
        candidate.with(RAIL_SHAPE, shape)
    } else {
        candidate
    }
}

/// Lay out the rail at `pos` and pull neighboring rails towards it.
///
/// With `force` the neighbors are rewired even when our own shape did not change.
pub fn place(cascade: &mut Cascade<'_>, pos: Position, force: bool) {
    let (track, original) = {
        let level = cascade.level();
        let Some(state) = level.block_state(pos) else {
            return;
        };
        let Some(mut track) = TrackLayout::new(pos, state) else {
            return;
        };
        let powered = has_neighbor_signal(level, pos, SignalContext::EMITTING);
        let shape = track.choose_shape(level, powered, track.shape());
        track.set_shape(shape);
        (track, state)
    };
    if !force && track.state == original {
        return;
    }

    cascade.set_block(pos, track.state, UpdateFlags::ALL);
    if !cascade.level().state_or_air(pos).is(track.state.kind()) {
        return;
    }
    for connection in &track.connections {
        let Some(mut neighbor) = TrackLayout::near(cascade.level(), *connection) else {
            continue;
        };
        neighbor.remove_soft_connections(cascade.level());
        if neighbor.can_connect_to(pos) {
            let updated = neighbor.connect_to(cascade.level(), pos);
            cascade.set_block(neighbor.pos, updated, UpdateFlags::ALL);
        }
    }
}

/// A rail was written over a block of another kind.
pub fn on_place(cx: &mut BlockContext<'_, '_>, pos: Position) {
    place(cx.cascade, pos, true);
    let Some(state) = cx.level().block_state(pos).filter(|state| state.kind().is_rail()) else {
        return;
    };
    if rail_like(state.kind()).is_some_and(|rail| rail.is_straight()) {
        neighbor_changed(cx, state, pos, state.kind());
    }
    if state.is(BlockKind::DetectorRail) {
        DetectorRail.check_pressed(cx, state, pos);
    }
}

/// A rail at `pos` was replaced by a block of another kind.
pub fn on_remove(cascade: &mut Cascade<'_>, old: BlockState, pos: Position) {
    if old.get(RAIL_SHAPE).is_ascending() {
        cascade.update_neighbors_at(pos.above(), old.kind());
    }
    if rail_like(old.kind()).is_some_and(|rail| rail.is_straight()) {
        cascade.update_neighbors_at(pos, old.kind());
        cascade.update_neighbors_at(pos.below(), old.kind());
    }
}

/// Something next to the rail at `pos` changed.
pub fn neighbor_changed(
    cx: &mut BlockContext<'_, '_>,
    state: BlockState,
    pos: Position,
    source: BlockKind,
) {
    if !can_survive(cx.level(), pos, state.get(RAIL_SHAPE)) {
        cx.cascade.destroy_block(pos, true);
        return;
    }
    match state.kind() {
        BlockKind::Rail => {
            let source_emits = is_signal_source(BlockState::new(source), SignalContext::EMITTING);
            let junction = TrackLayout::new(pos, state)
                .is_some_and(|track| track.count_potential_connections(cx.level()) == 3);
            if source_emits && junction {
                place(cx.cascade, pos, false);
            }
        }
        BlockKind::PoweredRail => update_powered_rail(cx, state, pos),
        _ => {}
    }
}

fn update_powered_rail(cx: &mut BlockContext<'_, '_>, state: BlockState, pos: Position) {
    let was_powered = state.get(POWERED);
    let powered = {
        let level = cx.level();
        has_neighbor_signal(level, pos, SignalContext::EMITTING)
            || find_powered_rail_signal(level, pos, state, true, 0)
            || find_powered_rail_signal(level, pos, state, false, 0)
    };
    if powered == was_powered {
        return;
    }
    let old = if was_powered { MAX_POWER } else { 0 };
    if cx.authorize(pos, old, MAX_POWER - old) == old {
        return;
    }
    cx.cascade.set_block(pos, state.with(POWERED, powered), UpdateFlags::ALL);
    cx.cascade.update_neighbors_at(pos.below(), BlockKind::PoweredRail);
    if state.get(RAIL_SHAPE).is_ascending() {
        cx.cascade.update_neighbors_at(pos.above(), BlockKind::PoweredRail);
    }
}

/// Walk the line of powered rails in one direction looking for one that is
/// powered by a neighbor.
fn find_powered_rail_signal(
    level: &dyn Level,
    pos: Position,
    state: BlockState,
    forward: bool,
    distance: u32,
) -> bool {
    if distance >= POWERED_RAIL_REACH {
        return false;
    }
    let (mut x, mut y, mut z) = (pos.x, pos.y, pos.z);
    let mut check_below = true;
    let mut shape = state.get(RAIL_SHAPE);
    match shape {
        RailShape::NorthSouth => z += if forward { 1 } else { -1 },
        RailShape::EastWest => x += if forward { -1 } else { 1 },
        RailShape::AscendingEast => {
            if forward {
                x -= 1;
            } else {
                x += 1;
                y += 1;
                check_below = false;
            }
            shape = RailShape::EastWest;
        }
        RailShape::AscendingWest => {
            if forward {
                x -= 1;
                y += 1;
                check_below = false;
            } else {
                x += 1;
            }
            shape = RailShape::EastWest;
        }
        RailShape::AscendingNorth => {
            if forward {
                z += 1;
            } else {
                z -= 1;
                y += 1;
                check_below = false;
            }
            shape = RailShape::NorthSouth;
        }
        RailShape::AscendingSouth => {
            if forward {
                z += 1;
                y += 1;
                check_below = false;
            } else {
                z -= 1;
            }
            shape = RailShape::NorthSouth;
        }
        _ => {}
    }

    let next = Position::new(x, y, z);
    is_same_rail_with_power(level, next, forward, distance, shape)
        || (check_below && is_same_rail_with_power(level, next.below(), forward, distance, shape))
}

fn is_same_rail_with_power(
    level: &dyn Level,
    pos: Position,
    forward: bool,
    distance: u32,
    shape: RailShape,
) -> bool {
    let Some(state) = level.block_state(pos).filter(|state| state.is(BlockKind::PoweredRail)) else {
        return false;
    };
    let other = state.get(RAIL_SHAPE);
    let crosses = match shape {
        RailShape::EastWest => matches!(
            other,
            RailShape::NorthSouth | RailShape::AscendingNorth | RailShape::AscendingSouth
        ),
        RailShape::NorthSouth => matches!(
            other,
            RailShape::EastWest | RailShape::AscendingEast | RailShape::AscendingWest
        ),
        _ => false,
    };
    if crosses || !state.get(POWERED) {
        return false;
    }
    has_neighbor_signal(level, pos, SignalContext::EMITTING)
        || find_powered_rail_signal(level, pos, state, forward, distance + 1)
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

    fn rail(kind: BlockKind, shape: RailShape) -> BlockState {
        BlockState::new(kind).with(RAIL_SHAPE, shape)
    }

    #[test]
    fn test_prefers_straight_towards_single_neighbor() {
        let mut grid = floor();
        grid.put(Position::new(1, 1, 0), rail(BlockKind::Rail, RailShape::NorthSouth));
        let placed = resolved_state(&grid, Position::new(0, 1, 0), rail(BlockKind::Rail, RailShape::NorthSouth), false);
        assert_eq!(placed.get(RAIL_SHAPE), RailShape::EastWest);
    }

    #[test]
    fn test_curves_between_two_neighbors() {
        let mut grid = floor();
        grid.put(Position::new(0, 1, 1), rail(BlockKind::Rail, RailShape::NorthSouth));
        grid.put(Position::new(1, 1, 0), rail(BlockKind::Rail, RailShape::EastWest));
        let placed = resolved_state(&grid, Position::ORIGIN.above(), BlockState::new(BlockKind::Rail), false);
        assert_eq!(placed.get(RAIL_SHAPE), RailShape::SouthEast);
    }

    #[test]
    fn test_straight_rail_never_curves() {
        let mut grid = floor();
        grid.put(Position::new(0, 1, 1), rail(BlockKind::Rail, RailShape::NorthSouth));
        grid.put(Position::new(1, 1, 0), rail(BlockKind::Rail, RailShape::EastWest));
        let placed = resolved_state(
            &grid,
            Position::ORIGIN.above(),
            BlockState::new(BlockKind::PoweredRail),
            false,
        );
        assert!(!placed.get(RAIL_SHAPE).is_curve());
    }

    #[test]
    fn test_ascends_towards_rail_above() {
        let mut grid = floor();
        grid.put(Position::new(1, 1, 0), BlockState::new(BlockKind::Stone));
        grid.put(Position::new(1, 2, 0), rail(BlockKind::Rail, RailShape::EastWest));
        let placed = resolved_state(&grid, Position::ORIGIN.above(), BlockState::new(BlockKind::Rail), false);
        assert_eq!(placed.get(RAIL_SHAPE), RailShape::AscendingEast);
    }

    #[test]
    fn test_junction_corner_depends_on_power() {
        let mut grid = floor();
        let center = Position::ORIGIN.above();
        for direction in [Direction::North, Direction::South, Direction::East] {
            let shape = if direction.axis() == redwire_core::Axis::Z {
                RailShape::NorthSouth
            } else {
                RailShape::EastWest
            };
            grid.put(center.relative(direction), rail(BlockKind::Rail, shape));
        }
        let unpowered = resolved_state(&grid, center, BlockState::new(BlockKind::Rail), false);
        assert_eq!(unpowered.get(RAIL_SHAPE), RailShape::SouthEast);
        let powered = resolved_state(&grid, center, BlockState::new(BlockKind::Rail), true);
        assert_eq!(powered.get(RAIL_SHAPE), RailShape::NorthEast);
    }

    #[test]
    fn test_survival_needs_floor_and_slope_support() {
        let mut grid = floor();
        let pos = Position::new(0, 1, 0);
        assert!(can_survive(&grid, pos, RailShape::NorthSouth));
        assert!(!can_survive(&grid, pos, RailShape::AscendingEast));
        grid.put(Position::new(1, 1, 0), BlockState::new(BlockKind::Stone));
        assert!(can_survive(&grid, pos, RailShape::AscendingEast));
        assert!(!can_survive(&grid, Position::new(0, 2, 0), RailShape::NorthSouth));
    }

    #[test]
    fn test_powered_rail_chain_reaches_eight() {
        let mut grid = floor();
        grid.put(Position::new(-1, 1, 0), BlockState::new(BlockKind::RedstoneBlock));
        for x in 0..=9 {
            grid.put(
                Position::new(x, 1, 0),
                rail(BlockKind::PoweredRail, RailShape::EastWest).with(POWERED, true),
            );
        }
        let at = |x: i32| {
            let pos = Position::new(x, 1, 0);
            let state = grid.state(pos);
            find_powered_rail_signal(&grid, pos, state, true, 0)
                || find_powered_rail_signal(&grid, pos, state, false, 0)
        };
        assert!(at(1));
        assert!(at(8));
        assert!(!at(9));
    }
}
