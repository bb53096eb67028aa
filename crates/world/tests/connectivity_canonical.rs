//! Wire connection shapes never leave a single dangling arm.

use redwire_core::{Direction, Position};
use redwire_testkit::{flat_world, place_all, wire};
use redwire_world::block::{side_property, EAST, NORTH, SOUTH, WEST};
use redwire_world::{BlockKind, BlockState, RedstoneEngine, RedstoneSide, VoxelGrid};

const ORIGIN: Position = Position::new(0, 1, 0);

fn sides(state: BlockState) -> [RedstoneSide; 4] {
    [state.get(NORTH), state.get(EAST), state.get(SOUTH), state.get(WEST)]
}

fn connected_count(state: BlockState) -> usize {
    Direction::HORIZONTAL
        .iter()
        .filter_map(|dir| side_property(*dir))
        .filter(|prop| state.get(*prop).is_connected())
        .count()
}

#[test]
fn lone_wire_becomes_a_cross() {
    let mut grid = flat_world(8);
    let mut engine = RedstoneEngine::default();
    place_all(&mut engine, &mut grid, &[ORIGIN], wire()).expect("wire placed");
    assert_eq!(sides(grid.state(ORIGIN)), [RedstoneSide::Side; 4]);
}

#[test]
fn single_neighbor_runs_straight_through() {
    let mut grid = flat_world(8);
    let mut engine = RedstoneEngine::default();
    let north = ORIGIN.relative(Direction::North);
    place_all(&mut engine, &mut grid, &[north, ORIGIN], wire()).expect("wires placed");

    let state = grid.state(ORIGIN);
    assert_eq!(state.get(NORTH), RedstoneSide::Side);
    assert_eq!(state.get(SOUTH), RedstoneSide::Side);
    assert_eq!(state.get(EAST), RedstoneSide::None);
    assert_eq!(state.get(WEST), RedstoneSide::None);
}

#[test]
fn source_on_one_side_pairs_with_the_opposite() {
    let mut grid = flat_world(8);
    let mut engine = RedstoneEngine::default();
    place_all(
        &mut engine,
        &mut grid,
        &[ORIGIN.relative(Direction::East)],
        BlockState::new(BlockKind::RedstoneBlock),
    )
    .expect("source placed");
    place_all(&mut engine, &mut grid, &[ORIGIN], wire()).expect("wire placed");

    assert_eq!(
        sides(grid.state(ORIGIN)),
        [
            RedstoneSide::None,
            RedstoneSide::Side,
            RedstoneSide::None,
            RedstoneSide::Side
        ]
    );
}

#[test]
fn wire_climbs_a_sturdy_neighbor() {
    let mut grid = flat_world(8);
    let step = ORIGIN.relative(Direction::East);
    grid.put(step, BlockState::new(BlockKind::Stone));
    grid.put(step.above(), wire());

    let engine = RedstoneEngine::default();
    let state = engine.resolve_connections(&grid, ORIGIN, wire());
    assert_eq!(state.get(EAST), RedstoneSide::Up);
    assert_eq!(state.get(WEST), RedstoneSide::Side);
    assert_eq!(state.get(NORTH), RedstoneSide::None);
    assert_eq!(state.get(SOUTH), RedstoneSide::None);
}

#[test]
fn conductor_overhead_cuts_the_climb() {
    let mut grid = flat_world(8);
    let step = ORIGIN.relative(Direction::East);
    grid.put(step, BlockState::new(BlockKind::Stone));
    grid.put(step.above(), wire());
    grid.put(ORIGIN.above(), BlockState::new(BlockKind::Stone));

    let engine = RedstoneEngine::default();
    let state = engine.resolve_connections(&grid, ORIGIN, wire());
    assert_ne!(state.get(EAST), RedstoneSide::Up);
}

#[test]
fn isolated_dot_stays_a_dot() {
    let grid: VoxelGrid = flat_world(8);
    let engine = RedstoneEngine::default();
    let state = engine.resolve_connections(&grid, ORIGIN, wire());
    assert_eq!(connected_count(state), 0);
}

#[test]
fn shapes_are_never_one_armed() {
    let mut grid = flat_world(8);
    let mut engine = RedstoneEngine::default();
    let layout = [
        Position::new(0, 1, 0),
        Position::new(1, 1, 0),
        Position::new(1, 1, 1),
        Position::new(3, 1, 3),
        Position::new(-2, 1, 0),
        Position::new(-2, 1, -1),
        Position::new(-3, 1, -1),
    ];
    place_all(&mut engine, &mut grid, &layout, wire()).expect("wires placed");
    for pos in layout {
        assert_ne!(connected_count(grid.state(pos)), 1, "one arm at {pos}");
    }
}
