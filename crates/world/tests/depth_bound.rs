//! Shape-update chains are cut at the depth budget without touching the call
//! stack, and the chained-update cap ends runaway cascades.

use redwire_core::{Direction, Position, UpdateFlags};
use redwire_world::block::POWERED;
use redwire_world::neighbor::BlockBehavior;
use redwire_world::{
    BlockKind, BlockState, DispatchLimits, Level, NeighborUpdateDispatcher, VoxelGrid,
};

const CHAIN: i32 = 1_000;

/// Each lamp lights when the lamp to its west lights.
struct Domino;

impl BlockBehavior for Domino {
    fn update_shape(
        &mut self,
        _level: &dyn Level,
        state: BlockState,
        direction: Direction,
        neighbor_state: BlockState,
        _pos: Position,
        _neighbor_pos: Position,
    ) -> BlockState {
        if state.is(BlockKind::Lamp) && direction == Direction::West && neighbor_state.get(POWERED) {
            state.with(POWERED, true)
        } else {
            state
        }
    }
}

fn lamp_row() -> VoxelGrid {
    let mut grid = VoxelGrid::new();
    grid.load_area(Position::new(0, 0, 0), Position::new(CHAIN, 0, 0));
    for x in 0..CHAIN {
        grid.put(Position::new(x, 1, 0), BlockState::new(BlockKind::Lamp));
    }
    grid
}

fn lit(grid: &VoxelGrid) -> usize {
    (0..CHAIN)
        .filter(|x| grid.state(Position::new(*x, 1, 0)).get(POWERED))
        .count()
}

fn topple(dispatcher: &mut NeighborUpdateDispatcher, grid: &mut VoxelGrid) {
    dispatcher.run(grid, &mut Domino, |cascade, _| {
        let lit = BlockState::new(BlockKind::Lamp).with(POWERED, true);
        cascade.set_block(Position::new(0, 1, 0), lit, UpdateFlags::ALL);
    });
}

#[test]
fn default_budget_cuts_thousand_step_chain() {
    let mut grid = lamp_row();
    let mut dispatcher = NeighborUpdateDispatcher::default();
    topple(&mut dispatcher, &mut grid);

    // The root write plus one write per level of the 512 budget.
    assert_eq!(lit(&grid), 513);
    assert!(dispatcher.stats().depth_truncations >= 1);
    assert_eq!(dispatcher.stats().overflows, 0);
}

#[test]
fn larger_budget_lets_chain_finish() {
    let mut grid = lamp_row();
    let mut dispatcher = NeighborUpdateDispatcher::new(DispatchLimits {
        max_depth: 2_000,
        ..DispatchLimits::default()
    });
    topple(&mut dispatcher, &mut grid);
    assert_eq!(lit(&grid), CHAIN as usize);
    assert_eq!(dispatcher.stats().depth_truncations, 0);
}

#[test]
fn chained_update_cap_ends_cascade() {
    let mut grid = lamp_row();
    let mut dispatcher = NeighborUpdateDispatcher::new(DispatchLimits {
        max_depth: 2_000,
        max_chained_updates: 500,
        ..DispatchLimits::default()
    });
    topple(&mut dispatcher, &mut grid);
    assert!(lit(&grid) < CHAIN as usize);
    assert_eq!(dispatcher.stats().overflows, 1);

    // The next cascade starts with a fresh count.
    let before = lit(&grid);
    dispatcher.run(&mut grid, &mut Domino, |cascade, _| {
        let pos = Position::new(before as i32, 1, 0);
        let state = cascade.level().state_or_air(pos.relative(Direction::West));
        cascade.update_neighbor_shapes(pos.relative(Direction::West), state, UpdateFlags::ALL, 2_000);
    });
    assert!(lit(&grid) > before);
}
