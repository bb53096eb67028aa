//! Circuit fixtures: floors, wire layouts, seeded random networks and a hook
//! that records every power transition it is asked about.

use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use redwire_core::{Direction, Position};
use redwire_world::{BlockKind, BlockState, RedstoneChangeHook, RedstoneEngine, VoxelGrid};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Height of the stone floor built by [`flat_world`].
pub const FLOOR_Y: i32 = 0;

/// Fresh unpowered wire.
pub fn wire() -> BlockState {
    BlockState::new(BlockKind::RedstoneWire)
}

/// A world with a stone floor at [`FLOOR_Y`] covering `-extent..=extent` on
/// both horizontal axes.
pub fn flat_world(extent: i32) -> VoxelGrid {
    let mut grid = VoxelGrid::new();
    grid.load_area(
        Position::new(-extent, FLOOR_Y, -extent),
        Position::new(extent, FLOOR_Y, extent),
    );
    let stone = BlockState::new(BlockKind::Stone);
    for x in -extent..=extent {
        for z in -extent..=extent {
            grid.put(Position::new(x, FLOOR_Y, z), stone);
        }
    }
    grid
}

/// Place `state` at every position in order through the engine.
pub fn place_all(
    engine: &mut RedstoneEngine,
    grid: &mut VoxelGrid,
    positions: &[Position],
    state: BlockState,
) -> Result<()> {
    for &pos in positions {
        if !engine.place_block(grid, pos, state)? {
            bail!("{} refused at {}", state.kind(), pos);
        }
    }
    Ok(())
}

/// Lay `len` wires starting at `start` and walking towards `direction`.
pub fn wire_line(
    engine: &mut RedstoneEngine,
    grid: &mut VoxelGrid,
    start: Position,
    direction: Direction,
    len: usize,
) -> Result<Vec<Position>> {
    let positions: Vec<Position> = (0..len as i32)
        .map(|step| start.relative_by(direction, step))
        .collect();
    place_all(engine, grid, &positions, wire())?;
    Ok(positions)
}

/// Perimeter of the square with corner `corner` and `side` cells per edge,
/// walked clockwise when seen from above. Yields `4 * (side - 1)` cells.
pub fn square_ring(corner: Position, side: i32) -> Vec<Position> {
    if side < 2 {
        return vec![corner];
    }
    let mut cells = Vec::with_capacity(4 * (side as usize - 1));
    let mut pos = corner;
    for direction in [Direction::East, Direction::South, Direction::West, Direction::North] {
        for _ in 0..side - 1 {
            cells.push(pos);
            pos = pos.relative(direction);
        }
    }
    cells
}

/// Power stored in each wire, 0 for anything else.
pub fn wire_powers(grid: &VoxelGrid, positions: &[Position]) -> Vec<u8> {
    positions
        .iter()
        .map(|&pos| grid.power_at(pos).unwrap_or(0))
        .collect()
}

/// A wire network generated from a seed.
///
/// Cells are listed in placement order: raised stone first, then wires, then
/// redstone blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomNetwork {
    /// Seed the layout came from.
    pub seed: u64,
    /// Cells to place.
    pub cells: Vec<(Position, BlockState)>,
}

impl RandomNetwork {
    /// Scatter wires over the floor within `-extent..=extent`.
    ///
    /// About `wire_density` of the floor gets a wire; some of them sit on a
    /// raised stone so climbing connections show up. `sources` redstone
    /// blocks replace random cells.
    pub fn generate(seed: u64, extent: i32, wire_density: f64, sources: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut raised = Vec::new();
        let mut wires = Vec::new();
        for x in -extent..=extent {
            for z in -extent..=extent {
                if !rng.gen_bool(wire_density.clamp(0.0, 1.0)) {
                    continue;
                }
                if rng.gen_ratio(1, 8) {
                    raised.push((
                        Position::new(x, FLOOR_Y + 1, z),
                        BlockState::new(BlockKind::Stone),
                    ));
                    wires.push((Position::new(x, FLOOR_Y + 2, z), wire()));
                } else {
                    wires.push((Position::new(x, FLOOR_Y + 1, z), wire()));
                }
            }
        }

        let mut taken: HashSet<Position> = wires.iter().map(|(pos, _)| *pos).collect();
        let mut blocks = Vec::new();
        for _ in 0..sources {
            let pos = Position::new(
                rng.gen_range(-extent..=extent),
                FLOOR_Y + 1,
                rng.gen_range(-extent..=extent),
            );
            if raised.iter().any(|(raised_pos, _)| *raised_pos == pos) || !taken.insert(pos) {
                continue;
            }
            blocks.push((pos, BlockState::new(BlockKind::RedstoneBlock)));
        }

        let mut cells = raised;
        cells.extend(wires);
        cells.extend(blocks);
        Self { seed, cells }
    }

    /// Wire positions.
    pub fn wires(&self) -> Vec<Position> {
        self.cells
            .iter()
            .filter(|(_, state)| state.is(BlockKind::RedstoneWire))
            .map(|(pos, _)| *pos)
            .collect()
    }

    /// Place every cell through `engine`. Cells the engine refuses are
    /// skipped; returns how many were placed.
    pub fn build(&self, engine: &mut RedstoneEngine, grid: &mut VoxelGrid) -> Result<usize> {
        let mut placed = 0;
        for &(pos, state) in &self.cells {
            if engine.place_block(grid, pos, state)? {
                placed += 1;
            }
        }
        Ok(placed)
    }
}

/// One consultation of a [`RecordingHook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HookCall {
    /// Cell whose power was about to change.
    pub pos: Position,
    /// Power before.
    pub old: u8,
    /// Power the engine proposed.
    pub proposed: u8,
    /// Power the hook answered.
    pub authorized: u8,
}

/// Shared view of the calls a [`RecordingHook`] saw.
#[derive(Debug, Clone, Default)]
pub struct HookLog(Rc<RefCell<Vec<HookCall>>>);

impl HookLog {
    /// Every call so far.
    pub fn calls(&self) -> Vec<HookCall> {
        self.0.borrow().clone()
    }

    /// Calls about `pos`.
    pub fn calls_at(&self, pos: Position) -> Vec<HookCall> {
        self.0
            .borrow()
            .iter()
            .filter(|call| call.pos == pos)
            .copied()
            .collect()
    }

    /// Number of calls.
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Whether no call was recorded.
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Forget recorded calls.
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// Change hook that records every call and can pin or freeze cells.
#[derive(Debug, Default)]
pub struct RecordingHook {
    log: HookLog,
    pinned: HashMap<Position, u8>,
    frozen: HashSet<Position>,
}

impl RecordingHook {
    /// Hook that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `power` for `pos`.
    pub fn pin(mut self, pos: Position, power: u8) -> Self {
        self.pinned.insert(pos, power);
        self
    }

    /// Refuse every change at `pos`.
    pub fn freeze(mut self, pos: Position) -> Self {
        self.frozen.insert(pos);
        self
    }

    /// Handle on the call log that stays valid after the hook moves into an
    /// engine.
    pub fn log(&self) -> HookLog {
        self.log.clone()
    }
}

impl RedstoneChangeHook for RecordingHook {
    fn on_redstone_change(&mut self, pos: Position, old: u8, proposed: u8) -> u8 {
        let authorized = if self.frozen.contains(&pos) {
            old
        } else {
            self.pinned.get(&pos).copied().unwrap_or(proposed)
        };
        self.log.0.borrow_mut().push(HookCall {
            pos,
            old,
            proposed,
            authorized,
        });
        authorized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_ring_has_expected_cells() {
        let ring = square_ring(Position::new(0, 1, 0), 6);
        assert_eq!(ring.len(), 20);
        let unique: HashSet<Position> = ring.iter().copied().collect();
        assert_eq!(unique.len(), 20);
        assert_eq!(ring[0], Position::new(0, 1, 0));
        assert_eq!(ring[5], Position::new(5, 1, 0));
        // Last cell sits next to the first one.
        assert_eq!(ring[19].chebyshev_distance(ring[0]), 1);
    }

    #[test]
    fn random_network_is_deterministic() {
        let a = RandomNetwork::generate(42, 5, 0.5, 3);
        let b = RandomNetwork::generate(42, 5, 0.5, 3);
        assert_eq!(a, b);
        assert!(!a.wires().is_empty());
    }

    #[test]
    fn recording_hook_pins_and_freezes() {
        let pinned = Position::new(1, 0, 0);
        let frozen = Position::new(2, 0, 0);
        let mut hook = RecordingHook::new().pin(pinned, 3).freeze(frozen);
        let log = hook.log();
        assert_eq!(hook.on_redstone_change(pinned, 0, 14), 3);
        assert_eq!(hook.on_redstone_change(frozen, 5, 14), 5);
        assert_eq!(hook.on_redstone_change(Position::ORIGIN, 0, 9), 9);
        assert_eq!(log.len(), 3);
        assert_eq!(log.calls_at(pinned)[0].authorized, 3);
    }

    #[test]
    fn wire_line_powers_down_from_block() {
        let mut grid = flat_world(16);
        let mut engine = RedstoneEngine::default();
        place_all(
            &mut engine,
            &mut grid,
            &[Position::new(0, 1, 0)],
            BlockState::new(BlockKind::RedstoneBlock),
        )
        .expect("block placed");
        let line = wire_line(&mut engine, &mut grid, Position::new(1, 1, 0), Direction::East, 3)
            .expect("line placed");
        assert_eq!(wire_powers(&grid, &line), vec![14, 13, 12]);
    }
}
