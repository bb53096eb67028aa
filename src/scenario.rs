//! TOML circuit scenarios for the headless runner.

use anyhow::{Context, Result};
use redwire_core::{Direction, Position};
use redwire_testkit::{EventRecord, JsonlSink};
use redwire_world::block::{FACING, POWERED, RAIL_SHAPE};
use redwire_world::{BlockKind, BlockState, RailShape, RedstoneEngine, VoxelGrid};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

const DEMO: &str = include_str!("../scenarios/demo.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub area: Area,
    #[serde(default)]
    pub blocks: Vec<BlockSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_name() -> String {
    "scenario".to_string()
}

/// Loaded box. With `floor`, the bottom layer is filled with stone.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Area {
    pub min: [i32; 3],
    pub max: [i32; 3],
    pub floor: bool,
}

impl Default for Area {
    fn default() -> Self {
        Self {
            min: [-16, 0, -16],
            max: [16, 8, 16],
            floor: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockSpec {
    pub pos: [i32; 3],
    pub block: BlockKind,
    #[serde(default)]
    pub facing: Option<Direction>,
    #[serde(default)]
    pub shape: Option<RailShape>,
    #[serde(default)]
    pub powered: Option<bool>,
}

impl BlockSpec {
    pub fn state(&self) -> BlockState {
        let mut state = BlockState::new(self.block);
        if let Some(facing) = self.facing {
            state = state.with(FACING, facing);
        }
        if let Some(shape) = self.shape {
            state = state.with(RAIL_SHAPE, shape);
        }
        if let Some(powered) = self.powered {
            state = state.with(POWERED, powered);
        }
        state
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Place(BlockSpec),
    Remove { pos: [i32; 3] },
    ToggleLever { pos: [i32; 3] },
    PressButton { pos: [i32; 3] },
    UseWire { pos: [i32; 3] },
    Occupy { pos: [i32; 3] },
    Vacate { pos: [i32; 3] },
    Tick {
        #[serde(default = "one")]
        count: u64,
    },
}

fn one() -> u64 {
    1
}

impl Step {
    fn label(&self) -> &'static str {
        match self {
            Step::Place(_) => "place",
            Step::Remove { .. } => "remove",
            Step::ToggleLever { .. } => "toggle_lever",
            Step::PressButton { .. } => "press_button",
            Step::UseWire { .. } => "use_wire",
            Step::Occupy { .. } => "occupy",
            Step::Vacate { .. } => "vacate",
            Step::Tick { .. } => "tick",
        }
    }

    fn pos(&self) -> Option<Position> {
        match self {
            Step::Place(spec) => Some(spec.pos.into()),
            Step::Remove { pos }
            | Step::ToggleLever { pos }
            | Step::PressButton { pos }
            | Step::UseWire { pos }
            | Step::Occupy { pos }
            | Step::Vacate { pos } => Some((*pos).into()),
            Step::Tick { .. } => None,
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse scenario {}", path.display()))
    }

    /// The bundled demo circuit.
    pub fn demo() -> Result<Self> {
        toml::from_str(DEMO).context("Failed to parse bundled demo scenario")
    }

    /// Loaded, floored grid with nothing else in it.
    pub fn grid(&self) -> VoxelGrid {
        let mut grid = VoxelGrid::new();
        let min = Position::from(self.area.min);
        let max = Position::from(self.area.max);
        grid.load_area(min, max);
        if self.area.floor {
            let stone = BlockState::new(BlockKind::Stone);
            for x in min.x.min(max.x)..=min.x.max(max.x) {
                for z in min.z.min(max.z)..=min.z.max(max.z) {
                    grid.put(Position::new(x, min.y.min(max.y), z), stone);
                }
            }
        }
        grid
    }
}

/// Result of a scenario run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub steps: usize,
    pub ticks: u64,
    pub wires: BTreeMap<Position, u8>,
}

/// Build the scenario's blocks, then play its steps.
pub fn run(
    scenario: &Scenario,
    engine: &mut RedstoneEngine,
    mut events: Option<&mut JsonlSink>,
) -> Result<(VoxelGrid, RunSummary)> {
    let mut grid = scenario.grid();
    for spec in &scenario.blocks {
        let pos = Position::from(spec.pos);
        if !engine.place_block(&mut grid, pos, spec.state())? {
            warn!(pos = %pos, block = %spec.block, "Block could not be placed");
        }
    }
    info!(
        scenario = %scenario.name,
        blocks = scenario.blocks.len(),
        steps = scenario.steps.len(),
        "Scenario built"
    );

    let mut ticks = 0;
    let mut powers = wire_powers(&grid);
    for step in &scenario.steps {
        ticks += apply(step, engine, &mut grid)?;
        let after = wire_powers(&grid);
        debug!(action = step.label(), "Step applied");
        if let Some(sink) = events.as_deref_mut() {
            let now = grid.now();
            sink.write(&EventRecord {
                tick: now,
                kind: step.label(),
                pos: step.pos(),
                payload: "",
            })?;
            for (pos, old, new) in power_changes(&powers, &after) {
                let payload = format!("{old}->{new}");
                sink.write(&EventRecord {
                    tick: now,
                    kind: "power",
                    pos: Some(pos),
                    payload: &payload,
                })?;
            }
        }
        powers = after;
    }

    let summary = RunSummary {
        steps: scenario.steps.len(),
        ticks,
        wires: powers,
    };
    Ok((grid, summary))
}

fn apply(step: &Step, engine: &mut RedstoneEngine, grid: &mut VoxelGrid) -> Result<u64> {
    match step {
        Step::Place(spec) => {
            let pos = Position::from(spec.pos);
            if !engine.place_block(grid, pos, spec.state())? {
                warn!(pos = %pos, block = %spec.block, "Block could not be placed");
            }
        }
        Step::Remove { pos } => {
            engine.remove_block(grid, (*pos).into())?;
        }
        Step::ToggleLever { pos } => {
            engine.toggle_lever(grid, (*pos).into())?;
        }
        Step::PressButton { pos } => {
            engine.press_button(grid, (*pos).into())?;
        }
        Step::UseWire { pos } => {
            engine.use_wire(grid, (*pos).into())?;
        }
        Step::Occupy { pos } => {
            let pos = Position::from(*pos);
            grid.set_occupied(pos, true);
            engine.entity_inside(grid, pos)?;
        }
        Step::Vacate { pos } => grid.set_occupied((*pos).into(), false),
        Step::Tick { count } => {
            for _ in 0..*count {
                engine.step(grid);
            }
            return Ok(*count);
        }
    }
    Ok(0)
}

fn wire_powers(grid: &VoxelGrid) -> BTreeMap<Position, u8> {
    grid.blocks()
        .into_iter()
        .filter(|(_, state)| state.is(BlockKind::RedstoneWire))
        .filter_map(|(pos, _)| grid.power_at(pos).map(|power| (pos, power)))
        .collect()
}

fn power_changes(
    before: &BTreeMap<Position, u8>,
    after: &BTreeMap<Position, u8>,
) -> Vec<(Position, u8, u8)> {
    let mut changes = Vec::new();
    for (&pos, &new) in after {
        let old = before.get(&pos).copied().unwrap_or(0);
        if old != new {
            changes.push((pos, old, new));
        }
    }
    for (&pos, &old) in before {
        if old != 0 && !after.contains_key(&pos) {
            changes.push((pos, old, 0));
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_parses_and_runs() {
        let scenario = Scenario::demo().expect("demo parses");
        assert_eq!(scenario.name, "demo");
        let mut engine = RedstoneEngine::default();
        let (grid, summary) = run(&scenario, &mut engine, None).expect("demo runs");
        assert_eq!(summary.ticks, 40);
        // Lever is off again by the end.
        assert_eq!(grid.power_at(Position::new(1, 1, 0)), Some(0));
        assert!(!grid.state(Position::new(4, 1, 0)).get(POWERED));
    }

    #[test]
    fn steps_parse_with_defaults() {
        let scenario: Scenario = toml::from_str(
            r#"
            [[steps]]
            action = "tick"

            [[steps]]
            action = "place"
            pos = [1, 1, 0]
            block = "redstone_block"
            "#,
        )
        .expect("parses");
        assert_eq!(scenario.name, "scenario");
        assert!(matches!(scenario.steps[0], Step::Tick { count: 1 }));
        assert!(matches!(&scenario.steps[1], Step::Place(spec) if spec.block == BlockKind::RedstoneBlock));
    }

    #[test]
    fn lever_step_powers_line() {
        let scenario: Scenario = toml::from_str(
            r#"
            [[blocks]]
            pos = [0, 1, 0]
            block = "lever"
            facing = "down"

            [[blocks]]
            pos = [1, 1, 0]
            block = "redstone_wire"

            [[blocks]]
            pos = [2, 1, 0]
            block = "redstone_wire"

            [[steps]]
            action = "toggle_lever"
            pos = [0, 1, 0]
            "#,
        )
        .expect("parses");
        let mut engine = RedstoneEngine::default();
        let (_, summary) = run(&scenario, &mut engine, None).expect("runs");
        assert_eq!(summary.wires.get(&Position::new(1, 1, 0)), Some(&14));
        assert_eq!(summary.wires.get(&Position::new(2, 1, 0)), Some(&13));
    }

    #[test]
    fn power_changes_reports_removed_wires() {
        let before = BTreeMap::from([(Position::new(1, 1, 0), 14), (Position::new(2, 1, 0), 0)]);
        let after = BTreeMap::from([(Position::new(2, 1, 0), 3)]);
        let changes = power_changes(&before, &after);
        assert_eq!(
            changes,
            vec![(Position::new(2, 1, 0), 0, 3), (Position::new(1, 1, 0), 14, 0)]
        );
    }
}
