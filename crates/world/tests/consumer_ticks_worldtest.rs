//! Scheduled-tick behavior of lamps, buttons and detector rails.

use redwire_core::{Direction, Position};
use redwire_testkit::{place_all, run_worldtest, wire, CircuitWorld, WorldtestConfig};
use redwire_world::block::{FACING, POWERED, RAIL_SHAPE};
use redwire_world::blocks::consumers::LAMP_OFF_DELAY;
use redwire_world::blocks::rail::DETECTOR_CHECK_PERIOD;
use redwire_world::blocks::sources::BUTTON_PRESS_TICKS;
use redwire_world::{
    BlockKind, BlockState, EngineConfig, RailShape, RedstoneEngine, StrategyKind,
};

fn attached(kind: BlockKind) -> BlockState {
    BlockState::new(kind).with(FACING, Direction::Down)
}

fn place(world: &mut CircuitWorld, pos: Position, state: BlockState) {
    place_all(&mut world.engine, &mut world.grid, &[pos], state).expect("block placed");
}

#[test]
fn lamp_lights_at_once_and_fades_after_delay() {
    let mut world = CircuitWorld::flat(8, RedstoneEngine::default());
    let lever = Position::new(0, 1, 0);
    let lamp = Position::new(1, 1, 0);
    place(&mut world, lever, attached(BlockKind::Lever));
    place(&mut world, lamp, BlockState::new(BlockKind::Lamp));
    assert!(!world.grid.state(lamp).get(POWERED));

    assert_eq!(world.engine.toggle_lever(&mut world.grid, lever), Ok(true));
    assert!(world.grid.state(lamp).get(POWERED), "lamp lights without a tick");

    assert_eq!(world.engine.toggle_lever(&mut world.grid, lever), Ok(true));
    let report = run_worldtest(
        WorldtestConfig {
            name: "lamp_fade".into(),
            ticks: u64::from(LAMP_OFF_DELAY) + 2,
        },
        &mut world,
        |_, world| {
            world.step();
        },
        |_, world| world.grid.state(lamp).get(POWERED),
    );
    assert_eq!(
        report.first_tick_where(|lit| !*lit),
        Some(u64::from(LAMP_OFF_DELAY))
    );
}

#[test]
fn lamp_that_regains_power_stays_lit() {
    let mut world = CircuitWorld::flat(8, RedstoneEngine::default());
    let lever = Position::new(0, 1, 0);
    let lamp = Position::new(1, 1, 0);
    place(&mut world, lever, attached(BlockKind::Lever));
    place(&mut world, lamp, BlockState::new(BlockKind::Lamp));

    world.engine.toggle_lever(&mut world.grid, lever).expect("lever");
    world.engine.toggle_lever(&mut world.grid, lever).expect("lever");
    world.step();
    world.engine.toggle_lever(&mut world.grid, lever).expect("lever");
    world.run_ticks(u64::from(LAMP_OFF_DELAY) * 2);
    assert!(world.grid.state(lamp).get(POWERED));
}

#[test]
fn lamp_placed_next_to_power_starts_lit() {
    let mut world = CircuitWorld::flat(8, RedstoneEngine::default());
    place(&mut world, Position::new(0, 1, 0), BlockState::new(BlockKind::RedstoneBlock));
    place(&mut world, Position::new(1, 1, 0), BlockState::new(BlockKind::Lamp));
    assert!(world.grid.state(Position::new(1, 1, 0)).get(POWERED));
}

#[test]
fn button_releases_after_press_ticks() {
    for strategy in StrategyKind::ALL {
        let engine = RedstoneEngine::new(EngineConfig::default().with_strategy(strategy));
        let mut world = CircuitWorld::flat(8, engine);
        let button = Position::new(0, 1, 0);
        let line = Position::new(1, 1, 0);
        place(&mut world, button, attached(BlockKind::Button));
        place(&mut world, line, wire());

        assert_eq!(world.engine.press_button(&mut world.grid, button), Ok(true));
        assert_eq!(world.power(line), Some(14));
        assert_eq!(world.engine.press_button(&mut world.grid, button), Ok(false));

        world.run_ticks(u64::from(BUTTON_PRESS_TICKS) - 1);
        assert_eq!(world.power(line), Some(14), "{}", strategy.name());
        world.step();
        assert_eq!(world.power(line), Some(0), "{}", strategy.name());
        assert!(!world.grid.state(button).get(POWERED));
    }
}

#[test]
fn refused_release_keeps_button_down() {
    let button = Position::new(0, 1, 0);
    let engine = RedstoneEngine::default()
        .with_hook(move |pos: Position, old: u8, proposed: u8| {
            if pos == button && proposed == 0 {
                old
            } else {
                proposed
            }
        });
    let mut world = CircuitWorld::flat(8, engine);
    place(&mut world, button, attached(BlockKind::Button));
    world.engine.press_button(&mut world.grid, button).expect("button");

    world.run_ticks(u64::from(BUTTON_PRESS_TICKS) * 3);
    assert!(world.grid.state(button).get(POWERED));
    assert_eq!(world.grid.pending_ticks(), 1);
}

#[test]
fn detector_rail_follows_occupancy() {
    let mut world = CircuitWorld::flat(8, RedstoneEngine::default());
    let detector = Position::new(0, 1, 0);
    let line = Position::new(0, 1, 1);
    place(
        &mut world,
        detector,
        BlockState::new(BlockKind::DetectorRail).with(RAIL_SHAPE, RailShape::EastWest),
    );
    place(&mut world, line, wire());
    assert_eq!(world.power(line), Some(0));

    world.grid.set_occupied(detector, true);
    assert_eq!(world.engine.entity_inside(&mut world.grid, detector), Ok(true));
    assert!(world.grid.state(detector).get(POWERED));
    assert_eq!(world.power(line), Some(14));

    // Entering a pressed rail does nothing new.
    assert_eq!(world.engine.entity_inside(&mut world.grid, detector), Ok(false));

    // Still occupied at the first check: stays pressed and reschedules.
    world.run_ticks(u64::from(DETECTOR_CHECK_PERIOD));
    assert!(world.grid.state(detector).get(POWERED));

    world.grid.set_occupied(detector, false);
    world.run_ticks(u64::from(DETECTOR_CHECK_PERIOD));
    assert!(!world.grid.state(detector).get(POWERED));
    assert_eq!(world.power(line), Some(0));
    assert_eq!(world.run_until_idle(100), 0);
}

#[test]
fn detector_rail_strongly_powers_block_below() {
    let mut world = CircuitWorld::flat(8, RedstoneEngine::default());
    let detector = Position::new(0, 1, 0);
    place(
        &mut world,
        detector,
        BlockState::new(BlockKind::DetectorRail).with(RAIL_SHAPE, RailShape::NorthSouth),
    );
    world.grid.set_occupied(detector, true);
    world.engine.entity_inside(&mut world.grid, detector).expect("loaded");

    // The floor under the rail is strongly powered and passes it sideways.
    let below = Position::new(0, 0, 0);
    assert!(world.engine.has_neighbor_signal(&world.grid, below.relative(Direction::East)));
    assert_eq!(world.engine.signal(&world.grid, detector, Direction::Up), 15);
}
