//! Tick-stepping harness for circuits whose behavior unfolds over time.
//!
//! A worldtest steps a small simulation a fixed number of ticks and snapshots
//! selected state after each step. The frames can be asserted on directly or
//! written out as JSONL for inspection.

use crate::circuit::flat_world;
use crate::JsonlSink;
use anyhow::Result;
use redwire_core::{Position, SimTick};
use redwire_world::{RedstoneEngine, VoxelGrid};
use serde::Serialize;
use std::path::Path;

/// Configuration for a worldtest.
#[derive(Debug, Clone)]
pub struct WorldtestConfig {
    /// Human-readable name (written into the report).
    pub name: String,
    /// Number of ticks to step (the report includes the initial frame).
    pub ticks: u64,
}

/// Single snapshot frame captured at a given tick.
#[derive(Debug, Clone, Serialize)]
pub struct WorldtestFrame<S> {
    /// Tick number.
    pub tick: u64,
    /// Snapshot payload.
    pub snapshot: S,
}

/// Frames captured by [`run_worldtest`].
#[derive(Debug, Clone, Serialize)]
pub struct WorldtestReport<S> {
    /// Test name.
    pub name: String,
    /// One frame per tick, starting at tick 0.
    pub frames: Vec<WorldtestFrame<S>>,
}

impl<S> WorldtestReport<S> {
    /// Snapshot at `tick`.
    pub fn at(&self, tick: u64) -> Option<&S> {
        self.frames
            .iter()
            .find(|frame| frame.tick == tick)
            .map(|frame| &frame.snapshot)
    }

    /// Snapshot after the last step.
    pub fn last(&self) -> Option<&S> {
        self.frames.last().map(|frame| &frame.snapshot)
    }

    /// First tick whose snapshot satisfies `pred`.
    pub fn first_tick_where(&self, mut pred: impl FnMut(&S) -> bool) -> Option<u64> {
        self.frames
            .iter()
            .find(|frame| pred(&frame.snapshot))
            .map(|frame| frame.tick)
    }
}

impl<S: Serialize> WorldtestReport<S> {
    /// Write one JSON line per frame.
    pub fn write_jsonl<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut sink = JsonlSink::create(path)?;
        for frame in &self.frames {
            sink.write_value(frame)?;
        }
        Ok(())
    }
}

/// Run a worldtest.
///
/// Captures the initial snapshot at tick 0, then steps `config.ticks` times,
/// capturing a snapshot after each step.
pub fn run_worldtest<State, Snapshot, StepFn, SnapFn>(
    config: WorldtestConfig,
    state: &mut State,
    mut step: StepFn,
    mut snapshot: SnapFn,
) -> WorldtestReport<Snapshot>
where
    StepFn: FnMut(SimTick, &mut State),
    SnapFn: FnMut(SimTick, &State) -> Snapshot,
{
    let mut frames = Vec::with_capacity(config.ticks as usize + 1);

    let mut tick = SimTick::ZERO;
    frames.push(WorldtestFrame {
        tick: tick.0,
        snapshot: snapshot(tick, state),
    });

    for _ in 0..config.ticks {
        step(tick, state);
        tick = tick.advance(1);
        frames.push(WorldtestFrame {
            tick: tick.0,
            snapshot: snapshot(tick, state),
        });
    }

    WorldtestReport {
        name: config.name,
        frames,
    }
}

/// A grid and the engine driving it.
pub struct CircuitWorld {
    /// The world.
    pub grid: VoxelGrid,
    /// The engine.
    pub engine: RedstoneEngine,
}

impl CircuitWorld {
    /// Flat stone world of the given extent driven by `engine`.
    pub fn flat(extent: i32, engine: RedstoneEngine) -> Self {
        Self {
            grid: flat_world(extent),
            engine,
        }
    }

    /// Advance one tick, returning the ticks run.
    pub fn step(&mut self) -> usize {
        self.engine.step(&mut self.grid)
    }

    /// Advance `ticks` ticks.
    pub fn run_ticks(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Step until nothing is pending or `limit` ticks passed. Returns the
    /// ticks stepped.
    pub fn run_until_idle(&mut self, limit: u64) -> u64 {
        let mut stepped = 0;
        while self.grid.pending_ticks() > 0 && stepped < limit {
            self.step();
            stepped += 1;
        }
        stepped
    }

    /// Power stored in the wire at `pos`.
    pub fn power(&self, pos: Position) -> Option<u8> {
        self.grid.power_at(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worldtest_captures_initial_and_stepped_frames() {
        let mut counter = 0u32;
        let report = run_worldtest(
            WorldtestConfig {
                name: "counter".into(),
                ticks: 3,
            },
            &mut counter,
            |_, counter| *counter += 2,
            |tick, counter| (tick.0, *counter),
        );
        assert_eq!(report.frames.len(), 4);
        assert_eq!(report.at(0), Some(&(0, 0)));
        assert_eq!(report.last(), Some(&(3, 6)));
        assert_eq!(report.first_tick_where(|(_, value)| *value >= 4), Some(2));
    }

    #[test]
    fn circuit_world_idles_without_ticks() {
        let mut world = CircuitWorld::flat(4, RedstoneEngine::default());
        assert_eq!(world.run_until_idle(10), 0);
        assert_eq!(world.grid.now(), SimTick::ZERO);
    }
}
