//! The world as seen by the circuit engine.

use crate::block::{BlockKind, BlockState};
use redwire_core::{Position, UpdateFlags};

/// Block storage the engine reads from and writes into.
///
/// Reads of unloaded cells return `None`. Writes may be refused (unloaded
/// chunk, protected region, cancelled by a plugin layer); a refused write ends
/// that branch of the cascade.
pub trait Level {
    /// State at `pos`, or `None` if the cell is not loaded.
    fn block_state(&self, pos: Position) -> Option<BlockState>;

    /// Store `state` at `pos`. Returns false if the write was refused.
    fn set_block(&mut self, pos: Position, state: BlockState, flags: UpdateFlags) -> bool;

    /// Ask for a scheduled tick of `kind` at `pos` after `delay` ticks.
    fn schedule_tick(&mut self, pos: Position, kind: BlockKind, delay: u32);

    /// Whether a tick of `kind` at `pos` is already pending.
    fn has_scheduled_tick(&self, pos: Position, kind: BlockKind) -> bool;

    /// Whether an entity stands in the cell.
    fn is_occupied(&self, _pos: Position) -> bool {
        false
    }

    /// Hand the drops of a destroyed block to the item layer.
    fn drop_items(&mut self, _pos: Position, _state: BlockState) {}

    /// State at `pos`, treating unloaded cells as air.
    fn state_or_air(&self, pos: Position) -> BlockState {
        self.block_state(pos).unwrap_or(BlockState::AIR)
    }

    /// Whether `pos` can be read.
    fn is_loaded(&self, pos: Position) -> bool {
        self.block_state(pos).is_some()
    }
}
