//! Extension points that let outside code observe and override the engine.

use crate::block::BlockState;
use redwire_core::Position;

/// Authorizes every power transition the engine wants to make.
///
/// The hook is called once per attempted change and never for a no-op.
/// Whatever it returns is authoritative: returning `old` cancels the change
/// and nothing cascades from that block, returning another value stores that
/// value instead of the proposal.
pub trait RedstoneChangeHook {
    /// Decide the power `pos` actually moves to.
    fn on_redstone_change(&mut self, pos: Position, old: u8, proposed: u8) -> u8;
}

/// Accepts every proposal.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl RedstoneChangeHook for Passthrough {
    fn on_redstone_change(&mut self, _pos: Position, _old: u8, proposed: u8) -> u8 {
        proposed
    }
}

impl<F> RedstoneChangeHook for F
where
    F: FnMut(Position, u8, u8) -> u8,
{
    fn on_redstone_change(&mut self, pos: Position, old: u8, proposed: u8) -> u8 {
        self(pos, old, proposed)
    }
}

/// May veto a single neighbor update before it reaches the block.
pub trait NeighborUpdateHook {
    /// Return false to drop the update.
    fn allow_neighbor_update(
        &mut self,
        pos: Position,
        state: BlockState,
        source_pos: Position,
    ) -> bool;
}

impl<F> NeighborUpdateHook for F
where
    F: FnMut(Position, BlockState, Position) -> bool,
{
    fn allow_neighbor_update(
        &mut self,
        pos: Position,
        state: BlockState,
        source_pos: Position,
    ) -> bool {
        self(pos, state, source_pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough_accepts_proposal() {
        let mut hook = Passthrough;
        assert_eq!(hook.on_redstone_change(Position::ORIGIN, 0, 7), 7);
    }

    #[test]
    fn test_closure_hook_can_clamp() {
        let mut hook = |_: Position, _: u8, proposed: u8| proposed.min(4);
        assert_eq!(hook.on_redstone_change(Position::ORIGIN, 0, 15), 4);
        assert_eq!(hook.on_redstone_change(Position::ORIGIN, 15, 2), 2);
    }
}
