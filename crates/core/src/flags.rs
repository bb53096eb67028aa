//! Block write flags.

use bitflags::bitflags;

bitflags! {
    /// Flags passed alongside every block write.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct UpdateFlags: u8 {
        /// Notify neighbors that this block changed.
        const NEIGHBORS = 1;
        /// Send the change to clients.
        const CLIENTS = 2;
        /// Do not re-render.
        const INVISIBLE = 4;
        /// Re-render on the main thread right away.
        const IMMEDIATE = 8;
        /// Skip the shape-update fan-out; the caller already resolved shapes.
        const KNOWN_SHAPE = 16;
        /// Destroying the previous block drops nothing.
        const SUPPRESS_DROPS = 32;
        /// The write is part of a piston move.
        const MOVE_BY_PISTON = 64;

        /// No neighbor or client side effects.
        const NONE = Self::INVISIBLE.bits();
        /// Neighbors and clients.
        const ALL = Self::NEIGHBORS.bits() | Self::CLIENTS.bits();
        /// [`UpdateFlags::ALL`] plus an immediate re-render.
        const ALL_IMMEDIATE = Self::ALL.bits() | Self::IMMEDIATE.bits();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_values() {
        assert_eq!(UpdateFlags::NONE.bits(), 4);
        assert_eq!(UpdateFlags::ALL.bits(), 3);
        assert_eq!(UpdateFlags::ALL_IMMEDIATE.bits(), 11);
    }

    #[test]
    fn test_strip_piston_flag() {
        let flags = UpdateFlags::ALL | UpdateFlags::MOVE_BY_PISTON;
        let stripped = flags & !UpdateFlags::MOVE_BY_PISTON;
        assert!(stripped.contains(UpdateFlags::NEIGHBORS));
        assert!(!stripped.contains(UpdateFlags::MOVE_BY_PISTON));
    }
}
