//! Integer block positions.

use crate::Direction;
use serde::{Deserialize, Serialize};

/// Block position in world space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// East/west coordinate.
    pub x: i32,
    /// Height.
    pub y: i32,
    /// North/south coordinate.
    pub z: i32,
}

impl Position {
    /// World origin.
    pub const ORIGIN: Position = Position { x: 0, y: 0, z: 0 };

    /// Create a new position.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The adjacent position in `direction`.
    pub const fn relative(self, direction: Direction) -> Self {
        self.relative_by(direction, 1)
    }

    /// The position `distance` steps away in `direction`.
    pub const fn relative_by(self, direction: Direction, distance: i32) -> Self {
        let (dx, dy, dz) = direction.offset();
        Self {
            x: self.x + dx * distance,
            y: self.y + dy * distance,
            z: self.z + dz * distance,
        }
    }

    /// One block up.
    pub const fn above(self) -> Self {
        self.relative(Direction::Up)
    }

    /// One block down.
    pub const fn below(self) -> Self {
        self.relative(Direction::Down)
    }

    /// All 6 face neighbors in [`Direction::UPDATE_ORDER`].
    pub fn neighbors(self) -> [Position; 6] {
        Direction::UPDATE_ORDER.map(|dir| self.relative(dir))
    }

    /// Largest per-axis distance to `other`.
    pub fn chebyshev_distance(self, other: Position) -> i32 {
        (self.x - other.x)
            .abs()
            .max((self.y - other.y).abs())
            .max((self.z - other.z).abs())
    }
}

impl From<[i32; 3]> for Position {
    fn from([x, y, z]: [i32; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_moves_one_step() {
        let pos = Position::new(3, 64, -2);
        assert_eq!(pos.relative(Direction::East), Position::new(4, 64, -2));
        assert_eq!(pos.relative(Direction::North), Position::new(3, 64, -3));
        assert_eq!(pos.above(), Position::new(3, 65, -2));
        assert_eq!(pos.below(), Position::new(3, 63, -2));
        assert_eq!(pos.relative_by(Direction::West, 4), Position::new(-1, 64, -2));
    }

    #[test]
    fn test_neighbors_follow_update_order() {
        let pos = Position::ORIGIN;
        let neighbors = pos.neighbors();
        assert_eq!(neighbors[0], Position::new(-1, 0, 0));
        assert_eq!(neighbors[1], Position::new(1, 0, 0));
        assert_eq!(neighbors[2], Position::new(0, -1, 0));
        assert_eq!(neighbors[3], Position::new(0, 1, 0));
        assert_eq!(neighbors[4], Position::new(0, 0, -1));
        assert_eq!(neighbors[5], Position::new(0, 0, 1));
    }

    #[test]
    fn test_chebyshev_distance() {
        let a = Position::new(0, 0, 0);
        assert_eq!(a.chebyshev_distance(Position::new(2, -1, 1)), 2);
        assert_eq!(a.chebyshev_distance(a), 0);
    }
}
