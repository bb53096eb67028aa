//! Cardinal directions and the fixed traversal orders used by update fan-out.

use serde::{Deserialize, Serialize};

/// One of the six face directions of a voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// -Y
    Down,
    /// +Y
    Up,
    /// -Z
    North,
    /// +Z
    South,
    /// -X
    West,
    /// +X
    East,
}

/// Coordinate axis of a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// East/west.
    X,
    /// Up/down.
    Y,
    /// North/south.
    Z,
}

impl Direction {
    /// All directions in declaration order.
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// Horizontal directions, clockwise starting at north.
    pub const HORIZONTAL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Order used when a block tells its neighbors that it changed.
    pub const UPDATE_ORDER: [Direction; 6] = [
        Direction::West,
        Direction::East,
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
    ];

    /// Unit offset `(dx, dy, dz)`.
    pub const fn offset(self) -> (i32, i32, i32) {
        match self {
            Direction::Down => (0, -1, 0),
            Direction::Up => (0, 1, 0),
            Direction::North => (0, 0, -1),
            Direction::South => (0, 0, 1),
            Direction::West => (-1, 0, 0),
            Direction::East => (1, 0, 0),
        }
    }

    /// The direction pointing the other way.
    pub const fn opposite(self) -> Direction {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::East => Direction::West,
        }
    }

    /// Rotate a horizontal direction 90° clockwise (seen from above).
    /// Vertical directions are returned unchanged.
    pub const fn clockwise(self) -> Direction {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
            other => other,
        }
    }

    /// Axis this direction lies on.
    pub const fn axis(self) -> Axis {
        match self {
            Direction::Down | Direction::Up => Axis::Y,
            Direction::North | Direction::South => Axis::Z,
            Direction::West | Direction::East => Axis::X,
        }
    }

    /// True for the four compass directions.
    pub const fn is_horizontal(self) -> bool {
        !matches!(self, Direction::Down | Direction::Up)
    }

    /// Stable index in [`Direction::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Direction::Down => 0,
            Direction::Up => 1,
            Direction::North => 2,
            Direction::South => 3,
            Direction::West => 4,
            Direction::East => 5,
        }
    }

    /// Inverse of [`Direction::index`], wrapping out-of-range values.
    pub const fn from_index(index: usize) -> Direction {
        Direction::ALL[index % 6]
    }
}

/// Traversal order for shape-update fan-out.
///
/// Both orders are deterministic; they only differ in whether the four
/// horizontal faces are visited before or after the two vertical ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionOrder {
    /// West, east, north, south, down, up.
    #[default]
    HorizontalFirst,
    /// Down, up, west, east, north, south.
    VerticalFirst,
}

impl DirectionOrder {
    /// The six directions in this order.
    pub const fn directions(self) -> [Direction; 6] {
        match self {
            DirectionOrder::HorizontalFirst => [
                Direction::West,
                Direction::East,
                Direction::North,
                Direction::South,
                Direction::Down,
                Direction::Up,
            ],
            DirectionOrder::VerticalFirst => [
                Direction::Down,
                Direction::Up,
                Direction::West,
                Direction::East,
                Direction::North,
                Direction::South,
            ],
        }
    }
}
