//! Block kinds and immutable block states.
//!
//! A [`BlockState`] is a `(kind, bits)` pair. Properties such as wire power or
//! rail shape are packed into the bits and read or replaced through typed
//! [`Property`] handles, so every change produces a new value and equality is
//! plain value equality.

use redwire_core::Direction;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Every block the circuit engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Empty space.
    Air,
    /// Full opaque conductor.
    Stone,
    /// Full transparent non-conductor.
    Glass,
    /// Non-conductor that still carries wire on top.
    Hopper,
    /// Redstone wire.
    RedstoneWire,
    /// Constant full-strength source.
    RedstoneBlock,
    /// Toggle source.
    Lever,
    /// Momentary source.
    Button,
    /// Directional source on one axis.
    Repeater,
    /// Directional source that outputs from its back.
    Observer,
    /// Consumer that lights while powered.
    Lamp,
    /// Plain rail, may curve.
    Rail,
    /// Straight rail that needs power.
    PoweredRail,
    /// Straight rail that emits while occupied.
    DetectorRail,
}

impl BlockKind {
    /// Stable lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            BlockKind::Air => "air",
            BlockKind::Stone => "stone",
            BlockKind::Glass => "glass",
            BlockKind::Hopper => "hopper",
            BlockKind::RedstoneWire => "redstone_wire",
            BlockKind::RedstoneBlock => "redstone_block",
            BlockKind::Lever => "lever",
            BlockKind::Button => "button",
            BlockKind::Repeater => "repeater",
            BlockKind::Observer => "observer",
            BlockKind::Lamp => "lamp",
            BlockKind::Rail => "rail",
            BlockKind::PoweredRail => "powered_rail",
            BlockKind::DetectorRail => "detector_rail",
        }
    }

    /// True for the three rail kinds.
    pub fn is_rail(self) -> bool {
        matches!(
            self,
            BlockKind::Rail | BlockKind::PoweredRail | BlockKind::DetectorRail
        )
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a wire meets one of its horizontal neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedstoneSide {
    /// Not connected.
    #[default]
    None,
    /// Connected along the floor.
    Side,
    /// Connected and climbing the neighbor's face.
    Up,
}

impl RedstoneSide {
    /// Anything but [`RedstoneSide::None`].
    pub fn is_connected(self) -> bool {
        self != RedstoneSide::None
    }
}

/// Track layout of a rail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RailShape {
    #[default]
    NorthSouth,
    EastWest,
    AscendingEast,
    AscendingWest,
    AscendingNorth,
    AscendingSouth,
    SouthEast,
    SouthWest,
    NorthWest,
    NorthEast,
}

impl RailShape {
    /// All shapes in declaration order.
    pub const ALL: [RailShape; 10] = [
        RailShape::NorthSouth,
        RailShape::EastWest,
        RailShape::AscendingEast,
        RailShape::AscendingWest,
        RailShape::AscendingNorth,
        RailShape::AscendingSouth,
        RailShape::SouthEast,
        RailShape::SouthWest,
        RailShape::NorthWest,
        RailShape::NorthEast,
    ];

    /// True for the four sloped shapes.
    pub fn is_ascending(self) -> bool {
        matches!(
            self,
            RailShape::AscendingEast
                | RailShape::AscendingWest
                | RailShape::AscendingNorth
                | RailShape::AscendingSouth
        )
    }

    /// True for the four curved shapes.
    pub fn is_curve(self) -> bool {
        matches!(
            self,
            RailShape::SouthEast | RailShape::SouthWest | RailShape::NorthWest | RailShape::NorthEast
        )
    }

    /// Direction the track climbs towards, if sloped.
    pub fn ascending_towards(self) -> Option<Direction> {
        match self {
            RailShape::AscendingEast => Some(Direction::East),
            RailShape::AscendingWest => Some(Direction::West),
            RailShape::AscendingNorth => Some(Direction::North),
            RailShape::AscendingSouth => Some(Direction::South),
            _ => None,
        }
    }
}

/// A value that can be packed into [`BlockState`] bits.
pub trait PropertyValue: Copy {
    /// Encode into the low bits.
    fn to_bits(self) -> u16;
    /// Decode from the low bits.
    fn from_bits(bits: u16) -> Self;
}

impl PropertyValue for u8 {
    fn to_bits(self) -> u16 {
        u16::from(self)
    }

    fn from_bits(bits: u16) -> Self {
        bits as u8
    }
}

impl PropertyValue for bool {
    fn to_bits(self) -> u16 {
        u16::from(self)
    }

    fn from_bits(bits: u16) -> Self {
        bits != 0
    }
}

impl PropertyValue for RedstoneSide {
    fn to_bits(self) -> u16 {
        match self {
            RedstoneSide::None => 0,
            RedstoneSide::Side => 1,
            RedstoneSide::Up => 2,
        }
    }

    fn from_bits(bits: u16) -> Self {
        match bits {
            1 => RedstoneSide::Side,
            2 => RedstoneSide::Up,
            _ => RedstoneSide::None,
        }
    }
}

impl PropertyValue for RailShape {
    fn to_bits(self) -> u16 {
        RailShape::ALL
            .iter()
            .position(|shape| *shape == self)
            .unwrap_or(0) as u16
    }

    fn from_bits(bits: u16) -> Self {
        RailShape::ALL
            .get(bits as usize)
            .copied()
            .unwrap_or_default()
    }
}

impl PropertyValue for Direction {
    fn to_bits(self) -> u16 {
        self.index() as u16
    }

    fn from_bits(bits: u16) -> Self {
        Direction::from_index(bits as usize)
    }
}

/// Typed handle to a bit field inside [`BlockState`].
pub struct Property<T> {
    name: &'static str,
    shift: u16,
    width: u16,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Property<T> {}

impl<T> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property").field("name", &self.name).finish()
    }
}

impl<T: PropertyValue> Property<T> {
    const fn new(name: &'static str, shift: u16, width: u16) -> Self {
        Self {
            name,
            shift,
            width,
            _marker: PhantomData,
        }
    }

    /// Property name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn mask(&self) -> u16 {
        ((1u16 << self.width) - 1) << self.shift
    }
}

/// Wire power, 0..=15.
pub const POWER: Property<u8> = Property::new("power", 0, 4);
/// Wire connection towards north.
pub const NORTH: Property<RedstoneSide> = Property::new("north", 4, 2);
/// Wire connection towards east.
pub const EAST: Property<RedstoneSide> = Property::new("east", 6, 2);
/// Wire connection towards south.
pub const SOUTH: Property<RedstoneSide> = Property::new("south", 8, 2);
/// Wire connection towards west.
pub const WEST: Property<RedstoneSide> = Property::new("west", 10, 2);
/// Rail track layout. Shares bits with the wire sides.
pub const RAIL_SHAPE: Property<RailShape> = Property::new("shape", 4, 4);
/// Powered/lit/pressed flag.
pub const POWERED: Property<bool> = Property::new("powered", 12, 1);
/// Facing of levers, buttons, repeaters and observers.
pub const FACING: Property<Direction> = Property::new("facing", 13, 3);

/// The wire side property for a horizontal direction.
pub fn side_property(direction: Direction) -> Option<Property<RedstoneSide>> {
    match direction {
        Direction::North => Some(NORTH),
        Direction::East => Some(EAST),
        Direction::South => Some(SOUTH),
        Direction::West => Some(WEST),
        Direction::Up | Direction::Down => None,
    }
}

/// Immutable block state value.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockState {
    kind: BlockKind,
    bits: u16,
}

impl BlockState {
    /// Air.
    pub const AIR: BlockState = BlockState::new(BlockKind::Air);

    /// Default state of `kind`: unpowered, no connections, north-south rails,
    /// facing down.
    pub const fn new(kind: BlockKind) -> Self {
        Self { kind, bits: 0 }
    }

    /// Block kind.
    pub fn kind(self) -> BlockKind {
        self.kind
    }

    /// Raw packed bits.
    pub fn bits(self) -> u16 {
        self.bits
    }

    /// Same kind?
    pub fn is(self, kind: BlockKind) -> bool {
        self.kind == kind
    }

    /// Is this air?
    pub fn is_air(self) -> bool {
        self.kind == BlockKind::Air
    }

    /// Read a property. Properties are only meaningful for kinds that use them.
    pub fn get<T: PropertyValue>(self, property: Property<T>) -> T {
        T::from_bits((self.bits & property.mask()) >> property.shift)
    }

    /// Return a copy with `property` replaced.
    pub fn with<T: PropertyValue>(self, property: Property<T>, value: T) -> Self {
        let mask = property.mask();
        let encoded = (value.to_bits() << property.shift) & mask;
        Self {
            kind: self.kind,
            bits: (self.bits & !mask) | encoded,
        }
    }

    /// Fully opaque blocks that pass strong power through.
    pub fn is_conductor(self) -> bool {
        matches!(self.kind, BlockKind::Stone | BlockKind::Lamp)
    }

    /// Whether `face` is a full square that can hold attachments.
    pub fn is_face_sturdy(self, _face: Direction) -> bool {
        matches!(
            self.kind,
            BlockKind::Stone
                | BlockKind::Glass
                | BlockKind::Lamp
                | BlockKind::RedstoneBlock
                | BlockKind::Observer
        )
    }

    /// Whether wire may rest on top of this block.
    pub fn can_support_wire(self) -> bool {
        self.is_face_sturdy(Direction::Up) || self.kind == BlockKind::Hopper
    }

    /// Whether a rail may rest on top of this block.
    pub fn can_support_rail(self) -> bool {
        self.can_support_wire()
    }
}

impl Default for BlockState {
    fn default() -> Self {
        Self::AIR
    }
}

impl fmt::Debug for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{:#06x}]", self.kind, self.bits)
    }
}
