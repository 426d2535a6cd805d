// Foundational coordinate and token types for the assembly engine.
//
// `BlockPos` is a world-space block coordinate; `ChunkPos` addresses a
// 16x16 column of blocks. `Direction`/`Rotation`/`Mirror` describe the
// horizontal orientations pieces and templates can take. `BlockState` is
// an opaque material token: the engine compares and copies states but
// never interprets them, except for the `AIR` sentinel.
//
// See also: `bounds.rs` for the axis-aligned boxes built from `BlockPos`,
// `piece.rs` for the orientation-dependent local-to-world transforms.

use deepvault_prng::WorldgenRng;
use serde::{Deserialize, Serialize};

/// A world-space block coordinate.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub const fn below(self) -> Self {
        Self::new(self.x, self.y - 1, self.z)
    }

    pub const fn above(self) -> Self {
        Self::new(self.x, self.y + 1, self.z)
    }

    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Manhattan distance in the horizontal plane only.
    pub fn horizontal_distance(self, other: BlockPos) -> u32 {
        self.x.abs_diff(other.x) + self.z.abs_diff(other.z)
    }

    pub fn manhattan_distance(self, other: BlockPos) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y) + self.z.abs_diff(other.z)
    }
}

impl std::fmt::Display for BlockPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// A 16x16 column of blocks, addressed in chunk units.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub const fn min_block_x(self) -> i32 {
        self.x << 4
    }

    pub const fn min_block_z(self) -> i32 {
        self.z << 4
    }

    pub const fn max_block_x(self) -> i32 {
        (self.x << 4) + 15
    }

    pub const fn max_block_z(self) -> i32 {
        (self.z << 4) + 15
    }

    /// Chunk containing the given world-space block column.
    pub const fn containing(x: i32, z: i32) -> Self {
        Self::new(x >> 4, z >> 4)
    }
}

impl std::fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

/// One of the four horizontal cardinals. Pieces face one of these; the
/// facing selects the rotation/mirror applied to their local coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    pub const fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    pub const fn clockwise(self) -> Self {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
        }
    }

    pub const fn counterclockwise(self) -> Self {
        self.clockwise().opposite()
    }

    /// Unit step along x for this direction (0 for north/south).
    pub const fn step_x(self) -> i32 {
        match self {
            Direction::East => 1,
            Direction::West => -1,
            _ => 0,
        }
    }

    /// Unit step along z for this direction (0 for east/west).
    pub const fn step_z(self) -> i32 {
        match self {
            Direction::South => 1,
            Direction::North => -1,
            _ => 0,
        }
    }

    /// Uniform draw over the four cardinals. One RNG draw.
    pub fn random(rng: &mut WorldgenRng) -> Self {
        Self::ALL[rng.next_index(Self::ALL.len())]
    }
}

/// Quarter-turn rotations about the vertical axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    None,
    Clockwise90,
    Clockwise180,
    Counterclockwise90,
}

impl Rotation {
    /// Uniform draw over the four rotations. One RNG draw.
    pub fn random(rng: &mut WorldgenRng) -> Self {
        const ALL: [Rotation; 4] = [
            Rotation::None,
            Rotation::Clockwise90,
            Rotation::Clockwise180,
            Rotation::Counterclockwise90,
        ];
        ALL[rng.next_index(ALL.len())]
    }
}

/// Horizontal mirroring applied before rotation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mirror {
    #[default]
    None,
    /// Flip along the z axis (left/right swap when facing south).
    LeftRight,
    /// Flip along the x axis.
    FrontBack,
}

/// Opaque material token. The engine only ever compares these for
/// equality and passes them through to `BlockWorld::set_block`; the one
/// value it knows by name is `AIR`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockState(u16);

impl BlockState {
    pub const AIR: BlockState = BlockState(0);

    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    pub const fn id(self) -> u16 {
        self.0
    }

    pub fn is_air(self) -> bool {
        self == Self::AIR
    }
}

/// Which surface a height query samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeightmapKind {
    /// Topmost non-air block.
    WorldSurface,
    /// Topmost solid block, ignoring fluids.
    OceanFloor,
}

/// Opaque update-flag bits forwarded verbatim to `BlockWorld::set_block`.
/// The engine never inspects them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UpdateFlags(u32);

impl UpdateFlags {
    pub const NONE: UpdateFlags = UpdateFlags(0);

    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }
}
