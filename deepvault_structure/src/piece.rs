// The closed set of piece variants and their placement data.
//
// A `Piece` is one node of an assembled structure: a bounding box, an
// optional horizontal facing, a recursion depth, and a `PieceKind`
// payload holding only what that variant needs. The kind set is closed
// by design: every behavior difference between kinds is an explicit
// `match`, so adding a variant means the compiler walks you through
// every dispatch site.
//
// One-shot flags (`chest_placed`, `spawner_placed`, `loot_assigned`,
// `entities_spawned`) live on their owning variant and persist with the
// piece. They are what makes Phase 2 idempotent across repeated chunk
// loads.
//
// Local coordinates: x grows to the piece's left, y up, z into the piece
// away from its entry face. The facing maps local to world; the derived
// rotation/mirror pair is what block-level placement uses.
//
// See also: `catalog.rs` for how pieces get created during growth,
// `stamp.rs` for the Phase 2 content each kind stamps.

use deepvault_prng::WorldgenRng;
use serde::{Deserialize, Serialize};

use crate::bounds::BoundingBox;
use crate::types::{BlockPos, Direction, Mirror, Rotation};

/// Entry treatment stamped at a connector piece's front face.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoorStyle {
    Opening,
    Wood,
    Grate,
    Iron,
}

impl DoorStyle {
    /// Weighted draw: plain openings twice as likely as each door type.
    /// Exactly one RNG draw.
    pub fn random(rng: &mut WorldgenRng) -> Self {
        match rng.next_bounded(5) {
            2 => DoorStyle::Wood,
            3 => DoorStyle::Grate,
            4 => DoorStyle::Iron,
            _ => DoorStyle::Opening,
        }
    }
}

/// Per-variant piece payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PieceKind {
    /// Straight 5x5x7 passage. Side exits open into attachment points
    /// for child pieces.
    Corridor {
        entry: DoorStyle,
        left_exit: bool,
        right_exit: bool,
    },
    /// 5x5x5 corner, turning left or right.
    Turn { entry: DoorStyle, left: bool },
    /// 5x11x5 descending stair shaft.
    Stairwell { entry: DoorStyle },
    /// 10x9x11 hub with up to four side exits on two levels.
    Junction {
        entry: DoorStyle,
        left_low: bool,
        left_high: bool,
        right_low: bool,
        right_high: bool,
    },
    /// 14-wide hall; tries a two-story footprint first and falls back to
    /// a single story when that does not fit. Holds one loot chest.
    Gallery {
        entry: DoorStyle,
        tall: bool,
        chest_placed: bool,
    },
    /// The mandatory terminal room. Assembly retries the whole graph
    /// until one of these lands.
    VaultRoom { spawner_placed: bool },
    /// Template-stamped surface ruin. Vertical placement is deferred to
    /// Phase 2, when real terrain height is available.
    Relic {
        template: String,
        rotation: Rotation,
        mirror: Mirror,
        /// Probability that a stamped wall block decays to its mossy
        /// variant.
        mossiness: f32,
        /// Spread ground cover around the footprint after stamping.
        overgrown: bool,
        /// Seed drip columns under placed ground cover.
        drip_columns: bool,
        loot_assigned: bool,
        /// Set once the `spawn:` markers have released their entities.
        entities_spawned: bool,
    },
}

/// One node of an assembled structure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceKind,
    pub bounds: BoundingBox,
    /// Facing of the entry. `None` means untransformed local coordinates
    /// (used by template pieces, which carry their own rotation).
    pub orientation: Option<Direction>,
    /// Distance from the root in the growth tree. Gates catalog choices
    /// and bounds recursion.
    pub depth: u32,
}

impl Piece {
    pub fn new(kind: PieceKind, bounds: BoundingBox, orientation: Option<Direction>, depth: u32) -> Self {
        Self {
            kind,
            bounds,
            orientation,
            depth,
        }
    }

    /// Rotation implied by the facing, for block-level placement.
    pub fn rotation(&self) -> Rotation {
        match self.orientation {
            Some(Direction::West) | Some(Direction::East) => Rotation::Clockwise90,
            _ => Rotation::None,
        }
    }

    /// Mirror implied by the facing.
    pub fn mirror(&self) -> Mirror {
        match self.orientation {
            Some(Direction::North) | Some(Direction::West) => Mirror::LeftRight,
            _ => Mirror::None,
        }
    }

    /// World x of a local `(x, z)` under this piece's facing.
    pub fn world_x(&self, x: i32, z: i32) -> i32 {
        match self.orientation {
            None => x,
            Some(Direction::North) | Some(Direction::South) => self.bounds.min.x + x,
            Some(Direction::West) => self.bounds.max.x - z,
            Some(Direction::East) => self.bounds.min.x + z,
        }
    }

    /// World y of a local y.
    pub fn world_y(&self, y: i32) -> i32 {
        match self.orientation {
            None => y,
            Some(_) => self.bounds.min.y + y,
        }
    }

    /// World z of a local `(x, z)` under this piece's facing.
    pub fn world_z(&self, x: i32, z: i32) -> i32 {
        match self.orientation {
            None => z,
            Some(Direction::North) => self.bounds.max.z - z,
            Some(Direction::South) => self.bounds.min.z + z,
            Some(Direction::West) | Some(Direction::East) => self.bounds.min.z + x,
        }
    }

    pub fn world_pos(&self, x: i32, y: i32, z: i32) -> BlockPos {
        BlockPos::new(self.world_x(x, z), self.world_y(y), self.world_z(x, z))
    }
}
