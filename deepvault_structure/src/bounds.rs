// Integer axis-aligned bounding boxes.
//
// A `BoundingBox` is a closed block region: `min` and `max` are both
// occupied cells, so a one-block box has `min == max`. The collision
// test used during graph growth is open-interior: two boxes that share
// only a boundary face (or edge, or corner) do NOT intersect, which is
// what lets corridors butt up flush against the rooms they connect to.
// Coverage queries (which chunk owns which cells) use the closed test
// `intersects_closed` instead.
//
// Persistence encodes a box as a flat six-int array
// `[min_x, min_y, min_z, max_x, max_y, max_z]`; malformed or inverted
// arrays are hard deserialization errors.
//
// See also: `graph.rs` for the collision scan over accepted pieces,
// `assemble.rs` for the per-chunk restriction boxes built from these.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{BlockPos, Direction};

/// Closed integer block region, `min <= max` componentwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub min: BlockPos,
    pub max: BlockPos,
}

impl BoundingBox {
    /// Construct from min/max corners, normalizing if they are swapped.
    /// Inverted input is a caller bug but is repaired rather than
    /// propagated; the repair is logged.
    pub fn new(min: BlockPos, max: BlockPos) -> Self {
        if min.x > max.x || min.y > max.y || min.z > max.z {
            log::warn!("normalizing inverted bounding box: min {min} max {max}");
            return Self::from_corners(min, max);
        }
        Self { min, max }
    }

    /// Construct from two arbitrary corners, taking the componentwise
    /// min and max.
    pub fn from_corners(a: BlockPos, b: BlockPos) -> Self {
        Self {
            min: BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Place a local `width x height x depth` footprint in world space.
    ///
    /// `(x, y, z)` is the attachment point, `(off_x, off_y, off_z)` the
    /// footprint's offset from it in the piece's local frame, and
    /// `facing` the direction the piece extends in. A south-facing piece
    /// extends toward +z with +x to its left; the other facings are the
    /// corresponding rotations of that layout.
    #[allow(clippy::too_many_arguments)]
    pub fn oriented(
        x: i32,
        y: i32,
        z: i32,
        off_x: i32,
        off_y: i32,
        off_z: i32,
        width: i32,
        height: i32,
        depth: i32,
        facing: Direction,
    ) -> Self {
        match facing {
            Direction::South => Self::new(
                BlockPos::new(x + off_x, y + off_y, z + off_z),
                BlockPos::new(x + off_x + width - 1, y + off_y + height - 1, z + off_z + depth - 1),
            ),
            Direction::North => Self::new(
                BlockPos::new(x + off_x, y + off_y, z - depth + 1 + off_z),
                BlockPos::new(x + off_x + width - 1, y + off_y + height - 1, z + off_z),
            ),
            Direction::West => Self::new(
                BlockPos::new(x - depth + 1 + off_x, y + off_y, z + off_z),
                BlockPos::new(x + off_x, y + off_y + height - 1, z + off_z + width - 1),
            ),
            Direction::East => Self::new(
                BlockPos::new(x + off_x, y + off_y, z + off_z),
                BlockPos::new(x + off_x + depth - 1, y + off_y + height - 1, z + off_z + width - 1),
            ),
        }
    }

    /// Open-interior intersection: true only when the boxes overlap in
    /// more than a shared boundary. Face-flush neighbors do not
    /// intersect; a degenerate box intersects only boxes whose span
    /// strictly contains its cell on every axis.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.max.x > other.min.x
            && other.max.x > self.min.x
            && self.max.y > other.min.y
            && other.max.y > self.min.y
            && self.max.z > other.min.z
            && other.max.z > self.min.z
    }

    /// Closed intersection: true when the boxes share at least one cell.
    /// Used for coverage queries (e.g. which pieces a chunk must stamp),
    /// where a piece whose edge cells lie in the chunk still counts.
    pub fn intersects_closed(&self, other: &BoundingBox) -> bool {
        self.max.x >= other.min.x
            && other.max.x >= self.min.x
            && self.max.y >= other.min.y
            && other.max.y >= self.min.y
            && self.max.z >= other.min.z
            && other.max.z >= self.min.z
    }

    /// Grow in place to cover `other` as well.
    pub fn encapsulate(&mut self, other: &BoundingBox) {
        self.min = BlockPos::new(
            self.min.x.min(other.min.x),
            self.min.y.min(other.min.y),
            self.min.z.min(other.min.z),
        );
        self.max = BlockPos::new(
            self.max.x.max(other.max.x),
            self.max.y.max(other.max.y),
            self.max.z.max(other.max.z),
        );
    }

    /// Union of all boxes in the iterator, or `None` if it is empty.
    pub fn encapsulating<'a>(boxes: impl IntoIterator<Item = &'a BoundingBox>) -> Option<Self> {
        let mut iter = boxes.into_iter();
        let mut acc = *iter.next()?;
        for b in iter {
            acc.encapsulate(b);
        }
        Some(acc)
    }

    /// Center cell, rounding toward `min` on even spans.
    pub fn center(&self) -> BlockPos {
        BlockPos::new(
            self.min.x + (self.max.x - self.min.x) / 2,
            self.min.y + (self.max.y - self.min.y) / 2,
            self.min.z + (self.max.z - self.min.z) / 2,
        )
    }

    /// Number of cells along x (always >= 1).
    pub fn span_x(&self) -> i32 {
        self.max.x - self.min.x + 1
    }

    pub fn span_y(&self) -> i32 {
        self.max.y - self.min.y + 1
    }

    pub fn span_z(&self) -> i32 {
        self.max.z - self.min.z + 1
    }

    /// Inclusive containment test.
    pub fn contains(&self, pos: BlockPos) -> bool {
        pos.x >= self.min.x
            && pos.x <= self.max.x
            && pos.y >= self.min.y
            && pos.y <= self.max.y
            && pos.z >= self.min.z
            && pos.z <= self.max.z
    }

    /// Copy translated by the given offsets.
    pub fn moved(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            min: self.min.offset(dx, dy, dz),
            max: self.max.offset(dx, dy, dz),
        }
    }

    /// Translate in place.
    pub fn move_by(&mut self, dx: i32, dy: i32, dz: i32) {
        self.min = self.min.offset(dx, dy, dz);
        self.max = self.max.offset(dx, dy, dz);
    }

    /// Copy grown by `amount` cells on every face. Negative amounts
    /// shrink; the result is normalized if a shrink crosses over.
    pub fn inflated(&self, amount: i32) -> Self {
        Self::from_corners(
            self.min.offset(-amount, -amount, -amount),
            self.max.offset(amount, amount, amount),
        )
    }
}

impl Serialize for BoundingBox {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z,
        ]
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BoundingBox {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = <[i32; 6]>::deserialize(deserializer)?;
        let min = BlockPos::new(v[0], v[1], v[2]);
        let max = BlockPos::new(v[3], v[4], v[5]);
        if min.x > max.x || min.y > max.y || min.z > max.z {
            return Err(D::Error::custom(format!(
                "inverted bounding box: min {min} max {max}"
            )));
        }
        Ok(BoundingBox { min, max })
    }
}
