// Prerecorded block patterns and their placement transforms.
//
// A `Template` is a captured region: a size, the explicit blocks inside
// it, and named marker positions. Markers are where the template author
// pointed at a cell and said "something happens here"; the stamping code
// dispatches on the marker name (`chest:<loot>`, `spawn:<entity>`, or a
// plain cell to clear).
//
// Template decoding from files is out of scope. Hosts implement
// `TemplateStore` over whatever format they keep templates in;
// `MemoryTemplateStore` is the in-crate reference used by tests.
//
// Transforms follow the capture convention: mirror first, then rotate,
// both about the template's own footprint, so a transformed local
// position stays inside the (possibly swapped) footprint.
//
// See also: `stamp.rs` for template stamping and marker dispatch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bounds::BoundingBox;
use crate::types::{BlockPos, BlockState, Mirror, Rotation};

/// Named cell inside a template.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub name: String,
    /// Local position, relative to the template's min corner.
    pub pos: BlockPos,
}

/// A captured block pattern.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Footprint extents. Local positions range over `0..size` per axis.
    pub size: BlockPos,
    /// Explicit cells. Unlisted cells are untouched at stamp time.
    pub blocks: Vec<(BlockPos, BlockState)>,
    pub markers: Vec<Marker>,
}

impl Template {
    /// World-space bounds of this template placed with its min corner at
    /// `origin` under the given transform.
    pub fn placed_bounds(&self, origin: BlockPos, rotation: Rotation, mirror: Mirror) -> BoundingBox {
        let a = transform_pos(BlockPos::new(0, 0, 0), rotation, mirror, self.size);
        let b = transform_pos(
            BlockPos::new(self.size.x - 1, self.size.y - 1, self.size.z - 1),
            rotation,
            mirror,
            self.size,
        );
        BoundingBox::from_corners(a, b).moved(origin.x, origin.y, origin.z)
    }
}

/// Apply mirror then rotation to a local template position. The result
/// is still footprint-local: a quarter turn maps into the swapped
/// `(size.z, size.y, size.x)` footprint.
pub fn transform_pos(local: BlockPos, rotation: Rotation, mirror: Mirror, size: BlockPos) -> BlockPos {
    let (mut x, y, mut z) = (local.x, local.y, local.z);
    match mirror {
        Mirror::None => {}
        Mirror::LeftRight => z = size.z - 1 - z,
        Mirror::FrontBack => x = size.x - 1 - x,
    }
    match rotation {
        Rotation::None => BlockPos::new(x, y, z),
        Rotation::Clockwise90 => BlockPos::new(size.z - 1 - z, y, x),
        Rotation::Clockwise180 => BlockPos::new(size.x - 1 - x, y, size.z - 1 - z),
        Rotation::Counterclockwise90 => BlockPos::new(z, y, size.x - 1 - x),
    }
}

/// Read access to the template catalog.
pub trait TemplateStore {
    fn load(&self, id: &str) -> Option<&Template>;
}

/// In-memory template catalog keyed by id.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MemoryTemplateStore {
    templates: BTreeMap<String, Template>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, template: Template) {
        self.templates.insert(id.into(), template);
    }
}

impl TemplateStore for MemoryTemplateStore {
    fn load(&self, id: &str) -> Option<&Template> {
        self.templates.get(id)
    }
}
