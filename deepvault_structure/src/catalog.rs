// Weighted connector catalog and the production expander.
//
// During growth, every open exit of an accepted piece asks the catalog
// for a child. The catalog rolls against a weight table (up to five
// rolls per request), honoring per-kind placement caps, depth gates, and
// a no-repeat rule against the immediately previous pick. A successful
// pick probes its footprint against the graph before it counts: floor
// height and collision are checked at creation, so a roll that cannot
// fit falls through to the next candidate in the scan.
//
// The `imposed` slot short-circuits the roll entirely: the imposed kind
// is tried first at the next request, skipping its depth gate. Assembly
// uses it on retry attempts to force the mandatory vault room in early.
//
// Selection stays open while any capped entry still has capacity; once
// the capped kinds are spent the catalog stops producing and growth
// winds down naturally.
//
// See also: `graph.rs` for the growth loop and acceptance gates,
// `config.rs` for the weight table defaults.

use deepvault_prng::WorldgenRng;
use serde::{Deserialize, Serialize};

use crate::bounds::BoundingBox;
use crate::config::{AssemblyConfig, CatalogConfig};
use crate::graph::{CandidateBuf, Expander, PieceGraph};
use crate::piece::{DoorStyle, Piece, PieceKind};
use crate::types::Direction;

/// Connector kinds the catalog can produce. `Relic` is not here: relics
/// are standalone template structures, not graph connectors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectorKind {
    Corridor,
    Turn,
    Stairwell,
    Junction,
    Gallery,
    VaultRoom,
}

#[derive(Clone, Debug)]
struct CatalogEntry {
    kind: ConnectorKind,
    weight: u32,
    max_placements: u32,
    min_depth: u32,
    placed: u32,
}

impl CatalogEntry {
    fn has_capacity(&self) -> bool {
        self.max_placements == 0 || self.placed < self.max_placements
    }

    fn can_place(&self, depth: u32) -> bool {
        self.has_capacity() && depth > self.min_depth
    }
}

/// Mutable per-structure selection state over the weight table.
#[derive(Clone, Debug)]
pub struct WeightedCatalog {
    entries: Vec<CatalogEntry>,
    total_weight: u32,
    imposed: Option<ConnectorKind>,
    previous: Option<ConnectorKind>,
}

impl WeightedCatalog {
    pub fn from_config(config: &CatalogConfig) -> Self {
        Self {
            entries: config
                .entries
                .iter()
                .map(|e| CatalogEntry {
                    kind: e.kind,
                    weight: e.weight,
                    max_placements: e.max_placements,
                    min_depth: e.min_depth,
                    placed: 0,
                })
                .collect(),
            total_weight: 0,
            imposed: None,
            previous: None,
        }
    }

    /// Force `kind` to be tried first at the next selection, skipping
    /// its depth gate. Consumed whether or not the placement fits.
    pub fn impose(&mut self, kind: ConnectorKind) {
        self.imposed = Some(kind);
    }

    pub fn placements(&self, kind: ConnectorKind) -> u32 {
        self.entries
            .iter()
            .find(|e| e.kind == kind)
            .map_or(0, |e| e.placed)
    }

    /// Recompute the total weight. Returns false once no capped entry
    /// has capacity left, which ends selection for this structure.
    fn refresh(&mut self) -> bool {
        self.total_weight = self.entries.iter().map(|e| e.weight).sum();
        self.entries
            .iter()
            .any(|e| e.max_placements > 0 && e.placed < e.max_placements)
    }

    fn note_placement(&mut self, index: usize) {
        self.entries[index].placed += 1;
        self.previous = Some(self.entries[index].kind);
        if !self.entries[index].has_capacity() {
            self.entries.remove(index);
        }
    }

    /// Pick and instantiate a child piece attached at `(x, y, z)` facing
    /// `facing`. Returns `None` when the table is spent, five rolls all
    /// miss, or nothing fits the graph.
    #[allow(clippy::too_many_arguments)]
    pub fn select(
        &mut self,
        graph: &PieceGraph,
        rng: &mut WorldgenRng,
        x: i32,
        y: i32,
        z: i32,
        facing: Direction,
        depth: u32,
        config: &AssemblyConfig,
    ) -> Option<Piece> {
        if !self.refresh() {
            return None;
        }
        if let Some(kind) = self.imposed.take() {
            if let Some(piece) = create_connector(kind, graph, rng, x, y, z, facing, depth, config)
            {
                if let Some(i) = self.entries.iter().position(|e| e.kind == kind) {
                    self.note_placement(i);
                }
                return Some(piece);
            }
        }
        for _ in 0..5 {
            if self.total_weight == 0 {
                return None;
            }
            let mut roll = rng.next_bounded(self.total_weight) as i64;
            let mut index = 0;
            while index < self.entries.len() {
                roll -= self.entries[index].weight as i64;
                if roll < 0 {
                    let entry = &self.entries[index];
                    if !entry.can_place(depth) || Some(entry.kind) == self.previous {
                        break;
                    }
                    let kind = entry.kind;
                    if let Some(piece) =
                        create_connector(kind, graph, rng, x, y, z, facing, depth, config)
                    {
                        self.note_placement(index);
                        return Some(piece);
                    }
                    // Footprint did not fit; fall through and let the
                    // scan try the remaining entries.
                }
                index += 1;
            }
        }
        None
    }
}

/// Floor-height and collision probe shared by all footprints.
fn fits(graph: &PieceGraph, bounds: &BoundingBox, config: &AssemblyConfig) -> bool {
    bounds.min.y > config.min_floor_y && !graph.collides(bounds)
}

/// Instantiate a connector of the given kind attached at `(x, y, z)`.
/// Probes the footprint first; RNG is only consumed once the footprint
/// fits, so failed probes do not disturb the stream.
#[allow(clippy::too_many_arguments)]
pub fn create_connector(
    kind: ConnectorKind,
    graph: &PieceGraph,
    rng: &mut WorldgenRng,
    x: i32,
    y: i32,
    z: i32,
    facing: Direction,
    depth: u32,
    config: &AssemblyConfig,
) -> Option<Piece> {
    match kind {
        ConnectorKind::Corridor => {
            let bounds = BoundingBox::oriented(x, y, z, -1, -1, 0, 5, 5, 7, facing);
            if !fits(graph, &bounds, config) {
                return None;
            }
            let entry = DoorStyle::random(rng);
            let left_exit = rng.random_bool(0.5);
            let right_exit = rng.random_bool(0.5);
            Some(Piece::new(
                PieceKind::Corridor {
                    entry,
                    left_exit,
                    right_exit,
                },
                bounds,
                Some(facing),
                depth,
            ))
        }
        ConnectorKind::Turn => {
            let bounds = BoundingBox::oriented(x, y, z, -1, -1, 0, 5, 5, 5, facing);
            if !fits(graph, &bounds, config) {
                return None;
            }
            let entry = DoorStyle::random(rng);
            let left = rng.random_bool(0.5);
            Some(Piece::new(
                PieceKind::Turn { entry, left },
                bounds,
                Some(facing),
                depth,
            ))
        }
        ConnectorKind::Stairwell => {
            let bounds = BoundingBox::oriented(x, y, z, -1, -7, 0, 5, 11, 5, facing);
            if !fits(graph, &bounds, config) {
                return None;
            }
            let entry = DoorStyle::random(rng);
            Some(Piece::new(
                PieceKind::Stairwell { entry },
                bounds,
                Some(facing),
                depth,
            ))
        }
        ConnectorKind::Junction => {
            let bounds = BoundingBox::oriented(x, y, z, -4, -3, 0, 10, 9, 11, facing);
            if !fits(graph, &bounds, config) {
                return None;
            }
            let entry = DoorStyle::random(rng);
            let left_low = rng.random_bool(0.5);
            let left_high = rng.random_bool(0.5);
            let right_low = rng.random_bool(0.5);
            let right_high = rng.next_bounded(3) > 0;
            Some(Piece::new(
                PieceKind::Junction {
                    entry,
                    left_low,
                    left_high,
                    right_low,
                    right_high,
                },
                bounds,
                Some(facing),
                depth,
            ))
        }
        ConnectorKind::Gallery => {
            // Two-story footprint first, single story as fallback.
            let tall_bounds = BoundingBox::oriented(x, y, z, -4, -1, 0, 14, 11, 15, facing);
            let (bounds, tall) = if fits(graph, &tall_bounds, config) {
                (tall_bounds, true)
            } else {
                let short_bounds = BoundingBox::oriented(x, y, z, -4, -1, 0, 14, 6, 15, facing);
                if !fits(graph, &short_bounds, config) {
                    return None;
                }
                (short_bounds, false)
            };
            let entry = DoorStyle::random(rng);
            Some(Piece::new(
                PieceKind::Gallery {
                    entry,
                    tall,
                    chest_placed: false,
                },
                bounds,
                Some(facing),
                depth,
            ))
        }
        ConnectorKind::VaultRoom => {
            let bounds = BoundingBox::oriented(x, y, z, -4, -1, 0, 11, 8, 16, facing);
            if !fits(graph, &bounds, config) {
                return None;
            }
            Some(Piece::new(
                PieceKind::VaultRoom {
                    spawner_placed: false,
                },
                bounds,
                Some(facing),
                depth,
            ))
        }
    }
}

/// Attachment point on the far face of a piece, in piece-local terms:
/// `off_x` runs along the face, `off_y` up from the piece floor.
fn forward_attach(piece: &Piece, off_x: i32, off_y: i32) -> Option<(i32, i32, i32, Direction)> {
    let facing = piece.orientation?;
    let b = &piece.bounds;
    let y = b.min.y + off_y;
    Some(match facing {
        Direction::North => (b.min.x + off_x, y, b.min.z - 1, facing),
        Direction::South => (b.min.x + off_x, y, b.max.z + 1, facing),
        Direction::West => (b.min.x - 1, y, b.min.z + off_x, facing),
        Direction::East => (b.max.x + 1, y, b.min.z + off_x, facing),
    })
}

/// Attachment point on the piece's left face.
fn left_attach(piece: &Piece, off_y: i32, off_x: i32) -> Option<(i32, i32, i32, Direction)> {
    let facing = piece.orientation?;
    let b = &piece.bounds;
    let y = b.min.y + off_y;
    Some(match facing {
        Direction::North | Direction::South => (b.min.x - 1, y, b.min.z + off_x, Direction::West),
        Direction::West | Direction::East => (b.min.x + off_x, y, b.min.z - 1, Direction::North),
    })
}

/// Attachment point on the piece's right face.
fn right_attach(piece: &Piece, off_y: i32, off_x: i32) -> Option<(i32, i32, i32, Direction)> {
    let facing = piece.orientation?;
    let b = &piece.bounds;
    let y = b.min.y + off_y;
    Some(match facing {
        Direction::North | Direction::South => (b.max.x + 1, y, b.min.z + off_x, Direction::East),
        Direction::West | Direction::East => (b.min.x + off_x, y, b.max.z + 1, Direction::South),
    })
}

/// Catalog-driven expander: one child request per open exit of the
/// parent, left-to-right in a fixed order so the RNG stream is stable.
pub struct CatalogExpander {
    catalog: WeightedCatalog,
    config: AssemblyConfig,
}

impl CatalogExpander {
    pub fn new(config: &AssemblyConfig) -> Self {
        Self {
            catalog: WeightedCatalog::from_config(&config.catalog),
            config: config.clone(),
        }
    }

    pub fn catalog_mut(&mut self) -> &mut WeightedCatalog {
        &mut self.catalog
    }

    fn try_exit(
        &mut self,
        graph: &PieceGraph,
        attach: Option<(i32, i32, i32, Direction)>,
        depth: u32,
        rng: &mut WorldgenRng,
        out: &mut CandidateBuf,
    ) {
        let Some((x, y, z, facing)) = attach else {
            return;
        };
        if let Some(piece) = self
            .catalog
            .select(graph, rng, x, y, z, facing, depth, &self.config)
        {
            out.push(piece);
        }
    }
}

impl Expander for CatalogExpander {
    fn expand(
        &mut self,
        graph: &PieceGraph,
        parent: &Piece,
        rng: &mut WorldgenRng,
        out: &mut CandidateBuf,
    ) {
        let depth = parent.depth + 1;
        match parent.kind {
            PieceKind::Corridor {
                left_exit,
                right_exit,
                ..
            } => {
                self.try_exit(graph, forward_attach(parent, 1, 1), depth, rng, out);
                if left_exit {
                    self.try_exit(graph, left_attach(parent, 1, 2), depth, rng, out);
                }
                if right_exit {
                    self.try_exit(graph, right_attach(parent, 1, 2), depth, rng, out);
                }
            }
            PieceKind::Turn { left, .. } => {
                if left {
                    self.try_exit(graph, left_attach(parent, 1, 1), depth, rng, out);
                } else {
                    self.try_exit(graph, right_attach(parent, 1, 1), depth, rng, out);
                }
            }
            PieceKind::Stairwell { .. } => {
                self.try_exit(graph, forward_attach(parent, 1, 1), depth, rng, out);
            }
            PieceKind::Junction {
                left_low,
                left_high,
                right_low,
                right_high,
                ..
            } => {
                self.try_exit(graph, forward_attach(parent, 5, 1), depth, rng, out);
                if left_low {
                    self.try_exit(graph, left_attach(parent, 1, 3), depth, rng, out);
                }
                if left_high {
                    self.try_exit(graph, left_attach(parent, 7, 5), depth, rng, out);
                }
                if right_low {
                    self.try_exit(graph, right_attach(parent, 1, 3), depth, rng, out);
                }
                if right_high {
                    self.try_exit(graph, right_attach(parent, 7, 5), depth, rng, out);
                }
            }
            // Terminal rooms and template pieces never spawn children.
            PieceKind::Gallery { .. } | PieceKind::VaultRoom { .. } | PieceKind::Relic { .. } => {}
        }
    }
}
