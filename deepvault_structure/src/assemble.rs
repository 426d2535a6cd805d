// Two-phase structure generation protocol.
//
// Phase 1 (`VaultWarren::generate`, `RelicRuin::generate`) decides
// WHERE a structure goes and returns a `GenerationStub`: an anchor plus
// a deferred builder. Calling `build()` runs graph growth (with bounded
// whole-graph retry for the warren) and yields the finalized
// `PieceGraph`. Phase 1 never touches the world; hosts persist the
// graph and re-load it instead of re-running growth.
//
// Phase 2 (`place_in_chunk`) stamps the graph into block storage one
// chunk at a time: it builds the chunk's full-height restriction box,
// walks the accepted pieces in order, and post-processes every piece
// whose box shares cells with the chunk. Calls for different chunks may
// happen far apart in time but never concurrently.
//
// Per-structure randomness derives from (world seed, chunk) through a
// positional fork, so neighboring structures never share a stream.
//
// **Critical constraint: determinism.** The same (seed, chunk, config,
// terrain) always produces the same graph, and the same (graph, chunk)
// always produces the same writes, regardless of the order chunks load.
//
// See also: `graph.rs` for growth and retry, `stamp.rs` for the
// per-piece writes.

use deepvault_prng::WorldgenRng;

use crate::bounds::BoundingBox;
use crate::catalog::{CatalogExpander, ConnectorKind, create_connector};
use crate::config::AssemblyConfig;
use crate::graph::{AssemblyError, PieceGraph, build_with_retry};
use crate::piece::{Piece, PieceKind};
use crate::stamp::{MaterialPalette, StampContext, post_process};
use crate::template::TemplateStore;
use crate::types::{BlockPos, ChunkPos, Direction, HeightmapKind, Mirror, Rotation};
use crate::world::{BlockWorld, HeightQuery};

/// Inputs to Phase 1.
pub struct GenerationContext<'a> {
    pub chunk: ChunkPos,
    /// World seed. Per-structure streams are forked from this and the
    /// chunk position.
    pub seed: u64,
    pub height: &'a dyn HeightQuery,
    pub config: &'a AssemblyConfig,
}

/// A placed-but-unbuilt structure: the anchor Phase 1 chose, plus the
/// deferred graph construction.
pub struct GenerationStub<'a> {
    pub anchor: BlockPos,
    builder: Box<dyn FnOnce() -> Result<PieceGraph, AssemblyError> + 'a>,
}

impl GenerationStub<'_> {
    /// Run growth and return the finalized graph.
    pub fn build(self) -> Result<PieceGraph, AssemblyError> {
        (self.builder)()
    }
}

/// Deterministic per-structure seed from the world seed and the
/// originating chunk.
fn chunk_seed(world_seed: u64, chunk: ChunkPos) -> u64 {
    WorldgenRng::new(world_seed)
        .fork_at(chunk.x, 0, chunk.z)
        .next_u64()
}

/// The underground vault warren: a grown connector graph terminating in
/// the mandatory vault room.
pub struct VaultWarren;

impl VaultWarren {
    /// Phase 1: anchor in the chunk, clamped under the terrain surface.
    /// Returns `None` when the terrain is too low to fit a structure
    /// above the floor limit.
    pub fn generate<'a>(ctx: &GenerationContext<'a>) -> Option<GenerationStub<'a>> {
        let x = ctx.chunk.min_block_x() + 2;
        let z = ctx.chunk.min_block_z() + 2;
        let surface = ctx.height.height_at(x, z, HeightmapKind::WorldSurface);
        let y = ctx.config.start_height.min(surface);
        // Root stairwell descends 7 below the anchor; leave headroom
        // over the floor limit.
        if y - 7 <= ctx.config.min_floor_y {
            return None;
        }
        let anchor = BlockPos::new(x, y, z);
        let seed = chunk_seed(ctx.seed, ctx.chunk);
        let config = ctx.config;
        Some(GenerationStub {
            anchor,
            builder: Box::new(move || build_vault_warren(seed, anchor, config)),
        })
    }
}

fn build_vault_warren(
    seed: u64,
    anchor: BlockPos,
    config: &AssemblyConfig,
) -> Result<PieceGraph, AssemblyError> {
    let mut attempt = 0u32;
    build_with_retry(
        config,
        seed,
        |rng| {
            let mut graph = PieceGraph::new();
            let facing = Direction::random(rng);
            let mut expander = CatalogExpander::new(config);
            if attempt > 0 {
                // Natural growth missed the vault last time; force it
                // into the first expansion of this attempt.
                expander.catalog_mut().impose(ConnectorKind::VaultRoom);
            }
            attempt += 1;
            if let Some(root) = create_connector(
                ConnectorKind::Stairwell,
                &graph,
                rng,
                anchor.x,
                anchor.y,
                anchor.z,
                facing,
                0,
                config,
            ) {
                graph.push(root);
                graph.grow(&mut expander, rng, anchor, config);
            }
            graph
        },
        |graph| graph.has_vault_room(),
    )
}

/// A single-template surface ruin. The graph is one relic piece whose
/// vertical position stays provisional until Phase 2 samples real
/// terrain.
pub struct RelicRuin;

impl RelicRuin {
    pub fn generate<'a>(
        ctx: &GenerationContext<'a>,
        template_id: &str,
        templates: &dyn TemplateStore,
    ) -> Option<GenerationStub<'a>> {
        let template = templates.load(template_id)?;
        let mut rng = WorldgenRng::new(chunk_seed(ctx.seed, ctx.chunk));
        let rotation = Rotation::random(&mut rng);
        let mirror = match rng.next_bounded(4) {
            2 => Mirror::LeftRight,
            3 => Mirror::FrontBack,
            _ => Mirror::None,
        };
        let mossiness = rng.next_f32() * 0.25;
        let overgrown = rng.random_bool(0.5);
        let drip_columns = overgrown && rng.random_bool(0.5);
        let x = ctx.chunk.min_block_x() + rng.next_bounded(16) as i32;
        let z = ctx.chunk.min_block_z() + rng.next_bounded(16) as i32;
        let origin = BlockPos::new(x, ctx.config.start_height, z);
        let bounds = template.placed_bounds(origin, rotation, mirror);
        let piece = Piece::new(
            PieceKind::Relic {
                template: template_id.to_owned(),
                rotation,
                mirror,
                mossiness,
                overgrown,
                drip_columns,
                loot_assigned: false,
                entities_spawned: false,
            },
            bounds,
            None,
            0,
        );
        Some(GenerationStub {
            anchor: origin,
            builder: Box::new(move || {
                let mut graph = PieceGraph::new();
                graph.push(piece);
                Ok(graph)
            }),
        })
    }
}

/// Full-height restriction box for one chunk.
pub fn chunk_restriction_box(chunk: ChunkPos, config: &AssemblyConfig) -> BoundingBox {
    BoundingBox::new(
        BlockPos::new(chunk.min_block_x(), config.world_min_y, chunk.min_block_z()),
        BlockPos::new(chunk.max_block_x(), config.world_max_y, chunk.max_block_z()),
    )
}

/// Phase 2 for one chunk: stamp every piece whose box shares cells with
/// it, restricted to the chunk's own cells. Each piece gets a stream
/// forked from its position, so the writes do not depend on how many
/// other pieces the chunk touches.
#[allow(clippy::too_many_arguments)]
pub fn place_in_chunk(
    graph: &mut PieceGraph,
    chunk: ChunkPos,
    world: &mut dyn BlockWorld,
    height: &dyn HeightQuery,
    templates: &dyn TemplateStore,
    palette: &MaterialPalette,
    config: &AssemblyConfig,
    rng: &mut WorldgenRng,
) {
    let limit = chunk_restriction_box(chunk, config);
    for piece in graph.pieces_mut() {
        if !piece.bounds.intersects_closed(&limit) {
            continue;
        }
        let corner = piece.bounds.min;
        let mut piece_rng = rng.fork_at(corner.x, corner.y, corner.z);
        let mut ctx = StampContext {
            world: &mut *world,
            height,
            templates,
            limit,
            palette,
            config,
        };
        post_process(piece, &mut ctx, &mut piece_rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{MemoryTemplateStore, Template};
    use crate::world::FlatHeight;

    fn ctx<'a>(height: &'a FlatHeight, config: &'a AssemblyConfig, seed: u64) -> GenerationContext<'a> {
        GenerationContext {
            chunk: ChunkPos::new(0, 0),
            seed,
            height,
            config,
        }
    }

    #[test]
    fn warren_always_contains_the_vault_room() {
        let height = FlatHeight(64);
        let config = AssemblyConfig::default();
        for seed in [1u64, 2, 3, 1234, 99999] {
            let stub = VaultWarren::generate(&ctx(&height, &config, seed)).unwrap();
            let graph = stub.build().unwrap();
            assert!(graph.has_vault_room(), "seed {seed}");
            assert!(!graph.is_empty());
        }
    }

    #[test]
    fn warren_pieces_never_overlap() {
        let height = FlatHeight(64);
        let config = AssemblyConfig::default();
        let graph = VaultWarren::generate(&ctx(&height, &config, 42))
            .unwrap()
            .build()
            .unwrap();
        let pieces = graph.pieces();
        for i in 0..pieces.len() {
            for j in (i + 1)..pieces.len() {
                assert!(
                    !pieces[i].bounds.intersects(&pieces[j].bounds),
                    "pieces {i} and {j} overlap"
                );
            }
        }
    }

    #[test]
    fn warren_build_is_deterministic() {
        let height = FlatHeight(64);
        let config = AssemblyConfig::default();
        let build = || {
            VaultWarren::generate(&ctx(&height, &config, 77))
                .unwrap()
                .build()
                .unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn different_seeds_give_different_warrens() {
        let height = FlatHeight(64);
        let config = AssemblyConfig::default();
        let a = VaultWarren::generate(&ctx(&height, &config, 1))
            .unwrap()
            .build()
            .unwrap();
        let b = VaultWarren::generate(&ctx(&height, &config, 2))
            .unwrap()
            .build()
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn low_terrain_yields_no_warren() {
        // Surface so low the root stairwell would cross the floor
        // limit.
        let height = FlatHeight(15);
        let config = AssemblyConfig::default();
        assert!(VaultWarren::generate(&ctx(&height, &config, 1)).is_none());
    }

    #[test]
    fn relic_stub_is_a_single_piece() {
        let height = FlatHeight(64);
        let config = AssemblyConfig::default();
        let mut templates = MemoryTemplateStore::new();
        templates.insert(
            "ruin",
            Template {
                size: BlockPos::new(5, 4, 5),
                blocks: vec![],
                markers: vec![],
            },
        );
        let stub = RelicRuin::generate(&ctx(&height, &config, 9), "ruin", &templates).unwrap();
        let anchor = stub.anchor;
        let graph = stub.build().unwrap();
        assert_eq!(graph.len(), 1);
        assert!(matches!(graph.pieces()[0].kind, PieceKind::Relic { .. }));
        // Anchor stays inside the originating chunk.
        assert!((0..16).contains(&anchor.x));
        assert!((0..16).contains(&anchor.z));
    }

    #[test]
    fn relic_with_unknown_template_is_skipped() {
        let height = FlatHeight(64);
        let config = AssemblyConfig::default();
        let templates = MemoryTemplateStore::new();
        assert!(RelicRuin::generate(&ctx(&height, &config, 9), "ruin", &templates).is_none());
    }

    #[test]
    fn restriction_boxes_tile_without_gaps() {
        let config = AssemblyConfig::default();
        let a = chunk_restriction_box(ChunkPos::new(0, 0), &config);
        let b = chunk_restriction_box(ChunkPos::new(1, 0), &config);
        assert_eq!(a.max.x + 1, b.min.x);
        // A box spanning the seam is claimed by both chunks under the
        // closed coverage test.
        let spanning = BoundingBox::new(BlockPos::new(14, 20, 2), BlockPos::new(18, 25, 6));
        assert!(spanning.intersects_closed(&a));
        assert!(spanning.intersects_closed(&b));
    }
}
