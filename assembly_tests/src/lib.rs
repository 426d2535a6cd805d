// Shared fixtures for the end-to-end assembly tests.
//
// The integration tests exercise the full pipeline (Phase 1 growth,
// persistence, Phase 2 chunk-by-chunk stamping) against the in-crate
// reference world. This crate holds the plumbing they share: a fixed
// material palette, per-chunk RNG derivation, and a driver that stamps
// a graph into a world one chunk at a time the way a loading host
// would.

use deepvault_structure::bounds::BoundingBox;
use deepvault_structure::config::AssemblyConfig;
use deepvault_structure::graph::PieceGraph;
use deepvault_structure::place_in_chunk;
use deepvault_structure::stamp::MaterialPalette;
use deepvault_structure::template::TemplateStore;
use deepvault_structure::types::{BlockState, ChunkPos};
use deepvault_structure::world::{BlockWorld, HeightQuery};

use deepvault_prng::WorldgenRng;

/// Fixed palette with distinct, recognizable token ids.
pub fn test_palette() -> MaterialPalette {
    MaterialPalette {
        wall: BlockState::new(1),
        mossy_wall: BlockState::new(2),
        floor: BlockState::new(3),
        stair: BlockState::new(4),
        door_wood: BlockState::new(5),
        door_iron: BlockState::new(6),
        grate: BlockState::new(7),
        chest: BlockState::new(8),
        spawner: BlockState::new(9),
        frame: BlockState::new(10),
        frame_charged: BlockState::new(11),
        core: BlockState::new(12),
        cover_primary: BlockState::new(13),
        cover_alternate: BlockState::new(14),
    }
}

/// Per-chunk stamping stream, derived the way a host derives it: a
/// positional fork off the world seed.
pub fn chunk_rng(world_seed: u64, chunk: ChunkPos) -> WorldgenRng {
    WorldgenRng::new(world_seed).fork_at(chunk.x, 0, chunk.z)
}

/// Every chunk whose cells a bounding box touches, in row-major order.
pub fn chunks_covering(bounds: &BoundingBox) -> Vec<ChunkPos> {
    let min = ChunkPos::containing(bounds.min.x, bounds.min.z);
    let max = ChunkPos::containing(bounds.max.x, bounds.max.z);
    let mut chunks = Vec::new();
    for cx in min.x..=max.x {
        for cz in min.z..=max.z {
            chunks.push(ChunkPos::new(cx, cz));
        }
    }
    chunks
}

/// Stamp a graph into a world, one `place_in_chunk` call per chunk in
/// the given order.
#[allow(clippy::too_many_arguments)]
pub fn stamp_chunks(
    graph: &mut PieceGraph,
    chunks: &[ChunkPos],
    world: &mut dyn BlockWorld,
    height: &dyn HeightQuery,
    templates: &dyn TemplateStore,
    palette: &MaterialPalette,
    config: &AssemblyConfig,
    world_seed: u64,
) {
    for &chunk in chunks {
        let mut rng = chunk_rng(world_seed, chunk);
        place_in_chunk(
            graph, chunk, world, height, templates, palette, config, &mut rng,
        );
    }
}
