// deepvault_structure — deterministic structure assembly engine.
//
// Given a chunk coordinate and a seeded random source, the engine grows
// a connected graph of "pieces" (axis-aligned block regions with
// content), positions them so bounding boxes never overlap, and stamps
// their content into block storage chunk by chunk as the world loads.
// Block catalogs, loot tables, entity behavior, template file formats,
// and chunk I/O all live outside the engine behind small traits.
//
// Module overview:
// - `types.rs`:    BlockPos/ChunkPos, directions, rotations, the opaque BlockState token.
// - `bounds.rs`:   Integer AABBs with open-interior collision and the six-int codec.
// - `world.rs`:    HeightQuery/BlockWorld collaborator traits + in-memory reference impls.
// - `template.rs`: Prerecorded patterns, markers, mirror-then-rotate transforms.
// - `piece.rs`:    The closed PieceKind set, one-shot flags, local-to-world transforms.
// - `catalog.rs`:  Weighted connector table, placement caps, the production expander.
// - `graph.rs`:    Piece arena, pending queue, growth loop, bounded whole-graph retry.
// - `stamp.rs`:    Phase 2 per-kind stamping through restriction-guarded helpers.
// - `effects.rs`:  Ground-cover spread and drip columns around relic footprints.
// - `assemble.rs`: The two-phase generate/post-process protocol driver.
// - `config.rs`:   AssemblyConfig — every tunable the engine reads.
// - `prng`:        Re-exported from `deepvault_prng` — xoshiro256++ PRNG with SplitMix64 seeding.
//
// **Critical constraint: determinism.** Structure assembly is a pure
// function: `(seed, chunk, config, terrain) -> graph` and
// `(graph, chunk) -> writes`. All randomness comes from the seeded
// xoshiro256++ PRNG passed explicitly through every call. No `HashMap`
// iteration feeds placement decisions; ordered collections are Vec or
// BTreeMap.

pub mod assemble;
pub mod bounds;
pub mod catalog;
pub mod config;
pub mod effects;
pub mod graph;
pub mod piece;
pub use deepvault_prng as prng;
pub mod stamp;
pub mod template;
pub mod types;
pub mod world;

pub use assemble::{GenerationContext, GenerationStub, RelicRuin, VaultWarren, place_in_chunk};
pub use bounds::BoundingBox;
pub use graph::{AssemblyError, PieceGraph};
pub use piece::{Piece, PieceKind};
pub use prng::WorldgenRng;
