// Collaborator contracts for terrain and block storage.
//
// The engine never owns a world. Phase 2 stamping talks to two traits:
// `HeightQuery` for surface sampling (read-only, usable during Phase 1
// anchoring too) and `BlockWorld` for block reads/writes, block-entity
// access, and entity spawning. Hosts implement these over their real
// chunk storage; `MemoryWorld` and `FlatHeight` are the in-crate
// reference implementations used by tests and headless tools.
//
// Out-of-bounds conventions follow the storage: `MemoryWorld` is sparse
// and unbounded, reads of unset cells return `AIR`.
//
// See also: `stamp.rs` for the write paths that go through `BlockWorld`,
// `assemble.rs` for where `HeightQuery` anchors structures.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::types::{BlockPos, BlockState, HeightmapKind, UpdateFlags};

/// Read-only terrain height sampling.
pub trait HeightQuery {
    /// Height of the given surface at a block column: the y of the
    /// topmost block matching `kind`.
    fn height_at(&self, x: i32, z: i32, kind: HeightmapKind) -> i32;
}

/// Per-block auxiliary data attached by stamping: loot assignment for
/// containers, spawner configuration. Hosts map this onto their own
/// block-entity representation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEntity {
    /// Loot table key, assigned instead of concrete contents. Resolution
    /// happens outside the engine when the container is first opened.
    pub loot_table: Option<String>,
    /// Seed for loot resolution, drawn from the placement RNG.
    pub loot_seed: u64,
    /// Entity kind a spawner block produces.
    pub spawner_kind: Option<String>,
}

/// Mutable block storage the engine stamps into.
pub trait BlockWorld {
    fn block_at(&self, pos: BlockPos) -> BlockState;

    fn set_block(&mut self, pos: BlockPos, state: BlockState, flags: UpdateFlags);

    /// Block entity at `pos`, if the block there supports one. Stamping
    /// uses this to assign loot keys and spawner kinds right after
    /// placing the block.
    fn block_entity_at(&mut self, pos: BlockPos) -> Option<&mut BlockEntity>;

    /// Spawn a free-standing entity of the given kind.
    fn spawn_entity(&mut self, kind: &str, pos: BlockPos);
}

/// Sparse in-memory world. Unset cells read as `AIR`; every written
/// cell gets a block entity on demand.
#[derive(Clone, Debug, Default)]
pub struct MemoryWorld {
    blocks: FxHashMap<BlockPos, BlockState>,
    block_entities: BTreeMap<BlockPos, BlockEntity>,
    spawned: Vec<(String, BlockPos)>,
}

impl MemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entities spawned so far, in spawn order.
    pub fn spawned(&self) -> &[(String, BlockPos)] {
        &self.spawned
    }

    pub fn block_entities(&self) -> &BTreeMap<BlockPos, BlockEntity> {
        &self.block_entities
    }

    /// Ordered copy of all non-air cells. Two worlds with identical
    /// placement histories produce identical snapshots, which is what
    /// the determinism tests compare.
    pub fn snapshot(&self) -> BTreeMap<BlockPos, BlockState> {
        self.blocks
            .iter()
            .filter(|(_, s)| !s.is_air())
            .map(|(p, s)| (*p, *s))
            .collect()
    }
}

impl BlockWorld for MemoryWorld {
    fn block_at(&self, pos: BlockPos) -> BlockState {
        self.blocks.get(&pos).copied().unwrap_or(BlockState::AIR)
    }

    fn set_block(&mut self, pos: BlockPos, state: BlockState, _flags: UpdateFlags) {
        self.blocks.insert(pos, state);
        // A replaced block loses its auxiliary data.
        self.block_entities.remove(&pos);
    }

    fn block_entity_at(&mut self, pos: BlockPos) -> Option<&mut BlockEntity> {
        if !self.blocks.contains_key(&pos) {
            return None;
        }
        Some(self.block_entities.entry(pos).or_default())
    }

    fn spawn_entity(&mut self, kind: &str, pos: BlockPos) {
        self.spawned.push((kind.to_owned(), pos));
    }
}

/// Constant-height terrain, for tests and headless anchoring.
#[derive(Clone, Copy, Debug)]
pub struct FlatHeight(pub i32);

impl HeightQuery for FlatHeight {
    fn height_at(&self, _x: i32, _z: i32, _kind: HeightmapKind) -> i32 {
        self.0
    }
}
