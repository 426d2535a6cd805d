// Tunable parameters for assembly and stamping.
//
// Everything numeric in the engine reads from here: growth limits,
// catalog weights, effect probabilities. `Default` is the shipping
// configuration; hosts override via serde (every struct deserializes
// with missing fields falling back to the default).
//
// See also: `catalog.rs` which consumes the weight table, `graph.rs`
// for how the growth limits gate candidates, `effects.rs` for the
// probability knobs.

use serde::{Deserialize, Serialize};

use crate::catalog::ConnectorKind;

/// Top-level assembly configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Candidates deeper than this in the growth tree are rejected.
    pub max_depth: u32,
    /// Hard ceiling on accepted pieces per structure.
    pub max_pieces: usize,
    /// Whole-graph retries before giving up on the mandatory piece.
    pub max_attempts: u32,
    /// Candidates whose center strays further than this from the root
    /// anchor on either horizontal axis are rejected.
    pub horizontal_range: i32,
    /// Candidates whose box floor is at or below this y are rejected.
    pub min_floor_y: i32,
    /// Vertical anchor for underground structures, clamped to terrain.
    pub start_height: i32,
    /// Vertical extent of the world, used for per-chunk restriction
    /// boxes.
    pub world_min_y: i32,
    pub world_max_y: i32,
    /// Entity kind assigned to the vault room's spawner.
    pub spawner_entity: String,
    /// Loot table key for gallery chests.
    pub gallery_loot: String,
    pub catalog: CatalogConfig,
    pub effects: EffectConfig,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            max_depth: 50,
            max_pieces: 256,
            max_attempts: 16,
            horizontal_range: 112,
            min_floor_y: 10,
            start_height: 64,
            world_min_y: -64,
            world_max_y: 320,
            spawner_entity: "vault_guardian".into(),
            gallery_loot: "deepvault/gallery".into(),
            catalog: CatalogConfig::default(),
            effects: EffectConfig::default(),
        }
    }
}

/// Weight table for the connector catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub entries: Vec<CatalogEntryConfig>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            entries: vec![
                CatalogEntryConfig::new(ConnectorKind::Corridor, 40, 0, 0),
                CatalogEntryConfig::new(ConnectorKind::Turn, 20, 0, 0),
                CatalogEntryConfig::new(ConnectorKind::Stairwell, 10, 5, 0),
                CatalogEntryConfig::new(ConnectorKind::Junction, 5, 4, 0),
                CatalogEntryConfig::new(ConnectorKind::Gallery, 10, 2, 4),
                CatalogEntryConfig::new(ConnectorKind::VaultRoom, 20, 1, 5),
            ],
        }
    }
}

/// One row of the weight table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntryConfig {
    pub kind: ConnectorKind,
    pub weight: u32,
    /// Maximum placements per structure. Zero means unlimited.
    pub max_placements: u32,
    /// Placeable only at depths strictly greater than this.
    pub min_depth: u32,
}

impl CatalogEntryConfig {
    pub const fn new(kind: ConnectorKind, weight: u32, max_placements: u32, min_depth: u32) -> Self {
        Self {
            kind,
            weight,
            max_placements,
            min_depth,
        }
    }
}

/// Probability knobs for secondary placement effects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectConfig {
    /// Chance that a placed cover cell uses the alternate material.
    pub alternate_probability: f64,
    /// Chance a drip column continues after each placed cell.
    pub drip_continuation: f64,
    /// Hard cap on drip column length.
    pub drip_max_steps: u32,
    /// Ground cover only replaces cells within this many blocks of the
    /// piece floor.
    pub floor_band: i32,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            alternate_probability: 0.07,
            drip_continuation: 0.5,
            drip_max_steps: 8,
            floor_band: 3,
        }
    }
}
