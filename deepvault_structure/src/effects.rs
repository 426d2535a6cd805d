// Secondary placement effects: ground cover spread and drip columns.
//
// After a relic stamps its template, it can bleed into the surrounding
// terrain: a distance-decayed probabilistic substitution of surface
// cells around the footprint, each placed cell optionally seeding a
// column of the same material dripping downward. The decay profile is a
// fixed 14-entry curve indexed by horizontal Manhattan distance from
// the box center, shifted outward by a random amount that shrinks as
// the footprint grows.
//
// RNG draws happen before any placement guard, so the stream consumed
// by an effect depends only on the box, the seed, and the terrain
// heights, never on what the restriction box happens to clip.
//
// See also: `stamp.rs` which invokes these from relic post-processing,
// `config.rs` for the probability knobs.

use deepvault_prng::WorldgenRng;

use crate::bounds::BoundingBox;
use crate::config::EffectConfig;
use crate::types::{BlockPos, BlockState, HeightmapKind, UpdateFlags};
use crate::world::{BlockWorld, HeightQuery};

/// Placement probability by horizontal Manhattan distance from the box
/// center. Full strength out to distance 6, then tapering to nothing.
pub const GROUND_COVER_FALLOFF: [f32; 14] = [
    1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.9, 0.9, 0.8, 0.7, 0.6, 0.4, 0.2,
];

/// Materials used by the effects: a primary cover block and a rare
/// alternate mixed in with `EffectConfig::alternate_probability`.
#[derive(Clone, Copy, Debug)]
pub struct CoverMaterials {
    pub primary: BlockState,
    pub alternate: BlockState,
}

/// Place one cover cell, drawing the alternate-material roll first so
/// the stream is identical whether or not the cell is inside `limit`.
pub fn place_cover(
    world: &mut dyn BlockWorld,
    limit: &BoundingBox,
    pos: BlockPos,
    rng: &mut WorldgenRng,
    materials: CoverMaterials,
    config: &EffectConfig,
) {
    let state = if rng.random_bool(config.alternate_probability) {
        materials.alternate
    } else {
        materials.primary
    };
    if limit.contains(pos) {
        world.set_block(pos, state, UpdateFlags::NONE);
    }
}

/// Walk downward from `start`, replacing terrain with cover material.
/// Stops at air, at a keep-listed block, at the step cap, or when the
/// continuation roll fails.
#[allow(clippy::too_many_arguments)]
pub fn drip_column(
    world: &mut dyn BlockWorld,
    limit: &BoundingBox,
    start: BlockPos,
    rng: &mut WorldgenRng,
    materials: CoverMaterials,
    keep: &[BlockState],
    config: &EffectConfig,
) {
    let mut pos = start;
    for _ in 0..config.drip_max_steps {
        let current = world.block_at(pos);
        if current.is_air() || keep.contains(&current) {
            return;
        }
        place_cover(world, limit, pos, rng, materials, config);
        if !rng.random_bool(config.drip_continuation) {
            return;
        }
        pos = pos.below();
    }
}

/// Spread ground cover on the terrain surface around `bounds`.
///
/// Cells are considered out to the falloff reach on each horizontal
/// axis. Each candidate cell rolls against the falloff for its shifted
/// distance, then lands on the surface column clamped to the box floor;
/// cells further than `floor_band` from the floor, air cells, cells
/// already covered, and keep-listed cells are skipped. Placed cells
/// seed a drip column below when `drips` is set.
#[allow(clippy::too_many_arguments)]
pub fn spread_ground_cover(
    world: &mut dyn BlockWorld,
    height: &dyn HeightQuery,
    limit: &BoundingBox,
    bounds: &BoundingBox,
    rng: &mut WorldgenRng,
    materials: CoverMaterials,
    keep: &[BlockState],
    config: &EffectConfig,
    drips: bool,
) {
    let center = bounds.center();
    let reach = GROUND_COVER_FALLOFF.len() as i32;
    let footprint = (bounds.span_x() + bounds.span_z()) / 2;
    let shift = rng.next_bounded(1.max(8 - footprint / 2) as u32) as i32;

    for x in (center.x - reach)..=(center.x + reach) {
        for z in (center.z - reach)..=(center.z + reach) {
            let distance = (x - center.x).abs() + (z - center.z).abs();
            let index = (distance + shift).max(0);
            if index >= reach {
                continue;
            }
            if !rng.random_bool(GROUND_COVER_FALLOFF[index as usize] as f64) {
                continue;
            }
            let surface = height.height_at(x, z, HeightmapKind::WorldSurface);
            let y = bounds.min.y.min(surface);
            let pos = BlockPos::new(x, y, z);
            if (y - bounds.min.y).abs() > config.floor_band {
                continue;
            }
            let current = world.block_at(pos);
            if current.is_air() || current == materials.primary || current == materials.alternate {
                continue;
            }
            if keep.contains(&current) {
                continue;
            }
            place_cover(world, limit, pos, rng, materials, config);
            if drips {
                drip_column(world, limit, pos.below(), rng, materials, keep, config);
            }
        }
    }
}
