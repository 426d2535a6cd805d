// Phase 2: stamping piece content into block storage.
//
// `post_process` is the single dispatch point: one match over
// `PieceKind`, one stamping function per kind. All block writes route
// through a small set of helpers (`place_block`, `fill_box`,
// `maybe_place`, `fill_below`, `place_chest`) that transform piece-local
// coordinates through the piece's facing and silently skip anything
// outside the caller's restriction box. A piece straddling a chunk
// border is stamped once per chunk, each call contributing only the
// cells that chunk owns.
//
// One-shot effects (gallery chest, vault spawner, relic loot, relic
// entity spawns) check and set persisted flags on the piece, so repeated
// calls over the same piece never duplicate them. The write helpers also
// refuse to overwrite a cell currently holding a chest or spawner block:
// a re-run over an already-stamped region re-fills the rooms but leaves
// the one-shot artifacts and their block entities intact.
//
// RNG draws are made before placement guards wherever a draw exists, so
// the stream a piece consumes does not depend on the restriction box.
//
// See also: `effects.rs` for the ground-cover spread relics trigger,
// `assemble.rs` for the per-chunk driver that builds the restriction
// box.

use deepvault_prng::WorldgenRng;

use crate::bounds::BoundingBox;
use crate::config::AssemblyConfig;
use crate::effects::{CoverMaterials, spread_ground_cover};
use crate::piece::{DoorStyle, Piece, PieceKind};
use crate::template::{TemplateStore, transform_pos};
use crate::types::{BlockPos, BlockState, HeightmapKind, UpdateFlags};
use crate::world::{BlockWorld, HeightQuery};

/// Material tokens for the built-in piece interiors. All opaque to the
/// engine; hosts map them onto real blocks.
#[derive(Clone, Copy, Debug)]
pub struct MaterialPalette {
    pub wall: BlockState,
    pub mossy_wall: BlockState,
    pub floor: BlockState,
    pub stair: BlockState,
    pub door_wood: BlockState,
    pub door_iron: BlockState,
    pub grate: BlockState,
    pub chest: BlockState,
    pub spawner: BlockState,
    /// Dormant vault frame block.
    pub frame: BlockState,
    /// Charged vault frame block.
    pub frame_charged: BlockState,
    /// Fill for the vault core when every frame block comes up charged.
    pub core: BlockState,
    pub cover_primary: BlockState,
    pub cover_alternate: BlockState,
}

/// Everything a stamping call needs besides the piece and the RNG.
pub struct StampContext<'a> {
    pub world: &'a mut dyn BlockWorld,
    pub height: &'a dyn HeightQuery,
    pub templates: &'a dyn TemplateStore,
    /// Restriction box. Writes outside it are skipped.
    pub limit: BoundingBox,
    pub palette: &'a MaterialPalette,
    pub config: &'a AssemblyConfig,
}

/// Stamp one piece's content, restricted to `ctx.limit`. Mutates the
/// piece only through its one-shot flags (and, for relics, the
/// re-anchored bounding box).
pub fn post_process(piece: &mut Piece, ctx: &mut StampContext<'_>, rng: &mut WorldgenRng) {
    match piece.kind {
        PieceKind::Corridor {
            entry,
            left_exit,
            right_exit,
        } => stamp_corridor(piece, ctx, rng, entry, left_exit, right_exit),
        PieceKind::Turn { entry, left } => stamp_turn(piece, ctx, entry, left),
        PieceKind::Stairwell { entry } => stamp_stairwell(piece, ctx, entry),
        PieceKind::Junction {
            entry,
            left_low,
            left_high,
            right_low,
            right_high,
        } => stamp_junction(piece, ctx, entry, left_low, left_high, right_low, right_high),
        PieceKind::Gallery {
            entry,
            tall,
            chest_placed,
        } => {
            if stamp_gallery(piece, ctx, rng, entry, tall, chest_placed) {
                if let PieceKind::Gallery { chest_placed, .. } = &mut piece.kind {
                    *chest_placed = true;
                }
            }
        }
        PieceKind::VaultRoom { spawner_placed } => {
            if stamp_vault_room(piece, ctx, rng, spawner_placed) {
                if let PieceKind::VaultRoom { spawner_placed } = &mut piece.kind {
                    *spawner_placed = true;
                }
            }
        }
        PieceKind::Relic { .. } => stamp_relic(piece, ctx, rng),
    }
}

/// True when the cell currently holds a block carrying one-shot state.
/// Stamping never overwrites these; the attached block entity (loot
/// assignment, spawner kind) must survive re-runs over the same region.
fn holds_one_shot(ctx: &StampContext<'_>, pos: BlockPos) -> bool {
    let current = ctx.world.block_at(pos);
    current == ctx.palette.chest || current == ctx.palette.spawner
}

/// Write one block at piece-local coordinates, skipping cells outside
/// the restriction box and cells holding one-shot blocks.
fn place_block(piece: &Piece, ctx: &mut StampContext<'_>, x: i32, y: i32, z: i32, state: BlockState) {
    let pos = piece.world_pos(x, y, z);
    if ctx.limit.contains(pos) && !holds_one_shot(ctx, pos) {
        ctx.world.set_block(pos, state, UpdateFlags::NONE);
    }
}

/// Fill a local box: `boundary` on the shell, `interior` inside.
#[allow(clippy::too_many_arguments)]
fn fill_box(
    piece: &Piece,
    ctx: &mut StampContext<'_>,
    x0: i32,
    y0: i32,
    z0: i32,
    x1: i32,
    y1: i32,
    z1: i32,
    boundary: BlockState,
    interior: BlockState,
) {
    for y in y0..=y1 {
        for x in x0..=x1 {
            for z in z0..=z1 {
                let on_shell = x == x0 || x == x1 || y == y0 || y == y1 || z == z0 || z == z1;
                place_block(piece, ctx, x, y, z, if on_shell { boundary } else { interior });
            }
        }
    }
}

/// Probabilistic single block. The draw happens before the placement
/// guard so the stream is restriction-independent.
#[allow(clippy::too_many_arguments)]
fn maybe_place(
    piece: &Piece,
    ctx: &mut StampContext<'_>,
    rng: &mut WorldgenRng,
    probability: f64,
    x: i32,
    y: i32,
    z: i32,
    state: BlockState,
) {
    if rng.random_bool(probability) {
        place_block(piece, ctx, x, y, z, state);
    }
}

/// Fill a column downward from a local position until it hits
/// non-air or the world floor. Used for supports under pieces that
/// overhang caves.
fn fill_below(piece: &Piece, ctx: &mut StampContext<'_>, x: i32, y: i32, z: i32, state: BlockState) {
    let mut pos = piece.world_pos(x, y, z);
    if !ctx.limit.contains(pos) {
        return;
    }
    while ctx.world.block_at(pos).is_air() && pos.y > ctx.config.world_min_y {
        ctx.world.set_block(pos, state, UpdateFlags::NONE);
        pos = pos.below();
    }
}

/// Place a loot chest at a local position. Returns true when the chest
/// was actually placed this call; an existing chest or an out-of-limit
/// position leaves the world untouched.
#[allow(clippy::too_many_arguments)]
fn place_chest(
    piece: &Piece,
    ctx: &mut StampContext<'_>,
    rng: &mut WorldgenRng,
    x: i32,
    y: i32,
    z: i32,
    loot: &str,
) -> bool {
    let pos = piece.world_pos(x, y, z);
    if !ctx.limit.contains(pos) || ctx.world.block_at(pos) == ctx.palette.chest {
        return false;
    }
    ctx.world.set_block(pos, ctx.palette.chest, UpdateFlags::NONE);
    if let Some(entity) = ctx.world.block_entity_at(pos) {
        entity.loot_table = Some(loot.to_owned());
        entity.loot_seed = rng.next_u64();
    }
    true
}

/// Stamp a 3x3 entry treatment with its lower-left corner at the local
/// position.
fn place_door(piece: &Piece, ctx: &mut StampContext<'_>, x: i32, y: i32, z: i32, style: DoorStyle) {
    let air = BlockState::AIR;
    match style {
        DoorStyle::Opening => {
            fill_box(piece, ctx, x, y, z, x + 2, y + 2, z, air, air);
        }
        DoorStyle::Wood | DoorStyle::Iron => {
            let door = if style == DoorStyle::Wood {
                ctx.palette.door_wood
            } else {
                ctx.palette.door_iron
            };
            fill_box(piece, ctx, x, y, z, x + 2, y + 2, z, air, air);
            place_block(piece, ctx, x, y, z, ctx.palette.wall);
            place_block(piece, ctx, x + 2, y, z, ctx.palette.wall);
            place_block(piece, ctx, x, y + 1, z, ctx.palette.wall);
            place_block(piece, ctx, x + 2, y + 1, z, ctx.palette.wall);
            place_block(piece, ctx, x, y + 2, z, ctx.palette.wall);
            place_block(piece, ctx, x + 1, y + 2, z, ctx.palette.wall);
            place_block(piece, ctx, x + 2, y + 2, z, ctx.palette.wall);
            place_block(piece, ctx, x + 1, y, z, door);
            place_block(piece, ctx, x + 1, y + 1, z, door);
        }
        DoorStyle::Grate => {
            fill_box(piece, ctx, x, y, z, x + 2, y + 2, z, ctx.palette.grate, ctx.palette.grate);
            place_block(piece, ctx, x + 1, y, z, BlockState::AIR);
            place_block(piece, ctx, x + 1, y + 1, z, BlockState::AIR);
        }
    }
}

fn stamp_corridor(
    piece: &Piece,
    ctx: &mut StampContext<'_>,
    rng: &mut WorldgenRng,
    entry: DoorStyle,
    left_exit: bool,
    right_exit: bool,
) {
    let wall = ctx.palette.wall;
    fill_box(piece, ctx, 0, 0, 0, 4, 4, 6, wall, BlockState::AIR);
    place_door(piece, ctx, 1, 1, 0, entry);
    // Far end opens toward the forward child.
    fill_box(piece, ctx, 1, 1, 6, 3, 3, 6, BlockState::AIR, BlockState::AIR);
    if left_exit {
        fill_box(piece, ctx, 0, 1, 2, 0, 3, 4, BlockState::AIR, BlockState::AIR);
    }
    if right_exit {
        fill_box(piece, ctx, 4, 1, 2, 4, 3, 4, BlockState::AIR, BlockState::AIR);
    }
    // Scattered floor moss.
    for z in 1..6 {
        maybe_place(piece, ctx, rng, 0.1, 2, 0, z, ctx.palette.mossy_wall);
    }
}

fn stamp_turn(piece: &Piece, ctx: &mut StampContext<'_>, entry: DoorStyle, left: bool) {
    let wall = ctx.palette.wall;
    fill_box(piece, ctx, 0, 0, 0, 4, 4, 4, wall, BlockState::AIR);
    place_door(piece, ctx, 1, 1, 0, entry);
    if left {
        fill_box(piece, ctx, 0, 1, 1, 0, 3, 3, BlockState::AIR, BlockState::AIR);
    } else {
        fill_box(piece, ctx, 4, 1, 1, 4, 3, 3, BlockState::AIR, BlockState::AIR);
    }
}

fn stamp_stairwell(piece: &Piece, ctx: &mut StampContext<'_>, entry: DoorStyle) {
    let wall = ctx.palette.wall;
    let stair = ctx.palette.stair;
    fill_box(piece, ctx, 0, 0, 0, 4, 10, 4, wall, BlockState::AIR);
    place_door(piece, ctx, 1, 7, 0, entry);
    // Winding descent from the entry landing to the bottom exit.
    const STEPS: [(i32, i32, i32); 6] = [
        (1, 6, 1),
        (2, 5, 1),
        (3, 4, 2),
        (3, 3, 3),
        (2, 2, 3),
        (1, 1, 3),
    ];
    for (x, y, z) in STEPS {
        place_block(piece, ctx, x, y, z, stair);
    }
    fill_box(piece, ctx, 1, 1, 4, 3, 3, 4, BlockState::AIR, BlockState::AIR);
}

#[allow(clippy::too_many_arguments)]
fn stamp_junction(
    piece: &Piece,
    ctx: &mut StampContext<'_>,
    entry: DoorStyle,
    left_low: bool,
    left_high: bool,
    right_low: bool,
    right_high: bool,
) {
    let wall = ctx.palette.wall;
    fill_box(piece, ctx, 0, 0, 0, 9, 8, 10, wall, BlockState::AIR);
    place_door(piece, ctx, 4, 3, 0, entry);
    // Raised entry landing down to the main floor.
    fill_box(piece, ctx, 3, 1, 1, 7, 2, 3, wall, wall);
    // Forward exit.
    fill_box(piece, ctx, 5, 1, 10, 7, 3, 10, BlockState::AIR, BlockState::AIR);
    if left_low {
        fill_box(piece, ctx, 0, 1, 4, 0, 3, 6, BlockState::AIR, BlockState::AIR);
    }
    if left_high {
        fill_box(piece, ctx, 0, 7, 6, 0, 8, 8, BlockState::AIR, BlockState::AIR);
    }
    if right_low {
        fill_box(piece, ctx, 9, 1, 4, 9, 3, 6, BlockState::AIR, BlockState::AIR);
    }
    if right_high {
        fill_box(piece, ctx, 9, 7, 6, 9, 8, 8, BlockState::AIR, BlockState::AIR);
    }
    // Supports under the corners for hubs that span caves.
    fill_below(piece, ctx, 0, -1, 0, wall);
    fill_below(piece, ctx, 9, -1, 0, wall);
    fill_below(piece, ctx, 0, -1, 10, wall);
    fill_below(piece, ctx, 9, -1, 10, wall);
}

fn stamp_gallery(
    piece: &Piece,
    ctx: &mut StampContext<'_>,
    rng: &mut WorldgenRng,
    entry: DoorStyle,
    tall: bool,
    chest_placed: bool,
) -> bool {
    let wall = ctx.palette.wall;
    let top = if tall { 10 } else { 5 };
    fill_box(piece, ctx, 0, 0, 0, 13, top, 14, wall, BlockState::AIR);
    place_door(piece, ctx, 4, 1, 0, entry);
    // Shelf rows down the hall.
    for x in (2..=11).step_by(3) {
        for z in (2..=12).step_by(4) {
            fill_box(piece, ctx, x, 1, z, x, if tall { 8 } else { 4 }, z, wall, wall);
        }
    }
    if tall {
        // Second-floor walkway around an open center.
        fill_box(
            piece,
            ctx,
            1,
            5,
            1,
            12,
            5,
            13,
            ctx.palette.floor,
            ctx.palette.floor,
        );
        fill_box(piece, ctx, 3, 5, 3, 10, 5, 11, BlockState::AIR, BlockState::AIR);
    }
    if chest_placed {
        return false;
    }
    place_chest(piece, ctx, rng, 3, 1, 6, &ctx.config.gallery_loot)
}

/// Returns true when the spawner was placed this call.
fn stamp_vault_room(
    piece: &Piece,
    ctx: &mut StampContext<'_>,
    rng: &mut WorldgenRng,
    spawner_placed: bool,
) -> bool {
    let wall = ctx.palette.wall;
    fill_box(piece, ctx, 0, 0, 0, 10, 7, 15, wall, BlockState::AIR);
    fill_box(piece, ctx, 4, 1, 0, 6, 3, 0, BlockState::AIR, BlockState::AIR);
    // Dais under the frame ring.
    fill_box(piece, ctx, 3, 1, 8, 7, 1, 12, ctx.palette.stair, ctx.palette.stair);

    // Twelve frame blocks around the core. Each is independently
    // charged; only a fully charged ring unlocks the core fill. The
    // twelve draws happen unconditionally so the stream is fixed.
    let mut ring: [(i32, i32); 12] = [(0, 0); 12];
    let mut n = 0;
    for x in 4..=6 {
        ring[n] = (x, 8);
        ring[n + 1] = (x, 12);
        n += 2;
    }
    for z in 9..=11 {
        ring[n] = (3, z);
        ring[n + 1] = (7, z);
        n += 2;
    }
    let mut all_charged = true;
    for (x, z) in ring {
        let charged = rng.next_f32() > 0.9;
        all_charged &= charged;
        let state = if charged {
            ctx.palette.frame_charged
        } else {
            ctx.palette.frame
        };
        place_block(piece, ctx, x, 2, z, state);
    }
    if all_charged {
        fill_box(piece, ctx, 4, 2, 9, 6, 2, 11, ctx.palette.core, ctx.palette.core);
    }

    if spawner_placed {
        return false;
    }
    let spawner_pos = piece.world_pos(5, 3, 10);
    if !ctx.limit.contains(spawner_pos) {
        return false;
    }
    ctx.world
        .set_block(spawner_pos, ctx.palette.spawner, UpdateFlags::NONE);
    if let Some(entity) = ctx.world.block_entity_at(spawner_pos) {
        entity.spawner_kind = Some(ctx.config.spawner_entity.clone());
    }
    true
}

fn stamp_relic(piece: &mut Piece, ctx: &mut StampContext<'_>, rng: &mut WorldgenRng) {
    let PieceKind::Relic {
        template,
        rotation,
        mirror,
        mossiness,
        overgrown,
        drip_columns,
        loot_assigned,
        entities_spawned,
    } = &piece.kind
    else {
        return;
    };
    let (template_id, rotation, mirror) = (template.clone(), *rotation, *mirror);
    let (mossiness, overgrown, drip_columns) = (*mossiness, *overgrown, *drip_columns);
    let already_assigned = *loot_assigned;
    let already_spawned = *entities_spawned;

    // Only the chunk that owns the footprint center stamps the relic;
    // its restriction box covers the whole template width via the
    // template being anchored within one chunk.
    let center = piece.bounds.center();
    if !ctx.limit.contains(center) {
        return;
    }
    let templates = ctx.templates;
    let Some(tpl) = templates.load(&template_id) else {
        log::warn!("relic template {template_id:?} missing, skipping stamp");
        return;
    };

    // Re-anchor vertically to live terrain: the Phase 1 box used a
    // provisional height.
    let surface = ctx
        .height
        .height_at(center.x, center.z, HeightmapKind::WorldSurface);
    let dy = surface - piece.bounds.min.y;
    piece.bounds.move_by(0, dy, 0);
    let origin = piece.bounds.min;

    for (local, state) in &tpl.blocks {
        let t = transform_pos(*local, rotation, mirror, tpl.size);
        let pos = BlockPos::new(origin.x + t.x, origin.y + t.y, origin.z + t.z);
        let mut out = *state;
        if out == ctx.palette.wall && rng.random_bool(mossiness as f64) {
            out = ctx.palette.mossy_wall;
        }
        if ctx.limit.contains(pos) && !holds_one_shot(ctx, pos) {
            ctx.world.set_block(pos, out, UpdateFlags::NONE);
        }
    }

    let mut assigned_now = false;
    let mut spawned_now = false;
    for marker in &tpl.markers {
        let t = transform_pos(marker.pos, rotation, mirror, tpl.size);
        let pos = BlockPos::new(origin.x + t.x, origin.y + t.y, origin.z + t.z);
        if !ctx.limit.contains(pos) {
            continue;
        }
        if let Some(loot) = marker.name.strip_prefix("chest:") {
            ctx.world.set_block(pos, BlockState::AIR, UpdateFlags::NONE);
            if !already_assigned && !assigned_now {
                let below = pos.below();
                ctx.world
                    .set_block(below, ctx.palette.chest, UpdateFlags::NONE);
                if let Some(entity) = ctx.world.block_entity_at(below) {
                    entity.loot_table = Some(loot.to_owned());
                    entity.loot_seed = rng.next_u64();
                }
                assigned_now = true;
            }
        } else if let Some(kind) = marker.name.strip_prefix("spawn:") {
            ctx.world.set_block(pos, BlockState::AIR, UpdateFlags::NONE);
            if !already_spawned {
                ctx.world.spawn_entity(kind, pos);
                spawned_now = true;
            }
        } else {
            // Unrecognized markers just clear their cell.
            ctx.world.set_block(pos, BlockState::AIR, UpdateFlags::NONE);
        }
    }

    if overgrown {
        let materials = CoverMaterials {
            primary: ctx.palette.cover_primary,
            alternate: ctx.palette.cover_alternate,
        };
        let bounds = piece.bounds;
        let keep = [ctx.palette.chest, ctx.palette.spawner];
        spread_ground_cover(
            &mut *ctx.world,
            ctx.height,
            &ctx.limit,
            &bounds,
            rng,
            materials,
            &keep,
            &ctx.config.effects,
            drip_columns,
        );
    }

    if let PieceKind::Relic {
        loot_assigned,
        entities_spawned,
        ..
    } = &mut piece.kind
    {
        if assigned_now {
            *loot_assigned = true;
        }
        if spawned_now {
            *entities_spawned = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{Marker, MemoryTemplateStore, Template};
    use crate::types::{Direction, Mirror, Rotation};
    use crate::world::{FlatHeight, MemoryWorld};

    fn palette() -> MaterialPalette {
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

    fn wide_limit() -> BoundingBox {
        BoundingBox::new(BlockPos::new(-200, -64, -200), BlockPos::new(200, 320, 200))
    }

    fn stamp(
        piece: &mut Piece,
        world: &mut MemoryWorld,
        limit: BoundingBox,
        seed: u64,
    ) -> MemoryTemplateStore {
        let height = FlatHeight(64);
        let templates = MemoryTemplateStore::new();
        let palette = palette();
        let config = AssemblyConfig::default();
        let mut ctx = StampContext {
            world,
            height: &height,
            templates: &templates,
            limit,
            palette: &palette,
            config: &config,
        };
        let mut rng = WorldgenRng::new(seed);
        post_process(piece, &mut ctx, &mut rng);
        templates
    }

    fn corridor_piece() -> Piece {
        Piece::new(
            PieceKind::Corridor {
                entry: DoorStyle::Opening,
                left_exit: true,
                right_exit: false,
            },
            BoundingBox::oriented(0, 30, 0, -1, -1, 0, 5, 5, 7, Direction::South),
            Some(Direction::South),
            1,
        )
    }

    #[test]
    fn corridor_writes_stay_inside_its_bounds() {
        let mut world = MemoryWorld::new();
        let mut piece = corridor_piece();
        stamp(&mut piece, &mut world, wide_limit(), 1);
        for pos in world.snapshot().keys() {
            assert!(piece.bounds.contains(*pos), "write escaped bounds at {pos}");
        }
        assert!(!world.snapshot().is_empty());
    }

    #[test]
    fn restriction_box_clips_writes() {
        let mut full_world = MemoryWorld::new();
        let mut p1 = corridor_piece();
        stamp(&mut p1, &mut full_world, wide_limit(), 1);

        let mut clipped_world = MemoryWorld::new();
        let mut p2 = corridor_piece();
        let half = BoundingBox::new(BlockPos::new(-200, -64, -200), BlockPos::new(1, 320, 200));
        stamp(&mut p2, &mut clipped_world, half, 1);

        for (pos, state) in clipped_world.snapshot() {
            assert!(pos.x <= 1, "write outside restriction at {pos}");
            assert_eq!(full_world.snapshot().get(&pos), Some(&state));
        }
    }

    #[test]
    fn gallery_chest_is_one_shot() {
        let mut world = MemoryWorld::new();
        let mut piece = Piece::new(
            PieceKind::Gallery {
                entry: DoorStyle::Opening,
                tall: false,
                chest_placed: false,
            },
            BoundingBox::oriented(0, 30, 0, -4, -1, 0, 14, 6, 15, Direction::South),
            Some(Direction::South),
            5,
        );
        stamp(&mut piece, &mut world, wide_limit(), 7);
        assert!(matches!(
            piece.kind,
            PieceKind::Gallery { chest_placed: true, .. }
        ));
        let chests_after_first: Vec<_> = world
            .block_entities()
            .iter()
            .filter(|(_, e)| e.loot_table.is_some())
            .map(|(p, e)| (*p, e.clone()))
            .collect();
        assert_eq!(chests_after_first.len(), 1);

        // A later pass for a neighboring region (restriction excludes
        // the chest cell at x = -1): flag blocks the chest, and the
        // original loot seed survives.
        let neighbor = BoundingBox::new(BlockPos::new(0, -64, -200), BlockPos::new(200, 320, 200));
        stamp(&mut piece, &mut world, neighbor, 999);
        let chests_after_second: Vec<_> = world
            .block_entities()
            .iter()
            .filter(|(_, e)| e.loot_table.is_some())
            .map(|(p, e)| (*p, e.clone()))
            .collect();
        assert_eq!(chests_after_first, chests_after_second);
    }

    #[test]
    fn vault_spawner_is_one_shot() {
        let mut world = MemoryWorld::new();
        let mut piece = Piece::new(
            PieceKind::VaultRoom {
                spawner_placed: false,
            },
            BoundingBox::oriented(0, 30, 0, -4, -1, 0, 11, 8, 16, Direction::South),
            Some(Direction::South),
            6,
        );
        stamp(&mut piece, &mut world, wide_limit(), 7);
        assert!(matches!(piece.kind, PieceKind::VaultRoom { spawner_placed: true }));
        let spawners = world
            .block_entities()
            .values()
            .filter(|e| e.spawner_kind.is_some())
            .count();
        assert_eq!(spawners, 1);

        // Neighboring-region pass whose restriction excludes the
        // spawner cell at x = 1: nothing is duplicated or lost.
        let neighbor = BoundingBox::new(BlockPos::new(-200, -64, -200), BlockPos::new(0, 320, 200));
        stamp(&mut piece, &mut world, neighbor, 8);
        let spawners = world
            .block_entities()
            .values()
            .filter(|e| e.spawner_kind.is_some())
            .count();
        assert_eq!(spawners, 1);
    }

    #[test]
    fn same_box_restamp_preserves_the_gallery_chest() {
        let mut world = MemoryWorld::new();
        let mut piece = Piece::new(
            PieceKind::Gallery {
                entry: DoorStyle::Opening,
                tall: false,
                chest_placed: false,
            },
            BoundingBox::oriented(0, 30, 0, -4, -1, 0, 14, 6, 15, Direction::South),
            Some(Direction::South),
            5,
        );
        stamp(&mut piece, &mut world, wide_limit(), 7);
        let before: Vec<_> = world
            .block_entities()
            .iter()
            .filter(|(_, e)| e.loot_table.is_some())
            .map(|(p, e)| (*p, e.clone()))
            .collect();
        assert_eq!(before.len(), 1);

        // Reprocessing the identical region re-fills the room but must
        // leave the chest and its loot assignment alone.
        stamp(&mut piece, &mut world, wide_limit(), 7);
        let after: Vec<_> = world
            .block_entities()
            .iter()
            .filter(|(_, e)| e.loot_table.is_some())
            .map(|(p, e)| (*p, e.clone()))
            .collect();
        assert_eq!(before, after);
        assert_eq!(world.block_at(before[0].0), palette().chest);
    }

    #[test]
    fn same_box_restamp_preserves_the_vault_spawner() {
        let mut world = MemoryWorld::new();
        let mut piece = Piece::new(
            PieceKind::VaultRoom {
                spawner_placed: false,
            },
            BoundingBox::oriented(0, 30, 0, -4, -1, 0, 11, 8, 16, Direction::South),
            Some(Direction::South),
            6,
        );
        stamp(&mut piece, &mut world, wide_limit(), 7);
        let spawner_pos = piece.world_pos(5, 3, 10);
        assert_eq!(world.block_at(spawner_pos), palette().spawner);

        stamp(&mut piece, &mut world, wide_limit(), 8);
        assert_eq!(world.block_at(spawner_pos), palette().spawner);
        let spawners = world
            .block_entities()
            .values()
            .filter(|e| e.spawner_kind.is_some())
            .count();
        assert_eq!(spawners, 1);
    }

    #[test]
    fn vault_frame_ring_has_twelve_blocks() {
        let mut world = MemoryWorld::new();
        let mut piece = Piece::new(
            PieceKind::VaultRoom {
                spawner_placed: false,
            },
            BoundingBox::oriented(0, 30, 0, -4, -1, 0, 11, 8, 16, Direction::South),
            Some(Direction::South),
            6,
        );
        stamp(&mut piece, &mut world, wide_limit(), 7);
        let p = palette();
        let frames = world
            .snapshot()
            .values()
            .filter(|s| **s == p.frame || **s == p.frame_charged)
            .count();
        assert_eq!(frames, 12);
    }

    fn relic_piece(template: &str, overgrown: bool) -> Piece {
        Piece::new(
            PieceKind::Relic {
                template: template.to_owned(),
                rotation: Rotation::None,
                mirror: Mirror::None,
                mossiness: 0.0,
                overgrown,
                drip_columns: false,
                loot_assigned: false,
                entities_spawned: false,
            },
            BoundingBox::new(BlockPos::new(0, 80, 0), BlockPos::new(4, 83, 4)),
            None,
            0,
        )
    }

    fn relic_template() -> Template {
        Template {
            size: BlockPos::new(5, 4, 5),
            blocks: vec![
                (BlockPos::new(0, 0, 0), BlockState::new(1)),
                (BlockPos::new(1, 0, 1), BlockState::new(1)),
                (BlockPos::new(4, 0, 4), BlockState::new(1)),
                (BlockPos::new(2, 1, 2), BlockState::new(20)),
            ],
            markers: vec![
                Marker {
                    name: "chest:relic/loot".into(),
                    pos: BlockPos::new(1, 1, 1),
                },
                Marker {
                    name: "spawn:sentry".into(),
                    pos: BlockPos::new(3, 1, 3),
                },
                Marker {
                    name: "unused".into(),
                    pos: BlockPos::new(0, 2, 0),
                },
            ],
        }
    }

    fn stamp_relic_in(world: &mut MemoryWorld, piece: &mut Piece, limit: BoundingBox) {
        let height = FlatHeight(50);
        let mut templates = MemoryTemplateStore::new();
        templates.insert("ruin", relic_template());
        let palette = palette();
        let config = AssemblyConfig::default();
        let mut ctx = StampContext {
            world,
            height: &height,
            templates: &templates,
            limit,
            palette: &palette,
            config: &config,
        };
        let mut rng = WorldgenRng::new(5);
        post_process(piece, &mut ctx, &mut rng);
    }

    #[test]
    fn relic_reanchors_to_terrain() {
        let mut world = MemoryWorld::new();
        let mut piece = relic_piece("ruin", false);
        stamp_relic_in(&mut world, &mut piece, wide_limit());
        // Provisional floor was 80; live terrain is 50.
        assert_eq!(piece.bounds.min.y, 50);
        assert_eq!(piece.bounds.max.y, 53);
        // Template corner block landed at the re-anchored origin.
        assert_eq!(world.block_at(BlockPos::new(0, 50, 0)), BlockState::new(1));
    }

    #[test]
    fn relic_marker_dispatch() {
        let mut world = MemoryWorld::new();
        let mut piece = relic_piece("ruin", false);
        stamp_relic_in(&mut world, &mut piece, wide_limit());

        // chest: marker assigns loot one below the marker cell.
        let chest_pos = BlockPos::new(1, 50, 1);
        let entity = world.block_entities().get(&chest_pos).unwrap();
        assert_eq!(entity.loot_table.as_deref(), Some("relic/loot"));
        assert_eq!(world.block_at(chest_pos.above()), BlockState::AIR);
        assert!(matches!(
            piece.kind,
            PieceKind::Relic { loot_assigned: true, .. }
        ));

        // spawn: marker spawns the named entity at the marker cell.
        assert_eq!(
            world.spawned(),
            &[("sentry".to_owned(), BlockPos::new(3, 51, 3))]
        );
    }

    #[test]
    fn same_box_restamp_keeps_relic_loot_and_spawns_once() {
        let mut world = MemoryWorld::new();
        let mut piece = relic_piece("ruin", false);
        stamp_relic_in(&mut world, &mut piece, wide_limit());
        stamp_relic_in(&mut world, &mut piece, wide_limit());

        assert_eq!(world.spawned().len(), 1);
        let loot: Vec<_> = world
            .block_entities()
            .values()
            .filter(|e| e.loot_table.is_some())
            .collect();
        assert_eq!(loot.len(), 1);
        assert_eq!(loot[0].loot_table.as_deref(), Some("relic/loot"));
        assert!(matches!(
            piece.kind,
            PieceKind::Relic {
                loot_assigned: true,
                entities_spawned: true,
                ..
            }
        ));
        // The template block sharing the chest cell does not reclaim it.
        assert_eq!(world.block_at(BlockPos::new(1, 50, 1)), palette().chest);
    }

    #[test]
    fn relic_skipped_when_center_outside_restriction() {
        let mut world = MemoryWorld::new();
        let mut piece = relic_piece("ruin", false);
        let far_away = BoundingBox::new(BlockPos::new(100, -64, 100), BlockPos::new(200, 320, 200));
        stamp_relic_in(&mut world, &mut piece, far_away);
        assert!(world.snapshot().is_empty());
        // Box untouched: no re-anchor without a stamp.
        assert_eq!(piece.bounds.min.y, 80);
    }

    #[test]
    fn missing_template_is_skipped_quietly() {
        let mut world = MemoryWorld::new();
        let mut piece = relic_piece("no_such_template", false);
        // Store only has "ruin".
        stamp_relic_in(&mut world, &mut piece, wide_limit());
        assert!(world.snapshot().is_empty());
    }

    #[test]
    fn stamping_is_deterministic() {
        let run = || {
            let mut world = MemoryWorld::new();
            let mut piece = corridor_piece();
            stamp(&mut piece, &mut world, wide_limit(), 42);
            world.snapshot()
        };
        assert_eq!(run(), run());
    }
}
