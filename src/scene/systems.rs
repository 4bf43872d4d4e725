use bevy::app::AppExit;
use bevy::light::GlobalAmbientLight;
use bevy::prelude::*;
use bevy::tasks::{AsyncComputeTaskPool, block_on, futures_lite::future};
use bevy_egui::egui;

use super::SceneConfig;
use super::entities::{PendingFetch, TileIndex, TileProvider, dedupe_records};
use crate::camera::{LastPick, MapCamera};
use crate::math;
use crate::navigation::{NavEffect, NavSignal, Navigator};
use crate::tiles::systems::{dispose_tile, spawn_tile};
use crate::tiles::{Focus, Tile, TileAssets, TileRequest};

// ── Helpers ────────────────────────────────────────────────────────

/// Runs `request` against the provider on the async compute pool.
fn start_fetch(pending: &mut PendingFetch, provider: &TileProvider, request: TileRequest) {
    if let Some((previous, _)) = &pending.running {
        warn!(
            "fetch for level {} dropped in favour of level {}",
            previous.level, request.level
        );
    }
    let source = provider.0.clone();
    let task = AsyncComputeTaskPool::get().spawn(async move { source.fetch(&request) });
    pending.running = Some((request, task));
    debug!(
        "fetching level {} (parent {:?}, radius {})",
        request.level, request.parent, request.radius
    );
}

/// Disposes every tile of the current level. Returns how many went.
fn dispose_level(
    commands: &mut Commands,
    assets: &mut TileAssets,
    index: &mut TileIndex,
    tiles: &mut Query<&mut Tile>,
) -> usize {
    let entities = index.take_all();
    for &entity in &entities {
        if let Ok(mut tile) = tiles.get_mut(entity) {
            dispose_tile(commands, assets, entity, &mut tile);
        }
    }
    entities.len()
}

// ── Startup ────────────────────────────────────────────────────────

pub fn setup_scene(mut commands: Commands) {
    commands.spawn((
        Name::new("Sun"),
        DirectionalLight {
            illuminance: 9000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(8.0, 20.0, 12.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.insert_resource(GlobalAmbientLight {
        color: Color::srgb(0.7, 0.75, 0.85),
        brightness: 250.0,
        affects_lightmapped_meshes: false,
    });
}

/// Fetches the tiles of the starting level.
pub fn request_initial_tiles(
    mut pending: ResMut<PendingFetch>,
    provider: Res<TileProvider>,
    navigator: Res<Navigator>,
    cfg: Res<SceneConfig>,
) {
    let ctx = navigator.context();
    start_fetch(
        &mut pending,
        &provider,
        TileRequest {
            level: ctx.level,
            radius: cfg.grid_radius,
            parent: ctx.parent,
        },
    );
}

// ── Update ─────────────────────────────────────────────────────────

/// Tears the current level down and requests the next one on the
/// navigator's behalf.
#[allow(clippy::too_many_arguments)]
pub fn apply_scene_effects(
    mut commands: Commands,
    mut effects: MessageReader<NavEffect>,
    mut index: ResMut<TileIndex>,
    mut focus: ResMut<Focus>,
    mut pending: ResMut<PendingFetch>,
    provider: Res<TileProvider>,
    cfg: Res<SceneConfig>,
    mut assets: TileAssets,
    mut tiles: Query<&mut Tile>,
) {
    for effect in effects.read() {
        match *effect {
            NavEffect::DisposeTiles => {
                let level = index.level();
                let count = dispose_level(&mut commands, &mut assets, &mut index, &mut tiles);
                focus.tile = None;
                debug!("disposed {count} tiles of level {level:?}");
            }
            NavEffect::FetchTiles { level, parent } => start_fetch(
                &mut pending,
                &provider,
                TileRequest {
                    level,
                    radius: cfg.grid_radius,
                    parent,
                },
            ),
            _ => {}
        }
    }
}

/// Builds the fetched level once its data arrives.
///
/// A failed fetch yields an empty level; either way `TilesSettled` is
/// reported so a running transition can finish.
#[allow(clippy::too_many_arguments)]
pub fn poll_tile_fetch(
    mut commands: Commands,
    mut pending: ResMut<PendingFetch>,
    mut index: ResMut<TileIndex>,
    mut focus: ResMut<Focus>,
    cfg: Res<SceneConfig>,
    mut assets: TileAssets,
    mut tiles: Query<&mut Tile>,
    mut signals: MessageWriter<NavSignal>,
) {
    let Some((request, task)) = pending.running.as_mut() else {
        return;
    };
    let Some(result) = block_on(future::poll_once(task)) else {
        return;
    };
    let request = *request;
    pending.running = None;

    let records = match result {
        Ok(records) => records,
        Err(err) => {
            warn!("level {} has no tiles: {err}", request.level);
            Vec::new()
        }
    };
    let (records, duplicates) = dedupe_records(records);
    if !duplicates.is_empty() {
        warn!(
            "level {}: dropped {} records with repeated coordinates {:?}",
            request.level,
            duplicates.len(),
            duplicates
        );
    }

    if !index.is_empty() {
        let stale = dispose_level(&mut commands, &mut assets, &mut index, &mut tiles);
        focus.tile = None;
        warn!("level {}: cleared {stale} stale tiles", request.level);
    }
    index.begin_level(request.level);
    for record in &records {
        let entity = spawn_tile(
            &mut commands,
            &mut assets,
            record,
            request.level,
            cfg.tile_size,
        );
        index.insert(record.hex(), entity);
    }

    info!("level {}: {} tiles in place", request.level, records.len());
    signals.write(NavSignal::TilesSettled);
}

/// Releases every tile through the regular dispose path on exit.
pub fn teardown_on_exit(
    mut commands: Commands,
    mut exits: MessageReader<AppExit>,
    mut pending: ResMut<PendingFetch>,
    mut index: ResMut<TileIndex>,
    mut assets: TileAssets,
    mut tiles: Query<&mut Tile>,
) {
    if exits.is_empty() {
        return;
    }
    exits.clear();
    pending.running = None;
    debug!("teardown: level {:?} holds {} tiles", index.level(), index.len());
    let count = dispose_level(&mut commands, &mut assets, &mut index, &mut tiles);
    info!(
        "teardown: disposed {count} tiles, {} models left in the registry after {} loads",
        assets.registry.len(),
        assets.registry.loads_started()
    );
}

// ── Debug ──────────────────────────────────────────────────────────

/// Outlines the level's bounding box and marks the last pick point.
pub fn draw_level_gizmos(
    mut gizmos: Gizmos,
    index: Res<TileIndex>,
    cfg: Res<SceneConfig>,
    last_pick: Res<LastPick>,
) {
    if let Some(b) = math::bounding_box(index.coords(), cfg.tile_size) {
        let corners = [
            Vec3::new(b.min_x, 0.0, b.min_z),
            Vec3::new(b.max_x, 0.0, b.min_z),
            Vec3::new(b.max_x, 0.0, b.max_z),
            Vec3::new(b.min_x, 0.0, b.max_z),
        ];
        let color = Color::srgb(0.2, 0.9, 1.0);
        for (a, z) in corners.iter().zip(corners.iter().cycle().skip(1)) {
            gizmos.line(*a, *z, color);
        }
        let c = b.center();
        let r = cfg.tile_size * 0.3;
        gizmos.line(Vec3::new(c.x - r, 0.0, c.y), Vec3::new(c.x + r, 0.0, c.y), color);
        gizmos.line(Vec3::new(c.x, 0.0, c.y - r), Vec3::new(c.x, 0.0, c.y + r), color);
    }
    if let Some(p) = last_pick.0 {
        let r = cfg.tile_size * 0.2;
        let color = Color::srgb(1.0, 0.3, 0.3);
        gizmos.line(p - Vec3::X * r, p + Vec3::X * r, color);
        gizmos.line(p - Vec3::Z * r, p + Vec3::Z * r, color);
        gizmos.line(p, p + Vec3::Y * r * 2.0, color);
    }
}

/// Draws each tile's coordinate as a screen-projected egui label.
pub fn draw_tile_labels(
    mut egui_ctx: Query<&mut bevy_egui::EguiContext>,
    camera_q: Query<(&Camera, &GlobalTransform), With<MapCamera>>,
    tiles: Query<(&GlobalTransform, &Tile)>,
    cfg: Res<SceneConfig>,
    mut ready: Local<bool>,
) {
    // Egui fonts aren't available until after the first Context::run() in the render pass.
    if !*ready {
        *ready = true;
        return;
    }
    let Ok((camera, cam_gt)) = camera_q.single() else {
        return;
    };
    let Ok(mut ctx) = egui_ctx.single_mut() else {
        return;
    };
    let cam_pos = cam_gt.translation();
    let max_distance = cfg.map_size() * 2.0;

    let painter = ctx.get_mut().layer_painter(egui::LayerId::background());

    for (tile_gt, tile) in &tiles {
        let world_pos = tile_gt.translation() + Vec3::Y * tile.height;
        if cam_pos.distance(world_pos) > max_distance {
            continue;
        }
        if let Ok(viewport) = camera.world_to_viewport(cam_gt, world_pos) {
            let color = if tile.is_focused() {
                egui::Color32::YELLOW
            } else {
                egui::Color32::WHITE
            };
            painter.text(
                egui::pos2(viewport.x, viewport.y),
                egui::Align2::CENTER_CENTER,
                format!("{},{}", tile.hex.x, tile.hex.y),
                egui::FontId::proportional(11.0),
                color,
            );
        }
    }
}
