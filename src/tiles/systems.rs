use bevy::prelude::*;

use super::TilesConfig;
use super::entities::{
    Focus, FocusBorder, FocusBorderAssets, Tile, TileAssets, TileModel, TilePicked,
};
use super::source::TileRecord;
use crate::models::registry::{Acquire, Completion};
use crate::models::systems::{free_model, start_model_load};
use crate::models::{ModelAsset, ModelLoadFinished};
use crate::scene::SceneConfig;

/// Lift of the focus ring above a column top, against z-fighting.
const BORDER_LIFT: f32 = 0.02;

// ── Lifecycle helpers ──────────────────────────────────────────────

/// Spawns a tile at its world position and takes its model reference.
///
/// The drawable child is attached now when the model is cached, or later by
/// [`attach_loaded_models`].
pub fn spawn_tile(
    commands: &mut Commands,
    assets: &mut TileAssets,
    record: &TileRecord,
    level: i32,
    tile_size: f32,
) -> Entity {
    let (tile, acquired) = Tile::construct(record, level, tile_size, &mut assets.registry.0);
    if let Acquire::Started(_) = acquired {
        start_model_load(&mut assets.loads, &tile.model_id, tile_size, &assets.models_cfg);
    }

    let entity = commands
        .spawn((
            Name::new(format!("Tile({}, {}) {}", record.q, record.r, record.terrain)),
            Transform::from_translation(tile.world_pos),
            Visibility::default(),
            tile,
        ))
        .id();
    if let Acquire::Ready(asset) = acquired {
        attach_model(commands, entity, &asset);
    }
    entity
}

/// Releases the tile's model reference, frees the model if that was the last
/// one, then removes the tile and its children from the world.
pub fn dispose_tile(
    commands: &mut Commands,
    assets: &mut TileAssets,
    entity: Entity,
    tile: &mut Tile,
) {
    let disposal = tile.dispose(&mut assets.registry.0);
    if let Some(ring) = disposal.border {
        commands.entity(ring).despawn();
    }
    if let Some(asset) = disposal.evicted {
        free_model(&asset, &mut assets.meshes, &mut assets.materials);
        debug!(
            "model `{}` evicted with the last tile of level {}",
            tile.model_id, tile.level
        );
    }
    commands.entity(entity).despawn();
}

fn attach_model(commands: &mut Commands, tile: Entity, asset: &ModelAsset) {
    let model = commands
        .spawn((
            TileModel,
            Mesh3d(asset.mesh.clone()),
            MeshMaterial3d(asset.material.clone()),
            Transform::default(),
        ))
        .id();
    commands.entity(tile).add_child(model);
}

// ── Systems ────────────────────────────────────────────────────────

/// Creates the shared focus ring mesh and material.
pub fn setup_focus_border(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    cfg: Res<TilesConfig>,
    scene: Res<SceneConfig>,
) {
    let outer = scene.tile_size * 0.92;
    let mesh = meshes.add(Torus::new(outer - scene.tile_size * 0.08, outer));
    let material = materials.add(StandardMaterial {
        base_color: cfg.border_color,
        emissive: cfg.border_emissive,
        unlit: true,
        ..default()
    });
    commands.insert_resource(FocusBorderAssets { mesh, material });
}

/// Resolves finished model loads against the registry and gives every
/// waiting tile its drawable.
///
/// Runs before any system that spawns tiles in the same frame, so a tile
/// joining a load always sees the registry state its ticket will resolve in.
pub fn attach_loaded_models(
    mut commands: Commands,
    mut finished: MessageReader<ModelLoadFinished>,
    mut assets: TileAssets,
    mut tiles: Query<(Entity, &mut Tile)>,
) {
    for msg in finished.read() {
        match assets.registry.complete(&msg.model_id, msg.result.clone()) {
            Completion::Resolved { asset, waiters } => {
                for (entity, mut tile) in &mut tiles {
                    if tile.pending_ticket().is_some_and(|t| waiters.contains(&t)) {
                        tile.mark_ready();
                        attach_model(&mut commands, entity, &asset);
                    }
                }
                debug!("model `{}` ready for {} tiles", msg.model_id, waiters.len());
            }
            Completion::Orphaned(asset) => {
                free_model(&asset, &mut assets.meshes, &mut assets.materials);
                debug!("model `{}` arrived with no tiles waiting", msg.model_id);
            }
            Completion::Failed { error, waiters } => {
                for (_, mut tile) in &mut tiles {
                    if tile.pending_ticket().is_some_and(|t| waiters.contains(&t)) {
                        tile.mark_unmodelled();
                    }
                }
                warn!(
                    "{} tiles left without model `{}`: {error}",
                    waiters.len(),
                    msg.model_id
                );
            }
        }
    }
}

/// Moves focus to the picked tile. A pick miss clears focus; picking the
/// focused tile again keeps it.
pub fn apply_tile_picks(
    mut commands: Commands,
    mut picks: MessageReader<TilePicked>,
    mut focus: ResMut<Focus>,
    border: Res<FocusBorderAssets>,
    mut tiles: Query<(Entity, &mut Tile)>,
) {
    for pick in picks.read() {
        if pick.hex == focus.tile {
            continue;
        }
        for (entity, mut tile) in &mut tiles {
            if Some(tile.hex) == focus.tile {
                if let Some(ring) = tile.remove_focus_border() {
                    commands.entity(ring).despawn();
                }
            } else if Some(tile.hex) == pick.hex {
                let lift = tile.height + BORDER_LIFT;
                tile.add_focus_border(|| {
                    let ring = commands
                        .spawn((
                            FocusBorder,
                            Mesh3d(border.mesh.clone()),
                            MeshMaterial3d(border.material.clone()),
                            Transform::from_xyz(0.0, lift, 0.0),
                        ))
                        .id();
                    commands.entity(entity).add_child(ring);
                    ring
                });
            }
        }
        focus.tile = pick.hex;
        debug!("focus: {:?}", focus.tile);
    }
}

/// Per-frame tile animation: the focus ring breathes.
pub fn pulse_focus_borders(
    time: Res<Time>,
    cfg: Res<TilesConfig>,
    mut rings: Query<&mut Transform, With<FocusBorder>>,
) {
    let s = 1.0 + cfg.pulse_amplitude * (time.elapsed_secs() * cfg.pulse_speed).sin();
    for mut transform in &mut rings {
        transform.scale = Vec3::new(s, 1.0, s);
    }
}

#[cfg(test)]
mod tests {
    use bevy::ecs::system::RunSystemOnce;
    use bevy::tasks::{AsyncComputeTaskPool, TaskPool};

    use super::*;
    use crate::models::{ModelLoads, ModelRegistry, ModelsConfig};
    use crate::tiles::Terrain;

    fn world() -> World {
        AsyncComputeTaskPool::get_or_init(TaskPool::default);
        let mut world = World::new();
        world.init_resource::<ModelRegistry>();
        world.init_resource::<ModelLoads>();
        world.init_resource::<Assets<Mesh>>();
        world.init_resource::<Assets<StandardMaterial>>();
        world.insert_resource(ModelsConfig::default());
        world
    }

    #[test]
    fn disposing_a_focused_tile_despawns_its_ring() {
        let mut world = world();
        let tile = world
            .run_system_once(|mut commands: Commands, mut assets: TileAssets| {
                let record = TileRecord {
                    q: 1,
                    r: 0,
                    terrain: Terrain::Sand,
                };
                spawn_tile(&mut commands, &mut assets, &record, 1, 1.0)
            })
            .unwrap();
        // Not parented to the tile, so only an explicit despawn removes it.
        let ring = world.spawn(FocusBorder).id();
        assert!(world.get_mut::<Tile>(tile).unwrap().add_focus_border(|| ring));

        world
            .run_system_once(
                |mut commands: Commands,
                 mut assets: TileAssets,
                 mut tiles: Query<(Entity, &mut Tile)>| {
                    for (entity, mut tile) in &mut tiles {
                        dispose_tile(&mut commands, &mut assets, entity, &mut tile);
                    }
                },
            )
            .unwrap();

        assert!(world.get_entity(ring).is_err());
        assert!(world.get_entity(tile).is_err());
    }
}
