use bevy::prelude::*;
use hexx::Hex;

use super::AvatarConfig;
use super::entities::{Avatar, glide};
use crate::math;
use crate::navigation::NavEffect;
use crate::scene::SceneConfig;
use crate::tiles::{Tile, TilePicked};

/// Where the avatar stands on `cell`: on top of its column when the tile
/// exists, on the ground otherwise.
fn standing_point(tiles: &Query<&Tile>, cell: Hex, tile_size: f32, hover: f32) -> Vec3 {
    let (ground, height) = tiles
        .iter()
        .find(|t| t.hex == cell)
        .map_or((math::axial_to_ground(cell, tile_size), 0.0), |t| {
            (t.world_pos, t.height)
        });
    ground + Vec3::Y * (height + hover * tile_size)
}

pub fn spawn_avatar(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    cfg: Res<AvatarConfig>,
    scene: Res<SceneConfig>,
) {
    let start = Vec3::Y * cfg.hover * scene.tile_size;
    commands.spawn((
        Name::new("Avatar"),
        Avatar {
            cell: Hex::ZERO,
            target: start,
        },
        Mesh3d(meshes.add(Sphere::new(cfg.radius * scene.tile_size))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: cfg.color,
            emissive: cfg.emissive,
            ..default()
        })),
        Transform::from_translation(start),
    ));
}

/// Walks to picked tiles in range; jumps on navigation resets.
pub fn steer_avatar(
    mut picks: MessageReader<TilePicked>,
    mut effects: MessageReader<NavEffect>,
    cfg: Res<AvatarConfig>,
    scene: Res<SceneConfig>,
    tiles: Query<&Tile>,
    mut avatars: Query<(&mut Avatar, &mut Transform)>,
) {
    let Ok((mut avatar, mut transform)) = avatars.single_mut() else {
        return;
    };

    for pick in picks.read() {
        let Some(hex) = pick.hex else { continue };
        if avatar.try_move(hex, cfg.movement_range) {
            avatar.target = standing_point(&tiles, hex, scene.tile_size, cfg.hover);
        } else {
            debug!(
                "({}, {}) is out of the avatar's range of {}",
                hex.x, hex.y, cfg.movement_range
            );
        }
    }

    for effect in effects.read() {
        if let NavEffect::PlaceAvatar { at } = *effect {
            avatar.cell = at;
            avatar.target = standing_point(&tiles, at, scene.tile_size, cfg.hover);
            transform.translation = avatar.target;
        }
    }
}

pub fn glide_avatar(
    time: Res<Time>,
    cfg: Res<AvatarConfig>,
    scene: Res<SceneConfig>,
    mut avatars: Query<(&Avatar, &mut Transform)>,
) {
    for (avatar, mut transform) in &mut avatars {
        if transform.translation != avatar.target {
            transform.translation = glide(
                transform.translation,
                avatar.target,
                cfg.glide_speed * scene.tile_size,
                time.delta_secs(),
            );
        }
    }
}
