use bevy::color::Alpha;
use bevy::prelude::*;

use super::NavigationConfig;
use super::entities::{FadeOverlay, NavigationRequest, Navigator};
use super::navigator::{Direction, NavEffect, NavSignal};
use crate::camera::MapCamera;
use crate::scene::{PendingFetch, TileIndex};
use crate::tiles::{Focus, Tile};

/// `Enter` descends into the focused tile, `Backspace` ascends.
pub fn read_navigation_keys(
    keys: Res<ButtonInput<KeyCode>>,
    mut requests: MessageWriter<NavigationRequest>,
) {
    if keys.just_pressed(KeyCode::Enter) {
        requests.write(NavigationRequest(Direction::Descend));
    }
    if keys.just_pressed(KeyCode::Backspace) {
        requests.write(NavigationRequest(Direction::Ascend));
    }
}

/// Validates requests against the navigator and kicks off accepted ones.
#[allow(clippy::too_many_arguments)]
pub fn handle_navigation_requests(
    mut requests: MessageReader<NavigationRequest>,
    mut navigator: ResMut<Navigator>,
    focus: Res<Focus>,
    pending: Res<PendingFetch>,
    index: Res<TileIndex>,
    tiles: Query<&Tile>,
    cfg: Res<NavigationConfig>,
    mut effects: MessageWriter<NavEffect>,
) {
    for &NavigationRequest(direction) in requests.read() {
        if pending.is_busy() {
            debug!("{direction:?} ignored: a tile fetch is in flight");
            continue;
        }
        let result = match direction {
            Direction::Descend => {
                let tint = focus
                    .tile
                    .and_then(|hex| index.get(hex))
                    .and_then(|entity| tiles.get(entity).ok())
                    .map_or(cfg.ascend_tint, Tile::color);
                navigator.request_descend(focus.tile, tint)
            }
            Direction::Ascend => navigator.request_ascend(cfg.ascend_tint),
        };
        match result {
            Ok(batch) => {
                info!(
                    "{direction:?} from level {} started",
                    navigator.context().level
                );
                effects.write_batch(batch);
            }
            Err(err) => debug!("{direction:?} ignored: {err}"),
        }
    }
}

/// Feeds completion signals to the navigator and forwards its next effects.
pub fn advance_navigation(
    mut signals: MessageReader<NavSignal>,
    mut navigator: ResMut<Navigator>,
    mut effects: MessageWriter<NavEffect>,
) {
    for &signal in signals.read() {
        let before = navigator.context();
        let was_idle = navigator.is_idle();
        let batch = navigator.signal(signal);

        let after = navigator.context();
        if after != before {
            info!(
                "level {} -> {} (parent {:?})",
                before.level, after.level, after.parent
            );
        }
        if !was_idle && navigator.is_idle() {
            info!("transition finished at level {}", after.level);
        }
        effects.write_batch(batch);
    }
}

/// Spawns the transition overlay in front of the camera.
pub fn spawn_fade_overlay(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    cfg: Res<NavigationConfig>,
    camera: Query<Entity, With<MapCamera>>,
) {
    let Ok(camera) = camera.single() else {
        warn!("no camera to carry the fade overlay");
        return;
    };
    let overlay = commands
        .spawn((
            Name::new("Fade overlay"),
            FadeOverlay::default(),
            Mesh3d(meshes.add(Rectangle::new(cfg.overlay_extent, cfg.overlay_extent))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: cfg.ascend_tint.with_alpha(0.0),
                unlit: true,
                alpha_mode: AlphaMode::Blend,
                ..default()
            })),
            Transform::from_xyz(0.0, 0.0, -cfg.overlay_distance),
            Visibility::Hidden,
        ))
        .id();
    commands.entity(camera).add_child(overlay);
}

/// Runs `FadeIn` / `FadeOut` on the overlay and reports each finished fade.
///
/// Without an overlay the fades complete at once so a transition can never
/// stall behind a missing entity.
pub fn run_overlay_fades(
    time: Res<Time>,
    cfg: Res<NavigationConfig>,
    mut effects: MessageReader<NavEffect>,
    mut signals: MessageWriter<NavSignal>,
    mut overlay: Query<(
        &mut FadeOverlay,
        &MeshMaterial3d<StandardMaterial>,
        &mut Visibility,
    )>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let Ok((mut fade, material, mut visibility)) = overlay.single_mut() else {
        for effect in effects.read() {
            match effect {
                NavEffect::FadeIn { .. } => {
                    signals.write(NavSignal::FadeInDone);
                }
                NavEffect::FadeOut => {
                    signals.write(NavSignal::FadeOutDone);
                }
                _ => {}
            }
        }
        return;
    };

    let mut tint = None;
    for effect in effects.read() {
        match *effect {
            NavEffect::FadeIn { tint: color } => {
                tint = Some(color);
                fade.start(cfg.overlay_opacity, cfg.fade_in_secs, NavSignal::FadeInDone);
            }
            NavEffect::FadeOut => {
                fade.start(0.0, cfg.fade_out_secs, NavSignal::FadeOutDone);
            }
            _ => {}
        }
    }

    if fade.running.is_none() && tint.is_none() {
        return;
    }
    if let Some(done) = fade.tick(time.delta_secs()) {
        signals.write(done);
    }

    let alpha = fade.alpha();
    if let Some(mat) = materials.get_mut(&material.0) {
        mat.base_color = tint.unwrap_or(mat.base_color).with_alpha(alpha);
    }
    *visibility = if alpha > 0.0 {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    };
}
