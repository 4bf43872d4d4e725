use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::input::mouse::{MouseScrollUnit, MouseWheel};
use bevy::post_process::bloom::{Bloom, BloomCompositeMode};
use bevy::prelude::*;
use bevy::render::view::Hdr;
use bevy::window::PrimaryWindow;

use super::CameraConfig;
use super::entities::{
    CameraFlight, CameraRig, CameraTween, Gesture, LastPick, MapCamera, PointerGesture,
};
use crate::navigation::{NavEffect, NavSignal, Navigator};
use crate::scene::SceneConfig;
use crate::tiles::{Tile, TilePicked};

/// Pixels per line for pixel-precise scroll devices.
const PIXELS_PER_LINE: f32 = 40.0;

/// Spawns the map camera with HDR bloom at the default framing.
pub fn spawn_camera(mut commands: Commands, cfg: Res<CameraConfig>, scene: Res<SceneConfig>) {
    let rig = CameraRig::new(scene.tile_size, scene.map_size());
    commands.spawn((
        Name::new("Map camera"),
        Camera3d::default(),
        Hdr,
        Tonemapping::TonyMcMapface,
        Bloom {
            intensity: 0.15,
            composite_mode: BloomCompositeMode::Additive,
            ..Bloom::NATURAL
        },
        Projection::from(PerspectiveProjection {
            fov: cfg.fov_y,
            ..default()
        }),
        rig.transform(),
        Visibility::default(),
        rig,
        MapCamera,
    ));
}

/// Left drag pans, the wheel zooms, a left click picks a tile.
///
/// All pointer input is dropped while a level transition runs.
#[allow(clippy::too_many_arguments)]
pub fn handle_pointer(
    buttons: Res<ButtonInput<MouseButton>>,
    mut wheel: MessageReader<MouseWheel>,
    windows: Query<&Window, With<PrimaryWindow>>,
    navigator: Res<Navigator>,
    cfg: Res<CameraConfig>,
    mut gesture: ResMut<PointerGesture>,
    mut rigs: Query<&mut CameraRig, Without<CameraFlight>>,
    tiles: Query<&Tile>,
    mut picks: MessageWriter<TilePicked>,
    mut last_pick: ResMut<LastPick>,
) {
    if !navigator.is_idle() {
        wheel.clear();
        *gesture = PointerGesture::default();
        return;
    }
    let (Ok(window), Ok(mut rig)) = (windows.single(), rigs.single_mut()) else {
        wheel.clear();
        return;
    };

    for ev in wheel.read() {
        let lines = match ev.unit {
            MouseScrollUnit::Line => ev.y,
            MouseScrollUnit::Pixel => ev.y / PIXELS_PER_LINE,
        };
        if lines != 0.0 && !rig.zoom(lines * cfg.zoom_step) {
            debug!("zoom limit reached at height {:.1}", rig.position.y);
        }
    }

    let Some(cursor) = window.cursor_position() else {
        return;
    };
    if buttons.just_pressed(MouseButton::Left) {
        gesture.press(cursor);
    }
    if let Some(delta) = gesture.motion(cursor, cfg.drag_threshold) {
        rig.pan(delta, cfg.pan_sensitivity);
    }
    if !buttons.just_released(MouseButton::Left) {
        return;
    }
    let Some(Gesture::Click(at)) = gesture.release(cursor, cfg.drag_threshold) else {
        return;
    };

    let viewport = Vec2::new(window.width(), window.height());
    let picked = rig.pick(
        at,
        viewport,
        cfg.fov_y,
        tiles.iter().map(|t| (t.hex, t.world_pos)),
    );
    last_pick.0 = picked.map(|(_, p)| p);
    match picked {
        Some((hex, _)) => debug!("picked tile ({}, {})", hex.x, hex.y),
        None => debug!("pick miss at {at}"),
    }
    picks.write(TilePicked {
        hex: picked.map(|(hex, _)| hex),
    });
}

/// Starts camera moves requested by the navigator.
pub fn apply_camera_effects(
    mut commands: Commands,
    mut effects: MessageReader<NavEffect>,
    cfg: Res<CameraConfig>,
    mut rigs: Query<(Entity, &mut CameraRig)>,
    mut signals: MessageWriter<NavSignal>,
) {
    let Ok((entity, mut rig)) = rigs.single_mut() else {
        for effect in effects.read() {
            if let NavEffect::HoverCamera { .. } = effect {
                signals.write(NavSignal::CameraArrived);
            }
        }
        return;
    };

    for effect in effects.read() {
        match *effect {
            NavEffect::HoverCamera { over } => {
                let to = rig.hover(over, cfg.hover_height);
                commands
                    .entity(entity)
                    .insert(CameraFlight(CameraTween::new(rig.position, to, cfg.tween_secs)));
            }
            NavEffect::FrameCamera { focus } => {
                commands.entity(entity).remove::<CameraFlight>();
                rig.position = rig.framing(focus);
            }
            _ => {}
        }
    }
}

/// Advances the camera flight and reports arrival.
pub fn fly_camera(
    mut commands: Commands,
    time: Res<Time>,
    mut flights: Query<(Entity, &mut CameraRig, &mut CameraFlight)>,
    mut signals: MessageWriter<NavSignal>,
) {
    for (entity, mut rig, mut flight) in &mut flights {
        rig.position = flight.0.advance(time.delta_secs());
        if flight.0.is_finished() {
            commands.entity(entity).remove::<CameraFlight>();
            signals.write(NavSignal::CameraArrived);
        }
    }
}

pub fn sync_camera_transform(
    mut cameras: Query<(&CameraRig, &mut Transform), Changed<CameraRig>>,
) {
    for (rig, mut transform) in &mut cameras {
        *transform = rig.transform();
    }
}
