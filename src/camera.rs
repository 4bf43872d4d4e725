//! Map camera: pan, zoom, tile picking and navigation flights.
//!
//! The camera keeps a fixed 45° pitch. [`CameraRig`] owns the position and
//! the bounds; the entity's `Transform` is derived from it every time it
//! changes.

mod entities;
pub mod systems;

pub use entities::{LastPick, MapCamera, PointerGesture};

use bevy::prelude::*;

use crate::AppSet;

/// Camera lens and input tuning.
#[derive(Resource, Clone, Debug, Reflect)]
pub struct CameraConfig {
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// World units moved per dragged pixel, per unit of camera height.
    pub pan_sensitivity: f32,
    /// World units travelled per wheel line.
    pub zoom_step: f32,
    /// Pointer travel in pixels that turns a press into a drag.
    pub drag_threshold: f32,
    /// Hover height above a tile being entered, in tile sizes.
    pub hover_height: f32,
    /// Duration of navigation flights.
    pub tween_secs: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y: 50f32.to_radians(),
            pan_sensitivity: 0.0025,
            zoom_step: 1.5,
            drag_threshold: 5.0,
            hover_height: 3.0,
            tween_secs: 0.8,
        }
    }
}

pub struct CameraPlugin(pub CameraConfig);

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<CameraConfig>()
            .register_type::<MapCamera>()
            .insert_resource(self.0.clone())
            .init_resource::<PointerGesture>()
            .init_resource::<LastPick>()
            .add_systems(Startup, systems::spawn_camera)
            .add_systems(
                Update,
                (
                    systems::handle_pointer.in_set(AppSet::Input),
                    systems::apply_camera_effects.in_set(AppSet::Execute),
                    (systems::fly_camera, systems::sync_camera_transform)
                        .chain()
                        .in_set(AppSet::Animate),
                ),
            );
    }
}
