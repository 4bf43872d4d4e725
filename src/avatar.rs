//! The player avatar: a marker that walks between nearby tiles.

mod entities;
pub mod systems;

pub use entities::Avatar;

use bevy::prelude::*;

use crate::AppSet;

#[derive(Resource, Clone, Debug, Reflect)]
pub struct AvatarConfig {
    /// A pick moves the avatar only when strictly closer than this many cells.
    pub movement_range: u32,
    /// Glide speed in tile sizes per second.
    pub glide_speed: f32,
    /// Float height above the column top, in tile sizes.
    pub hover: f32,
    /// Sphere radius in tile sizes.
    pub radius: f32,
    pub color: Color,
    pub emissive: LinearRgba,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            movement_range: 3,
            glide_speed: 4.0,
            hover: 0.35,
            radius: 0.22,
            color: Color::srgb(0.9, 0.2, 0.35),
            emissive: LinearRgba::rgb(2.0, 0.3, 0.6),
        }
    }
}

pub struct AvatarPlugin(pub AvatarConfig);

impl Plugin for AvatarPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<AvatarConfig>()
            .register_type::<Avatar>()
            .insert_resource(self.0.clone())
            .add_systems(Startup, systems::spawn_avatar)
            .add_systems(
                Update,
                (
                    systems::steer_avatar.in_set(AppSet::Execute),
                    systems::glide_avatar.in_set(AppSet::Animate),
                ),
            );
    }
}
