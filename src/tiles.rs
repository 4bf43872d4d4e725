//! Tiles of the current level: data sources, the per-tile lifecycle and focus.
//!
//! A tile is positioned the moment it is spawned; its drawable arrives once
//! the shared model resolves. Focus is a single optional coordinate
//! ([`Focus`]) mirrored by a ring decoration on at most one tile.

mod entities;
pub mod source;
pub mod systems;

pub use entities::{Focus, FocusBorder, Tile, TileAssets, TileModel, TilePicked};
pub use source::{
    ProceduralSource, Terrain, TileFetchError, TileRecord, TileRequest, TileSource,
};

use bevy::prelude::*;

use crate::AppSet;

/// Look of the focus decoration.
#[derive(Resource, Clone, Debug, Reflect)]
pub struct TilesConfig {
    /// Ring base colour.
    pub border_color: Color,
    /// Emissive boost so the ring blooms.
    pub border_emissive: LinearRgba,
    /// Ring pulse angular speed (rad/s).
    pub pulse_speed: f32,
    /// Ring pulse scale amplitude.
    pub pulse_amplitude: f32,
}

impl Default for TilesConfig {
    fn default() -> Self {
        Self {
            border_color: Color::srgb(1.0, 0.85, 0.3),
            border_emissive: LinearRgba::rgb(6.0, 4.0, 1.0),
            pulse_speed: 4.0,
            pulse_amplitude: 0.04,
        }
    }
}

/// Tile lifecycle systems: model attachment, focus and per-frame animation.
pub struct TilesPlugin(pub TilesConfig);

impl Plugin for TilesPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<TilesConfig>()
            .register_type::<Focus>()
            .register_type::<TileModel>()
            .register_type::<FocusBorder>()
            .insert_resource(self.0.clone())
            .init_resource::<Focus>()
            .add_message::<TilePicked>()
            .add_systems(Startup, systems::setup_focus_border)
            .add_systems(
                PreUpdate,
                systems::attach_loaded_models.after(crate::models::systems::poll_model_loads),
            )
            .add_systems(
                Update,
                (
                    systems::apply_tile_picks.in_set(AppSet::Execute),
                    systems::pulse_focus_borders.in_set(AppSet::Animate),
                ),
            );
    }
}
