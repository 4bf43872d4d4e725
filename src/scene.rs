//! Scene orchestration: tile data in, tile entities out.
//!
//! Owns the tile set of the current level ([`TileIndex`]) and the single
//! in-flight fetch ([`PendingFetch`]). Carries out the navigator's
//! `DisposeTiles` / `FetchTiles` effects and reports `TilesSettled` once a
//! new level is in place, even when its data could not be fetched.

mod entities;
pub mod systems;

pub use entities::{PendingFetch, TileIndex, TileProvider};

use std::sync::Arc;

use bevy::prelude::*;

use crate::tiles::ProceduralSource;
use crate::{AppSet, GameState};

/// Map geometry shared by every subsystem.
#[derive(Resource, Clone, Debug, Reflect)]
pub struct SceneConfig {
    /// Hex corner radius in world units.
    pub tile_size: f32,
    /// Rings of tiles requested around each level's origin.
    pub grid_radius: u32,
    /// Background clear color.
    pub clear_color: Color,
}

impl SceneConfig {
    /// Half-extent used for camera bounds: `tile_size · 2 · grid_radius`.
    pub fn map_size(&self) -> f32 {
        self.tile_size * 2.0 * self.grid_radius.max(1) as f32
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            tile_size: 1.0,
            grid_radius: 6,
            clear_color: Color::srgb(0.01, 0.01, 0.02),
        }
    }
}

/// Tile set lifecycle, lighting and debug overlays.
///
/// Falls back to [`ProceduralSource`] unless a [`TileProvider`] was inserted
/// before the plugin.
pub struct ScenePlugin(pub SceneConfig);

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<TileProvider>() {
            app.insert_resource(TileProvider(Arc::new(ProceduralSource::default())));
        }
        app.register_type::<SceneConfig>()
            .insert_resource(self.0.clone())
            .insert_resource(ClearColor(self.0.clear_color))
            .init_resource::<TileIndex>()
            .init_resource::<PendingFetch>()
            .add_systems(
                Startup,
                (systems::setup_scene, systems::request_initial_tiles),
            )
            .add_systems(
                Update,
                (
                    systems::apply_scene_effects.in_set(AppSet::Execute),
                    systems::poll_tile_fetch.in_set(AppSet::Animate),
                ),
            )
            .add_systems(
                Update,
                (systems::draw_level_gizmos, systems::draw_tile_labels)
                    .run_if(in_state(GameState::Debugging)),
            )
            .add_systems(Last, systems::teardown_on_exit);
    }
}
