//! Tile models: a reference-counted registry plus off-thread column builds.
//!
//! Tiles never own GPU resources. They hold a reference in the
//! [`ModelRegistry`]; the registry is the sole owner of every loaded
//! [`ModelAsset`] and evicts it when the last tile lets go.

mod entities;
pub mod registry;
pub mod systems;

pub use entities::{ModelAsset, ModelLoadFinished, ModelLoads, ModelRegistry};

use bevy::prelude::*;

/// Per-plugin configuration for model builds.
#[derive(Resource, Clone, Debug, Reflect)]
pub struct ModelsConfig {
    /// Column radius as a fraction of the tile size; below 1 leaves a seam.
    pub footprint: f32,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self { footprint: 0.94 }
    }
}

/// Registry, in-flight loads and the poll system that completes them.
pub struct ModelsPlugin(pub ModelsConfig);

impl Plugin for ModelsPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<ModelsConfig>()
            .insert_resource(self.0.clone())
            .init_resource::<ModelRegistry>()
            .init_resource::<ModelLoads>()
            .add_message::<ModelLoadFinished>()
            .add_systems(PreUpdate, systems::poll_model_loads);
    }
}
