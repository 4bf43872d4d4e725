use bevy::platform::collections::HashMap;
use bevy::prelude::*;
use bevy::tasks::Task;

use super::registry::AssetRegistry;

/// GPU-side resources shared by every tile drawing the same model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelAsset {
    pub mesh: Handle<Mesh>,
    pub material: Handle<StandardMaterial>,
}

/// The single owner of loaded tile models.
#[derive(Resource, Default, Deref, DerefMut)]
pub struct ModelRegistry(pub AssetRegistry<ModelAsset>);

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ModelLoadError {
    #[error("no model is known by id `{0}`")]
    UnknownModel(String),
    #[error("model `{0}` produced an empty mesh")]
    EmptyMesh(String),
}

/// CPU-side result of an off-thread model build.
pub struct ModelParts {
    pub mesh: Mesh,
    pub material: StandardMaterial,
}

/// In-flight model builds, at most one per model id.
#[derive(Resource, Default)]
pub struct ModelLoads {
    pub(super) tasks: HashMap<String, Task<Result<ModelParts, ModelLoadError>>>,
}

/// Emitted once per finished build, after the parts were uploaded into
/// `Assets`.
#[derive(Message, Debug)]
pub struct ModelLoadFinished {
    pub model_id: String,
    pub result: Result<ModelAsset, ModelLoadError>,
}
