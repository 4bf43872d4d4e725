use bevy::asset::RenderAssetUsages;
use bevy::mesh::Indices;
use bevy::prelude::*;
use bevy::render::render_resource::PrimitiveTopology;
use bevy::tasks::{AsyncComputeTaskPool, block_on, futures_lite::future};
use hexx::{ColumnMeshBuilder, HexLayout, HexOrientation};

use super::ModelsConfig;
use super::entities::{ModelAsset, ModelLoadError, ModelLoadFinished, ModelLoads, ModelParts};
use crate::tiles::Terrain;

/// Builds the hex column for `model_id`. Pure CPU work, safe off-thread.
pub fn build_model(
    model_id: &str,
    tile_size: f32,
    footprint: f32,
) -> Result<ModelParts, ModelLoadError> {
    let terrain = Terrain::from_model_id(model_id)
        .ok_or_else(|| ModelLoadError::UnknownModel(model_id.to_owned()))?;

    let layout = HexLayout {
        orientation: HexOrientation::Flat,
        scale: Vec2::splat(tile_size * footprint),
        ..default()
    };
    let info = ColumnMeshBuilder::new(&layout, terrain.column_height() * tile_size)
        .without_bottom_face()
        .build();
    if info.vertices.is_empty() || info.indices.is_empty() {
        return Err(ModelLoadError::EmptyMesh(model_id.to_owned()));
    }

    let mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::RENDER_WORLD,
    )
    .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, info.vertices)
    .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, info.normals)
    .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, info.uvs)
    .with_inserted_indices(Indices::U16(info.indices));

    let material = StandardMaterial {
        base_color: terrain.color(),
        perceptual_roughness: 0.85,
        ..default()
    };

    Ok(ModelParts { mesh, material })
}

/// Starts the build for `model_id` unless one is already in flight.
///
/// Callers only reach this after the registry answered
/// [`Acquire::Started`](super::registry::Acquire::Started).
pub fn start_model_load(
    loads: &mut ModelLoads,
    model_id: &str,
    tile_size: f32,
    cfg: &ModelsConfig,
) {
    if loads.tasks.contains_key(model_id) {
        warn!("model `{model_id}` is already loading");
        return;
    }
    let id = model_id.to_owned();
    let footprint = cfg.footprint;
    let task = AsyncComputeTaskPool::get()
        .spawn(async move { build_model(&id, tile_size, footprint) });
    loads.tasks.insert(model_id.to_owned(), task);
    debug!("model `{model_id}` load started");
}

/// Polls in-flight builds, uploads finished parts and reports each outcome.
pub fn poll_model_loads(
    mut loads: ResMut<ModelLoads>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut finished: MessageWriter<ModelLoadFinished>,
) {
    let mut done = Vec::new();
    for (model_id, task) in loads.tasks.iter_mut() {
        if let Some(result) = block_on(future::poll_once(task)) {
            done.push((model_id.clone(), result));
        }
    }

    for (model_id, result) in done {
        loads.tasks.remove(&model_id);
        let result = result.map(|parts| ModelAsset {
            mesh: meshes.add(parts.mesh),
            material: materials.add(parts.material),
        });
        if let Err(err) = &result {
            warn!("model load failed: {err}");
        }
        finished.write(ModelLoadFinished { model_id, result });
    }
}

/// Frees the GPU resources behind an evicted model.
pub fn free_model(
    asset: &ModelAsset,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
) {
    meshes.remove(&asset.mesh);
    materials.remove(&asset.material);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_terrain_builds_a_column() {
        for t in Terrain::ALL {
            let parts = build_model(&t.model_id(), 1.0, 0.95).unwrap();
            assert!(parts.mesh.count_vertices() > 0, "{t} has no vertices");
            assert_eq!(parts.material.base_color, t.color());
        }
    }

    #[test]
    fn unknown_model_id_fails() {
        let err = build_model("hex-column/lava", 1.0, 0.95).err();
        assert_eq!(
            err,
            Some(ModelLoadError::UnknownModel("hex-column/lava".into()))
        );
    }

    #[test]
    fn taller_terrain_builds_taller_column() {
        let top = |t: Terrain| {
            let parts = build_model(&t.model_id(), 2.0, 1.0).unwrap();
            let Some(bevy::mesh::VertexAttributeValues::Float32x3(positions)) =
                parts.mesh.attribute(Mesh::ATTRIBUTE_POSITION)
            else {
                panic!("missing positions");
            };
            positions.iter().map(|p| p[1]).fold(f32::MIN, f32::max)
        };
        assert!(top(Terrain::Snow) > top(Terrain::Mountain));
        assert!(top(Terrain::Mountain) > top(Terrain::Water));
    }
}
