use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use hexx::Hex;

use super::source::{Terrain, TileRecord};
use crate::math;
use crate::models::registry::{Acquire, AssetRegistry, LoadTicket, Release};
use crate::models::{ModelLoads, ModelRegistry, ModelsConfig};

/// Where a tile is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    /// Positioned, waiting on its model.
    Constructing(LoadTicket),
    /// Model attached; holds one registry reference.
    Ready,
    /// Model load failed; the tile stays without a visual.
    Unmodelled,
    /// Terminal.
    Disposed,
}

/// What a caller must clean up after [`Tile::dispose`].
#[derive(Debug, PartialEq)]
pub struct Disposal<A> {
    /// Evicted model whose resources must be freed now.
    pub evicted: Option<A>,
    /// Focus decoration to remove from the scene.
    pub border: Option<Entity>,
}

/// One hex cell of the current level.
///
/// The drawable model and focus decoration are child entities; the tile only
/// keeps the registry lease and the decoration handle.
#[derive(Component, Debug)]
pub struct Tile {
    pub hex: Hex,
    pub level: i32,
    pub terrain: Terrain,
    pub model_id: String,
    pub world_pos: Vec3,
    /// Column height above the ground plane.
    pub height: f32,
    state: TileState,
    border: Option<Entity>,
}

impl Tile {
    /// Creates the tile and takes its registry reference.
    ///
    /// The returned [`Acquire`] tells the caller whether to start a load
    /// (`Started`) or attach the model right away (`Ready`).
    pub fn construct<A: Clone>(
        record: &TileRecord,
        level: i32,
        tile_size: f32,
        registry: &mut AssetRegistry<A>,
    ) -> (Self, Acquire<A>) {
        let model_id = record.terrain.model_id();
        let acquired = registry.acquire(&model_id);
        let state = match &acquired {
            Acquire::Ready(_) => TileState::Ready,
            Acquire::Pending(ticket) | Acquire::Started(ticket) => TileState::Constructing(*ticket),
        };
        let tile = Self {
            hex: record.hex(),
            level,
            terrain: record.terrain,
            model_id,
            world_pos: math::axial_to_ground(record.hex(), tile_size),
            height: record.terrain.column_height() * tile_size,
            state,
            border: None,
        };
        (tile, acquired)
    }

    #[cfg(test)]
    pub fn state(&self) -> TileState {
        self.state
    }

    pub fn is_focused(&self) -> bool {
        self.border.is_some()
    }

    pub fn color(&self) -> Color {
        self.terrain.color()
    }

    /// Ticket this tile waits on, if still constructing.
    pub fn pending_ticket(&self) -> Option<LoadTicket> {
        match self.state {
            TileState::Constructing(ticket) => Some(ticket),
            _ => None,
        }
    }

    /// The awaited model resolved and the registry counted this tile.
    pub fn mark_ready(&mut self) {
        if matches!(self.state, TileState::Constructing(_)) {
            self.state = TileState::Ready;
        }
    }

    pub fn mark_unmodelled(&mut self) {
        if matches!(self.state, TileState::Constructing(_)) {
            self.state = TileState::Unmodelled;
        }
    }

    /// Attaches a focus decoration created by `spawn`. No-op when already
    /// focused or disposed.
    pub fn add_focus_border(&mut self, spawn: impl FnOnce() -> Entity) -> bool {
        if self.border.is_some() || self.state == TileState::Disposed {
            return false;
        }
        self.border = Some(spawn());
        true
    }

    /// Detaches the focus decoration, returning it for removal.
    pub fn remove_focus_border(&mut self) -> Option<Entity> {
        self.border.take()
    }

    /// Releases the model reference and detaches the decoration.
    ///
    /// A tile disposed while its model is still loading withdraws from the
    /// load, so the registry never counts it. Calling this twice is a no-op.
    pub fn dispose<A: Clone>(&mut self, registry: &mut AssetRegistry<A>) -> Disposal<A> {
        let border = self.border.take();
        let evicted = match self.state {
            TileState::Constructing(ticket) => {
                if registry.cancel(&self.model_id, ticket) {
                    None
                } else {
                    release(registry, &self.model_id)
                }
            }
            TileState::Ready => release(registry, &self.model_id),
            TileState::Unmodelled | TileState::Disposed => None,
        };
        self.state = TileState::Disposed;
        Disposal { evicted, border }
    }
}

fn release<A: Clone>(registry: &mut AssetRegistry<A>, model_id: &str) -> Option<A> {
    match registry.release(model_id) {
        Ok(Release::Evicted(asset)) => Some(asset),
        Ok(Release::Retained(_)) => None,
        Err(err) => {
            warn!("tile release: {err}");
            None
        }
    }
}

/// Marker on the child entity drawing a tile's model.
#[derive(Component, Reflect)]
pub struct TileModel;

/// Marker on the focus decoration entity.
#[derive(Component, Reflect)]
pub struct FocusBorder;

/// The single focused tile, if any.
#[derive(Resource, Default, Debug, Reflect)]
pub struct Focus {
    pub tile: Option<Hex>,
}

/// Result of a click on the map: `None` is a pick miss.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilePicked {
    pub hex: Option<Hex>,
}

/// Shared handles for focus decorations.
#[derive(Resource)]
pub struct FocusBorderAssets {
    pub mesh: Handle<Mesh>,
    pub material: Handle<StandardMaterial>,
}

/// Bundled resources every tile lifecycle operation touches.
#[derive(SystemParam)]
pub struct TileAssets<'w> {
    pub registry: ResMut<'w, ModelRegistry>,
    pub loads: ResMut<'w, ModelLoads>,
    pub meshes: ResMut<'w, Assets<Mesh>>,
    pub materials: ResMut<'w, Assets<StandardMaterial>>,
    pub models_cfg: Res<'w, ModelsConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    type Registry = AssetRegistry<&'static str>;

    fn record(q: i32, r: i32, terrain: Terrain) -> TileRecord {
        TileRecord { q, r, terrain }
    }

    fn entity() -> Entity {
        World::new().spawn_empty().id()
    }

    #[test]
    fn construct_positions_tile_before_model_resolves() {
        let mut reg = Registry::new();
        let (tile, acquired) = Tile::construct(&record(1, 0, Terrain::Grass), 2, 2.0, &mut reg);
        assert!(matches!(acquired, Acquire::Started(_)));
        assert!(matches!(tile.state(), TileState::Constructing(_)));
        assert_eq!(tile.world_pos, math::axial_to_ground(Hex::new(1, 0), 2.0));
        assert_eq!(tile.model_id, "hex-column/grass");
        assert_eq!(tile.level, 2);
        assert!((tile.height - Terrain::Grass.column_height() * 2.0).abs() < 1e-6);
    }

    #[test]
    fn same_terrain_tiles_share_one_load() {
        let mut reg = Registry::new();
        let (a, first) = Tile::construct(&record(0, 0, Terrain::Sand), 0, 1.0, &mut reg);
        let (b, second) = Tile::construct(&record(1, 0, Terrain::Sand), 0, 1.0, &mut reg);
        assert!(matches!(first, Acquire::Started(_)));
        assert!(matches!(second, Acquire::Pending(_)));
        assert_eq!(reg.loads_started(), 1);
        assert_ne!(a.pending_ticket(), b.pending_ticket());
    }

    #[test]
    fn focus_border_is_idempotent() {
        let mut reg = Registry::new();
        let (mut tile, _) = Tile::construct(&record(0, 0, Terrain::Snow), 0, 1.0, &mut reg);
        let border = entity();
        let mut spawned = 0;

        assert!(tile.add_focus_border(|| {
            spawned += 1;
            border
        }));
        assert!(!tile.add_focus_border(|| {
            spawned += 1;
            border
        }));
        assert_eq!(spawned, 1);
        assert!(tile.is_focused());

        assert_eq!(tile.remove_focus_border(), Some(border));
        assert_eq!(tile.remove_focus_border(), None);
        assert!(!tile.is_focused());
        assert_eq!(tile.hex, Hex::ZERO);
    }

    #[test]
    fn dispose_ready_tile_releases_and_evicts_last_reference() {
        let mut reg = Registry::new();
        let (mut a, _) = Tile::construct(&record(0, 0, Terrain::Forest), 0, 1.0, &mut reg);
        let (mut b, _) = Tile::construct(&record(0, 1, Terrain::Forest), 0, 1.0, &mut reg);
        reg.complete::<()>("hex-column/forest", Ok("mesh"));
        a.mark_ready();
        b.mark_ready();
        assert_eq!(reg.ref_count("hex-column/forest"), 2);

        let first = a.dispose(&mut reg);
        assert_eq!(first.evicted, None);
        assert_eq!(reg.ref_count("hex-column/forest"), 1);

        let last = b.dispose(&mut reg);
        assert_eq!(last.evicted, Some("mesh"));
        assert!(reg.is_empty());
    }

    #[test]
    fn dispose_detaches_focus_border() {
        let mut reg = Registry::new();
        let (mut tile, _) = Tile::construct(&record(0, 0, Terrain::Water), 0, 1.0, &mut reg);
        let border = entity();
        tile.add_focus_border(|| border);
        let disposal = tile.dispose(&mut reg);
        assert_eq!(disposal.border, Some(border));
        assert!(!tile.is_focused());
        assert!(!tile.add_focus_border(entity));
    }

    #[test]
    fn dispose_while_loading_withdraws_from_load() {
        let mut reg = Registry::new();
        let (mut a, _) = Tile::construct(&record(0, 0, Terrain::Mountain), 0, 1.0, &mut reg);
        let (b, _) = Tile::construct(&record(1, 0, Terrain::Mountain), 0, 1.0, &mut reg);
        assert_eq!(a.dispose(&mut reg).evicted, None);

        let done = reg.complete::<()>("hex-column/mountain", Ok("mesh"));
        let crate::models::registry::Completion::Resolved { waiters, .. } = done else {
            panic!("expected resolution");
        };
        assert_eq!(waiters, vec![b.pending_ticket().unwrap()]);
        assert_eq!(reg.ref_count("hex-column/mountain"), 1);
    }

    #[test]
    fn load_resolving_after_every_tile_left_is_orphaned() {
        let mut reg = Registry::new();
        let (mut a, _) = Tile::construct(&record(0, 0, Terrain::Grass), 0, 1.0, &mut reg);
        a.dispose(&mut reg);
        assert_eq!(
            reg.complete::<()>("hex-column/grass", Ok("mesh")),
            crate::models::registry::Completion::Orphaned("mesh")
        );
        assert!(reg.is_empty());
    }

    #[test]
    fn dispose_is_terminal_and_repeatable() {
        let mut reg = Registry::new();
        let (mut tile, _) = Tile::construct(&record(0, 0, Terrain::Sand), 0, 1.0, &mut reg);
        reg.complete::<()>("hex-column/sand", Ok("mesh"));
        tile.mark_ready();
        assert_eq!(tile.dispose(&mut reg).evicted, Some("mesh"));
        assert_eq!(tile.state(), TileState::Disposed);
        assert_eq!(
            tile.dispose(&mut reg),
            Disposal {
                evicted: None,
                border: None
            }
        );
        tile.mark_ready();
        assert_eq!(tile.state(), TileState::Disposed);
    }

    #[test]
    fn failed_model_leaves_tile_unmodelled() {
        let mut reg = Registry::new();
        let (mut tile, _) = Tile::construct(&record(0, 0, Terrain::Snow), 0, 1.0, &mut reg);
        reg.complete("hex-column/snow", Err::<&str, _>("bad mesh"));
        tile.mark_unmodelled();
        assert_eq!(tile.state(), TileState::Unmodelled);
        assert_eq!(tile.dispose(&mut reg).evicted, None);
    }

    #[test]
    fn cached_model_makes_tile_ready_immediately() {
        let mut reg = Registry::new();
        let (mut first, _) = Tile::construct(&record(0, 0, Terrain::Grass), 0, 1.0, &mut reg);
        reg.complete::<()>("hex-column/grass", Ok("mesh"));
        first.mark_ready();
        let (second, acquired) = Tile::construct(&record(0, 1, Terrain::Grass), 0, 1.0, &mut reg);
        assert_eq!(acquired, Acquire::Ready("mesh"));
        assert_eq!(second.state(), TileState::Ready);
        assert_eq!(reg.ref_count("hex-column/grass"), 2);
    }
}
