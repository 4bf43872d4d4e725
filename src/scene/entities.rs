use std::sync::Arc;

use bevy::platform::collections::{HashMap, HashSet};
use bevy::prelude::*;
use bevy::tasks::Task;
use hexx::Hex;

use crate::tiles::{TileFetchError, TileRecord, TileRequest, TileSource};

/// Where tile data comes from.
#[derive(Resource, Clone)]
pub struct TileProvider(pub Arc<dyn TileSource>);

/// The tile set of the current level, keyed by coordinate.
#[derive(Resource, Debug, Default)]
pub struct TileIndex {
    level: Option<i32>,
    tiles: HashMap<Hex, Entity>,
}

impl TileIndex {
    /// Starts a new level; the index must be empty.
    pub fn begin_level(&mut self, level: i32) {
        self.level = Some(level);
    }

    /// Registers a tile. Returns `false` if `hex` is already taken.
    pub fn insert(&mut self, hex: Hex, entity: Entity) -> bool {
        if self.tiles.contains_key(&hex) {
            return false;
        }
        self.tiles.insert(hex, entity);
        true
    }

    pub fn get(&self, hex: Hex) -> Option<Entity> {
        self.tiles.get(&hex).copied()
    }

    pub fn level(&self) -> Option<i32> {
        self.level
    }

    pub fn coords(&self) -> impl Iterator<Item = Hex> + '_ {
        self.tiles.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Empties the index, handing back every tile entity.
    pub fn take_all(&mut self) -> Vec<Entity> {
        self.level = None;
        self.tiles.drain().map(|(_, e)| e).collect()
    }
}

pub(super) type FetchTask = Task<Result<Vec<TileRecord>, TileFetchError>>;

/// The single in-flight tile fetch, if any.
#[derive(Resource, Default)]
pub struct PendingFetch {
    pub(super) running: Option<(TileRequest, FetchTask)>,
}

impl PendingFetch {
    pub fn is_busy(&self) -> bool {
        self.running.is_some()
    }
}

/// Drops repeated coordinates, keeping the first record for each.
///
/// Returns the kept records and the coordinates that were repeated.
pub fn dedupe_records(records: Vec<TileRecord>) -> (Vec<TileRecord>, Vec<Hex>) {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    let kept = records
        .into_iter()
        .filter(|r| {
            let fresh = seen.insert(r.hex());
            if !fresh {
                duplicates.push(r.hex());
            }
            fresh
        })
        .collect();
    (kept, duplicates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::Terrain;

    fn record(q: i32, r: i32, terrain: Terrain) -> TileRecord {
        TileRecord { q, r, terrain }
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let (kept, dups) = dedupe_records(vec![
            record(0, 0, Terrain::Grass),
            record(1, 0, Terrain::Sand),
            record(0, 0, Terrain::Snow),
        ]);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].terrain, Terrain::Grass);
        assert_eq!(dups, vec![Hex::ZERO]);
    }

    #[test]
    fn index_rejects_duplicate_coordinates() {
        let mut world = World::new();
        let a = world.spawn_empty().id();
        let b = world.spawn_empty().id();
        let mut index = TileIndex::default();
        index.begin_level(2);
        assert!(index.insert(Hex::ZERO, a));
        assert!(!index.insert(Hex::ZERO, b));
        assert_eq!(index.get(Hex::ZERO), Some(a));
        assert_eq!(index.level(), Some(2));
    }

    #[test]
    fn take_all_empties_index() {
        let mut world = World::new();
        let mut index = TileIndex::default();
        index.begin_level(1);
        for hex in [Hex::ZERO, Hex::new(1, 0), Hex::new(0, 1)] {
            index.insert(hex, world.spawn_empty().id());
        }
        assert_eq!(index.take_all().len(), 3);
        assert!(index.is_empty());
        assert_eq!(index.level(), None);
    }
}
