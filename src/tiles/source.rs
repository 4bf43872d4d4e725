//! Tile data providers.
//!
//! The scene only sees [`TileSource::fetch`], executed on the async compute
//! pool. Two providers ship with the crate: [`ProceduralSource`] (noise,
//! deterministic) and [`DirectorySource`] (JSON files on disk).

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use bevy::prelude::*;
use hexx::{Hex, shapes};
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use serde::Deserialize;

use crate::math;

/// Surface type of one cell. Drives colour, column height and model id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Reflect)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    Water,
    Sand,
    Grass,
    Forest,
    Mountain,
    Snow,
}

/// Prefix shared by every tile model id.
pub const MODEL_PREFIX: &str = "hex-column/";

impl Terrain {
    pub const ALL: [Terrain; 6] = [
        Terrain::Water,
        Terrain::Sand,
        Terrain::Grass,
        Terrain::Forest,
        Terrain::Mountain,
        Terrain::Snow,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Terrain::Water => "water",
            Terrain::Sand => "sand",
            Terrain::Grass => "grass",
            Terrain::Forest => "forest",
            Terrain::Mountain => "mountain",
            Terrain::Snow => "snow",
        }
    }

    pub fn color(self) -> Color {
        match self {
            Terrain::Water => Color::srgb(0.12, 0.35, 0.72),
            Terrain::Sand => Color::srgb(0.86, 0.78, 0.52),
            Terrain::Grass => Color::srgb(0.36, 0.66, 0.29),
            Terrain::Forest => Color::srgb(0.13, 0.42, 0.2),
            Terrain::Mountain => Color::srgb(0.48, 0.45, 0.43),
            Terrain::Snow => Color::srgb(0.93, 0.95, 0.98),
        }
    }

    /// Column height in tile sizes.
    pub fn column_height(self) -> f32 {
        match self {
            Terrain::Water => 0.1,
            Terrain::Sand => 0.2,
            Terrain::Grass => 0.3,
            Terrain::Forest => 0.45,
            Terrain::Mountain => 0.9,
            Terrain::Snow => 1.2,
        }
    }

    /// Model shared by every tile of this terrain.
    pub fn model_id(self) -> String {
        format!("{MODEL_PREFIX}{}", self.name())
    }

    pub fn from_model_id(model_id: &str) -> Option<Self> {
        model_id.strip_prefix(MODEL_PREFIX)?.parse().ok()
    }

    /// Elevation band lookup for a value in `[0, 1]`.
    pub fn from_elevation(e: f32) -> Self {
        match e {
            e if e < 0.3 => Terrain::Water,
            e if e < 0.38 => Terrain::Sand,
            e if e < 0.55 => Terrain::Grass,
            e if e < 0.7 => Terrain::Forest,
            e if e < 0.85 => Terrain::Mountain,
            _ => Terrain::Snow,
        }
    }
}

impl fmt::Display for Terrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Terrain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Terrain::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| format!("unknown terrain `{s}`"))
    }
}

/// One cell as delivered by a tile source.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TileRecord {
    pub q: i32,
    pub r: i32,
    pub terrain: Terrain,
}

impl TileRecord {
    pub fn hex(&self) -> Hex {
        Hex::new(self.q, self.r)
    }
}

/// Which tile set to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRequest {
    pub level: i32,
    pub radius: u32,
    /// Outer-level cell this level is nested in, if any.
    pub parent: Option<Hex>,
}

#[derive(Debug, thiserror::Error)]
#[cfg_attr(not(feature = "native"), allow(dead_code))]
pub enum TileFetchError {
    #[error("reading tile data from {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("decoding tile data from {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("no tiles for level {level} within radius {radius} in {}", path.display())]
    NoTiles {
        path: PathBuf,
        level: i32,
        radius: u32,
    },
}

/// Asynchronous tile provider. Runs on the async compute pool, never on the
/// frame thread.
pub trait TileSource: Send + Sync + 'static {
    fn fetch(&self, request: &TileRequest) -> Result<Vec<TileRecord>, TileFetchError>;
}

// ── Procedural ─────────────────────────────────────────────────────

/// Fractal-noise terrain, reproducible from `(seed, level, parent)`.
#[derive(Debug, Clone)]
pub struct ProceduralSource {
    pub seed: u32,
    pub octaves: usize,
    /// Spatial scale divisor for noise sampling, in tile units.
    pub scale: f64,
}

impl Default for ProceduralSource {
    fn default() -> Self {
        Self {
            seed: 42,
            octaves: 4,
            scale: 6.0,
        }
    }
}

impl ProceduralSource {
    fn level_seed(&self, request: &TileRequest) -> u32 {
        let (pq, pr) = request.parent.map_or((0, 0), |h| (h.x, h.y));
        self.seed
            .wrapping_add((request.level as u32).wrapping_mul(7919))
            .wrapping_add((pq as u32).wrapping_mul(104_729))
            .wrapping_add((pr as u32).wrapping_mul(1_299_709))
            .wrapping_add(u32::from(request.parent.is_some()))
    }
}

impl TileSource for ProceduralSource {
    fn fetch(&self, request: &TileRequest) -> Result<Vec<TileRecord>, TileFetchError> {
        let fbm: Fbm<Perlin> = Fbm::new(self.level_seed(request)).set_octaves(self.octaves);
        Ok(shapes::hexagon(Hex::ZERO, request.radius)
            .map(|hex| {
                let p = math::axial_to_world(hex, 1.0);
                let n = fbm.get([p.x as f64 / self.scale, p.y as f64 / self.scale]);
                let e = ((n as f32 + 1.0) / 2.0).clamp(0.0, 1.0);
                TileRecord {
                    q: hex.x,
                    r: hex.y,
                    terrain: Terrain::from_elevation(e),
                }
            })
            .collect())
    }
}

// ── Directory ──────────────────────────────────────────────────────

/// JSON tile sets on disk: `level{L}.json` for a root level,
/// `level{L}_{q}_{r}.json` for a level nested in cell `(q, r)`.
///
/// Records outside `radius` are dropped; a file left with none is an error.
#[derive(Debug, Clone)]
#[cfg_attr(not(feature = "native"), allow(dead_code))]
pub struct DirectorySource {
    pub root: PathBuf,
}

#[cfg_attr(not(feature = "native"), allow(dead_code))]
impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, request: &TileRequest) -> PathBuf {
        let name = match request.parent {
            None => format!("level{}.json", request.level),
            Some(p) => format!("level{}_{}_{}.json", request.level, p.x, p.y),
        };
        self.root.join(name)
    }
}

impl TileSource for DirectorySource {
    fn fetch(&self, request: &TileRequest) -> Result<Vec<TileRecord>, TileFetchError> {
        let path = self.path_for(request);
        let data = std::fs::read_to_string(&path).map_err(|source| TileFetchError::Io {
            path: path.clone(),
            source,
        })?;
        let records: Vec<TileRecord> =
            serde_json::from_str(&data).map_err(|source| TileFetchError::Json {
                path: path.clone(),
                source,
            })?;
        let records: Vec<TileRecord> = records
            .into_iter()
            .filter(|r| math::hex_distance(Hex::ZERO, r.hex()) <= request.radius)
            .collect();
        if records.is_empty() {
            return Err(TileFetchError::NoTiles {
                path,
                level: request.level,
                radius: request.radius,
            });
        }
        Ok(records)
    }
}
