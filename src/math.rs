//! Pure computation helpers extracted for testability.
//!
//! All functions in this module are free of Bevy ECS dependencies and operate
//! on plain numeric / `Vec2` / `Vec3` inputs. Hex projection lives here and
//! nowhere else: every system that places or picks a tile goes through
//! [`axial_to_world`].

use bevy::prelude::{Vec2, Vec3};
use hexx::Hex;

/// `sqrt(3)`, the row pitch factor of a flat-topped hex layout.
pub const SQRT_3: f32 = 1.732_050_8;

// ── Hex coordinates ────────────────────────────────────────────────

/// Projects an axial coordinate (`q = hex.x`, `r = hex.y`) onto the ground plane.
///
/// Flat-topped layout: `x = 1.5·size·q`, `z = √3·size·(r + q/2)`.
/// The returned `Vec2` holds `(x, z)`.
pub fn axial_to_world(hex: Hex, tile_size: f32) -> Vec2 {
    let q = hex.x as f32;
    let r = hex.y as f32;
    Vec2::new(1.5 * tile_size * q, SQRT_3 * tile_size * (r + q / 2.0))
}

/// [`axial_to_world`] lifted onto the `y = 0` ground plane.
pub fn axial_to_ground(hex: Hex, tile_size: f32) -> Vec3 {
    let xz = axial_to_world(hex, tile_size);
    Vec3::new(xz.x, 0.0, xz.y)
}

/// Hex grid distance: `max(|Δq|, |Δr|, |Δq + Δr|)`.
pub fn hex_distance(a: Hex, b: Hex) -> u32 {
    let dq = a.x - b.x;
    let dr = a.y - b.y;
    dq.unsigned_abs()
        .max(dr.unsigned_abs())
        .max((dq + dr).unsigned_abs())
}

/// Axis-aligned ground-plane extent of a set of tiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
}

impl Bounds {
    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_z + self.max_z) / 2.0,
        )
    }
}

/// Bounding box covering every hex in `coords`, including the hexes' own
/// footprint (corner radius `tile_size` along x, half row pitch along z).
///
/// Returns `None` for an empty set.
pub fn bounding_box<I>(coords: I, tile_size: f32) -> Option<Bounds>
where
    I: IntoIterator<Item = Hex>,
{
    let half_pitch = SQRT_3 * tile_size / 2.0;
    coords.into_iter().fold(None, |acc, hex| {
        let c = axial_to_world(hex, tile_size);
        let cell = Bounds {
            min_x: c.x - tile_size,
            max_x: c.x + tile_size,
            min_z: c.y - half_pitch,
            max_z: c.y + half_pitch,
        };
        Some(match acc {
            None => cell,
            Some(b) => Bounds {
                min_x: b.min_x.min(cell.min_x),
                max_x: b.max_x.max(cell.max_x),
                min_z: b.min_z.min(cell.min_z),
                max_z: b.max_z.max(cell.max_z),
            },
        })
    })
}

/// Index of the position in `candidates` nearest to `point` on the ground plane.
///
/// Linear scan; ties resolve to the first candidate.
pub fn nearest_on_ground<I>(point: Vec3, candidates: I) -> Option<(usize, f32)>
where
    I: IntoIterator<Item = Vec3>,
{
    let target = Vec2::new(point.x, point.z);
    candidates
        .into_iter()
        .enumerate()
        .map(|(i, p)| (i, Vec2::new(p.x, p.z).distance(target)))
        .fold(None, |best, (i, d)| match best {
            Some((_, bd)) if bd <= d => best,
            _ => Some((i, d)),
        })
}

// ── Easing ─────────────────────────────────────────────────────────

/// Cubic ease-in-out: slow at both ends, symmetric around `t = 0.5`.
pub fn ease_in_out_cubic(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

// ── Screen / ray ───────────────────────────────────────────────────

/// Converts a window-space cursor position (origin top-left, y down) into
/// normalized device coordinates (`[-1, 1]`, y up).
pub fn screen_to_ndc(cursor: Vec2, viewport: Vec2) -> Vec2 {
    Vec2::new(
        cursor.x / viewport.x * 2.0 - 1.0,
        1.0 - cursor.y / viewport.y * 2.0,
    )
}

/// Intersects a ray with the `y = 0` ground plane.
///
/// Returns `None` when the ray is parallel to the plane or points away from it.
pub fn ray_ground_intersection(origin: Vec3, direction: Vec3) -> Option<Vec3> {
    if direction.y.abs() < 1e-6 {
        return None;
    }
    let t = -origin.y / direction.y;
    if t < 0.0 {
        return None;
    }
    Some(origin + direction * t)
}
