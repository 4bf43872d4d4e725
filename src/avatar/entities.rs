use bevy::prelude::*;
use hexx::Hex;

use crate::math;

/// The player's marker on the map.
#[derive(Component, Debug, Reflect)]
pub struct Avatar {
    /// Cell the avatar stands on.
    pub cell: Hex,
    /// World point the avatar glides toward.
    pub target: Vec3,
}

impl Avatar {
    /// Moves to `to` when it is strictly closer than `range` cells.
    pub fn try_move(&mut self, to: Hex, range: u32) -> bool {
        if math::hex_distance(self.cell, to) >= range {
            return false;
        }
        self.cell = to;
        true
    }
}

/// Steps `current` toward `target` at `speed` units per second, landing
/// exactly on it instead of overshooting.
pub fn glide(current: Vec3, target: Vec3, speed: f32, dt: f32) -> Vec3 {
    let to_go = target - current;
    let step = speed * dt;
    if to_go.length() <= step {
        target
    } else {
        current + to_go.normalize() * step
    }
}
