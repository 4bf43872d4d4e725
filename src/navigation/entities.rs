use bevy::prelude::*;

use super::navigator::{Direction, LevelNavigator, NavSignal};
use crate::math;

/// The app-wide navigator.
#[derive(Resource, Debug, Deref, DerefMut)]
pub struct Navigator(pub LevelNavigator);

/// A user intent to change level. Validated by the navigator.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationRequest(pub Direction);

/// Eased alpha ramp over a fixed duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fade {
    from: f32,
    to: f32,
    duration: f32,
    elapsed: f32,
}

impl Fade {
    pub fn new(from: f32, to: f32, duration: f32) -> Self {
        Self {
            from,
            to,
            duration: duration.max(0.0),
            elapsed: 0.0,
        }
    }

    /// Steps the ramp and returns the current alpha.
    pub fn advance(&mut self, dt: f32) -> f32 {
        self.elapsed = (self.elapsed + dt).min(self.duration);
        self.alpha()
    }

    pub fn alpha(&self) -> f32 {
        if self.duration <= 0.0 {
            return self.to;
        }
        let t = math::ease_in_out_cubic(self.elapsed / self.duration);
        self.from + (self.to - self.from) * t
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// Full-screen quad parented to the camera, blended over the scene during
/// level transitions.
#[derive(Component, Debug, Default)]
pub struct FadeOverlay {
    pub(super) running: Option<(Fade, NavSignal)>,
    pub(super) alpha: f32,
}

impl FadeOverlay {
    /// Starts ramping from the current alpha to `to`; `done` is reported
    /// when the ramp ends.
    pub fn start(&mut self, to: f32, duration: f32, done: NavSignal) {
        self.running = Some((Fade::new(self.alpha, to, duration), done));
    }

    /// Advances the running ramp. Returns the completion signal on the frame
    /// it finishes.
    pub fn tick(&mut self, dt: f32) -> Option<NavSignal> {
        let (fade, done) = self.running.as_mut()?;
        self.alpha = fade.advance(dt);
        if !fade.is_finished() {
            return None;
        }
        let done = *done;
        self.running = None;
        Some(done)
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }
}
