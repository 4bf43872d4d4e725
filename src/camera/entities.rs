use bevy::prelude::*;
use hexx::Hex;

use crate::math;

/// Marker for the map camera entity.
#[derive(Component, Reflect)]
pub struct MapCamera;

/// Pitch-fixed map camera: looks 45° down along `-z`, at the ground point
/// `(x, 0, z - y)`.
///
/// User pans stay inside `x ∈ [-map, map]`, `z ∈ [0, 3·map]` and zoom keeps
/// `y` strictly inside `(2·tile, 4·map)`.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct CameraRig {
    pub position: Vec3,
    tile_size: f32,
    map_size: f32,
}

impl CameraRig {
    /// Creates a rig at the default framing of the level origin.
    pub fn new(tile_size: f32, map_size: f32) -> Self {
        let mut rig = Self {
            position: Vec3::ZERO,
            tile_size,
            map_size: map_size.max(tile_size),
        };
        rig.position = rig.framing(Hex::ZERO);
        rig
    }

    pub fn forward() -> Vec3 {
        Vec3::new(0.0, -1.0, -1.0).normalize()
    }

    pub fn min_height(&self) -> f32 {
        2.0 * self.tile_size
    }

    pub fn max_height(&self) -> f32 {
        4.0 * self.map_size
    }

    pub fn look_target(&self) -> Vec3 {
        Self::target_from(self.position)
    }

    fn target_from(position: Vec3) -> Vec3 {
        Vec3::new(position.x, 0.0, position.z - position.y)
    }

    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.position).looking_at(self.look_target(), Vec3::Y)
    }

    fn clamp_pan(&self, p: Vec3) -> Vec3 {
        Vec3::new(
            p.x.clamp(-self.map_size, self.map_size),
            p.y,
            p.z.clamp(0.0, 3.0 * self.map_size),
        )
    }

    /// Default framing: the whole level in view, looking at `focus`.
    pub fn framing(&self, focus: Hex) -> Vec3 {
        let ground = math::axial_to_ground(focus, self.tile_size);
        let height = self.map_size.max(3.0 * self.tile_size);
        self.clamp_pan(Vec3::new(ground.x, height, ground.z + height))
    }

    /// Close-up above `over`, `factor` tile sizes high. Only reached while
    /// input is locked, so it is not held to the pan bounds.
    pub fn hover(&self, over: Hex, factor: f32) -> Vec3 {
        let ground = math::axial_to_ground(over, self.tile_size);
        let height = (factor * self.tile_size).max(self.min_height());
        Vec3::new(ground.x, height, ground.z + height)
    }

    /// Drags the map by a pointer delta in pixels. Faster when higher up.
    pub fn pan(&mut self, delta_px: Vec2, sensitivity: f32) {
        let scale = sensitivity * self.position.y;
        let moved = self.position + Vec3::new(-delta_px.x * scale, 0.0, -delta_px.y * scale);
        self.position = self.clamp_pan(moved);
    }

    /// Moves along the view direction; positive `amount` zooms in.
    ///
    /// Returns `false`, leaving the camera untouched, when the step would
    /// leave the height range.
    pub fn zoom(&mut self, amount: f32) -> bool {
        let next = self.position + Self::forward() * amount;
        if next.y <= self.min_height() || next.y >= self.max_height() {
            return false;
        }
        self.position = self.clamp_pan(next);
        true
    }

    /// Ray through a normalized device coordinate.
    pub fn ray(&self, ndc: Vec2, fov_y: f32, aspect: f32) -> (Vec3, Vec3) {
        let forward = (self.look_target() - self.position).normalize();
        let right = forward.cross(Vec3::Y).normalize();
        let up = right.cross(forward);
        let half = (fov_y / 2.0).tan();
        let dir = forward + right * (ndc.x * half * aspect) + up * (ndc.y * half);
        (self.position, dir.normalize())
    }

    /// Picks the tile under a window cursor position.
    ///
    /// `None` is a pick miss: the ray leaves the ground, or no tile centre is
    /// within one tile size of the hit point.
    pub fn pick<I>(
        &self,
        cursor: Vec2,
        viewport: Vec2,
        fov_y: f32,
        tiles: I,
    ) -> Option<(Hex, Vec3)>
    where
        I: IntoIterator<Item = (Hex, Vec3)>,
    {
        if viewport.x <= 0.0 || viewport.y <= 0.0 {
            return None;
        }
        let ndc = math::screen_to_ndc(cursor, viewport);
        let (origin, dir) = self.ray(ndc, fov_y, viewport.x / viewport.y);
        let hit = math::ray_ground_intersection(origin, dir)?;

        let tiles: Vec<(Hex, Vec3)> = tiles.into_iter().collect();
        let (i, d) = math::nearest_on_ground(hit, tiles.iter().map(|&(_, p)| p))?;
        (d <= self.tile_size).then(|| (tiles[i].0, hit))
    }
}

/// Eased camera move toward a fixed target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTween {
    from: Vec3,
    to: Vec3,
    duration: f32,
    elapsed: f32,
}

impl CameraTween {
    pub fn new(from: Vec3, to: Vec3, duration: f32) -> Self {
        Self {
            from,
            to,
            duration: duration.max(0.0),
            elapsed: 0.0,
        }
    }

    /// Steps the tween and returns the interpolated position.
    pub fn advance(&mut self, dt: f32) -> Vec3 {
        self.elapsed = (self.elapsed + dt).min(self.duration);
        if self.duration <= 0.0 {
            return self.to;
        }
        let t = math::ease_in_out_cubic(self.elapsed / self.duration);
        self.from.lerp(self.to, t)
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// In-flight navigation move of the camera; `CameraArrived` is reported when
/// it ends.
#[derive(Component, Debug)]
pub struct CameraFlight(pub CameraTween);

/// What a pointer release amounted to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Click(Vec2),
    /// Released after a drag.
    DragEnd,
}

/// Splits press → move → release into drags and clicks.
///
/// Movement beyond `threshold` pixels from the press point turns the press
/// into a drag for the rest of the gesture.
#[derive(Resource, Debug, Default)]
pub struct PointerGesture {
    pressed_at: Option<Vec2>,
    last: Vec2,
    dragging: bool,
}

impl PointerGesture {
    pub fn press(&mut self, at: Vec2) {
        self.pressed_at = Some(at);
        self.last = at;
        self.dragging = false;
    }

    /// Returns the pan delta since the previous move while dragging.
    pub fn motion(&mut self, at: Vec2, threshold: f32) -> Option<Vec2> {
        let pressed_at = self.pressed_at?;
        if !self.dragging && at.distance(pressed_at) > threshold {
            self.dragging = true;
        }
        let delta = at - self.last;
        self.last = at;
        self.dragging.then_some(delta)
    }

    pub fn release(&mut self, at: Vec2, threshold: f32) -> Option<Gesture> {
        let pressed_at = self.pressed_at.take()?;
        let dragged = self.dragging || at.distance(pressed_at) > threshold;
        self.dragging = false;
        Some(if dragged {
            Gesture::DragEnd
        } else {
            Gesture::Click(at)
        })
    }

    #[cfg(test)]
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }
}

/// Ground point of the most recent pick, for the debug gizmos.
#[derive(Resource, Debug, Default)]
pub struct LastPick(pub Option<Vec3>);

#[cfg(test)]
mod tests {
    use super::*;
    use hexx::shapes;

    const TILE: f32 = 1.0;
    const MAP: f32 = 4.0;
    const FOV: f32 = std::f32::consts::FRAC_PI_4;
    const VIEW: Vec2 = Vec2::new(800.0, 600.0);

    fn rig() -> CameraRig {
        CameraRig::new(TILE, MAP)
    }

    fn grid() -> Vec<(Hex, Vec3)> {
        shapes::hexagon(Hex::ZERO, 2)
            .map(|h| (h, math::axial_to_ground(h, TILE)))
            .collect()
    }

    // ── CameraRig ───────────────────────────────────────────────────

    #[test]
    fn default_framing_looks_at_origin() {
        let rig = rig();
        assert!(rig.look_target().length() < 1e-5);
        assert!(rig.position.y > rig.min_height() && rig.position.y < rig.max_height());
    }

    #[test]
    fn look_target_is_one_height_ahead() {
        let mut rig = rig();
        rig.position = Vec3::new(1.0, 5.0, 7.0);
        assert_eq!(rig.look_target(), Vec3::new(1.0, 0.0, 2.0));
    }

    #[test]
    fn pan_is_clamped_to_map() {
        let mut rig = rig();
        rig.pan(Vec2::new(-1.0e6, -1.0e6), 0.01);
        assert_eq!(rig.position.x, MAP);
        assert_eq!(rig.position.z, 3.0 * MAP);
        rig.pan(Vec2::new(1.0e6, 1.0e6), 0.01);
        assert_eq!(rig.position.x, -MAP);
        assert_eq!(rig.position.z, 0.0);
    }

    #[test]
    fn pan_scales_with_height() {
        let mut low = rig();
        low.position = Vec3::new(0.0, 4.0, 4.0);
        let mut high = low.clone();
        high.position.y = 8.0;
        low.pan(Vec2::new(-10.0, 0.0), 0.01);
        high.pan(Vec2::new(-10.0, 0.0), 0.01);
        assert!((high.position.x - 2.0 * low.position.x).abs() < 1e-5);
    }

    #[test]
    fn zoom_moves_along_view_direction() {
        let mut rig = rig();
        rig.position = Vec3::new(0.0, 8.0, 8.0);
        let target = rig.look_target();
        assert!(rig.zoom(1.0));
        assert!(rig.position.y < 8.0);
        assert!((rig.look_target() - target).length() < 1e-5);
    }

    #[test]
    fn zoom_past_limits_is_rejected_unchanged() {
        let mut rig = rig();
        rig.position = Vec3::new(0.0, 2.5, 6.0);
        let before = rig.position;
        assert!(!rig.zoom(1.0));
        assert_eq!(rig.position, before);

        rig.position = Vec3::new(0.0, 15.5, 6.0);
        assert!(!rig.zoom(-1.0));
        assert_eq!(rig.position.y, 15.5);
    }

    #[test]
    fn hover_sits_above_tile() {
        let rig = rig();
        let p = rig.hover(Hex::new(1, 0), 3.0);
        let ground = math::axial_to_ground(Hex::new(1, 0), TILE);
        assert!((p.y - 3.0).abs() < 1e-6);
        assert!((CameraRig::target_from(p) - ground).length() < 1e-5);
    }

    // ── Picking ─────────────────────────────────────────────────────

    #[test]
    fn center_click_hits_look_target() {
        let rig = rig();
        let (hex, hit) = rig.pick(VIEW / 2.0, VIEW, FOV, grid()).unwrap();
        assert_eq!(hex, Hex::ZERO);
        assert!((hit - rig.look_target()).length() < 1e-4);
    }

    #[test]
    fn click_on_neighbor_picks_neighbor() {
        let mut rig = rig();
        let target = math::axial_to_ground(Hex::new(1, 0), TILE);
        rig.position = Vec3::new(target.x, 4.0, target.z + 4.0);
        let (hex, _) = rig.pick(VIEW / 2.0, VIEW, FOV, grid()).unwrap();
        assert_eq!(hex, Hex::new(1, 0));
    }

    #[test]
    fn screen_right_maps_to_world_right() {
        let rig = rig();
        let (_, hit) = rig.pick(Vec2::new(500.0, 300.0), VIEW, FOV, grid()).unwrap();
        assert!(hit.x > 0.0);
    }

    #[test]
    fn click_off_the_grid_is_a_miss() {
        let mut rig = rig();
        rig.position = Vec3::new(MAP, 4.0, 3.0 * MAP);
        assert!(rig.pick(VIEW / 2.0, VIEW, FOV, grid()).is_none());
        assert!(rig.pick(VIEW / 2.0, VIEW, FOV, Vec::new()).is_none());
    }

    #[test]
    fn click_above_horizon_is_a_miss() {
        let rig = rig();
        assert!(rig.pick(Vec2::new(400.0, -5000.0), VIEW, FOV, grid()).is_none());
    }

    // ── CameraTween ─────────────────────────────────────────────────

    #[test]
    fn tween_reaches_target_exactly() {
        let mut tween = CameraTween::new(Vec3::ZERO, Vec3::new(2.0, 4.0, 6.0), 1.0);
        let mid = tween.advance(0.5);
        assert!((mid - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-5);
        assert!(!tween.is_finished());
        assert_eq!(tween.advance(0.75), Vec3::new(2.0, 4.0, 6.0));
        assert!(tween.is_finished());
    }

    // ── PointerGesture ──────────────────────────────────────────────

    #[test]
    fn small_wiggle_is_still_a_click() {
        let mut g = PointerGesture::default();
        g.press(Vec2::new(100.0, 100.0));
        assert_eq!(g.motion(Vec2::new(102.0, 101.0), 5.0), None);
        assert_eq!(
            g.release(Vec2::new(102.0, 101.0), 5.0),
            Some(Gesture::Click(Vec2::new(102.0, 101.0)))
        );
    }

    #[test]
    fn moving_past_threshold_drags() {
        let mut g = PointerGesture::default();
        g.press(Vec2::new(100.0, 100.0));
        assert_eq!(
            g.motion(Vec2::new(110.0, 100.0), 5.0),
            Some(Vec2::new(10.0, 0.0))
        );
        assert_eq!(
            g.motion(Vec2::new(101.0, 100.0), 5.0),
            Some(Vec2::new(-9.0, 0.0))
        );
        assert!(g.is_dragging());
        assert_eq!(
            g.release(Vec2::new(101.0, 100.0), 5.0),
            Some(Gesture::DragEnd)
        );
        assert!(!g.is_dragging());
    }

    #[test]
    fn motion_without_press_is_ignored() {
        let mut g = PointerGesture::default();
        assert_eq!(g.motion(Vec2::new(50.0, 50.0), 5.0), None);
        assert_eq!(g.release(Vec2::new(50.0, 50.0), 5.0), None);
    }
}
