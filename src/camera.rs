//! Camera seam and the bundled 2D camera.
use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::constants::{DEFAULT_DISTANCE, DEFAULT_ROTATION};

/// A camera looking at the xy-plane.
///
/// Positions passed to [`Camera::pan`] and [`Camera::zoom`] are in camera
/// space, i.e. normalized device coordinates with the projection undone.
pub trait Camera {
    fn look_at(&mut self, target: Vec2, distance: f32, rotation: f32);
    fn set_view(&mut self, view: Mat4);

    fn view(&self) -> Mat4;
    fn target(&self) -> Vec2;
    fn distance(&self) -> f32;
    fn rotation(&self) -> f32;
    fn scaling(&self) -> f32;

    /// Applies pending changes and reports whether the view changed since
    /// the last tick.
    fn tick(&mut self) -> bool;

    /// A fixed camera ignores pan, zoom and rotate gestures.
    fn set_fixed(&mut self, fixed: bool);
    fn is_fixed(&self) -> bool;

    fn pan(&mut self, delta: Vec2);
    fn zoom(&mut self, factor: f32, anchor: Vec2);
    fn rotate(&mut self, angle: f32);
}

/// A target/distance/rotation camera.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera2d {
    target: Vec2,
    distance: f32,
    rotation: f32,
    min_distance: f32,
    max_distance: f32,
    fixed: bool,
    changed: bool,
}

impl Default for Camera2d {
    fn default() -> Self {
        Self::new(Vec2::ZERO, DEFAULT_DISTANCE, DEFAULT_ROTATION)
    }
}

impl Camera2d {
    pub fn new(target: Vec2, distance: f32, rotation: f32) -> Self {
        Self {
            target,
            distance,
            rotation,
            min_distance: 1e-6,
            max_distance: f32::INFINITY,
            fixed: false,
            changed: true,
        }
    }

    pub fn with_distance_limits(mut self, min: f32, max: f32) -> Self {
        self.min_distance = min;
        self.max_distance = max;
        self.distance = self.distance.clamp(min, max);
        self
    }

    fn rotation_matrix(&self) -> Mat4 {
        Mat4::from_rotation_z(self.rotation)
    }

    /// Converts a camera space offset into a world space offset.
    fn unproject_offset(&self, offset: Vec2) -> Vec2 {
        let rotated = self.rotation_matrix().inverse() * Vec4::new(offset.x, offset.y, 0.0, 0.0);
        Vec2::new(rotated.x, rotated.y) * self.distance
    }
}

impl Camera for Camera2d {
    fn look_at(&mut self, target: Vec2, distance: f32, rotation: f32) {
        self.target = target;
        self.distance = distance.clamp(self.min_distance, self.max_distance);
        self.rotation = rotation;
        self.changed = true;
    }

    fn set_view(&mut self, view: Mat4) {
        let scale = Vec2::new(view.x_axis.x, view.x_axis.y).length();
        if scale <= 0.0 || !scale.is_finite() {
            log::warn!("ignoring degenerate view matrix");
            return;
        }

        let rotation = view.x_axis.y.atan2(view.x_axis.x);
        let rotation_scale =
            Mat4::from_scale(Vec3::new(scale, scale, 1.0)) * Mat4::from_rotation_z(rotation);
        let translation = rotation_scale.inverse() * view.w_axis.truncate().extend(0.0);

        self.look_at(
            Vec2::new(-translation.x, -translation.y),
            1.0 / scale,
            rotation,
        );
    }

    fn view(&self) -> Mat4 {
        let scale = 1.0 / self.distance;
        Mat4::from_scale(Vec3::new(scale, scale, 1.0))
            * self.rotation_matrix()
            * Mat4::from_translation(Vec3::new(-self.target.x, -self.target.y, 0.0))
    }

    fn target(&self) -> Vec2 {
        self.target
    }

    fn distance(&self) -> f32 {
        self.distance
    }

    fn rotation(&self) -> f32 {
        self.rotation
    }

    fn scaling(&self) -> f32 {
        1.0 / self.distance
    }

    fn tick(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    fn set_fixed(&mut self, fixed: bool) {
        self.fixed = fixed;
    }

    fn is_fixed(&self) -> bool {
        self.fixed
    }

    fn pan(&mut self, delta: Vec2) {
        if self.fixed || delta == Vec2::ZERO {
            return;
        }
        self.target -= self.unproject_offset(delta);
        self.changed = true;
    }

    fn zoom(&mut self, factor: f32, anchor: Vec2) {
        if self.fixed || factor <= 0.0 || factor == 1.0 {
            return;
        }

        let anchor_world = self.target + self.unproject_offset(anchor);
        self.distance = (self.distance / factor).clamp(self.min_distance, self.max_distance);
        self.target = anchor_world - self.unproject_offset(anchor);
        self.changed = true;
    }

    fn rotate(&mut self, angle: f32) {
        if self.fixed || angle == 0.0 {
            return;
        }
        self.rotation += angle;
        self.changed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(view: Mat4, p: Vec2) -> Vec2 {
        let v = view * Vec4::new(p.x, p.y, 0.0, 1.0);
        Vec2::new(v.x, v.y)
    }

    #[test]
    fn test_target_maps_to_origin() {
        let camera = Camera2d::new(Vec2::new(2.0, -1.0), 0.5, 0.3);
        let mapped = apply(camera.view(), Vec2::new(2.0, -1.0));
        assert!(mapped.length() < 1e-5);
        assert_eq!(camera.scaling(), 2.0);
    }

    #[test]
    fn test_set_view_round_trip() {
        let source = Camera2d::new(Vec2::new(0.25, 4.0), 3.0, -0.7);
        let mut camera = Camera2d::default();
        camera.set_view(source.view());
        assert!((camera.target() - source.target()).length() < 1e-4);
        assert!((camera.distance() - 3.0).abs() < 1e-4);
        assert!((camera.rotation() + 0.7).abs() < 1e-4);
    }

    #[test]
    fn test_zoom_keeps_anchor() {
        let mut camera = Camera2d::new(Vec2::ZERO, 1.0, 0.4);
        let anchor = Vec2::new(0.5, 0.25);
        let world = apply(camera.view().inverse(), anchor);

        camera.zoom(2.0, anchor);
        assert_eq!(camera.distance(), 0.5);
        let moved = apply(camera.view(), world);
        assert!((moved - anchor).length() < 1e-5);
    }

    #[test]
    fn test_fixed_camera_ignores_gestures() {
        let mut camera = Camera2d::default();
        assert!(camera.tick());
        assert!(!camera.tick());

        camera.set_fixed(true);
        camera.pan(Vec2::new(1.0, 0.0));
        camera.zoom(2.0, Vec2::ZERO);
        camera.rotate(1.0);
        assert!(!camera.tick());

        camera.set_fixed(false);
        camera.pan(Vec2::new(1.0, 0.0));
        assert!(camera.tick());
        assert_eq!(camera.target(), Vec2::new(-1.0, 0.0));
    }
}
