//! Resolution of screen space gestures to point indices.
use glam::{Mat4, Vec2, Vec4};

use crate::spatial::SpatialIndex;

/// The matrices mapping data space to normalized device coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub projection: Mat4,
    pub view: Mat4,
    pub model: Mat4,
}

impl ViewTransform {
    /// Projection compensating the canvas aspect ratio, model compensating
    /// the data aspect ratio.
    pub fn new(view: Mat4, canvas_aspect_ratio: f32, data_aspect_ratio: f32) -> Self {
        Self {
            projection: Mat4::from_scale(glam::Vec3::new(1.0 / canvas_aspect_ratio, 1.0, 1.0)),
            view,
            model: Mat4::from_scale(glam::Vec3::new(data_aspect_ratio, 1.0, 1.0)),
        }
    }

    pub fn model_view_projection(&self) -> Mat4 {
        self.projection * self.view * self.model
    }

    pub fn ndc_to_data(&self, ndc: Vec2) -> Vec2 {
        let p = self.model_view_projection().inverse() * Vec4::new(ndc.x, ndc.y, 0.0, 1.0);
        Vec2::new(p.x, p.y)
    }

    pub fn data_to_ndc(&self, data: Vec2) -> Vec2 {
        let p = self.model_view_projection() * Vec4::new(data.x, data.y, 0.0, 1.0);
        Vec2::new(p.x, p.y)
    }

    /// Undoes the projection only, mapping normalized device coordinates to
    /// camera space.
    pub fn ndc_to_camera(&self, ndc: Vec2) -> Vec2 {
        let p = self.projection.inverse() * Vec4::new(ndc.x, ndc.y, 0.0, 0.0);
        Vec2::new(p.x, p.y)
    }

    /// Data space corners `(bottom left, top right)` of the viewport.
    pub fn viewport_corners(&self) -> (Vec2, Vec2) {
        (
            self.ndc_to_data(Vec2::new(-1.0, -1.0)),
            self.ndc_to_data(Vec2::new(1.0, 1.0)),
        )
    }
}

/// Converts a canvas position in CSS pixels to normalized device coordinates.
pub fn pixel_to_ndc(position: Vec2, width: f32, height: f32) -> Vec2 {
    Vec2::new(-1.0 + position.x / width * 2.0, 1.0 - position.y / height * 2.0)
}

/// Converts normalized device coordinates to a canvas position in CSS pixels.
pub fn ndc_to_pixel(ndc: Vec2, width: f32, height: f32) -> Vec2 {
    Vec2::new((ndc.x + 1.0) / 2.0 * width, (1.0 - ndc.y) / 2.0 * height)
}

/// Finds the point closest to `position` that lies strictly within
/// `radius`. On ties the lowest index wins.
pub fn nearest_point(
    index: &dyn SpatialIndex,
    positions: impl Fn(usize) -> Option<[f32; 2]>,
    is_visible: impl Fn(usize) -> bool,
    position: Vec2,
    radius: f32,
) -> Option<usize> {
    let candidates = index.range(
        position.x - radius,
        position.y - radius,
        position.x + radius,
        position.y + radius,
    );

    let mut min_dist = radius;
    let mut nearest = None;
    for idx in candidates {
        if !is_visible(idx) {
            continue;
        }
        let Some([x, y]) = positions(idx) else {
            continue;
        };
        let dist = Vec2::new(x, y).distance(position);
        if dist < min_dist {
            min_dist = dist;
            nearest = Some(idx);
        }
    }

    nearest
}

/// Bounding box `[x_min, y_min, x_max, y_max]` of a polygon. Degenerate
/// boxes without area are rejected.
pub fn bounding_box(polygon: &[[f32; 2]]) -> Option<[f32; 4]> {
    let bbox = polygon.iter().fold(
        [f32::INFINITY, f32::INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY],
        |[x0, y0, x1, y1], &[x, y]| [x0.min(x), y0.min(y), x1.max(x), y1.max(y)],
    );

    let valid = bbox.iter().all(|v| v.is_finite()) && bbox[2] - bbox[0] > 0.0 && bbox[3] - bbox[1] > 0.0;
    valid.then_some(bbox)
}

/// Even-odd test of a point against a closed polygon.
pub fn point_in_polygon([x, y]: [f32; 2], polygon: &[[f32; 2]]) -> bool {
    let mut inside = false;
    let mut j = polygon.len().wrapping_sub(1);
    for i in 0..polygon.len() {
        let [xi, yi] = polygon[i];
        let [xj, yj] = polygon[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Indices of the visible points inside the polygon.
pub fn points_in_polygon(
    index: &dyn SpatialIndex,
    positions: impl Fn(usize) -> Option<[f32; 2]>,
    is_visible: impl Fn(usize) -> bool,
    polygon: &[[f32; 2]],
) -> Vec<usize> {
    let Some([x0, y0, x1, y1]) = bounding_box(polygon) else {
        return Vec::new();
    };

    index
        .range(x0, y0, x1, y1)
        .into_iter()
        .filter(|&idx| is_visible(idx))
        .filter(|&idx| positions(idx).map_or(false, |p| point_in_polygon(p, polygon)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::RTreeIndex;

    const POSITIONS: [[f32; 2]; 4] = [[0.0, 0.0], [0.1, 0.0], [0.5, 0.5], [-0.8, 0.9]];

    fn index() -> RTreeIndex {
        RTreeIndex::new(POSITIONS.to_vec())
    }

    fn position(idx: usize) -> Option<[f32; 2]> {
        POSITIONS.get(idx).copied()
    }

    #[test]
    fn test_nearest_point() {
        let index = index();
        let hit = nearest_point(&index, position, |_| true, Vec2::new(0.04, 0.0), 0.2);
        assert_eq!(hit, Some(0));
        let hit = nearest_point(&index, position, |i| i != 0, Vec2::new(0.04, 0.0), 0.2);
        assert_eq!(hit, Some(1));
        let miss = nearest_point(&index, position, |_| true, Vec2::new(0.3, -0.3), 0.1);
        assert_eq!(miss, None);

        // Points exactly on the radius are not hit.
        let edge = nearest_point(&index, position, |_| true, Vec2::new(0.0, -0.5), 0.5);
        assert_eq!(edge, None);
    }

    #[test]
    fn test_points_in_polygon() {
        let index = index();
        let triangle = [[-0.3, -0.2], [0.7, -0.2], [0.7, 0.8]];
        let mut found = points_in_polygon(&index, position, |_| true, &triangle);
        found.sort_unstable();
        assert_eq!(found, vec![0, 1, 2]);

        let square = [[0.05, -0.1], [0.2, -0.1], [0.2, 0.1], [0.05, 0.1]];
        assert_eq!(points_in_polygon(&index, position, |_| true, &square), vec![1]);
    }

    #[test]
    fn test_degenerate_polygons() {
        let index = index();
        assert!(points_in_polygon(&index, position, |_| true, &[]).is_empty());
        let line = [[0.0, 0.0], [1.0, 0.0], [0.5, 0.0]];
        assert_eq!(bounding_box(&line), None);
        assert!(points_in_polygon(&index, position, |_| true, &line).is_empty());
    }

    #[test]
    fn test_transform_round_trip() {
        let transform = ViewTransform::new(Mat4::from_scale(glam::Vec3::new(2.0, 2.0, 1.0)), 2.0, 1.0);
        let data = Vec2::new(0.25, -0.1);
        let back = transform.ndc_to_data(transform.data_to_ndc(data));
        assert!((back - data).length() < 1e-6);

        let ndc = pixel_to_ndc(Vec2::new(50.0, 25.0), 100.0, 100.0);
        assert_eq!(ndc, Vec2::new(0.0, 0.5));
        assert_eq!(ndc_to_pixel(ndc, 100.0, 100.0), Vec2::new(50.0, 25.0));
    }
}
