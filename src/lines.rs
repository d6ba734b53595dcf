//! Line primitive seam and its CPU buffer implementation.
use std::ops::Range;

use crate::{colors::Rgba, hit_test::ViewTransform};

/// Values of a line attribute, either one per line or one per line vertex.
#[derive(Debug, Clone, PartialEq)]
pub enum LineValues {
    PerLine(Vec<f32>),
    PerPoint(Vec<Vec<f32>>),
}

impl LineValues {
    fn get(&self, line: usize, point: usize) -> Option<f32> {
        match self {
            LineValues::PerLine(values) => values.get(line).copied(),
            LineValues::PerPoint(values) => values.get(line)?.get(point).copied(),
        }
    }
}

/// Optional per line attributes. Missing attributes use the style.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LineAttributes {
    pub color_indices: Option<LineValues>,
    pub opacities: Option<LineValues>,
    pub widths: Option<LineValues>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    /// Palette indexed by the color indices.
    pub colors: Vec<Rgba>,
    pub opacity: f32,
    pub width: f32,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            colors: vec![Rgba::WHITE],
            opacity: 1.0,
            width: 1.0,
        }
    }
}

/// Vertex data of a set of lines.
///
/// Every line of `n` points occupies `2 * n + 4` vertex slots: each point is
/// doubled and both end points are repeated once more as caps. The slots of
/// line `i` therefore start at `4 * i + 2 * (points of all previous lines)`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LineData {
    pub lines: Vec<Vec<f32>>,
    pub color_indices: Vec<f32>,
    pub opacities: Vec<f32>,
    pub widths: Vec<f32>,
}

impl LineData {
    pub fn num_vertices(&self) -> usize {
        self.opacities.len()
    }
}

/// A GPU line primitive.
pub trait LinePrimitive {
    /// Replaces the lines. Each entry holds the flat `x, y` coordinates of
    /// one line.
    fn set_points(&mut self, lines: Vec<Vec<f32>>, attributes: LineAttributes);
    fn set_style(&mut self, style: LineStyle);
    fn style(&self) -> &LineStyle;
    fn data(&self) -> &LineData;

    /// Mutable access to the vertex opacities. Changes become visible after
    /// [`LinePrimitive::upload_opacities`].
    fn opacities_mut(&mut self) -> &mut [f32];
    fn upload_opacities(&mut self, range: Range<usize>);

    fn draw(&mut self, transform: &ViewTransform);
    fn clear(&mut self);
    fn destroy(&mut self);

    fn is_empty(&self) -> bool {
        self.data().lines.is_empty()
    }
}

/// CPU backed [`LinePrimitive`] keeping the vertex data and the uploads.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LineBuffers {
    style: LineStyle,
    data: LineData,
    uploads: Vec<Range<usize>>,
    draw_calls: usize,
    destroyed: bool,
}

impl LineBuffers {
    pub fn new(style: LineStyle) -> Self {
        Self {
            style,
            ..Default::default()
        }
    }

    /// Ranges passed to [`LinePrimitive::upload_opacities`] since the last
    /// call to [`LinePrimitive::set_points`].
    pub fn uploads(&self) -> &[Range<usize>] {
        &self.uploads
    }

    pub fn draw_calls(&self) -> usize {
        self.draw_calls
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl LinePrimitive for LineBuffers {
    fn set_points(&mut self, lines: Vec<Vec<f32>>, attributes: LineAttributes) {
        let mut data = LineData::default();

        for (line_idx, line) in lines.iter().enumerate() {
            let num_points = line.len() / 2;
            if num_points == 0 {
                continue;
            }

            let value = |values: &Option<LineValues>, point: usize, default: f32| {
                values
                    .as_ref()
                    .and_then(|v| v.get(line_idx, point))
                    .unwrap_or(default)
            };

            let slots = [0, 0]
                .into_iter()
                .chain((0..num_points).flat_map(|p| [p, p]))
                .chain([num_points - 1; 2]);

            for point in slots {
                data.color_indices
                    .push(value(&attributes.color_indices, point, 0.0));
                data.opacities
                    .push(value(&attributes.opacities, point, self.style.opacity));
                data.widths.push(value(&attributes.widths, point, self.style.width));
            }
        }

        data.lines = lines;
        self.data = data;
        self.uploads.clear();
    }

    fn set_style(&mut self, style: LineStyle) {
        self.style = style;
    }

    fn style(&self) -> &LineStyle {
        &self.style
    }

    fn data(&self) -> &LineData {
        &self.data
    }

    fn opacities_mut(&mut self) -> &mut [f32] {
        &mut self.data.opacities
    }

    fn upload_opacities(&mut self, range: Range<usize>) {
        self.uploads.push(range);
    }

    fn draw(&mut self, _transform: &ViewTransform) {
        if !self.data.lines.is_empty() {
            self.draw_calls += 1;
        }
    }

    fn clear(&mut self) {
        self.data = LineData::default();
        self.uploads.clear();
    }

    fn destroy(&mut self) {
        self.clear();
        self.destroyed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout() {
        let mut lines = LineBuffers::new(LineStyle {
            opacity: 0.5,
            ..Default::default()
        });
        lines.set_points(
            vec![vec![0.0, 0.0, 1.0, 1.0], vec![0.0, 1.0, 1.0, 0.0, 2.0, 2.0]],
            LineAttributes {
                opacities: Some(LineValues::PerPoint(vec![
                    vec![0.1, 0.2],
                    vec![0.3, 0.4, 0.6],
                ])),
                ..Default::default()
            },
        );

        let data = lines.data();
        assert_eq!(data.num_vertices(), (2 * 2 + 4) + (2 * 3 + 4));
        assert_eq!(&data.opacities[..8], &[0.1, 0.1, 0.1, 0.1, 0.2, 0.2, 0.2, 0.2]);
        assert_eq!(
            &data.opacities[8..],
            &[0.3, 0.3, 0.3, 0.3, 0.4, 0.4, 0.6, 0.6, 0.6, 0.6]
        );
        assert!(data.widths.iter().all(|&w| w == 1.0));
        assert!(data.color_indices.iter().all(|&c| c == 0.0));
    }

    #[test]
    fn test_style_defaults_and_clear() {
        let mut lines = LineBuffers::new(LineStyle {
            opacity: 0.25,
            ..Default::default()
        });
        lines.set_points(vec![vec![0.0, 0.0, 1.0, 0.0]], LineAttributes::default());
        assert!(lines.data().opacities.iter().all(|&o| o == 0.25));
        assert!(!lines.is_empty());

        lines.clear();
        assert!(lines.is_empty());
        lines.destroy();
        assert!(lines.is_destroyed());
    }
}
