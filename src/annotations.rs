//! Line based annotations drawn on top of the points.
use crate::{
    colors::{ColorQuery, Rgba},
    lines::{LineAttributes, LineStyle, LineValues},
};

/// Per annotation overrides of the annotation defaults.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AnnotationStyle {
    pub line_color: Option<ColorQuery<'static>>,
    pub line_width: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    /// Horizontal line at `y`, unbounded ends extend to the line limit.
    HLine {
        y: f32,
        x1: Option<f32>,
        x2: Option<f32>,
        style: AnnotationStyle,
    },
    /// Vertical line at `x`, unbounded ends extend to the line limit.
    VLine {
        x: f32,
        y1: Option<f32>,
        y2: Option<f32>,
        style: AnnotationStyle,
    },
    /// Rectangle given by two corners.
    Rect {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        style: AnnotationStyle,
    },
    /// Rectangle given by its origin and extent.
    DomRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        style: AnnotationStyle,
    },
    Polygon {
        vertices: Vec<[f32; 2]>,
        style: AnnotationStyle,
    },
}

impl Annotation {
    pub fn style(&self) -> &AnnotationStyle {
        match self {
            Annotation::HLine { style, .. }
            | Annotation::VLine { style, .. }
            | Annotation::Rect { style, .. }
            | Annotation::DomRect { style, .. }
            | Annotation::Polygon { style, .. } => style,
        }
    }

    /// Flat `x, y` coordinates of the annotation outline.
    pub fn vertices(&self, hvline_limit: f32) -> Vec<f32> {
        match *self {
            Annotation::HLine { y, x1, x2, .. } => {
                vec![x1.unwrap_or(-hvline_limit), y, x2.unwrap_or(hvline_limit), y]
            }
            Annotation::VLine { x, y1, y2, .. } => {
                vec![x, y1.unwrap_or(-hvline_limit), x, y2.unwrap_or(hvline_limit)]
            }
            Annotation::Rect { x1, y1, x2, y2, .. } => {
                vec![x1, y1, x2, y1, x2, y2, x1, y2, x1, y1]
            }
            Annotation::DomRect {
                x,
                y,
                width,
                height,
                ..
            } => vec![
                x,
                y,
                x + width,
                y,
                x + width,
                y + height,
                x,
                y + height,
                x,
                y,
            ],
            Annotation::Polygon { ref vertices, .. } => vertices.iter().flatten().copied().collect(),
        }
    }
}

/// Defaults applied to annotations without their own style.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotationDefaults {
    pub line_color: Rgba,
    pub line_width: f32,
    pub hvline_limit: f32,
}

/// Annotations converted to line primitive input.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AnnotationLines {
    pub lines: Vec<Vec<f32>>,
    /// Distinct colors in order of first use.
    pub palette: Vec<Rgba>,
    pub color_indices: Vec<f32>,
    pub widths: Vec<f32>,
}

impl AnnotationLines {
    pub fn build(annotations: &[Annotation], defaults: &AnnotationDefaults) -> Self {
        let mut out = Self::default();

        for annotation in annotations {
            let style = annotation.style();
            let color = match style.line_color.as_ref().map(ColorQuery::resolve) {
                Some(Ok(color)) => color,
                Some(Err(e)) => {
                    log::warn!("{e}, using the default annotation color");
                    defaults.line_color
                }
                None => defaults.line_color,
            };

            let color_idx = match out.palette.iter().position(|&c| c == color) {
                Some(idx) => idx,
                None => {
                    out.palette.push(color);
                    out.palette.len() - 1
                }
            };

            out.lines.push(annotation.vertices(defaults.hvline_limit));
            out.color_indices.push(color_idx as f32);
            out.widths.push(
                style
                    .line_width
                    .filter(|w| *w > 0.0)
                    .unwrap_or(defaults.line_width),
            );
        }

        out
    }

    pub fn style(&self, defaults: &AnnotationDefaults) -> LineStyle {
        LineStyle {
            colors: if self.palette.is_empty() {
                vec![defaults.line_color]
            } else {
                self.palette.clone()
            },
            opacity: 1.0,
            width: defaults.line_width,
        }
    }

    pub fn attributes(&self) -> LineAttributes {
        LineAttributes {
            color_indices: Some(LineValues::PerLine(self.color_indices.clone())),
            opacities: None,
            widths: Some(LineValues::PerLine(self.widths.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULTS: AnnotationDefaults = AnnotationDefaults {
        line_color: Rgba([1.0, 1.0, 1.0, 0.5]),
        line_width: 1.0,
        hvline_limit: 1000.0,
    };

    #[test]
    fn test_shapes() {
        let hline = Annotation::HLine {
            y: 0.5,
            x1: None,
            x2: Some(2.0),
            style: AnnotationStyle::default(),
        };
        assert_eq!(hline.vertices(1000.0), vec![-1000.0, 0.5, 2.0, 0.5]);

        let rect = Annotation::DomRect {
            x: 0.0,
            y: 0.0,
            width: 2.0,
            height: 1.0,
            style: AnnotationStyle::default(),
        };
        assert_eq!(
            rect.vertices(1000.0),
            vec![0.0, 0.0, 2.0, 0.0, 2.0, 1.0, 0.0, 1.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_palette_is_deduplicated() {
        let red = AnnotationStyle {
            line_color: Some("#ff0000".into()),
            line_width: Some(3.0),
        };
        let annotations = [
            Annotation::VLine {
                x: 0.0,
                y1: None,
                y2: None,
                style: red.clone(),
            },
            Annotation::Polygon {
                vertices: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
                style: AnnotationStyle::default(),
            },
            Annotation::Rect {
                x1: 0.0,
                y1: 0.0,
                x2: 1.0,
                y2: 1.0,
                style: red,
            },
        ];

        let lines = AnnotationLines::build(&annotations, &DEFAULTS);
        assert_eq!(lines.palette, vec![Rgba([1.0, 0.0, 0.0, 1.0]), DEFAULTS.line_color]);
        assert_eq!(lines.color_indices, vec![0.0, 1.0, 0.0]);
        assert_eq!(lines.widths, vec![3.0, 1.0, 3.0]);
        assert_eq!(lines.lines[1].len(), 6);
    }

    #[test]
    fn test_invalid_color_falls_back() {
        let annotations = [Annotation::HLine {
            y: 0.0,
            x1: None,
            x2: None,
            style: AnnotationStyle {
                line_color: Some("not a color".into()),
                line_width: None,
            },
        }];
        let lines = AnnotationLines::build(&annotations, &DEFAULTS);
        assert_eq!(lines.palette, vec![DEFAULTS.line_color]);
    }
}
