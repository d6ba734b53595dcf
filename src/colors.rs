use std::borrow::Cow;

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::error::{PlotError, Result};

/// An sRGB color with alpha, every component in the range [0, 1].
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd)]
pub struct Rgba(pub [f32; 4]);

impl Rgba {
    pub const BLACK: Self = Self([0.0, 0.0, 0.0, 1.0]);
    pub const WHITE: Self = Self([1.0, 1.0, 1.0, 1.0]);

    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self([r, g, b, a])
    }

    pub fn alpha(self) -> f32 {
        self.0[3]
    }

    /// Returns the same color with its alpha replaced by one.
    pub fn opaque(self) -> Self {
        self.with_alpha(1.0)
    }

    pub fn with_alpha(self, alpha: f32) -> Self {
        let [r, g, b, _] = self.0;
        Self([r, g, b, alpha])
    }

    pub fn to_f32_with_alpha(self) -> [f32; 4] {
        self.0
    }

    fn from_bytes([r, g, b]: [u8; 3], alpha: f32) -> Self {
        Self([
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            alpha,
        ])
    }
}

/// A color query.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum ColorQuery<'a> {
    /// A CSS color name like `"steelblue"`.
    Named(Cow<'a, str>),
    /// Any CSS string accepted by [`ColorQuery::resolve`], e.g. `"#ff0000"`
    /// or `"rgba(255, 0, 0, 0.5)"`.
    Css(Cow<'a, str>),
    /// 8-bit components with an optional alpha in [0, 1].
    Bytes([u8; 3], Option<f32>),
    /// Normalized components.
    Float([f32; 4]),
}

impl From<Rgba> for ColorQuery<'static> {
    fn from(value: Rgba) -> Self {
        ColorQuery::Float(value.0)
    }
}

impl From<&'static str> for ColorQuery<'static> {
    fn from(value: &'static str) -> Self {
        ColorQuery::Css(Cow::Borrowed(value))
    }
}

impl ColorQuery<'_> {
    /// Resolves the query to a color.
    pub fn resolve(&self) -> Result<Rgba> {
        match self {
            ColorQuery::Named(name) => {
                Self::resolve_named(name).ok_or_else(|| PlotError::InvalidColor(name.to_string()))
            }
            ColorQuery::Css(css) => Self::resolve_css(css),
            ColorQuery::Bytes(values, alpha) => {
                let alpha = alpha.unwrap_or(1.0);
                if !(0.0..=1.0).contains(&alpha) {
                    return Err(PlotError::InvalidColor(format!("{self:?}")));
                }
                Ok(Rgba::from_bytes(*values, alpha))
            }
            ColorQuery::Float(values) => {
                if values.iter().all(|v| (0.0..=1.0).contains(v)) {
                    Ok(Rgba(*values))
                } else {
                    Err(PlotError::InvalidColor(format!("{values:?}")))
                }
            }
        }
    }

    fn resolve_named(name: &str) -> Option<Rgba> {
        let name = name.trim().to_ascii_lowercase();
        NAMED_COLORS
            .binary_search_by(|(key, _)| key.cmp(&name.as_str()))
            .ok()
            .map(|idx| Rgba::from_bytes(NAMED_COLORS[idx].1, 1.0))
    }

    fn resolve_hex(hex: &str) -> Option<Rgba> {
        let digits = hex.strip_prefix('#')?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }

        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        let expanded: String = match digits.len() {
            3 | 4 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 | 8 => digits.to_string(),
            _ => return None,
        };

        let r = channel(&expanded[0..2])?;
        let g = channel(&expanded[2..4])?;
        let b = channel(&expanded[4..6])?;
        let a = match expanded.len() {
            8 => channel(&expanded[6..8])? as f32 / 255.0,
            _ => 1.0,
        };
        Some(Rgba::from_bytes([r, g, b], a))
    }

    fn resolve_rgb(rgb: &str) -> Option<Rgba> {
        static MATCHER: OnceCell<Regex> = OnceCell::new();
        let matcher = MATCHER.get_or_init(|| {
            Regex::new(
                r"^rgba?\(\s*(?<R>\d{1,3})\s*[, ]\s*(?<G>\d{1,3})\s*[, ]\s*(?<B>\d{1,3})\s*([,/ ]\s*(?<A>[+-]?([0-9]*[.])?[0-9]+)\s*)?\)$",
            )
            .expect("the rgb pattern is valid")
        });
        let captures = matcher.captures(rgb.trim())?;

        let channel = |name: &str| captures.name(name)?.as_str().parse::<u8>().ok();
        let r = channel("R")?;
        let g = channel("G")?;
        let b = channel("B")?;
        let a = match captures.name("A") {
            Some(m) => m.as_str().parse::<f32>().ok()?,
            None => 1.0,
        };
        if !(0.0..=1.0).contains(&a) {
            return None;
        }

        Some(Rgba::from_bytes([r, g, b], a))
    }

    fn resolve_css(css: &str) -> Result<Rgba> {
        let trimmed = css.trim();
        let color = if trimmed.starts_with('#') {
            Self::resolve_hex(trimmed)
        } else if trimmed.starts_with("rgb") {
            Self::resolve_rgb(trimmed)
        } else {
            Self::resolve_named(trimmed)
        };

        color.ok_or_else(|| PlotError::InvalidColor(css.to_string()))
    }
}

/// Resolves a list of color queries, failing on the first invalid entry.
pub fn resolve_all(queries: &[ColorQuery<'_>]) -> Result<Vec<Rgba>> {
    queries.iter().map(ColorQuery::resolve).collect()
}

// Sorted by name for binary search.
static NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("aqua", [0, 255, 255]),
    ("black", [0, 0, 0]),
    ("blue", [0, 0, 255]),
    ("brown", [165, 42, 42]),
    ("coral", [255, 127, 80]),
    ("crimson", [220, 20, 60]),
    ("cyan", [0, 255, 255]),
    ("darkblue", [0, 0, 139]),
    ("darkgray", [169, 169, 169]),
    ("darkgreen", [0, 100, 0]),
    ("darkgrey", [169, 169, 169]),
    ("darkorange", [255, 140, 0]),
    ("darkred", [139, 0, 0]),
    ("deepskyblue", [0, 191, 255]),
    ("dimgray", [105, 105, 105]),
    ("dimgrey", [105, 105, 105]),
    ("fuchsia", [255, 0, 255]),
    ("gold", [255, 215, 0]),
    ("gray", [128, 128, 128]),
    ("green", [0, 128, 0]),
    ("grey", [128, 128, 128]),
    ("indigo", [75, 0, 130]),
    ("lightblue", [173, 216, 230]),
    ("lightgray", [211, 211, 211]),
    ("lightgreen", [144, 238, 144]),
    ("lightgrey", [211, 211, 211]),
    ("lime", [0, 255, 0]),
    ("magenta", [255, 0, 255]),
    ("maroon", [128, 0, 0]),
    ("navy", [0, 0, 128]),
    ("olive", [128, 128, 0]),
    ("orange", [255, 165, 0]),
    ("orchid", [218, 112, 214]),
    ("pink", [255, 192, 203]),
    ("purple", [128, 0, 128]),
    ("red", [255, 0, 0]),
    ("salmon", [250, 128, 114]),
    ("silver", [192, 192, 192]),
    ("steelblue", [70, 130, 180]),
    ("teal", [0, 128, 128]),
    ("tomato", [255, 99, 71]),
    ("turquoise", [64, 224, 208]),
    ("violet", [238, 130, 238]),
    ("white", [255, 255, 255]),
    ("yellow", [255, 255, 0]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_table_is_sorted() {
        assert!(NAMED_COLORS.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_resolve_css() {
        assert_eq!(ColorQuery::from("#ff0000").resolve(), Ok(Rgba::new(1.0, 0.0, 0.0, 1.0)));
        assert_eq!(ColorQuery::from("#0f0").resolve(), Ok(Rgba::new(0.0, 1.0, 0.0, 1.0)));
        assert_eq!(
            ColorQuery::from("rgba(0, 0, 255, 0.5)").resolve(),
            Ok(Rgba::new(0.0, 0.0, 1.0, 0.5))
        );
        assert_eq!(ColorQuery::from("White").resolve(), Ok(Rgba::WHITE));

        let alpha = ColorQuery::from("#00000080").resolve().unwrap().alpha();
        assert!((alpha - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_malformed_colors_are_errors() {
        assert!(ColorQuery::from("#12").resolve().is_err());
        assert!(ColorQuery::from("rgb(300, 0, 0)").resolve().is_err());
        assert!(ColorQuery::from("rgba(0, 0, 0, 2)").resolve().is_err());
        assert!(ColorQuery::from("notacolor").resolve().is_err());
        assert!(ColorQuery::Float([1.5, 0.0, 0.0, 1.0]).resolve().is_err());
        assert!(resolve_all(&["red".into(), "nope".into()]).is_err());
    }
}
