//! Resolution of the data channels driving point and connection attributes.
use crate::{
    constants::MIN_POINT_SIZE,
    point::{Channel, DataType},
};

/// Rule selecting what drives a visual attribute.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingBy {
    /// A constant value.
    #[default]
    None,
    /// One of the auxiliary channels.
    Channel(Channel),
    /// Opacity derived from the number of points in view.
    Density,
    /// Values varying along the arc length of a connection.
    Segment,
    /// Reuse the corresponding point encoding.
    Inherit,
}

/// Encoding modes an attribute accepts besides `none` and the channels.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AllowedModes {
    pub density: bool,
    pub segment: bool,
    pub inherit: bool,
}

impl AllowedModes {
    pub const POINTS: Self = Self {
        density: false,
        segment: false,
        inherit: false,
    };
    pub const POINT_OPACITY: Self = Self {
        density: true,
        segment: false,
        inherit: false,
    };
    pub const CONNECTIONS: Self = Self {
        density: false,
        segment: true,
        inherit: true,
    };
}

const Z_NAMES: [&str; 5] = ["z", "valueZ", "valueA", "value1", "category"];
const W_NAMES: [&str; 5] = ["w", "valueW", "valueB", "value2", "value"];

impl EncodingBy {
    /// Parses an encoding name. Unknown names and modes that are not allowed
    /// resolve to [`EncodingBy::None`].
    pub fn parse(name: Option<&str>, allowed: AllowedModes) -> Self {
        let Some(name) = name else {
            return Self::None;
        };

        if Z_NAMES.contains(&name) {
            Self::Channel(Channel::Z)
        } else if W_NAMES.contains(&name) {
            Self::Channel(Channel::W)
        } else if name == "density" && allowed.density {
            Self::Density
        } else if name == "segment" && allowed.segment {
            Self::Segment
        } else if name == "inherit" && allowed.inherit {
            Self::Inherit
        } else {
            Self::None
        }
    }

    pub fn channel(self) -> Option<Channel> {
        match self {
            Self::Channel(channel) => Some(channel),
            _ => None,
        }
    }
}

/// Maps a channel value to an index into an attribute array of length `len`.
///
/// Continuous values in [0, 1] are bucketized, categorical values are used
/// as indices directly. The result is clamped to the array.
pub fn value_to_idx(value: f32, data_type: DataType, len: usize) -> usize {
    let max_idx = len.saturating_sub(1);
    let idx = match data_type {
        DataType::Continuous => (value * max_idx as f32).round(),
        DataType::Categorical => value,
    };

    if idx.is_finite() && idx > 0.0 {
        (idx as usize).min(max_idx)
    } else {
        0
    }
}

/// Factor the shaders apply to a channel value to obtain an attribute index.
pub fn multiplicator(encoding: EncodingBy, data_type: DataType, len: usize) -> f32 {
    match (encoding, data_type) {
        (EncodingBy::Channel(_), DataType::Continuous) => len.saturating_sub(1) as f32,
        _ => 1.0,
    }
}

/// Scale applied to point sizes at the current camera zoom.
///
/// Zooming in grows points logarithmically, zooming out shrinks them down to
/// `min_point_scale`.
pub fn point_scale(camera_scaling: f32, device_pixel_ratio: f32, min_point_scale: f32) -> f32 {
    if camera_scaling > 1.0 {
        (camera_scaling.max(1.0).asinh() / 1f32.asinh()) * device_pixel_ratio
    } else {
        camera_scaling.max(min_point_scale) * device_pixel_ratio
    }
}

/// Smallest scale keeping the first point size at or above the minimum size.
pub fn min_point_scale(point_size: f32) -> f32 {
    if point_size > 0.0 {
        MIN_POINT_SIZE / point_size
    } else {
        1.0
    }
}

/// Inputs of [`density_opacity`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityParams {
    pub fill: f32,
    /// Canvas size in device pixels.
    pub width: f32,
    pub height: f32,
    pub num_points_in_view: usize,
    pub point_size: f32,
    pub point_scale: f32,
    /// Product of the view matrix diagonal entries `[0]` and `[5]`.
    pub view_scale: f32,
    pub performance_mode: bool,
}

/// Opacity keeping the covered canvas area roughly at `fill`.
pub fn density_opacity(params: DensityParams) -> f32 {
    if params.num_points_in_view == 0 {
        return 1.0;
    }

    let p = params.point_size * params.point_scale;
    let mut alpha = (params.fill * params.width * params.height)
        / (params.num_points_in_view as f32 * p * p)
        * params.view_scale.min(1.0);

    if !params.performance_mode {
        // Round points cover pi/4 of their square.
        alpha *= 1.0 / (0.25 * std::f32::consts::PI);
    }

    let clamped_size = p.max(MIN_POINT_SIZE) + 0.5;
    alpha *= (p / clamped_size).powi(2);

    if alpha.is_nan() {
        1.0
    } else {
        alpha.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let none = AllowedModes::POINTS;
        assert_eq!(EncodingBy::parse(Some("valueA"), none), EncodingBy::Channel(Channel::Z));
        assert_eq!(EncodingBy::parse(Some("value"), none), EncodingBy::Channel(Channel::W));
        assert_eq!(EncodingBy::parse(Some("density"), none), EncodingBy::None);
        assert_eq!(
            EncodingBy::parse(Some("density"), AllowedModes::POINT_OPACITY),
            EncodingBy::Density
        );
        assert_eq!(
            EncodingBy::parse(Some("segment"), AllowedModes::CONNECTIONS),
            EncodingBy::Segment
        );
        assert_eq!(EncodingBy::parse(None, AllowedModes::CONNECTIONS), EncodingBy::None);
    }

    #[test]
    fn test_value_to_idx() {
        assert_eq!(value_to_idx(0.5, DataType::Continuous, 5), 2);
        assert_eq!(value_to_idx(1.0, DataType::Continuous, 5), 4);
        assert_eq!(value_to_idx(3.0, DataType::Categorical, 5), 3);
        assert_eq!(value_to_idx(9.0, DataType::Categorical, 5), 4);
        assert_eq!(value_to_idx(-1.0, DataType::Categorical, 5), 0);
        assert_eq!(value_to_idx(f32::NAN, DataType::Continuous, 5), 0);
    }

    #[test]
    fn test_point_scale() {
        assert_eq!(point_scale(1.0, 2.0, 0.1), 2.0);
        assert_eq!(point_scale(0.01, 1.0, 0.1), 0.1);
        let zoomed = point_scale(10.0, 1.0, 0.1);
        assert!(zoomed > 1.0 && zoomed < 10.0);
    }

    #[test]
    fn test_density_opacity_is_clamped() {
        let mut params = DensityParams {
            fill: 0.15,
            width: 100.0,
            height: 100.0,
            num_points_in_view: 1_000_000,
            point_size: 6.0,
            point_scale: 1.0,
            view_scale: 1.0,
            performance_mode: false,
        };
        let sparse_alpha = {
            let mut p = params;
            p.num_points_in_view = 1;
            density_opacity(p)
        };
        assert_eq!(sparse_alpha, 1.0);

        let dense_alpha = density_opacity(params);
        assert!(dense_alpha > 0.0 && dense_alpha < 0.01);

        params.performance_mode = true;
        assert!(density_opacity(params) < dense_alpha);
    }
}
