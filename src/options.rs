//! Options of the plot operations.
use crate::{constants::DEFAULT_TRANSITION_DURATION, lerp::Easing, point::DataType, spatial::BoxedIndex};

/// Options of [`crate::Scatterplot::draw`].
#[derive(Default)]
pub struct DrawOptions {
    /// Animate the positions from the previous point set. Requires both sets
    /// to have the same number of points.
    pub transition: bool,
    pub transition_duration: Option<f64>,
    pub transition_easing: Option<Easing>,
    /// Keep the filter if the number of points is unchanged.
    pub prevent_filter_reset: bool,
    pub hover: Option<usize>,
    pub select: Option<Vec<usize>>,
    pub filter: Option<Vec<usize>>,
    /// Overrides the inferred data type of the `z` channel.
    pub z_data_type: Option<DataType>,
    pub w_data_type: Option<DataType>,
    /// An index over the positions of the new points, skipping the build.
    pub spatial_index: Option<BoxedIndex>,
    pub show_point_connections_once: bool,
    pub show_reticle_once: bool,
}

impl std::fmt::Debug for DrawOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawOptions")
            .field("transition", &self.transition)
            .field("transition_duration", &self.transition_duration)
            .field("transition_easing", &self.transition_easing)
            .field("prevent_filter_reset", &self.prevent_filter_reset)
            .field("hover", &self.hover)
            .field("select", &self.select)
            .field("filter", &self.filter)
            .field("z_data_type", &self.z_data_type)
            .field("w_data_type", &self.w_data_type)
            .field("spatial_index", &self.spatial_index.as_ref().map(|i| i.len()))
            .field("show_point_connections_once", &self.show_point_connections_once)
            .field("show_reticle_once", &self.show_reticle_once)
            .finish()
    }
}

impl DrawOptions {
    pub(crate) fn transition(&self) -> Option<(f64, Easing)> {
        self.transition.then(|| {
            (
                self.transition_duration.unwrap_or(DEFAULT_TRANSITION_DURATION),
                self.transition_easing.unwrap_or_default(),
            )
        })
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SelectOptions {
    /// Extend the current selection instead of replacing it.
    pub merge: bool,
    pub prevent_event: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HoverOptions {
    /// Draw the reticle for this hover even if it is disabled.
    pub show_reticle_once: bool,
    pub prevent_event: bool,
}

/// Options of the camera operations.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ZoomOptions {
    pub transition: bool,
    pub transition_duration: Option<f64>,
    pub transition_easing: Option<Easing>,
    /// Relative padding around the points of [`crate::Scatterplot::zoom_to_points`].
    pub padding: f32,
}

impl ZoomOptions {
    pub(crate) fn transition(&self) -> Option<(f64, Easing)> {
        self.transition.then(|| {
            (
                self.transition_duration.unwrap_or(DEFAULT_TRANSITION_DURATION),
                self.transition_easing.unwrap_or_default(),
            )
        })
    }
}
