//! Typed plot configuration and its update transaction.
use crate::{
    colors::{resolve_all, ColorQuery, Rgba},
    constants::*,
    encoding::EncodingBy,
    event::Event,
    gesture::SelectionType,
    interaction::{KeyMap, MouseMode},
    scale::LinearScale,
};

/// When the on-screen selection outline is removed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectClearPolicy {
    /// Removed together with the selection.
    #[default]
    OnDeselect,
    /// Removed as soon as the gesture ends.
    OnEnd,
    Never,
}

impl SelectClearPolicy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "deselect" | "onDeselect" => Some(Self::OnDeselect),
            "lassoEnd" | "onEnd" => Some(Self::OnEnd),
            "never" => Some(Self::Never),
            _ => None,
        }
    }
}

/// Canvas extent along one axis.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum Size {
    /// Follows the host element, reported through [`crate::Scatterplot::resize`].
    #[default]
    Auto,
    /// Fixed size in CSS pixels.
    Fixed(f32),
}

/// All settings of a plot.
#[derive(Debug, Clone, PartialEq)]
pub struct Properties {
    pub background_color: Rgba,
    pub background_image: Option<String>,

    pub point_color: Vec<Rgba>,
    pub point_color_active: Vec<Rgba>,
    pub point_color_hover: Vec<Rgba>,
    pub point_size: Vec<f32>,
    pub point_size_selected: f32,
    pub point_outline_width: f32,
    pub opacity: Vec<f32>,
    pub opacity_inactive_max: f32,
    pub opacity_inactive_scale: f32,
    pub opacity_by_density_fill: f32,
    pub opacity_by_density_debounce_time: f64,
    pub color_by: EncodingBy,
    pub size_by: EncodingBy,
    pub opacity_by: EncodingBy,

    pub show_point_connections: bool,
    pub point_connection_color: Vec<Rgba>,
    pub point_connection_color_active: Rgba,
    pub point_connection_color_hover: Rgba,
    pub point_connection_color_by: EncodingBy,
    pub point_connection_opacity: Vec<f32>,
    pub point_connection_opacity_active: f32,
    pub point_connection_opacity_by: EncodingBy,
    pub point_connection_size: Vec<f32>,
    pub point_connection_size_active: f32,
    pub point_connection_size_by: EncodingBy,
    pub point_connection_max_int_points_per_segment: usize,
    pub point_connection_tolerance: f32,

    pub show_reticle: bool,
    pub reticle_color: Rgba,

    pub selection_type: SelectionType,
    pub select_color: Rgba,
    pub select_line_width: f32,
    pub select_min_delay: f64,
    pub select_min_dist: f32,
    pub select_clear_policy: SelectClearPolicy,
    pub select_initiator: bool,
    pub select_on_long_press: bool,
    pub select_long_press_time: f64,
    pub select_brush_size: f32,
    pub deselect_on_dbl_click: bool,
    pub deselect_on_escape: bool,

    pub mouse_mode: MouseMode,
    pub key_map: KeyMap,
    pub camera_is_fixed: bool,

    pub aspect_ratio: f32,
    pub width: Size,
    pub height: Size,
    pub performance_mode: bool,
    pub sync_events: bool,
    /// `None` decides by the point count.
    pub spatial_index_use_worker: Option<bool>,

    pub annotation_line_color: Rgba,
    pub annotation_line_width: f32,
    pub annotation_hvline_limit: f32,

    pub x_scale: Option<LinearScale>,
    pub y_scale: Option<LinearScale>,
}

impl Default for Properties {
    fn default() -> Self {
        Self {
            background_color: DEFAULT_COLOR_BG,
            background_image: None,
            point_color: vec![DEFAULT_COLOR_NORMAL],
            point_color_active: vec![DEFAULT_COLOR_ACTIVE],
            point_color_hover: vec![DEFAULT_COLOR_HOVER],
            point_size: vec![DEFAULT_POINT_SIZE],
            point_size_selected: DEFAULT_POINT_SIZE_SELECTED,
            point_outline_width: DEFAULT_POINT_OUTLINE_WIDTH,
            opacity: vec![DEFAULT_OPACITY],
            opacity_inactive_max: DEFAULT_OPACITY_INACTIVE_MAX,
            opacity_inactive_scale: DEFAULT_OPACITY_INACTIVE_SCALE,
            opacity_by_density_fill: DEFAULT_OPACITY_BY_DENSITY_FILL,
            opacity_by_density_debounce_time: DEFAULT_OPACITY_BY_DENSITY_DEBOUNCE_TIME,
            color_by: EncodingBy::None,
            size_by: EncodingBy::None,
            opacity_by: EncodingBy::None,
            show_point_connections: false,
            point_connection_color: vec![DEFAULT_POINT_CONNECTION_COLOR_NORMAL],
            point_connection_color_active: DEFAULT_POINT_CONNECTION_COLOR_ACTIVE,
            point_connection_color_hover: DEFAULT_POINT_CONNECTION_COLOR_HOVER,
            point_connection_color_by: EncodingBy::None,
            point_connection_opacity: vec![DEFAULT_POINT_CONNECTION_OPACITY],
            point_connection_opacity_active: DEFAULT_POINT_CONNECTION_OPACITY_ACTIVE,
            point_connection_opacity_by: EncodingBy::None,
            point_connection_size: vec![DEFAULT_POINT_CONNECTION_SIZE],
            point_connection_size_active: DEFAULT_POINT_CONNECTION_SIZE_ACTIVE,
            point_connection_size_by: EncodingBy::None,
            point_connection_max_int_points_per_segment:
                DEFAULT_POINT_CONNECTION_MAX_INT_POINTS_PER_SEGMENT,
            point_connection_tolerance: DEFAULT_POINT_CONNECTION_INT_POINTS_TOLERANCE,
            show_reticle: false,
            reticle_color: DEFAULT_RETICLE_COLOR,
            selection_type: SelectionType::Lasso,
            select_color: DEFAULT_SELECT_COLOR,
            select_line_width: DEFAULT_SELECT_LINE_WIDTH,
            select_min_delay: DEFAULT_SELECT_MIN_DELAY,
            select_min_dist: DEFAULT_SELECT_MIN_DIST,
            select_clear_policy: SelectClearPolicy::OnDeselect,
            select_initiator: false,
            select_on_long_press: false,
            select_long_press_time: DEFAULT_SELECT_LONG_PRESS_TIME,
            select_brush_size: DEFAULT_SELECT_BRUSH_SIZE,
            deselect_on_dbl_click: true,
            deselect_on_escape: true,
            mouse_mode: MouseMode::PanZoom,
            key_map: KeyMap::default(),
            camera_is_fixed: false,
            aspect_ratio: DEFAULT_DATA_ASPECT_RATIO,
            width: Size::Auto,
            height: Size::Auto,
            performance_mode: false,
            sync_events: false,
            spatial_index_use_worker: None,
            annotation_line_color: DEFAULT_ANNOTATION_LINE_COLOR,
            annotation_line_width: DEFAULT_ANNOTATION_LINE_WIDTH,
            annotation_hvline_limit: DEFAULT_ANNOTATION_HVLINE_LIMIT,
            x_scale: None,
            y_scale: None,
        }
    }
}

/// A set of property changes applied at once by [`Properties::apply`].
///
/// Colors are given as queries; entries that fail to resolve leave the
/// previous value in place.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PropertiesUpdate {
    pub background_color: Option<ColorQuery<'static>>,
    pub background_image: Option<Option<String>>,

    pub point_color: Option<Vec<ColorQuery<'static>>>,
    pub point_color_active: Option<Vec<ColorQuery<'static>>>,
    pub point_color_hover: Option<Vec<ColorQuery<'static>>>,
    pub point_size: Option<Vec<f32>>,
    pub point_size_selected: Option<f32>,
    pub point_outline_width: Option<f32>,
    pub opacity: Option<Vec<f32>>,
    pub opacity_inactive_max: Option<f32>,
    pub opacity_inactive_scale: Option<f32>,
    pub opacity_by_density_fill: Option<f32>,
    pub opacity_by_density_debounce_time: Option<f64>,
    pub color_by: Option<EncodingBy>,
    pub size_by: Option<EncodingBy>,
    pub opacity_by: Option<EncodingBy>,

    pub show_point_connections: Option<bool>,
    pub point_connection_color: Option<Vec<ColorQuery<'static>>>,
    pub point_connection_color_active: Option<ColorQuery<'static>>,
    pub point_connection_color_hover: Option<ColorQuery<'static>>,
    pub point_connection_color_by: Option<EncodingBy>,
    pub point_connection_opacity: Option<Vec<f32>>,
    pub point_connection_opacity_active: Option<f32>,
    pub point_connection_opacity_by: Option<EncodingBy>,
    pub point_connection_size: Option<Vec<f32>>,
    pub point_connection_size_active: Option<f32>,
    pub point_connection_size_by: Option<EncodingBy>,
    pub point_connection_max_int_points_per_segment: Option<usize>,
    pub point_connection_tolerance: Option<f32>,

    pub show_reticle: Option<bool>,
    pub reticle_color: Option<ColorQuery<'static>>,

    pub selection_type: Option<SelectionType>,
    pub select_color: Option<ColorQuery<'static>>,
    pub select_line_width: Option<f32>,
    pub select_min_delay: Option<f64>,
    pub select_min_dist: Option<f32>,
    pub select_clear_policy: Option<SelectClearPolicy>,
    pub select_initiator: Option<bool>,
    pub select_on_long_press: Option<bool>,
    pub select_long_press_time: Option<f64>,
    pub select_brush_size: Option<f32>,
    pub deselect_on_dbl_click: Option<bool>,
    pub deselect_on_escape: Option<bool>,

    pub mouse_mode: Option<MouseMode>,
    pub key_map: Option<KeyMap>,
    pub camera_is_fixed: Option<bool>,

    pub aspect_ratio: Option<f32>,
    pub width: Option<Size>,
    pub height: Option<Size>,
    pub performance_mode: Option<bool>,
    pub sync_events: Option<bool>,
    pub spatial_index_use_worker: Option<Option<bool>>,

    pub annotation_line_color: Option<ColorQuery<'static>>,
    pub annotation_line_width: Option<f32>,
    pub annotation_hvline_limit: Option<f32>,

    pub x_scale: Option<Option<LinearScale>>,
    pub y_scale: Option<Option<LinearScale>>,
}

fn color(name: &str, query: ColorQuery<'_>) -> Option<Rgba> {
    match query.resolve() {
        Ok(color) => Some(color),
        Err(e) => {
            log::warn!("ignoring {name}: {e}");
            None
        }
    }
}

fn colors(name: &str, queries: &[ColorQuery<'_>]) -> Option<Vec<Rgba>> {
    match resolve_all(queries) {
        Ok(colors) if !colors.is_empty() => Some(colors),
        Ok(_) => {
            log::warn!("ignoring {name}: no colors given");
            None
        }
        Err(e) => {
            log::warn!("ignoring {name}: {e}");
            None
        }
    }
}

fn values(name: &str, values: Vec<f32>, min: f32) -> Option<Vec<f32>> {
    if values.is_empty() || values.iter().any(|v| !v.is_finite() || *v < min) {
        log::warn!("ignoring {name}: expected a non-empty list of values >= {min}");
        return None;
    }
    Some(values)
}

fn positive(name: &str, value: f32) -> Option<f32> {
    if value.is_finite() && value > 0.0 {
        Some(value)
    } else {
        log::warn!("ignoring {name}: expected a positive value, got {value}");
        None
    }
}

fn unit(name: &str, value: f32) -> Option<f32> {
    if (0.0..=1.0).contains(&value) {
        Some(value)
    } else {
        log::warn!("ignoring {name}: expected a value in [0, 1], got {value}");
        None
    }
}

fn non_negative(name: &str, value: f64) -> Option<f64> {
    if value.is_finite() && value >= 0.0 {
        Some(value)
    } else {
        log::warn!("ignoring {name}: expected a non-negative value, got {value}");
        None
    }
}

/// Assigns `value` to `field` and signals `event` if it differs.
fn assign<T: PartialEq>(field: &mut T, value: Option<T>, changes: &mut Event, event: Event) {
    if let Some(value) = value {
        if *field != value {
            *field = value;
            changes.signal(event);
        }
    }
}

impl Properties {
    /// Applies an update. Invalid values are reported and skipped.
    ///
    /// Returns the set of changed concerns; empty if nothing changed.
    pub fn apply(&mut self, update: PropertiesUpdate) -> Event {
        let mut changes = Event::NONE;
        let style = Event::PROPERTIES_CHANGE;
        let encoding = Event::PROPERTIES_CHANGE | Event::ENCODING_CHANGE;
        let connection_style = Event::PROPERTIES_CHANGE | Event::CONNECTION_STYLE_CHANGE;

        assign(
            &mut self.background_color,
            update.background_color.and_then(|c| color("background color", c)),
            &mut changes,
            style,
        );
        assign(&mut self.background_image, update.background_image, &mut changes, style);

        assign(
            &mut self.point_color,
            update.point_color.and_then(|c| colors("point color", &c)),
            &mut changes,
            encoding,
        );
        assign(
            &mut self.point_color_active,
            update.point_color_active.and_then(|c| colors("active point color", &c)),
            &mut changes,
            encoding,
        );
        assign(
            &mut self.point_color_hover,
            update.point_color_hover.and_then(|c| colors("hover point color", &c)),
            &mut changes,
            encoding,
        );
        assign(
            &mut self.point_size,
            update.point_size.and_then(|v| values("point size", v, 0.0)),
            &mut changes,
            encoding,
        );
        assign(
            &mut self.point_size_selected,
            update.point_size_selected.and_then(|v| positive("selected point size", v)),
            &mut changes,
            style,
        );
        assign(
            &mut self.point_outline_width,
            update.point_outline_width.and_then(|v| positive("point outline width", v)),
            &mut changes,
            style,
        );
        assign(
            &mut self.opacity,
            update.opacity.and_then(|v| values("opacity", v, 0.0)),
            &mut changes,
            encoding,
        );
        assign(
            &mut self.opacity_inactive_max,
            update.opacity_inactive_max.and_then(|v| unit("inactive opacity max", v)),
            &mut changes,
            style,
        );
        assign(
            &mut self.opacity_inactive_scale,
            update.opacity_inactive_scale.and_then(|v| unit("inactive opacity scale", v)),
            &mut changes,
            style,
        );
        assign(
            &mut self.opacity_by_density_fill,
            update.opacity_by_density_fill.and_then(|v| unit("density fill", v)),
            &mut changes,
            encoding,
        );
        assign(
            &mut self.opacity_by_density_debounce_time,
            update
                .opacity_by_density_debounce_time
                .and_then(|v| non_negative("density debounce time", v)),
            &mut changes,
            style,
        );
        assign(&mut self.color_by, update.color_by, &mut changes, encoding);
        assign(&mut self.size_by, update.size_by, &mut changes, encoding);
        assign(&mut self.opacity_by, update.opacity_by, &mut changes, encoding);

        assign(
            &mut self.show_point_connections,
            update.show_point_connections,
            &mut changes,
            Event::PROPERTIES_CHANGE | Event::CONNECTIONS_TOGGLE,
        );
        assign(
            &mut self.point_connection_color,
            update
                .point_connection_color
                .and_then(|c| colors("point connection color", &c)),
            &mut changes,
            connection_style,
        );
        assign(
            &mut self.point_connection_color_active,
            update
                .point_connection_color_active
                .and_then(|c| color("active point connection color", c)),
            &mut changes,
            connection_style,
        );
        assign(
            &mut self.point_connection_color_hover,
            update
                .point_connection_color_hover
                .and_then(|c| color("hover point connection color", c)),
            &mut changes,
            connection_style,
        );
        assign(
            &mut self.point_connection_color_by,
            update.point_connection_color_by,
            &mut changes,
            connection_style,
        );
        assign(
            &mut self.point_connection_opacity,
            update
                .point_connection_opacity
                .and_then(|v| values("point connection opacity", v, 0.0)),
            &mut changes,
            connection_style,
        );
        assign(
            &mut self.point_connection_opacity_active,
            update
                .point_connection_opacity_active
                .and_then(|v| unit("active point connection opacity", v)),
            &mut changes,
            connection_style,
        );
        assign(
            &mut self.point_connection_opacity_by,
            update.point_connection_opacity_by,
            &mut changes,
            connection_style,
        );
        assign(
            &mut self.point_connection_size,
            update
                .point_connection_size
                .and_then(|v| values("point connection size", v, 0.0)),
            &mut changes,
            connection_style,
        );
        assign(
            &mut self.point_connection_size_active,
            update
                .point_connection_size_active
                .and_then(|v| positive("active point connection size", v)),
            &mut changes,
            connection_style,
        );
        assign(
            &mut self.point_connection_size_by,
            update.point_connection_size_by,
            &mut changes,
            connection_style,
        );
        assign(
            &mut self.point_connection_max_int_points_per_segment,
            update.point_connection_max_int_points_per_segment,
            &mut changes,
            Event::PROPERTIES_CHANGE,
        );
        assign(
            &mut self.point_connection_tolerance,
            update
                .point_connection_tolerance
                .and_then(|v| positive("point connection tolerance", v)),
            &mut changes,
            Event::PROPERTIES_CHANGE,
        );

        assign(&mut self.show_reticle, update.show_reticle, &mut changes, style);
        assign(
            &mut self.reticle_color,
            update.reticle_color.and_then(|c| color("reticle color", c)),
            &mut changes,
            style,
        );

        assign(
            &mut self.selection_type,
            update.selection_type,
            &mut changes,
            Event::PROPERTIES_CHANGE | Event::SELECTION_TYPE_CHANGE,
        );
        let gesture = Event::PROPERTIES_CHANGE | Event::SELECTION_TYPE_CHANGE;
        assign(
            &mut self.select_color,
            update.select_color.and_then(|c| color("selection color", c)),
            &mut changes,
            style,
        );
        assign(
            &mut self.select_line_width,
            update.select_line_width.and_then(|v| positive("selection line width", v)),
            &mut changes,
            style,
        );
        assign(
            &mut self.select_min_delay,
            update.select_min_delay.and_then(|v| non_negative("selection min delay", v)),
            &mut changes,
            gesture,
        );
        assign(
            &mut self.select_min_dist,
            update
                .select_min_dist
                .and_then(|v| non_negative("selection min dist", v as f64))
                .map(|v| v as f32),
            &mut changes,
            gesture,
        );
        assign(
            &mut self.select_brush_size,
            update.select_brush_size.and_then(|v| positive("brush size", v)),
            &mut changes,
            gesture,
        );
        assign(
            &mut self.select_clear_policy,
            update.select_clear_policy,
            &mut changes,
            Event::PROPERTIES_CHANGE,
        );
        assign(
            &mut self.select_initiator,
            update.select_initiator,
            &mut changes,
            Event::PROPERTIES_CHANGE,
        );
        assign(
            &mut self.select_on_long_press,
            update.select_on_long_press,
            &mut changes,
            Event::PROPERTIES_CHANGE,
        );
        assign(
            &mut self.select_long_press_time,
            update
                .select_long_press_time
                .and_then(|v| non_negative("long press time", v)),
            &mut changes,
            Event::PROPERTIES_CHANGE,
        );
        assign(
            &mut self.deselect_on_dbl_click,
            update.deselect_on_dbl_click,
            &mut changes,
            Event::PROPERTIES_CHANGE,
        );
        assign(
            &mut self.deselect_on_escape,
            update.deselect_on_escape,
            &mut changes,
            Event::PROPERTIES_CHANGE,
        );

        assign(&mut self.mouse_mode, update.mouse_mode, &mut changes, Event::PROPERTIES_CHANGE);
        assign(&mut self.key_map, update.key_map, &mut changes, Event::PROPERTIES_CHANGE);
        assign(
            &mut self.camera_is_fixed,
            update.camera_is_fixed,
            &mut changes,
            Event::PROPERTIES_CHANGE | Event::CAMERA_CONFIG_CHANGE,
        );

        assign(
            &mut self.aspect_ratio,
            update.aspect_ratio.and_then(|v| positive("aspect ratio", v)),
            &mut changes,
            Event::PROPERTIES_CHANGE | Event::VIEW_CHANGE,
        );
        let size = |name: &str, size: Size| match size {
            Size::Fixed(v) => positive(name, v).map(Size::Fixed),
            Size::Auto => Some(Size::Auto),
        };
        assign(
            &mut self.width,
            update.width.and_then(|v| size("width", v)),
            &mut changes,
            Event::PROPERTIES_CHANGE | Event::RESIZE,
        );
        assign(
            &mut self.height,
            update.height.and_then(|v| size("height", v)),
            &mut changes,
            Event::PROPERTIES_CHANGE | Event::RESIZE,
        );
        assign(
            &mut self.performance_mode,
            update.performance_mode,
            &mut changes,
            encoding,
        );
        assign(&mut self.sync_events, update.sync_events, &mut changes, Event::PROPERTIES_CHANGE);
        assign(
            &mut self.spatial_index_use_worker,
            update.spatial_index_use_worker,
            &mut changes,
            Event::PROPERTIES_CHANGE,
        );

        let annotation = Event::PROPERTIES_CHANGE | Event::ANNOTATION_STYLE_CHANGE;
        assign(
            &mut self.annotation_line_color,
            update
                .annotation_line_color
                .and_then(|c| color("annotation line color", c)),
            &mut changes,
            annotation,
        );
        assign(
            &mut self.annotation_line_width,
            update
                .annotation_line_width
                .and_then(|v| positive("annotation line width", v)),
            &mut changes,
            annotation,
        );
        assign(
            &mut self.annotation_hvline_limit,
            update
                .annotation_hvline_limit
                .and_then(|v| positive("annotation line limit", v)),
            &mut changes,
            annotation,
        );

        assign(
            &mut self.x_scale,
            update.x_scale,
            &mut changes,
            Event::PROPERTIES_CHANGE | Event::SCALE_CHANGE,
        );
        assign(
            &mut self.y_scale,
            update.y_scale,
            &mut changes,
            Event::PROPERTIES_CHANGE | Event::SCALE_CHANGE,
        );

        changes
    }

    /// Whether the spatial index of `num_points` points is built off the main
    /// thread.
    pub fn use_worker(&self, num_points: usize) -> bool {
        self.spatial_index_use_worker
            .unwrap_or(num_points >= SPATIAL_INDEX_WORKER_THRESHOLD)
    }
}
