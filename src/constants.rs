//! Default values and fixed parameters of the plot.
use crate::colors::Rgba;

// Color texture rows of a color group.
pub const COLOR_NORMAL_IDX: usize = 0;
pub const COLOR_ACTIVE_IDX: usize = 1;
pub const COLOR_HOVER_IDX: usize = 2;
pub const COLOR_BG_IDX: usize = 3;
pub const COLOR_NUM_STATES: usize = 4;

pub const MIN_POINT_SIZE: f32 = 1.0;
pub const DEFAULT_POINT_SIZE: f32 = 6.0;
pub const DEFAULT_POINT_SIZE_SELECTED: f32 = 2.0;
pub const DEFAULT_POINT_OUTLINE_WIDTH: f32 = 2.0;

pub const DEFAULT_COLOR_NORMAL: Rgba = Rgba([0.66, 0.66, 0.66, 1.0]);
pub const DEFAULT_COLOR_ACTIVE: Rgba = Rgba([0.0, 0.55, 1.0, 1.0]);
pub const DEFAULT_COLOR_HOVER: Rgba = Rgba([1.0, 1.0, 1.0, 1.0]);
pub const DEFAULT_COLOR_BG: Rgba = Rgba([0.0, 0.0, 0.0, 1.0]);
pub const DEFAULT_RETICLE_COLOR: Rgba = Rgba([1.0, 1.0, 1.0, 0.5]);

pub const DEFAULT_OPACITY: f32 = 1.0;
pub const DEFAULT_OPACITY_INACTIVE_MAX: f32 = 1.0;
pub const DEFAULT_OPACITY_INACTIVE_SCALE: f32 = 1.0;
pub const DEFAULT_OPACITY_BY_DENSITY_FILL: f32 = 0.15;
pub const DEFAULT_OPACITY_BY_DENSITY_DEBOUNCE_TIME: f64 = 25.0;

pub const DEFAULT_SELECT_COLOR: Rgba = Rgba([0.0, 0.666_666_7, 1.0, 1.0]);
pub const DEFAULT_SELECT_LINE_WIDTH: f32 = 2.0;
pub const DEFAULT_SELECT_MIN_DELAY: f64 = 10.0;
pub const DEFAULT_SELECT_MIN_DIST: f32 = 3.0;
pub const DEFAULT_SELECT_LONG_PRESS_TIME: f64 = 750.0;
pub const DEFAULT_SELECT_BRUSH_SIZE: f32 = 24.0;

/// Clicks released later than this after the press never hit-test while the
/// selection initiator is enabled.
pub const LONG_CLICK_TIME: f64 = 500.0;
/// Delay before the selection initiator shows up after a click into empty
/// space, giving a double click the chance to supersede it.
pub const SINGLE_CLICK_DELAY: f64 = 200.0;

pub const DEFAULT_POINT_CONNECTION_SIZE: f32 = 2.0;
pub const DEFAULT_POINT_CONNECTION_SIZE_ACTIVE: f32 = 2.0;
pub const DEFAULT_POINT_CONNECTION_OPACITY: f32 = 0.1;
pub const DEFAULT_POINT_CONNECTION_OPACITY_ACTIVE: f32 = 0.66;
pub const DEFAULT_POINT_CONNECTION_COLOR_NORMAL: Rgba = Rgba([0.66, 0.66, 0.66, 0.2]);
pub const DEFAULT_POINT_CONNECTION_COLOR_ACTIVE: Rgba = Rgba([0.0, 0.55, 1.0, 1.0]);
pub const DEFAULT_POINT_CONNECTION_COLOR_HOVER: Rgba = Rgba([1.0, 1.0, 1.0, 1.0]);
pub const DEFAULT_POINT_CONNECTION_MAX_INT_POINTS_PER_SEGMENT: usize = 100;
pub const DEFAULT_POINT_CONNECTION_INT_POINTS_TOLERANCE: f32 = 1.0 / 500.0;

pub const DEFAULT_ANNOTATION_LINE_COLOR: Rgba = Rgba([1.0, 1.0, 1.0, 0.5]);
pub const DEFAULT_ANNOTATION_LINE_WIDTH: f32 = 1.0;
pub const DEFAULT_ANNOTATION_HVLINE_LIMIT: f32 = 1000.0;

pub const DEFAULT_TRANSITION_DURATION: f64 = 500.0;
pub const DEFAULT_DISTANCE: f32 = 1.0;
pub const DEFAULT_ROTATION: f32 = 0.0;
pub const DEFAULT_DATA_ASPECT_RATIO: f32 = 1.0;

/// Point counts above which the spatial index is built off the main thread
/// unless configured otherwise.
pub const SPATIAL_INDEX_WORKER_THRESHOLD: usize = 1_000_000;

pub const DEFAULT_WIDTH: f32 = 100.0;
pub const DEFAULT_HEIGHT: f32 = 100.0;
