//! Draw passes of a frame and the GPU seam executing them.
use crate::{
    colors::Rgba,
    constants::{COLOR_ACTIVE_IDX, COLOR_BG_IDX, COLOR_HOVER_IDX, COLOR_NORMAL_IDX},
    hit_test::ViewTransform,
    textures::{FloatTexture, IndexBuffer, StateTexture},
};

/// A step of a frame. Steps are executed in the order they are planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawStep {
    BackgroundImage,
    /// Translucent fill of the ongoing lasso.
    LassoPolygon,
    PointConnections,
    PointBodies,
    Reticle,
    HoveredPoint,
    SelectedOutline,
    SelectedInnerBorder,
    SelectedBody,
    Annotations,
    SelectionOutline,
}

/// What is visible in the frame being planned.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameContent {
    pub background_image: bool,
    /// The lasso has more than two vertices.
    pub lasso_polygon: bool,
    pub transitioning_points: bool,
    pub points_drawn: bool,
    pub mouse_down: bool,
    pub reticle: bool,
    pub hovered: bool,
    pub selected: bool,
}

/// Plans the steps of a frame. The order is fixed for correct blending.
pub fn plan_frame(content: FrameContent) -> Vec<DrawStep> {
    let mut steps = Vec::new();

    if content.background_image {
        steps.push(DrawStep::BackgroundImage);
    }
    if content.lasso_polygon {
        steps.push(DrawStep::LassoPolygon);
    }
    if !content.transitioning_points {
        steps.push(DrawStep::PointConnections);
    }
    if content.points_drawn {
        steps.push(DrawStep::PointBodies);
    }
    if !content.mouse_down && content.reticle && content.hovered {
        steps.push(DrawStep::Reticle);
    }
    if content.points_drawn && content.hovered {
        steps.push(DrawStep::HoveredPoint);
    }
    if content.points_drawn && content.selected {
        steps.extend([
            DrawStep::SelectedOutline,
            DrawStep::SelectedInnerBorder,
            DrawStep::SelectedBody,
        ]);
    }
    steps.push(DrawStep::Annotations);
    steps.push(DrawStep::SelectionOutline);

    steps
}

/// Uniforms shared by all passes of a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub transform: ViewTransform,
    /// Canvas size in device pixels.
    pub width: f32,
    pub height: f32,
    pub device_pixel_ratio: f32,
    pub point_scale: f32,
    /// Global opacity factor of density driven opacity, `1` otherwise.
    pub opacity_density: f32,
    pub color_multiplicator: f32,
    pub size_multiplicator: f32,
    pub opacity_multiplicator: f32,
}

/// A point pass reading the state texture through an index buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointPass<'a> {
    pub step: DrawStep,
    pub indices: &'a IndexBuffer,
    /// Row of the color group used by the pass.
    pub color_row: usize,
    /// Size added to the encoded point size, in device pixels.
    pub size_extra: f32,
    pub opacity_max: f32,
    pub opacity_scale: f32,
}

/// Parameters of the point passes derived from the properties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassStyle {
    pub point_size_selected: f32,
    pub point_outline_width: f32,
    pub opacity_inactive_max: f32,
    pub opacity_inactive_scale: f32,
    pub device_pixel_ratio: f32,
    pub has_selection: bool,
}

impl<'a> PointPass<'a> {
    pub fn bodies(indices: &'a IndexBuffer, style: &PassStyle) -> Self {
        let (opacity_max, opacity_scale) = if style.has_selection {
            (style.opacity_inactive_max, style.opacity_inactive_scale)
        } else {
            (1.0, 1.0)
        };

        Self {
            step: DrawStep::PointBodies,
            indices,
            color_row: COLOR_NORMAL_IDX,
            size_extra: 0.0,
            opacity_max,
            opacity_scale,
        }
    }

    pub fn hovered(indices: &'a IndexBuffer) -> Self {
        Self {
            step: DrawStep::HoveredPoint,
            indices,
            color_row: COLOR_HOVER_IDX,
            size_extra: 0.0,
            opacity_max: 1.0,
            opacity_scale: 1.0,
        }
    }

    /// Outline, inner border and body of the selected points.
    pub fn selected(indices: &'a IndexBuffer, style: &PassStyle) -> [Self; 3] {
        let dpr = style.device_pixel_ratio;
        let pass = |step, color_row, size_extra| Self {
            step,
            indices,
            color_row,
            size_extra,
            opacity_max: 1.0,
            opacity_scale: 1.0,
        };

        [
            pass(
                DrawStep::SelectedOutline,
                COLOR_ACTIVE_IDX,
                (style.point_size_selected + style.point_outline_width * 2.0) * dpr,
            ),
            pass(
                DrawStep::SelectedInnerBorder,
                COLOR_BG_IDX,
                (style.point_size_selected + style.point_outline_width) * dpr,
            ),
            pass(
                DrawStep::SelectedBody,
                COLOR_ACTIVE_IDX,
                style.point_size_selected * dpr,
            ),
        ]
    }
}

/// The GPU context executing the point passes. Lines are drawn through
/// [`crate::lines::LinePrimitive`].
pub trait Renderer {
    fn upload_state(&mut self, state: &StateTexture);
    fn upload_encodings(&mut self, encoding: &FloatTexture, colors: &FloatTexture);

    fn begin_frame(&mut self, background: Rgba, uniforms: &FrameUniforms);
    fn draw_background_image(&mut self, image: &str, uniforms: &FrameUniforms);
    fn draw_polygon(&mut self, polygon: &[[f32; 2]], color: Rgba, uniforms: &FrameUniforms);
    fn draw_points(&mut self, pass: &PointPass<'_>, uniforms: &FrameUniforms);
    /// Crosshair through `position`, given in data space.
    fn draw_reticle(&mut self, position: [f32; 2], color: Rgba, uniforms: &FrameUniforms);
    fn end_frame(&mut self);

    fn destroy(&mut self);
}

/// Renderer without a GPU. It keeps the steps of the last frame.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NullRenderer {
    frames: usize,
    current: Vec<DrawStep>,
    last_frame: Vec<DrawStep>,
    state_resolution: usize,
    num_encodings: usize,
    destroyed: bool,
}

impl NullRenderer {
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn last_frame(&self) -> &[DrawStep] {
        &self.last_frame
    }

    pub fn state_resolution(&self) -> usize {
        self.state_resolution
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl Renderer for NullRenderer {
    fn upload_state(&mut self, state: &StateTexture) {
        self.state_resolution = state.resolution();
    }

    fn upload_encodings(&mut self, encoding: &FloatTexture, _colors: &FloatTexture) {
        self.num_encodings = encoding.texels().len();
    }

    fn begin_frame(&mut self, _background: Rgba, _uniforms: &FrameUniforms) {
        self.current.clear();
    }

    fn draw_background_image(&mut self, _image: &str, _uniforms: &FrameUniforms) {
        self.current.push(DrawStep::BackgroundImage);
    }

    fn draw_polygon(&mut self, _polygon: &[[f32; 2]], _color: Rgba, _uniforms: &FrameUniforms) {
        self.current.push(DrawStep::LassoPolygon);
    }

    fn draw_points(&mut self, pass: &PointPass<'_>, _uniforms: &FrameUniforms) {
        self.current.push(pass.step);
    }

    fn draw_reticle(&mut self, _position: [f32; 2], _color: Rgba, _uniforms: &FrameUniforms) {
        self.current.push(DrawStep::Reticle);
    }

    fn end_frame(&mut self) {
        self.frames += 1;
        self.last_frame = std::mem::take(&mut self.current);
    }

    fn destroy(&mut self) {
        self.destroyed = true;
    }
}
