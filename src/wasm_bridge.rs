//! `Wasm` bridge types.
use std::{borrow::Cow, convert::identity, ops::Range};

use async_channel::{Receiver, Sender};
use glam::Vec2;
use wasm_bindgen::prelude::*;

use crate::{
    annotations::{Annotation, AnnotationStyle},
    colors::ColorQuery,
    completion::Completion,
    encoding::{AllowedModes, EncodingBy},
    error::PlotError,
    hit_test::ViewTransform,
    interaction::{Modifiers, MouseMode, PointerInput},
    lerp::Easing,
    lines::{LineAttributes, LineBuffers, LineData, LinePrimitive, LineStyle},
    notify::{Notification, NotificationKind, ViewInfo},
    options::{DrawOptions, HoverOptions, SelectOptions, ZoomOptions},
    point::{DataType, PointsInput},
    properties::{PropertiesUpdate, SelectClearPolicy, Size},
    render::{FrameUniforms, PointPass, Renderer},
    textures::{FloatTexture, StateTexture},
    Collaborators, Scatterplot,
};

fn init_logging_once() {
    static INIT: once_cell::sync::OnceCell<()> = once_cell::sync::OnceCell::new();
    INIT.get_or_init(|| {
        console_error_panic_hook::set_once();
        #[cfg(target_arch = "wasm32")]
        wasm_logger::init(wasm_logger::Config::default());
    });
}

fn js_error(error: PlotError) -> JsValue {
    js_sys::Error::new(&error.to_string()).into()
}

fn css(color: String) -> ColorQuery<'static> {
    ColorQuery::Css(Cow::Owned(color))
}

fn now() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map_or(0.0, |p| p.now())
}

/// Calls the method `name` of a JS object, ignoring missing methods.
fn call(target: &js_sys::Object, name: &str, args: &[JsValue]) {
    let Ok(method) = js_sys::Reflect::get(target, &name.into()) else {
        return;
    };
    let Some(method) = method.dyn_ref::<js_sys::Function>() else {
        return;
    };

    let args = args.iter().collect::<js_sys::Array>();
    if let Err(e) = method.apply(target, &args) {
        log::error!("call to '{name}' failed: {e:?}");
    }
}

fn texels(texture: &FloatTexture) -> js_sys::Float32Array {
    js_sys::Float32Array::from(bytemuck::cast_slice::<[f32; 4], f32>(texture.texels()))
}

fn uniforms_object(uniforms: &FrameUniforms) -> js_sys::Object {
    let object = js_sys::Object::new();
    let set = |key: &str, value: JsValue| {
        let _ = js_sys::Reflect::set(&object, &key.into(), &value);
    };

    let mvp = uniforms.transform.model_view_projection().to_cols_array();
    set("modelViewProjection", js_sys::Float32Array::from(&mvp[..]).into());
    set("width", uniforms.width.into());
    set("height", uniforms.height.into());
    set("devicePixelRatio", uniforms.device_pixel_ratio.into());
    set("pointScale", uniforms.point_scale.into());
    set("opacityDensity", uniforms.opacity_density.into());
    set("colorMultiplicator", uniforms.color_multiplicator.into());
    set("sizeMultiplicator", uniforms.size_multiplicator.into());
    set("opacityMultiplicator", uniforms.opacity_multiplicator.into());
    object
}

fn notification_object(notification: &Notification) -> js_sys::Object {
    let object = js_sys::Object::new();
    let set = |key: &str, value: JsValue| {
        let _ = js_sys::Reflect::set(&object, &key.into(), &value);
    };
    let indices = |points: &[usize]| {
        points
            .iter()
            .map(|&idx| JsValue::from(idx as u32))
            .collect::<js_sys::Array>()
    };
    let polygon = |polygon: &[[f32; 2]]| {
        let flat = polygon.iter().flatten().copied().collect::<Vec<_>>();
        js_sys::Float32Array::from(&flat[..])
    };
    let view = |info: &ViewInfo| {
        let view = info.view.to_cols_array();
        set("view", js_sys::Float32Array::from(&view[..]).into());
        set("camera", js_sys::Float32Array::from(&info.target.to_array()[..]).into());
        set("distance", info.distance.into());
        set("rotation", info.rotation.into());
        if let Some(domain) = info.x_domain {
            set("xScaleDomain", js_sys::Float32Array::from(&domain[..]).into());
        }
        if let Some(domain) = info.y_domain {
            set("yScaleDomain", js_sys::Float32Array::from(&domain[..]).into());
        }
    };

    match notification {
        Notification::Select { points } | Notification::Filter { points } => {
            set("points", indices(points).into())
        }
        Notification::PointOver(idx) | Notification::PointOut(idx) => {
            set("index", (*idx as u32).into())
        }
        Notification::SelectionExtend { shape } => {
            set("coordinates", polygon(&shape.polygon).into())
        }
        Notification::SelectionEnd { shape, merge } => {
            set("coordinates", polygon(&shape.polygon).into());
            set("merge", (*merge).into());
        }
        Notification::View(info) | Notification::Drawing(info) | Notification::Draw(info) => view(info),
        _ => {}
    }

    object
}

/// A [`Renderer`] forwarding the passes to a JS object.
struct JsRenderer {
    target: js_sys::Object,
}

impl Renderer for JsRenderer {
    fn upload_state(&mut self, state: &StateTexture) {
        call(
            &self.target,
            "uploadState",
            &[texels(state.texture()).into(), (state.resolution() as u32).into()],
        );
    }

    fn upload_encodings(&mut self, encoding: &FloatTexture, colors: &FloatTexture) {
        call(
            &self.target,
            "uploadEncodings",
            &[
                texels(encoding).into(),
                (encoding.resolution() as u32).into(),
                texels(colors).into(),
                (colors.resolution() as u32).into(),
            ],
        );
    }

    fn begin_frame(&mut self, background: crate::colors::Rgba, uniforms: &FrameUniforms) {
        call(
            &self.target,
            "beginFrame",
            &[
                js_sys::Float32Array::from(&background.0[..]).into(),
                uniforms_object(uniforms).into(),
            ],
        );
    }

    fn draw_background_image(&mut self, image: &str, uniforms: &FrameUniforms) {
        call(
            &self.target,
            "drawBackgroundImage",
            &[image.into(), uniforms_object(uniforms).into()],
        );
    }

    fn draw_polygon(&mut self, polygon: &[[f32; 2]], color: crate::colors::Rgba, uniforms: &FrameUniforms) {
        let flat = polygon.iter().flatten().copied().collect::<Vec<_>>();
        call(
            &self.target,
            "drawPolygon",
            &[
                js_sys::Float32Array::from(&flat[..]).into(),
                js_sys::Float32Array::from(&color.0[..]).into(),
                uniforms_object(uniforms).into(),
            ],
        );
    }

    fn draw_points(&mut self, pass: &PointPass<'_>, uniforms: &FrameUniforms) {
        let options = js_sys::Object::new();
        let set = |key: &str, value: JsValue| {
            let _ = js_sys::Reflect::set(&options, &key.into(), &value);
        };
        set("step", format!("{:?}", pass.step).into());
        set("colorRow", (pass.color_row as u32).into());
        set("sizeExtra", pass.size_extra.into());
        set("opacityMax", pass.opacity_max.into());
        set("opacityScale", pass.opacity_scale.into());

        call(
            &self.target,
            "drawPoints",
            &[
                js_sys::Float32Array::from(pass.indices.coords()).into(),
                options.into(),
                uniforms_object(uniforms).into(),
            ],
        );
    }

    fn draw_reticle(&mut self, position: [f32; 2], color: crate::colors::Rgba, uniforms: &FrameUniforms) {
        call(
            &self.target,
            "drawReticle",
            &[
                js_sys::Float32Array::from(&position[..]).into(),
                js_sys::Float32Array::from(&color.0[..]).into(),
                uniforms_object(uniforms).into(),
            ],
        );
    }

    fn end_frame(&mut self) {
        call(&self.target, "endFrame", &[]);
    }

    fn destroy(&mut self) {
        call(&self.target, "destroy", &[]);
    }
}

/// A [`LinePrimitive`] keeping the vertex data on the CPU and handing it to
/// a JS object for drawing.
struct JsLines {
    inner: LineBuffers,
    target: js_sys::Object,
    name: &'static str,
}

impl JsLines {
    fn new(target: js_sys::Object, name: &'static str) -> Self {
        Self {
            inner: LineBuffers::new(LineStyle::default()),
            target,
            name,
        }
    }
}

impl LinePrimitive for JsLines {
    fn set_points(&mut self, lines: Vec<Vec<f32>>, attributes: LineAttributes) {
        self.inner.set_points(lines, attributes);
    }

    fn set_style(&mut self, style: LineStyle) {
        self.inner.set_style(style);
    }

    fn style(&self) -> &LineStyle {
        self.inner.style()
    }

    fn data(&self) -> &LineData {
        self.inner.data()
    }

    fn opacities_mut(&mut self) -> &mut [f32] {
        self.inner.opacities_mut()
    }

    fn upload_opacities(&mut self, range: Range<usize>) {
        self.inner.upload_opacities(range);
    }

    fn draw(&mut self, transform: &ViewTransform) {
        self.inner.draw(transform);
        if self.inner.is_empty() {
            return;
        }

        let data = self.inner.data();
        let lines = data
            .lines
            .iter()
            .map(|line| JsValue::from(js_sys::Float32Array::from(&line[..])))
            .collect::<js_sys::Array>();
        let colors = self
            .inner
            .style()
            .colors
            .iter()
            .flat_map(|c| c.0)
            .collect::<Vec<_>>();
        let mvp = transform.model_view_projection().to_cols_array();

        call(
            &self.target,
            "drawLines",
            &[
                self.name.into(),
                lines.into(),
                js_sys::Float32Array::from(&data.color_indices[..]).into(),
                js_sys::Float32Array::from(&data.opacities[..]).into(),
                js_sys::Float32Array::from(&data.widths[..]).into(),
                js_sys::Float32Array::from(&colors[..]).into(),
                js_sys::Float32Array::from(&mvp[..]).into(),
            ],
        );
    }

    fn clear(&mut self) {
        self.inner.clear();
    }

    fn destroy(&mut self) {
        self.inner.destroy();
    }
}

/// Builder of a set of property changes.
#[wasm_bindgen]
#[derive(Debug, Default)]
pub struct PropertiesBuilder {
    update: PropertiesUpdate,
}

fn css_list(colors: Vec<String>) -> Vec<ColorQuery<'static>> {
    colors.into_iter().map(css).collect()
}

/// Setters storing their converted argument in the update.
macro_rules! setters {
    ($($js:ident => $name:ident($field:ident: $ty:ty) $convert:expr;)*) => {
        #[wasm_bindgen]
        impl PropertiesBuilder {
            $(
                #[wasm_bindgen(js_name = $js)]
                pub fn $name(&mut self, value: $ty) {
                    self.update.$field = Some($convert(value));
                }
            )*
        }
    };
}

setters! {
    setBackgroundColor => set_background_color(background_color: String) css;
    setBackgroundImage => set_background_image(background_image: Option<String>) identity;
    setPointColor => set_point_color(point_color: Vec<String>) css_list;
    setPointColorActive => set_point_color_active(point_color_active: Vec<String>) css_list;
    setPointColorHover => set_point_color_hover(point_color_hover: Vec<String>) css_list;
    setPointSize => set_point_size(point_size: Box<[f32]>) Vec::from;
    setPointSizeSelected => set_point_size_selected(point_size_selected: f32) identity;
    setPointOutlineWidth => set_point_outline_width(point_outline_width: f32) identity;
    setOpacity => set_opacity(opacity: Box<[f32]>) Vec::from;
    setShowPointConnections => set_show_point_connections(show_point_connections: bool) identity;
    setPointConnectionColor => set_point_connection_color(point_connection_color: Vec<String>) css_list;
    setPointConnectionOpacity => set_point_connection_opacity(point_connection_opacity: Box<[f32]>) Vec::from;
    setPointConnectionSize => set_point_connection_size(point_connection_size: Box<[f32]>) Vec::from;
    setShowReticle => set_show_reticle(show_reticle: bool) identity;
    setReticleColor => set_reticle_color(reticle_color: String) css;
    setSelectColor => set_select_color(select_color: String) css;
    setSelectOnLongPress => set_select_on_long_press(select_on_long_press: bool) identity;
    setSelectInitiator => set_select_initiator(select_initiator: bool) identity;
    setCameraIsFixed => set_camera_is_fixed(camera_is_fixed: bool) identity;
    setAspectRatio => set_aspect_ratio(aspect_ratio: f32) identity;
    setPerformanceMode => set_performance_mode(performance_mode: bool) identity;
    setSyncEvents => set_sync_events(sync_events: bool) identity;
    setAnnotationLineColor => set_annotation_line_color(annotation_line_color: String) css;
    setAnnotationLineWidth => set_annotation_line_width(annotation_line_width: f32) identity;
}

#[wasm_bindgen]
impl PropertiesBuilder {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Default::default()
    }

    #[wasm_bindgen(js_name = setColorBy)]
    pub fn set_color_by(&mut self, name: Option<String>) {
        self.update.color_by = Some(EncodingBy::parse(name.as_deref(), AllowedModes::POINTS));
    }

    #[wasm_bindgen(js_name = setSizeBy)]
    pub fn set_size_by(&mut self, name: Option<String>) {
        self.update.size_by = Some(EncodingBy::parse(name.as_deref(), AllowedModes::POINTS));
    }

    #[wasm_bindgen(js_name = setOpacityBy)]
    pub fn set_opacity_by(&mut self, name: Option<String>) {
        self.update.opacity_by = Some(EncodingBy::parse(
            name.as_deref(),
            AllowedModes::POINT_OPACITY,
        ));
    }

    #[wasm_bindgen(js_name = setPointConnectionColorBy)]
    pub fn set_point_connection_color_by(&mut self, name: Option<String>) {
        self.update.point_connection_color_by =
            Some(EncodingBy::parse(name.as_deref(), AllowedModes::CONNECTIONS));
    }

    #[wasm_bindgen(js_name = setSelectionType)]
    pub fn set_selection_type(&mut self, name: &str) -> Result<(), JsValue> {
        self.update.selection_type = Some(name.parse().map_err(js_error)?);
        Ok(())
    }

    #[wasm_bindgen(js_name = setSelectClearPolicy)]
    pub fn set_select_clear_policy(&mut self, name: &str) {
        match SelectClearPolicy::from_name(name) {
            Some(policy) => self.update.select_clear_policy = Some(policy),
            None => log::warn!("unknown selection clear policy '{name}'"),
        }
    }

    #[wasm_bindgen(js_name = setMouseMode)]
    pub fn set_mouse_mode(&mut self, name: &str) {
        match MouseMode::from_name(name) {
            Some(mode) => self.update.mouse_mode = Some(mode),
            None => log::warn!("unknown mouse mode '{name}'"),
        }
    }

    /// Sets the width in CSS pixels, `undefined` follows the canvas.
    #[wasm_bindgen(js_name = setWidth)]
    pub fn set_width(&mut self, width: Option<f32>) {
        self.update.width = Some(width.map_or(Size::Auto, Size::Fixed));
    }

    #[wasm_bindgen(js_name = setHeight)]
    pub fn set_height(&mut self, height: Option<f32>) {
        self.update.height = Some(height.map_or(Size::Auto, Size::Fixed));
    }
}

/// Options of a draw call.
#[wasm_bindgen]
#[derive(Debug, Default)]
pub struct DrawOptionsBuilder {
    options: DrawOptions,
}

#[wasm_bindgen]
impl DrawOptionsBuilder {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Default::default()
    }

    #[wasm_bindgen(js_name = setTransition)]
    pub fn set_transition(&mut self, duration: Option<f64>, easing: Option<String>) {
        self.options.transition = true;
        self.options.transition_duration = duration;
        self.options.transition_easing = easing.as_deref().and_then(Easing::from_name);
    }

    #[wasm_bindgen(js_name = setPreventFilterReset)]
    pub fn set_prevent_filter_reset(&mut self, prevent: bool) {
        self.options.prevent_filter_reset = prevent;
    }

    pub fn hover(&mut self, idx: u32) {
        self.options.hover = Some(idx as usize);
    }

    pub fn select(&mut self, indices: Box<[u32]>) {
        self.options.select = Some(indices.iter().map(|&i| i as usize).collect());
    }

    pub fn filter(&mut self, indices: Box<[u32]>) {
        self.options.filter = Some(indices.iter().map(|&i| i as usize).collect());
    }

    #[wasm_bindgen(js_name = setDataTypes)]
    pub fn set_data_types(&mut self, z: Option<String>, w: Option<String>) {
        self.options.z_data_type = z.as_deref().and_then(DataType::from_name);
        self.options.w_data_type = w.as_deref().and_then(DataType::from_name);
    }

    #[wasm_bindgen(js_name = showPointConnectionsOnce)]
    pub fn show_point_connections_once(&mut self) {
        self.options.show_point_connections_once = true;
    }

    #[wasm_bindgen(js_name = showReticleOnce)]
    pub fn show_reticle_once(&mut self) {
        self.options.show_reticle_once = true;
    }
}

/// Builder of a list of annotations.
#[wasm_bindgen]
#[derive(Debug, Default)]
pub struct AnnotationsBuilder {
    annotations: Vec<Annotation>,
}

fn annotation_style(color: Option<String>, width: Option<f32>) -> AnnotationStyle {
    AnnotationStyle {
        line_color: color.map(css),
        line_width: width,
    }
}

#[wasm_bindgen]
impl AnnotationsBuilder {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Default::default()
    }

    #[wasm_bindgen(js_name = addHLine)]
    pub fn add_hline(&mut self, y: f32, x1: Option<f32>, x2: Option<f32>, color: Option<String>, width: Option<f32>) {
        self.annotations.push(Annotation::HLine {
            y,
            x1,
            x2,
            style: annotation_style(color, width),
        });
    }

    #[wasm_bindgen(js_name = addVLine)]
    pub fn add_vline(&mut self, x: f32, y1: Option<f32>, y2: Option<f32>, color: Option<String>, width: Option<f32>) {
        self.annotations.push(Annotation::VLine {
            x,
            y1,
            y2,
            style: annotation_style(color, width),
        });
    }

    #[wasm_bindgen(js_name = addRect)]
    pub fn add_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Option<String>, line_width: Option<f32>) {
        self.annotations.push(Annotation::DomRect {
            x,
            y,
            width,
            height,
            style: annotation_style(color, line_width),
        });
    }

    #[wasm_bindgen(js_name = addPolygon)]
    pub fn add_polygon(&mut self, vertices: Box<[f32]>, color: Option<String>, width: Option<f32>) {
        self.annotations.push(Annotation::Polygon {
            vertices: vertices.chunks_exact(2).map(|v| [v[0], v[1]]).collect(),
            style: annotation_style(color, width),
        });
    }
}

fn pointer_input(event: &web_sys::MouseEvent) -> PointerInput {
    PointerInput {
        position: Vec2::new(event.offset_x() as f32, event.offset_y() as f32),
        time: now(),
        modifiers: Modifiers {
            alt: event.alt_key(),
            ctrl: event.ctrl_key(),
            meta: event.meta_key(),
            shift: event.shift_key(),
        },
        buttons: event.buttons(),
    }
}

fn zoom_options(transition: bool, duration: Option<f64>) -> ZoomOptions {
    ZoomOptions {
        transition,
        transition_duration: duration,
        ..Default::default()
    }
}

pub enum Event {
    Exit,
    Resize {
        width: u32,
        height: u32,
        device_pixel_ratio: f32,
    },
    Frame {
        completion: Sender<bool>,
    },
    Draw {
        points: Box<[f32]>,
        stride: usize,
        options: DrawOptions,
        completion: Sender<Completion>,
    },
    Set {
        update: PropertiesUpdate,
        completion: Sender<Completion>,
    },
    Select {
        indices: Vec<usize>,
        merge: bool,
    },
    Deselect,
    Hover {
        idx: Option<usize>,
        show_reticle_once: bool,
    },
    Filter {
        indices: Vec<usize>,
        completion: Sender<Completion>,
    },
    Unfilter {
        completion: Sender<Completion>,
    },
    ZoomToPoints {
        indices: Vec<usize>,
        options: ZoomOptions,
        completion: Sender<Completion>,
    },
    ZoomToArea {
        rect: [f32; 4],
        options: ZoomOptions,
        completion: Sender<Completion>,
    },
    Reset {
        options: ZoomOptions,
        completion: Sender<Completion>,
    },
    DrawAnnotations {
        annotations: Vec<Annotation>,
        completion: Sender<Completion>,
    },
    Subscribe {
        kind: NotificationKind,
        callback: js_sys::Function,
        times: Option<usize>,
    },
    MouseDown {
        event: web_sys::MouseEvent,
    },
    MouseUp {
        event: web_sys::MouseEvent,
    },
    MouseMove {
        event: web_sys::MouseEvent,
    },
    Click {
        event: web_sys::MouseEvent,
    },
    DblClick {
        event: web_sys::MouseEvent,
    },
    Wheel {
        event: web_sys::WheelEvent,
    },
    KeyUp {
        event: web_sys::KeyboardEvent,
    },
    MouseEnter,
    MouseLeave,
    Blur,
    Destroy,
}

/// An event queue to interact with the plot.
#[wasm_bindgen]
pub struct EventQueue {
    sender: Sender<Event>,
}

impl EventQueue {
    fn send(&self, event: Event) {
        self.sender
            .send_blocking(event)
            .expect("the channel should be open");
    }

    async fn request(&self, event: impl FnOnce(Sender<Completion>) -> Event) -> Result<(), JsValue> {
        let (sx, rx) = async_channel::bounded(1);
        self.sender
            .send(event(sx))
            .await
            .expect("the channel should be open when trying to send a message");

        let completion = rx.recv().await.expect("the channel should be open");
        completion.wait().await.map_err(js_error)
    }
}

#[wasm_bindgen]
impl EventQueue {
    /// Spawns an event to shut down the event loop.
    pub fn exit(&self) {
        self.send(Event::Exit);
    }

    /// Spawns a `resize` event.
    pub fn resize(&self, width: u32, height: u32, device_pixel_ratio: f32) {
        self.send(Event::Resize {
            width,
            height,
            device_pixel_ratio,
        });
    }

    /// Advances the plot by one animation frame. Resolves to whether a frame
    /// was drawn.
    pub async fn frame(&self) -> bool {
        let (sx, rx) = async_channel::bounded(1);
        self.sender
            .send(Event::Frame { completion: sx })
            .await
            .expect("the channel should be open when trying to send a message");
        rx.recv().await.unwrap_or(false)
    }

    /// Draws points given as flat data with `stride` values per point.
    pub async fn draw(&self, points: Box<[f32]>, stride: usize, options: Option<DrawOptionsBuilder>) -> Result<(), JsValue> {
        let options = options.map(|o| o.options).unwrap_or_default();
        self.request(|completion| Event::Draw {
            points,
            stride,
            options,
            completion,
        })
        .await
    }

    pub async fn set(&self, properties: PropertiesBuilder) -> Result<(), JsValue> {
        self.request(|completion| Event::Set {
            update: properties.update,
            completion,
        })
        .await
    }

    pub fn select(&self, indices: Box<[u32]>, merge: bool) {
        self.send(Event::Select {
            indices: indices.iter().map(|&i| i as usize).collect(),
            merge,
        });
    }

    pub fn deselect(&self) {
        self.send(Event::Deselect);
    }

    pub fn hover(&self, idx: Option<u32>, show_reticle_once: bool) {
        self.send(Event::Hover {
            idx: idx.map(|i| i as usize),
            show_reticle_once,
        });
    }

    pub async fn filter(&self, indices: Box<[u32]>) -> Result<(), JsValue> {
        let indices = indices.iter().map(|&i| i as usize).collect();
        self.request(|completion| Event::Filter { indices, completion })
            .await
    }

    pub async fn unfilter(&self) -> Result<(), JsValue> {
        self.request(|completion| Event::Unfilter { completion })
            .await
    }

    #[wasm_bindgen(js_name = zoomToPoints)]
    pub async fn zoom_to_points(&self, indices: Box<[u32]>, padding: f32, transition: bool) -> Result<(), JsValue> {
        let indices = indices.iter().map(|&i| i as usize).collect();
        let options = ZoomOptions {
            padding,
            ..zoom_options(transition, None)
        };
        self.request(|completion| Event::ZoomToPoints {
            indices,
            options,
            completion,
        })
        .await
    }

    #[wasm_bindgen(js_name = zoomToArea)]
    pub async fn zoom_to_area(&self, x: f32, y: f32, width: f32, height: f32, transition: bool) -> Result<(), JsValue> {
        self.request(|completion| Event::ZoomToArea {
            rect: [x, y, width, height],
            options: zoom_options(transition, None),
            completion,
        })
        .await
    }

    pub async fn reset(&self, transition: bool) -> Result<(), JsValue> {
        self.request(|completion| Event::Reset {
            options: zoom_options(transition, None),
            completion,
        })
        .await
    }

    #[wasm_bindgen(js_name = drawAnnotations)]
    pub async fn draw_annotations(&self, annotations: AnnotationsBuilder) -> Result<(), JsValue> {
        self.request(|completion| Event::DrawAnnotations {
            annotations: annotations.annotations,
            completion,
        })
        .await
    }

    /// Registers a callback for the notification `name`.
    pub fn subscribe(&self, name: &str, callback: js_sys::Function, times: Option<u32>) -> Result<(), JsValue> {
        let kind = NotificationKind::from_name(name)
            .ok_or_else(|| JsValue::from_str(&format!("unknown event '{name}'")))?;
        self.send(Event::Subscribe {
            kind,
            callback,
            times: times.map(|t| t as usize),
        });
        Ok(())
    }

    #[wasm_bindgen(js_name = mouseDown)]
    pub fn mouse_down(&self, event: web_sys::MouseEvent) {
        self.send(Event::MouseDown { event });
    }

    #[wasm_bindgen(js_name = mouseUp)]
    pub fn mouse_up(&self, event: web_sys::MouseEvent) {
        self.send(Event::MouseUp { event });
    }

    #[wasm_bindgen(js_name = mouseMove)]
    pub fn mouse_move(&self, event: web_sys::MouseEvent) {
        self.send(Event::MouseMove { event });
    }

    pub fn click(&self, event: web_sys::MouseEvent) {
        self.send(Event::Click { event });
    }

    #[wasm_bindgen(js_name = dblClick)]
    pub fn dbl_click(&self, event: web_sys::MouseEvent) {
        self.send(Event::DblClick { event });
    }

    pub fn wheel(&self, event: web_sys::WheelEvent) {
        self.send(Event::Wheel { event });
    }

    #[wasm_bindgen(js_name = keyUp)]
    pub fn key_up(&self, event: web_sys::KeyboardEvent) {
        self.send(Event::KeyUp { event });
    }

    #[wasm_bindgen(js_name = mouseEnter)]
    pub fn mouse_enter(&self) {
        self.send(Event::MouseEnter);
    }

    #[wasm_bindgen(js_name = mouseLeave)]
    pub fn mouse_leave(&self) {
        self.send(Event::MouseLeave);
    }

    pub fn blur(&self) {
        self.send(Event::Blur);
    }

    pub fn destroy(&self) {
        self.send(Event::Destroy);
    }
}

/// A scatterplot driven from JS.
#[wasm_bindgen]
pub struct Plot {
    plot: Scatterplot,
    event_queue: Option<Receiver<Event>>,
}

#[wasm_bindgen]
impl Plot {
    /// Constructs a new plot drawing through the methods of `renderer`.
    #[wasm_bindgen(constructor)]
    pub fn new(renderer: js_sys::Object, properties: Option<PropertiesBuilder>) -> Self {
        init_logging_once();

        let collaborators = Collaborators {
            renderer: Box::new(JsRenderer {
                target: renderer.clone(),
            }),
            connection_lines: Box::new(JsLines::new(renderer.clone(), "pointConnections")),
            annotation_lines: Box::new(JsLines::new(renderer.clone(), "annotations")),
            selection_outline: Box::new(JsLines::new(renderer, "selectionOutline")),
            ..Default::default()
        };
        let update = properties.map(|p| p.update).unwrap_or_default();

        Self {
            plot: Scatterplot::new(collaborators, update),
            event_queue: None,
        }
    }

    /// Constructs a new event queue for this plot.
    ///
    /// # Panics
    ///
    /// Panics if called multiple times.
    #[wasm_bindgen(js_name = constructEventQueue)]
    pub fn construct_event_queue(&mut self) -> EventQueue {
        if self.event_queue.is_some() {
            panic!("EventQueue was already constructed.");
        }

        let (sx, rx) = async_channel::unbounded();
        self.event_queue = Some(rx);
        EventQueue { sender: sx }
    }

    /// Starts the event loop of the plot.
    ///
    /// # Panics
    ///
    /// Panics if no [`EventQueue`] is associated with the plot.
    #[wasm_bindgen(js_name = enterEventLoop)]
    pub async fn enter_event_loop(&mut self) {
        let Some(events) = self.event_queue.take() else {
            panic!("EventQueue was not initialized.");
        };

        loop {
            let Ok(event) = events.recv().await else {
                break;
            };

            match event {
                Event::Exit => break,
                Event::Resize {
                    width,
                    height,
                    device_pixel_ratio,
                } => {
                    let _ = self
                        .plot
                        .resize(width as f32, height as f32, device_pixel_ratio);
                }
                Event::Frame { completion } => {
                    let drawn = self.plot.frame(now());
                    let _ = completion.send(drawn).await;
                }
                Event::Draw {
                    points,
                    stride,
                    options,
                    completion,
                } => {
                    let input = PointsInput::from_flat(&points, stride);
                    let _ = completion.send(self.plot.draw(input, options)).await;
                }
                Event::Set { update, completion } => {
                    let _ = completion.send(self.plot.set(update)).await;
                }
                Event::Select { indices, merge } => {
                    let options = SelectOptions {
                        merge,
                        prevent_event: false,
                    };
                    if let Err(e) = self.plot.select(&indices, options) {
                        log::warn!("{e}");
                    }
                }
                Event::Deselect => {
                    if let Err(e) = self.plot.deselect(false) {
                        log::warn!("{e}");
                    }
                }
                Event::Hover {
                    idx,
                    show_reticle_once,
                } => {
                    let options = HoverOptions {
                        show_reticle_once,
                        prevent_event: false,
                    };
                    if let Err(e) = self.plot.hover(idx, options) {
                        log::warn!("{e}");
                    }
                }
                Event::Filter {
                    indices,
                    completion,
                } => {
                    let _ = completion.send(self.plot.filter(&indices, false)).await;
                }
                Event::Unfilter { completion } => {
                    let _ = completion.send(self.plot.unfilter(false)).await;
                }
                Event::ZoomToPoints {
                    indices,
                    options,
                    completion,
                } => {
                    let _ = completion
                        .send(self.plot.zoom_to_points(&indices, options))
                        .await;
                }
                Event::ZoomToArea {
                    rect,
                    options,
                    completion,
                } => {
                    let _ = completion
                        .send(self.plot.zoom_to_area(rect, options))
                        .await;
                }
                Event::Reset {
                    options,
                    completion,
                } => {
                    let _ = completion.send(self.plot.reset(options)).await;
                }
                Event::DrawAnnotations {
                    annotations,
                    completion,
                } => {
                    let _ = completion
                        .send(self.plot.draw_annotations(annotations))
                        .await;
                }
                Event::Subscribe {
                    kind,
                    callback,
                    times,
                } => {
                    let _ = self.plot.subscribe(
                        kind,
                        move |notification| {
                            let payload = notification_object(notification);
                            if let Err(e) = callback.call1(&JsValue::NULL, &payload) {
                                log::error!("notification callback failed: {e:?}");
                            }
                        },
                        times,
                    );
                }
                Event::MouseDown { event } => self.plot.mouse_down(pointer_input(&event)),
                Event::MouseUp { event } => self.plot.mouse_up(pointer_input(&event)),
                Event::MouseMove { event } => self.plot.mouse_move(pointer_input(&event)),
                Event::Click { event } => self.plot.click(pointer_input(&event)),
                Event::DblClick { event } => self.plot.dbl_click(pointer_input(&event)),
                Event::Wheel { event } => {
                    let delta_y = event.delta_y() as f32;
                    self.plot.wheel(pointer_input(&event), delta_y);
                }
                Event::KeyUp { event } => self.plot.key_up(&event.key()),
                Event::MouseEnter => self.plot.mouse_enter(),
                Event::MouseLeave => self.plot.mouse_leave(),
                Event::Blur => self.plot.blur(),
                Event::Destroy => {
                    self.plot.destroy();
                    break;
                }
            }
        }

        self.event_queue = Some(events);
    }
}
