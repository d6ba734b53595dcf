use std::collections::VecDeque;

use async_channel::TryRecvError;
use glam::{Mat4, Vec2};

pub mod annotations;
pub mod camera;
pub mod colors;
pub mod completion;
pub mod connections;
pub mod constants;
pub mod encoding;
pub mod error;
pub mod event;
pub mod gesture;
pub mod hit_test;
pub mod interaction;
pub mod lerp;
pub mod lines;
pub mod notify;
pub mod options;
pub mod point;
pub mod properties;
pub mod render;
pub mod scale;
pub mod selection;
pub mod spatial;
pub mod textures;
pub mod transition;

mod wasm_bridge;

pub use crate::{
    completion::Completion,
    error::{PlotError, Result},
    options::{DrawOptions, HoverOptions, SelectOptions, ZoomOptions},
    properties::{Properties, PropertiesUpdate},
};

use crate::{
    annotations::{Annotation, AnnotationDefaults, AnnotationLines},
    camera::{Camera, Camera2d},
    completion::Waiter,
    connections::{
        group_points, ConnectionEncoding, ConnectionState, CurveFitter, CurveMap, CurveOptions,
        PointConnections, PolylineFitter,
    },
    constants::{DEFAULT_HEIGHT, DEFAULT_POINT_CONNECTION_OPACITY, DEFAULT_POINT_SIZE, DEFAULT_WIDTH},
    encoding::{density_opacity, min_point_scale, multiplicator, point_scale, DensityParams, EncodingBy},
    event::Event,
    gesture::{GestureOptions, SelectionManager, SelectionType},
    hit_test::{ndc_to_pixel, nearest_point, pixel_to_ndc, points_in_polygon, ViewTransform},
    interaction::{Effect, Interaction, InteractionConfig, PointerInput},
    lerp::Easing,
    lines::{LineAttributes, LineBuffers, LinePrimitive, LineStyle},
    notify::{EventBus, Notification, NotificationKind, Subscription, ViewInfo},
    point::{Channel, DataType, PointSet, PointsInput},
    properties::{SelectClearPolicy, Size},
    render::{plan_frame, DrawStep, FrameContent, FrameUniforms, NullRenderer, PassStyle, PointPass, Renderer},
    selection::{SelectOutcome, SelectionState},
    spatial::{BoxedIndex, Pending, RTreeIndexBuilder, SpatialIndexBuilder},
    textures::{color_groups, create_color_texture, create_encoding_texture, IndexBuffer, StateTexture},
    transition::TransitionScheduler,
};

/// Pixel slack added to the point size when hit-testing the pointer.
const POINTER_SLACK: f32 = 4.0;

/// The external components driven by the plot.
pub struct Collaborators {
    pub renderer: Box<dyn Renderer>,
    pub camera: Box<dyn Camera>,
    pub spatial_index: Box<dyn SpatialIndexBuilder>,
    pub curve_fitter: Box<dyn CurveFitter>,
    pub connection_lines: Box<dyn LinePrimitive>,
    pub annotation_lines: Box<dyn LinePrimitive>,
    pub selection_outline: Box<dyn LinePrimitive>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            renderer: Box::new(NullRenderer::default()),
            camera: Box::new(Camera2d::default()),
            spatial_index: Box::new(RTreeIndexBuilder),
            curve_fitter: Box::new(PolylineFitter),
            connection_lines: Box::new(LineBuffers::new(LineStyle::default())),
            annotation_lines: Box::new(LineBuffers::new(LineStyle::default())),
            selection_outline: Box::new(LineBuffers::new(LineStyle::default())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Canvas {
    width: f32,
    height: f32,
    device_pixel_ratio: f32,
}

/// Throttled and debounced count of the visible points inside the viewport.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct DensityCounter {
    num_points_in_view: usize,
    last_count: Option<f64>,
    pending: bool,
}

/// Work resolved once a draw reflecting it completed.
#[derive(Debug, Default)]
struct AfterDraw {
    notification: Option<Notification>,
    waiter: Option<Waiter>,
}

impl AfterDraw {
    fn resolve(waiter: Waiter) -> Self {
        Self {
            notification: None,
            waiter: Some(waiter),
        }
    }
}

/// Last stage of a draw call.
#[derive(Debug)]
struct FinishDraw {
    transition: Option<(f64, Easing)>,
    show_reticle_once: bool,
    waiter: Waiter,
}

#[derive(Debug)]
enum FollowUp {
    Finish(FinishDraw),
    AfterDraw(AfterDraw),
}

struct DrawRequest {
    points: PointSet,
    keep_filter: bool,
    hover: Option<usize>,
    select: Option<Vec<usize>>,
    filter: Option<Vec<usize>>,
    show_point_connections_once: bool,
    finish: FinishDraw,
}

/// A stage of the asynchronous pipeline. Only the front job is polled.
enum Job {
    LoadPoints {
        index: Pending<BoxedIndex>,
        request: DrawRequest,
    },
    FitConnections {
        curves: Pending<CurveMap>,
        follow_up: FollowUp,
    },
}

/// An interactive scatterplot.
///
/// The host calls [`Scatterplot::frame`] once per animation frame and
/// forwards pointer and keyboard input. Operations whose effect becomes
/// visible later return a [`Completion`].
pub struct Scatterplot {
    properties: Properties,

    renderer: Box<dyn Renderer>,
    camera: Box<dyn Camera>,
    spatial_index_builder: Box<dyn SpatialIndexBuilder>,
    curve_fitter: Box<dyn CurveFitter>,
    connection_lines: Box<dyn LinePrimitive>,
    annotation_lines: Box<dyn LinePrimitive>,
    selection_outline: Box<dyn LinePrimitive>,

    points: PointSet,
    state: StateTexture,
    spatial_index: Option<BoxedIndex>,
    points_drawn: bool,
    normal_indices: IndexBuffer,
    selected_indices: IndexBuffer,
    hovered_indices: IndexBuffer,
    selection: SelectionState,

    connections: PointConnections,
    curves: CurveMap,
    annotations: Vec<Annotation>,

    transition: TransitionScheduler,
    transition_waiters: Vec<Waiter>,
    reticle_once_after_transition: bool,

    interaction: Interaction,
    gesture: SelectionManager,
    lasso_polygon: Vec<[f32; 2]>,

    canvas: Canvas,
    initial_camera: (Vec2, f32, f32),
    density: DensityCounter,

    bus: EventBus,
    events: Event,
    jobs: VecDeque<Job>,
    after_draw: Vec<AfterDraw>,
    reticle_once: bool,
    prevent_view_event: bool,
    last_frame: Vec<DrawStep>,
    now: f64,
    destroyed: bool,
}

impl Default for Scatterplot {
    fn default() -> Self {
        Self::new(Collaborators::default(), PropertiesUpdate::default())
    }
}

impl std::fmt::Debug for Scatterplot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scatterplot")
            .field("num_points", &self.points.len())
            .field("points_drawn", &self.points_drawn)
            .field("selection", &self.selection)
            .field("transition", &self.transition.is_transitioning())
            .field("jobs", &self.jobs.len())
            .field("events", &self.events)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

impl Scatterplot {
    /// Constructs a new plot.
    pub fn new(collaborators: Collaborators, update: PropertiesUpdate) -> Self {
        let Collaborators {
            renderer,
            camera,
            spatial_index,
            curve_fitter,
            connection_lines,
            annotation_lines,
            selection_outline,
        } = collaborators;

        let mut properties = Properties::default();
        properties.apply(update);

        let initial_camera = (camera.target(), camera.distance(), camera.rotation());
        let gesture = SelectionManager::new(properties.selection_type, gesture_options(&properties));
        let bus = EventBus::new(properties.sync_events);
        let state = StateTexture::new(&[]);

        let mut this = Self {
            properties,
            renderer,
            camera,
            spatial_index_builder: spatial_index,
            curve_fitter,
            connection_lines,
            annotation_lines,
            selection_outline,
            points: PointSet::default(),
            state,
            spatial_index: None,
            points_drawn: false,
            normal_indices: IndexBuffer::default(),
            selected_indices: IndexBuffer::default(),
            hovered_indices: IndexBuffer::default(),
            selection: SelectionState::new(0),
            connections: PointConnections::default(),
            curves: CurveMap::new(),
            annotations: Vec::new(),
            transition: TransitionScheduler::default(),
            transition_waiters: Vec::new(),
            reticle_once_after_transition: false,
            interaction: Interaction::default(),
            gesture,
            lasso_polygon: Vec::new(),
            canvas: Canvas {
                width: DEFAULT_WIDTH,
                height: DEFAULT_HEIGHT,
                device_pixel_ratio: 1.0,
            },
            initial_camera,
            density: DensityCounter::default(),
            bus,
            events: Event::NONE,
            jobs: VecDeque::new(),
            after_draw: Vec::new(),
            reticle_once: false,
            prevent_view_event: false,
            last_frame: Vec::new(),
            now: 0.0,
            destroyed: false,
        };

        this.camera.set_fixed(this.properties.camera_is_fixed);
        this.renderer.upload_state(&this.state);
        this.update_encodings();
        this.update_scale_ranges();
        this.selection_outline.set_style(this.outline_style());
        this.events.signal(Event::REDRAW);
        this.bus.publish(Notification::Init);
        this
    }

    /// Advances the plot to `now` (milliseconds) and draws a frame if
    /// anything changed. Returns whether a frame was drawn.
    pub fn frame(&mut self, now: f64) -> bool {
        if self.destroyed {
            return false;
        }
        self.now = now;

        self.bus.flush();
        self.poll_jobs();

        let effects = self.interaction.tick(now);
        self.apply_effects(effects, self.pointer_input(now));

        let mut view_changed =
            self.camera.tick() || self.events.signaled_any(&[Event::VIEW_CHANGE, Event::RESIZE]);
        let transitioning = self.transition.is_transitioning();
        if transitioning {
            if let Some(step) = self.transition.tween(now, &self.state) {
                if let Some((target, distance)) = step.camera {
                    let rotation = self.camera.rotation();
                    self.camera.look_at(target, distance, rotation);
                }
                if step.finished {
                    self.end_transition();
                }
            }
            view_changed |= self.camera.tick();
        }

        if view_changed {
            self.update_scales();
            self.request_density_count(now);
        }
        self.debounce_density_count(now);

        if self.events.is_empty() && !transitioning {
            self.bus.flush();
            return false;
        }

        self.render();

        let info = self.view_info();
        if view_changed && !std::mem::take(&mut self.prevent_view_event) {
            self.bus.publish(Notification::View(info));
        }

        self.events.clear();
        self.reticle_once = false;

        self.bus.publish_sync(Notification::Drawing(info));
        self.bus.publish(Notification::Draw(info));
        for after in std::mem::take(&mut self.after_draw) {
            if let Some(notification) = after.notification {
                self.bus.publish(notification);
            }
            if let Some(waiter) = after.waiter {
                waiter.resolve();
            }
        }
        self.bus.flush();

        true
    }

    pub fn subscribe(
        &mut self,
        kind: NotificationKind,
        callback: impl FnMut(&Notification) + 'static,
        times: Option<usize>,
    ) -> Subscription {
        self.bus.subscribe(kind, Box::new(callback), times)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) {
        self.bus.unsubscribe(subscription);
    }

    /// Destroys the plot. Pending operations resolve quietly, later calls
    /// fail with [`PlotError::AlreadyDestroyed`].
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        log::debug!("destroying plot with {} points", self.points.len());

        self.bus.publish_sync(Notification::Destroy);
        self.bus.clear();

        self.jobs.clear();
        self.after_draw.clear();
        self.transition_waiters.clear();
        self.transition.end();

        self.spatial_index = None;
        self.points = PointSet::default();
        self.selection = SelectionState::new(0);
        self.connections.clear();
        self.curves.clear();

        self.renderer.destroy();
        self.connection_lines.destroy();
        self.annotation_lines.destroy();
        self.selection_outline.destroy();
    }

    fn check_alive(&self) -> Result<()> {
        if self.destroyed {
            Err(PlotError::AlreadyDestroyed)
        } else {
            Ok(())
        }
    }

    /// A completion resolved after the next draw.
    fn next_draw(&mut self, event: Event) -> Completion {
        let (waiter, completion) = Completion::pending();
        self.events.signal(event);
        self.after_draw.push(AfterDraw::resolve(waiter));
        completion
    }
}

// Getters
impl Scatterplot {
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn points(&self) -> &PointSet {
        &self.points
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    pub fn selected_points(&self) -> &[usize] {
        self.selection.selected()
    }

    /// The visible points while a filter is active.
    pub fn filtered_points(&self) -> Option<&[usize]> {
        self.selection.filtered()
    }

    pub fn is_filtered(&self) -> bool {
        self.selection.is_filtered()
    }

    pub fn hovered_point(&self) -> Option<usize> {
        self.selection.hovered()
    }

    pub fn is_points_drawn(&self) -> bool {
        self.points_drawn
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_transitioning()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn camera(&self) -> &dyn Camera {
        self.camera.as_ref()
    }

    pub fn state_texture(&self) -> &StateTexture {
        &self.state
    }

    pub fn normal_indices(&self) -> &IndexBuffer {
        &self.normal_indices
    }

    pub fn point_connections(&self) -> &PointConnections {
        &self.connections
    }

    pub fn connection_lines(&self) -> &dyn LinePrimitive {
        self.connection_lines.as_ref()
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn selection_outline(&self) -> &dyn LinePrimitive {
        self.selection_outline.as_ref()
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn gesture(&self) -> &SelectionManager {
        &self.gesture
    }

    pub fn num_points_in_view(&self) -> usize {
        self.density.num_points_in_view
    }

    /// Steps of the last drawn frame.
    pub fn last_frame(&self) -> &[DrawStep] {
        &self.last_frame
    }

    pub fn view_info(&self) -> ViewInfo {
        let domain = |scale: &Option<scale::LinearScale>| {
            scale.as_ref().map(|s| {
                let (start, end) = s.domain();
                [start, end]
            })
        };

        ViewInfo {
            view: self.camera.view(),
            target: self.camera.target(),
            distance: self.camera.distance(),
            rotation: self.camera.rotation(),
            x_domain: domain(&self.properties.x_scale),
            y_domain: domain(&self.properties.y_scale),
        }
    }
}

// Points
impl Scatterplot {
    /// Replaces the points. The completion resolves once the new points are
    /// drawn, or after the transition to them ended.
    pub fn draw(&mut self, points: impl Into<PointsInput>, options: DrawOptions) -> Completion {
        if self.destroyed {
            return Completion::ready(Err(PlotError::AlreadyDestroyed));
        }

        let transition = options.transition();
        let DrawOptions {
            prevent_filter_reset,
            hover,
            select,
            filter,
            z_data_type,
            w_data_type,
            spatial_index,
            show_point_connections_once,
            show_reticle_once,
            ..
        } = options;

        let input: PointsInput = points.into();
        let points = PointSet::new(input.into_points(), z_data_type, w_data_type);
        log::debug!("drawing {} points", points.len());

        let keep_filter = prevent_filter_reset && points.len() == self.selection.num_points();
        let index = match spatial_index {
            Some(index) => spatial::ready(index),
            None => {
                let positions = points.points().iter().map(|p| p.position()).collect();
                let use_worker = self.properties.use_worker(points.len());
                self.spatial_index_builder.build(positions, use_worker)
            }
        };
        self.points_drawn = false;

        let (waiter, completion) = Completion::pending();
        self.jobs.push_back(Job::LoadPoints {
            index,
            request: DrawRequest {
                points,
                keep_filter,
                hover,
                select,
                filter,
                show_point_connections_once,
                finish: FinishDraw {
                    transition,
                    show_reticle_once,
                    waiter,
                },
            },
        });
        completion
    }

    /// Removes all points, connections and annotations.
    pub fn clear(&mut self) -> Completion {
        if self.destroyed {
            return Completion::ready(Err(PlotError::AlreadyDestroyed));
        }
        self.remove_points();
        self.remove_point_connections();
        self.annotations.clear();
        self.encode_annotations();
        self.next_draw(Event::POINTS_CHANGE | Event::ANNOTATIONS_CHANGE)
    }

    pub fn clear_points(&mut self) -> Completion {
        if self.destroyed {
            return Completion::ready(Err(PlotError::AlreadyDestroyed));
        }
        self.remove_points();
        self.remove_point_connections();
        self.next_draw(Event::POINTS_CHANGE)
    }

    pub fn clear_point_connections(&mut self) -> Completion {
        if self.destroyed {
            return Completion::ready(Err(PlotError::AlreadyDestroyed));
        }
        self.remove_point_connections();
        self.next_draw(Event::CONNECTIONS_CHANGE)
    }

    /// Requests a new frame.
    pub fn redraw(&mut self) -> Completion {
        if self.destroyed {
            return Completion::ready(Err(PlotError::AlreadyDestroyed));
        }
        self.next_draw(Event::REDRAW)
    }

    /// Uploads all textures again and redraws.
    pub fn refresh(&mut self) -> Completion {
        if self.destroyed {
            return Completion::ready(Err(PlotError::AlreadyDestroyed));
        }
        self.renderer.upload_state(&self.state);
        self.update_encodings();
        self.next_draw(Event::REDRAW)
    }

    fn remove_points(&mut self) {
        self.points = PointSet::default();
        self.state = StateTexture::new(&[]);
        self.spatial_index = None;
        self.points_drawn = false;
        self.selection.reset(0, false);
        self.renderer.upload_state(&self.state);
        self.update_normal_indices();
        self.update_selected_indices();
        self.update_hovered_indices();
    }

    fn load_points(&mut self, index: BoxedIndex, request: DrawRequest) {
        let DrawRequest {
            points,
            keep_filter,
            hover,
            select,
            filter,
            show_point_connections_once,
            mut finish,
        } = request;

        if finish.transition.is_some() && points.len() != self.points.len() {
            log::warn!(
                "Cannot transition! The number of points between the previous and current draw call must be identical."
            );
            finish.transition = None;
        }
        if finish.transition.is_some() {
            self.transition.cache_points(&self.state);
        }

        self.state = StateTexture::new(points.points());
        self.points = points;
        self.spatial_index = Some(index);
        self.renderer.upload_state(&self.state);
        self.update_encodings();

        self.selection.reset(self.points.len(), keep_filter);
        self.update_normal_indices();
        self.update_selected_indices();
        self.update_hovered_indices();
        self.points_drawn = true;
        self.count_points_in_view(self.now);

        let silent = HoverOptions {
            show_reticle_once: false,
            prevent_event: true,
        };
        if hover.is_some() {
            self.hover_point(hover, silent);
        }
        if let Some(select) = select {
            self.select_points(
                &select,
                SelectOptions {
                    merge: false,
                    prevent_event: true,
                },
            );
        }
        if let Some(filter) = filter {
            self.apply_filter(&filter);
        }

        let draw_connections = self.points.has_connections()
            && (self.properties.show_point_connections || show_point_connections_once);
        if draw_connections {
            self.fit_connections(FollowUp::Finish(finish), true);
        } else {
            self.remove_point_connections();
            self.finish_draw(finish);
        }
    }

    fn finish_draw(&mut self, finish: FinishDraw) {
        match finish.transition {
            Some((duration, easing)) => {
                self.start_transition(duration, easing);
                self.reticle_once_after_transition = finish.show_reticle_once;
                self.transition_waiters.push(finish.waiter);
            }
            None => {
                self.reticle_once = finish.show_reticle_once;
                self.events.signal(Event::POINTS_CHANGE);
                self.after_draw.push(AfterDraw::resolve(finish.waiter));
            }
        }
    }

    fn update_normal_indices(&mut self) {
        self.normal_indices = match self.selection.filtered() {
            Some(filtered) => IndexBuffer::from_indices(&self.state, filtered.iter().copied()),
            None => IndexBuffer::all(&self.state),
        };
    }

    fn update_selected_indices(&mut self) {
        self.selected_indices =
            IndexBuffer::from_indices(&self.state, self.selection.selected().iter().copied());
    }

    fn update_hovered_indices(&mut self) {
        self.hovered_indices = IndexBuffer::from_indices(&self.state, self.selection.hovered());
    }
}

// Asynchronous pipeline
impl Scatterplot {
    fn poll_jobs(&mut self) {
        while let Some(job) = self.jobs.pop_front() {
            match job {
                Job::LoadPoints { index, request } => match index.try_recv() {
                    Ok(index) => self.load_points(index, request),
                    Err(TryRecvError::Empty) => {
                        self.jobs.push_front(Job::LoadPoints { index, request });
                        break;
                    }
                    Err(TryRecvError::Closed) => {
                        log::error!("the spatial index builder dropped the request");
                    }
                },
                Job::FitConnections { curves, follow_up } => match curves.try_recv() {
                    Ok(curves) => self.set_point_connections(curves, follow_up),
                    Err(TryRecvError::Empty) => {
                        self.jobs.push_front(Job::FitConnections { curves, follow_up });
                        break;
                    }
                    Err(TryRecvError::Closed) => {
                        log::error!("the curve fitter dropped the request");
                        self.connections.set_computing(false);
                        self.run_follow_up(follow_up);
                    }
                },
            }
        }
    }

    fn run_follow_up(&mut self, follow_up: FollowUp) {
        match follow_up {
            FollowUp::Finish(finish) => self.finish_draw(finish),
            FollowUp::AfterDraw(after) => {
                self.events.signal(Event::CONNECTIONS_CHANGE);
                self.after_draw.push(after);
            }
        }
    }

    /// Fits the connections of the visible points. Stages of an ongoing draw
    /// run before any queued job.
    fn fit_connections(&mut self, follow_up: FollowUp, urgent: bool) {
        let groups = group_points(&self.points, self.selection.filtered());
        let options = CurveOptions {
            max_points_per_segment: self.properties.point_connection_max_int_points_per_segment,
            tolerance: self.properties.point_connection_tolerance,
        };
        let curves = self.curve_fitter.fit(groups, options);
        self.connections.set_computing(true);

        let job = Job::FitConnections { curves, follow_up };
        if urgent {
            self.jobs.push_front(job);
        } else {
            self.jobs.push_back(job);
        }
    }

    /// Refits the connections if they are shown, then resolves `after` with
    /// the next draw.
    fn refit_connections_then(&mut self, after: AfterDraw) {
        let shown = self.points.has_connections()
            && (self.properties.show_point_connections || !self.connections.is_empty());
        if shown {
            self.fit_connections(FollowUp::AfterDraw(after), false);
        } else {
            self.after_draw.push(after);
        }
    }
}

// Selection
impl Scatterplot {
    pub fn select(&mut self, indices: &[usize], options: SelectOptions) -> Result<()> {
        self.check_alive()?;
        self.select_points(indices, options);
        Ok(())
    }

    pub fn deselect(&mut self, prevent_event: bool) -> Result<()> {
        self.check_alive()?;
        self.deselect_points(prevent_event);
        Ok(())
    }

    /// Hovers a point. `None` or an invalid index removes the hover.
    pub fn hover(&mut self, idx: Option<usize>, options: HoverOptions) -> Result<()> {
        self.check_alive()?;
        self.hover_point(idx, options);
        Ok(())
    }

    /// Restricts the visible points. The completion resolves after the
    /// filtered points are drawn.
    pub fn filter(&mut self, indices: &[usize], prevent_event: bool) -> Completion {
        if self.destroyed {
            return Completion::ready(Err(PlotError::AlreadyDestroyed));
        }
        self.apply_filter(indices);

        let (waiter, completion) = Completion::pending();
        let notification = (!prevent_event).then(|| Notification::Filter {
            points: self.selection.filtered().unwrap_or_default().to_vec(),
        });
        self.refit_connections_then(AfterDraw {
            notification,
            waiter: Some(waiter),
        });
        completion
    }

    pub fn unfilter(&mut self, prevent_event: bool) -> Completion {
        if self.destroyed {
            return Completion::ready(Err(PlotError::AlreadyDestroyed));
        }
        self.selection.unfilter();
        self.update_normal_indices();
        self.events.signal(Event::FILTER_CHANGE);

        let (waiter, completion) = Completion::pending();
        self.refit_connections_then(AfterDraw {
            notification: (!prevent_event).then_some(Notification::Unfilter),
            waiter: Some(waiter),
        });
        completion
    }

    fn select_points(&mut self, indices: &[usize], options: SelectOptions) {
        match self.selection.select(indices, options.merge) {
            SelectOutcome::Unchanged => {
                if options.merge {
                    self.events.signal(Event::REDRAW);
                }
            }
            SelectOutcome::Deselected { previous } => {
                self.clear_outline_on(SelectClearPolicy::OnDeselect);
                self.on_deselected(previous, options.prevent_event);
            }
            SelectOutcome::Selected { previous } => {
                if !options.merge {
                    self.connections.clear_selected_lines();
                    self.set_connection_state(&previous, ConnectionState::Normal);
                }

                let selected = self.selection.selected().to_vec();
                self.set_connection_state(&selected, ConnectionState::Active);
                self.update_selected_indices();
                self.events.signal(Event::SELECTION_CHANGE);

                if !options.prevent_event {
                    self.bus.publish(Notification::Select { points: selected });
                }
            }
        }
    }

    fn deselect_points(&mut self, prevent_event: bool) {
        self.clear_outline_on(SelectClearPolicy::OnDeselect);
        let previous = self.selection.deselect();
        if !previous.is_empty() {
            self.on_deselected(previous, prevent_event);
        }
    }

    fn on_deselected(&mut self, previous: Vec<usize>, prevent_event: bool) {
        if !prevent_event {
            self.bus.publish(Notification::Deselect);
        }
        self.connections.clear_selected_lines();
        self.set_connection_state(&previous, ConnectionState::Normal);
        self.update_selected_indices();
        self.events.signal(Event::SELECTION_CHANGE);
    }

    fn hover_point(&mut self, idx: Option<usize>, options: HoverOptions) {
        let outcome = self.selection.hover(idx);

        if let Some(previous) = outcome.previous {
            if outcome.current != Some(previous) && !self.selection.is_selected(previous) {
                self.set_connection_state(&[previous], ConnectionState::Normal);
            }
        }

        if let Some(current) = outcome.current.filter(|_| outcome.entered()) {
            if !self.selection.is_selected(current) {
                self.set_connection_state(&[current], ConnectionState::Hover);
            }
            if !options.prevent_event {
                self.bus.publish(Notification::PointOver(current));
            }
        }

        if let Some(previous) = outcome.previous.filter(|_| outcome.left()) {
            if !options.prevent_event {
                self.bus.publish(Notification::PointOut(previous));
            }
        }

        if outcome.current != outcome.previous {
            self.update_hovered_indices();
        }
        if outcome.needs_redraw() {
            self.events.signal(Event::HOVER_CHANGE);
            self.reticle_once = options.show_reticle_once;
        }
    }

    fn apply_filter(&mut self, indices: &[usize]) {
        let outcome = self.selection.filter(indices);
        self.select_points(
            &outcome.visible_selection,
            SelectOptions {
                merge: false,
                prevent_event: true,
            },
        );
        if outcome.hover_hidden {
            self.hover_point(
                None,
                HoverOptions {
                    show_reticle_once: false,
                    prevent_event: true,
                },
            );
        }
        self.update_normal_indices();
        self.events.signal(Event::FILTER_CHANGE);
    }

    fn set_connection_state(&mut self, indices: &[usize], state: ConnectionState) {
        self.connections.set_state(
            self.connection_lines.as_mut(),
            &self.points,
            indices,
            state,
            self.properties.point_connection_opacity_active,
        );
    }

    fn clear_outline_on(&mut self, policy: SelectClearPolicy) {
        if self.properties.select_clear_policy == policy && !self.selection_outline.is_empty() {
            self.selection_outline.clear();
            self.events.signal(Event::OUTLINE_CHANGE);
        }
    }

    fn outline_style(&self) -> LineStyle {
        LineStyle {
            colors: vec![self.properties.select_color],
            opacity: 1.0,
            width: self.properties.select_line_width,
        }
    }

    fn set_selection_outline(&mut self, polygon: &[[f32; 2]]) {
        let mut line = polygon.iter().flatten().copied().collect::<Vec<_>>();
        if let Some(first) = polygon.first() {
            line.extend(first);
        }
        self.selection_outline.set_style(self.outline_style());
        self.selection_outline
            .set_points(vec![line], LineAttributes::default());
        self.events.signal(Event::OUTLINE_CHANGE);
    }
}

// Hit-testing
impl Scatterplot {
    /// The visible point closest to the pointer, if any is within reach.
    pub fn raycast(&self) -> Option<usize> {
        if !self.points_drawn {
            return None;
        }
        let index = self.spatial_index.as_deref()?;
        let pointer = self.interaction.pointer()?;

        let (width, height) = self.size();
        let position = self.transform().ndc_to_data(pixel_to_ndc(pointer, width, height));
        nearest_point(
            index,
            |idx| self.points.get(idx).map(|p| p.position()),
            |idx| self.selection.is_valid(idx),
            position,
            self.point_size_data(POINTER_SLACK),
        )
    }

    /// The visible points inside a data space polygon.
    pub fn points_in_polygon(&self, polygon: &[[f32; 2]]) -> Vec<usize> {
        let Some(index) = self.spatial_index.as_deref() else {
            return Vec::new();
        };
        points_in_polygon(
            index,
            |idx| self.points.get(idx).map(|p| p.position()),
            |idx| self.selection.is_valid(idx),
            polygon,
        )
    }

    /// Canvas position of a point in CSS pixels.
    pub fn get_screen_position(&self, idx: usize) -> Result<Option<[f32; 2]>> {
        self.check_alive()?;
        if !self.points_drawn {
            return Err(PlotError::PointsNotDrawn);
        }

        let Some(point) = self.points.get(idx) else {
            return Ok(None);
        };
        let (width, height) = self.size();
        let ndc = self.transform().data_to_ndc(Vec2::from(point.position()));
        Ok(Some(ndc_to_pixel(ndc, width, height).into()))
    }

    /// Size of a point in data space, grown by `increase` pixels.
    fn point_size_data(&self, increase: f32) -> f32 {
        let (bottom_left, top_right) = self.transform().viewport_corners();
        let height_data = (top_right.y - bottom_left.y).abs();
        let (_, height) = self.size();
        let pixel = height_data / (height * self.canvas.device_pixel_ratio);

        let detection_size = self
            .properties
            .point_size
            .iter()
            .copied()
            .fold(0.0, f32::max);
        (detection_size * self.point_scale() + increase) * pixel
    }
}

// Transitions
impl Scatterplot {
    fn start_transition(&mut self, duration: f64, easing: Easing) {
        let superseded = self
            .transition
            .start(duration, easing, self.properties.show_reticle);
        if superseded {
            // A running blend is recomputed on the next render, if any.
            self.renderer.upload_state(&self.state);
            self.bus.publish(Notification::TransitionEnd);
            for waiter in std::mem::take(&mut self.transition_waiters) {
                waiter.resolve();
            }
        }

        self.properties.show_reticle = false;
        self.bus.publish(Notification::TransitionStart);
        self.events.signal(Event::REDRAW);
    }

    fn end_transition(&mut self) {
        let blended = self.transition.is_transitioning_points();
        if let Some(show_reticle) = self.transition.end() {
            self.properties.show_reticle = show_reticle;
        }
        if blended {
            self.renderer.upload_state(&self.state);
        }
        self.camera.set_fixed(self.properties.camera_is_fixed);
        self.reticle_once |= std::mem::take(&mut self.reticle_once_after_transition);

        self.bus.publish(Notification::TransitionEnd);
        for waiter in std::mem::take(&mut self.transition_waiters) {
            waiter.resolve();
        }
        self.events.signal(Event::REDRAW);
    }
}

// Camera
impl Scatterplot {
    /// Sets the view matrix of the camera.
    pub fn view(&mut self, view: Mat4, prevent_event: bool) -> Result<()> {
        self.check_alive()?;
        self.camera.set_view(view);
        self.prevent_view_event = prevent_event;
        self.events.signal(Event::VIEW_CHANGE);
        Ok(())
    }

    pub fn zoom_to_location(&mut self, target: [f32; 2], distance: f32, options: ZoomOptions) -> Completion {
        if self.destroyed {
            return Completion::ready(Err(PlotError::AlreadyDestroyed));
        }
        let target = Vec2::from(target);

        match options.transition() {
            Some((duration, easing)) => {
                let (waiter, completion) = Completion::pending();
                self.camera.set_fixed(true);
                self.transition.cache_camera(
                    (self.camera.target(), self.camera.distance()),
                    (target, distance),
                );
                self.start_transition(duration, easing);
                self.transition_waiters.push(waiter);
                completion
            }
            None => {
                let rotation = self.camera.rotation();
                self.camera.look_at(target, distance, rotation);
                self.next_draw(Event::VIEW_CHANGE)
            }
        }
    }

    /// Zooms to a data space rectangle `[x, y, width, height]`.
    pub fn zoom_to_area(&mut self, rect: [f32; 4], options: ZoomOptions) -> Completion {
        let [x, y, width, height] = rect;
        let target = [(x + width / 2.0) * self.properties.aspect_ratio, y + height / 2.0];

        let (canvas_width, canvas_height) = self.size();
        let aspect_ratio = (canvas_width / canvas_height) / self.properties.aspect_ratio;
        let distance = if height * aspect_ratio >= width {
            height / 2.0
        } else {
            width / 2.0 / aspect_ratio
        };

        self.zoom_to_location(target, distance, options)
    }

    pub fn zoom_to_points(&mut self, indices: &[usize], options: ZoomOptions) -> Completion {
        if self.destroyed {
            return Completion::ready(Err(PlotError::AlreadyDestroyed));
        }
        if !self.points_drawn {
            return Completion::ready(Err(PlotError::PointsNotDrawn));
        }

        let bbox = indices
            .iter()
            .filter_map(|&idx| self.points.get(idx))
            .fold(None, |bbox: Option<[f32; 4]>, p| {
                let [x0, y0, x1, y1] = bbox.unwrap_or([p.x, p.y, p.x, p.y]);
                Some([x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)])
            });
        let Some([x0, y0, x1, y1]) = bbox else {
            return Completion::ready(Ok(()));
        };

        let point_size = self.point_size_data(0.0);
        let scale = 1.0 + options.padding;
        let width = (x1 - x0).max(point_size) * scale;
        let height = (y1 - y0).max(point_size) * scale;
        let center = [(x0 + x1) / 2.0, (y0 + y1) / 2.0];

        self.zoom_to_area(
            [center[0] - width / 2.0, center[1] - height / 2.0, width, height],
            options,
        )
    }

    pub fn zoom_to_origin(&mut self, options: ZoomOptions) -> Completion {
        self.zoom_to_location([0.0, 0.0], 1.0, options)
    }

    /// Returns the camera to its initial pose.
    pub fn reset(&mut self, options: ZoomOptions) -> Completion {
        let (target, distance, rotation) = self.initial_camera;
        if !self.destroyed {
            let current = (self.camera.target(), self.camera.distance());
            self.camera.look_at(current.0, current.1, rotation);
        }
        self.zoom_to_location(target.into(), distance, options)
    }

    fn size(&self) -> (f32, f32) {
        let extent = |size: Size, auto: f32| match size {
            Size::Fixed(v) => v,
            Size::Auto => auto,
        };
        (
            extent(self.properties.width, self.canvas.width).max(1.0),
            extent(self.properties.height, self.canvas.height).max(1.0),
        )
    }

    fn transform(&self) -> ViewTransform {
        let (width, height) = self.size();
        ViewTransform::new(self.camera.view(), width / height, self.properties.aspect_ratio)
    }

    fn point_scale(&self) -> f32 {
        let first = self
            .properties
            .point_size
            .first()
            .copied()
            .unwrap_or(DEFAULT_POINT_SIZE);
        point_scale(
            self.camera.scaling(),
            self.canvas.device_pixel_ratio,
            min_point_scale(first),
        )
    }

    fn update_scale_ranges(&mut self) {
        let (width, height) = self.size();
        if let Some(scale) = self.properties.x_scale.as_mut() {
            scale.set_range(0.0, width);
        }
        if let Some(scale) = self.properties.y_scale.as_mut() {
            scale.set_range(height, 0.0);
        }
        self.update_scales();
    }

    fn update_scales(&mut self) {
        if self.properties.x_scale.is_none() && self.properties.y_scale.is_none() {
            return;
        }

        let (bottom_left, top_right) = self.transform().viewport_corners();
        if let Some(scale) = self.properties.x_scale.as_mut() {
            scale.set_visible(bottom_left.x, top_right.x);
        }
        if let Some(scale) = self.properties.y_scale.as_mut() {
            scale.set_visible(bottom_left.y, top_right.y);
        }
    }
}

// Density
impl Scatterplot {
    fn request_density_count(&mut self, now: f64) {
        if self.properties.opacity_by != EncodingBy::Density {
            return;
        }

        let due = self
            .density
            .last_count
            .map_or(true, |t| now - t >= self.properties.opacity_by_density_debounce_time);
        if due {
            self.count_points_in_view(now);
        } else {
            self.density.pending = true;
        }
    }

    fn debounce_density_count(&mut self, now: f64) {
        if !self.density.pending {
            return;
        }

        let due = self
            .density
            .last_count
            .map_or(true, |t| now - t >= self.properties.opacity_by_density_debounce_time);
        if due {
            self.count_points_in_view(now);
            self.events.signal(Event::REDRAW);
        }
    }

    fn count_points_in_view(&mut self, now: f64) {
        let count = match self.spatial_index.as_deref() {
            Some(index) => {
                let (a, b) = self.transform().viewport_corners();
                let (min, max) = (a.min(b), a.max(b));
                index
                    .range(min.x, min.y, max.x, max.y)
                    .into_iter()
                    .filter(|&idx| self.selection.is_valid(idx))
                    .count()
            }
            None => 0,
        };

        self.density = DensityCounter {
            num_points_in_view: count,
            last_count: Some(now),
            pending: false,
        };
    }
}

// Rendering
impl Scatterplot {
    fn render(&mut self) {
        let uniforms = self.uniforms();
        let style = self.pass_style();
        let hovered = self.selection.hovered();

        let content = FrameContent {
            background_image: self.properties.background_image.is_some(),
            lasso_polygon: self.interaction.is_selecting()
                && self.gesture.selection_type() == SelectionType::Lasso
                && self.lasso_polygon.len() > 2,
            transitioning_points: self.transition.is_transitioning_points(),
            points_drawn: self.points_drawn,
            mouse_down: self.interaction.is_mouse_down(),
            reticle: self.properties.show_reticle || self.reticle_once,
            hovered: hovered.is_some(),
            selected: !self.selection.selected().is_empty(),
        };
        let steps = plan_frame(content);

        if content.transitioning_points {
            self.renderer
                .upload_state(self.transition.state_texture(&self.state));
        }

        let selected = PointPass::selected(&self.selected_indices, &style);
        self.renderer
            .begin_frame(self.properties.background_color, &uniforms);
        for step in &steps {
            match step {
                DrawStep::BackgroundImage => {
                    if let Some(image) = &self.properties.background_image {
                        self.renderer.draw_background_image(image, &uniforms);
                    }
                }
                DrawStep::LassoPolygon => {
                    let fill = self.properties.select_color.with_alpha(0.2);
                    self.renderer
                        .draw_polygon(&self.lasso_polygon, fill, &uniforms);
                }
                DrawStep::PointConnections => self.connection_lines.draw(&uniforms.transform),
                DrawStep::PointBodies => self
                    .renderer
                    .draw_points(&PointPass::bodies(&self.normal_indices, &style), &uniforms),
                DrawStep::Reticle => {
                    if let Some(point) = hovered.and_then(|idx| self.points.get(idx)) {
                        self.renderer.draw_reticle(
                            point.position(),
                            self.properties.reticle_color,
                            &uniforms,
                        );
                    }
                }
                DrawStep::HoveredPoint => self
                    .renderer
                    .draw_points(&PointPass::hovered(&self.hovered_indices), &uniforms),
                DrawStep::SelectedOutline => self.renderer.draw_points(&selected[0], &uniforms),
                DrawStep::SelectedInnerBorder => self.renderer.draw_points(&selected[1], &uniforms),
                DrawStep::SelectedBody => self.renderer.draw_points(&selected[2], &uniforms),
                DrawStep::Annotations => self.annotation_lines.draw(&uniforms.transform),
                DrawStep::SelectionOutline => self.selection_outline.draw(&uniforms.transform),
            }
        }
        self.renderer.end_frame();

        self.last_frame = steps;
    }

    fn uniforms(&self) -> FrameUniforms {
        let (width, height) = self.size();
        let dpr = self.canvas.device_pixel_ratio;
        let point_scale = self.point_scale();
        let p = &self.properties;

        let opacity_density = if p.opacity_by == EncodingBy::Density {
            let view = self.camera.view();
            density_opacity(DensityParams {
                fill: p.opacity_by_density_fill,
                width: width * dpr,
                height: height * dpr,
                num_points_in_view: self.density.num_points_in_view,
                point_size: p.point_size.first().copied().unwrap_or(DEFAULT_POINT_SIZE),
                point_scale,
                view_scale: view.x_axis.x * view.y_axis.y,
                performance_mode: p.performance_mode,
            })
        } else {
            1.0
        };

        FrameUniforms {
            transform: self.transform(),
            width: width * dpr,
            height: height * dpr,
            device_pixel_ratio: dpr,
            point_scale,
            opacity_density,
            color_multiplicator: self.multiplicator(p.color_by, p.point_color.len()),
            size_multiplicator: self.multiplicator(p.size_by, p.point_size.len()),
            opacity_multiplicator: self.multiplicator(p.opacity_by, p.opacity.len()),
        }
    }

    fn multiplicator(&self, encoding: EncodingBy, len: usize) -> f32 {
        let data_type = encoding
            .channel()
            .map_or(DataType::Categorical, |c| self.points.data_type(c));
        multiplicator(encoding, data_type, len)
    }

    fn pass_style(&self) -> PassStyle {
        let p = &self.properties;
        PassStyle {
            point_size_selected: p.point_size_selected,
            point_outline_width: p.point_outline_width,
            opacity_inactive_max: p.opacity_inactive_max,
            opacity_inactive_scale: p.opacity_inactive_scale,
            device_pixel_ratio: self.canvas.device_pixel_ratio,
            has_selection: !self.selection.selected().is_empty(),
        }
    }

    fn update_encodings(&mut self) {
        let p = &self.properties;
        let encoding = create_encoding_texture(
            &p.point_size,
            &p.opacity,
            &p.point_color_active,
            &p.point_color_hover,
        );
        let groups = color_groups(
            &p.point_color,
            &p.point_color_active,
            &p.point_color_hover,
            p.background_color,
            p.color_by.channel().is_some(),
        );
        self.renderer
            .upload_encodings(&encoding, &create_color_texture(&groups));
    }
}

// Point connections
impl Scatterplot {
    fn set_point_connections(&mut self, curves: CurveMap, follow_up: FollowUp) {
        self.curves = curves;
        self.encode_connections();
        self.connections.set_computing(false);

        let selected = self.selection.selected().to_vec();
        self.set_connection_state(&selected, ConnectionState::Active);

        self.bus.publish(Notification::PointConnectionsDraw);
        self.run_follow_up(follow_up);
    }

    /// Rebuilds the connection buffers from the fitted curves.
    fn encode_connections(&mut self) {
        if self.curves.is_empty() {
            return;
        }

        let lines = self.connections.set_curves(&self.curves);
        let attributes = self.connection_encoding().attributes(&self.curves);
        let style = self.connection_style();
        self.connection_lines.set_style(style);
        self.connection_lines.set_points(lines, attributes);
        self.events.signal(Event::CONNECTIONS_CHANGE);
    }

    fn remove_point_connections(&mut self) {
        self.connections.clear();
        self.curves.clear();
        self.connection_lines.clear();
        self.events.signal(Event::CONNECTIONS_CHANGE);
    }

    /// Connection encodings with inherited encodings resolved.
    fn connection_encoding(&self) -> ConnectionEncoding<'_> {
        let p = &self.properties;
        let (color_by, num_colors) = match p.point_connection_color_by {
            EncodingBy::Inherit => (p.color_by, p.point_color.len()),
            by => (by, p.point_connection_color.len()),
        };
        let (opacity_by, opacities) = match p.point_connection_opacity_by {
            EncodingBy::Inherit => (p.opacity_by, p.opacity.as_slice()),
            by => (by, p.point_connection_opacity.as_slice()),
        };
        let (width_by, widths) = match p.point_connection_size_by {
            EncodingBy::Inherit => (p.size_by, p.point_size.as_slice()),
            by => (by, p.point_connection_size.as_slice()),
        };

        ConnectionEncoding {
            color_by,
            num_colors,
            opacity_by,
            opacities,
            width_by,
            widths,
            z_data_type: self.points.data_type(Channel::Z),
            w_data_type: self.points.data_type(Channel::W),
        }
    }

    fn connection_style(&self) -> LineStyle {
        let p = &self.properties;
        let (colors, color_by) = match p.point_connection_color_by {
            EncodingBy::Inherit => (&p.point_color, p.color_by),
            by => (&p.point_connection_color, by),
        };
        let groups = color_groups(
            colors,
            &[p.point_connection_color_active],
            &[p.point_connection_color_hover],
            p.background_color,
            color_by.channel().is_some(),
        );

        LineStyle {
            colors: groups.into_iter().flatten().collect(),
            opacity: p
                .point_connection_opacity
                .first()
                .copied()
                .unwrap_or(DEFAULT_POINT_CONNECTION_OPACITY),
            width: p
                .point_connection_size
                .first()
                .copied()
                .unwrap_or(p.point_connection_size_active),
        }
    }
}

// Annotations
impl Scatterplot {
    /// Replaces the annotations. An empty list removes them.
    pub fn draw_annotations(&mut self, annotations: Vec<Annotation>) -> Completion {
        if self.destroyed {
            return Completion::ready(Err(PlotError::AlreadyDestroyed));
        }
        self.annotations = annotations;
        self.encode_annotations();
        self.next_draw(Event::ANNOTATIONS_CHANGE)
    }

    pub fn clear_annotations(&mut self) -> Completion {
        self.draw_annotations(Vec::new())
    }

    fn encode_annotations(&mut self) {
        if self.annotations.is_empty() {
            self.annotation_lines.clear();
            return;
        }

        let defaults = AnnotationDefaults {
            line_color: self.properties.annotation_line_color,
            line_width: self.properties.annotation_line_width,
            hvline_limit: self.properties.annotation_hvline_limit,
        };
        let lines = AnnotationLines::build(&self.annotations, &defaults);
        let attributes = lines.attributes();
        self.annotation_lines.set_style(lines.style(&defaults));
        self.annotation_lines.set_points(lines.lines, attributes);
    }
}

// Properties
impl Scatterplot {
    /// Applies a set of property changes. The completion resolves after the
    /// changes are drawn.
    pub fn set(&mut self, update: PropertiesUpdate) -> Completion {
        if self.destroyed {
            return Completion::ready(Err(PlotError::AlreadyDestroyed));
        }

        let changes = self.properties.apply(update);
        if changes.is_empty() {
            return Completion::ready(Ok(()));
        }
        self.handle_property_changes(changes);
        self.next_draw(changes)
    }

    /// Reports the canvas size in CSS pixels. Only used for extents set to
    /// [`Size::Auto`].
    pub fn resize(&mut self, width: f32, height: f32, device_pixel_ratio: f32) -> Completion {
        if self.destroyed {
            return Completion::ready(Err(PlotError::AlreadyDestroyed));
        }

        self.canvas = Canvas {
            width: width.max(1.0),
            height: height.max(1.0),
            device_pixel_ratio: if device_pixel_ratio > 0.0 {
                device_pixel_ratio
            } else {
                1.0
            },
        };
        self.update_scale_ranges();
        self.next_draw(Event::RESIZE)
    }

    fn handle_property_changes(&mut self, changes: Event) {
        self.bus.set_sync(self.properties.sync_events);
        self.update_encodings();
        self.selection_outline.set_style(self.outline_style());

        if changes.signaled_any(&[Event::ENCODING_CHANGE, Event::CONNECTION_STYLE_CHANGE]) {
            self.encode_connections();
        }

        if changes.signaled(Event::CONNECTIONS_TOGGLE) {
            if !self.properties.show_point_connections {
                self.remove_point_connections();
            } else if self.points_drawn && self.points.has_connections() {
                self.fit_connections(FollowUp::AfterDraw(AfterDraw::default()), false);
            }
        }

        if changes.signaled(Event::SELECTION_TYPE_CHANGE) {
            let options = gesture_options(&self.properties);
            if self.gesture.selection_type() != self.properties.selection_type {
                self.gesture = SelectionManager::new(self.properties.selection_type, options);
                self.lasso_polygon.clear();
            } else {
                self.gesture.set_options(options);
            }
        }

        if changes.signaled(Event::CAMERA_CONFIG_CHANGE) && !self.transition.is_transitioning() {
            self.camera.set_fixed(self.properties.camera_is_fixed);
        }

        if changes.signaled_any(&[Event::SCALE_CHANGE, Event::RESIZE]) {
            self.update_scale_ranges();
        }

        if changes.signaled(Event::ANNOTATION_STYLE_CHANGE) {
            self.encode_annotations();
        }
    }
}

// Input
impl Scatterplot {
    pub fn mouse_down(&mut self, input: PointerInput) {
        let points_drawn = self.points_drawn;
        self.handle_input(input, |i, config| i.mouse_down(input, config, points_drawn));
    }

    pub fn mouse_move(&mut self, input: PointerInput) {
        self.handle_input(input, |i, config| i.mouse_move(input, config));
    }

    pub fn mouse_up(&mut self, input: PointerInput) {
        self.handle_input(input, |i, config| i.mouse_up(input, config));
    }

    pub fn click(&mut self, input: PointerInput) {
        self.handle_input(input, |i, config| i.click(input, config));
    }

    pub fn dbl_click(&mut self, input: PointerInput) {
        self.handle_input(input, |i, config| i.dbl_click(config));
    }

    pub fn wheel(&mut self, input: PointerInput, delta_y: f32) {
        self.handle_input(input, |i, config| i.wheel(input, delta_y, config));
    }

    pub fn mouse_enter(&mut self) {
        if !self.destroyed {
            self.interaction.mouse_enter();
        }
    }

    pub fn mouse_leave(&mut self) {
        let input = self.pointer_input(self.now);
        self.handle_input(input, |i, _| i.mouse_leave());
    }

    pub fn key_up(&mut self, key: &str) {
        let input = self.pointer_input(self.now);
        self.handle_input(input, |i, config| i.key_up(key, config));
    }

    /// The host window lost focus.
    pub fn blur(&mut self) {
        let input = self.pointer_input(self.now);
        self.handle_input(input, |i, _| i.blur());
    }

    fn handle_input(
        &mut self,
        input: PointerInput,
        handler: impl FnOnce(&mut Interaction, &InteractionConfig) -> Vec<Effect>,
    ) {
        if self.destroyed {
            return;
        }
        let config = self.interaction_config();
        let effects = handler(&mut self.interaction, &config);
        self.apply_effects(effects, input);
    }

    fn pointer_input(&self, now: f64) -> PointerInput {
        PointerInput {
            position: self.interaction.pointer().unwrap_or_default(),
            time: now,
            ..Default::default()
        }
    }

    fn interaction_config(&self) -> InteractionConfig {
        let p = &self.properties;
        InteractionConfig {
            mouse_mode: p.mouse_mode,
            key_map: p.key_map,
            select_on_long_press: p.select_on_long_press,
            long_press_time: p.select_long_press_time,
            select_min_dist: p.select_min_dist,
            select_initiator: p.select_initiator,
            deselect_on_dbl_click: p.deselect_on_dbl_click,
            deselect_on_escape: p.deselect_on_escape,
            camera_fixed: self.camera.is_fixed(),
        }
    }

    /// Maps a canvas position to data space.
    fn to_data(&self) -> impl Fn(Vec2) -> Vec2 {
        let transform = self.transform();
        let (width, height) = self.size();
        move |position| transform.ndc_to_data(pixel_to_ndc(position, width, height))
    }

    fn apply_effects(&mut self, effects: Vec<Effect>, input: PointerInput) {
        for effect in effects {
            match effect {
                Effect::Hover => {
                    let idx = self.raycast();
                    self.hover_point(idx, HoverOptions::default());
                }
                Effect::Unhover => self.hover_point(None, HoverOptions::default()),
                Effect::ExtendSelection => self.extend_selection(input),
                Effect::EndSelection { merge } => self.end_selection(merge),
                Effect::ClickSelect { merge } => match self.raycast() {
                    Some(idx) => {
                        self.gesture.hide_initiator();
                        if !self.selection.selected().is_empty() {
                            self.clear_outline_on(SelectClearPolicy::OnDeselect);
                        }
                        self.select_points(
                            &[idx],
                            SelectOptions {
                                merge,
                                prevent_event: false,
                            },
                        );
                    }
                    None => {
                        let config = self.interaction_config();
                        self.interaction.click_missed(input, &config);
                    }
                },
                Effect::ShowInitiator(position) => {
                    self.gesture.show_initiator(position);
                    self.events.signal(Event::POINTER_CHANGE);
                }
                Effect::HideInitiator => {
                    self.gesture.hide_initiator();
                    self.events.signal(Event::POINTER_CHANGE);
                }
                Effect::ShowLongPressIndicator(position) => {
                    self.gesture.show_long_press_indicator(position);
                    self.events.signal(Event::POINTER_CHANGE);
                }
                Effect::HideLongPressIndicator => {
                    self.gesture.hide_long_press_indicator();
                }
                Effect::Deselect => self.deselect_points(false),
                Effect::Pan(offset) => {
                    let (width, height) = self.size();
                    let ndc = Vec2::new(2.0 * offset.x / width, -2.0 * offset.y / height);
                    let delta = self.transform().ndc_to_camera(ndc);
                    self.camera.pan(delta);
                }
                Effect::Rotate(from, to) => {
                    let (width, height) = self.size();
                    let center = Vec2::new(width / 2.0, height / 2.0);
                    let angle = |p: Vec2| {
                        let d = p - center;
                        (-d.y).atan2(d.x)
                    };
                    self.camera.rotate(angle(to) - angle(from));
                }
                Effect::Zoom { factor, anchor } => {
                    let (width, height) = self.size();
                    let anchor = self
                        .transform()
                        .ndc_to_camera(pixel_to_ndc(anchor, width, height));
                    self.camera.zoom(factor, anchor);
                }
                Effect::Redraw => self.events.signal(Event::POINTER_CHANGE),
            }
        }
    }

    fn extend_selection(&mut self, input: PointerInput) {
        let to_data = self.to_data();
        let extension = self.gesture.extend(input.position, input.time, &to_data);
        if extension.started {
            self.bus.publish(Notification::SelectionStart);
        }

        if let Some(shape) = extension.shape {
            self.lasso_polygon = shape.polygon.clone();
            self.set_selection_outline(&shape.polygon);
            self.bus.publish(Notification::SelectionExtend { shape });
        }
    }

    fn end_selection(&mut self, merge: bool) {
        let to_data = self.to_data();
        self.lasso_polygon.clear();
        let Some(shape) = self.gesture.end(&to_data) else {
            return;
        };

        self.set_selection_outline(&shape.polygon);
        let indices = self.points_in_polygon(&shape.polygon);
        self.bus.publish(Notification::SelectionEnd { shape, merge });
        self.select_points(
            &indices,
            SelectOptions {
                merge,
                prevent_event: false,
            },
        );
        self.clear_outline_on(SelectClearPolicy::OnEnd);
    }
}

fn gesture_options(properties: &Properties) -> GestureOptions {
    GestureOptions {
        min_dist: properties.select_min_dist,
        min_delay: properties.select_min_delay,
        brush_size: properties.select_brush_size,
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::{Cell, RefCell},
        rc::Rc,
    };

    use super::*;
    use crate::{
        connections::ConnectionGroups,
        constants::DEFAULT_POINT_CONNECTION_OPACITY_ACTIVE,
        interaction::Modifiers,
        point::{LineId, Point},
    };

    /// Curve fitter answering only when the test says so.
    #[derive(Default, Clone)]
    struct DeferredFitter(Rc<RefCell<Vec<(ConnectionGroups, async_channel::Sender<CurveMap>)>>>);

    impl CurveFitter for DeferredFitter {
        fn fit(&self, groups: ConnectionGroups, _options: CurveOptions) -> Pending<CurveMap> {
            let (sx, rx) = async_channel::bounded(1);
            self.0.borrow_mut().push((groups, sx));
            rx
        }
    }

    impl DeferredFitter {
        /// Answers the oldest request, returning the fitted line ids.
        fn resolve(&self) -> Vec<LineId> {
            let (groups, sx) = self.0.borrow_mut().remove(0);
            let ids = groups.keys().copied().collect();
            let _ = sx.try_send(PolylineFitter::fit_now(groups));
            ids
        }
    }

    fn connected_points() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0).with_line(1),
            Point::new(0.5, 0.0).with_line(1),
            Point::new(0.0, 0.5).with_line(2),
            Point::new(0.5, 0.5).with_line(2),
            Point::new(-0.5, 0.5).with_line(2),
        ]
    }

    fn connected_plot(fitter: &DeferredFitter) -> Scatterplot {
        Scatterplot::new(
            Collaborators {
                curve_fitter: Box::new(fitter.clone()),
                ..Default::default()
            },
            PropertiesUpdate {
                show_point_connections: Some(true),
                ..Default::default()
            },
        )
    }

    fn fitted_plot(fitter: &DeferredFitter) -> Scatterplot {
        let mut plot = connected_plot(fitter);
        let _ = plot.draw(connected_points(), DrawOptions::default());
        plot.frame(0.0);
        fitter.resolve();
        plot.frame(16.0);
        plot
    }

    fn counter(plot: &mut Scatterplot, kind: NotificationKind) -> Rc<Cell<usize>> {
        let count = Rc::new(Cell::new(0));
        let inner = count.clone();
        let _ = plot.subscribe(kind, move |_| inner.set(inner.get() + 1), None);
        count
    }

    fn at(x: f32, y: f32, time: f64, shift: bool) -> PointerInput {
        PointerInput {
            position: Vec2::new(x, y),
            time,
            modifiers: Modifiers {
                shift,
                ..Default::default()
            },
            buttons: 1,
        }
    }

    fn plot_with_points() -> Scatterplot {
        let mut plot = Scatterplot::default();
        let completion = plot.draw(vec![[0.0, 0.0], [0.5, 0.5], [-0.5, -0.5]], DrawOptions::default());
        plot.frame(0.0);
        assert_eq!(completion.try_take(), Some(Ok(())));
        plot
    }

    #[test]
    fn test_draw_is_pending_until_frame() {
        let mut plot = Scatterplot::default();
        let completion = plot.draw(vec![[0.0, 0.0]], DrawOptions::default());
        assert!(!plot.is_points_drawn());
        assert_eq!(completion.try_take(), None);

        assert!(plot.frame(0.0));
        assert!(plot.is_points_drawn());
        assert_eq!(completion.try_take(), Some(Ok(())));
        assert!(plot.last_frame().contains(&DrawStep::PointBodies));
    }

    #[test]
    fn test_idle_frames_are_skipped() {
        let mut plot = plot_with_points();
        assert!(!plot.frame(16.0));
        plot.redraw();
        assert!(plot.frame(32.0));
    }

    #[test]
    fn test_screen_position_follows_the_view() {
        let mut plot = Scatterplot::default();
        assert_eq!(plot.get_screen_position(0), Err(PlotError::PointsNotDrawn));

        let _ = plot.draw(vec![[0.0, 0.0], [1.0, 1.0]], DrawOptions::default());
        plot.frame(0.0);
        assert_eq!(plot.get_screen_position(0), Ok(Some([50.0, 50.0])));
        assert_eq!(plot.get_screen_position(1), Ok(Some([100.0, 0.0])));
        assert_eq!(plot.get_screen_position(7), Ok(None));
    }

    #[test]
    fn test_zoom_to_area_fits_the_taller_side() {
        let mut plot = plot_with_points();
        let completion = plot.zoom_to_area([0.0, 0.0, 1.0, 2.0], ZoomOptions::default());
        plot.frame(16.0);

        assert_eq!(completion.try_take(), Some(Ok(())));
        assert_eq!(plot.camera().target(), Vec2::new(0.5, 1.0));
        assert_eq!(plot.camera().distance(), 1.0);
    }

    #[test]
    fn test_pointer_hover_and_click() {
        let mut plot = plot_with_points();
        let input = PointerInput {
            position: Vec2::new(75.0, 25.0),
            time: 100.0,
            buttons: 1,
            ..Default::default()
        };

        plot.mouse_move(input);
        assert_eq!(plot.hovered_point(), Some(1));

        plot.mouse_down(input);
        plot.mouse_up(input);
        plot.click(input);
        assert_eq!(plot.selected_points(), &[1]);
    }

    #[test]
    fn test_density_count_is_debounced() {
        let mut plot = plot_with_points();
        let _ = plot.set(PropertiesUpdate {
            opacity_by: Some(EncodingBy::Density),
            ..Default::default()
        });
        plot.frame(50.0);
        assert_eq!(plot.num_points_in_view(), 3);

        let _ = plot.zoom_to_location([10.0, 10.0], 0.1, ZoomOptions::default());
        plot.frame(100.0);
        assert_eq!(plot.num_points_in_view(), 0);

        let _ = plot.zoom_to_origin(ZoomOptions::default());
        plot.frame(110.0);
        assert_eq!(plot.num_points_in_view(), 0);
        plot.frame(130.0);
        assert_eq!(plot.num_points_in_view(), 3);
    }

    #[test]
    fn test_click_replaces_lasso_selection_and_outline() {
        let mut plot = plot_with_points();
        plot.mouse_down(at(40.0, 40.0, 0.0, true));
        for (x, y, time) in [(40.0, 40.0, 10.0), (60.0, 40.0, 30.0), (60.0, 60.0, 50.0), (40.0, 60.0, 70.0)] {
            plot.mouse_move(at(x, y, time, true));
        }
        plot.mouse_up(at(40.0, 60.0, 80.0, true));
        assert_eq!(plot.selected_points(), &[0]);
        assert!(!plot.selection_outline.is_empty());

        let click = at(75.0, 25.0, 250.0, false);
        plot.mouse_down(at(75.0, 25.0, 200.0, false));
        plot.mouse_up(click);
        plot.click(click);

        assert_eq!(plot.selected_points(), &[1]);
        assert!(plot.selection_outline.is_empty());
    }

    #[test]
    fn test_draw_resolves_after_connections_are_fitted() {
        let fitter = DeferredFitter::default();
        let mut plot = connected_plot(&fitter);
        let drawn = counter(&mut plot, NotificationKind::PointConnectionsDraw);

        let completion = plot.draw(connected_points(), DrawOptions::default());
        plot.frame(0.0);
        assert!(plot.is_points_drawn());
        assert_eq!(completion.try_take(), None);
        assert_eq!(drawn.get(), 0);
        assert!(plot.connection_lines.is_empty());

        assert_eq!(fitter.resolve(), vec![1, 2]);
        plot.frame(16.0);
        assert_eq!(completion.try_take(), Some(Ok(())));
        assert_eq!(drawn.get(), 1);
        assert_eq!(plot.point_connections().len(), 2);
        assert!(!plot.connection_lines.is_empty());
    }

    #[test]
    fn test_highlights_patch_only_their_connection() {
        let fitter = DeferredFitter::default();
        let mut plot = fitted_plot(&fitter);
        let active = DEFAULT_POINT_CONNECTION_OPACITY_ACTIVE;
        let opacities = |plot: &Scatterplot| plot.connection_lines.data().opacities.clone();

        let range = |id| plot.point_connections().entry(id).map(|e| e.vertex_range());
        assert_eq!(range(1), Some(0..8));
        assert_eq!(range(2), Some(8..18));
        let original = opacities(&plot);
        assert_eq!(original.len(), 18);
        assert!(original.iter().all(|&o| o != active));

        plot.hover(Some(3), HoverOptions::default()).unwrap();
        let hovered = opacities(&plot);
        assert_eq!(hovered[..8], original[..8]);
        assert!(hovered[8..].iter().all(|&o| o == active));

        plot.select(&[0], SelectOptions::default()).unwrap();
        assert!(opacities(&plot).iter().all(|&o| o == active));

        plot.deselect(false).unwrap();
        let deselected = opacities(&plot);
        assert_eq!(deselected[..8], original[..8]);
        assert!(deselected[8..].iter().all(|&o| o == active));

        plot.hover(None, HoverOptions::default()).unwrap();
        assert_eq!(opacities(&plot), original);
    }

    #[test]
    fn test_filter_refits_visible_connections() {
        let fitter = DeferredFitter::default();
        let mut plot = fitted_plot(&fitter);

        let completion = plot.filter(&[0, 1], false);
        plot.frame(32.0);
        assert_eq!(completion.try_take(), None);

        assert_eq!(fitter.resolve(), vec![1]);
        plot.frame(48.0);
        assert_eq!(completion.try_take(), Some(Ok(())));
        assert_eq!(plot.point_connections().len(), 1);
        assert!(plot.point_connections().entry(2).is_none());
    }

    #[test]
    fn test_zoom_transition_moves_the_camera() {
        let mut plot = plot_with_points();
        let ends = counter(&mut plot, NotificationKind::TransitionEnd);
        let options = ZoomOptions {
            transition: true,
            transition_duration: Some(100.0),
            transition_easing: Some(Easing::Linear),
            ..Default::default()
        };

        let completion = plot.zoom_to_location([1.0, 1.0], 0.5, options);
        plot.frame(10.0);
        assert!(plot.camera().is_fixed());
        plot.frame(60.0);
        assert_eq!(plot.camera().target(), Vec2::new(0.5, 0.5));
        assert_eq!(plot.camera().distance(), 0.75);
        assert_eq!(completion.try_take(), None);

        plot.frame(110.0);
        assert_eq!(plot.camera().target(), Vec2::new(1.0, 1.0));
        assert_eq!(plot.camera().distance(), 0.5);
        assert_eq!(completion.try_take(), Some(Ok(())));
        assert_eq!(ends.get(), 1);
        assert!(!plot.camera().is_fixed());
    }

    #[test]
    fn test_zoom_to_points_needs_drawn_points() {
        let mut plot = Scatterplot::default();
        let completion = plot.zoom_to_points(&[0], ZoomOptions::default());
        assert_eq!(completion.try_take(), Some(Err(PlotError::PointsNotDrawn)));

        let _ = plot.draw(vec![[0.0, 0.0], [1.0, 1.0], [-1.0, 0.5]], DrawOptions::default());
        plot.frame(0.0);
        let completion = plot.zoom_to_points(
            &[0, 1],
            ZoomOptions {
                transition: true,
                transition_duration: Some(100.0),
                ..Default::default()
            },
        );
        plot.frame(10.0);
        assert_eq!(completion.try_take(), None);

        plot.frame(110.0);
        assert_eq!(completion.try_take(), Some(Ok(())));
        assert_eq!(plot.camera().target(), Vec2::new(0.5, 0.5));
        assert_eq!(plot.camera().distance(), 0.5);
    }
}
