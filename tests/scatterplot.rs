use std::{cell::RefCell, rc::Rc};

use futures::executor::block_on;
use glam::Vec2;
use scatterplot::{
    colors::Rgba,
    interaction::PointerInput,
    lerp::Easing,
    notify::{Notification, NotificationKind},
    render::{FrameUniforms, PointPass, Renderer},
    textures::{FloatTexture, StateTexture},
    Collaborators, DrawOptions, HoverOptions, PlotError, PropertiesUpdate, Scatterplot,
    SelectOptions, ZoomOptions,
};

const POINTS: [[f32; 2]; 3] = [[0.0, 0.0], [1.0, 1.0], [-1.0, -1.0]];

fn plot(points: &[[f32; 2]]) -> Scatterplot {
    let mut plot = Scatterplot::default();
    let completion = plot.draw(points.to_vec(), DrawOptions::default());
    plot.frame(0.0);
    block_on(completion.wait()).unwrap();
    plot
}

fn record(plot: &mut Scatterplot, kinds: &[NotificationKind]) -> Rc<RefCell<Vec<Notification>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    for &kind in kinds {
        let log = log.clone();
        let _ = plot.subscribe(kind, move |n| log.borrow_mut().push(n.clone()), None);
    }
    log
}

fn select(merge: bool) -> SelectOptions {
    SelectOptions {
        merge,
        prevent_event: false,
    }
}

#[test]
fn select_then_empty_select_deselects() {
    let mut plot = plot(&POINTS);
    let log = record(&mut plot, &[NotificationKind::Select, NotificationKind::Deselect]);

    plot.select(&[1], select(false)).unwrap();
    assert_eq!(plot.selected_points(), &[1]);

    plot.select(&[], select(false)).unwrap();
    assert!(plot.selected_points().is_empty());
    plot.frame(16.0);

    assert_eq!(
        *log.borrow(),
        vec![Notification::Select { points: vec![1] }, Notification::Deselect]
    );
}

#[test]
fn repeated_select_is_idempotent() {
    let mut plot = plot(&POINTS);
    let log = record(&mut plot, &[NotificationKind::Select]);

    plot.select(&[0, 2], select(false)).unwrap();
    plot.select(&[0, 2], select(false)).unwrap();
    plot.select(&[2, 0], select(false)).unwrap();
    plot.frame(16.0);

    assert_eq!(plot.selected_points(), &[0, 2]);
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn merged_selections_form_a_union() {
    let mut plot = plot(&[[0.0, 0.0], [0.1, 0.1], [0.2, 0.2], [0.3, 0.3], [0.4, 0.4]]);

    plot.select(&[0, 1, 2], select(true)).unwrap();
    plot.select(&[2, 3], select(true)).unwrap();

    let mut selected = plot.selected_points().to_vec();
    selected.sort_unstable();
    assert_eq!(selected, vec![0, 1, 2, 3]);
}

#[test]
fn filter_drops_hidden_selection_and_hover() {
    let mut plot = plot(&POINTS);
    plot.select(&[1], select(false)).unwrap();
    plot.hover(Some(2), HoverOptions::default()).unwrap();

    let completion = plot.filter(&[0], false);
    plot.frame(16.0);
    block_on(completion.wait()).unwrap();

    assert!(plot.selected_points().is_empty());
    assert_eq!(plot.hovered_point(), None);
    assert_eq!(plot.filtered_points(), Some(&[0][..]));
}

#[test]
fn selection_stays_inside_the_filter() {
    let mut plot = plot(&POINTS);
    let _ = plot.filter(&[0, 2], true);

    plot.select(&[0, 1, 2], select(false)).unwrap();
    assert_eq!(plot.selected_points(), &[0, 2]);

    plot.hover(Some(1), HoverOptions::default()).unwrap();
    assert_eq!(plot.hovered_point(), None);
}

#[test]
fn refiltering_matches_a_single_filter() {
    let mut once = plot(&POINTS);
    let _ = once.filter(&[2, 0], true);

    let mut twice = plot(&POINTS);
    let _ = twice.filter(&[1], true);
    let _ = twice.unfilter(true);
    let _ = twice.filter(&[2, 0], true);

    assert_eq!(once.normal_indices(), twice.normal_indices());
}

#[test]
fn filter_notifications_follow_the_draw() {
    let mut plot = plot(&POINTS);
    let log = record(
        &mut plot,
        &[NotificationKind::Draw, NotificationKind::Filter, NotificationKind::Unfilter],
    );

    let _ = plot.filter(&[1, 2], false);
    let _ = plot.unfilter(false);
    plot.frame(16.0);

    let log = log.borrow();
    assert!(matches!(log[0], Notification::Draw(_)));
    assert_eq!(log[1], Notification::Filter { points: vec![1, 2] });
    assert_eq!(log[2], Notification::Unfilter);
}

#[test]
fn state_texture_addresses_every_point() {
    let points = vec![
        [0.5, -0.5, 3.0, 0.25],
        [1.0, 1.0, 0.0, 0.0],
        [-1.0, 0.0, 1.0, 0.75],
        [0.25, 0.75, 2.0, 0.5],
        [0.0, -1.0, 4.0, 1.0],
    ];
    let mut plot = Scatterplot::default();
    let _ = plot.draw(points.clone(), DrawOptions::default());
    plot.frame(0.0);

    let state = plot.state_texture();
    for (i, point) in points.iter().enumerate() {
        assert_eq!(state.decode(state.index_to_coord(i)), Some(*point));
    }

    let mut plot = Scatterplot::default();
    let _ = plot.draw(POINTS.to_vec(), DrawOptions::default());
    plot.frame(0.0);
    let state = plot.state_texture();
    assert_eq!(state.decode(state.index_to_coord(2)), Some([-1.0, -1.0, 0.0, 0.0]));
}

#[test]
fn raycast_is_deterministic() {
    let mut plot = plot(&[[0.0, 0.0], [0.02, 0.0], [0.5, 0.5]]);
    plot.mouse_move(PointerInput {
        position: Vec2::new(50.5, 50.0),
        time: 10.0,
        ..Default::default()
    });

    let first = plot.raycast();
    assert!(first.is_some());
    for _ in 0..10 {
        assert_eq!(plot.raycast(), first);
    }
}

#[test]
fn transition_ends_once_after_its_duration() {
    let mut plot = plot(&POINTS);
    let log = record(
        &mut plot,
        &[NotificationKind::TransitionStart, NotificationKind::TransitionEnd],
    );

    let completion = plot.draw(
        vec![[1.0, 0.0], [0.0, 1.0], [0.0, 0.0]],
        DrawOptions {
            transition: true,
            transition_duration: Some(100.0),
            ..Default::default()
        },
    );
    plot.frame(10.0);
    assert!(plot.is_transitioning());
    plot.frame(60.0);
    assert_eq!(completion.try_take(), None);

    plot.frame(110.0);
    assert!(!plot.is_transitioning());
    assert_eq!(completion.try_take(), Some(Ok(())));
    plot.frame(200.0);

    assert_eq!(
        *log.borrow(),
        vec![Notification::TransitionStart, Notification::TransitionEnd]
    );
}

#[test]
fn superseded_transition_ends_first() {
    let mut plot = plot(&POINTS);
    let log = record(
        &mut plot,
        &[NotificationKind::TransitionStart, NotificationKind::TransitionEnd],
    );
    let transition = || DrawOptions {
        transition: true,
        transition_duration: Some(100.0),
        ..Default::default()
    };

    let first = plot.draw(vec![[1.0, 0.0], [0.0, 1.0], [0.0, 0.0]], transition());
    plot.frame(10.0);
    plot.frame(50.0);

    let second = plot.draw(POINTS.to_vec(), transition());
    plot.frame(60.0);
    assert_eq!(first.try_take(), Some(Ok(())));
    assert_eq!(second.try_take(), None);

    plot.frame(160.0);
    assert_eq!(second.try_take(), Some(Ok(())));

    assert_eq!(
        *log.borrow(),
        vec![
            Notification::TransitionStart,
            Notification::TransitionEnd,
            Notification::TransitionStart,
            Notification::TransitionEnd,
        ]
    );
}

/// Keeps the first texel of every uploaded state texture.
#[derive(Default)]
struct StateUploads(Rc<RefCell<Vec<Option<[f32; 4]>>>>);

impl Renderer for StateUploads {
    fn upload_state(&mut self, state: &StateTexture) {
        self.0.borrow_mut().push(state.texture().texel(0));
    }
    fn upload_encodings(&mut self, _: &FloatTexture, _: &FloatTexture) {}
    fn begin_frame(&mut self, _: Rgba, _: &FrameUniforms) {}
    fn draw_background_image(&mut self, _: &str, _: &FrameUniforms) {}
    fn draw_polygon(&mut self, _: &[[f32; 2]], _: Rgba, _: &FrameUniforms) {}
    fn draw_points(&mut self, _: &PointPass<'_>, _: &FrameUniforms) {}
    fn draw_reticle(&mut self, _: [f32; 2], _: Rgba, _: &FrameUniforms) {}
    fn end_frame(&mut self) {}
    fn destroy(&mut self) {}
}

#[test]
fn transition_end_restores_the_drawn_positions() {
    let uploads = Rc::new(RefCell::new(Vec::new()));
    let mut plot = Scatterplot::new(
        Collaborators {
            renderer: Box::new(StateUploads(uploads.clone())),
            ..Default::default()
        },
        PropertiesUpdate::default(),
    );
    let _ = plot.draw(vec![[0.0, 0.0]; 3], DrawOptions::default());
    plot.frame(0.0);

    let completion = plot.draw(
        vec![[1.0, 1.0]; 3],
        DrawOptions {
            transition: true,
            transition_duration: Some(100.0),
            transition_easing: Some(Easing::Linear),
            ..Default::default()
        },
    );
    plot.frame(10.0);
    plot.frame(60.0);
    assert_eq!(uploads.borrow().last(), Some(&Some([0.5, 0.5, 0.0, 0.0])));

    plot.frame(120.0);
    plot.frame(200.0);
    assert_eq!(completion.try_take(), Some(Ok(())));
    assert_eq!(uploads.borrow().last(), Some(&Some([1.0, 1.0, 0.0, 0.0])));
    assert_eq!(
        plot.state_texture().texture().texel(0),
        Some([1.0, 1.0, 0.0, 0.0])
    );
}

#[test]
fn superseding_a_blend_uploads_the_drawn_positions() {
    let uploads = Rc::new(RefCell::new(Vec::new()));
    let mut plot = Scatterplot::new(
        Collaborators {
            renderer: Box::new(StateUploads(uploads.clone())),
            ..Default::default()
        },
        PropertiesUpdate::default(),
    );
    let _ = plot.draw(vec![[0.0, 0.0]; 3], DrawOptions::default());
    plot.frame(0.0);

    let points = plot.draw(
        vec![[1.0, 1.0]; 3],
        DrawOptions {
            transition: true,
            transition_duration: Some(100.0),
            transition_easing: Some(Easing::Linear),
            ..Default::default()
        },
    );
    plot.frame(10.0);
    plot.frame(60.0);

    let camera = plot.zoom_to_origin(ZoomOptions {
        transition: true,
        transition_duration: Some(100.0),
        ..Default::default()
    });
    assert_eq!(points.try_take(), Some(Ok(())));
    assert_eq!(uploads.borrow().last(), Some(&Some([1.0, 1.0, 0.0, 0.0])));

    plot.frame(70.0);
    plot.frame(200.0);
    assert_eq!(camera.try_take(), Some(Ok(())));
    assert_eq!(uploads.borrow().last(), Some(&Some([1.0, 1.0, 0.0, 0.0])));
}

#[test]
fn transition_needs_equal_cardinality() {
    let mut plot = plot(&POINTS);
    let completion = plot.draw(
        vec![[0.0, 0.0]],
        DrawOptions {
            transition: true,
            ..Default::default()
        },
    );
    plot.frame(10.0);

    assert!(!plot.is_transitioning());
    assert_eq!(completion.try_take(), Some(Ok(())));
    assert_eq!(plot.num_points(), 1);
}

#[test]
fn destroy_rejects_later_calls() {
    let mut plot = plot(&POINTS);
    let log = record(&mut plot, &[NotificationKind::Destroy]);
    let pending = plot.draw(POINTS.to_vec(), DrawOptions::default());

    plot.destroy();
    assert_eq!(*log.borrow(), vec![Notification::Destroy]);
    assert_eq!(block_on(pending.wait()), Ok(()));

    assert_eq!(plot.select(&[0], select(false)), Err(PlotError::AlreadyDestroyed));
    assert_eq!(
        block_on(plot.draw(POINTS.to_vec(), DrawOptions::default()).wait()),
        Err(PlotError::AlreadyDestroyed)
    );
    assert!(!plot.frame(16.0));
}
