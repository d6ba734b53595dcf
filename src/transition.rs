//! Tweening of point positions and camera poses.
use glam::Vec2;

use crate::{
    lerp::{Easing, Lerp},
    textures::StateTexture,
};

#[derive(Debug, Clone, PartialEq)]
struct Timing {
    started_at: Option<f64>,
    duration: f64,
    easing: Easing,
}

/// Previous positions and the buffer the blended positions are written to.
#[derive(Debug, Clone, PartialEq)]
struct PointTransition {
    from: StateTexture,
    working: StateTexture,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CameraTransition {
    from_target: Vec2,
    to_target: Vec2,
    from_distance: f32,
    to_distance: f32,
}

/// Result of advancing a transition by one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TweenStep {
    /// Eased progress in [0, 1].
    pub t: f32,
    /// Camera target and distance at `t`, if the camera is transitioning.
    pub camera: Option<(Vec2, f32)>,
    /// Whether the transition reached its duration.
    pub finished: bool,
}

/// Scheduler of the single active transition.
///
/// Point and camera transitions are independent; either or both may be
/// cached when a transition starts.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TransitionScheduler {
    timing: Option<Timing>,
    points: Option<PointTransition>,
    camera: Option<CameraTransition>,
    reticle_before: Option<bool>,
    /// Whether the points were cached for the next transition.
    points_cached: bool,
}

impl TransitionScheduler {
    pub fn is_transitioning(&self) -> bool {
        self.timing.is_some()
    }

    pub fn is_transitioning_points(&self) -> bool {
        self.timing.is_some() && self.points.is_some()
    }

    /// Keeps the positions shown right now as the start of a point
    /// transition. A running point transition collapses into its current
    /// blend so only one pair of textures exists at a time.
    pub fn cache_points(&mut self, current: &StateTexture) {
        let from = match self.points.take() {
            Some(running) if self.is_transitioning() => running.working,
            _ => current.clone(),
        };
        self.points = Some(PointTransition {
            working: from.clone(),
            from,
        });
        self.points_cached = true;
    }

    pub fn cache_camera(&mut self, from: (Vec2, f32), to: (Vec2, f32)) {
        self.camera = Some(CameraTransition {
            from_target: from.0,
            to_target: to.0,
            from_distance: from.1,
            to_distance: to.1,
        });
    }

    /// Starts a transition. Returns `true` if a running transition was
    /// superseded, in which case its end has to be announced first. Only
    /// points cached since the last start are blended.
    ///
    /// `show_reticle` is the reticle visibility to restore once the
    /// transition ends.
    pub fn start(&mut self, duration: f64, easing: Easing, show_reticle: bool) -> bool {
        let superseded = self.timing.is_some();
        if !std::mem::take(&mut self.points_cached) {
            self.points = None;
        }
        self.timing = Some(Timing {
            started_at: None,
            duration,
            easing,
        });
        self.reticle_before = self.reticle_before.or(Some(show_reticle));
        superseded
    }

    /// Advances the transition to `now`, blending the cached positions
    /// towards `target`. The clock starts with the first call.
    pub fn tween(&mut self, now: f64, target: &StateTexture) -> Option<TweenStep> {
        let timing = self.timing.as_mut()?;
        let started_at = *timing.started_at.get_or_insert(now);
        let elapsed = (now - started_at).max(0.0);

        let progress = if timing.duration > 0.0 {
            (elapsed / timing.duration) as f32
        } else {
            1.0
        };
        let t = timing.easing.apply(progress.min(1.0)).clamp(0.0, 1.0);
        let finished = elapsed >= timing.duration;

        if let Some(points) = self.points.as_mut() {
            if points.from.resolution() == target.resolution() {
                points.from.interpolate_into(target, t, &mut points.working);
            }
        }

        let camera = self.camera.map(|c| {
            (
                c.from_target.lerp(c.to_target, t),
                c.from_distance.lerp(c.to_distance, t),
            )
        });

        Some(TweenStep {
            t,
            camera,
            finished,
        })
    }

    /// The positions to render: the blend while points transition, the
    /// authoritative state otherwise.
    pub fn state_texture<'a>(&'a self, authoritative: &'a StateTexture) -> &'a StateTexture {
        match &self.points {
            Some(points) if self.is_transitioning() => &points.working,
            _ => authoritative,
        }
    }

    /// Ends the transition, discarding cached textures. Returns the reticle
    /// visibility to restore.
    pub fn end(&mut self) -> Option<bool> {
        self.timing = None;
        self.points = None;
        self.points_cached = false;
        self.camera = None;
        self.reticle_before.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::Point;

    fn state(x: f32) -> StateTexture {
        StateTexture::new(&[Point::new(x, 0.0), Point::new(0.0, x)])
    }

    #[test]
    fn test_point_transition() {
        let mut scheduler = TransitionScheduler::default();
        let old = state(0.0);
        let new = state(10.0);

        scheduler.cache_points(&old);
        assert!(!scheduler.start(100.0, Easing::Linear, true));
        assert!(scheduler.is_transitioning_points());

        let step = scheduler.tween(1000.0, &new).unwrap();
        assert_eq!(step.t, 0.0);
        assert!(!step.finished);

        let step = scheduler.tween(1050.0, &new).unwrap();
        assert_eq!(step.t, 0.5);
        let shown = scheduler.state_texture(&new);
        assert_eq!(shown.texture().texel(0), Some([5.0, 0.0, 0.0, 0.0]));

        let step = scheduler.tween(1100.0, &new).unwrap();
        assert!(step.finished);
        assert_eq!(scheduler.end(), Some(true));
        assert!(!scheduler.is_transitioning());
        assert_eq!(scheduler.state_texture(&new), &new);
    }

    #[test]
    fn test_superseding_collapses_points() {
        let mut scheduler = TransitionScheduler::default();
        scheduler.cache_points(&state(0.0));
        scheduler.start(100.0, Easing::Linear, true);
        scheduler.tween(0.0, &state(10.0));
        scheduler.tween(50.0, &state(10.0));

        scheduler.cache_points(&state(10.0));
        assert!(scheduler.start(100.0, Easing::Linear, false));

        let step = scheduler.tween(200.0, &state(20.0)).unwrap();
        assert_eq!(step.t, 0.0);
        let current = state(20.0);
        let shown = scheduler.state_texture(&current);
        assert_eq!(shown.texture().texel(0), Some([5.0, 0.0, 0.0, 0.0]));

        // The visibility from before the first transition is restored.
        assert_eq!(scheduler.end(), Some(true));
    }

    #[test]
    fn test_camera_transition_drops_running_blend() {
        let mut scheduler = TransitionScheduler::default();
        scheduler.cache_points(&state(0.0));
        scheduler.start(100.0, Easing::Linear, true);
        scheduler.tween(0.0, &state(10.0));
        scheduler.tween(50.0, &state(10.0));

        scheduler.cache_camera((Vec2::ZERO, 1.0), (Vec2::ONE, 2.0));
        assert!(scheduler.start(100.0, Easing::Linear, true));
        assert!(!scheduler.is_transitioning_points());
        assert_eq!(scheduler.state_texture(&state(10.0)), &state(10.0));
    }

    #[test]
    fn test_camera_transition() {
        let mut scheduler = TransitionScheduler::default();
        scheduler.cache_camera((Vec2::ZERO, 1.0), (Vec2::new(2.0, 4.0), 3.0));
        scheduler.start(0.0, Easing::CubicInOut, false);

        let step = scheduler.tween(5.0, &state(0.0)).unwrap();
        assert!(step.finished);
        assert_eq!(step.camera, Some((Vec2::new(2.0, 4.0), 3.0)));
        assert_eq!(scheduler.end(), Some(false));
    }
}
