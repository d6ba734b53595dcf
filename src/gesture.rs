//! Pointer-capture gestures producing selection polygons.
use std::str::FromStr;

use glam::Vec2;

use crate::error::PlotError;

/// Kind of selection gesture.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionType {
    /// Free-form polygon following the pointer.
    #[default]
    Lasso,
    /// A brush of fixed width swept along the pointer path.
    Directional,
}

impl FromStr for SelectionType {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lasso" => Ok(Self::Lasso),
            "directional" | "brush" => Ok(Self::Directional),
            _ => Err(PlotError::UnknownSelectionType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureOptions {
    /// Minimal pointer travel in pixels between recorded positions.
    pub min_dist: f32,
    /// Minimal time in milliseconds between recorded positions.
    pub min_delay: f64,
    /// Width of the directional brush in pixels.
    pub brush_size: f32,
}

/// Polygon of an ongoing or finished gesture, in data space.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GestureShape {
    pub polygon: Vec<[f32; 2]>,
    /// Centers of the brush, for directional gestures only.
    pub centers: Option<Vec<[f32; 2]>>,
}

impl GestureShape {
    pub fn flat(&self) -> Vec<f32> {
        self.polygon.iter().flatten().copied().collect()
    }
}

/// Result of [`SelectionManager::extend`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Extension {
    /// The gesture started with this call.
    pub started: bool,
    /// The new shape if a position was recorded.
    pub shape: Option<GestureShape>,
}

#[derive(Debug, Default, Clone, PartialEq)]
struct PathRecorder {
    positions: Vec<Vec2>,
    last_time: Option<f64>,
}

impl PathRecorder {
    fn record(&mut self, position: Vec2, now: f64, options: &GestureOptions) -> bool {
        if let (Some(&last), Some(last_time)) = (self.positions.last(), self.last_time) {
            if last.distance(position) < options.min_dist || now - last_time < options.min_delay {
                return false;
            }
        }
        self.positions.push(position);
        self.last_time = Some(now);
        true
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct LassoGesture {
    path: PathRecorder,
}

impl LassoGesture {
    fn shape(&self, to_data: &dyn Fn(Vec2) -> Vec2) -> GestureShape {
        GestureShape {
            polygon: self.path.positions.iter().map(|&p| to_data(p).to_array()).collect(),
            centers: None,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct DirectionalGesture {
    path: PathRecorder,
}

impl DirectionalGesture {
    fn shape(&self, brush_size: f32, to_data: &dyn Fn(Vec2) -> Vec2) -> GestureShape {
        let centers = &self.path.positions;
        if centers.len() < 2 {
            return GestureShape {
                polygon: Vec::new(),
                centers: Some(centers.iter().map(|&c| to_data(c).to_array()).collect()),
            };
        }

        let half = brush_size / 2.0;
        let normals = (0..centers.len())
            .map(|i| {
                let (a, b) = if i == 0 { (0, 1) } else { (i - 1, i) };
                (centers[b] - centers[a]).normalize_or_zero().perp() * half
            })
            .collect::<Vec<_>>();

        let left = centers.iter().zip(&normals).map(|(&c, &n)| c + n);
        let right = centers.iter().zip(&normals).rev().map(|(&c, &n)| c - n);
        GestureShape {
            polygon: left.chain(right).map(|p| to_data(p).to_array()).collect(),
            centers: Some(centers.iter().map(|&c| to_data(c).to_array()).collect()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ManagerInner {
    Lasso(LassoGesture),
    Directional(DirectionalGesture),
}

/// Recognizer of the active selection gesture together with its on-screen
/// affordances.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionManager {
    inner: ManagerInner,
    options: GestureOptions,
    started: bool,
    initiator: Option<Vec2>,
    long_press: Option<Vec2>,
}

impl SelectionManager {
    pub fn new(selection_type: SelectionType, options: GestureOptions) -> Self {
        let inner = match selection_type {
            SelectionType::Lasso => ManagerInner::Lasso(LassoGesture::default()),
            SelectionType::Directional => ManagerInner::Directional(DirectionalGesture::default()),
        };

        Self {
            inner,
            options,
            started: false,
            initiator: None,
            long_press: None,
        }
    }

    pub fn selection_type(&self) -> SelectionType {
        match self.inner {
            ManagerInner::Lasso(_) => SelectionType::Lasso,
            ManagerInner::Directional(_) => SelectionType::Directional,
        }
    }

    pub fn set_options(&mut self, options: GestureOptions) {
        self.options = options;
    }

    pub fn is_active(&self) -> bool {
        self.started
    }

    fn path_mut(&mut self) -> &mut PathRecorder {
        match &mut self.inner {
            ManagerInner::Lasso(g) => &mut g.path,
            ManagerInner::Directional(g) => &mut g.path,
        }
    }

    fn shape(&self, to_data: &dyn Fn(Vec2) -> Vec2) -> GestureShape {
        match &self.inner {
            ManagerInner::Lasso(g) => g.shape(to_data),
            ManagerInner::Directional(g) => g.shape(self.options.brush_size, to_data),
        }
    }

    /// Records a pointer position given in canvas pixels.
    pub fn extend(&mut self, position: Vec2, now: f64, to_data: &dyn Fn(Vec2) -> Vec2) -> Extension {
        let started = !self.started;
        self.started = true;

        let options = self.options;
        if !self.path_mut().record(position, now, &options) {
            return Extension {
                started,
                shape: None,
            };
        }

        Extension {
            started,
            shape: Some(self.shape(to_data)),
        }
    }

    /// Finishes the gesture and returns its final shape, if it started.
    pub fn end(&mut self, to_data: &dyn Fn(Vec2) -> Vec2) -> Option<GestureShape> {
        if !self.started {
            return None;
        }
        let shape = self.shape(to_data);
        self.clear();
        Some(shape)
    }

    /// Abandons the gesture.
    pub fn clear(&mut self) {
        self.started = false;
        *self.path_mut() = PathRecorder::default();
    }

    pub fn show_initiator(&mut self, position: Vec2) {
        self.initiator = Some(position);
    }

    pub fn hide_initiator(&mut self) {
        self.initiator = None;
    }

    pub fn initiator(&self) -> Option<Vec2> {
        self.initiator
    }

    pub fn show_long_press_indicator(&mut self, position: Vec2) {
        self.long_press = Some(position);
    }

    pub fn hide_long_press_indicator(&mut self) {
        self.long_press = None;
    }

    pub fn long_press_indicator(&self) -> Option<Vec2> {
        self.long_press
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPTIONS: GestureOptions = GestureOptions {
        min_dist: 3.0,
        min_delay: 10.0,
        brush_size: 2.0,
    };

    fn identity(p: Vec2) -> Vec2 {
        p
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        assert_eq!("lasso".parse::<SelectionType>(), Ok(SelectionType::Lasso));
        assert_eq!(
            "polygon".parse::<SelectionType>(),
            Err(PlotError::UnknownSelectionType("polygon".into()))
        );
    }

    #[test]
    fn test_lasso_records_spaced_positions() {
        let mut manager = SelectionManager::new(SelectionType::Lasso, OPTIONS);
        let first = manager.extend(Vec2::new(0.0, 0.0), 0.0, &identity);
        assert!(first.started);
        assert_eq!(first.shape.unwrap().polygon, vec![[0.0, 0.0]]);

        // Too close and too early.
        assert!(manager.extend(Vec2::new(1.0, 0.0), 20.0, &identity).shape.is_none());
        assert!(manager.extend(Vec2::new(10.0, 0.0), 5.0, &identity).shape.is_none());

        let next = manager.extend(Vec2::new(10.0, 0.0), 20.0, &identity);
        assert!(!next.started);
        manager.extend(Vec2::new(10.0, 10.0), 40.0, &identity);

        let shape = manager.end(&identity).unwrap();
        assert_eq!(shape.polygon, vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]]);
        assert_eq!(shape.flat(), vec![0.0, 0.0, 10.0, 0.0, 10.0, 10.0]);
        assert!(!manager.is_active());
        assert_eq!(manager.end(&identity), None);
    }

    #[test]
    fn test_directional_brush() {
        let mut manager = SelectionManager::new(SelectionType::Directional, OPTIONS);
        manager.extend(Vec2::new(0.0, 0.0), 0.0, &identity);
        manager.extend(Vec2::new(10.0, 0.0), 20.0, &identity);

        let shape = manager.end(&identity).unwrap();
        assert_eq!(
            shape.polygon,
            vec![[0.0, 1.0], [10.0, 1.0], [10.0, -1.0], [0.0, -1.0]]
        );
        assert_eq!(shape.centers, Some(vec![[0.0, 0.0], [10.0, 0.0]]));
    }

    #[test]
    fn test_affordances() {
        let mut manager = SelectionManager::new(SelectionType::Lasso, OPTIONS);
        manager.show_initiator(Vec2::new(4.0, 2.0));
        assert_eq!(manager.initiator(), Some(Vec2::new(4.0, 2.0)));
        manager.hide_initiator();
        assert_eq!(manager.initiator(), None);

        manager.show_long_press_indicator(Vec2::ONE);
        assert!(manager.long_press_indicator().is_some());
        manager.hide_long_press_indicator();
        assert!(manager.long_press_indicator().is_none());
    }
}
