//! Linear axis scales following the visible data range.
use crate::lerp::{InverseLerp, Lerp};

/// A linear scale mapping a domain onto a pixel range.
///
/// The domain the scale was created with corresponds to the normalized data
/// range `[-1, 1]`. Panning and zooming narrow or shift the visible domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    initial_domain: (f32, f32),
    domain: (f32, f32),
    range: (f32, f32),
}

impl LinearScale {
    pub fn new(min: f32, max: f32) -> Self {
        Self {
            initial_domain: (min, max),
            domain: (min, max),
            range: (0.0, 1.0),
        }
    }

    pub fn domain(&self) -> (f32, f32) {
        self.domain
    }

    pub fn initial_domain(&self) -> (f32, f32) {
        self.initial_domain
    }

    pub fn range(&self) -> (f32, f32) {
        self.range
    }

    pub fn set_range(&mut self, start: f32, end: f32) {
        self.range = (start, end);
    }

    /// Maps a domain value to the range.
    pub fn scale(&self, value: f32) -> f32 {
        if self.domain.0 == self.domain.1 {
            return self.range.0;
        }
        let t = value.inv_lerp(self.domain.0, self.domain.1);
        self.range.0.lerp(self.range.1, t)
    }

    /// Maps a range value back to the domain.
    pub fn invert(&self, value: f32) -> f32 {
        if self.range.0 == self.range.1 {
            return self.domain.0;
        }
        let t = value.inv_lerp(self.range.0, self.range.1);
        self.domain.0.lerp(self.domain.1, t)
    }

    /// Updates the domain to the visible normalized data interval.
    pub fn set_visible(&mut self, start: f32, end: f32) {
        let (min, max) = self.initial_domain;
        let size = max - min;
        self.domain = (
            min + (start + 1.0) / 2.0 * size,
            min + (end + 1.0) / 2.0 * size,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_and_invert() {
        let mut scale = LinearScale::new(0.0, 10.0);
        scale.set_range(0.0, 200.0);
        assert_eq!(scale.scale(5.0), 100.0);
        assert_eq!(scale.invert(50.0), 2.5);
    }

    #[test]
    fn test_visible_domain() {
        let mut scale = LinearScale::new(0.0, 10.0);
        scale.set_visible(-1.0, 1.0);
        assert_eq!(scale.domain(), (0.0, 10.0));
        scale.set_visible(0.0, 1.0);
        assert_eq!(scale.domain(), (5.0, 10.0));
        assert_eq!(scale.initial_domain(), (0.0, 10.0));
    }
}
