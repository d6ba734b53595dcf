use glam::Vec2;

/// Trait for linearly interpolating between two values.
pub trait Lerp {
    /// Creates a value between `self` and `other` by linearly interpolating
    /// them, according to a t value.
    fn lerp(self, other: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(self, other: Self, t: f32) -> Self {
        ((1.0 - t) * self) + (t * other)
    }
}

impl Lerp for Vec2 {
    fn lerp(self, other: Self, t: f32) -> Self {
        Vec2::new(self.x.lerp(other.x, t), self.y.lerp(other.y, t))
    }
}

impl<T: Lerp + Copy, const N: usize> Lerp for [T; N] {
    fn lerp(self, other: Self, t: f32) -> Self {
        std::array::from_fn(|i| self[i].lerp(other[i], t))
    }
}

/// Trait for types that can invert a linear interpolation.
pub trait InverseLerp {
    /// Inverse of [`Lerp::lerp`].
    fn inv_lerp(self, start: Self, end: Self) -> f32;
}

impl InverseLerp for f32 {
    fn inv_lerp(self, start: Self, end: Self) -> f32 {
        (self - start) / (end - start)
    }
}

/// Easing curve applied to the normalized elapsed time of a transition.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum Easing {
    Linear,
    QuadIn,
    QuadOut,
    QuadInOut,
    CubicIn,
    CubicOut,
    #[default]
    CubicInOut,
    QuartIn,
    QuartOut,
    QuartInOut,
    QuintIn,
    QuintOut,
    QuintInOut,
    Custom(fn(f32) -> f32),
}

impl Easing {
    /// Looks up a named easing function, e.g. `"cubicInOut"`.
    pub fn from_name(name: &str) -> Option<Self> {
        let easing = match name {
            "linear" => Self::Linear,
            "quadIn" => Self::QuadIn,
            "quadOut" => Self::QuadOut,
            "quadInOut" => Self::QuadInOut,
            "cubicIn" => Self::CubicIn,
            "cubicOut" => Self::CubicOut,
            "cubicInOut" => Self::CubicInOut,
            "quartIn" => Self::QuartIn,
            "quartOut" => Self::QuartOut,
            "quartInOut" => Self::QuartInOut,
            "quintIn" => Self::QuintIn,
            "quintOut" => Self::QuintOut,
            "quintInOut" => Self::QuintInOut,
            _ => return None,
        };
        Some(easing)
    }

    pub fn apply(self, t: f32) -> f32 {
        match self {
            Self::Linear => t,
            Self::QuadIn => t * t,
            Self::QuadOut => t * (2.0 - t),
            Self::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Self::CubicIn => t.powi(3),
            Self::CubicOut => (t - 1.0).powi(3) + 1.0,
            Self::CubicInOut => {
                if t < 0.5 {
                    4.0 * t.powi(3)
                } else {
                    (t - 1.0) * (2.0 * t - 2.0) * (2.0 * t - 2.0) + 1.0
                }
            }
            Self::QuartIn => t.powi(4),
            Self::QuartOut => 1.0 - (t - 1.0).powi(4),
            Self::QuartInOut => {
                if t < 0.5 {
                    8.0 * t.powi(4)
                } else {
                    1.0 - 8.0 * (t - 1.0).powi(4)
                }
            }
            Self::QuintIn => t.powi(5),
            Self::QuintOut => 1.0 + (t - 1.0).powi(5),
            Self::QuintInOut => {
                if t < 0.5 {
                    16.0 * t.powi(5)
                } else {
                    1.0 + 16.0 * (t - 1.0).powi(5)
                }
            }
            Self::Custom(f) => f(t),
        }
    }
}
