//! CPU side of the textures and index buffers consumed by the point passes.
use crate::{
    colors::Rgba,
    constants::COLOR_NUM_STATES,
    lerp::Lerp,
    point::Point,
};

/// Side length of the smallest square texture with at least two texels per
/// side that holds `len` slots.
pub fn square_resolution(len: usize) -> usize {
    ((len as f64).sqrt().ceil() as usize).max(2)
}

/// A square RGBA float texture.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatTexture {
    resolution: usize,
    texels: Vec<[f32; 4]>,
}

impl FloatTexture {
    /// Creates a zero filled texture fitting `slots` texels.
    pub fn with_slots(slots: usize) -> Self {
        let resolution = square_resolution(slots);
        Self {
            resolution,
            texels: vec![[0.0; 4]; resolution * resolution],
        }
    }

    pub fn from_texels(texels: impl ExactSizeIterator<Item = [f32; 4]>) -> Self {
        let mut this = Self::with_slots(texels.len());
        for (dst, src) in this.texels.iter_mut().zip(texels) {
            *dst = src;
        }
        this
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn texels(&self) -> &[[f32; 4]] {
        &self.texels
    }

    pub fn texel(&self, idx: usize) -> Option<[f32; 4]> {
        self.texels.get(idx).copied()
    }

    /// Raw bytes for uploading.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }
}

/// The state texture, one `(x, y, z, w)` texel per point.
#[derive(Debug, Clone, PartialEq)]
pub struct StateTexture {
    texture: FloatTexture,
    num_points: usize,
}

impl StateTexture {
    pub fn new(points: &[Point]) -> Self {
        Self {
            texture: FloatTexture::from_texels(points.iter().map(Point::texel)),
            num_points: points.len(),
        }
    }

    pub fn resolution(&self) -> usize {
        self.texture.resolution()
    }

    /// Half texel offset addressing texel centers.
    pub fn eps(&self) -> f32 {
        0.5 / self.resolution() as f32
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    pub fn texture(&self) -> &FloatTexture {
        &self.texture
    }

    /// Texture coordinate of the center of the texel holding point `idx`.
    pub fn index_to_coord(&self, idx: usize) -> [f32; 2] {
        let res = self.resolution();
        let eps = self.eps();
        [
            (idx % res) as f32 / res as f32 + eps,
            (idx / res) as f32 / res as f32 + eps,
        ]
    }

    /// Inverse of [`StateTexture::index_to_coord`].
    pub fn coord_to_index(&self, [u, v]: [f32; 2]) -> usize {
        let res = self.resolution() as f32;
        let col = (u * res).floor() as usize;
        let row = (v * res).floor() as usize;
        row * self.resolution() + col
    }

    pub fn decode(&self, [u, v]: [f32; 2]) -> Option<[f32; 4]> {
        self.texture.texel(self.coord_to_index([u, v]))
    }

    /// Blends `self` towards `other`, writing into `target`.
    ///
    /// # Panics
    ///
    /// Panics if the textures have different resolutions.
    pub fn interpolate_into(&self, other: &Self, t: f32, target: &mut Self) {
        assert_eq!(self.resolution(), other.resolution());
        assert_eq!(self.resolution(), target.resolution());

        let dst = target.texture.texels.iter_mut();
        let src = self.texture.texels.iter().zip(&other.texture.texels);
        for (dst, (a, b)) in dst.zip(src) {
            *dst = a.lerp(*b, t);
        }
    }
}

/// Texture coordinates of a list of points, two floats per point.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IndexBuffer {
    coords: Vec<f32>,
}

impl IndexBuffer {
    /// Index buffer of all `num_points` points.
    pub fn all(state: &StateTexture) -> Self {
        Self::from_indices(state, 0..state.num_points())
    }

    pub fn from_indices(state: &StateTexture, indices: impl IntoIterator<Item = usize>) -> Self {
        let coords = indices
            .into_iter()
            .flat_map(|idx| state.index_to_coord(idx))
            .collect();
        Self { coords }
    }

    pub fn len(&self) -> usize {
        self.coords.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn coords(&self) -> &[f32] {
        &self.coords
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.coords)
    }

    pub fn clear(&mut self) {
        self.coords.clear();
    }
}

/// Per encoding slot `(size, opacity, active opacity, hover opacity)`.
///
/// `active_colors` and `hover_colors` either hold one color per slot or a
/// single color whose alpha is used for all slots.
pub fn create_encoding_texture(
    point_size: &[f32],
    opacity: &[f32],
    active_colors: &[Rgba],
    hover_colors: &[Rgba],
) -> FloatTexture {
    let slots = point_size.len().max(opacity.len());
    let alpha = |colors: &[Rgba], i: usize| {
        colors
            .get(i)
            .or_else(|| colors.first())
            .map_or(1.0, |c| c.alpha())
            .min(1.0)
    };

    FloatTexture::from_texels((0..slots).map(|i| {
        [
            point_size.get(i).copied().unwrap_or(0.0),
            opacity.get(i).copied().unwrap_or(0.0).min(1.0),
            alpha(active_colors, i),
            alpha(hover_colors, i),
        ]
    }))
}

/// Expands the configured colors into color groups of
/// `(normal, active, hover, background)` rows.
///
/// When all lists have the same length every group uses its own active and
/// hover color. Otherwise the active and hover rows fall back to the first
/// active/hover color if no channel drives the color, or to the opaque normal
/// color of the group.
pub fn color_groups(
    normal: &[Rgba],
    active: &[Rgba],
    hover: &[Rgba],
    background: Rgba,
    color_by_channel: bool,
) -> Vec<[Rgba; COLOR_NUM_STATES]> {
    if normal.len() == active.len() && normal.len() == hover.len() {
        return normal
            .iter()
            .zip(active)
            .zip(hover)
            .map(|((&n, &a), &h)| [n, a, h, background])
            .collect();
    }

    let first_active = active.first().copied().unwrap_or_default();
    let first_hover = hover.first().copied().unwrap_or_default();
    normal
        .iter()
        .map(|&n| {
            if color_by_channel {
                [n, n.opaque(), n.opaque(), background]
            } else {
                [n, first_active, first_hover, background]
            }
        })
        .collect()
}

pub fn create_color_texture(groups: &[[Rgba; COLOR_NUM_STATES]]) -> FloatTexture {
    let texels = groups.iter().flat_map(|group| group.map(Rgba::to_f32_with_alpha));
    FloatTexture::from_texels(texels.collect::<Vec<_>>().into_iter())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution() {
        assert_eq!(square_resolution(0), 2);
        assert_eq!(square_resolution(3), 2);
        assert_eq!(square_resolution(4), 2);
        assert_eq!(square_resolution(5), 3);
        assert_eq!(square_resolution(10_000), 100);
    }

    #[test]
    fn test_state_texture_addresses_every_point() {
        let points = (0..11)
            .map(|i| Point::new(i as f32, -(i as f32)).with_z(i as f32 * 0.5))
            .collect::<Vec<_>>();
        let state = StateTexture::new(&points);
        assert_eq!(state.resolution(), 4);
        assert_eq!(state.eps(), 0.125);

        for (i, point) in points.iter().enumerate() {
            let coord = state.index_to_coord(i);
            assert_eq!(state.decode(coord), Some(point.texel()));
        }

        // Unused texels are zero filled.
        assert!(state.texture().texels()[11..].iter().all(|t| *t == [0.0; 4]));
        assert_eq!(state.texture().as_bytes().len(), 16 * 16);
    }

    #[test]
    fn test_interpolation() {
        let a = StateTexture::new(&[Point::new(0.0, 0.0), Point::new(2.0, 2.0)]);
        let b = StateTexture::new(&[Point::new(1.0, -1.0), Point::new(4.0, 0.0)]);
        let mut tmp = a.clone();
        a.interpolate_into(&b, 0.5, &mut tmp);
        assert_eq!(tmp.texture().texel(0), Some([0.5, -0.5, 0.0, 0.0]));
        assert_eq!(tmp.texture().texel(1), Some([3.0, 1.0, 0.0, 0.0]));
    }

    #[test]
    fn test_encoding_texture() {
        let texture = create_encoding_texture(
            &[2.0, 4.0, 8.0],
            &[0.5, 2.0],
            &[Rgba::new(0.0, 0.0, 1.0, 0.25)],
            &[],
        );
        assert_eq!(texture.resolution(), 2);
        assert_eq!(texture.texel(0), Some([2.0, 0.5, 0.25, 1.0]));
        assert_eq!(texture.texel(1), Some([4.0, 1.0, 0.25, 1.0]));
        assert_eq!(texture.texel(2), Some([8.0, 0.0, 0.25, 1.0]));
    }

    #[test]
    fn test_color_groups() {
        let red = Rgba::new(1.0, 0.0, 0.0, 0.5);
        let green = Rgba::new(0.0, 1.0, 0.0, 1.0);
        let active = Rgba::new(0.0, 0.0, 1.0, 1.0);
        let groups = color_groups(&[red, green], &[active], &[Rgba::WHITE], Rgba::BLACK, false);
        assert_eq!(groups[0], [red, active, Rgba::WHITE, Rgba::BLACK]);

        let groups = color_groups(&[red, green], &[active], &[Rgba::WHITE], Rgba::BLACK, true);
        assert_eq!(groups[0], [red, red.opaque(), red.opaque(), Rgba::BLACK]);

        let texture = create_color_texture(&groups);
        assert_eq!(texture.resolution(), 3);
        assert_eq!(texture.texel(4), Some(green.0));
    }
}
