//! Point data model and input conversion.

/// Identifier of a point connection group.
pub type LineId = u32;

/// Grouping key of a point belonging to a point connection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineKey {
    pub id: LineId,
    /// Position of the point inside its connection. Points without an order
    /// keep their input order.
    pub order: Option<f32>,
}

impl From<LineId> for LineKey {
    fn from(id: LineId) -> Self {
        Self { id, order: None }
    }
}

/// A single point with two optional auxiliary values.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
    pub line: Option<LineKey>,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            ..Default::default()
        }
    }

    pub fn with_z(mut self, z: f32) -> Self {
        self.z = z;
        self
    }

    pub fn with_w(mut self, w: f32) -> Self {
        self.w = w;
        self
    }

    pub fn with_line(mut self, line: impl Into<LineKey>) -> Self {
        self.line = Some(line.into());
        self
    }

    pub fn position(&self) -> [f32; 2] {
        [self.x, self.y]
    }

    pub fn value(&self, channel: Channel) -> f32 {
        match channel {
            Channel::Z => self.z,
            Channel::W => self.w,
        }
    }

    /// The `(x, y, z, w)` texel stored in the state texture.
    pub fn texel(&self) -> [f32; 4] {
        [self.x, self.y, self.z, self.w]
    }
}

impl From<[f32; 2]> for Point {
    fn from([x, y]: [f32; 2]) -> Self {
        Self::new(x, y)
    }
}

impl From<[f32; 3]> for Point {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self::new(x, y).with_z(z)
    }
}

impl From<[f32; 4]> for Point {
    fn from([x, y, z, w]: [f32; 4]) -> Self {
        Self::new(x, y).with_z(z).with_w(w)
    }
}

/// One of the two auxiliary value channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Z,
    W,
}

impl Channel {
    /// Index of the channel inside a state texel.
    pub fn texel_idx(self) -> usize {
        match self {
            Channel::Z => 2,
            Channel::W => 3,
        }
    }
}

/// Classification of an auxiliary channel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    #[default]
    Categorical,
    Continuous,
}

impl DataType {
    /// Categorical if every value is an integer, continuous otherwise.
    pub fn infer(values: impl IntoIterator<Item = f32>) -> Self {
        if values.into_iter().all(|v| v.fract() == 0.0) {
            Self::Categorical
        } else {
            Self::Continuous
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "categorical" => Some(Self::Categorical),
            "continuous" => Some(Self::Continuous),
            _ => None,
        }
    }
}

/// Column oriented point input.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Columns {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub z: Option<Vec<f32>>,
    pub w: Option<Vec<f32>>,
    pub line: Option<Vec<LineKey>>,
}

/// Accepted point input forms.
#[derive(Debug, Clone, PartialEq)]
pub enum PointsInput {
    Tuples(Vec<Point>),
    Columns(Columns),
}

impl From<Vec<Point>> for PointsInput {
    fn from(value: Vec<Point>) -> Self {
        Self::Tuples(value)
    }
}

impl From<Columns> for PointsInput {
    fn from(value: Columns) -> Self {
        Self::Columns(value)
    }
}

impl<const N: usize> From<Vec<[f32; N]>> for PointsInput
where
    Point: From<[f32; N]>,
{
    fn from(value: Vec<[f32; N]>) -> Self {
        Self::Tuples(value.into_iter().map(Point::from).collect())
    }
}

impl PointsInput {
    /// Converts flat data with `stride` values per point. A fifth value is
    /// interpreted as the line id of the point.
    pub fn from_flat(values: &[f32], stride: usize) -> Self {
        let stride = stride.clamp(2, 5);
        let points = values
            .chunks_exact(stride)
            .map(|chunk| {
                let mut point = Point::new(chunk[0], chunk[1]);
                if let Some(&z) = chunk.get(2) {
                    point.z = z;
                }
                if let Some(&w) = chunk.get(3) {
                    point.w = w;
                }
                if let Some(&line) = chunk.get(4) {
                    if line.is_finite() && line >= 0.0 {
                        point.line = Some(LineKey::from(line as LineId));
                    }
                }
                point
            })
            .collect();

        Self::Tuples(points)
    }

    /// Converts the input to the tuple form. Columns shorter than `x`/`y`
    /// leave the missing values at zero.
    pub fn into_points(self) -> Vec<Point> {
        match self {
            PointsInput::Tuples(points) => points,
            PointsInput::Columns(columns) => {
                let len = columns.x.len().min(columns.y.len());
                let get = |column: &Option<Vec<f32>>, i: usize| {
                    column.as_ref().and_then(|c| c.get(i)).copied().unwrap_or(0.0)
                };

                (0..len)
                    .map(|i| Point {
                        x: columns.x[i],
                        y: columns.y[i],
                        z: get(&columns.z, i),
                        w: get(&columns.w, i),
                        line: columns.line.as_ref().and_then(|c| c.get(i)).copied(),
                    })
                    .collect()
            }
        }
    }
}

/// The live point set of a plot.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PointSet {
    points: Vec<Point>,
    z_data_type: DataType,
    w_data_type: DataType,
}

impl PointSet {
    /// Builds the point set, inferring the data types of channels without an
    /// explicit override.
    pub fn new(points: Vec<Point>, z_data_type: Option<DataType>, w_data_type: Option<DataType>) -> Self {
        let z_data_type =
            z_data_type.unwrap_or_else(|| DataType::infer(points.iter().map(|p| p.z)));
        let w_data_type =
            w_data_type.unwrap_or_else(|| DataType::infer(points.iter().map(|p| p.w)));

        Self {
            points,
            z_data_type,
            w_data_type,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Point> {
        self.points.get(idx)
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn data_type(&self, channel: Channel) -> DataType {
        match channel {
            Channel::Z => self.z_data_type,
            Channel::W => self.w_data_type,
        }
    }

    pub fn has_connections(&self) -> bool {
        self.points.first().map_or(false, |p| p.line.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_inference() {
        let set = PointSet::new(
            vec![
                Point::new(0.0, 0.0).with_z(1.0).with_w(0.25),
                Point::new(1.0, 1.0).with_z(3.0).with_w(1.0),
            ],
            None,
            None,
        );
        assert_eq!(set.data_type(Channel::Z), DataType::Categorical);
        assert_eq!(set.data_type(Channel::W), DataType::Continuous);

        let set = PointSet::new(set.points().to_vec(), Some(DataType::Continuous), None);
        assert_eq!(set.data_type(Channel::Z), DataType::Continuous);
    }

    #[test]
    fn test_columns_into_points() {
        let columns = Columns {
            x: vec![0.0, 1.0, 2.0],
            y: vec![3.0, 4.0, 5.0],
            z: Some(vec![7.0]),
            w: None,
            line: Some(vec![LineKey::from(4), LineKey::from(4), LineKey::from(5)]),
        };
        let points = PointsInput::from(columns).into_points();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].texel(), [0.0, 3.0, 7.0, 0.0]);
        assert_eq!(points[2].texel(), [2.0, 5.0, 0.0, 0.0]);
        assert_eq!(points[2].line, Some(LineKey::from(5)));
    }

    #[test]
    fn test_flat_input() {
        let points = PointsInput::from_flat(&[0.0, 1.0, 2.0, 3.0, 9.0, 4.0, 5.0, 6.0, 7.0, 9.0], 5)
            .into_points();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].texel(), [4.0, 5.0, 6.0, 7.0]);
        assert_eq!(points[1].line.map(|l| l.id), Some(9));
    }
}
