//! Point connections: grouping, curve fitting and encoding of the polylines
//! linking points that share a line id.
use std::collections::{BTreeMap, HashSet};
use std::ops::Range;

use crate::{
    constants::COLOR_NUM_STATES,
    encoding::{value_to_idx, EncodingBy},
    lines::{LineAttributes, LinePrimitive, LineValues},
    point::{Channel, DataType, LineId, Point, PointSet},
    spatial::Pending,
};

/// A point of a connection group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupedPoint {
    pub idx: usize,
    pub point: Point,
}

pub type ConnectionGroups = BTreeMap<LineId, Vec<GroupedPoint>>;

/// Groups the points by line id. Only `visible` points take part if given.
pub fn group_points(points: &PointSet, visible: Option<&[usize]>) -> ConnectionGroups {
    let mut groups = ConnectionGroups::new();
    let mut push = |idx: usize| {
        if let Some(point) = points.get(idx) {
            if let Some(line) = point.line {
                groups
                    .entry(line.id)
                    .or_default()
                    .push(GroupedPoint { idx, point: *point });
            }
        }
    };

    match visible {
        Some(indices) => indices.iter().copied().for_each(&mut push),
        None => (0..points.len()).for_each(&mut push),
    }
    groups
}

/// A fitted connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    /// Flat `x, y` coordinates.
    pub vertices: Vec<f32>,
    /// Point the channel encodings of the connection are read from.
    pub reference: Point,
}

impl Curve {
    pub fn num_vertices(&self) -> usize {
        self.vertices.len() / 2
    }
}

pub type CurveMap = BTreeMap<LineId, Curve>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveOptions {
    pub max_points_per_segment: usize,
    pub tolerance: f32,
}

/// Fits curves through connection groups.
pub trait CurveFitter {
    fn fit(&self, groups: ConnectionGroups, options: CurveOptions) -> Pending<CurveMap>;
}

/// Connects the points of a group with straight segments, ordered by their
/// line order. Groups with fewer than two points are dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct PolylineFitter;

impl PolylineFitter {
    pub fn fit_now(groups: ConnectionGroups) -> CurveMap {
        groups
            .into_iter()
            .filter(|(_, group)| group.len() >= 2)
            .map(|(id, mut group)| {
                let rank = |rank: usize, p: &GroupedPoint| {
                    p.point.line.and_then(|l| l.order).unwrap_or(rank as f32)
                };
                let mut ranked = group
                    .drain(..)
                    .enumerate()
                    .map(|(i, p)| (rank(i, &p), p))
                    .collect::<Vec<_>>();
                ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

                let reference = ranked[0].1.point;
                let vertices = ranked
                    .iter()
                    .flat_map(|(_, p)| p.point.position())
                    .collect();
                (
                    id,
                    Curve {
                        vertices,
                        reference,
                    },
                )
            })
            .collect()
    }
}

impl CurveFitter for PolylineFitter {
    fn fit(&self, groups: ConnectionGroups, _options: CurveOptions) -> Pending<CurveMap> {
        let (sx, rx) = async_channel::bounded(1);
        let _ = sx.try_send(Self::fit_now(groups));
        rx
    }
}

/// Location of a connection inside the shared line buffers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionEntry {
    pub buffer_idx: usize,
    pub reference: Point,
    pub num_points: usize,
    /// Number of points of all connections stored before this one.
    pub cumulative_offset: usize,
}

impl ConnectionEntry {
    /// Vertex slots of the connection, see [`crate::lines::LineData`].
    pub fn vertex_range(&self) -> Range<usize> {
        let start = self.buffer_idx * 4 + self.cumulative_offset * 2;
        start..start + self.num_points * 2 + 4
    }
}

/// Highlight state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Normal,
    Active,
    Hover,
}

/// Resolved encodings of the connection attributes. `Inherit` must already
/// be replaced by the corresponding point encoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionEncoding<'a> {
    pub color_by: EncodingBy,
    pub num_colors: usize,
    pub opacity_by: EncodingBy,
    pub opacities: &'a [f32],
    pub width_by: EncodingBy,
    pub widths: &'a [f32],
    pub z_data_type: DataType,
    pub w_data_type: DataType,
}

impl ConnectionEncoding<'_> {
    fn data_type(&self, channel: Channel) -> DataType {
        match channel {
            Channel::Z => self.z_data_type,
            Channel::W => self.w_data_type,
        }
    }

    /// Color group indices, scaled to the first row of their group.
    pub fn color_indices(&self, curves: &CurveMap) -> Option<LineValues> {
        let max_idx = self.num_colors.saturating_sub(1);
        let row = COLOR_NUM_STATES as f32;

        match self.color_by {
            EncodingBy::Segment => {
                if max_idx < 1 {
                    return None;
                }
                let indices = curves
                    .values()
                    .map(|curve| {
                        arc_length_fractions(&curve.vertices)
                            .into_iter()
                            .map(|f| (f * max_idx as f32).floor() * row)
                            .collect()
                    })
                    .collect();
                Some(LineValues::PerPoint(indices))
            }
            EncodingBy::Channel(channel) => {
                let data_type = self.data_type(channel);
                let indices = curves
                    .values()
                    .map(|curve| {
                        let value = curve.reference.value(channel);
                        value_to_idx(value, data_type, self.num_colors) as f32 * row
                    })
                    .collect();
                Some(LineValues::PerLine(indices))
            }
            _ => Some(LineValues::PerLine(vec![0.0; curves.len()])),
        }
    }

    pub fn opacities(&self, curves: &CurveMap) -> Option<LineValues> {
        self.attribute(curves, self.opacity_by, self.opacities)
    }

    pub fn widths(&self, curves: &CurveMap) -> Option<LineValues> {
        self.attribute(curves, self.width_by, self.widths)
    }

    pub fn attributes(&self, curves: &CurveMap) -> LineAttributes {
        LineAttributes {
            color_indices: self.color_indices(curves),
            opacities: self.opacities(curves),
            widths: self.widths(curves),
        }
    }

    fn attribute(&self, curves: &CurveMap, by: EncodingBy, values: &[f32]) -> Option<LineValues> {
        if values.is_empty() {
            return None;
        }
        let max_idx = values.len() - 1;

        match by {
            EncodingBy::Segment => {
                let per_point = curves
                    .values()
                    .map(|curve| {
                        let n = curve.num_vertices();
                        (0..n)
                            .map(|i| {
                                let f = if n > 1 { i as f32 / (n - 1) as f32 } else { 0.0 };
                                values[((f * max_idx as f32).floor() as usize).min(max_idx)]
                            })
                            .collect()
                    })
                    .collect();
                Some(LineValues::PerPoint(per_point))
            }
            EncodingBy::Channel(channel) => {
                let data_type = self.data_type(channel);
                let per_line = curves
                    .values()
                    .map(|curve| {
                        let value = curve.reference.value(channel);
                        values[value_to_idx(value, data_type, values.len())]
                    })
                    .collect();
                Some(LineValues::PerLine(per_line))
            }
            _ => None,
        }
    }
}

/// Cumulative arc length at every vertex as a fraction of the total length.
fn arc_length_fractions(vertices: &[f32]) -> Vec<f32> {
    let points = vertices.chunks_exact(2).collect::<Vec<_>>();
    let mut cumulative = Vec::with_capacity(points.len());
    let mut length = 0.0;
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            let prev = points[i - 1];
            length += ((p[0] - prev[0]).powi(2) + (p[1] - prev[1]).powi(2)).sqrt();
        }
        cumulative.push(length);
    }

    if length > 0.0 {
        cumulative.iter_mut().for_each(|c| *c /= length);
    }
    cumulative
}

/// Bookkeeping of the drawn connections.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PointConnections {
    map: BTreeMap<LineId, ConnectionEntry>,
    selected_lines: HashSet<LineId>,
    original_opacities: Option<Vec<f32>>,
    computing: bool,
}

impl PointConnections {
    pub fn is_computing(&self) -> bool {
        self.computing
    }

    pub fn set_computing(&mut self, computing: bool) {
        self.computing = computing;
    }

    pub fn entry(&self, id: LineId) -> Option<&ConnectionEntry> {
        self.map.get(&id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn is_line_selected(&self, id: LineId) -> bool {
        self.selected_lines.contains(&id)
    }

    /// Replaces the connection map, returning the lines in buffer order.
    pub fn set_curves(&mut self, curves: &CurveMap) -> Vec<Vec<f32>> {
        self.map.clear();
        self.original_opacities = None;
        self.selected_lines.clear();

        let mut cumulative_offset = 0;
        let mut lines = Vec::with_capacity(curves.len());
        for (buffer_idx, (&id, curve)) in curves.iter().enumerate() {
            let num_points = curve.num_vertices();
            self.map.insert(
                id,
                ConnectionEntry {
                    buffer_idx,
                    reference: curve.reference,
                    num_points,
                    cumulative_offset,
                },
            );
            cumulative_offset += num_points;
            lines.push(curve.vertices.clone());
        }
        lines
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.selected_lines.clear();
        self.original_opacities = None;
        self.computing = false;
    }

    /// Forgets which lines are highlighted as selected.
    pub fn clear_selected_lines(&mut self) {
        self.selected_lines.clear();
    }

    /// Highlights or reverts the connections of the given points, patching
    /// only the vertex slots of the affected connections. Connections of
    /// selected points are left alone.
    pub fn set_state(
        &mut self,
        line: &mut dyn LinePrimitive,
        points: &PointSet,
        indices: &[usize],
        state: ConnectionState,
        active_opacity: f32,
    ) {
        if self.computing || !points.has_connections() || line.is_empty() {
            return;
        }

        let mut seen = HashSet::new();
        let line_ids = indices
            .iter()
            .filter_map(|&idx| points.get(idx)?.line)
            .map(|key| key.id)
            .filter(|id| !self.selected_lines.contains(id) && seen.insert(*id))
            .collect::<Vec<_>>();

        for id in line_ids {
            let Some(entry) = self.map.get(&id) else {
                continue;
            };
            let range = entry.vertex_range();
            let opacities = line.opacities_mut();
            if range.end > opacities.len() {
                continue;
            }

            let original = self
                .original_opacities
                .get_or_insert_with(|| opacities.to_vec());
            match state {
                ConnectionState::Normal => {
                    opacities[range.clone()].copy_from_slice(&original[range.clone()])
                }
                ConnectionState::Active | ConnectionState::Hover => {
                    opacities[range.clone()].fill(active_opacity)
                }
            }
            line.upload_opacities(range);

            if state == ConnectionState::Active {
                self.selected_lines.insert(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lines::{LineBuffers, LineStyle};

    fn points() -> PointSet {
        PointSet::new(
            vec![
                Point::new(0.0, 0.0).with_line(1).with_z(0.0),
                Point::new(3.0, 4.0).with_line(1).with_z(0.0),
                Point::new(1.0, 1.0).with_line(2).with_z(1.0),
                Point::new(2.0, 2.0).with_line(2).with_z(1.0),
                Point::new(0.0, 1.0).with_line(2).with_z(1.0),
                Point::new(9.0, 9.0).with_line(3).with_z(2.0),
            ],
            None,
            None,
        )
    }

    fn fitted() -> CurveMap {
        PolylineFitter::fit_now(group_points(&points(), None))
    }

    #[test]
    fn test_grouping_and_fitting() {
        let groups = group_points(&points(), Some(&[0, 1, 2, 5]));
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[&2].len(), 1);

        let curves = fitted();
        assert_eq!(curves.len(), 2);
        assert_eq!(curves[&1].vertices, vec![0.0, 0.0, 3.0, 4.0]);
        assert_eq!(curves[&2].num_vertices(), 3);
    }

    #[test]
    fn test_fitting_respects_order() {
        let points = PointSet::new(
            vec![
                Point::new(1.0, 0.0).with_line(crate::point::LineKey {
                    id: 0,
                    order: Some(2.0),
                }),
                Point::new(0.0, 0.0).with_line(crate::point::LineKey {
                    id: 0,
                    order: Some(1.0),
                }),
            ],
            None,
            None,
        );
        let curves = PolylineFitter::fit_now(group_points(&points, None));
        assert_eq!(curves[&0].vertices, vec![0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_entries_and_ranges() {
        let mut connections = PointConnections::default();
        let lines = connections.set_curves(&fitted());
        assert_eq!(lines.len(), 2);

        let first = connections.entry(1).unwrap();
        assert_eq!(first.vertex_range(), 0..8);
        let second = connections.entry(2).unwrap();
        assert_eq!(second.cumulative_offset, 2);
        assert_eq!(second.vertex_range(), 8..18);
    }

    #[test]
    fn test_segment_and_channel_encodings() {
        let curves = fitted();
        let encoding = ConnectionEncoding {
            color_by: EncodingBy::Segment,
            num_colors: 3,
            opacity_by: EncodingBy::Channel(Channel::Z),
            opacities: &[0.1, 0.9],
            width_by: EncodingBy::None,
            widths: &[1.0],
            z_data_type: DataType::Categorical,
            w_data_type: DataType::Categorical,
        };

        match encoding.color_indices(&curves) {
            Some(LineValues::PerPoint(values)) => {
                assert_eq!(values[0], vec![0.0, 8.0]);
                assert_eq!(values[1][0], 0.0);
            }
            other => panic!("unexpected color indices {other:?}"),
        }
        assert_eq!(
            encoding.opacities(&curves),
            Some(LineValues::PerLine(vec![0.1, 0.9]))
        );
        assert_eq!(encoding.widths(&curves), None);

        let single = ConnectionEncoding {
            num_colors: 1,
            ..encoding
        };
        assert_eq!(single.color_indices(&curves), None);
    }

    #[test]
    fn test_state_patches_only_the_connection() {
        let points = points();
        let curves = fitted();
        let mut connections = PointConnections::default();
        let mut line = LineBuffers::new(LineStyle {
            opacity: 0.1,
            ..Default::default()
        });
        line.set_points(connections.set_curves(&curves), LineAttributes::default());

        connections.set_state(&mut line, &points, &[3], ConnectionState::Hover, 0.66);
        assert_eq!(line.uploads(), &[8..18]);
        assert!(line.data().opacities[..8].iter().all(|&o| o == 0.1));
        assert!(line.data().opacities[8..].iter().all(|&o| o == 0.66));

        connections.set_state(&mut line, &points, &[3], ConnectionState::Normal, 0.66);
        assert!(line.data().opacities.iter().all(|&o| o == 0.1));

        connections.set_state(&mut line, &points, &[0, 1], ConnectionState::Active, 0.66);
        assert!(connections.is_line_selected(1));
        // Selected connections are not reverted by hover changes.
        connections.set_state(&mut line, &points, &[0], ConnectionState::Normal, 0.66);
        assert!(line.data().opacities[..8].iter().all(|&o| o == 0.66));

        connections.set_computing(true);
        connections.clear_selected_lines();
        connections.set_state(&mut line, &points, &[0], ConnectionState::Normal, 0.66);
        assert!(line.data().opacities[..8].iter().all(|&o| o == 0.66));
    }
}
