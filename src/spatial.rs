//! Spatial index seam used by hit-testing.
use async_channel::Receiver;
use rstar::{primitives::GeomWithData, RTree, AABB};

/// Result of an asynchronous collaborator call, polled by the plot at the
/// start of every frame.
pub type Pending<T> = Receiver<T>;

/// A spatial index over the point positions.
pub trait SpatialIndex: Send {
    /// Indices of the points inside the box, in ascending order.
    fn range(&self, x0: f32, y0: f32, x1: f32, y1: f32) -> Vec<usize>;

    /// Number of indexed points.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub type BoxedIndex = Box<dyn SpatialIndex>;

/// Builds spatial indices, possibly off the main thread.
pub trait SpatialIndexBuilder {
    fn build(&self, positions: Vec<[f32; 2]>, use_worker: bool) -> Pending<BoxedIndex>;
}

/// A position tagged with the index of its point.
pub type IndexedPosition = GeomWithData<[f32; 2], usize>;

/// R-tree over the point positions. Points with non-finite coordinates are
/// counted but never returned by a query.
#[derive(Debug, Clone)]
pub struct RTreeIndex {
    tree: RTree<IndexedPosition>,
    len: usize,
}

impl RTreeIndex {
    pub fn new(positions: Vec<[f32; 2]>) -> Self {
        let len = positions.len();
        let entries = positions
            .into_iter()
            .enumerate()
            .filter(|(_, [x, y])| x.is_finite() && y.is_finite())
            .map(|(idx, position)| IndexedPosition::new(position, idx))
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
            len,
        }
    }
}

impl SpatialIndex for RTreeIndex {
    fn range(&self, x0: f32, y0: f32, x1: f32, y1: f32) -> Vec<usize> {
        if x0 > x1 || y0 > y1 {
            return Vec::new();
        }

        let envelope = AABB::from_corners([x0, y0], [x1, y1]);
        let mut found = self
            .tree
            .locate_in_envelope(&envelope)
            .map(|entry| entry.data)
            .collect::<Vec<_>>();
        found.sort_unstable();
        found
    }

    fn len(&self) -> usize {
        self.len
    }
}

/// Builder for [`RTreeIndex`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RTreeIndexBuilder;

impl SpatialIndexBuilder for RTreeIndexBuilder {
    fn build(&self, positions: Vec<[f32; 2]>, use_worker: bool) -> Pending<BoxedIndex> {
        let (sx, rx) = async_channel::bounded(1);

        #[cfg(not(target_arch = "wasm32"))]
        if use_worker {
            log::debug!("building spatial index of {} points on a worker", positions.len());
            std::thread::spawn(move || {
                let index: BoxedIndex = Box::new(RTreeIndex::new(positions));
                let _ = sx.send_blocking(index);
            });
            return rx;
        }

        #[cfg(target_arch = "wasm32")]
        let _ = use_worker;

        let index: BoxedIndex = Box::new(RTreeIndex::new(positions));
        let _ = sx.try_send(index);
        rx
    }
}

/// Wraps an already built index so it can be passed through the draw
/// pipeline like a freshly built one.
pub fn ready(index: BoxedIndex) -> Pending<BoxedIndex> {
    let (sx, rx) = async_channel::bounded(1);
    let _ = sx.try_send(index);
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions() -> Vec<[f32; 2]> {
        vec![[0.5, 0.5], [-1.0, 0.0], [0.0, 0.0], [1.0, 1.0], [0.0, 2.0]]
    }

    #[test]
    fn test_range_query() {
        let index = RTreeIndex::new(positions());
        assert_eq!(index.range(-0.1, -0.1, 1.0, 1.0), vec![0, 2, 3]);
        assert!(index.range(5.0, 5.0, 6.0, 6.0).is_empty());
        assert!(index.range(1.0, 1.0, 0.0, 0.0).is_empty());
    }

    #[test]
    fn test_range_is_ascending() {
        let index = RTreeIndex::new(positions());
        assert_eq!(index.range(-2.0, -2.0, 2.0, 2.0), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_non_finite_positions_are_skipped() {
        let index = RTreeIndex::new(vec![[0.0, 0.0], [f32::NAN, 0.0], [0.0, f32::INFINITY]]);
        assert_eq!(index.len(), 3);
        assert_eq!(index.range(-1.0, -1.0, 1.0, 1.0), vec![0]);
    }

    #[test]
    fn test_many_points() {
        let positions = (0..10_000)
            .map(|i| [(i % 100) as f32, (i / 100) as f32])
            .collect::<Vec<_>>();
        let index = RTreeIndex::new(positions);
        assert_eq!(index.range(10.0, 20.0, 11.0, 21.0), vec![2010, 2011, 2110, 2111]);
    }

    #[test]
    fn test_builders_resolve() {
        let rx = RTreeIndexBuilder.build(positions(), false);
        assert_eq!(rx.try_recv().map(|i| i.len()).ok(), Some(5));

        let rx = RTreeIndexBuilder.build(positions(), true);
        let index = futures::executor::block_on(rx.recv()).unwrap();
        assert_eq!(index.len(), 5);
    }
}
