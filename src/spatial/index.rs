use crate::{
    core::{bounds::Extent, geo::Coordinate},
    traits::GeometryOps,
};

use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// An item stored in the R-tree with its extent in map coordinates
#[derive(Debug, Clone)]
pub struct SpatialItem<T> {
    pub id: u64,
    pub extent: Extent,
    pub data: T,
}

impl<T> SpatialItem<T> {
    pub fn new(id: u64, extent: Extent, data: T) -> Self {
        Self { id, extent, data }
    }

    pub fn from_coordinate(id: u64, coordinate: Coordinate, data: T) -> Self {
        let [x, y] = coordinate;
        Self::new(id, Extent::new(x, y, x, y), data)
    }
}

impl<T> PartialEq for SpatialItem<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for SpatialItem<T> {}

// --- rstar integration -------------------------------------------------------------------------

impl<T> RTreeObject for SpatialItem<T> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        to_envelope(&self.extent)
    }
}

impl<T> PointDistance for SpatialItem<T> {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let [cx, cy] = self.extent.center();
        let dx = cx - point[0];
        let dy = cy - point[1];
        dx * dx + dy * dy
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        self.extent.contains_point(point)
    }
}

fn to_envelope(extent: &Extent) -> AABB<[f64; 2]> {
    AABB::from_corners([extent.min_x, extent.min_y], [extent.max_x, extent.max_y])
}

/// R-tree keyed by item id
pub struct SpatialIndex<T> {
    rtree: RTree<SpatialItem<T>>,
    extent: Extent,
}

impl<T: Clone> SpatialIndex<T> {
    pub fn new() -> Self {
        Self {
            rtree: RTree::new(),
            extent: Extent::empty(),
        }
    }

    pub fn insert(&mut self, item: SpatialItem<T>) {
        self.extent = self.extent.extend_with(&item.extent);
        self.rtree.insert(item);
    }

    /// Items whose extent intersects `extent`
    pub fn query(&self, extent: &Extent) -> Vec<&SpatialItem<T>> {
        self.rtree
            .locate_in_envelope_intersecting(&to_envelope(extent))
            .collect()
    }

    pub fn query_radius(&self, center: Coordinate, radius: f64) -> Vec<&SpatialItem<T>> {
        self.rtree
            .locate_within_distance(center, radius * radius)
            .collect()
    }

    pub fn remove(&mut self, id: u64) -> Option<SpatialItem<T>> {
        let found = self.rtree.iter().find(|item| item.id == id).cloned()?;
        let removed = self.rtree.remove(&found);

        self.extent = if self.rtree.size() == 0 {
            Extent::empty()
        } else {
            let envelope = self.rtree.root().envelope();
            Extent::new(
                envelope.lower()[0],
                envelope.lower()[1],
                envelope.upper()[0],
                envelope.upper()[1],
            )
        };

        removed
    }

    pub fn clear(&mut self) {
        self.rtree = RTree::new();
        self.extent = Extent::empty();
    }

    pub fn len(&self) -> usize {
        self.rtree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.rtree.size() == 0
    }

    /// Union of all item extents; empty when the index is empty
    pub fn extent(&self) -> Extent {
        self.extent
    }
}

impl<T: Clone> Default for SpatialIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}
