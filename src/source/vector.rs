use crate::{
    core::bounds::Extent,
    data::geojson::GeoJson,
    spatial::index::{SpatialIndex, SpatialItem},
    Result,
};
use geo_types::{Coord, Geometry};
use serde_json::{Map as JsonMap, Value};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

static NEXT_FEATURE_ID: AtomicU64 = AtomicU64::new(1);

/// A geometry with free-form properties
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    id: u64,
    pub geometry: Geometry<f64>,
    pub properties: JsonMap<String, Value>,
}

impl Feature {
    pub fn new(geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            id: NEXT_FEATURE_ID.fetch_add(1, Ordering::Relaxed),
            geometry: geometry.into(),
            properties: JsonMap::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Process-unique id assigned at construction
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn extent(&self) -> Extent {
        let mut extent = Extent::empty();
        for_each_coord(&self.geometry, &mut |c| extent.extend(&[c.x, c.y]));
        extent
    }
}

/// Visits every coordinate of a geometry
pub fn for_each_coord(geometry: &Geometry<f64>, f: &mut impl FnMut(Coord<f64>)) {
    match geometry {
        Geometry::Point(point) => f(point.0),
        Geometry::Line(line) => {
            f(line.start);
            f(line.end);
        }
        Geometry::LineString(line) => line.0.iter().copied().for_each(&mut *f),
        Geometry::Polygon(polygon) => {
            polygon.exterior().0.iter().copied().for_each(&mut *f);
            for ring in polygon.interiors() {
                ring.0.iter().copied().for_each(&mut *f);
            }
        }
        Geometry::MultiPoint(points) => points.0.iter().for_each(|p| f(p.0)),
        Geometry::MultiLineString(lines) => lines
            .0
            .iter()
            .flat_map(|line| line.0.iter().copied())
            .for_each(&mut *f),
        Geometry::MultiPolygon(polygons) => {
            for polygon in &polygons.0 {
                for_each_coord(&Geometry::Polygon(polygon.clone()), f);
            }
        }
        Geometry::GeometryCollection(collection) => {
            for geometry in &collection.0 {
                for_each_coord(geometry, f);
            }
        }
        Geometry::Rect(rect) => {
            f(rect.min());
            f(rect.max());
        }
        Geometry::Triangle(triangle) => {
            f(triangle.0);
            f(triangle.1);
            f(triangle.2);
        }
    }
}

#[derive(Default)]
struct SourceState {
    features: Vec<Feature>,
    index: SpatialIndex<usize>,
    revision: u64,
}

impl SourceState {
    fn reindex(&mut self) {
        self.index.clear();
        for (position, feature) in self.features.iter().enumerate() {
            let extent = feature.extent();
            if extent.is_valid() {
                self.index.insert(SpatialItem::new(feature.id, extent, position));
            }
        }
    }
}

/// Shared feature store with a spatial index.
///
/// Clones are handles to the same store. Every mutation bumps the revision so
/// renderers know when to re-upload their buffers.
#[derive(Clone, Default)]
pub struct VectorSource {
    state: Arc<RwLock<SourceState>>,
}

impl VectorSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_features(features: impl IntoIterator<Item = Feature>) -> Self {
        let source = Self::new();
        source.add_features(features);
        source
    }

    /// Loads features from a GeoJSON document
    pub fn from_geojson_str(geojson: &str) -> Result<Self> {
        Ok(Self::from_features(GeoJson::from_str(geojson)?.into_features()))
    }

    fn read(&self) -> RwLockReadGuard<'_, SourceState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SourceState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_feature(&self, feature: Feature) -> u64 {
        let id = feature.id();
        self.add_features(std::iter::once(feature));
        id
    }

    pub fn add_features(&self, features: impl IntoIterator<Item = Feature>) {
        let mut state = self.write();
        for feature in features {
            let extent = feature.extent();
            let position = state.features.len();
            if extent.is_valid() {
                state.index.insert(SpatialItem::new(feature.id(), extent, position));
            }
            state.features.push(feature);
        }
        state.revision += 1;
    }

    pub fn remove_feature(&self, id: u64) -> Option<Feature> {
        let mut state = self.write();
        let position = state.features.iter().position(|f| f.id() == id)?;
        let removed = state.features.remove(position);
        state.reindex();
        state.revision += 1;
        Some(removed)
    }

    pub fn clear(&self) {
        let mut state = self.write();
        state.features.clear();
        state.index.clear();
        state.revision += 1;
    }

    pub fn feature(&self, id: u64) -> Option<Feature> {
        self.read().features.iter().find(|f| f.id() == id).cloned()
    }

    pub fn features(&self) -> Vec<Feature> {
        self.read().features.clone()
    }

    /// Runs `f` over the features without cloning them
    pub fn with_features<R>(&self, f: impl FnOnce(&[Feature]) -> R) -> R {
        f(&self.read().features)
    }

    /// Features whose extent intersects `extent`, in insertion order
    pub fn features_in_extent(&self, extent: &Extent) -> Vec<Feature> {
        let state = self.read();
        let mut positions: Vec<usize> = state.index.query(extent).iter().map(|item| item.data).collect();
        positions.sort_unstable();
        positions
            .into_iter()
            .filter_map(|position| state.features.get(position).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().features.is_empty()
    }

    /// Union of all feature extents; empty for an empty source
    pub fn extent(&self) -> Extent {
        self.read().index.extent()
    }

    /// Monotonic change counter
    pub fn revision(&self) -> u64 {
        self.read().revision
    }

    pub fn ptr_eq(&self, other: &VectorSource) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl std::fmt::Debug for VectorSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("VectorSource")
            .field("features", &state.features.len())
            .field("revision", &state.revision)
            .finish()
    }
}
