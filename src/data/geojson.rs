use crate::{source::vector::Feature, MapError, Result};
use geo_types::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value};

/// GeoJSON geometry types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJsonGeometry {
    Point {
        coordinates: [f64; 2],
    },
    LineString {
        coordinates: Vec<[f64; 2]>,
    },
    Polygon {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPoint {
        coordinates: Vec<[f64; 2]>,
    },
    MultiLineString {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<[f64; 2]>>>,
    },
    GeometryCollection {
        geometries: Vec<GeoJsonGeometry>,
    },
}

/// GeoJSON feature with geometry and properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoJsonFeature {
    #[serde(default)]
    pub id: Option<Value>,
    pub geometry: Option<GeoJsonGeometry>,
    #[serde(default)]
    pub properties: Option<JsonMap<String, Value>>,
}

/// Root GeoJSON object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJson {
    Feature(GeoJsonFeature),
    FeatureCollection { features: Vec<GeoJsonFeature> },
    #[serde(untagged)]
    Geometry(GeoJsonGeometry),
}

impl GeoJson {
    pub fn from_str(geojson: &str) -> Result<Self> {
        let parsed = serde_json::from_str(geojson).map_err(MapError::from)?;
        Ok(parsed)
    }

    /// Converts every feature with a geometry; features without one are skipped
    pub fn into_features(self) -> Vec<Feature> {
        match self {
            GeoJson::Feature(feature) => feature.into_feature().into_iter().collect(),
            GeoJson::FeatureCollection { features } => features
                .into_iter()
                .filter_map(GeoJsonFeature::into_feature)
                .collect(),
            GeoJson::Geometry(geometry) => vec![Feature::new(geometry.to_geometry())],
        }
    }
}

impl GeoJsonFeature {
    pub fn into_feature(self) -> Option<Feature> {
        let geometry = self.geometry?.to_geometry();
        let mut feature = Feature::new(geometry);
        if let Some(properties) = self.properties {
            feature.properties = properties;
        }
        if let Some(id) = self.id {
            feature.properties.entry("id").or_insert(id);
        }
        Some(feature)
    }
}

impl GeoJsonGeometry {
    pub fn to_geometry(&self) -> Geometry<f64> {
        match self {
            Self::Point { coordinates } => Geometry::Point(Point(coord(coordinates))),
            Self::LineString { coordinates } => Geometry::LineString(line(coordinates)),
            Self::Polygon { coordinates } => Geometry::Polygon(polygon(coordinates)),
            Self::MultiPoint { coordinates } => Geometry::MultiPoint(MultiPoint(
                coordinates.iter().map(|c| Point(coord(c))).collect(),
            )),
            Self::MultiLineString { coordinates } => Geometry::MultiLineString(MultiLineString(
                coordinates.iter().map(|l| line(l)).collect(),
            )),
            Self::MultiPolygon { coordinates } => Geometry::MultiPolygon(MultiPolygon(
                coordinates.iter().map(|p| polygon(p)).collect(),
            )),
            Self::GeometryCollection { geometries } => {
                Geometry::GeometryCollection(GeometryCollection(
                    geometries.iter().map(Self::to_geometry).collect(),
                ))
            }
        }
    }
}

fn coord([x, y]: &[f64; 2]) -> Coord<f64> {
    Coord { x: *x, y: *y }
}

fn line(coordinates: &[[f64; 2]]) -> LineString<f64> {
    LineString(coordinates.iter().map(coord).collect())
}

fn polygon(rings: &[Vec<[f64; 2]>]) -> Polygon<f64> {
    let mut rings = rings.iter().map(|ring| line(ring));
    let exterior = rings.next().unwrap_or_else(|| LineString(Vec::new()));
    Polygon::new(exterior, rings.collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geojson_parsing() {
        let geojson = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "id": 7,
                    "geometry": { "type": "Point", "coordinates": [100.0, 0.5] },
                    "properties": { "name": "Test Point" }
                },
                {
                    "type": "Feature",
                    "geometry": null,
                    "properties": {}
                }
            ]
        }"#;

        let features = GeoJson::from_str(geojson).unwrap().into_features();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].property("name"), Some(&Value::from("Test Point")));
        assert_eq!(features[0].property("id"), Some(&Value::from(7)));
        assert!(matches!(features[0].geometry, Geometry::Point(_)));
    }

    #[test]
    fn test_polygon_geometry() {
        let geometry: GeoJsonGeometry = serde_json::from_str(
            r#"{ "type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]], [[0.2,0.2],[0.3,0.2],[0.2,0.3],[0.2,0.2]]] }"#,
        )
        .unwrap();

        let Geometry::Polygon(polygon) = geometry.to_geometry() else {
            panic!("expected a polygon");
        };
        assert_eq!(polygon.exterior().0.len(), 4);
        assert_eq!(polygon.interiors().len(), 1);
    }

    #[test]
    fn test_invalid_geojson() {
        assert!(GeoJson::from_str("{ \"type\": \"Nope\" }").is_err());
        assert!(GeoJson::from_str("not json").is_err());
    }
}
