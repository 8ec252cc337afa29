use super::{Bounds, Polygon, Ring};
use crate::error::GeometryError;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Country boundary: a single polygon (with holes) or several parts
#[derive(Debug, Clone, PartialEq)]
pub enum RegionGeometry {
    Polygon(Polygon),
    MultiPolygon(Vec<Polygon>),
}

impl RegionGeometry {
    /// Load a GeoJSON boundary file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GeometryError> {
        let json = fs::read_to_string(path)?;
        Self::from_geojson(&json)
    }

    /// Parse a GeoJSON `Polygon`, `MultiPolygon`, `Feature` or `FeatureCollection`.
    /// The result is multi-part when it has several parts or when a `MultiPolygon`
    /// appears anywhere in the input, whatever wraps it.
    pub fn from_geojson(json: &str) -> Result<Self, GeometryError> {
        let value: Value = serde_json::from_str(json)?;
        let mut parts = Vec::new();
        collect_polygons(&value, &mut parts)?;
        parts.retain(|p| p.outer().is_some_and(Ring::is_closed));

        match parts.len() {
            0 => Err(GeometryError::Empty),
            1 if !is_multi(&value) => Ok(RegionGeometry::Polygon(parts.remove(0))),
            _ => Ok(RegionGeometry::MultiPolygon(parts)),
        }
    }

    /// Containment under the region policy: a single polygon honours its holes,
    /// a multi-part region only checks each part's outer ring.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        match self {
            RegionGeometry::Polygon(p) => p.contains(lat, lon),
            RegionGeometry::MultiPolygon(parts) => {
                parts.iter().any(|p| p.contains_exterior(lat, lon))
            },
        }
    }

    pub fn polygons(&self) -> &[Polygon] {
        match self {
            RegionGeometry::Polygon(p) => std::slice::from_ref(p),
            RegionGeometry::MultiPolygon(parts) => parts,
        }
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.polygons()
            .iter()
            .filter_map(Polygon::bounds)
            .reduce(|a, b| a.union(&b))
    }
}

fn is_multi(value: &Value) -> bool {
    match value.get("type").and_then(Value::as_str) {
        Some("MultiPolygon") => true,
        Some("Feature") => value.get("geometry").is_some_and(is_multi),
        Some("FeatureCollection") => value
            .get("features")
            .and_then(Value::as_array)
            .is_some_and(|features| features.iter().any(is_multi)),
        _ => false,
    }
}

fn collect_polygons(value: &Value, out: &mut Vec<Polygon>) -> Result<(), GeometryError> {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(GeometryError::Malformed("missing `type`"))?;

    match kind {
        "Polygon" => out.push(parse_polygon(coordinates(value)?)?),
        "MultiPolygon" => {
            let parts = coordinates(value)?
                .as_array()
                .ok_or(GeometryError::Malformed("MultiPolygon coordinates must be an array"))?;
            for part in parts {
                out.push(parse_polygon(part)?);
            }
        },
        "Feature" => {
            let geometry = value
                .get("geometry")
                .ok_or(GeometryError::Malformed("Feature without geometry"))?;
            if geometry.is_null() {
                return Err(GeometryError::UnsupportedType("null".to_string()));
            }
            collect_polygons(geometry, out)?;
        },
        "FeatureCollection" => {
            let features = value
                .get("features")
                .and_then(Value::as_array)
                .ok_or(GeometryError::Malformed("FeatureCollection without features"))?;
            for feature in features {
                // Points, lines and null geometries are not part of the boundary
                match collect_polygons(feature, out) {
                    Ok(()) | Err(GeometryError::UnsupportedType(_)) => {},
                    Err(e) => return Err(e),
                }
            }
        },
        other => return Err(GeometryError::UnsupportedType(other.to_string())),
    }
    Ok(())
}

fn coordinates(value: &Value) -> Result<&Value, GeometryError> {
    value
        .get("coordinates")
        .ok_or(GeometryError::Malformed("geometry without coordinates"))
}

fn parse_polygon(rings: &Value) -> Result<Polygon, GeometryError> {
    let rings = rings
        .as_array()
        .ok_or(GeometryError::Malformed("polygon must be an array of rings"))?;
    rings
        .iter()
        .map(parse_ring)
        .collect::<Result<Vec<_>, _>>()
        .map(Polygon::new)
}

fn parse_ring(ring: &Value) -> Result<Ring, GeometryError> {
    let positions = ring
        .as_array()
        .ok_or(GeometryError::Malformed("ring must be an array of positions"))?;
    let mut coords = Vec::with_capacity(positions.len());
    for pos in positions {
        // Positions may carry altitude; only lon/lat matter
        let pair = pos
            .as_array()
            .filter(|p| p.len() >= 2)
            .ok_or(GeometryError::Malformed("position needs at least lon and lat"))?;
        let lon = pair[0].as_f64().ok_or(GeometryError::Malformed("lon is not a number"))?;
        let lat = pair[1].as_f64().ok_or(GeometryError::Malformed("lat is not a number"))?;
        coords.push([lon, lat]);
    }
    Ok(Ring::from_lon_lat(&coords))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE_WITH_HOLE: &str = r#"{
        "type": "Polygon",
        "coordinates": [
            [[100, 0], [110, 0], [110, 10], [100, 10], [100, 0]],
            [[104, 4], [106, 4], [106, 6], [104, 6], [104, 4]]
        ]
    }"#;

    const TWO_PARTS_WITH_HOLE: &str = r#"{
        "type": "MultiPolygon",
        "coordinates": [
            [
                [[100, 0], [110, 0], [110, 10], [100, 10], [100, 0]],
                [[104, 4], [106, 4], [106, 6], [104, 6], [104, 4]]
            ],
            [
                [[120, 0], [125, 0], [125, 5], [120, 5], [120, 0]]
            ]
        ]
    }"#;

    #[test]
    fn test_polygon_honours_hole() {
        let g = RegionGeometry::from_geojson(SQUARE_WITH_HOLE).unwrap();
        assert!(matches!(g, RegionGeometry::Polygon(_)));
        assert!(g.contains(2.0, 102.0));
        assert!(!g.contains(5.0, 105.0));
    }

    #[test]
    fn test_multipolygon_ignores_holes() {
        // Multi-part regions only test outer rings, so the hole still counts as inside
        let g = RegionGeometry::from_geojson(TWO_PARTS_WITH_HOLE).unwrap();
        assert!(g.contains(5.0, 105.0));
        assert!(g.contains(2.0, 122.0));
        assert!(!g.contains(2.0, 115.0));
    }

    #[test]
    fn test_feature_collection_merges_parts() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {}, "geometry":
                    {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1]]]}},
                {"type": "Feature", "properties": {}, "geometry":
                    {"type": "Point", "coordinates": [5, 5]}},
                {"type": "Feature", "properties": {}, "geometry":
                    {"type": "Polygon", "coordinates": [[[2,0],[3,0],[3,1],[2,1]]]}}
            ]
        }"#;
        let g = RegionGeometry::from_geojson(json).unwrap();
        assert_eq!(g.polygons().len(), 2);
        let b = g.bounds().unwrap();
        assert_eq!((b.min_lon, b.max_lon), (0.0, 3.0));
    }

    #[test]
    fn test_altitude_is_ignored() {
        let json = r#"{"type": "Polygon", "coordinates": [[[0,0,5],[4,0,5],[4,4,5],[0,4,5]]]}"#;
        let g = RegionGeometry::from_geojson(json).unwrap();
        assert!(g.contains(2.0, 2.0));
    }

    #[test]
    fn test_rejects_empty_and_unknown() {
        let point = r#"{"type": "Point", "coordinates": [1, 2]}"#;
        assert!(matches!(
            RegionGeometry::from_geojson(point),
            Err(GeometryError::UnsupportedType(_))
        ));
        let degenerate = r#"{"type": "Polygon", "coordinates": [[[0,0],[1,1]]]}"#;
        assert!(matches!(
            RegionGeometry::from_geojson(degenerate),
            Err(GeometryError::Empty)
        ));
    }

    #[test]
    fn test_single_part_multipolygon_is_multi_in_any_wrapper() {
        let multi = r#"{"type": "MultiPolygon", "coordinates": [[
            [[100, 0], [110, 0], [110, 10], [100, 10], [100, 0]],
            [[104, 4], [106, 4], [106, 6], [104, 6], [104, 4]]
        ]]}"#;
        let feature = format!(r#"{{"type": "Feature", "geometry": {}}}"#, multi);
        let collection = format!(r#"{{"type": "FeatureCollection", "features": [{}]}}"#, feature);

        for json in [multi.to_string(), feature, collection] {
            let g = RegionGeometry::from_geojson(&json).unwrap();
            assert!(matches!(g, RegionGeometry::MultiPolygon(ref parts) if parts.len() == 1));
            assert!(g.contains(5.0, 105.0));
        }
    }
}

