//! Areal geometry: the only shapes footprints and parcels may take.
//!
//! Parsing accepts the GeoJSON-like objects the open-data portal emits
//! (`{"type": "Polygon" | "MultiPolygon", "coordinates": [...]}`), either as
//! a JSON object or as a JSON-encoded string. Positions may carry a third
//! (elevation) ordinate, which is ignored. Open rings are closed.

use crate::error::GeometryError;
use geo::{Area, BoundingRect, CoordsIter, Intersects, MapCoords};
use geo_types::{Coord, LineString, MultiPolygon, Polygon, Rect};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

/// A polygon or multipolygon in some coordinate reference system.
#[derive(Debug, Clone, PartialEq)]
pub enum Areal {
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

impl Areal {
    /// Parses a GeoJSON-like geometry value.
    pub fn from_geojson(value: Value) -> Result<Self, GeometryError> {
        let object = match value {
            Value::Object(object) => object,
            Value::String(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(object)) => object,
                Ok(other) => {
                    return Err(GeometryError::Malformed(format!(
                        "encoded geometry is a JSON {}, not an object",
                        json_kind(&other)
                    )))
                }
                Err(e) => return Err(GeometryError::Malformed(e.to_string())),
            },
            Value::Null => return Err(GeometryError::Malformed("geometry is null".into())),
            other => {
                return Err(GeometryError::Malformed(format!(
                    "expected an object, found a JSON {}",
                    json_kind(&other)
                )))
            }
        };
        Self::from_object(object)
    }

    fn from_object(mut object: Map<String, Value>) -> Result<Self, GeometryError> {
        let kind = match object.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            _ => return Err(GeometryError::Malformed("missing 'type'".into())),
        };
        let coordinates = object
            .remove("coordinates")
            .ok_or_else(|| GeometryError::Malformed("missing 'coordinates'".into()))?;

        match kind.as_str() {
            "Polygon" => {
                let rings: Vec<Vec<Vec<f64>>> = serde_json::from_value(coordinates)
                    .map_err(|e| GeometryError::Malformed(e.to_string()))?;
                Ok(Areal::Polygon(polygon_from_rings(rings)?))
            }
            "MultiPolygon" => {
                let polygons: Vec<Vec<Vec<Vec<f64>>>> = serde_json::from_value(coordinates)
                    .map_err(|e| GeometryError::Malformed(e.to_string()))?;
                if polygons.is_empty() {
                    return Err(GeometryError::Degenerate("multipolygon has no polygons"));
                }
                let polygons = polygons
                    .into_iter()
                    .map(polygon_from_rings)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Areal::MultiPolygon(MultiPolygon::new(polygons)))
            }
            other => Err(GeometryError::UnsupportedType(other.to_string())),
        }
    }

    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        match self {
            Areal::Polygon(p) => p.bounding_rect(),
            Areal::MultiPolygon(m) => m.bounding_rect(),
        }
    }

    /// True when the shapes share any point, boundaries included.
    pub fn intersects(&self, other: &Areal) -> bool {
        match (self, other) {
            (Areal::Polygon(a), Areal::Polygon(b)) => a.intersects(b),
            (Areal::Polygon(a), Areal::MultiPolygon(b)) => a.intersects(b),
            (Areal::MultiPolygon(a), Areal::Polygon(b)) => a.intersects(b),
            (Areal::MultiPolygon(a), Areal::MultiPolygon(b)) => a.intersects(b),
        }
    }

    pub fn is_finite(&self) -> bool {
        let finite = |c: Coord<f64>| c.x.is_finite() && c.y.is_finite();
        match self {
            Areal::Polygon(p) => p.coords_iter().all(finite),
            Areal::MultiPolygon(m) => m.coords_iter().all(finite),
        }
    }

    pub fn map_coords(&self, f: fn(Coord<f64>) -> Coord<f64>) -> Areal {
        match self {
            Areal::Polygon(p) => Areal::Polygon(p.map_coords(f)),
            Areal::MultiPolygon(m) => Areal::MultiPolygon(m.map_coords(f)),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Areal::Polygon(_) => "Polygon",
            Areal::MultiPolygon(_) => "MultiPolygon",
        }
    }
}

impl From<Polygon<f64>> for Areal {
    fn from(polygon: Polygon<f64>) -> Self {
        Areal::Polygon(polygon)
    }
}

impl From<MultiPolygon<f64>> for Areal {
    fn from(multi: MultiPolygon<f64>) -> Self {
        Areal::MultiPolygon(multi)
    }
}

/// Serializes as a GeoJSON geometry object.
impl Serialize for Areal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", self.type_name())?;
        match self {
            Areal::Polygon(p) => map.serialize_entry("coordinates", &polygon_positions(p))?,
            Areal::MultiPolygon(m) => {
                let polygons: Vec<_> = m.iter().map(polygon_positions).collect();
                map.serialize_entry("coordinates", &polygons)?
            }
        }
        map.end()
    }
}

fn polygon_positions(polygon: &Polygon<f64>) -> Vec<Vec<[f64; 2]>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| ring.coords().map(|c| [c.x, c.y]).collect())
        .collect()
}

fn polygon_from_rings(rings: Vec<Vec<Vec<f64>>>) -> Result<Polygon<f64>, GeometryError> {
    let mut rings = rings.into_iter();
    let exterior = rings
        .next()
        .ok_or(GeometryError::Degenerate("polygon has no rings"))?;
    let exterior = ring_from_positions(exterior)?;
    let interiors = rings
        .map(ring_from_positions)
        .collect::<Result<Vec<_>, _>>()?;

    // Polygon::new closes any open ring.
    let polygon = Polygon::new(exterior, interiors);
    if polygon.unsigned_area() <= 0.0 {
        return Err(GeometryError::Degenerate("polygon has zero area"));
    }
    Ok(polygon)
}

fn ring_from_positions(positions: Vec<Vec<f64>>) -> Result<LineString<f64>, GeometryError> {
    if positions.len() < 3 {
        return Err(GeometryError::Degenerate("ring has fewer than three positions"));
    }
    let coords = positions
        .into_iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
            [_, _, ..] => Err(GeometryError::NonFinite),
            _ => Err(GeometryError::Malformed(
                "position needs at least two ordinates".into(),
            )),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LineString::new(coords))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn square(x0: f64, y0: f64, size: f64) -> Value {
        json!({
            "type": "Polygon",
            "coordinates": [[
                [x0, y0], [x0 + size, y0], [x0 + size, y0 + size], [x0, y0 + size], [x0, y0]
            ]]
        })
    }

    #[test]
    fn parses_polygon_and_multipolygon() {
        let polygon = Areal::from_geojson(square(0.0, 0.0, 1.0)).unwrap();
        assert_eq!(polygon.type_name(), "Polygon");

        let multi = Areal::from_geojson(json!({
            "type": "MultiPolygon",
            "coordinates": [
                [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
                [[[5.0, 5.0, 1040.0], [6.0, 5.0, 1040.0], [6.0, 6.0, 1040.0]]]
            ]
        }))
        .unwrap();
        match multi {
            Areal::MultiPolygon(m) => {
                assert_eq!(m.0.len(), 2);
                // The open second ring was closed.
                assert_eq!(m.0[1].exterior().0.first(), m.0[1].exterior().0.last());
            }
            other => panic!("expected multipolygon, got {other:?}"),
        }
    }

    #[test]
    fn parses_geometry_encoded_as_string() {
        let encoded = square(0.0, 0.0, 2.0).to_string();
        let areal = Areal::from_geojson(Value::String(encoded)).unwrap();
        assert_eq!(areal.bounding_rect().unwrap().max(), Coord { x: 2.0, y: 2.0 });
    }

    #[test]
    fn rejects_bad_geometry_with_typed_reasons() {
        assert!(matches!(
            Areal::from_geojson(json!({"type": "Point", "coordinates": [0.0, 0.0]})),
            Err(GeometryError::UnsupportedType(t)) if t == "Point"
        ));
        assert!(matches!(
            Areal::from_geojson(json!({"coordinates": []})),
            Err(GeometryError::Malformed(_))
        ));
        assert!(matches!(
            Areal::from_geojson(json!({"type": "Polygon", "coordinates": "nope"})),
            Err(GeometryError::Malformed(_))
        ));
        assert!(matches!(
            Areal::from_geojson(json!({"type": "MultiPolygon", "coordinates": []})),
            Err(GeometryError::Degenerate(_))
        ));
        assert!(matches!(
            Areal::from_geojson(json!({"type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 1.0]]]})),
            Err(GeometryError::Degenerate(_))
        ));
        // Collinear ring: three positions but no area.
        assert!(matches!(
            Areal::from_geojson(json!({
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [0.0, 0.0]]]
            })),
            Err(GeometryError::Degenerate(_))
        ));
        assert!(matches!(
            Areal::from_geojson(json!({
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [1.0], [2.0, 2.0], [0.0, 0.0]]]
            })),
            Err(GeometryError::Malformed(_))
        ));
    }

    #[test]
    fn touching_boundaries_intersect() {
        let a = Areal::from_geojson(square(0.0, 0.0, 1.0)).unwrap();
        let b = Areal::from_geojson(square(1.0, 0.0, 1.0)).unwrap();
        let c = Areal::from_geojson(square(3.0, 0.0, 1.0)).unwrap();
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn serializes_as_geojson() {
        let areal = Areal::from_geojson(square(0.0, 0.0, 1.0)).unwrap();
        let value = serde_json::to_value(&areal).unwrap();
        assert_eq!(value, square(0.0, 0.0, 1.0));
    }
}
