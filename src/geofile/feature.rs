use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the attribute identifying a feature within a query result.
pub const OBJECT_ID_FIELD: &str = "OBJECTID";

/// Geometry type tag of an ArcGIS layer or query result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GeometryType {
    Point,
    Polyline,
    Polygon,
    /// Any tag without a GeoJSON conversion, e.g. `esriGeometryMultipoint`.
    Other(String),
}

impl GeometryType {
    /// Parse a tag. Both the full Esri names and the short names are accepted.
    pub fn parse(tag: &str) -> Self {
        match tag {
            "esriGeometryPoint" | "Point" => GeometryType::Point,
            "esriGeometryPolyline" | "Polyline" => GeometryType::Polyline,
            "esriGeometryPolygon" | "Polygon" => GeometryType::Polygon,
            other => GeometryType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            GeometryType::Point => "esriGeometryPoint",
            GeometryType::Polyline => "esriGeometryPolyline",
            GeometryType::Polygon => "esriGeometryPolygon",
            GeometryType::Other(tag) => tag,
        }
    }

    /// GeoJSON geometry type features of this tag are converted to.
    pub fn geojson_type(&self) -> Option<&'static str> {
        match self {
            GeometryType::Point => Some("Point"),
            GeometryType::Polyline => Some("LineString"),
            GeometryType::Polygon => Some("Polygon"),
            GeometryType::Other(_) => None,
        }
    }
}

impl From<String> for GeometryType {
    fn from(value: String) -> Self {
        GeometryType::parse(&value)
    }
}

impl From<GeometryType> for String {
    fn from(value: GeometryType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single record of a query result. The geometry is kept as the raw JSON object the service
/// sent; it is decoded with [`EsriGeometry::decode`] once the geometry type is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub attributes: Map<String, Value>,
    pub geometry: Map<String, Value>,
}

impl Feature {
    pub fn object_id(&self) -> Option<&Value> {
        self.attributes
            .get(OBJECT_ID_FIELD)
            .filter(|value| !value.is_null())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GeometryError {
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("invalid coordinate in {0}")]
    InvalidCoordinate(&'static str),
    #[error("unsupported geometry type {0}")]
    UnsupportedType(String),
}

/// Typed Esri JSON geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum EsriGeometry {
    Point(geo::Point),
    Polyline { paths: Vec<geo::LineString> },
    Polygon { rings: Vec<geo::LineString> },
}

impl EsriGeometry {
    /// Decode a raw geometry object according to the geometry type of its result.
    ///
    /// Coordinates need at least two numeric values; z and m values are ignored.
    pub fn decode(
        geometry: &Map<String, Value>,
        geometry_type: &GeometryType,
    ) -> Result<Self, GeometryError> {
        match geometry_type {
            GeometryType::Point => {
                let x = geometry.get("x").and_then(Value::as_f64);
                let y = geometry.get("y").and_then(Value::as_f64);
                match (x, y) {
                    (Some(x), Some(y)) => Ok(EsriGeometry::Point(geo::Point::new(x, y))),
                    _ => Err(GeometryError::InvalidCoordinate("point")),
                }
            }
            GeometryType::Polyline => Ok(EsriGeometry::Polyline {
                paths: decode_parts(geometry, "paths", usize::MAX)?,
            }),
            GeometryType::Polygon => Ok(EsriGeometry::Polygon {
                rings: decode_parts(geometry, "rings", usize::MAX)?,
            }),
            GeometryType::Other(tag) => Err(GeometryError::UnsupportedType(tag.clone())),
        }
    }

    /// Decode only the parts GeoJSON conversion renders.
    ///
    /// Polylines keep their first path and later paths are not inspected, so a malformed
    /// trailing path does not drop the feature. Other types decode as in [`EsriGeometry::decode`].
    pub fn decode_rendered(
        geometry: &Map<String, Value>,
        geometry_type: &GeometryType,
    ) -> Result<Self, GeometryError> {
        match geometry_type {
            GeometryType::Polyline => Ok(EsriGeometry::Polyline {
                paths: decode_parts(geometry, "paths", 1)?,
            }),
            _ => Self::decode(geometry, geometry_type),
        }
    }
}

fn decode_parts(
    geometry: &Map<String, Value>,
    key: &'static str,
    max_parts: usize,
) -> Result<Vec<geo::LineString>, GeometryError> {
    let parts = geometry
        .get(key)
        .and_then(Value::as_array)
        .ok_or(GeometryError::Missing(key))?;
    if parts.is_empty() {
        return Err(GeometryError::Empty(key));
    }
    parts
        .iter()
        .take(max_parts)
        .map(|part| {
            let coords = part.as_array().ok_or(GeometryError::InvalidCoordinate(key))?;
            coords
                .iter()
                .map(|coord| decode_coord(coord).ok_or(GeometryError::InvalidCoordinate(key)))
                .collect::<Result<Vec<geo::Coord>, _>>()
                .map(geo::LineString::new)
        })
        .collect()
}

fn decode_coord(value: &Value) -> Option<geo::Coord> {
    match value.as_array()?.as_slice() {
        [x, y, ..] => Some(geo::Coord {
            x: x.as_f64()?,
            y: y.as_f64()?,
        }),
        _ => None,
    }
}
