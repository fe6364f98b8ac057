use std::{fs, io, path::Path};

use geojson::{FeatureCollection, Position};

use crate::arcgis::error::{FeatureServiceError, Result};
use crate::crs::crs_utils::{wkid_to_authority_string, CoordinateSystem, SpatialReference};
use crate::diagnostics::{Diagnostic, DiagnosticSink};

use super::feature::{EsriGeometry, Feature, GeometryType};

pub fn empty_feature_collection() -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: Vec::new(),
        foreign_members: None,
    }
}

fn project_line(line: &geo::LineString, system: CoordinateSystem) -> geo::LineString {
    line.coords().map(|coord| system.to_wgs84(*coord)).collect()
}

fn positions(line: &geo::LineString) -> Vec<Position> {
    line.coords().map(|coord| vec![coord.x, coord.y]).collect()
}

impl EsriGeometry {
    /// Convert to a GeoJSON geometry in WGS84.
    ///
    /// Polylines only keep their first path: multi-part lines lose every part after the first.
    pub fn to_geojson(&self, system: CoordinateSystem) -> geojson::Geometry {
        let value = match self {
            EsriGeometry::Point(point) => {
                let coord = system.to_wgs84(point.0);
                geojson::Value::Point(vec![coord.x, coord.y])
            }
            EsriGeometry::Polyline { paths } => match paths.first() {
                Some(path) => geojson::Value::from(&project_line(path, system)),
                None => geojson::Value::LineString(Vec::new()),
            },
            EsriGeometry::Polygon { rings } => geojson::Value::Polygon(
                rings
                    .iter()
                    .map(|ring| positions(&project_line(ring, system)))
                    .collect(),
            ),
        };
        geojson::Geometry::new(value)
    }
}

/// Convert ArcGIS features into a GeoJSON FeatureCollection in WGS84.
///
/// Features whose rendered geometry cannot be decoded for `geometry_type` are dropped; the
/// output keeps the order of the remaining features. Properties are the untouched attributes.
pub fn convert_to_geojson(
    features: &[Feature],
    geometry_type: &str,
    spatial_reference: Option<&SpatialReference>,
    sink: &dyn DiagnosticSink,
) -> Result<FeatureCollection> {
    if geometry_type.is_empty() {
        return Err(FeatureServiceError::InvalidArgument(
            "Geometry type is required".to_string(),
        ));
    }
    if features.is_empty() {
        sink.warn(Diagnostic::NoFeaturesToConvert);
        return Ok(empty_feature_collection());
    }

    let geometry_type = GeometryType::parse(geometry_type);
    if geometry_type.geojson_type().is_none() {
        sink.warn(Diagnostic::UnknownGeometryType(geometry_type.to_string()));
        return Ok(empty_feature_collection());
    }

    let system = CoordinateSystem::from_spatial_reference(spatial_reference);
    system.report(sink);
    if let CoordinateSystem::WebMercator = system {
        if let Some(wkid) = spatial_reference.and_then(|sr| sr.effective_wkid()) {
            log::debug!(
                "Unprojecting {} features from {}",
                features.len(),
                wkid_to_authority_string(wkid)
            );
        }
    }

    let converted: Vec<geojson::Feature> = features
        .iter()
        .enumerate()
        .filter_map(|(index, feature)| {
            match EsriGeometry::decode_rendered(&feature.geometry, &geometry_type) {
                Ok(geometry) => Some(geojson::Feature {
                    bbox: None,
                    geometry: Some(geometry.to_geojson(system)),
                    id: None,
                    properties: Some(feature.attributes.clone()),
                    foreign_members: None,
                }),
                Err(err) => {
                    sink.warn(Diagnostic::DroppedFeature {
                        index,
                        reason: err.to_string(),
                    });
                    None
                }
            }
        })
        .collect();

    log::info!(
        "Converted {} of {} {} features to GeoJSON",
        converted.len(),
        features.len(),
        geometry_type
    );
    Ok(FeatureCollection {
        bbox: None,
        features: converted,
        foreign_members: None,
    })
}

pub fn write_feature_collection(
    feature_collection: &FeatureCollection,
    output_filepath: &Path,
) -> io::Result<()> {
    let geojson_contents = geojson::GeoJson::from(feature_collection.clone());
    fs::write(output_filepath, geojson_contents.to_string())
}
