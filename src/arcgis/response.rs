use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::crs::crs_utils::SpatialReference;
use crate::geofile::feature::{Feature, GeometryType, OBJECT_ID_FIELD};

use super::error::{FeatureServiceError, Result};

/// Validated answer of a layer query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub features: Vec<Feature>,
    pub geometry_type: GeometryType,
    pub spatial_reference: SpatialReference,
}

/// Validated layer metadata. Every other field the service sent is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDescriptor {
    pub name: String,
    pub geometry_type: GeometryType,
    pub max_record_count: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn parse_body(body: &str) -> Result<Map<String, Value>> {
    if body.trim().is_empty() {
        return Err(FeatureServiceError::malformed("No response data received"));
    }
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(FeatureServiceError::malformed(format!(
            "Expected a JSON object, got {}",
            other
        ))),
        Err(err) => Err(FeatureServiceError::malformed(format!(
            "Response is not valid JSON: {}",
            err
        ))),
    }
}

/// Fails with `RemoteService` when the payload carries an `error` object.
fn check_service_error(object: &Map<String, Value>) -> Result<()> {
    match object.get("error") {
        None | Some(Value::Null) => Ok(()),
        Some(error) => {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .filter(|message| !message.is_empty())
                .unwrap_or("Unknown error");
            Err(FeatureServiceError::RemoteService(message.to_string()))
        }
    }
}

fn geometry_type_field(object: &Map<String, Value>) -> Option<GeometryType> {
    object
        .get("geometryType")
        .and_then(Value::as_str)
        .filter(|tag| !tag.is_empty())
        .map(GeometryType::parse)
}

fn decode_feature(index: usize, value: Value) -> Result<Feature> {
    let mut object = match value {
        Value::Object(object) => object,
        _ => return Err(FeatureServiceError::malformed_feature(index, "is not an object")),
    };
    let attributes = match object.remove("attributes") {
        Some(Value::Object(attributes)) => attributes,
        _ => return Err(FeatureServiceError::malformed_feature(index, "missing attributes")),
    };
    let geometry = match object.remove("geometry") {
        Some(Value::Object(geometry)) => geometry,
        _ => return Err(FeatureServiceError::malformed_feature(index, "missing geometry")),
    };
    let feature = Feature {
        attributes,
        geometry,
    };
    if feature.object_id().is_none() {
        return Err(FeatureServiceError::malformed_feature(
            index,
            format!("missing {} attribute", OBJECT_ID_FIELD),
        ));
    }
    Ok(feature)
}

/// Decode and validate the body of a `/query` request.
///
/// Feature geometry is only required to be an object. Whether it matches `geometryType` is
/// left to [`EsriGeometry::decode`](crate::geofile::feature::EsriGeometry::decode), and
/// conversion drops features that do not match.
pub fn decode_query_response(body: &str) -> Result<QueryResult> {
    let mut object = parse_body(body)?;
    check_service_error(&object)?;

    let features = match object.remove("features") {
        None | Some(Value::Null) => {
            return Err(FeatureServiceError::malformed("Response missing features array"))
        }
        Some(Value::Array(features)) => features,
        Some(_) => return Err(FeatureServiceError::malformed("Features must be an array")),
    };
    let geometry_type = geometry_type_field(&object)
        .ok_or_else(|| FeatureServiceError::malformed("Response missing geometry type"))?;
    let spatial_reference = match object.remove("spatialReference") {
        Some(value @ Value::Object(_)) => serde_json::from_value::<SpatialReference>(value)
            .map_err(|err| {
                FeatureServiceError::malformed(format!("Invalid spatial reference: {}", err))
            })?,
        _ => {
            return Err(FeatureServiceError::malformed(
                "Response missing spatial reference",
            ))
        }
    };

    let features = features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| decode_feature(index, feature))
        .collect::<Result<Vec<Feature>>>()?;

    Ok(QueryResult {
        features,
        geometry_type,
        spatial_reference,
    })
}

/// Decode and validate the body of a layer metadata request.
pub fn decode_layer_info(body: &str) -> Result<LayerDescriptor> {
    let mut object = parse_body(body)?;
    check_service_error(&object)?;

    let name = match object.remove("name") {
        Some(Value::String(name)) if !name.is_empty() => name,
        _ => return Err(FeatureServiceError::malformed("Layer info missing name")),
    };
    let geometry_type = geometry_type_field(&object)
        .ok_or_else(|| FeatureServiceError::malformed("Layer info missing geometry type"))?;
    object.remove("geometryType");
    let max_record_count = match object.remove("maxRecordCount") {
        None | Some(Value::Null) => {
            return Err(FeatureServiceError::malformed(
                "Layer info missing max record count",
            ))
        }
        Some(value) => value.as_u64().filter(|count| *count > 0).ok_or_else(|| {
            FeatureServiceError::malformed(format!(
                "Layer info max record count must be a positive integer, got {}",
                value
            ))
        })?,
    };

    Ok(LayerDescriptor {
        name,
        geometry_type,
        max_record_count,
        extra: object,
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use crate::arcgis::error::FeatureServiceError;
    use crate::geofile::feature::GeometryType;

    use super::{decode_layer_info, decode_query_response};

    fn query_body(features: serde_json::Value) -> String {
        json!({
            "geometryType": "esriGeometryPolyline",
            "spatialReference": {"wkid": 102100, "latestWkid": 3857},
            "features": features,
        })
        .to_string()
    }

    #[test]
    fn test_decode_query_response() {
        let body = query_body(json!([
            {"attributes": {"OBJECTID": 1}, "geometry": {"paths": [[[0.0, 0.0], [1.0, 1.0]]]}},
            {"attributes": {"OBJECTID": 2}, "geometry": {"paths": []}},
        ]));
        let result = decode_query_response(&body).unwrap();
        assert_eq!(result.features.len(), 2);
        assert_eq!(result.geometry_type, GeometryType::Polyline);
        assert_eq!(result.spatial_reference.wkid, Some(102100));
        assert_eq!(result.features[1].object_id(), Some(&json!(2)));
    }

    #[test]
    fn test_geometry_shape_is_not_checked_against_type() {
        let body = query_body(json!([
            {"attributes": {"OBJECTID": 1}, "geometry": {"x": 1.0, "y": 2.0}},
        ]));
        let result = decode_query_response(&body).unwrap();
        assert_eq!(result.geometry_type, GeometryType::Polyline);
        assert_eq!(result.features.len(), 1);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("not json")]
    #[case("[1, 2]")]
    #[case(r#"{"geometryType": "esriGeometryPoint", "spatialReference": {"wkid": 4326}}"#)]
    #[case(r#"{"features": {}, "geometryType": "esriGeometryPoint", "spatialReference": {"wkid": 4326}}"#)]
    #[case(r#"{"features": [], "spatialReference": {"wkid": 4326}}"#)]
    #[case(r#"{"features": [], "geometryType": "", "spatialReference": {"wkid": 4326}}"#)]
    #[case(r#"{"features": [], "geometryType": "esriGeometryPoint"}"#)]
    fn test_malformed_query_envelope(#[case] body: &str) {
        match decode_query_response(body) {
            Err(FeatureServiceError::MalformedResponse { feature_index, .. }) => {
                assert_eq!(feature_index, None)
            }
            other => panic!("Expected MalformedResponse, got {:?}", other),
        }
    }

    #[rstest]
    #[case(json!([{"geometry": {"x": 0.0, "y": 0.0}}]), "missing attributes")]
    #[case(json!([{"attributes": {"OBJECTID": 1}}]), "missing geometry")]
    #[case(json!([{"attributes": {"NAME": "a"}, "geometry": {"x": 0.0, "y": 0.0}}]), "missing OBJECTID attribute")]
    #[case(json!([{"attributes": {"OBJECTID": null}, "geometry": {"x": 0.0, "y": 0.0}}]), "missing OBJECTID attribute")]
    fn test_malformed_feature_names_index(
        #[case] features: serde_json::Value,
        #[case] expected_message: &str,
    ) {
        let mut all_features = vec![json!({"attributes": {"OBJECTID": 1}, "geometry": {"paths": []}})];
        all_features.extend(features.as_array().unwrap().iter().cloned());
        let error = decode_query_response(&query_body(json!(all_features))).unwrap_err();
        assert_eq!(error.feature_index(), Some(1));
        assert!(
            error.to_string().contains(expected_message),
            "unexpected message {}",
            error
        );
    }

    #[rstest]
    #[case(r#"{"error": {"code": 400, "message": "Invalid query parameters."}}"#, "Invalid query parameters.")]
    #[case(r#"{"error": {"code": 500}}"#, "Unknown error")]
    fn test_service_error(#[case] body: &str, #[case] expected_message: &str) {
        match decode_query_response(body) {
            Err(FeatureServiceError::RemoteService(message)) => {
                assert_eq!(message, expected_message)
            }
            other => panic!("Expected RemoteService, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_layer_info_passes_extra_fields_through() {
        let body = json!({
            "name": "BCBH Preliminary Segments",
            "geometryType": "esriGeometryPolyline",
            "maxRecordCount": 2000,
            "type": "Feature Layer",
            "fields": [{"name": "OBJECTID", "type": "esriFieldTypeOID"}],
        })
        .to_string();
        let layer = decode_layer_info(&body).unwrap();
        assert_eq!(layer.name, "BCBH Preliminary Segments");
        assert_eq!(layer.geometry_type, GeometryType::Polyline);
        assert_eq!(layer.max_record_count, 2000);
        assert_eq!(layer.extra.get("type"), Some(&json!("Feature Layer")));

        let serialized = serde_json::to_value(&layer).unwrap();
        assert_eq!(serialized["geometryType"], json!("esriGeometryPolyline"));
        assert_eq!(serialized["maxRecordCount"], json!(2000));
        assert!(serialized["fields"].is_array());
    }

    #[rstest]
    #[case(json!({"geometryType": "esriGeometryPoint", "maxRecordCount": 1000}))]
    #[case(json!({"name": "", "geometryType": "esriGeometryPoint", "maxRecordCount": 1000}))]
    #[case(json!({"name": "Wells", "maxRecordCount": 1000}))]
    #[case(json!({"name": "Wells", "geometryType": "esriGeometryPoint"}))]
    #[case(json!({"name": "Wells", "geometryType": "esriGeometryPoint", "maxRecordCount": "1000"}))]
    #[case(json!({"name": "Wells", "geometryType": "esriGeometryPoint", "maxRecordCount": 0}))]
    #[case(json!({"name": "Wells", "geometryType": "esriGeometryPoint", "maxRecordCount": -5}))]
    #[case(json!({"name": "Wells", "geometryType": "esriGeometryPoint", "maxRecordCount": 2.5}))]
    fn test_malformed_layer_info(#[case] body: serde_json::Value) {
        assert!(matches!(
            decode_layer_info(&body.to_string()),
            Err(FeatureServiceError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_layer_info_service_error() {
        let body = r#"{"error": {"code": 400, "message": "Invalid or missing input parameters."}}"#;
        assert!(decode_layer_info(body).unwrap_err().is_remote_service());
    }
}
