use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, ensure};
use serde_json::{json, Value};

use crate::arcgis::{FeatureClient, FeatureServiceError, QueryOptions};
use crate::geofile::feature::{EsriGeometry, GeometryType};

use super::report::CheckResult;
use super::ValidationExpectations;

pub const SERVICE_INITIALIZATION: &str = "Service Initialization";
pub const LAYER_INFO_RETRIEVAL: &str = "Layer Info Retrieval";
pub const FEATURE_FETCHING: &str = "Feature Fetching";
pub const DATA_VALIDATION: &str = "Data Validation";
pub const ERROR_HANDLING: &str = "Error Handling";
pub const GEOJSON_CONVERSION: &str = "GeoJSON Conversion";
pub const PERFORMANCE_TESTING: &str = "Performance Testing";
pub const DATA_CONSISTENCY: &str = "Data Consistency";

/// Leading records compared between identical requests.
const CONSISTENCY_LEADING_RECORDS: usize = 3;

fn expected_geometry_type(expectations: &ValidationExpectations) -> GeometryType {
    GeometryType::parse(&expectations.expected_geometry_type)
}

pub async fn service_initialization(
    client: &FeatureClient,
    _expectations: &ValidationExpectations,
) -> CheckResult {
    let outcome = (|| {
        ensure!(
            !client.base_url().is_empty(),
            "Assertion failed: Service base URL should not be empty"
        );
        let url = reqwest::Url::parse(client.base_url())
            .map_err(|err| anyhow!("Assertion failed: Base URL should be a valid URL, {}", err))?;
        ensure!(
            matches!(url.scheme(), "http" | "https"),
            "Assertion failed: Base URL should use http or https"
        );
        Ok::<_, anyhow::Error>(Some(json!({ "baseUrl": client.base_url() })))
    })();
    CheckResult::from_outcome(SERVICE_INITIALIZATION, outcome)
}

pub async fn layer_info_retrieval(
    client: &FeatureClient,
    expectations: &ValidationExpectations,
) -> CheckResult {
    let outcome = async {
        let layer = client.get_layer_info(expectations.layer_id).await?;
        ensure!(
            !layer.name.is_empty(),
            "Assertion failed: Layer name should be a non-empty string"
        );
        if let Some(expected_name) = &expectations.expected_layer_name {
            ensure!(
                &layer.name == expected_name,
                "Assertion failed: Layer name should match expected value, got {}",
                layer.name
            );
        }
        ensure!(
            layer.geometry_type == expected_geometry_type(expectations),
            "Assertion failed: Geometry type should be {}, got {}",
            expectations.expected_geometry_type,
            layer.geometry_type
        );
        ensure!(
            layer.max_record_count > 0,
            "Assertion failed: Max record count should be positive"
        );
        Ok::<_, anyhow::Error>(Some(json!({ "layerInfo": serde_json::to_value(&layer)? })))
    }
    .await;
    CheckResult::from_outcome(LAYER_INFO_RETRIEVAL, outcome)
}

pub async fn feature_fetching(
    client: &FeatureClient,
    expectations: &ValidationExpectations,
) -> CheckResult {
    const REQUESTED_MAX: i64 = 10;
    let outcome = async {
        let options = QueryOptions::default()
            .with_out_fields("OBJECTID")
            .with_max_record_count(REQUESTED_MAX);
        let result = client
            .fetch_features(expectations.layer_id, &options)
            .await?;

        ensure!(
            !result.features.is_empty(),
            "Assertion failed: Should return at least one feature"
        );
        // The service may override maxRecordCount, only check for a reasonable count.
        ensure!(
            result.features.len() <= expectations.max_reasonable_features,
            "Assertion failed: Should return a reasonable number of features, got {}",
            result.features.len()
        );
        ensure!(
            result.geometry_type == expected_geometry_type(expectations),
            "Assertion failed: Should return {} geometry, got {}",
            expectations.expected_geometry_type,
            result.geometry_type
        );
        let first = &result.features[0];
        ensure!(
            first.object_id().is_some(),
            "Assertion failed: Feature should have OBJECTID attribute"
        );
        Ok::<_, anyhow::Error>(Some(json!({
            "featureCount": result.features.len(),
            "requestedMax": REQUESTED_MAX,
            "actualMax": result.features.len(),
            "note": "ArcGIS may override maxRecordCount based on service configuration",
        })))
    }
    .await;
    CheckResult::from_outcome(FEATURE_FETCHING, outcome)
}

fn validate_geometry(index: usize, geometry: &EsriGeometry) -> anyhow::Result<()> {
    match geometry {
        EsriGeometry::Point(_) => {}
        EsriGeometry::Polyline { paths } => {
            for path in paths {
                ensure!(
                    path.0.len() >= 2,
                    "Assertion failed: Feature {} path should have at least 2 coordinates",
                    index
                );
            }
        }
        EsriGeometry::Polygon { rings } => {
            for ring in rings {
                ensure!(
                    ring.0.len() >= 3,
                    "Assertion failed: Feature {} ring should have at least 3 coordinates",
                    index
                );
            }
        }
    }
    Ok(())
}

pub async fn data_validation(
    client: &FeatureClient,
    expectations: &ValidationExpectations,
) -> CheckResult {
    let outcome = async {
        let options = QueryOptions::default().with_max_record_count(100);
        let result = client
            .fetch_features(expectations.layer_id, &options)
            .await?;

        for (index, feature) in result.features.iter().enumerate() {
            ensure!(
                feature.object_id().is_some(),
                "Assertion failed: Feature {} should have OBJECTID",
                index
            );
            let geometry = EsriGeometry::decode(&feature.geometry, &result.geometry_type)
                .map_err(|err| {
                    anyhow!("Assertion failed: Feature {} has invalid geometry, {}", index, err)
                })?;
            validate_geometry(index, &geometry)?;
        }
        Ok::<_, anyhow::Error>(Some(json!({ "validatedFeatures": result.features.len() })))
    }
    .await;
    CheckResult::from_outcome(DATA_VALIDATION, outcome)
}

pub async fn error_handling(
    client: &FeatureClient,
    expectations: &ValidationExpectations,
) -> CheckResult {
    let outcome = async {
        match client.get_layer_info(expectations.invalid_layer_id).await {
            Ok(_) => bail!(
                "Assertion failed: Should return an error for invalid layer ID {}",
                expectations.invalid_layer_id
            ),
            Err(err) => ensure!(
                err.is_transport() || err.is_remote_service(),
                "Assertion failed: Should report an HTTP or ArcGIS error for an invalid layer, got {}",
                err
            ),
        }

        let invalid_filter = QueryOptions::default()
            .with_where(expectations.invalid_where.as_str())
            .with_max_record_count(10);
        if client
            .fetch_features(expectations.layer_id, &invalid_filter)
            .await
            .is_ok()
        {
            bail!(
                "Assertion failed: Should return an error for invalid where clause {}",
                expectations.invalid_where
            );
        }

        let negative_count = QueryOptions::default().with_max_record_count(-1);
        match client
            .fetch_features(expectations.layer_id, &negative_count)
            .await
        {
            Err(FeatureServiceError::InvalidArgument(_)) => {}
            Err(err) => bail!(
                "Assertion failed: Should reject a negative maxRecordCount as an invalid argument, got {}",
                err
            ),
            Ok(_) => bail!("Assertion failed: Should reject a negative maxRecordCount"),
        }
        Ok::<_, anyhow::Error>(None)
    }
    .await;
    CheckResult::from_outcome(ERROR_HANDLING, outcome)
}

fn geojson_type_name(value: &geojson::Value) -> &'static str {
    match value {
        geojson::Value::Point(_) => "Point",
        geojson::Value::MultiPoint(_) => "MultiPoint",
        geojson::Value::LineString(_) => "LineString",
        geojson::Value::MultiLineString(_) => "MultiLineString",
        geojson::Value::Polygon(_) => "Polygon",
        geojson::Value::MultiPolygon(_) => "MultiPolygon",
        geojson::Value::GeometryCollection(_) => "GeometryCollection",
    }
}

pub async fn geojson_conversion(
    client: &FeatureClient,
    expectations: &ValidationExpectations,
) -> CheckResult {
    let outcome = async {
        let options = QueryOptions::default().with_max_record_count(5);
        let result = client
            .fetch_features(expectations.layer_id, &options)
            .await?;
        let collection = client.convert_to_geojson(
            &result.features,
            result.geometry_type.as_str(),
            Some(&result.spatial_reference),
        )?;

        ensure!(
            collection.features.len() == result.features.len(),
            "Assertion failed: Should preserve feature count, {} of {} converted",
            collection.features.len(),
            result.features.len()
        );
        let expected_type = result.geometry_type.geojson_type().ok_or_else(|| {
            anyhow!(
                "Assertion failed: Geometry type {} has no GeoJSON equivalent",
                result.geometry_type
            )
        })?;
        for (index, (converted, original)) in
            collection.features.iter().zip(&result.features).enumerate()
        {
            let geometry = converted
                .geometry
                .as_ref()
                .ok_or_else(|| anyhow!("Assertion failed: Feature {} should have a geometry", index))?;
            ensure!(
                geojson_type_name(&geometry.value) == expected_type,
                "Assertion failed: Feature {} should be {}",
                index,
                expected_type
            );
            let object_id = converted
                .properties
                .as_ref()
                .and_then(|properties| properties.get("OBJECTID"));
            ensure!(
                object_id.is_some() && object_id == original.object_id(),
                "Assertion failed: Feature {} should preserve OBJECTID",
                index
            );
        }

        let sample = match collection.features.first() {
            Some(feature) => serde_json::to_value(feature)?,
            None => Value::Null,
        };
        Ok::<_, anyhow::Error>(Some(json!({
            "convertedFeatures": collection.features.len(),
            "sampleGeoJSON": sample,
        })))
    }
    .await;
    CheckResult::from_outcome(GEOJSON_CONVERSION, outcome)
}

pub async fn performance_testing(
    client: &FeatureClient,
    expectations: &ValidationExpectations,
) -> CheckResult {
    let outcome = async {
        let layer_id = expectations.layer_id;
        let options_10 = QueryOptions::default().with_max_record_count(10);
        let options_20 = QueryOptions::default().with_max_record_count(20);
        let options_50 = QueryOptions::default().with_max_record_count(50);

        let start = Instant::now();
        let (layer, fetch_10, fetch_20, fetch_50) = tokio::join!(
            client.get_layer_info(layer_id),
            client.fetch_features(layer_id, &options_10),
            client.fetch_features(layer_id, &options_20),
            client.fetch_features(layer_id, &options_50),
        );
        let concurrent_time = start.elapsed();
        layer?;
        fetch_10?;
        fetch_20?;
        fetch_50?;

        let concurrent_threshold = Duration::from_millis(expectations.concurrent_threshold_ms);
        ensure!(
            concurrent_time < concurrent_threshold,
            "Assertion failed: Total time should be under {}ms, got {}ms",
            concurrent_threshold.as_millis(),
            concurrent_time.as_millis()
        );

        let single_start = Instant::now();
        client
            .fetch_features(layer_id, &QueryOptions::default().with_max_record_count(100))
            .await?;
        let single_time = single_start.elapsed();
        let single_threshold = Duration::from_millis(expectations.single_request_threshold_ms);
        ensure!(
            single_time < single_threshold,
            "Assertion failed: Single request should complete under {}ms, got {}ms",
            single_threshold.as_millis(),
            single_time.as_millis()
        );

        Ok::<_, anyhow::Error>(Some(json!({
            "concurrentTimeMs": concurrent_time.as_millis() as u64,
            "singleRequestTimeMs": single_time.as_millis() as u64,
        })))
    }
    .await;
    CheckResult::from_outcome(PERFORMANCE_TESTING, outcome)
}

pub async fn data_consistency(
    client: &FeatureClient,
    expectations: &ValidationExpectations,
) -> CheckResult {
    let outcome = async {
        let options = QueryOptions::default().with_max_record_count(10);
        let layer_id = expectations.layer_id;
        let (first, second, third) = tokio::join!(
            client.fetch_features(layer_id, &options),
            client.fetch_features(layer_id, &options),
            client.fetch_features(layer_id, &options),
        );
        let results = [first?, second?, third?];

        let reference = &results[0];
        for (request, result) in results.iter().enumerate().skip(1) {
            ensure!(
                result.features.len() == reference.features.len(),
                "Assertion failed: Request {} should return same feature count, got {} instead of {}",
                request,
                result.features.len(),
                reference.features.len()
            );
            let leading = reference.features.len().min(CONSISTENCY_LEADING_RECORDS);
            for index in 0..leading {
                ensure!(
                    result.features[index].object_id() == reference.features[index].object_id(),
                    "Assertion failed: Request {} feature {} should have same OBJECTID",
                    request,
                    index
                );
            }
        }

        Ok::<_, anyhow::Error>(Some(json!({
            "consistencyChecks": results.len(),
            "featureCount": reference.features.len(),
        })))
    }
    .await;
    CheckResult::from_outcome(DATA_CONSISTENCY, outcome)
}
