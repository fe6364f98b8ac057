use std::sync::Arc;

use featureserver_rust::validator::{checks, run_all, ValidationExpectations};
use featureserver_rust::{FeatureClient, RecordingSink};
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;

const SERVICE_PATH: &str = "/arcgis/rest/services/Permian_CCN/FeatureServer";

fn segments_body() -> String {
    json!({
        "objectIdFieldName": "OBJECTID",
        "geometryType": "esriGeometryPolyline",
        "spatialReference": {"wkid": 102100, "latestWkid": 3857},
        "features": [
            {"attributes": {"OBJECTID": 1, "link_id": "L-1"}, "geometry": {"paths": [[[-11436465.0, 3723200.0], [-11436000.0, 3723500.0]]]}},
            {"attributes": {"OBJECTID": 2, "link_id": "L-2"}, "geometry": {"paths": [[[-11436000.0, 3723500.0], [-11435500.0, 3723900.0]]]}},
            {"attributes": {"OBJECTID": 3, "link_id": "L-3"}, "geometry": {"paths": [[[-11435500.0, 3723900.0], [-11435000.0, 3724100.0]]]}},
        ]
    })
    .to_string()
}

async fn healthy_service(server: &mut ServerGuard) -> Vec<Mock> {
    vec![
        server
            .mock("GET", format!("{}/12", SERVICE_PATH).as_str())
            .match_query(Matcher::UrlEncoded("f".into(), "json".into()))
            .with_status(200)
            .with_body(
                json!({
                    "id": 12,
                    "name": "BCBH Preliminary Segments",
                    "geometryType": "esriGeometryPolyline",
                    "maxRecordCount": 2000,
                })
                .to_string(),
            )
            .create_async()
            .await,
        server
            .mock("GET", format!("{}/99999", SERVICE_PATH).as_str())
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"error": {"code": 400, "message": "Invalid or missing input parameters.", "details": []}}"#)
            .create_async()
            .await,
        server
            .mock("GET", format!("{}/12/query", SERVICE_PATH).as_str())
            .match_query(Matcher::UrlEncoded("where".into(), "1=1".into()))
            .with_status(200)
            .with_body(segments_body())
            .create_async()
            .await,
        server
            .mock("GET", format!("{}/12/query", SERVICE_PATH).as_str())
            .match_query(Matcher::UrlEncoded(
                "where".into(),
                "INVALID_SQL_SYNTAX".into(),
            ))
            .with_status(200)
            .with_body(r#"{"error": {"code": 400, "message": "Unable to complete operation.", "details": []}}"#)
            .create_async()
            .await,
    ]
}

fn client_for(server: &ServerGuard) -> FeatureClient {
    FeatureClient::with_sink(
        format!("{}{}", server.url(), SERVICE_PATH),
        Arc::new(RecordingSink::new()),
    )
    .unwrap()
}

#[tokio::test]
async fn healthy_service_passes_every_check() {
    let mut server = Server::new_async().await;
    let _mocks = healthy_service(&mut server).await;
    let client = client_for(&server);

    let report = run_all(&client, &ValidationExpectations::default()).await;

    let failures: Vec<_> = report
        .failures()
        .map(|failure| (failure.test_name.clone(), failure.error.clone()))
        .collect();
    assert!(failures.is_empty(), "unexpected failures {:?}", failures);
    assert_eq!(report.total_tests, 8);
    assert_eq!(report.passed_tests, 8);
    assert_eq!(report.success_rate, 100.0);

    let conversion = report.result(checks::GEOJSON_CONVERSION).unwrap();
    let details = conversion.details.as_ref().unwrap();
    assert_eq!(details["convertedFeatures"], json!(3));
    assert_eq!(details["sampleGeoJSON"]["geometry"]["type"], json!("LineString"));
}

#[tokio::test]
async fn failing_service_never_aborts_the_suite() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", Matcher::Any)
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;
    let client = client_for(&server);

    let report = run_all(&client, &ValidationExpectations::default()).await;

    assert_eq!(report.total_tests, 8);
    // Initialization needs no network, and every invalid request still fails as expected.
    assert!(report.result(checks::SERVICE_INITIALIZATION).unwrap().passed);
    assert!(report.result(checks::ERROR_HANDLING).unwrap().passed);
    assert_eq!(report.failed_tests, 6);
    let layer_info = report.result(checks::LAYER_INFO_RETRIEVAL).unwrap();
    assert!(layer_info.error.as_deref().unwrap().contains("500"));
    assert!(report.to_string().contains("Failed Tests:"));
}

#[tokio::test]
async fn unexpected_layer_name_fails_only_layer_info() {
    let mut server = Server::new_async().await;
    let _mocks = healthy_service(&mut server).await;
    let client = client_for(&server);
    let expectations = ValidationExpectations {
        expected_layer_name: Some("Compressor Stations".to_string()),
        ..ValidationExpectations::default()
    };

    let report = run_all(&client, &expectations).await;

    let failed: Vec<&str> = report
        .failures()
        .map(|failure| failure.test_name.as_str())
        .collect();
    assert_eq!(failed, vec![checks::LAYER_INFO_RETRIEVAL]);
}

#[tokio::test]
async fn inconsistent_service_fails_consistency_check() {
    let mut server = Server::new_async().await;
    // Every query answers with a different number of features.
    let bodies: Vec<String> = (1..=3)
        .map(|count| {
            let features: Vec<_> = (1..=count)
                .map(|id| json!({"attributes": {"OBJECTID": id}, "geometry": {"paths": [[[0.0, 0.0], [1.0, 1.0]]]}}))
                .collect();
            json!({
                "geometryType": "esriGeometryPolyline",
                "spatialReference": {"wkid": 4326},
                "features": features,
            })
            .to_string()
        })
        .collect();
    let mut mocks = Vec::new();
    for body in bodies {
        mocks.push(
            server
                .mock("GET", format!("{}/12/query", SERVICE_PATH).as_str())
                .match_query(Matcher::Any)
                .with_status(200)
                .with_body(body)
                .expect(1)
                .create_async()
                .await,
        );
    }
    let client = client_for(&server);

    let result = checks::data_consistency(&client, &ValidationExpectations::default()).await;

    assert!(!result.passed);
    assert!(result
        .error
        .as_deref()
        .unwrap()
        .contains("should return same feature count"));
}
