//! Smoke tests for a live feature service.
//!
//! Each check drives a [`FeatureClient`] against a known dataset and returns a
//! [`report::CheckResult`]. Checks are independent: a failing check never stops the ones after
//! it, and running the suite never returns an error.

pub mod checks;
pub mod report;

use std::time::Instant;

use serde::Deserialize;

use crate::arcgis::FeatureClient;

use report::SuiteReport;

pub const SUITE_NAME: &str = "ArcGIS Service Test Suite";

/// What the validated service is expected to serve.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ValidationExpectations {
    /// Layer every check runs against.
    pub layer_id: i64,
    /// When set, the layer name has to match exactly.
    pub expected_layer_name: Option<String>,
    pub expected_geometry_type: String,
    /// A layer id the service does not have.
    pub invalid_layer_id: i64,
    /// A where clause the service rejects.
    pub invalid_where: String,
    /// Upper bound on features returned for a 10 record request.
    pub max_reasonable_features: usize,
    pub concurrent_threshold_ms: u64,
    pub single_request_threshold_ms: u64,
}

impl Default for ValidationExpectations {
    fn default() -> Self {
        Self {
            layer_id: 12,
            expected_layer_name: Some("BCBH Preliminary Segments".to_string()),
            expected_geometry_type: "esriGeometryPolyline".to_string(),
            invalid_layer_id: 99999,
            invalid_where: "INVALID_SQL_SYNTAX".to_string(),
            max_reasonable_features: 100,
            concurrent_threshold_ms: 5000,
            single_request_threshold_ms: 3000,
        }
    }
}

/// Run every check in order and collect the results.
pub async fn run_all(client: &FeatureClient, expectations: &ValidationExpectations) -> SuiteReport {
    let start = Instant::now();
    log::info!("Starting {} against {}", SUITE_NAME, client.base_url());

    let results = vec![
        checks::service_initialization(client, expectations).await,
        checks::layer_info_retrieval(client, expectations).await,
        checks::feature_fetching(client, expectations).await,
        checks::data_validation(client, expectations).await,
        checks::error_handling(client, expectations).await,
        checks::geojson_conversion(client, expectations).await,
        checks::performance_testing(client, expectations).await,
        checks::data_consistency(client, expectations).await,
    ];

    let report = SuiteReport::new(SUITE_NAME, results, start.elapsed());
    for line in report.to_string().lines() {
        log::info!("{}", line);
    }
    report
}
