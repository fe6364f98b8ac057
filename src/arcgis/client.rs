use std::sync::Arc;

use geojson::FeatureCollection;

use crate::crs::crs_utils::SpatialReference;
use crate::crs::web_mercator;
use crate::diagnostics::{Diagnostic, DiagnosticSink, LogSink};
use crate::geofile::{self, feature::Feature};

use super::error::{FeatureServiceError, Result};
use super::query::{validate_layer_id, QueryOptions};
use super::response::{decode_layer_info, decode_query_response, LayerDescriptor, QueryResult};

pub const DEFAULT_USER_AGENT: &str = "featureserver-rust";

/// Client for one ArcGIS FeatureServer endpoint.
///
/// The client holds no per-request state, so a single instance can serve concurrent calls.
/// Every call sends exactly one request; nothing is retried.
#[derive(Clone)]
pub struct FeatureClient {
    base_url: String,
    http_client: reqwest::Client,
    sink: Arc<dyn DiagnosticSink>,
}

impl FeatureClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_sink(base_url, Arc::new(LogSink))
    }

    /// Create a client reporting advisory conditions to `sink`.
    ///
    /// An empty base URL is rejected. A URL that does not look like an ArcGIS FeatureServer is
    /// accepted with a diagnostic.
    pub fn with_sink(base_url: impl Into<String>, sink: Arc<dyn DiagnosticSink>) -> Result<Self> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(FeatureServiceError::InvalidArgument(
                "Base URL is required".to_string(),
            ));
        }
        if !base_url.contains("arcgis.com") {
            sink.warn(Diagnostic::NotArcGisHost {
                base_url: base_url.clone(),
            });
        }
        if !base_url.contains("FeatureServer") {
            sink.warn(Diagnostic::NotFeatureServer {
                base_url: base_url.clone(),
            });
        }
        let http_client = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        Ok(Self {
            base_url,
            http_client,
            sink,
        })
    }

    /// Replace the underlying HTTP client, e.g. to set a proxy or a different user agent.
    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = http_client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_body(&self, url: &str, query: &[(&str, String)]) -> Result<String> {
        let response = self
            .http_client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|err| FeatureServiceError::Transport {
                status: None,
                message: format!("Request to {} failed: {}", url, err),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeatureServiceError::Transport {
                status: Some(status.as_u16()),
                message: format!("status: {}", status.as_u16()),
            });
        }
        Ok(response.text().await?)
    }

    /// Query the features of a layer.
    ///
    /// The service may return a different number of features than `options.max_record_count`.
    /// Geometries are only checked to be objects; those not matching the geometry type are
    /// dropped later by [`FeatureClient::convert_to_geojson`].
    pub async fn fetch_features(&self, layer_id: i64, options: &QueryOptions) -> Result<QueryResult> {
        validate_layer_id(layer_id)?;
        options.validate()?;

        let url = format!("{}/{}/query", self.base_url, layer_id);
        log::info!(
            "Fetching features from {} where {}",
            url,
            options.where_clause
        );
        let result = async {
            let body = self.get_body(&url, &options.to_query_pairs()).await?;
            decode_query_response(&body)
        }
        .await;

        match result {
            Ok(result) => {
                log::info!(
                    "Fetched {} {} features (requested at most {}), spatial reference {:?}",
                    result.features.len(),
                    result.geometry_type,
                    options.max_record_count,
                    result.spatial_reference
                );
                Ok(result)
            }
            Err(err) => {
                log::error!("Error fetching features from layer {}: {}", layer_id, err);
                Err(err)
            }
        }
    }

    /// Fetch and validate the metadata of a layer.
    pub async fn get_layer_info(&self, layer_id: i64) -> Result<LayerDescriptor> {
        validate_layer_id(layer_id)?;

        let url = format!("{}/{}", self.base_url, layer_id);
        log::debug!("Fetching layer info from {}", url);
        let result = async {
            let body = self.get_body(&url, &[("f", "json".to_string())]).await?;
            decode_layer_info(&body)
        }
        .await;

        if let Err(err) = &result {
            log::error!("Error fetching layer info for layer {}: {}", layer_id, err);
        }
        result
    }

    /// Convert features to a WGS84 GeoJSON FeatureCollection, see
    /// [`geofile::geojson::convert_to_geojson`].
    pub fn convert_to_geojson(
        &self,
        features: &[Feature],
        geometry_type: &str,
        spatial_reference: Option<&SpatialReference>,
    ) -> Result<FeatureCollection> {
        geofile::geojson::convert_to_geojson(
            features,
            geometry_type,
            spatial_reference,
            self.sink.as_ref(),
        )
    }

    pub fn transform_to_wgs84(
        &self,
        coords: &[geo::Coord],
        spatial_reference: Option<&SpatialReference>,
    ) -> Vec<geo::Coord> {
        web_mercator::transform_to_wgs84(coords, spatial_reference, self.sink.as_ref())
    }
}

impl std::fmt::Debug for FeatureClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
