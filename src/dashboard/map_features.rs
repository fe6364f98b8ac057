use chrono::{DateTime, Utc};
use geojson::FeatureCollection;
use serde::Serialize;

use crate::arcgis::{error::Result, FeatureClient, QueryOptions};
use crate::crs::crs_utils::SpatialReference;
use crate::geofile::feature::GeometryType;

use super::layers::LayerConfig;

pub const FEATURE_SOURCE: &str = "ArcGIS FeatureServer";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapFeaturesMetadata {
    pub source: String,
    pub layer_id: i64,
    pub layer_name: String,
    pub feature_count: usize,
    pub geometry_type: GeometryType,
    pub spatial_reference: SpatialReference,
}

/// GeoJSON ready for the dashboard map, along with where it came from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapFeaturesPayload {
    #[serde(rename = "geoJSON")]
    pub geojson: FeatureCollection,
    pub metadata: MapFeaturesMetadata,
    pub timestamp: DateTime<Utc>,
}

/// Fetch the features of `layer` and convert them to WGS84 GeoJSON.
pub async fn fetch_map_features(
    client: &FeatureClient,
    layer: &LayerConfig,
    options: &QueryOptions,
) -> Result<MapFeaturesPayload> {
    let result = client.fetch_features(layer.layer_id, options).await?;
    let geojson = client.convert_to_geojson(
        &result.features,
        result.geometry_type.as_str(),
        Some(&result.spatial_reference),
    )?;
    log::info!(
        "Prepared {} {} features of layer {} for the map",
        geojson.features.len(),
        result.geometry_type,
        layer.name
    );

    Ok(MapFeaturesPayload {
        metadata: MapFeaturesMetadata {
            source: FEATURE_SOURCE.to_string(),
            layer_id: layer.layer_id,
            layer_name: layer.name.clone(),
            feature_count: geojson.features.len(),
            geometry_type: result.geometry_type,
            spatial_reference: result.spatial_reference,
        },
        geojson,
        timestamp: Utc::now(),
    })
}
