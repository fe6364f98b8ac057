use chrono::{DateTime, Utc};
use geojson::FeatureCollection;
use serde::Serialize;

use crate::arcgis::{error::Result, FeatureClient, QueryOptions};
use crate::crs::crs_utils::SpatialReference;
use crate::geofile::feature::{Feature, GeometryType, OBJECT_ID_FIELD};

const PROBE_MAX_RECORD_COUNT: i64 = 10;
const PROBE_SAMPLE_SIZE: usize = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeLayerInfo {
    pub name: String,
    pub geometry_type: GeometryType,
    pub max_record_count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeFeatures {
    pub count: usize,
    pub geometry_type: GeometryType,
    pub spatial_reference: SpatialReference,
    pub sample: Vec<Feature>,
    #[serde(rename = "geoJSON")]
    pub geojson: FeatureCollection,
}

/// Quick look at a layer: its metadata and a handful of `OBJECTID`-only features.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub layer_info: ProbeLayerInfo,
    pub features: ProbeFeatures,
    pub timestamp: DateTime<Utc>,
}

pub async fn probe_service(client: &FeatureClient, layer_id: i64) -> Result<ProbeReport> {
    let layer = client.get_layer_info(layer_id).await?;
    log::info!(
        "Layer {} is {} ({}), max record count {}",
        layer_id,
        layer.name,
        layer.geometry_type,
        layer.max_record_count
    );

    let options = QueryOptions::default()
        .with_out_fields(OBJECT_ID_FIELD)
        .with_max_record_count(PROBE_MAX_RECORD_COUNT);
    let result = client.fetch_features(layer_id, &options).await?;
    let geojson = client.convert_to_geojson(
        &result.features,
        result.geometry_type.as_str(),
        Some(&result.spatial_reference),
    )?;

    Ok(ProbeReport {
        layer_info: ProbeLayerInfo {
            name: layer.name,
            geometry_type: layer.geometry_type,
            max_record_count: layer.max_record_count,
        },
        features: ProbeFeatures {
            count: result.features.len(),
            geometry_type: result.geometry_type,
            spatial_reference: result.spatial_reference,
            sample: result
                .features
                .iter()
                .take(PROBE_SAMPLE_SIZE)
                .cloned()
                .collect(),
            geojson,
        },
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};
    use serde_json::json;

    use crate::arcgis::FeatureClient;

    use super::probe_service;

    #[tokio::test]
    async fn test_probe_service_samples_first_features() {
        let mut server = Server::new_async().await;
        let _layer = server
            .mock("GET", "/FeatureServer/4")
            .match_query(Matcher::UrlEncoded("f".into(), "json".into()))
            .with_status(200)
            .with_body(
                json!({"name": "Compressor Stations", "geometryType": "esriGeometryPoint", "maxRecordCount": 1000})
                    .to_string(),
            )
            .create_async()
            .await;
        let features: Vec<serde_json::Value> = (1..=5)
            .map(|id| json!({"attributes": {"OBJECTID": id}, "geometry": {"x": 0.0, "y": 0.0}}))
            .collect();
        let query = server
            .mock("GET", "/FeatureServer/4/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("outFields".into(), "OBJECTID".into()),
                Matcher::UrlEncoded("maxRecordCount".into(), "10".into()),
            ]))
            .with_status(200)
            .with_body(
                json!({
                    "geometryType": "esriGeometryPoint",
                    "spatialReference": {"wkid": 102100, "latestWkid": 3857},
                    "features": features,
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let client = FeatureClient::new(format!("{}/FeatureServer", server.url())).unwrap();
        let report = probe_service(&client, 4).await.unwrap();

        query.assert_async().await;
        assert_eq!(report.layer_info.name, "Compressor Stations");
        assert_eq!(report.features.count, 5);
        assert_eq!(report.features.sample.len(), 3);
        assert_eq!(report.features.geojson.features.len(), 5);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["layerInfo"]["maxRecordCount"], json!(1000));
        assert_eq!(value["features"]["sample"][2]["attributes"]["OBJECTID"], json!(3));
    }
}
