extern crate log;
use anyhow::anyhow;
use clap::{Parser, Subcommand};
use featureserver_rust::arcgis::client::DEFAULT_USER_AGENT;
use featureserver_rust::arcgis::{FeatureClient, QueryOptions};
use featureserver_rust::dashboard::layers::{find_layer, LayerConfig};
use featureserver_rust::dashboard::map_features::fetch_map_features;
use featureserver_rust::dashboard::probe::probe_service;
use featureserver_rust::geofile::geojson::write_feature_collection;
use featureserver_rust::validator::{self, ValidationExpectations};
use serde::Deserialize;
use std::path::PathBuf;
use std::{fs::read_to_string, path::Path};

/// Fetch, convert and smoke-test ArcGIS FeatureServer layers.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input config file.
    #[arg(short, long)]
    config_filepath: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the metadata of a layer along with a few sample features.
    LayerInfo {
        #[arg(short, long)]
        layer_id: i64,
    },
    /// Fetch a layer as GeoJSON.
    Fetch {
        /// Handle of a layer from the config file. Defaults to the first visible layer.
        #[arg(short, long)]
        layer: Option<String>,
        /// Numeric layer id, for layers missing from the config file.
        #[arg(long, conflicts_with = "layer")]
        layer_id: Option<i64>,
    },
    /// Run the service validation suite.
    Validate {
        /// Print the report as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

#[derive(Deserialize, Debug)]
struct Config {
    service_url: String,
    #[serde(default = "default_user_agent")]
    user_agent: String,
    output_dir: Option<PathBuf>,
    #[serde(default)]
    query: QueryOptions,
    #[serde(default)]
    layers: Vec<LayerConfig>,
    #[serde(default)]
    validation: ValidationExpectations,
}

fn read_config(config_filepath: &str) -> anyhow::Result<Config> {
    if !Path::new(config_filepath).exists() {
        return Err(anyhow!("Config file {} not found", config_filepath));
    }
    let config_contents = read_to_string(config_filepath)?;
    Ok(serde_yaml::from_str(&config_contents)?)
}

fn build_client(config: &Config) -> anyhow::Result<FeatureClient> {
    let http_client = reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .build()?;
    Ok(FeatureClient::new(config.service_url.as_str())?.with_http_client(http_client))
}

fn resolve_layer(
    config: &Config,
    layer: Option<&str>,
    layer_id: Option<i64>,
) -> anyhow::Result<LayerConfig> {
    if let Some(layer_id) = layer_id {
        return Ok(config
            .layers
            .iter()
            .find(|configured| configured.layer_id == layer_id)
            .cloned()
            .unwrap_or_else(|| LayerConfig::unnamed(layer_id)));
    }
    find_layer(&config.layers, layer)
        .cloned()
        .ok_or_else(|| match layer {
            Some(layer) => anyhow!("Layer {} not found in config", layer),
            None => anyhow!("No visible layer configured, pass --layer-id"),
        })
}

async fn try_main() -> anyhow::Result<bool> {
    let args = Args::try_parse()?;
    let config = read_config(&args.config_filepath)?;
    let client = build_client(&config)?;

    match args.command {
        Command::LayerInfo { layer_id } => {
            let report = probe_service(&client, layer_id).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Fetch { layer, layer_id } => {
            let layer = resolve_layer(&config, layer.as_deref(), layer_id)?;
            let payload = fetch_map_features(&client, &layer, &config.query).await?;
            match &config.output_dir {
                Some(output_dir) => {
                    let geojson_filepath = output_dir.join(format!("{}.geojson", layer.id));
                    log::info!(
                        "Writing {} features to {:?}",
                        payload.metadata.feature_count,
                        &geojson_filepath
                    );
                    write_feature_collection(&payload.geojson, &geojson_filepath)?;
                    println!("{}", serde_json::to_string_pretty(&payload.metadata)?);
                }
                None => println!("{}", serde_json::to_string_pretty(&payload)?),
            }
        }
        Command::Validate { json } => {
            let report = validator::run_all(&client, &config.validation).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report);
            }
            return Ok(report.all_passed());
        }
    }
    Ok(true)
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match try_main().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("Error: {:?}", e);
            std::process::exit(1)
        }
    }
}
