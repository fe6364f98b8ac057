use serde::{Deserialize, Serialize};

/// Rendering hints for a map layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerStyle {
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            color: "#3b82f6".to_string(),
            width: Some(2.0),
            opacity: Some(0.8),
        }
    }
}

/// A feature-service layer shown on the dashboard map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Short handle used to refer to the layer, e.g. `bcbh-segments`.
    pub id: String,
    /// Numeric layer id within the feature service.
    pub layer_id: i64,
    pub name: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub style: LayerStyle,
}

fn default_visible() -> bool {
    true
}

impl LayerConfig {
    /// Layer without a configured entry, named after its numeric id.
    pub fn unnamed(layer_id: i64) -> Self {
        Self {
            id: format!("layer-{}", layer_id),
            layer_id,
            name: format!("Layer {}", layer_id),
            visible: true,
            style: LayerStyle::default(),
        }
    }
}

/// Look a layer up by its handle, falling back to the first visible layer when no handle is
/// given.
pub fn find_layer<'a>(layers: &'a [LayerConfig], id: Option<&str>) -> Option<&'a LayerConfig> {
    match id {
        Some(id) => layers.iter().find(|layer| layer.id == id),
        None => layers.iter().find(|layer| layer.visible),
    }
}
