use serde::{Deserialize, Serialize};

use super::error::{FeatureServiceError, Result};

pub const DEFAULT_WHERE: &str = "1=1";
pub const DEFAULT_OUT_FIELDS: &str = "*";
pub const DEFAULT_MAX_RECORD_COUNT: i64 = 1000;

/// Options of a layer query. `max_record_count` is what is asked of the service, which may
/// answer with a different number of features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueryOptions {
    #[serde(rename = "where")]
    pub where_clause: String,
    pub out_fields: String,
    pub return_geometry: bool,
    pub max_record_count: i64,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            where_clause: DEFAULT_WHERE.to_string(),
            out_fields: DEFAULT_OUT_FIELDS.to_string(),
            return_geometry: true,
            max_record_count: DEFAULT_MAX_RECORD_COUNT,
        }
    }
}

impl QueryOptions {
    pub fn with_where(mut self, where_clause: impl Into<String>) -> Self {
        self.where_clause = where_clause.into();
        self
    }

    pub fn with_out_fields(mut self, out_fields: impl Into<String>) -> Self {
        self.out_fields = out_fields.into();
        self
    }

    pub fn with_return_geometry(mut self, return_geometry: bool) -> Self {
        self.return_geometry = return_geometry;
        self
    }

    pub fn with_max_record_count(mut self, max_record_count: i64) -> Self {
        self.max_record_count = max_record_count;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_record_count <= 0 {
            return Err(FeatureServiceError::InvalidArgument(format!(
                "Invalid maxRecordCount: {}. Must be a positive number.",
                self.max_record_count
            )));
        }
        Ok(())
    }

    /// Query string pairs, `f=json` first.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("f", "json".to_string()),
            ("where", self.where_clause.clone()),
            ("outFields", self.out_fields.clone()),
            ("returnGeometry", self.return_geometry.to_string()),
            ("maxRecordCount", self.max_record_count.to_string()),
        ]
    }
}

pub fn validate_layer_id(layer_id: i64) -> Result<()> {
    if layer_id < 0 {
        return Err(FeatureServiceError::InvalidArgument(format!(
            "Invalid layer ID: {}. Must be a positive number.",
            layer_id
        )));
    }
    Ok(())
}
