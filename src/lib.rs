//! Client for ArcGIS FeatureServer layers: fetches vector features, validates them, converts
//! them to WGS84 GeoJSON and smoke-tests a live service.

pub mod arcgis;
pub mod crs;
pub mod dashboard;
pub mod diagnostics;
pub mod geofile;
pub mod validator;

pub use arcgis::{FeatureClient, FeatureServiceError, LayerDescriptor, QueryOptions, QueryResult};
pub use diagnostics::{Diagnostic, DiagnosticSink, LogSink, RecordingSink};
