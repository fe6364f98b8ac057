//! Payloads served to the dashboard map, built on top of [`crate::arcgis::FeatureClient`].

pub mod layers;
pub mod map_features;
pub mod probe;
