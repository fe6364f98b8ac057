pub mod client;
pub mod error;
pub mod query;
pub mod response;

pub use client::FeatureClient;
pub use error::FeatureServiceError;
pub use query::QueryOptions;
pub use response::{LayerDescriptor, QueryResult};
