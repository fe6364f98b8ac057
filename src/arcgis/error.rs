/// Errors returned by [`crate::arcgis::client::FeatureClient`].
#[derive(Debug, thiserror::Error)]
pub enum FeatureServiceError {
    /// A caller-supplied parameter was rejected before any request was sent.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The HTTP exchange failed, either with a non-success status or without any response.
    #[error("HTTP error: {message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// The service answered but reported an error object in its payload.
    #[error("ArcGIS error: {0}")]
    RemoteService(String),

    /// The payload did not have the expected structure.
    #[error("Malformed response: {message}")]
    MalformedResponse {
        message: String,
        feature_index: Option<usize>,
    },
}

impl FeatureServiceError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
            feature_index: None,
        }
    }

    pub fn malformed_feature(index: usize, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: format!("Feature {} {}", index, message.into()),
            feature_index: Some(index),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub fn is_remote_service(&self) -> bool {
        matches!(self, Self::RemoteService(_))
    }

    /// HTTP status code, when the failure came with a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// Index of the offending feature for per-feature validation failures.
    pub fn feature_index(&self) -> Option<usize> {
        match self {
            Self::MalformedResponse { feature_index, .. } => *feature_index,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FeatureServiceError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            status: err.status().map(|status| status.as_u16()),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FeatureServiceError>;
