use std::fmt;
use std::sync::Mutex;

use crate::crs::crs_utils::Wkid;

/// Advisory condition noticed while talking to a feature service. None of these stop the
/// operation that raised them.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// The base URL does not look like it points at an ArcGIS host.
    NotArcGisHost { base_url: String },
    /// The base URL does not point at a FeatureServer endpoint.
    NotFeatureServer { base_url: String },
    /// No usable spatial reference was supplied, coordinates are taken as WGS84.
    MissingSpatialReference,
    /// Coordinates were passed through untouched in an unknown coordinate system.
    UnsupportedWkid(Wkid),
    /// Conversion was asked for an empty feature list.
    NoFeaturesToConvert,
    /// The geometry type tag has no GeoJSON counterpart.
    UnknownGeometryType(String),
    /// A single feature could not be converted and was left out of the output.
    DroppedFeature { index: usize, reason: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::NotArcGisHost { base_url } => {
                write!(f, "Base URL {} may not be a valid ArcGIS service", base_url)
            }
            Diagnostic::NotFeatureServer { base_url } => {
                write!(f, "Base URL {} should point to a Feature Server", base_url)
            }
            Diagnostic::MissingSpatialReference => write!(f, "No spatial reference, assuming WGS84"),
            Diagnostic::UnsupportedWkid(wkid) => {
                write!(f, "Unsupported coordinate system WKID: {}", wkid)
            }
            Diagnostic::NoFeaturesToConvert => write!(f, "No features to convert"),
            Diagnostic::UnknownGeometryType(tag) => write!(f, "Unknown geometry type: {}", tag),
            Diagnostic::DroppedFeature { index, reason } => {
                write!(f, "Could not convert geometry for feature {}: {}", index, reason)
            }
        }
    }
}

/// Receiver for advisory diagnostics.
pub trait DiagnosticSink: Send + Sync {
    fn warn(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn warn(&self, diagnostic: Diagnostic) {
        log::warn!("{}", diagnostic);
    }
}

/// Keeps every diagnostic in memory so callers can inspect them afterwards.
#[derive(Debug, Default)]
pub struct RecordingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self.diagnostics.lock() {
            Ok(diagnostics) => diagnostics.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn contains(&self, diagnostic: &Diagnostic) -> bool {
        self.diagnostics().contains(diagnostic)
    }
}

impl DiagnosticSink for RecordingSink {
    fn warn(&self, diagnostic: Diagnostic) {
        log::debug!("Recording diagnostic: {}", diagnostic);
        match self.diagnostics.lock() {
            Ok(mut diagnostics) => diagnostics.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Diagnostic, DiagnosticSink, RecordingSink};

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingSink::new();
        sink.warn(Diagnostic::MissingSpatialReference);
        sink.warn(Diagnostic::UnsupportedWkid(2277));
        assert_eq!(
            sink.diagnostics(),
            vec![
                Diagnostic::MissingSpatialReference,
                Diagnostic::UnsupportedWkid(2277)
            ]
        );
        assert!(sink.contains(&Diagnostic::UnsupportedWkid(2277)));
    }

    #[test]
    fn test_display() {
        let diagnostic = Diagnostic::DroppedFeature {
            index: 4,
            reason: "empty paths".to_string(),
        };
        assert_eq!(
            diagnostic.to_string(),
            "Could not convert geometry for feature 4: empty paths"
        );
    }
}
