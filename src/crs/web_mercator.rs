use std::f64::consts::{FRAC_PI_2, PI};

use geo::Coord;

use crate::diagnostics::{Diagnostic, DiagnosticSink};

use super::crs_utils::{CoordinateSystem, SpatialReference};

/// Half the circumference of the spherical Mercator world, in metres.
pub const WEB_MERCATOR_HALF_EXTENT: f64 = 20037508.34;

/// Inverse spherical Mercator projection of a single coordinate to lon/lat degrees.
pub fn web_mercator_to_wgs84(coord: Coord) -> Coord {
    let lng = (coord.x / WEB_MERCATOR_HALF_EXTENT) * 180.0;
    let lat = (2.0 * (coord.y * PI / WEB_MERCATOR_HALF_EXTENT).exp().atan() - FRAC_PI_2)
        * (180.0 / PI);
    Coord { x: lng, y: lat }
}

impl CoordinateSystem {
    /// Map a coordinate of this system to WGS84. Anything that is not Web Mercator is passed
    /// through unchanged.
    pub fn to_wgs84(&self, coord: Coord) -> Coord {
        match self {
            CoordinateSystem::WebMercator => web_mercator_to_wgs84(coord),
            _ => coord,
        }
    }

    /// Report the advisory conditions of this system, if any.
    pub fn report(&self, sink: &dyn DiagnosticSink) {
        match self {
            CoordinateSystem::Assumed => sink.warn(Diagnostic::MissingSpatialReference),
            CoordinateSystem::Unsupported(wkid) => sink.warn(Diagnostic::UnsupportedWkid(*wkid)),
            _ => {}
        }
    }
}

/// Transform coordinates given in `spatial_reference` to WGS84.
///
/// Geographic systems (4326, 4269) and a missing spatial reference are returned unchanged, Web
/// Mercator (3857, 102100) is unprojected. Other systems are returned unchanged as well, with
/// an `UnsupportedWkid` diagnostic.
pub fn transform_to_wgs84(
    coords: &[Coord],
    spatial_reference: Option<&SpatialReference>,
    sink: &dyn DiagnosticSink,
) -> Vec<Coord> {
    let system = CoordinateSystem::from_spatial_reference(spatial_reference);
    system.report(sink);
    coords.iter().map(|coord| system.to_wgs84(*coord)).collect()
}
