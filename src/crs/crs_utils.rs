use serde::{Deserialize, Serialize};

/// Well-known ID of a spatial reference system as used by ArcGIS services.
pub type Wkid = u32;

/// Geographic WGS84.
pub const WKID_WGS84: Wkid = 4326;
/// Geographic NAD83, treated as WGS84.
pub const WKID_NAD83: Wkid = 4269;
/// Web Mercator, EPSG code.
pub const WKID_WEB_MERCATOR: Wkid = 3857;
/// Web Mercator, legacy Esri code still returned by many services.
pub const WKID_WEB_MERCATOR_ESRI: Wkid = 102100;

/// Spatial reference descriptor as found in ArcGIS responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpatialReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wkid: Option<Wkid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_wkid: Option<Wkid>,
}

impl SpatialReference {
    pub fn from_wkid(wkid: Wkid) -> Self {
        Self {
            wkid: Some(wkid),
            latest_wkid: None,
        }
    }

    /// The WKID to interpret coordinates with. `latestWkid` is only used when `wkid` is absent.
    pub fn effective_wkid(&self) -> Option<Wkid> {
        self.wkid.or(self.latest_wkid)
    }
}

/// Coordinate systems the GeoJSON conversion knows how to deal with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSystem {
    /// No spatial reference was given, coordinates are assumed geographic.
    Assumed,
    Geographic,
    WebMercator,
    Unsupported(Wkid),
}

impl CoordinateSystem {
    pub fn from_spatial_reference(spatial_reference: Option<&SpatialReference>) -> Self {
        match spatial_reference.and_then(|sr| sr.effective_wkid()) {
            None => CoordinateSystem::Assumed,
            Some(WKID_WGS84) | Some(WKID_NAD83) => CoordinateSystem::Geographic,
            Some(WKID_WEB_MERCATOR) | Some(WKID_WEB_MERCATOR_ESRI) => CoordinateSystem::WebMercator,
            Some(wkid) => CoordinateSystem::Unsupported(wkid),
        }
    }
}

pub fn wkid_to_authority_string(wkid: Wkid) -> String {
    match wkid {
        WKID_WEB_MERCATOR_ESRI => format!("ESRI:{}", wkid),
        _ => format!("EPSG:{}", wkid),
    }
}
