pub mod crs_utils;
pub mod web_mercator;
