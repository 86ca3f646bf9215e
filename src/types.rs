use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

/// One county boundary keyed by its FIPS code.
#[derive(Debug, Clone)]
pub struct Region {
    pub id: u32,
    pub geometry: MultiPolygon<f64>,
}

/// One entry of the education statistics document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRecord {
    pub fips: u32,
    pub state: String,
    pub area_name: String,
    #[serde(rename = "bachelorsOrHigher")]
    pub bachelors_or_higher: f64,
}
