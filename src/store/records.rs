use serde::{Deserialize, Serialize};

use crate::models::TrainType;

/// Raw train document as it might be returned by a heterogeneous document
/// store: either `_id` or `train_id` may carry the identifier (§4.1, §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainRecord {
    #[serde(default)]
    pub train_id: Option<String>,
    #[serde(default, rename = "_id")]
    pub legacy_id: Option<String>,
    #[serde(rename = "type")]
    pub train_type: TrainType,
    #[serde(default)]
    pub priority: i32,
    pub avg_speed_kmh: f64,
    #[serde(default, alias = "length")]
    pub length_m: f64,
}

impl TrainRecord {
    pub fn resolved_id(&self) -> Option<String> {
        self.train_id.clone().or_else(|| self.legacy_id.clone())
    }
}

/// Raw platform sub-document; may carry a legacy `id` instead of
/// `platform_id`. Records with neither are dropped by the adapter (§4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformRecord {
    #[serde(default)]
    pub platform_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    pub length_m: f64,
    #[serde(default)]
    pub electrified: bool,
}

impl PlatformRecord {
    pub fn resolved_id(&self) -> Option<String> {
        self.platform_id.clone().or_else(|| self.id.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub platforms: Vec<PlatformRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub capacity: u32,
    pub travel_time_min: i64,
    #[serde(default)]
    pub distance_m: Option<f64>,
}
