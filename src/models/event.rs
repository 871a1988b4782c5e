use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single scheduled stop event (arrival or departure) for a train.
///
/// This is the persisted, pre-optimisation shape consumed by the data
/// adapter. The same struct, with `actual_time`/`status` filled in, is the
/// shape the event materialiser writes back out (§4.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainEvent {
    pub train_id: String,
    pub event_id: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub station_id: String,
    #[serde(default)]
    pub platform_id: Option<String>,
    pub scheduled_time: DateTime<Utc>,
    #[serde(default)]
    pub earliness_sec: i64,
    #[serde(default)]
    pub lateness_sec: i64,
    #[serde(default)]
    pub min_dwell_sec: Option<i64>,
    #[serde(default)]
    pub actual_time: Option<DateTime<Utc>>,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    "scheduled".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Arrival,
    Departure,
}
