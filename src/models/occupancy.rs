use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A fixed platform occupancy that the optimiser must respect but does not
/// control — e.g. a stabled rake or a previously-committed stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformOccupancy {
    pub train_id: String,
    pub station_id: String,
    pub platform_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub train_type: Option<String>,
    #[serde(default)]
    pub train_length_m: Option<f64>,
}

impl PlatformOccupancy {
    pub fn overlaps_window(&self, window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> bool {
        self.start_time <= window_end && self.end_time >= window_start
    }
}
