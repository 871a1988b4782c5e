use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An operational constraint on the network, tagged by kind.
///
/// A scenario may reference constraints either by primary key or by type
/// string (§4.1); the adapter disambiguates by whether all references in a
/// scenario's `constraints` list are strings matching one of these tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Constraint {
    Maintenance {
        segment_id: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        #[serde(default)]
        reason: Option<String>,
    },
    Headway {
        segment_id: String,
        min_gap_sec: i64,
    },
    PlatformMaintenance {
        station_id: String,
        platform_id: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        #[serde(default)]
        reason: Option<String>,
    },
    SpeedRestriction {
        segment_id: String,
        max_speed_kmh: f64,
        #[serde(default)]
        reason: Option<String>,
    },
}

impl Constraint {
    pub fn type_tag(&self) -> &'static str {
        match self {
            Constraint::Maintenance { .. } => "maintenance",
            Constraint::Headway { .. } => "headway",
            Constraint::PlatformMaintenance { .. } => "platform_maintenance",
            Constraint::SpeedRestriction { .. } => "speed_restriction",
        }
    }

    pub fn segment_id(&self) -> Option<&str> {
        match self {
            Constraint::Maintenance { segment_id, .. } => Some(segment_id),
            Constraint::Headway { segment_id, .. } => Some(segment_id),
            Constraint::SpeedRestriction { segment_id, .. } => Some(segment_id),
            Constraint::PlatformMaintenance { .. } => None,
        }
    }
}
