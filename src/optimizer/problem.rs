//! The Problem Model (§4.2): a pure, in-memory snapshot of one optimiser
//! run's input, already normalised to integer minutes by the adapter.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::{Constraint, PlatformOccupancy, Scenario, Segment, Station, Train};

pub const MAX_EARLINESS_MIN: i64 = 5;
pub const MAX_LATENESS_MIN: i64 = 60;
pub const MIN_DWELL_MIN: i64 = 1;
pub const BLOCKS_PER_SEGMENT: usize = Segment::BLOCKS_PER_SEGMENT;

/// One stop in a train's route, already expressed in minutes-since-origin.
#[derive(Debug, Clone)]
pub struct RouteStop {
    pub station_id: String,
    pub planned_min: i64,
    pub preassigned_platform: Option<String>,
    pub min_dwell_sec: Option<i64>,
}

impl RouteStop {
    /// Minimum dwell in whole minutes, rounded up (§4.3 temporal constraint 2).
    pub fn min_dwell_minutes(&self) -> i64 {
        match self.min_dwell_sec {
            Some(sec) if sec > 0 => ((sec as f64) / 60.0).ceil() as i64,
            _ => MIN_DWELL_MIN,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NormalisedTrain {
    pub train: Train,
    pub route: Vec<RouteStop>,
}

/// Identity of one of the `BLOCKS_PER_SEGMENT` equal subdivisions of a
/// segment, used for block-level exclusivity modelling (§3, §4.3).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockId {
    pub segment_id: String,
    pub index: usize,
}

impl BlockId {
    pub fn new(segment_id: impl Into<String>, index: usize) -> Self {
        Self {
            segment_id: segment_id.into(),
            index,
        }
    }
}

/// A fixed platform occupancy with both its original datetime fields and
/// their minutes-since-origin equivalents (§4.1 step 5).
#[derive(Debug, Clone)]
pub struct OccupancyMinutes {
    pub occupancy: PlatformOccupancy,
    pub start_min: i64,
    pub end_min: i64,
}

#[derive(Debug, Clone)]
pub struct ProblemModel {
    pub trains: Vec<NormalisedTrain>,
    pub stations: HashMap<String, Station>,
    pub segments: HashMap<String, Segment>,
    pub constraints: Vec<Constraint>,
    pub fixed_occupancies: Vec<OccupancyMinutes>,
    pub origin_time: DateTime<Utc>,
    pub scenario: Option<Scenario>,
}

impl ProblemModel {
    /// §4.2 invariant: `TIME_HORIZON >= max(planned) + 120`, lower-bounded by a day.
    pub fn time_horizon(&self) -> i64 {
        let max_planned = self
            .trains
            .iter()
            .flat_map(|t| t.route.iter().map(|s| s.planned_min))
            .max()
            .unwrap_or(0);
        (max_planned + 120).max(24 * 60)
    }

    pub fn segment_between(&self, from_station: &str, to_station: &str) -> Option<&Segment> {
        self.segments
            .values()
            .find(|s| s.from_station == from_station && s.to_station == to_station)
    }

    pub fn blocks_for_segment(segment_id: &str) -> Vec<BlockId> {
        (0..BLOCKS_PER_SEGMENT)
            .map(|i| BlockId::new(segment_id, i))
            .collect()
    }
}
