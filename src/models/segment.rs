use serde::{Deserialize, Serialize};

/// A directional track segment connecting two stations.
///
/// Subdivided into [`crate::optimizer::problem::BlockId`]s for exclusivity
/// modelling by the constraint builder; the segment itself only carries the
/// static network data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    pub from_station: String,
    pub to_station: String,
    pub capacity: u32,
    pub travel_time_min: i64,
    pub distance_m: f64,
    #[serde(default)]
    pub speed_restriction: Option<SpeedRestriction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedRestriction {
    pub max_kmh: f64,
    pub reason: String,
    pub active: bool,
}

impl Segment {
    /// Blocks per segment used for exclusivity modelling.
    pub const BLOCKS_PER_SEGMENT: usize = 3;

    pub fn active_speed_restriction(&self) -> Option<&SpeedRestriction> {
        self.speed_restriction.as_ref().filter(|r| r.active)
    }
}
