use serde::{Deserialize, Serialize};

/// A train participating in a scenario.
///
/// Normalised by the data adapter from records that may key on either
/// `_id` or `train_id` (see [`crate::optimizer::adapter`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Train {
    pub id: String,
    #[serde(rename = "type")]
    pub train_type: TrainType,
    pub priority: i32,
    pub avg_speed_kmh: f64,
    pub length_m: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainType {
    Express,
    Passenger,
    Local,
    Freight,
}

impl Default for TrainType {
    fn default() -> Self {
        TrainType::Local
    }
}
