pub mod constraint;
pub mod event;
pub mod occupancy;
pub mod scenario;
pub mod segment;
pub mod station;
pub mod train;

pub use constraint::Constraint;
pub use event::{EventKind, TrainEvent};
pub use occupancy::PlatformOccupancy;
pub use scenario::Scenario;
pub use segment::{Segment, SpeedRestriction};
pub use station::{Platform, Station};
pub use train::{Train, TrainType};

/// Priority weight applied to a train's lateness/earliness in the objective.
///
/// Higher-priority train types cost more per minute of deviation, pushing
/// the solver to protect their schedules first.
pub fn priority_weight(train_type: TrainType) -> i32 {
    match train_type {
        TrainType::Express => 10,
        TrainType::Passenger => 8,
        TrainType::Local => 5,
        TrainType::Freight => 1,
    }
}
