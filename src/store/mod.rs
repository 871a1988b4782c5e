//! Persistence interface (§6). The core optimiser depends only on [`Store`];
//! it never reaches for a concrete database client (§9 "no ambient
//! singletons"). [`memory::MemoryStore`] is the in-process reference
//! implementation that ships with this crate — a real deployment would
//! swap it for a client backed by an external document store.

pub mod memory;
pub mod records;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{Constraint, PlatformOccupancy, Scenario, Train, TrainEvent};
use records::{SegmentRecord, StationRecord, TrainRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("store I/O error: {0}")]
    Io(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read side of the persistence interface (§6).
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_scenario(&self, scenario_id: &str) -> StoreResult<Option<Scenario>>;
    async fn get_trains(&self, ids: &[String]) -> StoreResult<Vec<TrainRecord>>;
    async fn get_stations(&self, ids: &[String]) -> StoreResult<Vec<StationRecord>>;
    async fn get_segments(&self, ids: &[String]) -> StoreResult<Vec<SegmentRecord>>;
    async fn get_train_events(&self, train_ids: &[String]) -> StoreResult<Vec<TrainEvent>>;
    async fn get_constraints(&self, refs: &[String]) -> StoreResult<Vec<Constraint>>;
    /// Fixed occupancies overlapping `window`, independent of which train
    /// holds them (§4.1 step 8): a foreign train's reservation or an
    /// external block must still constrain the scenario's own trains, so
    /// this is a window predicate only, never a scenario-train filter.
    /// `window = None` returns every occupancy on record.
    async fn get_platform_occupancy(
        &self,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> StoreResult<Vec<PlatformOccupancy>>;

    // Ambient CRUD surface backing the HTTP layer's scenario/train/station
    // listings (§1 "thin HTTP surface").
    async fn put_scenario(&self, scenario: Scenario) -> StoreResult<()>;
    async fn delete_scenario(&self, scenario_id: &str) -> StoreResult<bool>;
    async fn list_scenarios(&self) -> StoreResult<Vec<Scenario>>;
    async fn list_trains(&self) -> StoreResult<Vec<Train>>;
    async fn list_stations(&self) -> StoreResult<Vec<StationRecord>>;
    async fn list_segments(&self) -> StoreResult<Vec<SegmentRecord>>;
    async fn events_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<TrainEvent>>;
}

/// Write side of the persistence interface (§6): replaces events/occupancies
/// for a set of trains non-atomically (delete-then-insert, §5).
#[async_trait]
pub trait StoreWriter: Send + Sync {
    async fn delete_events_for_trains(&self, train_ids: &[String]) -> StoreResult<u64>;
    async fn insert_events(&self, events: Vec<TrainEvent>) -> StoreResult<u64>;
    async fn delete_occupancy_for_trains(&self, train_ids: &[String]) -> StoreResult<u64>;
    async fn insert_occupancy(&self, occupancy: Vec<PlatformOccupancy>) -> StoreResult<u64>;
}

/// A persistence handle exposing both the read and write sides (§6). The
/// core never depends on a concrete database client, only on this pair of
/// traits (§9 "no ambient singletons").
pub trait StoreHandle: Store + StoreWriter {}
impl<T: Store + StoreWriter + ?Sized> StoreHandle for T {}
