use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::models::{Constraint, PlatformOccupancy, Scenario, Train, TrainEvent};

use super::records::{SegmentRecord, StationRecord, TrainRecord};
use super::{Store, StoreError, StoreResult, StoreWriter};

/// In-process reference implementation of [`Store`]/[`StoreWriter`].
///
/// One struct, one handle, passed around as `Arc<MemoryStore>`, holding its
/// collections in `tokio::sync::RwLock<HashMap<..>>` since no concrete
/// external database is in scope for this crate (§1, §9).
#[derive(Debug, Default)]
pub struct MemoryStore {
    scenarios: RwLock<HashMap<String, Scenario>>,
    trains: RwLock<HashMap<String, TrainRecord>>,
    stations: RwLock<HashMap<String, StationRecord>>,
    segments: RwLock<HashMap<String, SegmentRecord>>,
    constraints: RwLock<HashMap<String, Constraint>>,
    train_events: RwLock<Vec<TrainEvent>>,
    platform_occupancy: RwLock<Vec<PlatformOccupancy>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_train(&self, id: impl Into<String>, record: TrainRecord) {
        self.trains.write().await.insert(id.into(), record);
    }

    pub async fn seed_station(&self, record: StationRecord) {
        self.stations.write().await.insert(record.id.clone(), record);
    }

    pub async fn seed_segment(&self, record: SegmentRecord) {
        self.segments.write().await.insert(record.id.clone(), record);
    }

    pub async fn seed_constraint(&self, key: impl Into<String>, constraint: Constraint) {
        self.constraints.write().await.insert(key.into(), constraint);
    }

    pub async fn seed_train_event(&self, event: TrainEvent) {
        self.train_events.write().await.push(event);
    }

    pub async fn seed_platform_occupancy(&self, occupancy: PlatformOccupancy) {
        self.platform_occupancy.write().await.push(occupancy);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_scenario(&self, scenario_id: &str) -> StoreResult<Option<Scenario>> {
        Ok(self.scenarios.read().await.get(scenario_id).cloned())
    }

    async fn get_trains(&self, ids: &[String]) -> StoreResult<Vec<TrainRecord>> {
        let trains = self.trains.read().await;
        Ok(ids.iter().filter_map(|id| trains.get(id).cloned()).collect())
    }

    async fn get_stations(&self, ids: &[String]) -> StoreResult<Vec<StationRecord>> {
        let stations = self.stations.read().await;
        Ok(ids.iter().filter_map(|id| stations.get(id).cloned()).collect())
    }

    async fn get_segments(&self, ids: &[String]) -> StoreResult<Vec<SegmentRecord>> {
        let segments = self.segments.read().await;
        Ok(ids.iter().filter_map(|id| segments.get(id).cloned()).collect())
    }

    async fn get_train_events(&self, train_ids: &[String]) -> StoreResult<Vec<TrainEvent>> {
        let events = self.train_events.read().await;
        Ok(events
            .iter()
            .filter(|e| train_ids.iter().any(|id| id == &e.train_id))
            .cloned()
            .collect())
    }

    async fn get_constraints(&self, refs: &[String]) -> StoreResult<Vec<Constraint>> {
        let all_strings_are_tags = refs
            .iter()
            .all(|r| matches!(r.as_str(), "maintenance" | "headway" | "platform_maintenance" | "speed_restriction"));

        let constraints = self.constraints.read().await;
        if refs.is_empty() {
            return Ok(Vec::new());
        }
        if all_strings_are_tags {
            Ok(constraints
                .values()
                .filter(|c| refs.iter().any(|r| r == c.type_tag()))
                .cloned()
                .collect())
        } else {
            Ok(refs
                .iter()
                .filter_map(|key| constraints.get(key).cloned())
                .collect())
        }
    }

    async fn get_platform_occupancy(
        &self,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> StoreResult<Vec<PlatformOccupancy>> {
        let occupancy = self.platform_occupancy.read().await;
        Ok(match window {
            Some((start, end)) => occupancy
                .iter()
                .filter(|o| o.overlaps_window(start, end))
                .cloned()
                .collect(),
            None => occupancy.clone(),
        })
    }

    async fn put_scenario(&self, scenario: Scenario) -> StoreResult<()> {
        self.scenarios.write().await.insert(scenario.id.clone(), scenario);
        Ok(())
    }

    async fn delete_scenario(&self, scenario_id: &str) -> StoreResult<bool> {
        Ok(self.scenarios.write().await.remove(scenario_id).is_some())
    }

    async fn list_scenarios(&self) -> StoreResult<Vec<Scenario>> {
        Ok(self.scenarios.read().await.values().cloned().collect())
    }

    async fn list_trains(&self) -> StoreResult<Vec<Train>> {
        let trains = self.trains.read().await;
        Ok(trains
            .iter()
            .filter_map(|(key, record)| {
                let id = record.resolved_id().unwrap_or_else(|| key.clone());
                Some(Train {
                    id,
                    train_type: record.train_type,
                    priority: record.priority,
                    avg_speed_kmh: record.avg_speed_kmh,
                    length_m: record.length_m,
                })
            })
            .collect())
    }

    async fn list_stations(&self) -> StoreResult<Vec<StationRecord>> {
        Ok(self.stations.read().await.values().cloned().collect())
    }

    async fn list_segments(&self) -> StoreResult<Vec<SegmentRecord>> {
        Ok(self.segments.read().await.values().cloned().collect())
    }

    async fn events_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<TrainEvent>> {
        let events = self.train_events.read().await;
        Ok(events
            .iter()
            .filter(|e| e.scheduled_time >= start && e.scheduled_time <= end)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StoreWriter for MemoryStore {
    async fn delete_events_for_trains(&self, train_ids: &[String]) -> StoreResult<u64> {
        let mut events = self.train_events.write().await;
        let before = events.len();
        events.retain(|e| !train_ids.iter().any(|id| id == &e.train_id));
        Ok((before - events.len()) as u64)
    }

    async fn insert_events(&self, new_events: Vec<TrainEvent>) -> StoreResult<u64> {
        let count = new_events.len() as u64;
        self.train_events.write().await.extend(new_events);
        Ok(count)
    }

    async fn delete_occupancy_for_trains(&self, train_ids: &[String]) -> StoreResult<u64> {
        let mut occupancy = self.platform_occupancy.write().await;
        let before = occupancy.len();
        occupancy.retain(|o| !train_ids.iter().any(|id| id == &o.train_id));
        Ok((before - occupancy.len()) as u64)
    }

    async fn insert_occupancy(&self, new_occupancy: Vec<PlatformOccupancy>) -> StoreResult<u64> {
        let count = new_occupancy.len() as u64;
        self.platform_occupancy.write().await.extend(new_occupancy);
        Ok(count)
    }
}
