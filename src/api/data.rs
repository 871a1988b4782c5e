//! CRUD surface for the entities the optimiser core reads (§6 "Persistence
//! read interface"). Seeds the in-process [`crate::store::memory::MemoryStore`];
//! a real deployment would swap these handlers for ones backed by a document
//! store, without the core needing to change (§9 "no ambient singletons").

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{Constraint, PlatformOccupancy, TrainEvent};
use crate::services::ServiceError;
use crate::store::records::{SegmentRecord, StationRecord, TrainRecord};
use crate::AppState;

use super::{ApiError, ApiResult};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/trains", get(list_trains).post(create_train))
        .route("/stations", get(list_stations).post(create_station))
        .route("/segments", get(list_segments).post(create_segment))
        .route("/constraints", post(create_constraint))
        .route("/events", post(create_event))
        .route("/occupancy", post(create_occupancy))
}

async fn list_trains(State(state): State<AppState>) -> ApiResult<Vec<crate::models::Train>> {
    let trains = state.store.list_trains().await.map_err(ServiceError::from)?;
    Ok(Json(trains))
}

async fn create_train(
    State(state): State<AppState>,
    Json(record): Json<TrainRecord>,
) -> ApiResult<serde_json::Value> {
    let id = record
        .resolved_id()
        .ok_or_else(|| ApiError::Validation("train record must carry train_id or _id".to_string()))?;
    state.store.seed_train(id.clone(), record).await;
    Ok(Json(serde_json::json!({ "id": id })))
}

async fn list_stations(State(state): State<AppState>) -> ApiResult<Vec<StationRecord>> {
    let stations = state.store.list_stations().await.map_err(ServiceError::from)?;
    Ok(Json(stations))
}

async fn create_station(
    State(state): State<AppState>,
    Json(record): Json<StationRecord>,
) -> ApiResult<serde_json::Value> {
    let id = record.id.clone();
    state.store.seed_station(record).await;
    Ok(Json(serde_json::json!({ "id": id })))
}

async fn list_segments(State(state): State<AppState>) -> ApiResult<Vec<SegmentRecord>> {
    let segments = state.store.list_segments().await.map_err(ServiceError::from)?;
    Ok(Json(segments))
}

async fn create_segment(
    State(state): State<AppState>,
    Json(record): Json<SegmentRecord>,
) -> ApiResult<serde_json::Value> {
    let id = record.id.clone();
    state.store.seed_segment(record).await;
    Ok(Json(serde_json::json!({ "id": id })))
}

#[derive(Debug, Deserialize)]
struct ConstraintSeed {
    /// Either a primary key or a type tag; scenarios disambiguate by
    /// checking whether every reference in their `constraints` list is one
    /// of the four type strings (§4.1 step 7).
    key: Option<String>,
    #[serde(flatten)]
    constraint: Constraint,
}

async fn create_constraint(
    State(state): State<AppState>,
    Json(seed): Json<ConstraintSeed>,
) -> ApiResult<serde_json::Value> {
    let key = seed.key.unwrap_or_else(|| Uuid::new_v4().to_string());
    state.store.seed_constraint(key.clone(), seed.constraint).await;
    Ok(Json(serde_json::json!({ "key": key })))
}

async fn create_event(
    State(state): State<AppState>,
    Json(event): Json<TrainEvent>,
) -> ApiResult<serde_json::Value> {
    let event_id = event.event_id.clone();
    state.store.seed_train_event(event).await;
    Ok(Json(serde_json::json!({ "event_id": event_id })))
}

async fn create_occupancy(
    State(state): State<AppState>,
    Json(occupancy): Json<PlatformOccupancy>,
) -> ApiResult<serde_json::Value> {
    let train_id = occupancy.train_id.clone();
    state.store.seed_platform_occupancy(occupancy).await;
    Ok(Json(serde_json::json!({ "train_id": train_id })))
}
