//! Scenario CRUD and the "run scenario" trigger (§6 "Invocation surface").
//! The core itself only consumes a scenario id and an optional window; this
//! module is the thin HTTP collaborator described in §1 as out of the
//! core's scope.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use crate::models::Scenario;
use crate::services::optimizer_service::{RunParams, RunResult};
use crate::services::ServiceError;
use crate::AppState;

use super::{ApiError, ApiResult};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_scenarios).post(create_scenario))
        .route("/:id", get(get_scenario).delete(delete_scenario))
        .route("/:id/run", post(run_scenario))
}

async fn list_scenarios(State(state): State<AppState>) -> ApiResult<Vec<Scenario>> {
    let scenarios = state.store.list_scenarios().await.map_err(ServiceError::from)?;
    Ok(Json(scenarios))
}

async fn create_scenario(
    State(state): State<AppState>,
    Json(scenario): Json<Scenario>,
) -> ApiResult<Scenario> {
    if scenario.id.is_empty() {
        return Err(ApiError::Validation("scenario id must not be empty".to_string()));
    }
    state.store.put_scenario(scenario.clone()).await.map_err(ServiceError::from)?;
    Ok(Json(scenario))
}

async fn get_scenario(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Scenario> {
    let scenario = state
        .store
        .get_scenario(&id)
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(|| ApiError::Service(ServiceError::NotFound(format!("scenario '{id}' not found"))))?;
    Ok(Json(scenario))
}

async fn delete_scenario(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    let deleted = state.store.delete_scenario(&id).await.map_err(ServiceError::from)?;
    if !deleted {
        return Err(ApiError::Service(ServiceError::NotFound(format!(
            "scenario '{id}' not found"
        ))));
    }
    Ok(Json(serde_json::json!({ "deleted": id })))
}

#[derive(Debug, Deserialize)]
pub struct RunQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub time_limit_seconds: Option<u64>,
}

/// Triggers one optimiser run for a scenario, optionally clipped to a time
/// window, and returns the materialised schedule plus metrics (§6).
async fn run_scenario(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RunQuery>,
) -> ApiResult<RunResult> {
    info!(scenario_id = %id, "run scenario requested");

    let window = match (query.start, query.end) {
        (Some(start), Some(end)) => Some((start, end)),
        _ => None,
    };
    let params = query.time_limit_seconds.map(|time_limit_seconds| RunParams {
        time_limit_seconds,
        num_workers: state.config.optimizer.num_workers,
    });

    let started = std::time::Instant::now();
    let result = state.optimizer_service.run(&id, window, params).await;
    let duration = started.elapsed().as_secs_f64();

    match &result {
        Ok(r) => state.metrics.record_run(true, r.trains.len(), r.events_inserted, duration),
        Err(_) => state.metrics.record_run(false, 0, 0, duration),
    }

    Ok(Json(result?))
}
