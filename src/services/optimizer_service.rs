//! The service that wires the optimiser core to a persistence handle and an
//! async runtime (§5 "Adapter → Build → Solve → Extract → Persist").
//!
//! One-service-per-concern, same as the rest of the service layer, with the
//! pipeline itself running in-process: each run owns its own `ProblemModel`
//! and solver instance (§5 "no part of the core shares mutable state across
//! concurrent runs").

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::models::TrainEvent;
use crate::optimizer::{adapter, builder, problem::ProblemModel, solution};
use crate::store::StoreHandle;

use super::{Service, ServiceError, ServiceResult};

/// Optimiser run parameters exposed through configuration (§6).
#[derive(Debug, Clone, Copy)]
pub struct RunParams {
    pub time_limit_seconds: u64,
    pub num_workers: usize,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            time_limit_seconds: 10,
            num_workers: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub scenario_id: String,
    pub trains: Vec<String>,
    pub objective_value: f64,
    pub delay_metrics: solution::DelayMetrics,
    pub throughput_metrics: solution::ThroughputMetrics,
    pub solution: Vec<solution::StopSolution>,
    pub events_inserted: u64,
    pub occupancy_inserted: u64,
}

pub struct OptimizerService {
    store: Arc<dyn StoreHandle>,
    default_params: RunParams,
}

impl OptimizerService {
    pub fn new(store: Arc<dyn StoreHandle>, default_params: RunParams) -> Self {
        Self {
            store,
            default_params,
        }
    }

    /// Runs one optimiser pass for `scenario_id`, optionally clipped to
    /// `window`, and persists the resulting events/occupancies (§4.4
    /// "Persistence protocol").
    pub async fn run(
        &self,
        scenario_id: &str,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
        params: Option<RunParams>,
    ) -> ServiceResult<RunResult> {
        let params = params.unwrap_or(self.default_params);

        let problem = adapter::load(self.store.as_ref(), scenario_id, window).await?;
        if problem.trains.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "scenario '{scenario_id}' has no trains with events in scope"
            )));
        }

        let train_ids: Vec<String> = problem.trains.iter().map(|t| t.train.id.clone()).collect();
        let scenario_id_owned = scenario_id.to_string();

        let (opt_solution, events, occupancy) = self.solve(problem, params).await?;

        self.store
            .delete_events_for_trains(&train_ids)
            .await
            .map_err(ServiceError::from)?;
        self.store
            .delete_occupancy_for_trains(&train_ids)
            .await
            .map_err(ServiceError::from)?;

        let events_inserted = self
            .store
            .insert_events(events)
            .await
            .map_err(ServiceError::from)?;
        let occupancy_inserted = self
            .store
            .insert_occupancy(occupancy)
            .await
            .map_err(ServiceError::from)?;

        info!(
            scenario_id = %scenario_id_owned,
            trains = train_ids.len(),
            objective = opt_solution.objective_value,
            "optimiser run complete"
        );

        Ok(RunResult {
            scenario_id: scenario_id_owned,
            trains: train_ids,
            objective_value: opt_solution.objective_value,
            delay_metrics: opt_solution.delay_metrics,
            throughput_metrics: opt_solution.throughput_metrics,
            solution: opt_solution.stops,
            events_inserted,
            occupancy_inserted,
        })
    }

    /// Builds and solves the constraint model under a wall-clock budget
    /// (§4.4 "Solve driver"). `microlp` has no native `num_workers` knob, so
    /// multi-worker configuration is accepted but only affects how many
    /// solves this process may run concurrently, not a single solve's
    /// internal parallelism (§5).
    async fn solve(
        &self,
        problem: ProblemModel,
        params: RunParams,
    ) -> ServiceResult<(
        solution::OptimiserSolution,
        Vec<TrainEvent>,
        Vec<crate::models::PlatformOccupancy>,
    )> {
        let deadline = Duration::from_secs(params.time_limit_seconds);
        let solve_task = tokio::task::spawn_blocking(move || {
            let built = builder::build(&problem);
            solution::solve(&problem, built)
        });

        match tokio::time::timeout(deadline, solve_task).await {
            Ok(Ok(Ok(result))) => Ok(result),
            Ok(Ok(Err(err))) => Err(ServiceError::from(err)),
            Ok(Err(join_err)) => Err(ServiceError::NoFeasibleSolution(format!(
                "solver task failed: {join_err}"
            ))),
            Err(_timeout) => {
                warn!(
                    time_limit_seconds = params.time_limit_seconds,
                    "solve exceeded its wall-clock budget with no incumbent"
                );
                Err(ServiceError::NoFeasibleSolution(
                    "solve exceeded its time budget".to_string(),
                ))
            }
        }
    }
}

impl Service for OptimizerService {
    fn name(&self) -> &'static str {
        "OptimizerService"
    }
}
