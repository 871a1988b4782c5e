//! Solve driver and event materialiser (§4.4): invokes the MILP solver on a
//! [`BuiltModel`] and turns its variable assignment back into domain objects.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use good_lp::{solvers::microlp::microlp, ResolutionError, Solution as LpSolution, SolverModel};
use serde::Serialize;
use thiserror::Error;

use crate::models::{priority_weight, EventKind, PlatformOccupancy, TrainEvent};

use super::builder::{BuiltModel, Vars};
use super::problem::ProblemModel;

#[derive(Debug, Error)]
pub enum SolveError {
    #[error("no feasible solution found")]
    Infeasible,
    #[error("solver reported an unbounded model")]
    Unbounded,
    #[error("solver failed: {0}")]
    Solver(String),
}

impl From<ResolutionError> for SolveError {
    fn from(err: ResolutionError) -> Self {
        match err {
            ResolutionError::Infeasible => SolveError::Infeasible,
            ResolutionError::Unbounded => SolveError::Unbounded,
            other => SolveError::Solver(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StopSolution {
    pub train_id: String,
    pub station_id: String,
    pub planned_min: i64,
    pub arrival_min: i64,
    pub departure_min: i64,
    pub delay_min: i64,
    pub platform_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DelayMetrics {
    pub avg_delay_min: f64,
    pub max_delay_min: i64,
    pub min_delay_min: i64,
    pub total_events: usize,
    pub by_train: HashMap<String, TrainDelay>,
    pub by_train_type: HashMap<String, TrainTypeDelay>,
}

/// Per-train average/max delay (§4.4 Metrics), mirroring the original
/// `delays_by_train` breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct TrainDelay {
    pub avg_delay_min: f64,
    pub max_delay_min: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainTypeDelay {
    pub avg_delay_min: f64,
    pub max_delay_min: i64,
    pub min_delay_min: i64,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentThroughput {
    pub segment_id: String,
    pub train_count: u32,
    pub by_train_type: HashMap<String, u32>,
    pub avg_traverse_min: f64,
    pub utilisation_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThroughputMetrics {
    pub segments: Vec<SegmentThroughput>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimiserSolution {
    pub objective_value: f64,
    pub stops: Vec<StopSolution>,
    pub delay_metrics: DelayMetrics,
    pub throughput_metrics: ThroughputMetrics,
}

/// Runs the MILP solver on `built` and materialises the result into domain
/// objects. This is a blocking, CPU-bound call (§5): callers on an async
/// executor should run it inside `spawn_blocking` and race it against a
/// wall-clock deadline, since `microlp` has no native time-limit parameter.
pub fn solve(
    problem: &ProblemModel,
    built: BuiltModel,
) -> Result<(OptimiserSolution, Vec<TrainEvent>, Vec<PlatformOccupancy>), SolveError> {
    let BuiltModel {
        variables,
        constraints,
        objective,
        vars,
        ..
    } = built;

    let mut model = microlp(variables.minimise(objective));
    for c in constraints {
        model.add_constraint(c);
    }
    let solution = model.solve()?;

    Ok(extract(problem, &vars, &solution))
}

/// Reads solved variable values back into domain objects (§4.4 Extraction).
/// Takes `solution: &impl LpSolution` rather than a boxed trait object,
/// following the pattern other `good_lp` consumers in the pack use to keep
/// solver value lookups monomorphised.
fn extract(
    problem: &ProblemModel,
    vars: &Vars,
    solution: &impl LpSolution,
) -> (OptimiserSolution, Vec<TrainEvent>, Vec<PlatformOccupancy>) {
    let mut stops = Vec::new();
    let mut events = Vec::new();
    let mut occupancy = Vec::new();
    let mut total_delay = 0.0;
    let mut max_delay = i64::MIN;
    let mut min_delay = i64::MAX;
    let mut delay_by_type: HashMap<String, (f64, i64, i64, u32)> = HashMap::new();
    let mut delay_by_train: HashMap<String, (f64, i64, u32)> = HashMap::new();

    for (t_idx, ntrain) in problem.trains.iter().enumerate() {
        let type_key = format!("{:?}", ntrain.train.train_type).to_lowercase();

        for (s_idx, stop) in ntrain.route.iter().enumerate() {
            let arrival_min = solution.value(vars.arrival[&(t_idx, s_idx)]).round() as i64;
            let departure_min = solution.value(vars.departure[&(t_idx, s_idx)]).round() as i64;
            let delay_min = arrival_min - stop.planned_min;
            let platform_id = chosen_platform(vars, solution, t_idx, s_idx);

            total_delay += delay_min as f64;
            max_delay = max_delay.max(delay_min);
            min_delay = min_delay.min(delay_min);
            let entry = delay_by_type
                .entry(type_key.clone())
                .or_insert((0.0, i64::MIN, i64::MAX, 0));
            entry.0 += delay_min as f64;
            entry.1 = entry.1.max(delay_min);
            entry.2 = entry.2.min(delay_min);
            entry.3 += 1;
            let train_entry = delay_by_train
                .entry(ntrain.train.id.clone())
                .or_insert((0.0, i64::MIN, 0));
            train_entry.0 += delay_min as f64;
            train_entry.1 = train_entry.1.max(delay_min);
            train_entry.2 += 1;

            stops.push(StopSolution {
                train_id: ntrain.train.id.clone(),
                station_id: stop.station_id.clone(),
                planned_min: stop.planned_min,
                arrival_min,
                departure_min,
                delay_min,
                platform_id: platform_id.clone(),
            });

            let arrival_time = minutes_to_time(problem.origin_time, arrival_min);
            let departure_time = minutes_to_time(problem.origin_time, departure_min);

            events.push(TrainEvent {
                train_id: ntrain.train.id.clone(),
                event_id: format!("{}_arr", stop.station_id),
                kind: EventKind::Arrival,
                station_id: stop.station_id.clone(),
                platform_id: platform_id.clone(),
                scheduled_time: arrival_time,
                earliness_sec: (-delay_min * 60).max(0),
                lateness_sec: (delay_min * 60).max(0),
                min_dwell_sec: stop.min_dwell_sec,
                actual_time: Some(arrival_time),
                status: "scheduled".to_string(),
            });
            events.push(TrainEvent {
                train_id: ntrain.train.id.clone(),
                event_id: format!("{}_dep", stop.station_id),
                kind: EventKind::Departure,
                station_id: stop.station_id.clone(),
                platform_id: platform_id.clone(),
                scheduled_time: departure_time,
                earliness_sec: 0,
                lateness_sec: 0,
                min_dwell_sec: stop.min_dwell_sec,
                actual_time: Some(departure_time),
                status: "scheduled".to_string(),
            });

            if let Some(platform_id) = platform_id {
                occupancy.push(PlatformOccupancy {
                    train_id: ntrain.train.id.clone(),
                    station_id: stop.station_id.clone(),
                    platform_id,
                    start_time: arrival_time,
                    end_time: departure_time,
                    train_type: Some(type_key.clone()),
                    train_length_m: Some(ntrain.train.length_m),
                });
            }
        }
    }

    let total_events = stops.len();
    let avg_delay_min = if total_events == 0 {
        0.0
    } else {
        total_delay / total_events as f64
    };
    let by_train_type = delay_by_type
        .into_iter()
        .map(|(k, (sum, max, min, count))| {
            let avg = if count == 0 { 0.0 } else { sum / count as f64 };
            (
                k,
                TrainTypeDelay {
                    avg_delay_min: avg,
                    max_delay_min: max,
                    min_delay_min: min,
                    count,
                },
            )
        })
        .collect();
    let by_train = delay_by_train
        .into_iter()
        .map(|(id, (sum, max, count))| {
            let avg = if count == 0 { 0.0 } else { sum / count as f64 };
            (
                id,
                TrainDelay {
                    avg_delay_min: avg,
                    max_delay_min: max,
                },
            )
        })
        .collect();

    let objective_value = stops
        .iter()
        .zip(
            problem
                .trains
                .iter()
                .flat_map(|t| std::iter::repeat(t.train.train_type).take(t.route.len())),
        )
        .map(|(s, train_type)| {
            let w = priority_weight(train_type) as f64;
            let late = s.delay_min.max(0) as f64;
            let early = (-s.delay_min).max(0) as f64;
            w * (2.0 * late + early)
        })
        .sum();

    let throughput_metrics = segment_throughput(problem, vars, solution);

    (
        OptimiserSolution {
            objective_value,
            stops,
            delay_metrics: DelayMetrics {
                avg_delay_min,
                max_delay_min: if total_events == 0 { 0 } else { max_delay },
                min_delay_min: if total_events == 0 { 0 } else { min_delay },
                total_events,
                by_train,
                by_train_type,
            },
            throughput_metrics,
        },
        events,
        occupancy,
    )
}

fn chosen_platform(
    vars: &Vars,
    solution: &impl LpSolution,
    t_idx: usize,
    s_idx: usize,
) -> Option<String> {
    vars.uses
        .iter()
        .find(|((t, s, _), _)| *t == t_idx && *s == s_idx)
        .filter(|(_, v)| solution.value(**v).round() as i64 == 1)
        .map(|((_, _, platform_id), _)| platform_id.clone())
}

/// Throughput per segment (§4.4 Metrics): count of trains using any block,
/// grouped by train type, average and total traverse time, and utilisation
/// as a fraction of the time horizon.
fn segment_throughput(
    problem: &ProblemModel,
    vars: &Vars,
    solution: &impl LpSolution,
) -> ThroughputMetrics {
    let mut per_segment: HashMap<String, (u32, f64, HashMap<String, u32>)> = HashMap::new();

    for (t_idx, ntrain) in problem.trains.iter().enumerate() {
        let type_key = format!("{:?}", ntrain.train.train_type).to_lowercase();
        for pair in ntrain.route.windows(2) {
            let Some(segment) = problem.segment_between(&pair[0].station_id, &pair[1].station_id)
            else {
                continue;
            };
            let blocks = ProblemModel::blocks_for_segment(&segment.id);
            let (Some(first), Some(last)) = (blocks.first(), blocks.last()) else {
                continue;
            };
            let (Some(&entry), Some(&exit)) = (
                vars.block_entry.get(&(t_idx, first.clone())),
                vars.block_exit.get(&(t_idx, last.clone())),
            ) else {
                continue;
            };
            let traverse_min = solution.value(exit) - solution.value(entry);

            let bucket = per_segment
                .entry(segment.id.clone())
                .or_insert_with(|| (0, 0.0, HashMap::new()));
            bucket.0 += 1;
            bucket.1 += traverse_min;
            *bucket.2.entry(type_key.clone()).or_insert(0) += 1;
        }
    }

    let horizon = problem.time_horizon() as f64;
    let mut segments: Vec<SegmentThroughput> = per_segment
        .into_iter()
        .map(|(segment_id, (count, total_traverse, by_train_type))| {
            let avg_traverse_min = if count == 0 {
                0.0
            } else {
                total_traverse / count as f64
            };
            let utilisation_pct = if horizon <= 0.0 {
                0.0
            } else {
                (total_traverse / horizon) * 100.0
            };
            SegmentThroughput {
                segment_id,
                train_count: count,
                by_train_type,
                avg_traverse_min,
                utilisation_pct,
            }
        })
        .collect();
    segments.sort_by(|a, b| a.segment_id.cmp(&b.segment_id));

    ThroughputMetrics { segments }
}

fn minutes_to_time(origin: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
    origin + chrono::Duration::minutes(minutes)
}
