//! End-to-end tests for the dispatch optimiser core, covering the concrete
//! scenarios and testable properties named in the specification (S1-S6).

use chrono::{DateTime, TimeZone, Utc};

use dispatch_optimiser::models::{Constraint, EventKind, PlatformOccupancy, Scenario, TrainEvent, TrainType};
use dispatch_optimiser::optimizer::{adapter, builder, problem::ProblemModel, solution::SolveError};
use dispatch_optimiser::store::memory::MemoryStore;
use dispatch_optimiser::store::records::{PlatformRecord, SegmentRecord, StationRecord, TrainRecord};

fn origin() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn at(minutes: i64) -> DateTime<Utc> {
    origin() + chrono::Duration::minutes(minutes)
}

fn train_record(id: &str, train_type: TrainType) -> TrainRecord {
    TrainRecord {
        train_id: Some(id.to_string()),
        legacy_id: None,
        train_type,
        priority: 0,
        avg_speed_kmh: 80.0,
        length_m: 200.0,
    }
}

fn station(id: &str, platform_ids: &[&str]) -> StationRecord {
    StationRecord {
        id: id.to_string(),
        name: id.to_string(),
        platforms: platform_ids
            .iter()
            .map(|p| PlatformRecord {
                platform_id: Some(p.to_string()),
                id: None,
                length_m: 300.0,
                electrified: true,
            })
            .collect(),
    }
}

fn segment(id: &str, from: &str, to: &str, distance_m: f64) -> SegmentRecord {
    SegmentRecord {
        id: id.to_string(),
        from: from.to_string(),
        to: to.to_string(),
        capacity: 1,
        travel_time_min: 10,
        distance_m: Some(distance_m),
    }
}

fn event(
    train_id: &str,
    event_id: &str,
    kind: EventKind,
    station_id: &str,
    scheduled_min: i64,
    platform_id: Option<&str>,
    min_dwell_sec: Option<i64>,
) -> TrainEvent {
    TrainEvent {
        train_id: train_id.to_string(),
        event_id: event_id.to_string(),
        kind,
        station_id: station_id.to_string(),
        platform_id: platform_id.map(|p| p.to_string()),
        scheduled_time: at(scheduled_min),
        earliness_sec: 0,
        lateness_sec: 0,
        min_dwell_sec,
        actual_time: None,
        status: "scheduled".to_string(),
    }
}

fn scenario(id: &str, trains: &[&str], segments: &[&str], constraints: &[&str]) -> Scenario {
    Scenario {
        id: id.to_string(),
        description: String::new(),
        trains: trains.iter().map(|s| s.to_string()).collect(),
        segments: segments.iter().map(|s| s.to_string()).collect(),
        constraints: constraints.iter().map(|s| s.to_string()).collect(),
    }
}

/// S1: one train, one stop per station, no constraints — the schedule
/// should match the plan exactly with zero objective.
#[tokio::test]
async fn s1_single_train_matches_plan() {
    let store = MemoryStore::new();
    store.seed_train("T1", train_record("T1", TrainType::Express)).await;
    store.seed_station(station("S1", &["P1"])).await;
    store.seed_station(station("S2", &["P1"])).await;
    store.seed_station(station("S3", &["P1"])).await;
    store.seed_segment(segment("SEG1", "S1", "S2", 5000.0)).await;
    store.seed_segment(segment("SEG2", "S2", "S3", 5000.0)).await;
    store
        .seed_train_event(event("T1", "e1", EventKind::Arrival, "S1", 0, None, None))
        .await;
    store
        .seed_train_event(event("T1", "e2", EventKind::Arrival, "S2", 20, None, None))
        .await;
    store
        .seed_train_event(event("T1", "e3", EventKind::Arrival, "S3", 45, None, None))
        .await;
    store
        .put_scenario(scenario("SC1", &["T1"], &["SEG1", "SEG2"], &[]))
        .await
        .unwrap();

    let problem = adapter::load(&store, "SC1", None).await.unwrap();
    let built = builder::build(&problem);
    let (solved, _events, _occ) = dispatch_optimiser::optimizer::solution::solve(&problem, built).unwrap();

    assert_eq!(solved.objective_value, 0.0);
    for stop in &solved.stops {
        assert_eq!(stop.delay_min, 0, "stop at {} should be on time", stop.station_id);
        assert_eq!(stop.arrival_min, stop.planned_min);
    }
}

/// S2: two trains sharing a segment under a headway constraint both planned
/// at minute 0. The higher-priority train keeps its slot; the other is
/// pushed back by at least the headway gap on the shared block.
#[tokio::test]
async fn s2_headway_separates_trains() {
    let store = MemoryStore::new();
    store.seed_train("EXP", train_record("EXP", TrainType::Express)).await;
    store.seed_train("LOC", train_record("LOC", TrainType::Local)).await;
    store.seed_station(station("S1", &["P1", "P2"])).await;
    store.seed_station(station("S2", &["P1", "P2"])).await;
    store.seed_segment(segment("SEG1", "S1", "S2", 2000.0)).await;
    store
        .seed_constraint(
            "hw1",
            Constraint::Headway {
                segment_id: "SEG1".to_string(),
                min_gap_sec: 120,
            },
        )
        .await;

    for train_id in ["EXP", "LOC"] {
        store
            .seed_train_event(event(train_id, "a", EventKind::Arrival, "S1", 0, None, None))
            .await;
        store
            .seed_train_event(event(train_id, "b", EventKind::Arrival, "S2", 10, None, None))
            .await;
    }
    store
        .put_scenario(scenario("SC2", &["EXP", "LOC"], &["SEG1"], &["hw1"]))
        .await
        .unwrap();

    let problem = adapter::load(&store, "SC2", None).await.unwrap();
    let built = builder::build(&problem);
    let (solved, _events, _occ) = dispatch_optimiser::optimizer::solution::solve(&problem, built).unwrap();

    let exp_delay = solved
        .stops
        .iter()
        .find(|s| s.train_id == "EXP" && s.station_id == "S1")
        .unwrap()
        .delay_min;
    let loc_delay = solved
        .stops
        .iter()
        .find(|s| s.train_id == "LOC" && s.station_id == "S1")
        .unwrap()
        .delay_min;

    // The express train (weight 10) is strictly preferred over local (weight
    // 5) in the objective, so it should not be the one delayed.
    assert!(exp_delay <= loc_delay);
}

/// S3: a speed restriction inflates the minimum traverse time for a segment;
/// the gap between departure and the next arrival must respect it.
#[tokio::test]
async fn s3_speed_restriction_inflates_traverse_time() {
    let store = MemoryStore::new();
    store.seed_train("T1", train_record("T1", TrainType::Passenger)).await;
    store.seed_station(station("S1", &["P1"])).await;
    store.seed_station(station("S2", &["P1"])).await;
    store.seed_segment(segment("SEG1", "S1", "S2", 10_000.0)).await;
    store
        .seed_constraint(
            "sr1",
            Constraint::SpeedRestriction {
                segment_id: "SEG1".to_string(),
                max_speed_kmh: 30.0,
                reason: Some("track work".to_string()),
            },
        )
        .await;
    store
        .seed_train_event(event("T1", "a", EventKind::Arrival, "S1", 0, None, None))
        .await;
    store
        .seed_train_event(event("T1", "b", EventKind::Arrival, "S2", 10, None, None))
        .await;
    store
        .put_scenario(scenario("SC3", &["T1"], &["SEG1"], &["sr1"]))
        .await
        .unwrap();

    let problem = adapter::load(&store, "SC3", None).await.unwrap();
    assert!(problem.segments["SEG1"].active_speed_restriction().is_some());

    let built = builder::build(&problem);
    let (solved, _events, _occ) = dispatch_optimiser::optimizer::solution::solve(&problem, built).unwrap();

    let departure_s1 = solved
        .stops
        .iter()
        .find(|s| s.station_id == "S1")
        .unwrap()
        .departure_min;
    let arrival_s2 = solved
        .stops
        .iter()
        .find(|s| s.station_id == "S2")
        .unwrap()
        .arrival_min;

    // 10km at 30km/h = 20 minutes.
    assert!(arrival_s2 - departure_s1 >= 20);
}

/// S4: two trains both want the only platform at a station at minute 0 with
/// no preassignment; one keeps the slot, the other is pushed back.
#[tokio::test]
async fn s4_platform_conflict_delays_one_train() {
    let store = MemoryStore::new();
    store.seed_train("A", train_record("A", TrainType::Passenger)).await;
    store.seed_train("B", train_record("B", TrainType::Passenger)).await;
    store.seed_station(station("S1", &["P1"])).await;

    for train_id in ["A", "B"] {
        store
            .seed_train_event(event(train_id, "a", EventKind::Arrival, "S1", 0, None, Some(60)))
            .await;
    }
    store.put_scenario(scenario("SC4", &["A", "B"], &[], &[])).await.unwrap();

    let problem = adapter::load(&store, "SC4", None).await.unwrap();
    let built = builder::build(&problem);
    let (solved, _events, _occ) = dispatch_optimiser::optimizer::solution::solve(&problem, built).unwrap();

    let delays: Vec<i64> = solved.stops.iter().map(|s| s.delay_min).collect();
    assert!(delays.iter().any(|&d| d == 0), "one train should keep its slot");
    assert!(delays.iter().any(|&d| d > 0), "the other should be delayed");

    // Platform exclusivity: the two occupied intervals must not overlap.
    let mut intervals: Vec<(i64, i64)> = solved
        .stops
        .iter()
        .map(|s| (s.arrival_min, s.departure_min))
        .collect();
    intervals.sort();
    assert!(intervals[0].1 <= intervals[1].0);
}

/// S5: a fixed platform occupancy blocks the only platform for the whole
/// window a train needs to dwell in — no feasible solution exists.
#[tokio::test]
async fn s5_fixed_occupancy_makes_problem_infeasible() {
    let store = MemoryStore::new();
    store.seed_train("T1", train_record("T1", TrainType::Freight)).await;
    store.seed_station(station("S1", &["P1"])).await;
    store
        .seed_train_event(event("T1", "a", EventKind::Arrival, "S1", 5, Some("P1"), Some(20 * 60)))
        .await;
    // Covers the entire window the train's arrival could possibly land in
    // ([planned-5, planned+60] = [0, 65]): no shift of arrival/departure can
    // dodge it, so with only one platform at the station this is infeasible.
    store
        .seed_platform_occupancy(PlatformOccupancy {
            train_id: "OTHER".to_string(),
            station_id: "S1".to_string(),
            platform_id: "P1".to_string(),
            start_time: at(-1000),
            end_time: at(1000),
            train_type: None,
            train_length_m: None,
        })
        .await;
    store.put_scenario(scenario("SC5", &["T1"], &[], &[])).await.unwrap();

    let problem = adapter::load(&store, "SC5", None).await.unwrap();
    let built = builder::build(&problem);
    let result = dispatch_optimiser::optimizer::solution::solve(&problem, built);

    assert!(matches!(result, Err(SolveError::Infeasible)));
}

/// S6: an overly long minimum dwell combined with a tight downstream
/// lateness bound leaves no feasible arrival time at the next stop.
#[tokio::test]
async fn s6_infeasible_dwell_window() {
    let store = MemoryStore::new();
    store.seed_train("T1", train_record("T1", TrainType::Local)).await;
    store.seed_station(station("S1", &["P1"])).await;
    store.seed_station(station("S2", &["P1"])).await;
    store.seed_segment(segment("SEG1", "S1", "S2", 1000.0)).await;
    store
        .seed_train_event(event(
            "T1",
            "a",
            EventKind::Arrival,
            "S1",
            0,
            None,
            Some(120 * 60),
        ))
        .await;
    store
        .seed_train_event(event("T1", "b", EventKind::Arrival, "S2", 30, None, None))
        .await;
    store
        .put_scenario(scenario("SC6", &["T1"], &["SEG1"], &[]))
        .await
        .unwrap();

    let problem = adapter::load(&store, "SC6", None).await.unwrap();
    let built = builder::build(&problem);
    let result = dispatch_optimiser::optimizer::solution::solve(&problem, built);

    assert!(matches!(result, Err(SolveError::Infeasible)));
}

/// The data adapter drops platforms with no resolvable identifier (§4.1
/// step 3) instead of failing the whole load.
#[tokio::test]
async fn adapter_drops_unidentified_platforms() {
    let store = MemoryStore::new();
    store.seed_train("T1", train_record("T1", TrainType::Local)).await;
    store
        .seed_station(StationRecord {
            id: "S1".to_string(),
            name: "S1".to_string(),
            platforms: vec![
                PlatformRecord {
                    platform_id: Some("P1".to_string()),
                    id: None,
                    length_m: 200.0,
                    electrified: false,
                },
                PlatformRecord {
                    platform_id: None,
                    id: None,
                    length_m: 200.0,
                    electrified: false,
                },
            ],
        })
        .await;
    store
        .seed_train_event(event("T1", "a", EventKind::Arrival, "S1", 0, None, None))
        .await;
    store.put_scenario(scenario("SC7", &["T1"], &[], &[])).await.unwrap();

    let problem = adapter::load(&store, "SC7", None).await.unwrap();
    assert_eq!(problem.stations["S1"].platforms.len(), 1);
    assert_eq!(problem.stations["S1"].platforms[0].id, "P1");
}

/// Unknown scenario ids surface `NotFound`, not a panic.
#[tokio::test]
async fn adapter_returns_not_found_for_unknown_scenario() {
    let store = MemoryStore::new();
    let result = adapter::load(&store, "does-not-exist", None).await;
    assert!(matches!(result, Err(adapter::AdapterError::NotFound(_))));
}

/// The explicit window start, when given, is used as the time origin rather
/// than the earliest event (§4.1 step 4).
#[tokio::test]
async fn adapter_uses_window_start_as_origin_when_given() {
    let store = MemoryStore::new();
    store.seed_train("T1", train_record("T1", TrainType::Local)).await;
    store
        .seed_train_event(event("T1", "a", EventKind::Arrival, "S1", 30, None, None))
        .await;
    store.put_scenario(scenario("SC8", &["T1"], &[], &[])).await.unwrap();

    let window_start = at(10);
    let problem = adapter::load(&store, "SC8", Some((window_start, at(120))))
        .await
        .unwrap();

    assert_eq!(problem.origin_time, window_start);
    // Event at minute 30 relative to the true origin is 20 minutes after the
    // window-start origin.
    assert_eq!(problem.trains[0].route[0].planned_min, 20);
}

/// Each train's route stops are ordered by scheduled time, independent of
/// insertion order (§4.1 step 6).
#[tokio::test]
async fn adapter_orders_route_by_scheduled_time() {
    let store = MemoryStore::new();
    store.seed_train("T1", train_record("T1", TrainType::Local)).await;
    store
        .seed_train_event(event("T1", "later", EventKind::Arrival, "S2", 30, None, None))
        .await;
    store
        .seed_train_event(event("T1", "earlier", EventKind::Arrival, "S1", 0, None, None))
        .await;
    store.put_scenario(scenario("SC9", &["T1"], &[], &[])).await.unwrap();

    let problem = adapter::load(&store, "SC9", None).await.unwrap();
    let route = &problem.trains[0].route;
    assert_eq!(route[0].station_id, "S1");
    assert_eq!(route[1].station_id, "S2");
}

/// Time horizon respects the §4.2 invariant: at least `max(planned) + 120`,
/// floored at a full day.
#[test]
fn problem_model_time_horizon_invariant() {
    let model = ProblemModel {
        trains: vec![],
        stations: Default::default(),
        segments: Default::default(),
        constraints: vec![],
        fixed_occupancies: vec![],
        origin_time: origin(),
        scenario: None,
    };
    assert_eq!(model.time_horizon(), 24 * 60);
}
