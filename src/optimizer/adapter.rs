//! Data Adapter (§4.1): normalises persisted records into a [`ProblemModel`].

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{Constraint, Platform, Segment, Station, Train};
use crate::store::{Store, StoreError};

use super::problem::{NormalisedTrain, OccupancyMinutes, ProblemModel, RouteStop};

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("scenario not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Load and normalise a scenario's data, optionally clipped to `window`.
///
/// Mirrors `load_scenario_data` in the original Python adapter: resolve the
/// scenario, pull every collection it references, choose a time origin, and
/// convert everything into minutes-since-origin.
pub async fn load(
    store: &dyn Store,
    scenario_id: &str,
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> Result<ProblemModel, AdapterError> {
    let scenario = store
        .get_scenario(scenario_id)
        .await?
        .ok_or_else(|| AdapterError::NotFound(scenario_id.to_string()))?;

    let train_records = store.get_trains(&scenario.trains).await?;
    let segment_records = store.get_segments(&scenario.segments).await?;

    let station_ids: Vec<String> = segment_records
        .iter()
        .flat_map(|s| vec![s.from.clone(), s.to.clone()])
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let station_records = store.get_stations(&station_ids).await?;

    let mut train_events = store.get_train_events(&scenario.trains).await?;
    if let Some((start, _end)) = window {
        // Window start only bounds event selection from below; events after
        // the window end are kept so a train's later stops still inform its
        // route (§4.1 step 2: "restricted to ... optionally the window").
        train_events.retain(|e| e.scheduled_time >= start);
    }

    let constraints = store.get_constraints(&scenario.constraints).await?;

    // Fetched by window overlap alone (§4.1 step 8): a fixed occupancy held
    // by a train outside this scenario — or by no train at all, as with a
    // folded `platform_maintenance` constraint — must still block the
    // platform for this scenario's trains.
    let platform_occupancy = store.get_platform_occupancy(window).await?;

    // Time origin selection (§4.1 step 4).
    let origin_time = match window {
        Some((start, _)) => start,
        None => train_events
            .iter()
            .map(|e| e.scheduled_time)
            .min()
            .unwrap_or_else(Utc::now),
    };

    let to_minutes = |t: DateTime<Utc>| -> i64 {
        (t - origin_time).num_seconds().div_euclid(60)
    };

    // Platform normalisation: drop platforms with no resolvable id (§4.1 step 3).
    let mut stations: HashMap<String, Station> = HashMap::new();
    for record in station_records {
        let platforms: Vec<Platform> = record
            .platforms
            .into_iter()
            .filter_map(|p| {
                let id = p.resolved_id()?;
                Some(Platform {
                    id,
                    length_m: p.length_m,
                    electrified: p.electrified,
                })
            })
            .collect();
        stations.insert(
            record.id.clone(),
            Station {
                id: record.id,
                name: record.name,
                platforms,
            },
        );
    }

    // Merge active speed restrictions from constraints into segments.
    let mut segments: HashMap<String, Segment> = HashMap::new();
    for record in segment_records {
        let speed_restriction = constraints.iter().find_map(|c| match c {
            Constraint::SpeedRestriction {
                segment_id,
                max_speed_kmh,
                reason,
            } if segment_id == &record.id => Some(crate::models::SpeedRestriction {
                max_kmh: *max_speed_kmh,
                reason: reason.clone().unwrap_or_default(),
                active: true,
            }),
            _ => None,
        });
        segments.insert(
            record.id.clone(),
            Segment {
                id: record.id,
                from_station: record.from,
                to_station: record.to,
                capacity: record.capacity,
                travel_time_min: record.travel_time_min,
                distance_m: record.distance_m.unwrap_or(0.0),
                speed_restriction,
            },
        );
    }

    let trains_by_id: HashMap<String, Train> = train_records
        .into_iter()
        .filter_map(|r| {
            let id = r.resolved_id()?;
            Some((
                id.clone(),
                Train {
                    id,
                    train_type: r.train_type,
                    priority: r.priority,
                    avg_speed_kmh: r.avg_speed_kmh,
                    length_m: r.length_m,
                },
            ))
        })
        .collect();

    // Route construction: sort each train's events by scheduled_time; omit
    // trains with no events in scope (§4.1 step 6).
    let mut normalised_trains = Vec::new();
    for train_id in &scenario.trains {
        let mut events: Vec<_> = train_events
            .iter()
            .filter(|e| &e.train_id == train_id)
            .cloned()
            .collect();
        if events.is_empty() {
            continue;
        }
        events.sort_by_key(|e| e.scheduled_time);

        let train = match trains_by_id.get(train_id) {
            Some(t) => t.clone(),
            None => continue,
        };

        let route = events
            .iter()
            .map(|e| RouteStop {
                station_id: e.station_id.clone(),
                planned_min: to_minutes(e.scheduled_time),
                preassigned_platform: e.platform_id.clone(),
                min_dwell_sec: e.min_dwell_sec,
            })
            .collect();

        normalised_trains.push(NormalisedTrain { train, route });
    }

    let mut fixed_occupancies: Vec<OccupancyMinutes> = platform_occupancy
        .into_iter()
        .map(|occupancy| {
            let start_min = to_minutes(occupancy.start_time);
            let end_min = to_minutes(occupancy.end_time);
            OccupancyMinutes {
                occupancy,
                start_min,
                end_min,
            }
        })
        .collect();

    // `platform_maintenance` constraints fold into the fixed-occupancy set
    // so they share the platform no-overlap pass (§4.3 "Maintenance and
    // platform closures"); they bind no specific train, so a sentinel id
    // is used in the occupancy record's `train_id`.
    for constraint in &constraints {
        if let Constraint::PlatformMaintenance {
            station_id,
            platform_id,
            start,
            end,
            ..
        } = constraint
        {
            let occupancy = crate::models::PlatformOccupancy {
                train_id: format!("__maintenance__{station_id}_{platform_id}"),
                station_id: station_id.clone(),
                platform_id: platform_id.clone(),
                start_time: *start,
                end_time: *end,
                train_type: None,
                train_length_m: None,
            };
            fixed_occupancies.push(OccupancyMinutes {
                start_min: to_minutes(occupancy.start_time),
                end_min: to_minutes(occupancy.end_time),
                occupancy,
            });
        }
    }

    Ok(ProblemModel {
        trains: normalised_trains,
        stations,
        segments,
        constraints,
        fixed_occupancies,
        origin_time,
        scenario: Some(scenario),
    })
}

