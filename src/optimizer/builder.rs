//! Constraint Model Builder (§4.3): translates a [`ProblemModel`] into a
//! mixed-integer linear model. The original system expressed the same
//! constraints as a CP-SAT model with native optional-interval and
//! no-overlap globals; those have no equivalent in the pure-Rust MILP
//! backend used here, so every no-overlap/headway constraint below is a
//! hand-rolled big-M disjunction instead (see DESIGN.md's solver-substitution
//! note).

use std::collections::HashMap;

use good_lp::{constraint, variable, Expression, ProblemVariables, Variable};

use crate::models::priority_weight;

use super::problem::{
    BlockId, ProblemModel, MAX_EARLINESS_MIN, MAX_LATENESS_MIN,
};

#[derive(Debug, Default)]
pub struct Vars {
    pub arrival: HashMap<(usize, usize), Variable>,
    pub departure: HashMap<(usize, usize), Variable>,
    pub delay: HashMap<(usize, usize), Variable>,
    pub late: HashMap<(usize, usize), Variable>,
    pub early: HashMap<(usize, usize), Variable>,
    pub uses: HashMap<(usize, usize, String), Variable>,
    pub block_entry: HashMap<(usize, BlockId), Variable>,
    pub block_exit: HashMap<(usize, BlockId), Variable>,
    pub block_occupied: HashMap<(usize, BlockId), Variable>,
}

pub struct BuiltModel {
    pub variables: ProblemVariables,
    pub constraints: Vec<good_lp::Constraint>,
    pub objective: Expression,
    pub vars: Vars,
    pub time_horizon: i64,
}

/// `1 - gate` scaled by `m`, expressed without relying on `f64 - Variable`
/// operator support: `m*(1-gate) = m - m*gate`.
fn relax(m: f64, gate: Variable) -> Expression {
    Expression::from(m) - Expression::from(gate) * m
}

pub fn build(problem: &ProblemModel) -> BuiltModel {
    let mut variables = ProblemVariables::new();
    let mut vars = Vars::default();
    let time_horizon = problem.time_horizon();
    let h = time_horizon as f64;

    for (t_idx, ntrain) in problem.trains.iter().enumerate() {
        for (s_idx, stop) in ntrain.route.iter().enumerate() {
            let arrival = variables.add(variable().integer().min(0.0).max(h));
            let departure = variables.add(variable().integer().min(0.0).max(h));
            let delay = variables.add(
                variable()
                    .integer()
                    .min(-(MAX_EARLINESS_MIN as f64))
                    .max(MAX_LATENESS_MIN as f64),
            );
            let late = variables.add(variable().integer().min(0.0).max(MAX_LATENESS_MIN as f64));
            let early = variables.add(variable().integer().min(0.0).max(MAX_EARLINESS_MIN as f64));

            vars.arrival.insert((t_idx, s_idx), arrival);
            vars.departure.insert((t_idx, s_idx), departure);
            vars.delay.insert((t_idx, s_idx), delay);
            vars.late.insert((t_idx, s_idx), late);
            vars.early.insert((t_idx, s_idx), early);

            if let Some(station) = problem.stations.get(&stop.station_id) {
                for platform in &station.platforms {
                    let u = variables.add(variable().binary());
                    vars.uses.insert((t_idx, s_idx, platform.id.clone()), u);
                }
            }
        }

        for pair in ntrain.route.windows(2) {
            let (from, to) = (&pair[0].station_id, &pair[1].station_id);
            if let Some(segment) = problem.segment_between(from, to) {
                for block in ProblemModel::blocks_for_segment(&segment.id) {
                    let entry = variables.add(variable().integer().min(0.0).max(h));
                    let exit = variables.add(variable().integer().min(0.0).max(h));
                    let occupied = variables.add(variable().binary());
                    vars.block_entry.insert((t_idx, block.clone()), entry);
                    vars.block_exit.insert((t_idx, block.clone()), exit);
                    vars.block_occupied.insert((t_idx, block), occupied);
                }
            }
        }
    }

    let mut constraints = Vec::new();

    // A train's route is fixed, so every block var created above is on a
    // block the train actually traverses: occupancy is not optional here.
    for occupied in vars.block_occupied.values() {
        constraints.push(constraint!(*occupied == 1.0));
    }

    temporal_constraints(problem, &vars, &mut constraints);
    platform_choice_constraints(problem, &vars, &mut constraints);
    platform_exclusivity_constraints(problem, &vars, &mut variables, &mut constraints, h);
    block_exclusivity_constraints(&vars, &mut variables, &mut constraints, h);
    headway_constraints(problem, &vars, &mut variables, &mut constraints, h);
    speed_restriction_constraints(problem, &vars, &mut constraints);
    maintenance_constraints(problem, &vars, &mut variables, &mut constraints, h);

    let objective = objective_expression(problem, &vars);

    BuiltModel {
        variables,
        constraints,
        objective,
        vars,
        time_horizon,
    }
}

fn temporal_constraints(
    problem: &ProblemModel,
    vars: &Vars,
    constraints: &mut Vec<good_lp::Constraint>,
) {
    for (t_idx, ntrain) in problem.trains.iter().enumerate() {
        for (s_idx, stop) in ntrain.route.iter().enumerate() {
            let arrival = vars.arrival[&(t_idx, s_idx)];
            let departure = vars.departure[&(t_idx, s_idx)];
            let delay = vars.delay[&(t_idx, s_idx)];
            let late = vars.late[&(t_idx, s_idx)];
            let early = vars.early[&(t_idx, s_idx)];
            let planned = stop.planned_min as f64;

            constraints.push(constraint!(arrival >= planned - MAX_EARLINESS_MIN as f64));
            constraints.push(constraint!(arrival <= planned + MAX_LATENESS_MIN as f64));
            constraints.push(constraint!(delay == arrival - planned));
            constraints.push(constraint!(late >= delay));
            constraints.push(constraint!(late >= 0.0));
            constraints.push(constraint!(early >= -delay));
            constraints.push(constraint!(early >= 0.0));
            constraints.push(constraint!(departure >= arrival + stop.min_dwell_minutes() as f64));

            if s_idx > 0 {
                let prev_departure = vars.departure[&(t_idx, s_idx - 1)];
                constraints.push(constraint!(arrival >= prev_departure + 1.0));
            }
        }

        for (leg_idx, pair) in ntrain.route.windows(2).enumerate() {
            let (from, to) = (&pair[0].station_id, &pair[1].station_id);
            let Some(segment) = problem.segment_between(from, to) else {
                continue;
            };
            let blocks = super::problem::ProblemModel::blocks_for_segment(&segment.id);
            let departure = vars.departure[&(t_idx, leg_idx)];
            let next_arrival = vars.arrival[&(t_idx, leg_idx + 1)];
            let has_restriction = segment.active_speed_restriction().is_some();

            for (i, block) in blocks.iter().enumerate() {
                let entry = vars.block_entry[&(t_idx, block.clone())];
                let exit = vars.block_exit[&(t_idx, block.clone())];

                if i == 0 {
                    constraints.push(constraint!(entry >= departure));
                } else {
                    let prev_exit = vars.block_exit[&(t_idx, blocks[i - 1].clone())];
                    constraints.push(constraint!(entry >= prev_exit));
                }
                if i == blocks.len() - 1 {
                    constraints.push(constraint!(exit <= next_arrival));
                }
                if !has_restriction {
                    constraints.push(constraint!(exit >= entry + 1.0));
                }
            }
        }
    }
}

fn platform_choice_constraints(
    problem: &ProblemModel,
    vars: &Vars,
    constraints: &mut Vec<good_lp::Constraint>,
) {
    for (t_idx, ntrain) in problem.trains.iter().enumerate() {
        for (s_idx, stop) in ntrain.route.iter().enumerate() {
            let Some(station) = problem.stations.get(&stop.station_id) else {
                continue;
            };
            if station.platforms.is_empty() {
                continue;
            }

            if let Some(preassigned) = &stop.preassigned_platform {
                if let Some(&chosen) = vars.uses.get(&(t_idx, s_idx, preassigned.clone())) {
                    constraints.push(constraint!(chosen == 1.0));
                    for platform in &station.platforms {
                        if &platform.id != preassigned {
                            let other = vars.uses[&(t_idx, s_idx, platform.id.clone())];
                            constraints.push(constraint!(other == 0.0));
                        }
                    }
                    continue;
                }
            }

            let sum: Expression = station
                .platforms
                .iter()
                .map(|p| Expression::from(vars.uses[&(t_idx, s_idx, p.id.clone())]))
                .fold(Expression::from(0.0), |acc, e| acc + e);
            constraints.push(constraint!(sum == 1.0));
        }
    }
}

fn platform_exclusivity_constraints(
    problem: &ProblemModel,
    vars: &Vars,
    variables: &mut ProblemVariables,
    constraints: &mut Vec<good_lp::Constraint>,
    h: f64,
) {
    let mut by_platform: HashMap<(String, String), Vec<(usize, usize)>> = HashMap::new();
    for (t_idx, s_idx, platform_id) in vars.uses.keys().cloned() {
        let station_id = problem.trains[t_idx].route[s_idx].station_id.clone();
        by_platform
            .entry((station_id, platform_id))
            .or_default()
            .push((t_idx, s_idx));
    }

    for ((station_id, platform_id), stops) in &by_platform {
        for i in 0..stops.len() {
            for j in (i + 1)..stops.len() {
                let (t1, s1) = stops[i];
                let (t2, s2) = stops[j];
                if t1 == t2 {
                    continue;
                }
                let a1 = vars.arrival[&(t1, s1)];
                let d1 = vars.departure[&(t1, s1)];
                let a2 = vars.arrival[&(t2, s2)];
                let d2 = vars.departure[&(t2, s2)];
                let u1 = vars.uses[&(t1, s1, platform_id.clone())];
                let u2 = vars.uses[&(t2, s2, platform_id.clone())];

                let order = variables.add(variable().binary());
                constraints.push(constraint!(
                    d1 <= a2 + relax(h, order) + relax(h, u1) + relax(h, u2)
                ));
                constraints.push(constraint!(
                    d2 <= a1 + Expression::from(order) * h + relax(h, u1) + relax(h, u2)
                ));
            }
        }

        for occ in problem
            .fixed_occupancies
            .iter()
            .filter(|o| &o.occupancy.station_id == station_id && &o.occupancy.platform_id == platform_id)
        {
            for &(t_idx, s_idx) in stops {
                let a = vars.arrival[&(t_idx, s_idx)];
                let d = vars.departure[&(t_idx, s_idx)];
                let u = vars.uses[&(t_idx, s_idx, platform_id.clone())];
                let order = variables.add(variable().binary());
                constraints.push(constraint!(
                    d <= occ.start_min as f64 + relax(h, order) + relax(h, u)
                ));
                constraints.push(constraint!(
                    occ.end_min as f64 <= a + Expression::from(order) * h + relax(h, u)
                ));
            }
        }
    }
}

fn block_exclusivity_constraints(
    vars: &Vars,
    variables: &mut ProblemVariables,
    constraints: &mut Vec<good_lp::Constraint>,
    h: f64,
) {
    let mut by_block: HashMap<BlockId, Vec<usize>> = HashMap::new();
    for (t_idx, block) in vars.block_entry.keys() {
        by_block.entry(block.clone()).or_default().push(*t_idx);
    }

    for (block, trains) in by_block {
        for i in 0..trains.len() {
            for j in (i + 1)..trains.len() {
                let t1 = trains[i];
                let t2 = trains[j];
                let entry1 = vars.block_entry[&(t1, block.clone())];
                let exit1 = vars.block_exit[&(t1, block.clone())];
                let entry2 = vars.block_entry[&(t2, block.clone())];
                let exit2 = vars.block_exit[&(t2, block.clone())];

                let order = variables.add(variable().binary());
                constraints.push(constraint!(exit1 <= entry2 + relax(h, order)));
                constraints.push(constraint!(exit2 <= entry1 + Expression::from(order) * h));
            }
        }
    }
}

fn headway_constraints(
    problem: &ProblemModel,
    vars: &Vars,
    variables: &mut ProblemVariables,
    constraints: &mut Vec<good_lp::Constraint>,
    h: f64,
) {
    for constraint in &problem.constraints {
        let crate::models::Constraint::Headway {
            segment_id,
            min_gap_sec,
        } = constraint
        else {
            continue;
        };
        let gap_min = ((*min_gap_sec as f64) / 60.0).ceil();
        let first_block = BlockId::new(segment_id.clone(), 0);

        let trains_on_block: Vec<usize> = vars
            .block_entry
            .keys()
            .filter(|(_, b)| *b == first_block)
            .map(|(t, _)| *t)
            .collect();

        for i in 0..trains_on_block.len() {
            for j in (i + 1)..trains_on_block.len() {
                let t1 = trains_on_block[i];
                let t2 = trains_on_block[j];
                let entry1 = vars.block_entry[&(t1, first_block.clone())];
                let exit1 = vars.block_exit[&(t1, first_block.clone())];
                let entry2 = vars.block_entry[&(t2, first_block.clone())];
                let exit2 = vars.block_exit[&(t2, first_block.clone())];

                let a_first = variables.add(variable().binary());
                constraints.push(constraint!(
                    entry2 + relax(h, a_first) >= exit1 + gap_min
                ));
                constraints.push(constraint!(
                    entry1 + Expression::from(a_first) * h >= exit2 + gap_min
                ));
            }
        }
    }
}

fn speed_restriction_constraints(problem: &ProblemModel, vars: &Vars, constraints: &mut Vec<good_lp::Constraint>) {
    for (t_idx, ntrain) in problem.trains.iter().enumerate() {
        for pair in ntrain.route.windows(2) {
            let Some(segment) = problem.segment_between(&pair[0].station_id, &pair[1].station_id) else {
                continue;
            };
            let Some(restriction) = segment.active_speed_restriction() else {
                continue;
            };
            let min_traverse = ((segment.distance_m / 1000.0) / restriction.max_kmh * 60.0)
                .ceil()
                .max(1.0);
            let blocks = super::problem::ProblemModel::blocks_for_segment(&segment.id);
            let Some(first) = blocks.first() else { continue };
            let Some(last) = blocks.last() else { continue };
            let entry = vars.block_entry[&(t_idx, first.clone())];
            let exit = vars.block_exit[&(t_idx, last.clone())];
            constraints.push(constraint!(exit >= entry + min_traverse));
        }
    }
}

fn maintenance_constraints(
    problem: &ProblemModel,
    vars: &Vars,
    variables: &mut ProblemVariables,
    constraints: &mut Vec<good_lp::Constraint>,
    h: f64,
) {
    for constraint in &problem.constraints {
        let crate::models::Constraint::Maintenance {
            segment_id,
            start,
            end,
            ..
        } = constraint
        else {
            continue;
        };
        let start_min = (*start - problem.origin_time).num_seconds().div_euclid(60) as f64;
        let end_min = (*end - problem.origin_time).num_seconds().div_euclid(60) as f64;

        for block in super::problem::ProblemModel::blocks_for_segment(segment_id) {
            let trains_on_block: Vec<usize> = vars
                .block_entry
                .keys()
                .filter(|(_, b)| *b == block)
                .map(|(t, _)| *t)
                .collect();

            for t_idx in trains_on_block {
                let entry = vars.block_entry[&(t_idx, block.clone())];
                let exit = vars.block_exit[&(t_idx, block.clone())];
                let order = variables.add(variable().binary());
                constraints.push(constraint!(exit <= start_min + relax(h, order)));
                constraints.push(constraint!(end_min <= entry + Expression::from(order) * h));
            }
        }
    }
}

fn objective_expression(problem: &ProblemModel, vars: &Vars) -> Expression {
    let mut objective = Expression::from(0.0);
    for (&(t_idx, _), &late) in &vars.late {
        let weight = priority_weight(problem.trains[t_idx].train.train_type) as f64;
        objective = objective + Expression::from(late) * (2.0 * weight);
    }
    for (&(t_idx, _), &early) in &vars.early {
        let weight = priority_weight(problem.trains[t_idx].train.train_type) as f64;
        objective = objective + Expression::from(early) * weight;
    }
    objective
}
