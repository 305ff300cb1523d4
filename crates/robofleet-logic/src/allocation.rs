//! Robot-to-visit allocation.
//!
//! Two interchangeable strategies over the same inputs:
//!
//! - [`assign`]: repeated global-minimum greedy selection. Each round scans
//!   every (free robot, free visit) pair and takes the cheapest, so the work
//!   is `O(rounds × robots × visits)` with `rounds ≤ min(robots, visits)`.
//!   Not optimal, but deterministic, priority-aware and distance-aware.
//! - [`assign_optimal`]: exact minimum-cost bipartite matching
//!   (Kuhn–Munkres), `O(n³)` in the larger side.
//!
//! The cost callback is evaluated once per pair. Returning `None` marks the
//! pair infeasible (no route); such pairs are never assigned.

use ::pathfinding::kuhn_munkres::kuhn_munkres_min;
use ::pathfinding::matrix::Matrix;
use serde::{Deserialize, Serialize};

use crate::grid::Cell;

pub type RobotId = u32;
pub type VisitId = u64;

/// Cost used for infeasible pairs inside the exact solver.
const INFEASIBLE_COST: i64 = 1 << 40;

/// A robot that is free to take work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobotCandidate {
    pub robot_id: RobotId,
    pub cell: Cell,
}

/// A visit waiting for a robot, located at its station cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitCandidate {
    pub visit_id: VisitId,
    pub cell: Cell,
    pub priority: u8,
}

/// One robot bound to one visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub robot_id: RobotId,
    pub visit_id: VisitId,
    pub cost: i64,
}

/// Which allocator the engine runs each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStrategy {
    #[default]
    Greedy,
    Optimal,
}

impl AllocationStrategy {
    pub fn allocate<F>(
        self,
        robots: &[RobotCandidate],
        visits: &[VisitCandidate],
        cost_fn: F,
    ) -> Vec<Assignment>
    where
        F: FnMut(&RobotCandidate, &VisitCandidate) -> Option<i64>,
    {
        match self {
            AllocationStrategy::Greedy => assign(robots, visits, cost_fn),
            AllocationStrategy::Optimal => assign_optimal(robots, visits, cost_fn),
        }
    }
}

/// `path_len − weight × priority`: nearer and more urgent is cheaper.
pub fn priority_cost(path_len: u32, priority: u8, weight: i64) -> i64 {
    path_len as i64 - weight * priority as i64
}

/// Sum of assignment costs.
pub fn total_cost(assignments: &[Assignment]) -> i64 {
    assignments.iter().map(|a| a.cost).sum()
}

/// Sort inputs by id and evaluate the cost of every pair once.
fn cost_table<F>(
    robots: &[RobotCandidate],
    visits: &[VisitCandidate],
    mut cost_fn: F,
) -> (Vec<RobotCandidate>, Vec<VisitCandidate>, Vec<Vec<Option<i64>>>)
where
    F: FnMut(&RobotCandidate, &VisitCandidate) -> Option<i64>,
{
    let mut robots = robots.to_vec();
    robots.sort_by_key(|r| r.robot_id);
    let mut visits = visits.to_vec();
    visits.sort_by_key(|v| v.visit_id);

    let costs = robots
        .iter()
        .map(|r| visits.iter().map(|v| cost_fn(r, v)).collect())
        .collect();
    (robots, visits, costs)
}

/// Greedy allocation: repeatedly bind the globally cheapest feasible pair.
///
/// Ties go to the lowest robot id, then the lowest visit id. Result is
/// ordered by selection round.
pub fn assign<F>(robots: &[RobotCandidate], visits: &[VisitCandidate], cost_fn: F) -> Vec<Assignment>
where
    F: FnMut(&RobotCandidate, &VisitCandidate) -> Option<i64>,
{
    let (robots, visits, costs) = cost_table(robots, visits, cost_fn);
    let mut robot_free = vec![true; robots.len()];
    let mut visit_free = vec![true; visits.len()];
    let mut result = Vec::with_capacity(robots.len().min(visits.len()));

    loop {
        let mut best: Option<(i64, usize, usize)> = None;
        for (ri, row) in costs.iter().enumerate() {
            if !robot_free[ri] {
                continue;
            }
            for (vi, cost) in row.iter().enumerate() {
                if !visit_free[vi] {
                    continue;
                }
                let Some(cost) = *cost else { continue };
                // Strict `<` in id-sorted scan order keeps the lowest ids on ties
                if best.map_or(true, |(best_cost, _, _)| cost < best_cost) {
                    best = Some((cost, ri, vi));
                }
            }
        }

        let Some((cost, ri, vi)) = best else { break };
        robot_free[ri] = false;
        visit_free[vi] = false;
        result.push(Assignment {
            robot_id: robots[ri].robot_id,
            visit_id: visits[vi].visit_id,
            cost,
        });
    }

    result
}

/// Exact minimum-total-cost allocation via Kuhn–Munkres.
///
/// Matches as many pairs as the smaller side allows, then drops any pair
/// that was only matched through an infeasible entry. Result is ordered by
/// robot id.
pub fn assign_optimal<F>(
    robots: &[RobotCandidate],
    visits: &[VisitCandidate],
    cost_fn: F,
) -> Vec<Assignment>
where
    F: FnMut(&RobotCandidate, &VisitCandidate) -> Option<i64>,
{
    let (robots, visits, costs) = cost_table(robots, visits, cost_fn);
    if robots.is_empty() || visits.is_empty() {
        return Vec::new();
    }

    let entry = |ri: usize, vi: usize| costs[ri][vi].unwrap_or(INFEASIBLE_COST);

    // The solver needs rows ≤ columns, so the smaller side becomes the rows
    let robots_are_rows = robots.len() <= visits.len();
    let rows: Vec<Vec<i64>> = if robots_are_rows {
        (0..robots.len())
            .map(|ri| (0..visits.len()).map(|vi| entry(ri, vi)).collect())
            .collect()
    } else {
        (0..visits.len())
            .map(|vi| (0..robots.len()).map(|ri| entry(ri, vi)).collect())
            .collect()
    };

    let Ok(matrix) = Matrix::from_rows(rows) else {
        return assign_from_table(&robots, &visits, &costs);
    };
    let (_, columns) = kuhn_munkres_min(&matrix);

    let mut result: Vec<Assignment> = columns
        .into_iter()
        .enumerate()
        .map(|(row, col)| {
            if robots_are_rows {
                (row, col)
            } else {
                (col, row)
            }
        })
        .filter_map(|(ri, vi)| {
            costs[ri][vi].map(|cost| Assignment {
                robot_id: robots[ri].robot_id,
                visit_id: visits[vi].visit_id,
                cost,
            })
        })
        .collect();
    result.sort_by_key(|a| a.robot_id);
    result
}

fn assign_from_table(
    robots: &[RobotCandidate],
    visits: &[VisitCandidate],
    costs: &[Vec<Option<i64>>],
) -> Vec<Assignment> {
    let index_of_robot = |id: RobotId| robots.iter().position(|r| r.robot_id == id);
    let index_of_visit = |id: VisitId| visits.iter().position(|v| v.visit_id == id);
    assign(robots, visits, |r, v| {
        let ri = index_of_robot(r.robot_id)?;
        let vi = index_of_visit(v.visit_id)?;
        costs[ri][vi]
    })
}
