//! ECS components for robot entities.
//!
//! Components are pure data; the engine's tick phases hold the behaviour.
//! A robot is `(Robot, GridPos, Odometer)`, plus a `Mission` while it has
//! a visit.

use std::collections::VecDeque;

use robofleet_logic::allocation::{RobotId, VisitId};
use robofleet_logic::grid::Cell;
use serde::{Deserialize, Serialize};

/// Robot identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Robot {
    pub id: RobotId,
}

/// Current grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPos(pub Cell);

/// Where a robot stands in its work cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RobotState {
    Idle,
    Assigned,
    Moving,
    Blocked,
}

/// Work bound to a robot. Removed when the visit completes or is released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mission {
    pub visit_id: VisitId,
    /// Station cell of the visit.
    pub target: Cell,
    /// Remaining cells to step through; `None` until planned.
    pub plan: Option<VecDeque<Cell>>,
    /// Consecutive ticks spent waiting on an occupied cell.
    pub wait_ticks: u32,
    /// Stall replans under this mission.
    pub stall_replans: u32,
}

impl Mission {
    pub fn new(visit_id: VisitId, target: Cell) -> Self {
        Self {
            visit_id,
            target,
            plan: None,
            wait_ticks: 0,
            stall_replans: 0,
        }
    }

    pub fn state(&self) -> RobotState {
        match &self.plan {
            None => RobotState::Assigned,
            Some(_) if self.wait_ticks > 0 => RobotState::Blocked,
            Some(_) => RobotState::Moving,
        }
    }

    pub fn next_step(&self) -> Option<Cell> {
        self.plan.as_ref().and_then(|p| p.front().copied())
    }

    pub fn remaining_steps(&self) -> usize {
        self.plan.as_ref().map_or(0, |p| p.len())
    }
}

/// Per-robot counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Odometer {
    /// Ticks spent holding a mission.
    pub busy_ticks: u64,
    pub cells_travelled: u64,
    pub replans: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mission_states() {
        let mut m = Mission::new(1, Cell::new(3, 3));
        assert_eq!(m.state(), RobotState::Assigned);
        assert_eq!(m.next_step(), None);

        m.plan = Some(VecDeque::from(vec![Cell::new(1, 0), Cell::new(2, 0)]));
        assert_eq!(m.state(), RobotState::Moving);
        assert_eq!(m.next_step(), Some(Cell::new(1, 0)));
        assert_eq!(m.remaining_steps(), 2);

        m.wait_ticks = 2;
        assert_eq!(m.state(), RobotState::Blocked);
    }
}
