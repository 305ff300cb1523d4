//! Events emitted by `SimulationEngine::tick`.
//!
//! Only the current tick's events are kept; the caller owns the returned
//! list and decides what to surface.

use robofleet_logic::allocation::{RobotId, VisitId};
use robofleet_logic::grid::Cell;
use serde::Serialize;

use crate::orders::OrderId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimEvent {
    /// The allocator bound a robot to a visit.
    Assigned {
        robot_id: RobotId,
        visit_id: VisitId,
        cost: i64,
    },
    Moved {
        robot_id: RobotId,
        to: Cell,
    },
    /// The next planned cell is taken; the robot waits in place.
    Blocked {
        robot_id: RobotId,
        at: Cell,
        next: Cell,
        wait_ticks: u32,
    },
    /// Waited past the stall limit and planned a fresh route.
    Replanned {
        robot_id: RobotId,
        visit_id: VisitId,
        path_len: usize,
    },
    /// No route to the station; the visit went back to the pool.
    Unreachable {
        robot_id: RobotId,
        visit_id: VisitId,
    },
    /// Kept stalling after replans; the visit went back to the pool.
    Stalled {
        robot_id: RobotId,
        visit_id: VisitId,
    },
    VisitCompleted {
        robot_id: RobotId,
        cell: Cell,
        visit_id: VisitId,
    },
    VisitFailed {
        visit_id: VisitId,
        order_id: OrderId,
    },
    OrderCompleted {
        order_id: OrderId,
    },
}

impl SimEvent {
    pub fn robot_id(&self) -> Option<RobotId> {
        match self {
            SimEvent::Assigned { robot_id, .. }
            | SimEvent::Moved { robot_id, .. }
            | SimEvent::Blocked { robot_id, .. }
            | SimEvent::Replanned { robot_id, .. }
            | SimEvent::Unreachable { robot_id, .. }
            | SimEvent::Stalled { robot_id, .. }
            | SimEvent::VisitCompleted { robot_id, .. } => Some(*robot_id),
            SimEvent::VisitFailed { .. } | SimEvent::OrderCompleted { .. } => None,
        }
    }

    /// Cell the robot stands on after this event, if it moved or finished.
    pub fn new_cell(&self) -> Option<Cell> {
        match self {
            SimEvent::Moved { to, .. } => Some(*to),
            SimEvent::VisitCompleted { cell, .. } => Some(*cell),
            _ => None,
        }
    }

    pub fn completed_visit(&self) -> Option<VisitId> {
        match self {
            SimEvent::VisitCompleted { visit_id, .. } => Some(*visit_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let moved = SimEvent::Moved {
            robot_id: 2,
            to: Cell::new(4, 5),
        };
        assert_eq!(moved.robot_id(), Some(2));
        assert_eq!(moved.new_cell(), Some(Cell::new(4, 5)));
        assert_eq!(moved.completed_visit(), None);

        let done = SimEvent::VisitCompleted {
            robot_id: 1,
            cell: Cell::new(0, 0),
            visit_id: 9,
        };
        assert_eq!(done.completed_visit(), Some(9));

        let order = SimEvent::OrderCompleted { order_id: 1 };
        assert_eq!(order.robot_id(), None);
        assert_eq!(order.new_cell(), None);
    }

    #[test]
    fn test_serialized_shape() {
        let e = SimEvent::Moved {
            robot_id: 3,
            to: Cell::new(1, 2),
        };
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["kind"], "moved");
        assert_eq!(json["robot_id"], 3);
        assert_eq!(json["to"]["x"], 1);
    }
}
