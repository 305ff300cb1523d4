//! Read-only views handed to renderers and harnesses.

use robofleet_logic::allocation::{RobotId, VisitId};
use robofleet_logic::grid::Cell;
use robofleet_logic::stations::Station;
use serde::Serialize;

use crate::components::RobotState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RobotView {
    pub id: RobotId,
    pub cell: Cell,
    pub busy: bool,
    pub current_visit: Option<VisitId>,
    pub state: RobotState,
    /// Cells left on the current plan.
    pub remaining_path: usize,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub paused: bool,
    /// Ascending robot id.
    pub robots: Vec<RobotView>,
    pub stations: Vec<Station>,
    /// Visits not yet Done or Failed.
    pub pending_visit_count: usize,
    pub completed_visit_count: usize,
    pub failed_visit_count: usize,
    pub active_order_count: usize,
}

impl Snapshot {
    pub fn robot(&self, id: RobotId) -> Option<&RobotView> {
        self.robots.iter().find(|r| r.id == id)
    }

    pub fn robot_cells(&self) -> Vec<Cell> {
        self.robots.iter().map(|r| r.cell).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RobotStats {
    pub id: RobotId,
    pub busy_ticks: u64,
    pub cells_travelled: u64,
    pub replans: u32,
    /// busy ticks / elapsed ticks, 0.0 before the first tick.
    pub utilization: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimStats {
    pub ticks: u64,
    pub completed_visits: usize,
    pub failed_visits: usize,
    pub completed_orders: usize,
    pub robots: Vec<RobotStats>,
}

impl SimStats {
    /// Mean utilisation over the fleet.
    pub fn fleet_utilization(&self) -> f32 {
        if self.robots.is_empty() {
            return 0.0;
        }
        self.robots.iter().map(|r| r.utilization).sum::<f32>() / self.robots.len() as f32
    }
}
