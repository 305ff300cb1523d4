//! Order book: orders, their visits, and the visit state machine.
//!
//! Visits of one order run strictly in sequence: only the first non-Done
//! visit is ever Pending (or further along); the rest wait as Queued.

use std::collections::BTreeMap;

use robofleet_logic::allocation::{RobotId, VisitId};
use robofleet_logic::grid::Cell;
use robofleet_logic::stations::StationType;
use serde::{Deserialize, Serialize};

pub type OrderId = u64;

/// Lifecycle of a single visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VisitState {
    /// Waiting for the previous visit of its order.
    Queued,
    /// Eligible for allocation.
    Pending,
    /// Bound to a robot, no path yet.
    Assigned,
    /// Robot has a path and is travelling.
    InProgress,
    Done,
    Failed,
}

impl VisitState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, VisitState::Done | VisitState::Failed)
    }
}

/// One station stop within an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub id: VisitId,
    pub order_id: OrderId,
    pub station_type: StationType,
    pub station_cell: Cell,
    pub sequence_index: usize,
    pub priority: u8,
    pub state: VisitState,
    pub robot_id: Option<RobotId>,
    /// Planning failures so far.
    pub failures: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    Active,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub sequence: Vec<StationType>,
    pub priority: u8,
    pub visit_ids: Vec<VisitId>,
    pub state: OrderState,
}

/// What happened when a visit was handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Back to Pending for another allocation round.
    Requeued,
    /// Failure limit reached; the visit and the rest of its order failed.
    Failed { order_id: OrderId },
}

/// Result of completing a visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub order_id: OrderId,
    /// The visit promoted to Pending, if the order continues.
    pub next_visit: Option<VisitId>,
    pub order_done: bool,
}

/// All orders and visits of one simulation run.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    orders: BTreeMap<OrderId, Order>,
    visits: BTreeMap<VisitId, Visit>,
    next_order_id: OrderId,
    next_visit_id: VisitId,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an order from resolved `(station type, station cell)` stops.
    ///
    /// The first visit starts Pending, the rest Queued. Ids start at 1.
    pub fn submit(&mut self, stops: &[(StationType, Cell)], priority: u8) -> OrderId {
        self.next_order_id += 1;
        let order_id = self.next_order_id;

        let mut visit_ids = Vec::with_capacity(stops.len());
        for (index, &(station_type, station_cell)) in stops.iter().enumerate() {
            self.next_visit_id += 1;
            let id = self.next_visit_id;
            let state = if index == 0 {
                VisitState::Pending
            } else {
                VisitState::Queued
            };
            self.visits.insert(
                id,
                Visit {
                    id,
                    order_id,
                    station_type,
                    station_cell,
                    sequence_index: index,
                    priority,
                    state,
                    robot_id: None,
                    failures: 0,
                },
            );
            visit_ids.push(id);
        }

        self.orders.insert(
            order_id,
            Order {
                id: order_id,
                sequence: stops.iter().map(|&(t, _)| t).collect(),
                priority,
                visit_ids,
                state: OrderState::Active,
            },
        );
        order_id
    }

    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    pub fn visit(&self, id: VisitId) -> Option<&Visit> {
        self.visits.get(&id)
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    /// Visits eligible for allocation, ascending id.
    pub fn pending(&self) -> impl Iterator<Item = &Visit> {
        self.visits
            .values()
            .filter(|v| v.state == VisitState::Pending)
    }

    pub fn has_active_orders(&self) -> bool {
        self.orders.values().any(|o| o.state == OrderState::Active)
    }

    /// Visits not yet Done or Failed.
    pub fn outstanding_count(&self) -> usize {
        self.visits
            .values()
            .filter(|v| !v.state.is_terminal())
            .count()
    }

    pub fn count_visits(&self, state: VisitState) -> usize {
        self.visits.values().filter(|v| v.state == state).count()
    }

    pub fn count_orders(&self, state: OrderState) -> usize {
        self.orders.values().filter(|o| o.state == state).count()
    }

    pub fn mark_assigned(&mut self, visit_id: VisitId, robot_id: RobotId) {
        if let Some(v) = self.visits.get_mut(&visit_id) {
            v.state = VisitState::Assigned;
            v.robot_id = Some(robot_id);
        }
    }

    pub fn mark_in_progress(&mut self, visit_id: VisitId) {
        if let Some(v) = self.visits.get_mut(&visit_id) {
            v.state = VisitState::InProgress;
        }
    }

    /// Count a planning failure and hand the visit back to the pool.
    pub fn release(&mut self, visit_id: VisitId, max_failures: u32) -> ReleaseOutcome {
        let Some(visit) = self.visits.get_mut(&visit_id) else {
            return ReleaseOutcome::Requeued;
        };
        visit.failures += 1;
        visit.robot_id = None;
        if visit.failures < max_failures {
            visit.state = VisitState::Pending;
            return ReleaseOutcome::Requeued;
        }

        let order_id = visit.order_id;
        self.fail_order(order_id);
        ReleaseOutcome::Failed { order_id }
    }

    fn fail_order(&mut self, order_id: OrderId) {
        let Some(order) = self.orders.get_mut(&order_id) else {
            return;
        };
        order.state = OrderState::Failed;
        for id in &order.visit_ids {
            if let Some(v) = self.visits.get_mut(id) {
                if !v.state.is_terminal() {
                    v.state = VisitState::Failed;
                    v.robot_id = None;
                }
            }
        }
    }

    /// Mark a visit Done and promote the next visit of its order.
    pub fn complete(&mut self, visit_id: VisitId) -> Option<Completion> {
        let visit = self.visits.get_mut(&visit_id)?;
        if visit.state.is_terminal() {
            return None;
        }
        visit.state = VisitState::Done;
        let order_id = visit.order_id;
        let next_index = visit.sequence_index + 1;

        let order = self.orders.get_mut(&order_id)?;
        let next_visit = order.visit_ids.get(next_index).copied();
        match next_visit {
            Some(next_id) => {
                if let Some(next) = self.visits.get_mut(&next_id) {
                    next.state = VisitState::Pending;
                }
            }
            None => order.state = OrderState::Completed,
        }

        Some(Completion {
            order_id,
            next_visit,
            order_done: next_visit.is_none(),
        })
    }
}
