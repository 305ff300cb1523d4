//! RoboFleet Core - Warehouse Robot Fleet Simulation Engine
//!
//! A discrete-time simulation of a small robot fleet serving multi-stop
//! orders on a grid floor. Each tick allocates idle robots to pending
//! station visits, plans collision-free paths and moves every robot at
//! most one cell.
//!
//! # Architecture
//!
//! Robots live in a `hecs` world:
//! - **Entities**: robots
//! - **Components**: `Robot`, `GridPos`, `Odometer`, plus a `Mission` while busy
//! - **Phases**: allocate, plan, advance, complete (see [`SimulationEngine::tick`])
//!
//! Orders and visits are plain data in an [`orders::OrderBook`]. Grid,
//! pathfinding and allocation math comes from `robofleet-logic`.
//!
//! # Example
//!
//! ```rust,no_run
//! use robofleet_core::prelude::*;
//!
//! let mut engine = SimulationEngine::initialize(SimConfig::default()).unwrap();
//! engine.submit_order(&[StationType::Cs, StationType::Rs, StationType::Ds]).unwrap();
//!
//! while engine.has_active_orders() {
//!     for event in engine.tick() {
//!         println!("{event:?}");
//!     }
//! }
//! ```

pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod orders;
pub mod snapshot;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::RobotState;
    pub use crate::config::{ConfigError, SimConfig};
    pub use crate::engine::{RunOutcome, SimulationEngine};
    pub use crate::error::SimError;
    pub use crate::events::SimEvent;
    pub use crate::orders::{OrderId, OrderState, VisitState};
    pub use crate::snapshot::{RobotView, SimStats, Snapshot};
    pub use robofleet_logic::allocation::{AllocationStrategy, RobotId, VisitId};
    pub use robofleet_logic::grid::Cell;
    pub use robofleet_logic::stations::{OrderPreset, Station, StationType};
}
