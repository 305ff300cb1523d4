//! Simulation configuration and validation.
//!
//! `SimConfig::default()` is the canonical floor layout: a 13×8 grid with
//! three robots parked along the bottom-right edge and all four station
//! types. Every field falls back to that default when deserialised from a
//! partial document.

use std::collections::HashSet;

use robofleet_logic::allocation::AllocationStrategy;
use robofleet_logic::grid::{Cell, GridWorld};
use robofleet_logic::stations::StationType;
use serde::{Deserialize, Serialize};

/// Largest accepted grid side.
pub const MAX_GRID_SIDE: i32 = 512;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub width: i32,
    pub height: i32,
    /// One robot per cell; robot ids are assigned 1.. in this order.
    pub robot_spawn_cells: Vec<Cell>,
    /// Station types present on the floor, one station each.
    pub station_types: Vec<StationType>,
    pub rng_seed: u64,
    /// Ticks a robot waits on an occupied cell before replanning.
    pub max_wait_ticks: u32,
    /// Planning failures after which a visit (and its order) fails.
    pub max_plan_failures: u32,
    /// Path-length units one priority level is worth to the allocator.
    pub priority_weight: i64,
    pub strategy: AllocationStrategy,
    /// Static obstacles.
    pub walls: Vec<Cell>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 13,
            height: 8,
            robot_spawn_cells: vec![Cell::new(10, 7), Cell::new(11, 7), Cell::new(12, 7)],
            station_types: StationType::ALL.to_vec(),
            rng_seed: 42,
            max_wait_ticks: 3,
            max_plan_failures: 8,
            priority_weight: 1,
            strategy: AllocationStrategy::Greedy,
            walls: Vec::new(),
        }
    }
}

/// A single configuration rule violation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("grid {width}x{height} outside 1..={max}", max = MAX_GRID_SIDE)]
    InvalidDimensions { width: i32, height: i32 },
    #[error("no robot spawn cells")]
    NoRobots,
    #[error("spawn cell {0} is out of bounds")]
    SpawnOutOfBounds(Cell),
    #[error("spawn cell {0} is a wall")]
    SpawnOnWall(Cell),
    #[error("spawn cell {0} is used twice")]
    DuplicateSpawn(Cell),
    #[error("no station types")]
    NoStationTypes,
    #[error("station type {0} listed twice")]
    DuplicateStationType(StationType),
    #[error("wall {0} is out of bounds")]
    WallOutOfBounds(Cell),
    #[error("max_wait_ticks must be at least 1")]
    ZeroMaxWaitTicks,
    #[error("max_plan_failures must be at least 1")]
    ZeroMaxPlanFailures,
    #[error("priority_weight {0} is negative")]
    NegativePriorityWeight(i64),
    #[error("{free} free cells cannot hold {needed} stations")]
    NotEnoughFreeCells { free: usize, needed: usize },
}

impl SimConfig {
    /// The static map described by this configuration.
    pub fn grid(&self) -> GridWorld {
        GridWorld::with_walls(self.width, self.height, self.walls.iter().copied())
    }

    /// Check every rule, returning all violations found.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let dims_ok = (1..=MAX_GRID_SIDE).contains(&self.width)
            && (1..=MAX_GRID_SIDE).contains(&self.height);
        if !dims_ok {
            errors.push(ConfigError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        let grid = self.grid();

        for &wall in &self.walls {
            if !grid.is_in_bounds(wall) {
                errors.push(ConfigError::WallOutOfBounds(wall));
            }
        }

        if self.robot_spawn_cells.is_empty() {
            errors.push(ConfigError::NoRobots);
        }
        let mut seen = HashSet::new();
        for &cell in &self.robot_spawn_cells {
            if !grid.is_in_bounds(cell) {
                errors.push(ConfigError::SpawnOutOfBounds(cell));
            } else if grid.is_wall(cell) {
                errors.push(ConfigError::SpawnOnWall(cell));
            }
            if !seen.insert(cell) {
                errors.push(ConfigError::DuplicateSpawn(cell));
            }
        }

        if self.station_types.is_empty() {
            errors.push(ConfigError::NoStationTypes);
        }
        let mut seen_types = HashSet::new();
        for &t in &self.station_types {
            if !seen_types.insert(t) {
                errors.push(ConfigError::DuplicateStationType(t));
            }
        }
        if dims_ok && grid.free_cell_count() < self.station_types.len() {
            errors.push(ConfigError::NotEnoughFreeCells {
                free: grid.free_cell_count(),
                needed: self.station_types.len(),
            });
        }

        if self.max_wait_ticks == 0 {
            errors.push(ConfigError::ZeroMaxWaitTicks);
        }
        if self.max_plan_failures == 0 {
            errors.push(ConfigError::ZeroMaxPlanFailures);
        }
        if self.priority_weight < 0 {
            errors.push(ConfigError::NegativePriorityWeight(self.priority_weight));
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SimConfig::default();
        let errors = config.validate();
        assert!(errors.is_empty(), "default config should be valid: {errors:?}");
    }

    #[test]
    fn test_default_matches_floor_layout() {
        let config = SimConfig::default();
        assert_eq!((config.width, config.height), (13, 8));
        assert_eq!(config.robot_spawn_cells.len(), 3);
        assert_eq!(config.station_types.len(), 4);
        assert_eq!(config.max_wait_ticks, 3);
    }

    #[test]
    fn test_invalid_dimensions() {
        let config = SimConfig {
            width: 0,
            ..Default::default()
        };
        let errors = config.validate();
        assert!(errors.contains(&ConfigError::InvalidDimensions { width: 0, height: 8 }));
    }

    #[test]
    fn test_spawn_rules() {
        let config = SimConfig {
            robot_spawn_cells: vec![Cell::new(1, 1), Cell::new(1, 1), Cell::new(20, 1), Cell::new(2, 2)],
            walls: vec![Cell::new(2, 2)],
            ..Default::default()
        };
        let errors = config.validate();
        assert!(errors.contains(&ConfigError::DuplicateSpawn(Cell::new(1, 1))));
        assert!(errors.contains(&ConfigError::SpawnOutOfBounds(Cell::new(20, 1))));
        assert!(errors.contains(&ConfigError::SpawnOnWall(Cell::new(2, 2))));
    }

    #[test]
    fn test_no_robots_and_no_stations() {
        let config = SimConfig {
            robot_spawn_cells: vec![],
            station_types: vec![],
            ..Default::default()
        };
        let errors = config.validate();
        assert!(errors.contains(&ConfigError::NoRobots));
        assert!(errors.contains(&ConfigError::NoStationTypes));
    }

    #[test]
    fn test_duplicate_station_type() {
        let config = SimConfig {
            station_types: vec![StationType::Cs, StationType::Cs],
            ..Default::default()
        };
        assert!(config
            .validate()
            .contains(&ConfigError::DuplicateStationType(StationType::Cs)));
    }

    #[test]
    fn test_tuning_rules() {
        let config = SimConfig {
            max_wait_ticks: 0,
            max_plan_failures: 0,
            priority_weight: -2,
            walls: vec![Cell::new(-1, 0)],
            ..Default::default()
        };
        let errors = config.validate();
        assert!(errors.contains(&ConfigError::ZeroMaxWaitTicks));
        assert!(errors.contains(&ConfigError::ZeroMaxPlanFailures));
        assert!(errors.contains(&ConfigError::NegativePriorityWeight(-2)));
        assert!(errors.contains(&ConfigError::WallOutOfBounds(Cell::new(-1, 0))));
    }

    #[test]
    fn test_too_small_for_stations() {
        let config = SimConfig {
            width: 2,
            height: 1,
            robot_spawn_cells: vec![Cell::new(0, 0)],
            ..Default::default()
        };
        assert!(config
            .validate()
            .contains(&ConfigError::NotEnoughFreeCells { free: 2, needed: 4 }));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SimConfig = serde_json::from_str(
            r#"{ "rng_seed": 7, "station_types": ["CS", "DS"], "strategy": "optimal" }"#,
        )
        .unwrap();
        assert_eq!(config.rng_seed, 7);
        assert_eq!(config.station_types, vec![StationType::Cs, StationType::Ds]);
        assert_eq!(config.strategy, AllocationStrategy::Optimal);
        assert_eq!(config.width, 13);
        assert!(config.validate().is_empty());
    }
}
