//! Errors surfaced by the engine API.
//!
//! Runtime conditions inside `tick()` (unreachable goals, stalls) are never
//! errors; they show up as events. Only construction and order submission
//! can fail.

use robofleet_logic::grid::PlacementError;
use robofleet_logic::stations::{UnknownStationCode, MAX_PRIORITY, MIN_PRIORITY};

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    /// The order names a station type that is not on this floor.
    #[error("station type `{0}` is not available in this simulation")]
    InvalidStationType(String),
    #[error("priority {0} is outside {min}..={max}", min = MIN_PRIORITY, max = MAX_PRIORITY)]
    InvalidPriority(u8),
    #[error("order has no visits")]
    EmptyOrder,
    #[error("invalid configuration: {}", join_errors(.0))]
    InvalidConfig(Vec<ConfigError>),
    #[error(transparent)]
    Placement(#[from] PlacementError),
}

impl From<UnknownStationCode> for SimError {
    fn from(e: UnknownStationCode) -> Self {
        SimError::InvalidStationType(e.0)
    }
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            SimError::InvalidPriority(9).to_string(),
            "priority 9 is outside 1..=4"
        );
        let e = SimError::InvalidConfig(vec![ConfigError::NoRobots, ConfigError::ZeroMaxWaitTicks]);
        assert_eq!(
            e.to_string(),
            "invalid configuration: no robot spawn cells; max_wait_ticks must be at least 1"
        );
    }

    #[test]
    fn test_unknown_code_maps_to_invalid_station_type() {
        let e: SimError = UnknownStationCode("QQ".into()).into();
        assert_eq!(e, SimError::InvalidStationType("QQ".into()));
    }
}
