//! Mission Setup
//!
//! Immutable copy of the run configuration. It is captured once when a
//! `MetricsCollector` is created and travels with every snapshot and report,
//! so results can be reproduced without the simulation that produced them.

use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::uav_error::{MetricsError, MetricsResult};
use crate::uav_interface::{Position, Tick};

/// Run configuration of a single simulation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionSetup {
    /// Number of ticks in the run
    pub len_simulation: Tick,

    /// Real time per tick (seconds)
    pub time_step_duration: f64,

    pub seed: u64,

    pub n_drones: usize,

    /// Environment size (meters)
    pub env_width: f64,
    pub env_height: f64,

    /// Drone communication and sensing ranges (meters)
    pub drone_com_range: f64,
    pub drone_sen_range: f64,

    /// Drone speed (meters per second)
    pub drone_speed: f64,

    pub drone_max_buffer_size: usize,
    pub drone_max_energy: u64,

    /// Ticks between retransmissions
    pub drone_retransmission_delta: Tick,

    /// Probability a transmission succeeds (0.0 to 1.0)
    pub drone_communication_success: f64,

    pub depot_com_range: f64,
    pub depot_coordinates: Position,

    /// Ticks an event stays relevant after it is generated
    pub event_duration: Tick,

    pub packets_max_ttl: Tick,

    pub routing_algorithm: String,
    pub communication_error_type: String,
}

impl Default for MissionSetup {
    fn default() -> Self {
        Self {
            len_simulation: 15_000,
            time_step_duration: 0.150,
            seed: 1,
            n_drones: 5,
            env_width: 1500.0,
            env_height: 1500.0,
            drone_com_range: 200.0,
            drone_sen_range: 0.0,
            drone_speed: 8.0,
            drone_max_buffer_size: 100,
            drone_max_energy: 1_000_000,
            drone_retransmission_delta: 100,
            drone_communication_success: 1.0,
            depot_com_range: 200.0,
            depot_coordinates: Position::new(750.0, 0.0),
            event_duration: 2000,
            packets_max_ttl: 200,
            routing_algorithm: "GEO".to_string(),
            communication_error_type: "NoError".to_string(),
        }
    }
}

impl MissionSetup {
    /// Parse from YAML; omitted keys keep their default
    pub fn from_yaml_str(yaml: &str) -> MetricsResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> MetricsResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| MetricsError::io(path, e))?;
        debug!("loaded mission setup from {}", path.display());
        Self::from_yaml_str(&content)
    }

    /// Total simulated time in seconds
    pub fn mission_seconds(&self) -> f64 {
        self.len_simulation as f64 * self.time_step_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let setup = MissionSetup::from_yaml_str(
            "n_drones: 12\nrouting_algorithm: QL\ndepot_coordinates: { x: 10.0, y: 20.0 }\n",
        )
        .unwrap();

        assert_eq!(setup.n_drones, 12);
        assert_eq!(setup.routing_algorithm, "QL");
        assert_eq!(setup.depot_coordinates, Position::new(10.0, 20.0));
        assert_eq!(setup.event_duration, MissionSetup::default().event_duration);
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let result = MissionSetup::from_yaml_str("n_drones: [not, a, number]");
        assert!(matches!(result, Err(MetricsError::Yaml(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = MissionSetup::from_yaml_file(dir.path().join("missing.yaml"));
        assert!(matches!(result, Err(MetricsError::Io { .. })));
    }

    #[test]
    fn test_mission_seconds() {
        let setup = MissionSetup {
            len_simulation: 100,
            time_step_duration: 0.5,
            ..Default::default()
        };
        assert_eq!(setup.mission_seconds(), 50.0);
    }
}
