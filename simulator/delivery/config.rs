//! Configuration for synthetic delivery scenarios

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Deserialize;
use uav_rust::uav_interface::Tick;
use uav_rust::MissionSetup;

/// Scenario file: mission setup plus the synthetic workload that drives it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryScenario {
    #[serde(default)]
    pub meta: ScenarioMeta,

    /// Mission setup recorded with the run (omitted keys keep defaults)
    #[serde(default)]
    pub mission: MissionSetup,

    #[serde(default)]
    pub workload: WorkloadConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScenarioMeta {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Synthetic traffic parameters
///
/// The workload is not a mobility or routing model; it only produces facts
/// with realistic shapes (duplicates, losses, late arrivals) for the metrics.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Probability that an event is generated in a tick
    pub event_probability: f64,

    /// Probability that some drone senses a generated event
    pub detection_probability: f64,

    /// Range of packet copies created per detected event (min, max)
    pub copies_range: (usize, usize),

    /// Probability that a copy ever reaches the depot
    pub delivery_probability: f64,

    /// Maximum ticks a delivered copy spends in the network
    pub max_delivery_delay: Tick,

    /// Maximum candidate relays seen at a forwarding decision
    pub max_relay_candidates: usize,

    /// Control packets exchanged per tick across the swarm
    pub control_packets_per_tick: usize,

    /// Ticks between neighbor discovery rounds (and consistency checks)
    pub discovery_interval: Tick,

    /// Probability that an acknowledged neighbor is missing from the table
    pub ack_loss_probability: f64,

    /// Probability that a node reports a wrong hop count
    pub hop_error_probability: f64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            event_probability: 0.01,
            detection_probability: 0.8,
            copies_range: (1, 3),
            delivery_probability: 0.6,
            max_delivery_delay: 400,
            max_relay_candidates: 4,
            control_packets_per_tick: 2,
            discovery_interval: 500,
            ack_loss_probability: 0.0,
            hop_error_probability: 0.0,
        }
    }
}

impl DeliveryScenario {
    /// Explicit override, or the mission seed
    pub fn resolve_seed(&self, seed_override: Option<u64>) -> u64 {
        seed_override.unwrap_or(self.mission.seed)
    }

    /// Fresh random seed, for runs that should not be reproducible
    pub fn random_seed() -> u64 {
        StdRng::from_entropy().next_u64()
    }
}
