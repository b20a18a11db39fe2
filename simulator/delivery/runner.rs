// Synthetic Delivery Runner

use super::config::DeliveryScenario;
use super::stats::{ConsistencyStats, RunResult};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use uav_rust::uav_interface::{EventId, NodeId, PacketId, Tick};
use uav_rust::{
    Ack, ConsistencyChecker, DataPacket, DepotState, DepotTable, DroneState, Event,
    MetricsCollector, MissionSetup, NeighborEntry, NeighborTable, NodeInfo, Position,
};

const DEPOT_ID: NodeId = 0;

// ============================================================================
// Core Structures
// ============================================================================

/// Drives a collector and a consistency checker with a seeded synthetic workload
pub struct DeliveryRunner {
    scenario: DeliveryScenario,
    rng: StdRng,
    seed: u64,

    metrics: MetricsCollector,
    checker: ConsistencyChecker,

    // Routing state handed to the checker
    drones: Vec<DroneState>,
    depot: DepotState,

    // Copies on their way to the depot, by arrival tick
    in_flight: BTreeMap<Tick, Vec<DataPacket>>,

    next_event_id: EventId,
    next_packet_id: PacketId,
    consistency: ConsistencyStats,
}

impl DeliveryRunner {
    pub fn new(scenario: DeliveryScenario, seed_override: Option<u64>) -> Self {
        let seed = scenario.resolve_seed(seed_override);
        let mission = MissionSetup {
            seed,
            ..scenario.mission.clone()
        };

        let drones = (1..=mission.n_drones as NodeId)
            .map(|identifier| DroneState {
                identifier,
                coords: Position::default(),
                hop_from_depot: 0,
                neighbor_table: NeighborTable::default(),
            })
            .collect();

        let depot = DepotState {
            identifier: DEPOT_ID,
            coords: mission.depot_coordinates,
            communication_range: mission.depot_com_range,
            nodes_table: DepotTable::new(),
        };

        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
            metrics: MetricsCollector::new(mission),
            checker: ConsistencyChecker::new(),
            drones,
            depot,
            in_flight: BTreeMap::new(),
            next_event_id: 1,
            next_packet_id: 1,
            consistency: ConsistencyStats::default(),
            scenario,
        }
    }

    pub fn run(mut self) -> RunResult {
        let ticks = self.metrics.mission_setup().len_simulation;
        let interval = self.scenario.workload.discovery_interval.max(1);
        let event_probability = probability(self.scenario.workload.event_probability);

        info!(
            "running {} ticks with {} drones (seed {})",
            ticks,
            self.drones.len(),
            self.seed
        );

        for tick in 0..ticks {
            self.metrics.record_mission_tick();
            for _ in 0..self.scenario.workload.control_packets_per_tick {
                self.metrics.count_control_packet();
            }

            if tick % interval == 0 {
                self.discovery_round(tick);
            }

            if self.rng.gen_bool(event_probability) {
                self.generate_event(tick);
            }

            if let Some(arrivals) = self.in_flight.remove(&tick) {
                for packet in arrivals {
                    self.metrics.record_delivery(packet, tick);
                }
            }
        }

        let undelivered: usize = self.in_flight.values().map(Vec::len).sum();
        info!(
            "run complete: {} copies still in flight at the end",
            undelivered
        );

        RunResult {
            seed_used: self.seed,
            ticks_completed: ticks,
            metrics: self.metrics,
            consistency: self.consistency,
        }
    }

    // ========================================================================
    // Workload
    // ========================================================================

    fn generate_event(&mut self, tick: Tick) {
        let workload = self.scenario.workload.clone();
        let mission = self.metrics.mission_setup().clone();

        let coords = Position::new(
            self.rng.gen_range(0.0..=mission.env_width),
            self.rng.gen_range(0.0..=mission.env_height),
        );
        let event = Event::new(self.next_event_id, coords, tick, mission.event_duration);
        self.next_event_id += 1;
        self.metrics.record_event(event);

        if !self.rng.gen_bool(probability(workload.detection_probability)) {
            self.metrics.record_missed_event(event);
            return;
        }

        let source = self
            .drones
            .choose(&mut self.rng)
            .map(|d| d.identifier)
            .unwrap_or(DEPOT_ID);

        let (min_copies, max_copies) = workload.copies_range;
        let copies = self.rng.gen_range(min_copies..=max_copies.max(min_copies));

        for copy in 0..copies {
            // relayed copies are created on the following ticks
            let packet = DataPacket::new(
                self.next_packet_id,
                tick + copy as Tick,
                event,
                source,
                mission.packets_max_ttl,
            );
            self.next_packet_id += 1;

            self.metrics.record_packet(packet);
            self.metrics.count_data_packet();
            self.metrics
                .record_relay_opportunity(self.rng.gen_range(0..=workload.max_relay_candidates));

            if self.rng.gen_bool(probability(workload.delivery_probability)) {
                let delay = self.rng.gen_range(1..=workload.max_delivery_delay.max(1));
                self.in_flight
                    .entry(packet.creation_tick + delay)
                    .or_default()
                    .push(packet);
            }
        }
    }

    // ========================================================================
    // Neighbor Discovery + Consistency Checks
    // ========================================================================

    fn discovery_round(&mut self, tick: Tick) {
        let mission = self.metrics.mission_setup().clone();
        let ack_loss = probability(self.scenario.workload.ack_loss_probability);
        let hop_error = probability(self.scenario.workload.hop_error_probability);

        // positions are resampled, not moved
        for drone in self.drones.iter_mut() {
            drone.coords = Position::new(
                self.rng.gen_range(0.0..=mission.env_width),
                self.rng.gen_range(0.0..=mission.env_height),
            );
            let near_depot = drone.coords.distance(&self.depot.coords) <= mission.depot_com_range;
            drone.hop_from_depot = if near_depot { 1 } else { 2 };
            if self.rng.gen_bool(hop_error) {
                drone.hop_from_depot += 1;
            }
        }

        let snapshot: Vec<(NodeId, Position, u32)> = self
            .drones
            .iter()
            .map(|d| (d.identifier, d.coords, d.hop_from_depot))
            .collect();

        for drone in self.drones.iter_mut() {
            let mut entries = Vec::new();
            for &(other, coords, hop_count) in &snapshot {
                if other == drone.identifier
                    || drone.coords.distance(&coords) > mission.drone_com_range
                {
                    continue;
                }

                self.checker.record_ack(Ack { sender: other, tick }, drone.identifier);
                if self.rng.gen_bool(ack_loss) {
                    debug!("{}: dropping {} from table of {}", tick, other, drone.identifier);
                    continue;
                }
                entries.push(NeighborEntry {
                    node: other,
                    hop_count,
                    last_update: tick,
                });
            }
            drone.neighbor_table = NeighborTable::new(entries);
        }

        let mut nodes_table = DepotTable::new();
        for drone in &self.drones {
            if drone.coords.distance(&self.depot.coords) > mission.depot_com_range {
                continue;
            }
            self.checker.record_ack(
                Ack {
                    sender: drone.identifier,
                    tick,
                },
                DEPOT_ID,
            );
            if self.rng.gen_bool(ack_loss) {
                continue;
            }
            nodes_table.insert(
                drone.identifier,
                NodeInfo {
                    hop_count: drone.hop_from_depot,
                    last_update: tick,
                },
            );
        }
        self.depot.nodes_table = nodes_table;

        let lost = self.checker.report_all_lost(&self.drones, &self.depot);
        let hop_flags = self.checker.check_hop_consistency(&self.drones, &self.depot);
        let table_flags = self.checker.check_depot_table_consistency(&self.depot);

        self.consistency.rounds_checked += 1;
        self.consistency.nodes_with_lost_acks += lost.len();
        self.consistency.hop_count_violations += hop_flags.len();
        self.consistency.depot_table_violations += table_flags.len();

        self.checker.reset();
        self.metrics.record_active_routing_tick();
    }
}

fn probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}
