//! Metrics Collector
//!
//! Records simulation facts tick by tick and turns them into run statistics.
//!
//! The simulation loop calls the `record_*` / `count_*` methods as things
//! happen; at the end of a run (or whenever a report is needed) the collector
//! recomputes everything from the raw log. Nothing is accumulated across
//! recomputations, so `compute_derived_statistics` can be called any number of
//! times.
//!
//! # Volume vs latency
//! Delivery volume (packets to depot, throughput, delivery ratio) counts every
//! packet instance that reached the depot, duplicates included. Latency of an
//! event only looks at the fastest copy of that event.
//!
//! # Invariants
//! Broken log invariants (a delivered event that was never generated, a
//! delivery before the packet existed) mean an upstream bug and panic.

use hashbrown::HashSet;
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::uav_config::MissionSetup;
use crate::uav_interface::{DataPacket, DeliveryRecord, Event, EventId, PacketId, Tick};
use crate::uav_stats::{nan_mean, ratio};

/// Penalty multiplier (of the event duration) for events never delivered
pub const DEFAULT_UNDELIVERED_PENALTY: f64 = 1.5;

/// Statistics derived from the raw log
///
/// `None` marks a statistic that is undefined for this run (no deliveries,
/// no generated data packets, ...).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DerivedStatistics {
    pub number_of_generated_events: usize,

    /// Distinct events referenced by at least one created packet
    pub number_of_detected_events: usize,

    /// Events no drone could listen to
    pub number_of_not_generated_events: usize,

    /// Distinct events with at least one delivery
    pub number_of_events_to_depot: usize,

    /// Delivered packet instances (duplicates included)
    pub number_of_packets_to_depot: usize,

    pub all_data_packets_in_simulation: u64,
    pub all_control_packets_in_simulation: u64,

    /// Seconds between packet creation and delivery, averaged over deliveries
    pub packet_mean_delivery_time: Option<f64>,

    /// Seconds between event creation and its fastest delivery, averaged over
    /// delivered events
    pub event_mean_delivery_time: Option<f64>,

    /// Fastest delivery latency (ticks) per delivered event, in first-arrival order
    pub events_delivery_times: Vec<Tick>,

    /// Delivered packets per simulated second
    pub throughput: Option<f64>,

    pub packet_delivery_ratio: Option<f64>,

    pub mean_number_of_relays: Option<f64>,
}

/// Owns the event/packet log of one simulation run
#[derive(Clone, Debug, PartialEq)]
pub struct MetricsCollector {
    pub(crate) mission_setup: MissionSetup,

    /// Candidate relay counts observed at forwarding decisions
    pub(crate) relay_opportunities: Vec<usize>,

    pub(crate) events: IndexMap<EventId, Event>,
    pub(crate) missed_events: IndexMap<EventId, Event>,

    /// Every packet created by any drone, delivered or not
    pub(crate) packets: IndexMap<PacketId, DataPacket>,

    /// Depot arrivals in arrival order
    pub(crate) deliveries: Vec<DeliveryRecord>,
    delivered: HashSet<(PacketId, Tick)>,

    pub(crate) all_control_packets: u64,
    pub(crate) all_data_packets: u64,

    /// Ticks spent on the sensing mission
    pub(crate) time_on_mission: u64,
    pub(crate) time_on_active_routing: u64,

    pub(crate) derived: Option<DerivedStatistics>,
}

impl MetricsCollector {
    /// Create a collector for a run, capturing its mission setup
    ///
    /// The setup is copied once and never changes afterwards.
    pub fn new(mission_setup: MissionSetup) -> Self {
        Self {
            mission_setup,
            relay_opportunities: Vec::new(),
            events: IndexMap::new(),
            missed_events: IndexMap::new(),
            packets: IndexMap::new(),
            deliveries: Vec::new(),
            delivered: HashSet::new(),
            all_control_packets: 0,
            all_data_packets: 0,
            time_on_mission: 0,
            time_on_active_routing: 0,
            derived: None,
        }
    }

    pub fn mission_setup(&self) -> &MissionSetup {
        &self.mission_setup
    }

    // ------------------------------------------------------------------------
    // Recording
    // ------------------------------------------------------------------------

    /// Number of candidate relays a drone saw when it had to forward
    pub fn record_relay_opportunity(&mut self, count: usize) {
        self.relay_opportunities.push(count);
    }

    pub fn record_event(&mut self, event: Event) {
        self.events.entry(event.identifier).or_insert(event);
    }

    /// Event that happened while no drone was able to listen
    pub fn record_missed_event(&mut self, event: Event) {
        self.missed_events.entry(event.identifier).or_insert(event);
    }

    pub fn record_packet(&mut self, packet: DataPacket) {
        self.packets.entry(packet.identifier).or_insert(packet);
    }

    /// A packet instance reached the depot at `tick`
    ///
    /// Different copies of the same event are all kept. Re-recording the exact
    /// same packet at the same tick is ignored.
    ///
    /// # Panics
    /// If the packet predates its event or arrives before it was created.
    pub fn record_delivery(&mut self, packet: DataPacket, tick: Tick) {
        assert!(
            packet.creation_tick >= packet.event.creation_tick,
            "packet {} created at tick {} before its event {} (tick {})",
            packet.identifier,
            packet.creation_tick,
            packet.event.identifier,
            packet.event.creation_tick
        );
        assert!(
            tick >= packet.creation_tick,
            "packet {} delivered at tick {} before its creation at tick {}",
            packet.identifier,
            tick,
            packet.creation_tick
        );

        if !self.delivered.insert((packet.identifier, tick)) {
            debug!(
                "ignoring repeated delivery of packet {} at tick {}",
                packet.identifier, tick
            );
            return;
        }

        self.deliveries.push(DeliveryRecord {
            packet,
            delivery_tick: tick,
        });
    }

    pub fn count_control_packet(&mut self) {
        self.all_control_packets += 1;
    }

    pub fn count_data_packet(&mut self) {
        self.all_data_packets += 1;
    }

    pub fn record_mission_tick(&mut self) {
        self.time_on_mission += 1;
    }

    pub fn record_active_routing_tick(&mut self) {
        self.time_on_active_routing += 1;
    }

    // ------------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------------

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    pub fn missed_events(&self) -> impl Iterator<Item = &Event> {
        self.missed_events.values()
    }

    pub fn packets(&self) -> impl Iterator<Item = &DataPacket> {
        self.packets.values()
    }

    /// Deliveries in depot arrival order
    pub fn deliveries(&self) -> &[DeliveryRecord] {
        &self.deliveries
    }

    pub fn relay_opportunities(&self) -> &[usize] {
        &self.relay_opportunities
    }

    pub fn time_on_mission(&self) -> u64 {
        self.time_on_mission
    }

    pub fn time_on_active_routing(&self) -> u64 {
        self.time_on_active_routing
    }

    /// Last computed statistics, if any
    pub fn derived(&self) -> Option<&DerivedStatistics> {
        self.derived.as_ref()
    }

    // ------------------------------------------------------------------------
    // Statistics
    // ------------------------------------------------------------------------

    /// Fastest delivery latency (ticks) of every delivered event
    fn best_event_latencies(&self) -> IndexMap<EventId, Tick> {
        let mut best: IndexMap<EventId, Tick> = IndexMap::new();
        for record in &self.deliveries {
            let latency = record.event_latency();
            best.entry(record.packet.event.identifier)
                .and_modify(|b| *b = (*b).min(latency))
                .or_insert(latency);
        }
        best
    }

    /// Events without a single delivery
    ///
    /// # Panics
    /// If an event was delivered that is not in the event log.
    fn not_delivered_events(&self, delivered: &IndexMap<EventId, Tick>) -> usize {
        for event_id in delivered.keys() {
            assert!(
                self.events.contains_key(event_id),
                "event {} was delivered but never recorded as generated",
                event_id
            );
        }
        self.events.len() - delivered.len()
    }

    /// Mean per-event delay of the run, lower is better
    ///
    /// Each delivered event contributes its fastest delivery latency; each
    /// undelivered event contributes `undelivered_penalty * event_duration`.
    /// NaN contributions are left out of the mean.
    ///
    /// Returns `None` if no event was recorded.
    pub fn score(&self, undelivered_penalty: f64) -> Option<f64> {
        if self.events.is_empty() {
            return None;
        }

        let best = self.best_event_latencies();
        let not_delivered = self.not_delivered_events(&best);
        let penalty = undelivered_penalty * self.mission_setup.event_duration as f64;

        nan_mean(
            best.values()
                .map(|&latency| latency as f64)
                .chain(std::iter::repeat(penalty).take(not_delivered)),
        )
    }

    /// Recompute all statistics from the raw log and cache them
    pub fn compute_derived_statistics(&mut self) -> &DerivedStatistics {
        let best = self.best_event_latencies();
        self.not_delivered_events(&best);

        let detected: HashSet<EventId> = self
            .packets
            .values()
            .map(|p| p.event.identifier)
            .collect();

        let tick_seconds = self.mission_setup.time_step_duration;
        let packets_to_depot = self.deliveries.len();

        let packet_mean_delivery_time =
            nan_mean(self.deliveries.iter().map(|d| d.packet_latency() as f64))
                .map(|mean| mean * tick_seconds);
        let event_mean_delivery_time =
            nan_mean(best.values().map(|&latency| latency as f64)).map(|mean| mean * tick_seconds);

        let stats = DerivedStatistics {
            number_of_generated_events: self.events.len(),
            number_of_detected_events: detected.len(),
            number_of_not_generated_events: self.missed_events.len(),
            number_of_events_to_depot: best.len(),
            number_of_packets_to_depot: packets_to_depot,
            all_data_packets_in_simulation: self.all_data_packets,
            all_control_packets_in_simulation: self.all_control_packets,
            packet_mean_delivery_time,
            event_mean_delivery_time,
            events_delivery_times: best.values().copied().collect(),
            throughput: ratio(packets_to_depot as f64, self.mission_setup.mission_seconds()),
            packet_delivery_ratio: ratio(packets_to_depot as f64, self.all_data_packets as f64),
            mean_number_of_relays: nan_mean(self.relay_opportunities.iter().map(|&c| c as f64)),
        };

        self.derived.insert(stats)
    }

    /// Print the overall statistics of the run to the console
    pub fn print_summary(&mut self) {
        let stats = self.compute_derived_statistics().clone();

        println!("\n╔════════════════════════════════════════════════════════╗");
        println!("║        UAV Delivery Metrics                            ║");
        println!("╚════════════════════════════════════════════════════════╝\n");

        println!(
            "Mission: {} drones, {} ticks, routing {}",
            self.mission_setup.n_drones,
            self.mission_setup.len_simulation,
            self.mission_setup.routing_algorithm
        );
        println!();

        println!("═══ Relays ═══");
        println!("  Mean number of relays: {}", fmt_statistic(stats.mean_number_of_relays));
        println!();

        println!("═══ Events ═══");
        println!("  Generated: {}", stats.number_of_generated_events);
        println!("  Detected: {}", stats.number_of_detected_events);
        println!("  Not listened: {}", stats.number_of_not_generated_events);
        println!("  Delivered to depot: {}", stats.number_of_events_to_depot);
        println!(
            "  Mean delivery time (s): {}",
            fmt_statistic(stats.event_mean_delivery_time)
        );
        if let Some(score) = self.score(DEFAULT_UNDELIVERED_PENALTY) {
            println!("  Score: {:.2}", score);
        }
        println!();

        println!("═══ Packets ═══");
        println!("  Control packets: {}", stats.all_control_packets_in_simulation);
        println!("  Data packets: {}", stats.all_data_packets_in_simulation);
        println!("  Delivered to depot: {}", stats.number_of_packets_to_depot);
        println!(
            "  Mean delivery time (s): {}",
            fmt_statistic(stats.packet_mean_delivery_time)
        );
        println!("  Delivery ratio: {}", fmt_statistic(stats.packet_delivery_ratio));
        println!("  Throughput (pkt/s): {}", fmt_statistic(stats.throughput));
        println!();
    }

    pub(crate) fn rebuild_delivery_set(&mut self) {
        self.delivered = self
            .deliveries
            .iter()
            .map(|d| (d.packet.identifier, d.delivery_tick))
            .collect();
    }
}

fn fmt_statistic(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.3}", v),
        None => "NaN".to_string(),
    }
}
