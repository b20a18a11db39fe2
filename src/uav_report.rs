//! Flattened run report
//!
//! `export_summary` combines the mission setup, the derived statistics and the
//! full raw log into one serializable structure; `export_json` writes it as a
//! JSON document. Undefined statistics are written as the string `"NaN"`, so
//! a run without deliveries still produces a valid document.

use std::path::Path;

use log::info;
use serde::{Serialize, Serializer};

use crate::uav_config::MissionSetup;
use crate::uav_error::MetricsResult;
use crate::uav_interface::{DataPacket, Event, EventId, NodeId, PacketId, Tick};
use crate::uav_metrics::MetricsCollector;
use crate::uav_snapshot::write_atomically;

/// Textual token for an undefined statistic
pub const NAN_TOKEN: &str = "NaN";

fn statistic<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) if v.is_finite() => serializer.serialize_f64(*v),
        _ => serializer.serialize_str(NAN_TOKEN),
    }
}

/// Event as a flat record
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlatEvent {
    pub identifier: EventId,
    pub coord_x: f64,
    pub coord_y: f64,
    pub creation_tick: Tick,
    pub deadline: Tick,
}

impl From<&Event> for FlatEvent {
    fn from(event: &Event) -> Self {
        Self {
            identifier: event.identifier,
            coord_x: event.coords.x,
            coord_y: event.coords.y,
            creation_tick: event.creation_tick,
            deadline: event.deadline,
        }
    }
}

/// Packet as a flat record, with its event inlined by id and creation tick
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlatPacket {
    pub identifier: PacketId,
    pub creation_tick: Tick,
    pub source: NodeId,
    pub ttl: Tick,
    pub event_identifier: EventId,
    pub event_creation_tick: Tick,
}

impl From<&DataPacket> for FlatPacket {
    fn from(packet: &DataPacket) -> Self {
        Self {
            identifier: packet.identifier,
            creation_tick: packet.creation_tick,
            source: packet.source,
            ttl: packet.ttl,
            event_identifier: packet.event.identifier,
            event_creation_tick: packet.event.creation_tick,
        }
    }
}

/// Mission setup as reported, including the active routing time of the run
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReportedMissionSetup {
    #[serde(flatten)]
    pub setup: MissionSetup,
    pub time_on_active_routing: u64,
}

/// Complete flattened report of a run
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricsReport {
    pub mission_setup: ReportedMissionSetup,
    pub number_of_generated_events: usize,
    pub number_of_detected_events: usize,
    pub number_of_not_generated_events: usize,
    #[serde(serialize_with = "statistic")]
    pub throughput: Option<f64>,
    pub number_of_events_to_depot: usize,
    pub number_of_packets_to_depot: usize,
    #[serde(serialize_with = "statistic")]
    pub packet_mean_delivery_time: Option<f64>,
    #[serde(serialize_with = "statistic")]
    pub event_mean_delivery_time: Option<f64>,
    pub time_on_mission: u64,
    #[serde(serialize_with = "statistic")]
    pub packet_delivery_ratio: Option<f64>,
    pub all_control_packets_in_simulation: u64,
    pub all_data_packets_in_simulation: u64,
    pub all_events: Vec<FlatEvent>,
    pub not_listened_events: Vec<FlatEvent>,
    pub events_delivery_times: Vec<String>,
    pub drones_packets: Vec<FlatPacket>,
    pub drones_to_depot_packets: Vec<(FlatPacket, Tick)>,
    #[serde(serialize_with = "statistic")]
    pub mean_number_of_relays: Option<f64>,
}

impl MetricsCollector {
    /// Build the flattened report, recomputing the statistics first
    pub fn export_summary(&mut self) -> MetricsReport {
        let stats = self.compute_derived_statistics().clone();

        MetricsReport {
            mission_setup: ReportedMissionSetup {
                setup: self.mission_setup.clone(),
                time_on_active_routing: self.time_on_active_routing,
            },
            number_of_generated_events: stats.number_of_generated_events,
            number_of_detected_events: stats.number_of_detected_events,
            number_of_not_generated_events: stats.number_of_not_generated_events,
            throughput: stats.throughput,
            number_of_events_to_depot: stats.number_of_events_to_depot,
            number_of_packets_to_depot: stats.number_of_packets_to_depot,
            packet_mean_delivery_time: stats.packet_mean_delivery_time,
            event_mean_delivery_time: stats.event_mean_delivery_time,
            time_on_mission: self.time_on_mission,
            packet_delivery_ratio: stats.packet_delivery_ratio,
            all_control_packets_in_simulation: stats.all_control_packets_in_simulation,
            all_data_packets_in_simulation: stats.all_data_packets_in_simulation,
            all_events: self.events().map(FlatEvent::from).collect(),
            not_listened_events: self.missed_events().map(FlatEvent::from).collect(),
            events_delivery_times: stats
                .events_delivery_times
                .iter()
                .map(|t| t.to_string())
                .collect(),
            drones_packets: self.packets().map(FlatPacket::from).collect(),
            drones_to_depot_packets: self
                .deliveries()
                .iter()
                .map(|d| (FlatPacket::from(&d.packet), d.delivery_tick))
                .collect(),
            mean_number_of_relays: stats.mean_number_of_relays,
        }
    }

    /// Write the report as JSON to `path`
    pub fn export_json(&mut self, path: impl AsRef<Path>) -> MetricsResult<()> {
        let path = path.as_ref();
        let report = self.export_summary();
        let json = serde_json::to_vec(&report)?;

        write_atomically(path, &json)?;

        info!("exported metrics report to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uav_interface::Position;
    use serde_json::Value;

    fn read_json(path: &Path) -> Value {
        let content = std::fs::read_to_string(path).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    #[test]
    fn test_empty_run_exports_nan_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        let mut metrics = MetricsCollector::new(MissionSetup::default());
        metrics.export_json(&path).unwrap();

        let json = read_json(&path);
        assert_eq!(json["packet_delivery_ratio"], NAN_TOKEN);
        assert_eq!(json["packet_mean_delivery_time"], NAN_TOKEN);
        assert_eq!(json["event_mean_delivery_time"], NAN_TOKEN);
        assert_eq!(json["mean_number_of_relays"], NAN_TOKEN);
        assert_eq!(json["number_of_packets_to_depot"], 0);
        assert!(json["all_events"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_report_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        let mut metrics = MetricsCollector::new(MissionSetup {
            len_simulation: 10,
            time_step_duration: 1.0,
            routing_algorithm: "RND".to_string(),
            ..Default::default()
        });
        let ev = Event::new(1, Position::new(5.0, 6.0), 2, 50);
        let p = DataPacket::new(3, 4, ev, 9, 100);
        metrics.record_event(ev);
        metrics.record_packet(p);
        metrics.count_data_packet();
        metrics.record_delivery(p, 8);
        metrics.record_active_routing_tick();
        metrics.record_relay_opportunity(2);

        metrics.export_json(&path).unwrap();
        let json = read_json(&path);

        assert_eq!(json["mission_setup"]["routing_algorithm"], "RND");
        assert_eq!(json["mission_setup"]["time_on_active_routing"], 1);
        assert_eq!(json["mission_setup"]["depot_coordinates"]["x"], 750.0);
        assert_eq!(json["number_of_generated_events"], 1);
        assert_eq!(json["number_of_events_to_depot"], 1);
        assert_eq!(json["packet_delivery_ratio"], 1.0);
        assert_eq!(json["throughput"], 0.1);
        assert_eq!(json["events_delivery_times"][0], "6");
        assert_eq!(json["all_events"][0]["coord_x"], 5.0);
        assert_eq!(json["drones_packets"][0]["source"], 9);
        assert_eq!(json["drones_to_depot_packets"][0][0]["identifier"], 3);
        assert_eq!(json["drones_to_depot_packets"][0][1], 8);
        assert_eq!(json["mean_number_of_relays"], 2.0);
    }

    #[test]
    fn test_export_summary_computes_statistics() {
        let mut metrics = MetricsCollector::new(MissionSetup::default());
        assert!(metrics.derived().is_none());

        let report = metrics.export_summary();
        assert!(metrics.derived().is_some());
        assert_eq!(report.packet_delivery_ratio, None);
    }

    #[test]
    fn test_export_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.json");

        let mut metrics = MetricsCollector::new(MissionSetup::default());
        assert!(metrics.export_json(&path).is_err());
        assert!(!path.exists());
    }
}
