// Metrics snapshot persistence
//
// Layout of a snapshot file:
// - 4 bytes magic "UAVM"
// - u16 little-endian schema version
// - bincode encoded `SnapshotRecord`
//
// The record is an explicit schema, decoupled from the in-memory collector,
// so the in-memory layout can change without breaking old files. Bump
// SNAPSHOT_VERSION whenever the record changes.

use std::fs;
use std::io::Write;
use std::path::Path;

use bincode::Options;
use hashbrown::HashSet;
use log::info;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::uav_config::MissionSetup;
use crate::uav_error::{MetricsError, MetricsResult};
use crate::uav_interface::{DataPacket, DeliveryRecord, Event, EventId};
use crate::uav_metrics::{DerivedStatistics, MetricsCollector};

pub const SNAPSHOT_MAGIC: [u8; 4] = *b"UAVM";
pub const SNAPSHOT_VERSION: u16 = 1;

const HEADER_LEN: usize = SNAPSHOT_MAGIC.len() + 2;

/// Version 1 snapshot record
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotRecord {
    mission_setup: MissionSetup,
    relay_opportunities: Vec<usize>,
    events: Vec<Event>,
    missed_events: Vec<Event>,
    packets: Vec<DataPacket>,
    deliveries: Vec<DeliveryRecord>,
    all_control_packets: u64,
    all_data_packets: u64,
    time_on_mission: u64,
    time_on_active_routing: u64,
    derived: Option<DerivedStatistics>,
}

impl SnapshotRecord {
    fn from_collector(metrics: &MetricsCollector) -> Self {
        Self {
            mission_setup: metrics.mission_setup.clone(),
            relay_opportunities: metrics.relay_opportunities.clone(),
            events: metrics.events.values().copied().collect(),
            missed_events: metrics.missed_events.values().copied().collect(),
            packets: metrics.packets.values().copied().collect(),
            deliveries: metrics.deliveries.clone(),
            all_control_packets: metrics.all_control_packets,
            all_data_packets: metrics.all_data_packets,
            time_on_mission: metrics.time_on_mission,
            time_on_active_routing: metrics.time_on_active_routing,
            derived: metrics.derived.clone(),
        }
    }

    /// Reject logs that `record_delivery` would never have accepted
    fn validate(&self) -> MetricsResult<()> {
        let known: HashSet<EventId> = self.events.iter().map(|e| e.identifier).collect();

        for record in &self.deliveries {
            let packet = &record.packet;
            if packet.creation_tick < packet.event.creation_tick {
                return Err(MetricsError::Corrupt(format!(
                    "packet {} created at tick {} before its event {} (tick {})",
                    packet.identifier,
                    packet.creation_tick,
                    packet.event.identifier,
                    packet.event.creation_tick
                )));
            }
            if record.delivery_tick < packet.creation_tick {
                return Err(MetricsError::Corrupt(format!(
                    "packet {} delivered at tick {} before its creation at tick {}",
                    packet.identifier, record.delivery_tick, packet.creation_tick
                )));
            }
            if !known.contains(&packet.event.identifier) {
                return Err(MetricsError::Corrupt(format!(
                    "event {} was delivered but never recorded as generated",
                    packet.event.identifier
                )));
            }
        }
        Ok(())
    }

    fn into_collector(self) -> MetricsResult<MetricsCollector> {
        self.validate()?;

        let mut metrics = MetricsCollector::new(self.mission_setup);
        metrics.relay_opportunities = self.relay_opportunities;
        metrics.events = self.events.into_iter().map(|e| (e.identifier, e)).collect();
        metrics.missed_events = self
            .missed_events
            .into_iter()
            .map(|e| (e.identifier, e))
            .collect();
        metrics.packets = self.packets.into_iter().map(|p| (p.identifier, p)).collect();
        metrics.deliveries = self.deliveries;
        metrics.all_control_packets = self.all_control_packets;
        metrics.all_data_packets = self.all_data_packets;
        metrics.time_on_mission = self.time_on_mission;
        metrics.time_on_active_routing = self.time_on_active_routing;
        metrics.derived = self.derived;
        metrics.rebuild_delivery_set();
        Ok(metrics)
    }
}

// Same wire format as `bincode::serialize`, but trailing garbage is an error
fn bincode_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

/// Write `bytes` to `path` through a temporary file in the same directory
///
/// The target is replaced by a rename, so readers see either the old file or
/// the complete new one.
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> MetricsResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| MetricsError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| MetricsError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| MetricsError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| MetricsError::io(path, e.error))?;

    Ok(())
}

impl MetricsCollector {
    /// Save the complete collector state (raw log, mission setup and any
    /// computed statistics) to `path`
    pub fn persist(&self, path: impl AsRef<Path>) -> MetricsResult<()> {
        let path = path.as_ref();
        let record = SnapshotRecord::from_collector(self);

        let mut bytes = Vec::with_capacity(HEADER_LEN);
        bytes.extend_from_slice(&SNAPSHOT_MAGIC);
        bytes.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
        bincode_options().serialize_into(&mut bytes, &record)?;

        write_atomically(path, &bytes)?;

        info!(
            "persisted metrics snapshot to {} ({} bytes, {} events, {} deliveries)",
            path.display(),
            bytes.len(),
            record.events.len(),
            record.deliveries.len()
        );
        Ok(())
    }

    /// Load a collector saved with `persist`
    pub fn load(path: impl AsRef<Path>) -> MetricsResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| MetricsError::io(path, e))?;

        if bytes.len() < HEADER_LEN || bytes[..SNAPSHOT_MAGIC.len()] != SNAPSHOT_MAGIC {
            return Err(MetricsError::BadMagic);
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != SNAPSHOT_VERSION {
            return Err(MetricsError::UnsupportedVersion(version));
        }

        let record: SnapshotRecord = bincode_options().deserialize(&bytes[HEADER_LEN..])?;
        info!(
            "loaded metrics snapshot from {} ({} events, {} deliveries)",
            path.display(),
            record.events.len(),
            record.deliveries.len()
        );

        record.into_collector()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uav_interface::Position;

    fn sample_collector() -> MetricsCollector {
        let mut metrics = MetricsCollector::new(MissionSetup {
            n_drones: 7,
            routing_algorithm: "QL".to_string(),
            ..Default::default()
        });

        let ev_a = Event::new(1, Position::new(10.0, 20.0), 0, 100);
        let ev_b = Event::new(2, Position::new(30.0, 40.0), 5, 100);
        metrics.record_event(ev_a);
        metrics.record_event(ev_b);
        metrics.record_missed_event(Event::new(3, Position::new(1.0, 1.0), 6, 100));

        let p1 = DataPacket::new(10, 1, ev_a, 4, 200);
        let p2 = DataPacket::new(11, 7, ev_b, 5, 200);
        metrics.record_packet(p1);
        metrics.record_packet(p2);
        metrics.count_data_packet();
        metrics.count_data_packet();
        metrics.count_control_packet();
        metrics.record_delivery(p2, 12);
        metrics.record_delivery(p1, 9);
        metrics.record_relay_opportunity(3);
        metrics.record_mission_tick();
        metrics.record_active_routing_tick();
        metrics
    }

    #[test]
    fn test_round_trip_raw_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.snapshot");

        let metrics = sample_collector();
        metrics.persist(&path).unwrap();
        let loaded = MetricsCollector::load(&path).unwrap();

        assert_eq!(loaded, metrics);
        assert!(loaded.derived().is_none());

        // arrival order survives
        let ticks: Vec<_> = loaded.deliveries().iter().map(|d| d.delivery_tick).collect();
        assert_eq!(ticks, vec![12, 9]);
    }

    #[test]
    fn test_round_trip_with_derived_statistics() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.snapshot");

        let mut metrics = sample_collector();
        metrics.compute_derived_statistics();
        metrics.persist(&path).unwrap();

        let loaded = MetricsCollector::load(&path).unwrap();
        assert_eq!(loaded.derived(), metrics.derived());
        assert_eq!(loaded, metrics);
    }

    #[test]
    fn test_loaded_collector_still_ignores_repeated_delivery() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.snapshot");

        let metrics = sample_collector();
        metrics.persist(&path).unwrap();
        let mut loaded = MetricsCollector::load(&path).unwrap();

        let repeated = loaded.deliveries()[0];
        loaded.record_delivery(repeated.packet, repeated.delivery_tick);
        assert_eq!(loaded.deliveries().len(), 2);
    }

    #[test]
    fn test_persist_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.snapshot");

        let mut metrics = sample_collector();
        metrics.persist(&path).unwrap();
        metrics.record_relay_opportunity(9);
        metrics.persist(&path).unwrap();

        let loaded = MetricsCollector::load(&path).unwrap();
        assert_eq!(loaded.relay_opportunities(), &[3, 9]);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = MetricsCollector::load(dir.path().join("absent.snapshot"));
        assert!(matches!(result, Err(MetricsError::Io { .. })));
    }

    #[test]
    fn test_persist_into_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_such_dir").join("run.snapshot");

        let result = sample_collector().persist(&path);
        assert!(matches!(result, Err(MetricsError::Io { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn test_load_rejects_foreign_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foreign.bin");
        fs::write(&path, b"definitely not a snapshot").unwrap();

        assert!(matches!(
            MetricsCollector::load(&path),
            Err(MetricsError::BadMagic)
        ));
    }

    #[test]
    fn test_load_rejects_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.snapshot");

        let mut bytes = SNAPSHOT_MAGIC.to_vec();
        bytes.extend_from_slice(&(SNAPSHOT_VERSION + 1).to_le_bytes());
        fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            MetricsCollector::load(&path),
            Err(MetricsError::UnsupportedVersion(v)) if v == SNAPSHOT_VERSION + 1
        ));
    }

    #[test]
    fn test_load_truncated_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.snapshot");
        sample_collector().persist(&path).unwrap();

        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        assert!(matches!(
            MetricsCollector::load(&path),
            Err(MetricsError::Encode(_))
        ));
    }

    fn write_record(path: &Path, record: &SnapshotRecord) {
        let mut bytes = SNAPSHOT_MAGIC.to_vec();
        bytes.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&bincode_options().serialize(record).unwrap());
        fs::write(path, &bytes).unwrap();
    }

    fn record_with_delivery(event: Event, packet: DataPacket, tick: u64) -> SnapshotRecord {
        SnapshotRecord {
            mission_setup: MissionSetup::default(),
            relay_opportunities: Vec::new(),
            events: vec![event],
            missed_events: Vec::new(),
            packets: vec![packet],
            deliveries: vec![DeliveryRecord {
                packet,
                delivery_tick: tick,
            }],
            all_control_packets: 0,
            all_data_packets: 1,
            time_on_mission: 0,
            time_on_active_routing: 0,
            derived: None,
        }
    }

    #[test]
    fn test_load_rejects_delivery_before_creation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backwards.snapshot");

        let event = Event::new(1, Position::new(0.0, 0.0), 0, 100);
        let packet = DataPacket::new(10, 50, event, 2, 200);
        write_record(&path, &record_with_delivery(event, packet, 20));

        assert!(matches!(
            MetricsCollector::load(&path),
            Err(MetricsError::Corrupt(_))
        ));
    }

    #[test]
    fn test_load_rejects_packet_before_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("early_packet.snapshot");

        let event = Event::new(1, Position::new(0.0, 0.0), 30, 100);
        let packet = DataPacket::new(10, 5, event, 2, 200);
        write_record(&path, &record_with_delivery(event, packet, 40));

        assert!(matches!(
            MetricsCollector::load(&path),
            Err(MetricsError::Corrupt(_))
        ));
    }

    #[test]
    fn test_load_rejects_delivery_of_unknown_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unknown_event.snapshot");

        let event = Event::new(1, Position::new(0.0, 0.0), 0, 100);
        let packet = DataPacket::new(10, 1, event, 2, 200);
        let mut record = record_with_delivery(event, packet, 9);
        record.events.clear();
        write_record(&path, &record);

        assert!(matches!(
            MetricsCollector::load(&path),
            Err(MetricsError::Corrupt(_))
        ));
    }

    #[test]
    fn test_load_rejects_trailing_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.snapshot");
        sample_collector().persist(&path).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        bytes.extend_from_slice(b"GARBAGE");
        fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            MetricsCollector::load(&path),
            Err(MetricsError::Encode(_))
        ));
    }
}
