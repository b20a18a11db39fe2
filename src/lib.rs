//! # uavRust - UAV Delivery Metrics
//!
//! Metrics and routing diagnostics for discrete-event simulations of drone
//! swarms that relay sensed events, as data packets, to a fixed depot.
//!
//! ## Core Components
//!
//! - **MetricsCollector**: Records events, packets and depot deliveries tick by
//!   tick and derives the run statistics (delivery ratio, latencies, throughput,
//!   score)
//! - **Snapshot / Report**: Versioned binary snapshot of a collector, and a
//!   flattened JSON report of a run
//! - **ConsistencyChecker**: Cross-checks acknowledgement traffic and hop counts
//!   against the routing layer's neighbor tables
//!
//! ## Usage with a Simulation Loop
//!
//! The library never drives the simulation. The loop owns one collector (and
//! optionally one checker) per run and feeds them as things happen:
//!
//! ```no_run
//! use uav_rust::{DataPacket, Event, MetricsCollector, MissionSetup, Position};
//!
//! let mut metrics = MetricsCollector::new(MissionSetup::default());
//!
//! let event = Event::new(1, Position::new(100.0, 250.0), 10, 2000);
//! metrics.record_event(event);
//!
//! let packet = DataPacket::new(1, 12, event, 3, 200);
//! metrics.record_packet(packet);
//! metrics.count_data_packet();
//! metrics.record_delivery(packet, 40);
//!
//! let score = metrics.score(uav_rust::DEFAULT_UNDELIVERED_PENALTY);
//! metrics.export_json("run.json")?;
//! metrics.persist("run.snapshot")?;
//! # Ok::<(), uav_rust::MetricsError>(())
//! ```
//!
//! ## Synthetic Scenarios
//!
//! For exercising the library without a full simulator, see the
//! `scenario_runner` binary in `simulator/`. It generates a seeded synthetic
//! workload from a YAML scenario and reports on it.

pub mod uav_config;
pub mod uav_consistency;
pub mod uav_error;
pub mod uav_interface;
pub mod uav_metrics;
pub mod uav_report;
pub mod uav_snapshot;
pub mod uav_stats;

// Re-export commonly used types
pub use uav_config::MissionSetup;
pub use uav_consistency::ConsistencyChecker;
pub use uav_error::{MetricsError, MetricsResult};
pub use uav_interface::{
    Ack, DataPacket, DeliveryRecord, DepotState, DepotTable, DroneState, Event, EventId,
    NeighborEntry, NeighborTable, NodeId, NodeInfo, PacketId, Position, Tick,
};
pub use uav_metrics::{DerivedStatistics, MetricsCollector, DEFAULT_UNDELIVERED_PENALTY};
pub use uav_report::{MetricsReport, NAN_TOKEN};
