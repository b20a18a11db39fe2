use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// all identifiers share one numeric type to allow casting/interop
pub type NodeId = u64;
pub type EventId = u64;
pub type PacketId = u64;

/// Simulation time step counter
pub type Tick = u64;

/// Point in the simulated environment (meters)
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

// ============================================================================
// Event / Packet Log Entries
// ============================================================================

/// An environmental occurrence sensed by zero or more drones
///
/// Immutable once created. Packets carry a copy, so the event is always
/// identified by `identifier`, never by object identity.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub identifier: EventId,
    pub coords: Position,
    pub creation_tick: Tick,
    pub deadline: Tick,
}

impl Event {
    pub fn new(identifier: EventId, coords: Position, creation_tick: Tick, duration: Tick) -> Self {
        Self {
            identifier,
            coords,
            creation_tick,
            deadline: creation_tick + duration,
        }
    }

    pub fn is_expired(&self, tick: Tick) -> bool {
        tick > self.deadline
    }
}

/// A data packet reporting an event towards the depot
///
/// Relays may copy a packet; copies get their own `identifier` but keep the
/// originating event.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataPacket {
    pub identifier: PacketId,
    pub creation_tick: Tick,
    pub event: Event,
    pub source: NodeId,
    pub ttl: Tick,
}

impl DataPacket {
    pub fn new(identifier: PacketId, creation_tick: Tick, event: Event, source: NodeId, ttl: Tick) -> Self {
        Self {
            identifier,
            creation_tick,
            event,
            source,
            ttl,
        }
    }
}

/// A packet instance that reached the depot, with its arrival tick
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub packet: DataPacket,
    pub delivery_tick: Tick,
}

impl DeliveryRecord {
    /// Ticks between packet creation and arrival
    pub fn packet_latency(&self) -> Tick {
        self.delivery_tick - self.packet.creation_tick
    }

    /// Ticks between the event happening and this copy arriving
    pub fn event_latency(&self) -> Tick {
        self.delivery_tick - self.packet.event.creation_tick
    }
}

/// Acknowledgement issued by `sender` to its parent node
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Ack {
    pub sender: NodeId,
    pub tick: Tick,
}

// ============================================================================
// Routing State (read-only views supplied by the simulation)
// ============================================================================

/// One entry of a drone's neighbor table
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NeighborEntry {
    pub node: NodeId,
    pub hop_count: u32,
    pub last_update: Tick,
}

/// A drone's list of currently reachable neighbors
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NeighborTable {
    pub entries: Vec<NeighborEntry>,
}

impl NeighborTable {
    pub fn new(entries: Vec<NeighborEntry>) -> Self {
        Self { entries }
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.iter().map(|e| e.node)
    }
}

/// Routing metadata the depot keeps per known node
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NodeInfo {
    pub hop_count: u32,
    pub last_update: Tick,
}

/// The depot's table: node-id -> metadata
pub type DepotTable = BTreeMap<NodeId, NodeInfo>;

/// Snapshot of a drone's routing-relevant state
#[derive(Clone, Debug, PartialEq)]
pub struct DroneState {
    pub identifier: NodeId,
    pub coords: Position,
    pub hop_from_depot: u32,
    pub neighbor_table: NeighborTable,
}

/// Snapshot of the depot's routing-relevant state
#[derive(Clone, Debug, PartialEq)]
pub struct DepotState {
    pub identifier: NodeId,
    pub coords: Position,
    pub communication_range: f64,
    pub nodes_table: DepotTable,
}
