//! Routing Consistency Checker
//!
//! Debugging aid for the routing layer. It cross-checks acknowledgement traffic
//! recorded during routing against the neighbor tables the nodes end up with,
//! and validates hop counts around the depot.
//!
//! Nothing here is part of the simulated protocol: every check only reads the
//! routing state handed in by the simulation, reports through `log::warn!`, and
//! returns its findings for callers that want them programmatically. Missing
//! entries are an expected steady state and yield empty results.

use std::collections::{BTreeMap, BTreeSet};

use hashbrown::HashMap;
use log::{debug, warn};

use crate::uav_interface::{Ack, DepotState, DroneState, NodeId};

/// Tracks acknowledgements per recipient (the parent node) between resets
#[derive(Debug, Default)]
pub struct ConsistencyChecker {
    sent_acks: HashMap<NodeId, Vec<Ack>>,
}

impl ConsistencyChecker {
    pub fn new() -> Self {
        Self {
            sent_acks: HashMap::new(),
        }
    }

    /// Remember that `ack` was sent to `recipient`
    pub fn record_ack(&mut self, ack: Ack, recipient: NodeId) {
        self.sent_acks.entry(recipient).or_default().push(ack);
    }

    /// Acks recorded for `node` since the last reset, in send order
    pub fn acks_for(&self, node: NodeId) -> &[Ack] {
        self.sent_acks.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Drop all recorded acks
    pub fn reset(&mut self) {
        self.sent_acks.clear();
    }

    fn ack_senders(&self, node: NodeId) -> BTreeSet<NodeId> {
        self.acks_for(node).iter().map(|ack| ack.sender).collect()
    }

    /// Nodes that acknowledged `drone` but are missing from its neighbor table
    pub fn lost_acks_for(&self, drone: &DroneState) -> BTreeSet<NodeId> {
        let neighbors: BTreeSet<NodeId> = drone.neighbor_table.node_ids().collect();
        self.ack_senders(drone.identifier)
            .difference(&neighbors)
            .copied()
            .collect()
    }

    /// Nodes that acknowledged the depot but are missing from its nodes table
    pub fn lost_acks_for_depot(&self, depot: &DepotState) -> BTreeSet<NodeId> {
        let known: BTreeSet<NodeId> = depot.nodes_table.keys().copied().collect();
        self.ack_senders(depot.identifier)
            .difference(&known)
            .copied()
            .collect()
    }

    /// Log every node (depot included) with lost acks
    ///
    /// Returns node -> lost senders, only for nodes with a non-empty set.
    pub fn report_all_lost(
        &self,
        drones: &[DroneState],
        depot: &DepotState,
    ) -> BTreeMap<NodeId, BTreeSet<NodeId>> {
        let mut lost = BTreeMap::new();

        for drone in drones {
            let lost_drones = self.lost_acks_for(drone);
            if !lost_drones.is_empty() {
                warn!("Lost drones for {}: {:?}", drone.identifier, lost_drones);
                lost.insert(drone.identifier, lost_drones);
            }
        }

        let depot_lost = self.lost_acks_for_depot(depot);
        if !depot_lost.is_empty() {
            warn!("Depot lost drones: {:?}", depot_lost);
            lost.insert(depot.identifier, depot_lost);
        }

        lost
    }

    /// Flag drones next to the depot that claim to be more than one hop away
    ///
    /// Only drones the depot knows about and that are within its communication
    /// range are checked. Drones without a state entry are skipped.
    pub fn check_hop_consistency(&self, drones: &[DroneState], depot: &DepotState) -> Vec<NodeId> {
        let by_id: HashMap<NodeId, &DroneState> =
            drones.iter().map(|d| (d.identifier, d)).collect();

        let mut flagged = Vec::new();
        for node in depot.nodes_table.keys() {
            let Some(drone) = by_id.get(node) else {
                debug!("depot table lists {} but no drone state was supplied", node);
                continue;
            };

            let in_range = drone.coords.distance(&depot.coords) <= depot.communication_range;
            if in_range && drone.hop_from_depot > 1 {
                warn!(
                    "drone {} is in the neighborhood of the depot with hop count {}",
                    drone.identifier, drone.hop_from_depot
                );
                flagged.push(drone.identifier);
            }
        }
        flagged
    }

    /// Flag depot table entries with a hop count above one
    pub fn check_depot_table_consistency(&self, depot: &DepotState) -> Vec<NodeId> {
        let flagged: Vec<NodeId> = depot
            .nodes_table
            .iter()
            .filter(|(_, info)| info.hop_count > 1)
            .map(|(node, _)| *node)
            .collect();

        if !flagged.is_empty() {
            warn!("Depot neighbors: {:?}", depot.nodes_table);
        }
        flagged
    }
}
