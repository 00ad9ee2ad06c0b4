//! Per-router state machine: initialization, relaxation, link updates and
//! poison-reverse announcements.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{Cost, DistanceVector, NodeId, RouteChange, RoutingEntry, RoutingTable};

/// Messages a router has exchanged with its neighbors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCounts {
    pub sent: u64,
    pub received: u64,
}

impl MessageCounts {
    /// Returns sent plus received.
    pub fn total(&self) -> u64 {
        self.sent + self.received
    }
}

/// Routing state owned by a single router.
///
/// A router only knows the cost of its direct links. Everything else it
/// learns from distance vectors its neighbors announce, folded in through
/// [`RouterState::relax`].
#[derive(Debug, Clone)]
pub struct RouterState {
    id: NodeId,
    neighbors: BTreeMap<NodeId, Cost>,
    table: RoutingTable,
    messages: MessageCounts,
}

impl RouterState {
    /// Creates a router with no links and an empty table.
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            neighbors: BTreeMap::new(),
            table: RoutingTable::new(),
            messages: MessageCounts::default(),
        }
    }

    /// Creates a router with the given direct links.
    pub fn with_neighbors(id: NodeId, neighbors: impl IntoIterator<Item = (NodeId, Cost)>) -> Self {
        let mut router = Self::new(id);
        router.neighbors.extend(neighbors);
        router
    }

    /// Returns this router's identifier.
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Returns the direct link costs keyed by neighbor.
    pub fn neighbors(&self) -> &BTreeMap<NodeId, Cost> {
        &self.neighbors
    }

    /// Returns the cost of the direct link to `neighbor`.
    pub fn neighbor_cost(&self, neighbor: &NodeId) -> Option<Cost> {
        self.neighbors.get(neighbor).copied()
    }

    /// Returns the routing table.
    pub fn routing_table(&self) -> &RoutingTable {
        &self.table
    }

    /// Returns the cost-only projection of the routing table.
    pub fn distance_vector(&self) -> DistanceVector {
        self.table.distance_vector()
    }

    /// Returns message counters.
    pub fn message_counts(&self) -> MessageCounts {
        self.messages
    }

    pub(crate) fn record_sent(&mut self) {
        self.messages.sent += 1;
    }

    /// Builds the initial table over every router in the network.
    ///
    /// Self is reachable at zero cost, neighbors at their link cost and every
    /// other router is unreachable until an announcement says otherwise.
    pub fn initialize(&mut self, all_nodes: &BTreeSet<NodeId>) {
        self.table.clear();
        self.table
            .insert(self.id.clone(), RoutingEntry::via(Cost::ZERO, self.id.clone()));

        for (neighbor, cost) in &self.neighbors {
            self.table
                .insert(neighbor.clone(), RoutingEntry::via(*cost, neighbor.clone()));
        }

        for node in all_nodes {
            if *node != self.id && !self.neighbors.contains_key(node) {
                self.table.insert(node.clone(), RoutingEntry::unreachable());
            }
        }

        tracing::trace!(
            "Router {} initialized with {} entries",
            self.id,
            self.table.len()
        );
    }

    /// Folds a neighbor's distance vector into this router's table.
    ///
    /// Adopts any strictly cheaper route, and keeps routes already sourced
    /// from `from` in sync with the neighbor's latest cost even when that cost
    /// got worse. Returns every entry that changed; an empty result means the
    /// table is untouched.
    pub fn relax(&mut self, from: &NodeId, received: &DistanceVector) -> Vec<RouteChange> {
        self.messages.received += 1;

        let link_cost = self.neighbors.get(from).copied().unwrap_or(Cost::INFINITY);
        let mut changes = Vec::new();

        for (dest, received_cost) in received.iter() {
            if *dest == self.id {
                continue;
            }

            let candidate = link_cost + received_cost;
            let current = self
                .table
                .get(dest)
                .cloned()
                .unwrap_or_else(RoutingEntry::unreachable);

            let better = candidate < current.cost;
            let upstream_moved = current.routes_through(from) && candidate != current.cost;
            if !better && !upstream_moved {
                continue;
            }

            tracing::trace!(
                "Router {}: route to {} {} -> {} via {}",
                self.id,
                dest,
                current.cost,
                candidate,
                from
            );

            self.table
                .insert(dest.clone(), RoutingEntry::via(candidate, from.clone()));
            changes.push(RouteChange {
                router: self.id.clone(),
                dest: dest.clone(),
                old_cost: current.cost,
                new_cost: candidate,
                next_hop: Some(from.clone()),
            });
        }

        changes
    }

    /// Applies a new direct link cost to `neighbor`.
    ///
    /// The direct route is reset to the new link cost. Destinations currently
    /// routed through `neighbor` are shifted by the cost delta (clamped at
    /// zero) without a full recomputation; the next exchange round corrects
    /// anything this leaves stale.
    pub fn set_neighbor_cost(&mut self, neighbor: &NodeId, new_cost: Cost) -> Vec<RouteChange> {
        let old_link = self
            .neighbors
            .insert(neighbor.clone(), new_cost)
            .unwrap_or(Cost::INFINITY);
        let mut changes = Vec::new();

        let previous = self
            .table
            .insert(neighbor.clone(), RoutingEntry::via(new_cost, neighbor.clone()))
            .unwrap_or_else(RoutingEntry::unreachable);
        if previous.cost != new_cost || !previous.routes_through(neighbor) {
            changes.push(RouteChange {
                router: self.id.clone(),
                dest: neighbor.clone(),
                old_cost: previous.cost,
                new_cost,
                next_hop: Some(neighbor.clone()),
            });
        }

        if old_link.is_infinite() {
            return changes;
        }

        for (dest, entry) in self.table.iter_mut() {
            if dest == neighbor || *dest == self.id || !entry.routes_through(neighbor) {
                continue;
            }
            if entry.cost.is_infinite() {
                continue;
            }

            let shifted = i64::from(new_cost.as_u32()) + i64::from(entry.cost.as_u32())
                - i64::from(old_link.as_u32());
            let extrapolated = Cost::from_i64_clamped(shifted);
            if extrapolated == entry.cost {
                continue;
            }

            changes.push(RouteChange {
                router: self.id.clone(),
                dest: dest.clone(),
                old_cost: entry.cost,
                new_cost: extrapolated,
                next_hop: entry.next_hop.clone(),
            });
            entry.cost = extrapolated;
        }

        tracing::debug!(
            "Router {}: link to {} {} -> {}, {} routes updated",
            self.id,
            neighbor,
            old_link,
            new_cost,
            changes.len()
        );

        changes
    }

    /// Builds the vector announced to `neighbor`.
    ///
    /// Every destination currently reached through `neighbor` is advertised
    /// as unreachable (poison reverse). The self-entry is never poisoned.
    pub fn announce(&self, neighbor: &NodeId) -> DistanceVector {
        self.table
            .iter()
            .map(|(dest, entry)| {
                let cost = if *dest != self.id && entry.routes_through(neighbor) {
                    Cost::INFINITY
                } else {
                    entry.cost
                };
                (dest.clone(), cost)
            })
            .collect()
    }
}
