//! Routing tables, distance vectors and route change records

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

use super::{Cost, NodeId};

/// Best known route to one destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingEntry {
    /// Total path cost, `Cost::INFINITY` when unreachable
    pub cost: Cost,
    /// Neighbor the route leaves through, None when no route is known
    pub next_hop: Option<NodeId>,
}

impl RoutingEntry {
    /// Creates an entry routed through `next_hop`.
    pub fn via(cost: Cost, next_hop: NodeId) -> Self {
        Self {
            cost,
            next_hop: Some(next_hop),
        }
    }

    /// Creates an unreachable entry with no next hop.
    pub fn unreachable() -> Self {
        Self {
            cost: Cost::INFINITY,
            next_hop: None,
        }
    }

    /// Returns true when this entry leaves through `neighbor`.
    pub fn routes_through(&self, neighbor: &NodeId) -> bool {
        self.next_hop.as_ref() == Some(neighbor)
    }
}

/// Destination to route mapping owned by a single router.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoutingTable {
    entries: BTreeMap<NodeId, RoutingEntry>,
}

impl RoutingTable {
    /// Creates an empty routing table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry for `dest`, if the destination is known.
    pub fn get(&self, dest: &NodeId) -> Option<&RoutingEntry> {
        self.entries.get(dest)
    }

    /// Returns the cost to `dest`, infinity for unknown destinations.
    pub fn cost_to(&self, dest: &NodeId) -> Cost {
        self.entries.get(dest).map_or(Cost::INFINITY, |entry| entry.cost)
    }

    /// Replaces the entry for `dest`, returning the previous one.
    pub fn insert(&mut self, dest: NodeId, entry: RoutingEntry) -> Option<RoutingEntry> {
        self.entries.insert(dest, entry)
    }

    /// Iterates entries in destination order.
    pub fn iter(&self) -> btree_map::Iter<'_, NodeId, RoutingEntry> {
        self.entries.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> btree_map::IterMut<'_, NodeId, RoutingEntry> {
        self.entries.iter_mut()
    }

    /// Returns the number of destinations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no destination is known.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Projects the table onto its costs.
    pub fn distance_vector(&self) -> DistanceVector {
        self.entries
            .iter()
            .map(|(dest, entry)| (dest.clone(), entry.cost))
            .collect()
    }
}

impl<'a> IntoIterator for &'a RoutingTable {
    type Item = (&'a NodeId, &'a RoutingEntry);
    type IntoIter = btree_map::Iter<'a, NodeId, RoutingEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Destination to cost mapping announced between neighbors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistanceVector {
    costs: BTreeMap<NodeId, Cost>,
}

impl DistanceVector {
    /// Creates an empty distance vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the advertised cost to `dest`, if present.
    pub fn get(&self, dest: &NodeId) -> Option<Cost> {
        self.costs.get(dest).copied()
    }

    /// Sets the advertised cost to `dest`.
    pub fn insert(&mut self, dest: NodeId, cost: Cost) -> Option<Cost> {
        self.costs.insert(dest, cost)
    }

    /// Iterates (destination, cost) pairs in destination order.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, Cost)> {
        self.costs.iter().map(|(dest, cost)| (dest, *cost))
    }

    /// Returns the number of destinations advertised.
    pub fn len(&self) -> usize {
        self.costs.len()
    }

    /// Returns true when nothing is advertised.
    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }
}

impl FromIterator<(NodeId, Cost)> for DistanceVector {
    fn from_iter<I: IntoIterator<Item = (NodeId, Cost)>>(iter: I) -> Self {
        Self {
            costs: iter.into_iter().collect(),
        }
    }
}

/// One routing table mutation, reported to observers as a route change event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteChange {
    /// Router whose table changed
    pub router: NodeId,
    /// Destination whose entry changed
    pub dest: NodeId,
    pub old_cost: Cost,
    pub new_cost: Cost,
    /// Next hop after the change
    pub next_hop: Option<NodeId>,
}
