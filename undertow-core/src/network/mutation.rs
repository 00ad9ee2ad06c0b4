//! Live link-cost churn

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::Network;
use crate::events::{RouteEvent, RouteObserver};
use crate::routing::{Cost, RoutingError};
use crate::topology::EdgeKey;

/// Inclusive range of link costs a mutation may pick from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostRange {
    lo: Cost,
    hi: Cost,
}

impl CostRange {
    /// Creates a range of finite positive costs.
    ///
    /// # Errors
    /// - `RoutingError::InvalidCostRange` - `lo` is zero, `lo > hi`, or `hi` is the infinite sentinel
    pub fn new(lo: u32, hi: u32) -> Result<Self, RoutingError> {
        if lo == 0 || lo > hi || Cost::new(hi).is_infinite() {
            return Err(RoutingError::InvalidCostRange { lo, hi });
        }
        Ok(Self {
            lo: Cost::new(lo),
            hi: Cost::new(hi),
        })
    }

    pub fn lo(&self) -> Cost {
        self.lo
    }

    pub fn hi(&self) -> Cost {
        self.hi
    }

    /// Returns true if `cost` lies within the range.
    pub fn contains(&self, cost: Cost) -> bool {
        self.lo <= cost && cost <= self.hi
    }
}

impl Default for CostRange {
    fn default() -> Self {
        Self {
            lo: Cost::new(1),
            hi: Cost::new(200),
        }
    }
}

/// Applied link cost change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCostChange {
    pub edge: EdgeKey,
    pub old_cost: Cost,
    pub new_cost: Cost,
}

/// Changes link costs on a running network.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkCostMutator {
    range: CostRange,
}

impl LinkCostMutator {
    pub fn new(range: CostRange) -> Self {
        Self { range }
    }

    pub fn range(&self) -> CostRange {
        self.range
    }

    /// Picks one link uniformly at random.
    ///
    /// # Errors
    /// - `RoutingError::NoEdges` - The network has no links
    pub fn pick_random_edge<R: Rng>(
        &self,
        network: &Network,
        rng: &mut R,
    ) -> Result<EdgeKey, RoutingError> {
        let count = network.edge_count();
        if count == 0 {
            return Err(RoutingError::NoEdges);
        }
        let index = rng.random_range(0..count);
        network
            .edges()
            .nth(index)
            .map(|edge| edge.key)
            .ok_or(RoutingError::NoEdges)
    }

    /// Picks a cost from the range uniformly, excluding `current`.
    ///
    /// Draws from one fewer value and skips over `current`, so a single draw
    /// always suffices.
    ///
    /// # Errors
    /// - `RoutingError::NoAlternativeCost` - The range holds only `current`
    pub fn pick_new_cost<R: Rng>(&self, current: Cost, rng: &mut R) -> Result<Cost, RoutingError> {
        let lo = self.range.lo.as_u32();
        let hi = self.range.hi.as_u32();

        if !self.range.contains(current) {
            return Ok(Cost::new(rng.random_range(lo..=hi)));
        }
        if lo == hi {
            return Err(RoutingError::NoAlternativeCost {
                lo: self.range.lo,
                hi: self.range.hi,
                current,
            });
        }

        let drawn = rng.random_range(lo..hi);
        let value = if drawn >= current.as_u32() {
            drawn + 1
        } else {
            drawn
        };
        Ok(Cost::new(value))
    }

    /// Sets the cost of `edge` to `new_cost` on both endpoints.
    ///
    /// Emits `LINK_COST_CHANGED` followed by a `ROUTE_CHANGED` for every
    /// entry the cascade touched. The network is untouched on error.
    ///
    /// # Errors
    /// - `RoutingError::InvalidCost` - `new_cost` is zero or infinite
    /// - `RoutingError::CostOutOfRange` - `new_cost` is outside the configured range
    /// - `RoutingError::UnknownNode` - An endpoint is not a router
    /// - `RoutingError::NotNeighbors` - The endpoints share no link
    /// - `RoutingError::UnchangedCost` - `new_cost` equals the current cost
    pub fn mutate<O>(
        &self,
        network: &mut Network,
        edge: &EdgeKey,
        new_cost: Cost,
        observer: &mut O,
    ) -> Result<LinkCostChange, RoutingError>
    where
        O: RouteObserver + ?Sized,
    {
        if new_cost == Cost::ZERO || new_cost.is_infinite() {
            return Err(RoutingError::InvalidCost { cost: new_cost });
        }
        if !self.range.contains(new_cost) {
            return Err(RoutingError::CostOutOfRange {
                cost: new_cost,
                lo: self.range.lo,
                hi: self.range.hi,
            });
        }
        let current = network.link_cost(edge.low(), edge.high())?;
        if current == new_cost {
            return Err(RoutingError::UnchangedCost {
                a: edge.low().clone(),
                b: edge.high().clone(),
                cost: current,
            });
        }

        let (old_cost, changes) = network.set_link_cost(edge, new_cost)?;
        tracing::info!("Link {} cost changed: {} -> {}", edge, old_cost, new_cost);

        observer.on_event(&RouteEvent::LinkCostChanged {
            a: edge.low().clone(),
            b: edge.high().clone(),
            old: old_cost,
            new: new_cost,
        });
        for change in changes {
            observer.on_event(&RouteEvent::from(change));
        }

        Ok(LinkCostChange {
            edge: edge.clone(),
            old_cost,
            new_cost,
        })
    }

    /// Picks a random link and a random new cost, then applies it.
    ///
    /// # Errors
    /// - `RoutingError::NoEdges` - The network has no links
    /// - `RoutingError::NoAlternativeCost` - The range holds only the current cost
    pub fn mutate_random<R, O>(
        &self,
        network: &mut Network,
        rng: &mut R,
        observer: &mut O,
    ) -> Result<LinkCostChange, RoutingError>
    where
        R: Rng,
        O: RouteObserver + ?Sized,
    {
        let edge = self.pick_random_edge(network, rng)?;
        let current = network.link_cost(edge.low(), edge.high())?;
        let new_cost = self.pick_new_cost(current, rng)?;
        self.mutate(network, &edge, new_cost, observer)
    }
}
