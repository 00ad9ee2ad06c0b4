//! Synchronous exchange round
//!
//! Every router computes its announcement for every neighbor first; only then
//! is the whole batch delivered. No router ever sees a vector computed after a
//! relaxation in the same round.

use serde::{Deserialize, Serialize};

use super::Network;
use crate::events::{RouteEvent, RouteObserver};
use crate::routing::{DistanceVector, NodeId};

/// One distance vector in flight from `sender` to `receiver`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub sender: NodeId,
    pub receiver: NodeId,
    pub vector: DistanceVector,
}

/// Result of a single exchange round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    /// Network-wide round number, starting at 1
    pub round: u64,
    pub messages_sent: usize,
    /// Routing entries changed during delivery
    pub routes_changed: usize,
}

impl RoundOutcome {
    /// Returns true if any routing table changed.
    pub fn any_changed(&self) -> bool {
        self.routes_changed > 0
    }
}

impl Network {
    /// Builds the batch of announcements for one round.
    ///
    /// Routers in identifier order, each router's neighbors in identifier
    /// order. Marks every announcement as sent on its sender.
    pub(crate) fn collect_announcements(&mut self) -> Vec<Announcement> {
        let mut batch = Vec::new();
        for (id, router) in self.routers_mut().iter_mut() {
            let neighbors: Vec<NodeId> = router.neighbors().keys().cloned().collect();
            for neighbor in neighbors {
                let vector = router.announce(&neighbor);
                router.record_sent();
                batch.push(Announcement {
                    sender: id.clone(),
                    receiver: neighbor,
                    vector,
                });
            }
        }
        batch
    }

    /// Runs one exchange round and reports every table change to `observer`.
    pub fn exchange_round<O>(&mut self, observer: &mut O) -> RoundOutcome
    where
        O: RouteObserver + ?Sized,
    {
        let round = self.rounds() + 1;
        observer.on_event(&RouteEvent::RoundStart { round });

        let batch = self.collect_announcements();
        let messages_sent = batch.len();
        let mut routes_changed = 0;

        for Announcement {
            sender,
            receiver,
            vector,
        } in batch
        {
            let Some(router) = self.routers_mut().get_mut(&receiver) else {
                continue;
            };
            for change in router.relax(&sender, &vector) {
                routes_changed += 1;
                observer.on_event(&RouteEvent::from(change));
            }
        }

        self.record_round(messages_sent, routes_changed > 0);
        tracing::debug!(
            "Round {}: {} messages, {} route changes",
            round,
            messages_sent,
            routes_changed
        );

        RoundOutcome {
            round,
            messages_sent,
            routes_changed,
        }
    }
}
