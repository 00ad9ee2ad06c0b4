//! Discrete-event driver for a routing simulation.

use std::collections::BinaryHeap;
use std::time::Duration;

use thiserror::Error;
use undertow_core::{
    ConvergenceDetector, ConvergenceStatus, Cost, EdgeKey, LinkCostChange, LinkCostMutator,
    Network, RoundOutcome, RouteObserver, RoutingError, Topology, UndertowConfig,
};

use super::cancellation::CancellationFlag;
use super::clock::{DeterministicClock, DeterministicRng};
use super::events::{ScheduledTick, TickKind};
use super::invariants::{InvariantViolation, RoutingInvariant, default_invariants};
use super::metrics::{MeteredObserver, SimulationMetrics};
use super::report::{RouterReport, SimulationReport, TimedLinkChange};

/// Maximum number of invariant violations kept in the report.
const MAX_RECORDED_VIOLATIONS: usize = 100;

/// Errors that can occur while driving a simulation.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Configuration cannot drive a simulation
    #[error("Invalid simulation configuration: {reason}")]
    InvalidConfiguration {
        /// What is wrong with it
        reason: String,
    },

    /// A routing operation was rejected
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// A tick was scheduled before the current simulated time
    #[error("Cannot move simulated time from {now:?} back to {target:?}")]
    TimeWentBackwards {
        /// Current simulated time
        now: Duration,
        /// Requested time
        target: Duration,
    },

    /// `run` was called on a driver that already produced its report
    #[error("Simulation already finished")]
    AlreadyFinished,
}

/// Result of one exchange tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeTick {
    pub round: RoundOutcome,
    /// Settling pass, run only when the round changed something
    pub settle: Option<ConvergenceStatus>,
}

/// Result of one mutation tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationTick {
    pub change: LinkCostChange,
    /// Round run right after the change, before convergence detection
    pub forced_round: RoundOutcome,
    pub convergence: ConvergenceStatus,
}

/// Drives a network through periodic exchange and link-mutation ticks on a
/// simulated clock.
///
/// Exchange ticks fire every `exchange_interval`, mutation ticks every
/// `mutation_interval`, both at `k × interval` for `k ≥ 1` while the clock is
/// below `duration`. At the same instant the exchange tick runs first.
pub struct SimulationDriver<O> {
    network: Network,
    config: UndertowConfig,
    mutator: LinkCostMutator,
    rng: DeterministicRng,
    clock: DeterministicClock,
    queue: BinaryHeap<ScheduledTick>,
    next_tick_id: u64,
    observer: O,
    invariants: Vec<Box<dyn RoutingInvariant>>,
    cancellation: CancellationFlag,
    metrics: SimulationMetrics,
    link_changes: Vec<TimedLinkChange>,
    violations: Vec<InvariantViolation>,
    finished: bool,
}

impl<O: RouteObserver> SimulationDriver<O> {
    /// Builds the network and prepares a run.
    ///
    /// Without a configured seed one is drawn from the thread RNG and reported.
    ///
    /// # Errors
    /// - `SimulationError::InvalidConfiguration` - Zero duration or interval, bad cost range
    pub fn new(
        topology: &Topology,
        config: UndertowConfig,
        observer: O,
    ) -> Result<Self, SimulationError> {
        config
            .validate()
            .map_err(|e| SimulationError::InvalidConfiguration {
                reason: e.to_string(),
            })?;
        let range = config
            .mutation
            .cost_range()
            .map_err(|e| SimulationError::InvalidConfiguration {
                reason: e.to_string(),
            })?;
        let seed = config.simulation.seed.unwrap_or_else(rand::random);

        Ok(Self {
            network: Network::from_topology(topology),
            config,
            mutator: LinkCostMutator::new(range),
            rng: DeterministicRng::from_seed(seed),
            clock: DeterministicClock::new(),
            queue: BinaryHeap::new(),
            next_tick_id: 0,
            observer,
            invariants: default_invariants(),
            cancellation: CancellationFlag::new(),
            metrics: SimulationMetrics::new(),
            link_changes: Vec::new(),
            violations: Vec::new(),
            finished: false,
        })
    }

    /// Adds an invariant checked after every tick.
    pub fn add_invariant(&mut self, invariant: Box<dyn RoutingInvariant>) {
        self.invariants.push(invariant);
    }

    /// Returns a flag that stops the run at the next tick boundary.
    pub fn cancellation_flag(&self) -> CancellationFlag {
        self.cancellation.clone()
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn config(&self) -> &UndertowConfig {
        &self.config
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Consumes the driver, returning its observer.
    pub fn into_observer(self) -> O {
        self.observer
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Returns the current simulated time.
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Runs one exchange round and, if it changed anything, a short settling pass.
    pub fn trigger_exchange_round(&mut self) -> ExchangeTick {
        let settle_rounds = self.config.convergence.settle_rounds;
        let mut observer = MeteredObserver {
            inner: &mut self.observer,
            metrics: &mut self.metrics,
        };

        let round = self.network.exchange_round(&mut observer);
        let settle = if round.any_changed() {
            Some(ConvergenceDetector::new(settle_rounds).run(&mut self.network, &mut observer))
        } else {
            None
        };

        self.metrics.exchange_ticks += 1;
        ExchangeTick { round, settle }
    }

    /// Changes one link cost, forces a round and reconverges.
    ///
    /// A missing edge is picked uniformly; a missing cost is drawn from the
    /// configured range excluding the current cost.
    ///
    /// # Errors
    /// - `SimulationError::Routing` - The edge or cost was rejected, or no alternative cost exists
    pub fn trigger_link_mutation(
        &mut self,
        edge: Option<EdgeKey>,
        new_cost: Option<Cost>,
    ) -> Result<MutationTick, SimulationError> {
        let edge = match edge {
            Some(edge) => edge,
            None => self.mutator.pick_random_edge(&self.network, &mut self.rng)?,
        };
        let new_cost = match new_cost {
            Some(cost) => cost,
            None => {
                let current = self.network.link_cost(edge.low(), edge.high())?;
                self.mutator.pick_new_cost(current, &mut self.rng)?
            }
        };

        let mutation_rounds = self.config.convergence.mutation_rounds;
        let mut observer = MeteredObserver {
            inner: &mut self.observer,
            metrics: &mut self.metrics,
        };
        let change = self
            .mutator
            .mutate(&mut self.network, &edge, new_cost, &mut observer)?;
        let forced_round = self.network.exchange_round(&mut observer);
        let convergence =
            ConvergenceDetector::new(mutation_rounds).run(&mut self.network, &mut observer);

        self.metrics.mutation_ticks += 1;
        self.link_changes.push(TimedLinkChange {
            at: self.clock.now(),
            change: change.clone(),
        });

        Ok(MutationTick {
            change,
            forced_round,
            convergence,
        })
    }

    /// Runs the schedule to the configured duration or until cancelled, then
    /// a final convergence pass, and reports.
    ///
    /// A mutation tick whose change is rejected (for example a range holding
    /// only the current cost) is skipped with a warning.
    ///
    /// # Errors
    /// - `SimulationError::AlreadyFinished` - The driver already ran
    /// - `SimulationError::TimeWentBackwards` - Scheduling bug
    pub fn run(&mut self) -> Result<SimulationReport, SimulationError> {
        if self.finished {
            return Err(SimulationError::AlreadyFinished);
        }

        let simulation = self.config.simulation.clone();
        self.schedule(simulation.exchange_interval, TickKind::Exchange);
        self.schedule(simulation.mutation_interval, TickKind::Mutation);

        tracing::info!(
            "Simulation started: seed {}, {:.0}s, exchange every {:.0}s, mutation every {:.0}s",
            self.seed(),
            simulation.duration.as_secs_f64(),
            simulation.exchange_interval.as_secs_f64(),
            simulation.mutation_interval.as_secs_f64()
        );

        let mut cancelled = false;
        while let Some(tick) = self.queue.pop() {
            if tick.at >= simulation.duration {
                break;
            }
            if self.cancellation.is_cancelled() {
                tracing::info!("Simulation cancelled at {:.1}s", self.clock.now().as_secs_f64());
                cancelled = true;
                break;
            }

            self.clock.advance_to(tick.at)?;
            tracing::debug!("{} tick at {:.1}s", tick.kind.as_str(), tick.at.as_secs_f64());

            let interval = match tick.kind {
                TickKind::Exchange => {
                    self.trigger_exchange_round();
                    simulation.exchange_interval
                }
                TickKind::Mutation => {
                    match self.trigger_link_mutation(None, None) {
                        Ok(_) => {}
                        Err(SimulationError::Routing(e)) => {
                            tracing::warn!(
                                "Link mutation at {:.1}s skipped: {}",
                                tick.at.as_secs_f64(),
                                e
                            );
                        }
                        Err(e) => return Err(e),
                    }
                    simulation.mutation_interval
                }
            };

            self.check_invariants();
            self.schedule(tick.at + interval, tick.kind);

            if !simulation.tick_delay.is_zero() {
                std::thread::sleep(simulation.tick_delay);
            }
        }
        self.queue.clear();

        if !cancelled {
            self.clock.advance_to(simulation.duration)?;
        }

        let final_rounds = self.config.convergence.final_rounds;
        let mut observer = MeteredObserver {
            inner: &mut self.observer,
            metrics: &mut self.metrics,
        };
        let final_status =
            ConvergenceDetector::new(final_rounds).run(&mut self.network, &mut observer);
        self.check_invariants();
        self.finished = true;

        Ok(self.build_report(final_status, cancelled))
    }

    fn schedule(&mut self, at: Duration, kind: TickKind) {
        self.queue.push(ScheduledTick::new(self.next_tick_id, at, kind));
        self.next_tick_id += 1;
    }

    fn check_invariants(&mut self) {
        let now = self.clock.now();
        for invariant in &self.invariants {
            if let Err(violation) = invariant.check(&self.network, now) {
                tracing::warn!("{}", violation);
                if self.violations.len() < MAX_RECORDED_VIOLATIONS {
                    self.violations.push(violation);
                }
            }
        }
    }

    fn build_report(&self, final_status: ConvergenceStatus, cancelled: bool) -> SimulationReport {
        let routers = self
            .network
            .routers()
            .map(|router| {
                (
                    router.id().clone(),
                    RouterReport {
                        messages: router.message_counts(),
                        table: router.routing_table().clone(),
                    },
                )
            })
            .collect();

        SimulationReport {
            seed: self.seed(),
            simulated_time: self.clock.now(),
            cancelled,
            rounds: self.network.rounds(),
            total_messages: self.network.total_messages(),
            metrics: self.metrics.clone(),
            link_changes: self.link_changes.clone(),
            final_status,
            routers,
            violations: self.violations.clone(),
        }
    }
}
