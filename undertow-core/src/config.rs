//! Centralized configuration for Undertow.
//!
//! Simulation timing, convergence bounds and link-cost churn are all tunable
//! here instead of being hard-coded in the driver.

use std::time::Duration;

use crate::UndertowError;
use crate::network::CostRange;

/// Central configuration for all Undertow components.
///
/// Groups related settings into sections. Supports environment variable
/// overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct UndertowConfig {
    pub simulation: SimulationConfig,
    pub convergence: ConvergenceConfig,
    pub mutation: MutationConfig,
}

/// Simulated time and scheduling.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Total simulated time
    pub duration: Duration,
    /// Period of the exchange tick
    pub exchange_interval: Duration,
    /// Period of the link-cost mutation tick
    pub mutation_interval: Duration,
    /// Seed for link and cost selection (None = drawn at startup)
    pub seed: Option<u64>,
    /// Wall-clock pause after each tick, for watching a run live
    pub tick_delay: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(90),
            exchange_interval: Duration::from_secs(5),
            mutation_interval: Duration::from_secs(30),
            seed: None,
            tick_delay: Duration::ZERO,
        }
    }
}

/// Round bounds for the convergence detector at each point of a run.
#[derive(Debug, Clone)]
pub struct ConvergenceConfig {
    /// Bound after an exchange tick that changed something
    pub settle_rounds: usize,
    /// Bound after a link-cost mutation and its forced round
    pub mutation_rounds: usize,
    /// Bound for the pass that runs before the final report
    pub final_rounds: usize,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            settle_rounds: 3,
            mutation_rounds: 10,
            final_rounds: 50,
        }
    }
}

/// Link-cost churn.
#[derive(Debug, Clone)]
pub struct MutationConfig {
    /// Smallest cost a mutation may pick
    pub min_cost: u32,
    /// Largest cost a mutation may pick
    pub max_cost: u32,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            min_cost: 1,
            max_cost: 200,
        }
    }
}

impl MutationConfig {
    /// Builds the validated cost range.
    ///
    /// # Errors
    /// - `UndertowError::Routing` - Bounds are zero, inverted or not finite
    pub fn cost_range(&self) -> Result<CostRange, UndertowError> {
        Ok(CostRange::new(self.min_cost, self.max_cost)?)
    }
}

impl UndertowConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Unparseable values are ignored and the default is kept.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(seed) = std::env::var("UNDERTOW_SEED") {
            if let Ok(seed_value) = seed.parse::<u64>() {
                config.simulation.seed = Some(seed_value);
            }
        }

        if let Ok(duration) = std::env::var("UNDERTOW_DURATION_SECS") {
            if let Ok(seconds) = duration.parse::<u64>() {
                config.simulation.duration = Duration::from_secs(seconds);
            }
        }

        if let Ok(interval) = std::env::var("UNDERTOW_EXCHANGE_INTERVAL_SECS") {
            if let Ok(seconds) = interval.parse::<u64>() {
                config.simulation.exchange_interval = Duration::from_secs(seconds);
            }
        }

        if let Ok(interval) = std::env::var("UNDERTOW_MUTATION_INTERVAL_SECS") {
            if let Ok(seconds) = interval.parse::<u64>() {
                config.simulation.mutation_interval = Duration::from_secs(seconds);
            }
        }

        if let Ok(rounds) = std::env::var("UNDERTOW_FINAL_ROUNDS") {
            if let Ok(count) = rounds.parse::<usize>() {
                config.convergence.final_rounds = count;
            }
        }

        if let Ok(cost) = std::env::var("UNDERTOW_MIN_COST") {
            if let Ok(value) = cost.parse::<u32>() {
                config.mutation.min_cost = value;
            }
        }

        if let Ok(cost) = std::env::var("UNDERTOW_MAX_COST") {
            if let Ok(value) = cost.parse::<u32>() {
                config.mutation.max_cost = value;
            }
        }

        config
    }

    /// Creates a short, seeded configuration for tests.
    pub fn for_testing() -> Self {
        Self {
            simulation: SimulationConfig {
                duration: Duration::from_secs(60),
                seed: Some(42),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Checks that the configuration can drive a simulation.
    ///
    /// # Errors
    /// - `UndertowError::Configuration` - Zero interval or zero duration
    /// - `UndertowError::Routing` - Invalid mutation cost range
    pub fn validate(&self) -> Result<(), UndertowError> {
        let simulation = &self.simulation;
        if simulation.duration.is_zero() {
            return Err(UndertowError::Configuration {
                reason: "simulation duration must be positive".to_string(),
            });
        }
        if simulation.exchange_interval.is_zero() {
            return Err(UndertowError::Configuration {
                reason: "exchange interval must be positive".to_string(),
            });
        }
        if simulation.mutation_interval.is_zero() {
            return Err(UndertowError::Configuration {
                reason: "mutation interval must be positive".to_string(),
            });
        }
        self.mutation.cost_range()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = UndertowConfig::default();

        assert_eq!(config.simulation.duration, Duration::from_secs(90));
        assert_eq!(config.simulation.exchange_interval, Duration::from_secs(5));
        assert_eq!(config.simulation.mutation_interval, Duration::from_secs(30));
        assert_eq!(config.convergence.settle_rounds, 3);
        assert_eq!(config.convergence.mutation_rounds, 10);
        assert_eq!(config.convergence.final_rounds, 50);
        assert_eq!(config.mutation.cost_range().unwrap(), CostRange::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_testing_preset_is_seeded() {
        let config = UndertowConfig::for_testing();
        assert_eq!(config.simulation.seed, Some(42));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_interval_and_bad_range() {
        let mut config = UndertowConfig::default();
        config.simulation.exchange_interval = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(UndertowError::Configuration { .. })
        ));

        let mut config = UndertowConfig::default();
        config.mutation.min_cost = 50;
        config.mutation.max_cost = 10;
        assert!(matches!(config.validate(), Err(UndertowError::Routing(_))));
    }

    #[test]
    fn test_env_override() {
        unsafe {
            std::env::set_var("UNDERTOW_SEED", "12345");
            std::env::set_var("UNDERTOW_DURATION_SECS", "120");
            std::env::set_var("UNDERTOW_EXCHANGE_INTERVAL_SECS", "2");
            std::env::set_var("UNDERTOW_MUTATION_INTERVAL_SECS", "not-a-number");
            std::env::set_var("UNDERTOW_FINAL_ROUNDS", "80");
            std::env::set_var("UNDERTOW_MIN_COST", "5");
            std::env::set_var("UNDERTOW_MAX_COST", "20");
        }

        let config = UndertowConfig::from_env();

        assert_eq!(config.simulation.seed, Some(12345));
        assert_eq!(config.simulation.duration, Duration::from_secs(120));
        assert_eq!(config.simulation.exchange_interval, Duration::from_secs(2));
        assert_eq!(config.simulation.mutation_interval, Duration::from_secs(30));
        assert_eq!(config.convergence.final_rounds, 80);
        assert_eq!(config.mutation.min_cost, 5);
        assert_eq!(config.mutation.max_cost, 20);

        unsafe {
            std::env::remove_var("UNDERTOW_SEED");
            std::env::remove_var("UNDERTOW_DURATION_SECS");
            std::env::remove_var("UNDERTOW_EXCHANGE_INTERVAL_SECS");
            std::env::remove_var("UNDERTOW_MUTATION_INTERVAL_SECS");
            std::env::remove_var("UNDERTOW_FINAL_ROUNDS");
            std::env::remove_var("UNDERTOW_MIN_COST");
            std::env::remove_var("UNDERTOW_MAX_COST");
        }
    }
}
