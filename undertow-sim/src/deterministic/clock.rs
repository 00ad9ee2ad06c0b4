//! Simulated time and seeded randomness.

use std::time::Duration;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::driver::SimulationError;

/// Clock measuring simulated time since the start of a run.
///
/// Time only moves forward and never reads the wall clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeterministicClock {
    now: Duration,
}

impl DeterministicClock {
    /// Creates a clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current simulated time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Moves the clock to `target`.
    ///
    /// # Errors
    /// - `SimulationError::TimeWentBackwards` - `target` is earlier than now
    pub fn advance_to(&mut self, target: Duration) -> Result<(), SimulationError> {
        if target < self.now {
            return Err(SimulationError::TimeWentBackwards {
                now: self.now,
                target,
            });
        }
        self.now = target;
        Ok(())
    }
}

/// Seeded ChaCha8 generator; the same seed replays the same link churn.
///
/// Implements [`RngCore`] so it plugs straight into anything taking
/// `rand::Rng`.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    rng: ChaCha8Rng,
    seed: u64,
}

impl DeterministicRng {
    /// Creates a generator from a seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Returns the seed this generator was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RngCore for DeterministicRng {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        self.rng.fill_bytes(dst);
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    #[test]
    fn test_clock_only_moves_forward() {
        let mut clock = DeterministicClock::new();
        clock.advance_to(Duration::from_secs(5)).unwrap();
        assert_eq!(clock.now(), Duration::from_secs(5));

        clock.advance_to(Duration::from_secs(5)).unwrap();
        assert!(matches!(
            clock.advance_to(Duration::from_secs(4)),
            Err(SimulationError::TimeWentBackwards { .. })
        ));
        assert_eq!(clock.now(), Duration::from_secs(5));
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut first = DeterministicRng::from_seed(12345);
        let mut second = DeterministicRng::from_seed(12345);

        let a: Vec<u32> = (0..16).map(|_| first.random_range(1..=200)).collect();
        let b: Vec<u32> = (0..16).map(|_| second.random_range(1..=200)).collect();
        assert_eq!(a, b);
        assert_eq!(first.seed(), 12345);
    }
}
