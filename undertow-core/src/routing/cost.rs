//! Saturating link and path costs

use std::fmt;
use std::ops::Add;

use serde::{Deserialize, Serialize};

/// Non-negative path cost with a saturating infinite sentinel.
///
/// `Cost::INFINITY` is the largest representable value. Addition saturates:
/// anything plus infinity is infinity, and a finite sum that would overflow
/// becomes infinity. Results stay exact and comparable with plain integer
/// ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cost(u32);

impl Cost {
    /// Unreachable destination.
    pub const INFINITY: Cost = Cost(u32::MAX);

    /// Cost of the self-route.
    pub const ZERO: Cost = Cost(0);

    /// Creates Cost from a raw value. `u32::MAX` is the infinite sentinel.
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Converts a signed value, clamping negatives to zero and saturating at infinity.
    pub fn from_i64_clamped(value: i64) -> Self {
        if value <= 0 {
            Self::ZERO
        } else if value >= i64::from(u32::MAX) {
            Self::INFINITY
        } else {
            Self(value as u32)
        }
    }

    /// Returns true for the infinite sentinel.
    pub fn is_infinite(self) -> bool {
        self == Self::INFINITY
    }

    /// Returns true for any reachable cost.
    pub fn is_finite(self) -> bool {
        !self.is_infinite()
    }

    /// Returns the finite value, or None for infinity.
    pub fn finite(self) -> Option<u32> {
        self.is_finite().then_some(self.0)
    }

    /// Returns the raw value, including the sentinel.
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Adds two costs with saturating semantics (`∞ ⊕ x = ∞`).
    pub fn saturating_add(self, other: Cost) -> Cost {
        if self.is_infinite() || other.is_infinite() {
            return Self::INFINITY;
        }
        Cost(self.0.saturating_add(other.0))
    }
}

impl Add for Cost {
    type Output = Cost;

    fn add(self, other: Cost) -> Cost {
        self.saturating_add(other)
    }
}

impl From<u32> for Cost {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.finite() {
            Some(value) => write!(f, "{value}"),
            None => f.write_str("∞"),
        }
    }
}
