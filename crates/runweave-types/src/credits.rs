//! Credit amounts for run spend tracking.
//!
//! Credits cross the wire as decimal strings because downstream consumers
//! (JSON, JavaScript clients) cannot represent totals past 2^53 safely.
//! Internally the amount is a `u128`, so comparison and arithmetic stay
//! exact and never pass through floating point.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// An exact, non-negative credit amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Credits(u128);

impl Credits {
    pub const ZERO: Credits = Credits(0);

    pub fn new(amount: u128) -> Self {
        Credits(amount)
    }

    pub fn amount(self) -> u128 {
        self.0
    }

    /// Add, clamping at `u128::MAX` rather than wrapping.
    pub fn saturating_add(self, other: Credits) -> Credits {
        Credits(self.0.saturating_add(other.0))
    }

    /// Remaining headroom under `limit`, zero when already at or past it.
    pub fn remaining_under(self, limit: Credits) -> Credits {
        Credits(limit.0.saturating_sub(self.0))
    }
}

impl fmt::Display for Credits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Credits {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u128>()
            .map(Credits)
            .map_err(|e| format!("invalid credit amount '{s}': {e}"))
    }
}

impl From<u64> for Credits {
    fn from(amount: u64) -> Self {
        Credits(amount as u128)
    }
}

impl Serialize for Credits {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Credits {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}
