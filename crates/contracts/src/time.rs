//! Simulation time
//!
//! `SimTime` is used both for instants and for intervals, the same way the
//! simulation kernel uses a single time type for both.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Simulation timestamp or interval (seconds)
///
/// Totally ordered via [`f64::total_cmp`]; `-0.0` is normalized to `0.0` on
/// construction so that equality and ordering agree.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimTime(f64);

impl SimTime {
    /// Simulation start
    pub const ZERO: SimTime = SimTime(0.0);

    /// Create from seconds
    #[inline]
    pub fn from_secs(secs: f64) -> Self {
        Self(secs + 0.0)
    }

    /// Seconds as f64
    #[inline]
    pub fn as_secs(self) -> f64 {
        self.0
    }

    /// Neither NaN nor infinite
    #[inline]
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    /// Strictly below zero
    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0.0
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Add for SimTime {
    type Output = SimTime;

    fn add(self, rhs: SimTime) -> SimTime {
        SimTime::from_secs(self.0 + rhs.0)
    }
}

impl Sub for SimTime {
    type Output = SimTime;

    fn sub(self, rhs: SimTime) -> SimTime {
        SimTime::from_secs(self.0 - rhs.0)
    }
}

impl From<f64> for SimTime {
    fn from(secs: f64) -> Self {
        Self::from_secs(secs)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Read access to the current simulation time
pub trait Clock {
    /// Current simulation time
    fn now(&self) -> SimTime;
}

/// Monotonic simulation clock owned by the driver
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now: SimTime,
}

impl SimClock {
    /// Clock positioned at `start`
    pub fn starting_at(start: SimTime) -> Self {
        Self { now: start }
    }

    /// Move the clock forward
    ///
    /// # Errors
    /// `ClockRegression` if `to` lies before the current time or is not finite.
    pub fn advance_to(&mut self, to: SimTime) -> Result<(), ContractError> {
        if !to.is_finite() || to < self.now {
            return Err(ContractError::ClockRegression {
                now: self.now.as_secs(),
                requested: to.as_secs(),
            });
        }
        self.now = to;
        Ok(())
    }
}

impl Clock for SimClock {
    fn now(&self) -> SimTime {
        self.now
    }
}
