//! Timer error types

use contracts::{ContractError, ErrorCategory};
use thiserror::Error;

/// Rejected timer request
#[derive(Debug, Error)]
pub enum TimerError {
    /// Absolute fire time before the current time
    #[error("fire time t={requested}s lies before current time t={now}s")]
    InPast { requested: f64, now: f64 },

    /// Relative delay below zero
    #[error("negative delay {delay}s")]
    NegativeDelay { delay: f64 },

    /// Period of zero or less
    #[error("period must be positive, got {period}s")]
    NonPositivePeriod { period: f64 },

    /// Period too small to move the clock past the first fire time
    #[error("period {period}s does not advance the clock at t={at}s")]
    PeriodBelowResolution { period: f64, at: f64 },

    /// NaN or infinite time value
    #[error("{field} must be finite")]
    NonFinite { field: &'static str },

    /// Repetition budget of zero
    #[error("a periodic timer needs at least one repetition")]
    ZeroRepetitions,

    /// End time before the first fire time
    #[error("end time t={end}s lies before first fire time t={first}s")]
    EndBeforeStart { first: f64, end: f64 },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl TimerError {
    /// Taxonomy bucket of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Contract(e) => e.category(),
            _ => ErrorCategory::SchedulingRejection,
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, TimerError>;
