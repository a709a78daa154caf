//! Layered error definitions
//!
//! Categorized by source: config / contract / sink, mapped onto the
//! fatal-or-not taxonomy by [`ErrorCategory`].

use thiserror::Error;

/// Error taxonomy shared by every crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad scenario or command-line configuration
    Configuration,
    /// Logic defect: aborts the affected entity
    ContractViolation,
    /// External collaborator could not be resolved
    ResolutionFailure,
    /// Timer request rejected; returned to the scheduling caller
    SchedulingRejection,
    /// Results sink failure
    Sink,
    /// IO and anything else
    Other,
}

impl ErrorCategory {
    /// Whether the affected entity must stop participating in the simulation
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            ErrorCategory::ContractViolation | ErrorCategory::ResolutionFailure
        )
    }
}

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Contract Violations =====
    /// Second update within one simulation tick
    #[error("vehicle '{external_id}' updated twice at t={timestamp}s")]
    DuplicateUpdate { external_id: String, timestamp: f64 },

    /// Update older than the last accepted one
    #[error("vehicle '{external_id}' update at t={timestamp}s precedes last update at t={last}s")]
    NonMonotonicUpdate {
        external_id: String,
        last: f64,
        timestamp: f64,
    },

    /// Operation the tracker cannot answer
    #[error("unsupported operation: {operation}")]
    UnsupportedOperation { operation: &'static str },

    /// Identity requested before one was assigned
    #[error("no external id assigned yet")]
    MissingExternalId,

    /// Call out of lifecycle order
    #[error("lifecycle violation for '{external_id}': {message}")]
    Lifecycle { external_id: String, message: String },

    /// Statistics recorded outside their initialize..finalize window
    #[error("statistics {message}")]
    StatisticsState { message: &'static str },

    /// Clock moved backwards
    #[error("simulation clock cannot move from t={now}s back to t={requested}s")]
    ClockRegression { now: f64, requested: f64 },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create lifecycle violation
    pub fn lifecycle(external_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Lifecycle {
            external_id: external_id.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Taxonomy bucket of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigParse { .. } | Self::ConfigValidation { .. } => {
                ErrorCategory::Configuration
            }
            Self::DuplicateUpdate { .. }
            | Self::NonMonotonicUpdate { .. }
            | Self::UnsupportedOperation { .. }
            | Self::MissingExternalId
            | Self::Lifecycle { .. }
            | Self::StatisticsState { .. }
            | Self::ClockRegression { .. } => ErrorCategory::ContractViolation,
            Self::SinkWrite { .. } => ErrorCategory::Sink,
            Self::Io(_) | Self::Other(_) => ErrorCategory::Other,
        }
    }
}
