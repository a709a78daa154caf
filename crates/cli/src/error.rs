//! Error types for CLI operations.

use contracts::{ContractError, ErrorCategory};
use results::ResultsError;
use thiserror::Error;
use timers::TimerError;
use traffic_control::TrafficControlError;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid command-line override
    #[error("Invalid argument '{name}': {message}")]
    InvalidArgument { name: &'static str, message: String },

    /// Telemetry source or traffic control failure
    #[error("Traffic control error: {0}")]
    TrafficControl(#[from] TrafficControlError),

    /// Timer scheduling rejected
    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    /// Result sink setup failure
    #[error("Results error: {0}")]
    Results(#[from] ResultsError),

    /// Graceful shutdown error
    #[error("Error during shutdown: {message}")]
    Shutdown { message: String },

    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_argument(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            message: message.into(),
        }
    }

    pub fn shutdown(message: impl Into<String>) -> Self {
        Self::Shutdown {
            message: message.into(),
        }
    }

    /// Taxonomy bucket of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigNotFound { .. } | Self::InvalidArgument { .. } => {
                ErrorCategory::Configuration
            }
            Self::TrafficControl(e) => e.category(),
            Self::Timer(e) => e.category(),
            Self::Results(e) => e.category(),
            Self::Shutdown { .. } => ErrorCategory::Other,
            Self::Contract(e) => e.category(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
