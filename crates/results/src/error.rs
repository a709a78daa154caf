//! Results error types

use contracts::{ContractError, ErrorCategory};
use thiserror::Error;

/// Results-specific errors
#[derive(Debug, Error)]
pub enum ResultsError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Two sinks configured under one name
    #[error("duplicate sink name '{name}'")]
    DuplicateSink { name: String },

    /// Sink write error (from contract)
    #[error("sink error: {0}")]
    Contract(#[from] ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResultsError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Taxonomy bucket of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::SinkCreation { .. } | Self::DuplicateSink { .. } => ErrorCategory::Configuration,
            Self::Contract(e) => e.category(),
            Self::Io(_) => ErrorCategory::Sink,
        }
    }
}
