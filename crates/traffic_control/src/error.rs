//! Traffic Control error types

use contracts::{ContractError, ErrorCategory};
use thiserror::Error;

/// Traffic Control specific error
#[derive(Debug, Error)]
pub enum TrafficControlError {
    /// No scenario manager could be located
    #[error("scenario manager unavailable: {message}")]
    ManagerUnavailable { message: String },

    /// Manager has no command interface (not connected)
    #[error("command interface unavailable: {message}")]
    CommandInterfaceUnavailable { message: String },

    /// Vehicle handle could not be created or the vehicle is gone
    #[error("vehicle '{external_id}' unavailable: {message}")]
    VehicleUnavailable { external_id: String, message: String },

    /// Malformed replay record
    #[error("replay parse error at line {line}: {message}")]
    ReplayParse { line: usize, message: String },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl TrafficControlError {
    /// Create vehicle unavailable error
    pub fn vehicle_unavailable(external_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::VehicleUnavailable {
            external_id: external_id.into(),
            message: message.into(),
        }
    }

    /// Taxonomy bucket of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ManagerUnavailable { .. }
            | Self::CommandInterfaceUnavailable { .. }
            | Self::VehicleUnavailable { .. } => ErrorCategory::ResolutionFailure,
            Self::ReplayParse { .. } => ErrorCategory::Configuration,
            Self::Io(_) => ErrorCategory::Other,
            Self::Contract(e) => e.category(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, TrafficControlError>;
