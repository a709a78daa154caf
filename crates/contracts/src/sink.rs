//! ScalarSink trait - results output interface
//!
//! Receives the named scalars a vehicle produces when its statistics are
//! finalized.

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// One recorded scalar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarRecord {
    /// Recording entity, e.g. `"veh0.mobility"`
    pub owner: String,
    /// Scalar name, e.g. `"totalTime"`
    pub name: String,
    pub value: f64,
}

/// Results sink
///
/// All sink implementations must implement this trait.
pub trait ScalarSink: Send {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Record one named scalar
    ///
    /// # Errors
    /// Returns write error (should include context)
    fn record_scalar(&mut self, owner: &str, name: &str, value: f64) -> Result<(), ContractError>;

    /// Flush buffered records (if any)
    fn flush(&mut self) -> Result<(), ContractError>;
}
