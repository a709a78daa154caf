//! LogScalarSink - logs every scalar via tracing

use contracts::{ContractError, ScalarSink};
use tracing::{info, instrument};

/// Sink that logs scalars for debugging
pub struct LogScalarSink {
    name: String,
    recorded: u64,
}

impl LogScalarSink {
    /// Create a new LogScalarSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            recorded: 0,
        }
    }
}

impl ScalarSink for LogScalarSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn record_scalar(&mut self, owner: &str, name: &str, value: f64) -> Result<(), ContractError> {
        self.recorded += 1;
        info!(sink = %self.name, owner, scalar = name, value, "scalar recorded");
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self), fields(sink = %self.name))]
    fn flush(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, scalars = self.recorded, "LogScalarSink flushed");
        Ok(())
    }
}
