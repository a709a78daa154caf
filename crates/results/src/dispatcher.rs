//! ScalarDispatcher - fan-out of finalized scalars to every configured sink

use std::collections::HashSet;

use contracts::{ContractError, ScalarSink, SinkConfig, SinkType};
use tracing::{info, instrument, warn};

use crate::error::ResultsError;
use crate::sinks::{JsonFileScalarSink, LogScalarSink, MemoryScalarSink};

/// Per-sink counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkMetrics {
    /// Total successful writes
    pub write_count: u64,
    /// Total write failures
    pub failure_count: u64,
}

struct SinkSlot {
    sink: Box<dyn ScalarSink>,
    metrics: SinkMetrics,
}

/// Fans every scalar out to all sinks
///
/// A failing sink does not stop the others from receiving the scalar; the
/// first failure is returned once every sink has been tried.
#[derive(Default)]
pub struct ScalarDispatcher {
    slots: Vec<SinkSlot>,
}

impl ScalarDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink
    pub fn with_sink(mut self, sink: Box<dyn ScalarSink>) -> Self {
        self.push(sink);
        self
    }

    pub fn push(&mut self, sink: Box<dyn ScalarSink>) {
        self.slots.push(SinkSlot {
            sink,
            metrics: SinkMetrics::default(),
        });
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, SinkMetrics)> {
        self.slots
            .iter()
            .map(|s| (s.sink.name().to_string(), s.metrics))
            .collect()
    }
}

impl ScalarSink for ScalarDispatcher {
    fn name(&self) -> &str {
        "dispatcher"
    }

    fn record_scalar(&mut self, owner: &str, name: &str, value: f64) -> Result<(), ContractError> {
        let mut first_error = None;

        for slot in &mut self.slots {
            match slot.sink.record_scalar(owner, name, value) {
                Ok(()) => {
                    slot.metrics.write_count += 1;
                    observability::record_scalar_dispatched(slot.sink.name(), true);
                }
                Err(e) => {
                    slot.metrics.failure_count += 1;
                    observability::record_scalar_dispatched(slot.sink.name(), false);
                    warn!(sink = slot.sink.name(), owner, scalar = name, error = %e, "Sink write failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    #[instrument(name = "dispatcher_flush", skip(self), fields(sinks = self.slots.len()))]
    fn flush(&mut self) -> Result<(), ContractError> {
        let mut first_error = None;
        for slot in &mut self.slots {
            if let Err(e) = slot.sink.flush() {
                warn!(sink = slot.sink.name(), error = %e, "Sink flush failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Create a sink from configuration
#[instrument(
    name = "results_create_sink",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
pub fn create_sink(config: &SinkConfig) -> Result<Box<dyn ScalarSink>, ResultsError> {
    match config.sink_type {
        SinkType::Log => Ok(Box::new(LogScalarSink::new(&config.name))),
        SinkType::Memory => Ok(Box::new(MemoryScalarSink::new(&config.name))),
        SinkType::JsonFile => {
            let sink = JsonFileScalarSink::from_params(&config.name, &config.params)
                .map_err(|e| ResultsError::sink_creation(&config.name, e.to_string()))?;
            Ok(Box::new(sink))
        }
    }
}

/// Convenience function to create a dispatcher from sink configs
#[instrument(name = "results_create_dispatcher", skip(configs), fields(sink_count = configs.len()))]
pub fn create_dispatcher(configs: &[SinkConfig]) -> Result<ScalarDispatcher, ResultsError> {
    let mut seen = HashSet::new();
    let mut dispatcher = ScalarDispatcher::new();

    for config in configs {
        if !seen.insert(config.name.as_str()) {
            return Err(ResultsError::DuplicateSink {
                name: config.name.clone(),
            });
        }
        dispatcher.push(create_sink(config)?);
    }

    info!(sinks = dispatcher.len(), "Scalar dispatcher created");
    Ok(dispatcher)
}
