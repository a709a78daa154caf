//! MemoryScalarSink - keeps scalars in memory (tests, run summaries)

use std::sync::{Arc, Mutex, PoisonError};

use contracts::{ContractError, ScalarRecord, ScalarSink};

/// Shared view of the scalars a [`MemoryScalarSink`] has recorded
#[derive(Debug, Clone, Default)]
pub struct ScalarLog(Arc<Mutex<Vec<ScalarRecord>>>);

impl ScalarLog {
    /// Copy of every record so far
    pub fn records(&self) -> Vec<ScalarRecord> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Value of `name` recorded by `owner`, if any
    pub fn get(&self, owner: &str, name: &str) -> Option<f64> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|r| r.owner == owner && r.name == name)
            .map(|r| r.value)
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, record: ScalarRecord) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

/// Sink storing every scalar in a shared [`ScalarLog`]
#[derive(Debug)]
pub struct MemoryScalarSink {
    name: String,
    log: ScalarLog,
}

impl MemoryScalarSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            log: ScalarLog::default(),
        }
    }

    /// Handle that stays readable after the sink is boxed away
    pub fn log(&self) -> ScalarLog {
        self.log.clone()
    }
}

impl ScalarSink for MemoryScalarSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn record_scalar(&mut self, owner: &str, name: &str, value: f64) -> Result<(), ContractError> {
        self.log.push(ScalarRecord {
            owner: owner.to_string(),
            name: name.to_string(),
            value,
        });
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_outlives_boxed_sink() {
        let sink = MemoryScalarSink::new("mem");
        let log = sink.log();

        let mut boxed: Box<dyn ScalarSink> = Box::new(sink);
        boxed.record_scalar("veh0.mobility", "maxSpeed", 13.9).unwrap();
        boxed.record_scalar("veh0.mobility", "maxSpeed", 14.2).unwrap();
        drop(boxed);

        assert_eq!(log.len(), 2);
        assert_eq!(log.get("veh0.mobility", "maxSpeed"), Some(14.2));
        assert_eq!(log.get("veh1.mobility", "maxSpeed"), None);
    }
}
