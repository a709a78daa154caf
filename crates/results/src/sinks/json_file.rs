//! JsonFileScalarSink - appends scalars to a JSON Lines file

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use contracts::{ContractError, ScalarRecord, ScalarSink};
use tracing::{debug, error, instrument};

/// Configuration for JsonFileScalarSink
#[derive(Debug, Clone)]
pub struct JsonFileSinkConfig {
    /// Output file (one JSON object per line)
    pub path: PathBuf,
}

impl JsonFileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let path = params
            .get("path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./results/scalars.jsonl"));

        Self { path }
    }
}

/// Sink that writes each scalar as one JSON line
pub struct JsonFileScalarSink {
    name: String,
    config: JsonFileSinkConfig,
    writer: BufWriter<File>,
    written: u64,
}

impl JsonFileScalarSink {
    /// Create the sink, truncating any existing file
    pub fn new(name: impl Into<String>, config: JsonFileSinkConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(&config.path)?;

        Ok(Self {
            name: name.into(),
            config,
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        Self::new(name, JsonFileSinkConfig::from_params(params))
    }

    fn write_record(&mut self, record: &ScalarRecord) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        self.writer.write_all(b"\n")
    }
}

impl ScalarSink for JsonFileScalarSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn record_scalar(&mut self, owner: &str, name: &str, value: f64) -> Result<(), ContractError> {
        let record = ScalarRecord {
            owner: owner.to_string(),
            name: name.to_string(),
            value,
        };
        self.write_record(&record).map_err(|e| {
            error!(sink = %self.name, owner, scalar = name, error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })?;
        self.written += 1;
        Ok(())
    }

    #[instrument(name = "json_file_sink_flush", skip(self), fields(sink = %self.name))]
    fn flush(&mut self) -> Result<(), ContractError> {
        self.writer
            .flush()
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        debug!(
            path = %self.config.path.display(),
            records = self.written,
            "scalars flushed"
        );
        Ok(())
    }
}
