//! Sink implementations
//!
//! Contains LogScalarSink, MemoryScalarSink, and JsonFileScalarSink.

mod json_file;
mod log;
mod memory;

pub use self::json_file::{JsonFileScalarSink, JsonFileSinkConfig};
pub use self::log::LogScalarSink;
pub use self::memory::{MemoryScalarSink, ScalarLog};
