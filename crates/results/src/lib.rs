//! # Results
//!
//! 结果输出模块。
//!
//! 负责：
//! - 接收车辆结束时输出的统计标量
//! - Fan-out 到多个 sinks (日志 / 内存 / JSON Lines 文件)
//! - 单个 sink 失败不影响其他 sink

pub mod dispatcher;
pub mod error;
pub mod sinks;

pub use contracts::{ScalarRecord, ScalarSink};
pub use dispatcher::{create_dispatcher, create_sink, ScalarDispatcher, SinkMetrics};
pub use error::ResultsError;
pub use sinks::{JsonFileScalarSink, JsonFileSinkConfig, LogScalarSink, MemoryScalarSink, ScalarLog};
