//! # Mobility Sim
//!
//! 车辆移动性跟踪的仿真驱动。
//!
//! 提供：
//! - 按场景构建车队 (tracker + handle cache + 告警应用)
//! - 定时停车/恢复动作与进程内告警投递
//! - 运行结束时把统计标量写入配置的 sinks

pub mod error;
pub mod simulation;

pub use error::{CliError, Result};
pub use simulation::{RunStats, Simulation, SimulationConfig, TelemetryMode};
