//! # Mobility
//!
//! 外部驱动车辆的运动学状态跟踪。
//!
//! 负责：
//! - 把每个 tick 的位置/速度报告转换为运动学状态 (位置、速度向量、朝向)
//! - 每个仿真时刻最多接受一次更新
//! - 累计运行统计 (时长、速度上下界、加速度样本) 并在结束时输出标量
//!
//! ## 使用示例
//!
//! ```ignore
//! use mobility::KinematicStateTracker;
//!
//! let mut tracker = KinematicStateTracker::new();
//! tracker.pre_initialize("veh0", position, "12", Speed::Known(10.0), 0.0)?;
//! tracker.initialize(now)?;
//!
//! // 每个 tick
//! tracker.update(position, speed, angle, now)?;
//!
//! // 结束时输出统计
//! tracker.finish(now, &mut sink)?;
//! ```

mod indicator;
mod statistics;
mod tracker;

pub use indicator::UpdateIndicator;
pub use statistics::{RecordedSample, StatisticsAggregator, StatisticsSnapshot};
pub use tracker::{KinematicStateTracker, TrackerPhase};
