//! # Timers
//!
//! 仿真时间驱动的定时回调注册表。
//!
//! 负责：
//! - 一次性 / 周期性定时器的调度与取消
//! - 按 (触发时间, 插入顺序) 依次触发到期回调
//! - 回调执行期间可以继续调度或取消定时器
//!
//! ## 使用示例
//!
//! ```ignore
//! use timers::{TimerRegistry, TimerSpec};
//!
//! let mut registry: TimerRegistry<Fleet> = TimerRegistry::new();
//! registry.schedule_once_at(SimTime::from_secs(15.0), |reg, fleet| {
//!     fleet.stop("veh0");
//!     reg.schedule_once_in(12.0, |_, fleet| fleet.resume("veh0")).ok();
//! })?;
//! registry.create(TimerSpec::every(5.0).repetitions(3), |_, fleet| fleet.beacon())?;
//!
//! // 每个仿真步
//! registry.advance_to(now, &mut fleet)?;
//! ```

mod error;
mod registry;
mod spec;

pub use error::{Result, TimerError};
pub use registry::{TimerAction, TimerHandle, TimerRegistry, TimerState};
pub use spec::TimerSpec;
