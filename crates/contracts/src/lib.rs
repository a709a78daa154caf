//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the workspace.
//! Business crates depend on this crate only, never on each other's internals.
//!
//! ## Time Model
//! - Simulation time is a [`SimTime`] (seconds, f64) advanced by the driver
//! - Every time-dependent operation receives the current time explicitly;
//!   there is no ambient "current simulation time"

mod blueprint;
mod error;
mod kinematics;
mod observer;
mod sink;
mod telemetry;
mod time;

pub use blueprint::*;
pub use error::*;
pub use kinematics::*;
pub use observer::*;
pub use sink::*;
pub use telemetry::*;
pub use time::*;
