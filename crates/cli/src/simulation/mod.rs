//! Simulation driver module.

mod fleet;
mod hazard;
mod orchestrator;
mod stats;

pub use fleet::{Fleet, FleetCounters, VehicleNode};
pub use hazard::{HazardApp, HazardNotice, ACKNOWLEDGE_LABEL, RECEIVER_COLOR, REROUTE_EXTENT_M};
pub use orchestrator::{Simulation, SimulationConfig, TelemetryMode};
pub use stats::RunStats;
