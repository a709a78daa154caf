//! # Traffic Control
//!
//! Access to the traffic-control collaborator that drives vehicle motion.
//!
//! Responsibilities:
//! - Define the scenario manager / command interface / vehicle handle seams
//! - Lazily resolve and cache those handles per vehicle (`ExternalHandleCache`)
//! - Provide a mock traffic manager for tests and offline runs
//! - Replay recorded telemetry traces

pub mod cache;
pub mod client;
pub mod error;
pub mod mock;
pub mod replay;

pub use cache::ExternalHandleCache;
pub use client::{CommandInterface, ManagerLocator, ScenarioManager, VehicleCommands};
pub use contracts::{Speed, TelemetryEvent, TelemetryReport, TelemetrySource};
pub use error::{Result, TrafficControlError};
pub use mock::{MockCommand, MockConfig, MockTelemetry, MockTrafficManager};
pub use replay::{ReplayRecord, TelemetryReplay};
