//! Telemetry - traffic-control collaborator output
//!
//! One report per vehicle per simulation tick.

use crate::{Coord, SimTime, Speed};

/// Ground-truth state of one vehicle at one tick
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryReport {
    /// Identifier used by the traffic-control server
    pub external_id: String,
    pub position: Coord,
    /// Road segment the vehicle is on
    pub road_id: String,
    pub speed: Speed,
    /// Heading (radians, clockwise from +x)
    pub angle: f64,
}

/// Event delivered by a telemetry source
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    /// Vehicle state for the current tick
    Report(TelemetryReport),
    /// Vehicle left the simulation
    Departed { external_id: String },
}

/// Telemetry source trait
///
/// Abstracts the live traffic-control client, its mock and trace replay.
pub trait TelemetrySource: Send {
    /// Events for simulation time `now`
    ///
    /// Called once per tick with strictly increasing `now`.
    fn poll(&mut self, now: SimTime) -> Vec<TelemetryEvent>;
}
