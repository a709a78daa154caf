//! Kinematic state of a tracked vehicle
//!
//! Heading convention: angle 0 faces the +x axis and grows clockwise in the
//! ground plane, so the velocity direction is `(cos a, -sin a, 0)` and the
//! orientation is a rotation of `-a` about the vertical axis.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::SimTime;

/// 3D position or vector (metres, metres per second)
pub type Coord = Vector3<f64>;

/// Rotation of the vehicle body
pub type Orientation = UnitQuaternion<f64>;

/// Raw speed value meaning "speed unknown / not controlled"
pub const UNKNOWN_SPEED_SENTINEL: f64 = -1.0;

/// Speed reported by, or commanded to, the traffic-control collaborator
///
/// Serialized as a plain number; `-1` maps to [`Speed::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub enum Speed {
    /// Speed in metres per second
    Known(f64),
    /// No speed available (or: release manual speed control)
    Unknown,
}

impl Speed {
    /// Speed value if known
    #[inline]
    pub fn known(self) -> Option<f64> {
        match self {
            Speed::Known(v) => Some(v),
            Speed::Unknown => None,
        }
    }

    #[inline]
    pub fn is_known(self) -> bool {
        matches!(self, Speed::Known(_))
    }
}

impl From<f64> for Speed {
    fn from(raw: f64) -> Self {
        if raw == UNKNOWN_SPEED_SENTINEL {
            Speed::Unknown
        } else {
            Speed::Known(raw)
        }
    }
}

impl From<Speed> for f64 {
    fn from(speed: Speed) -> Self {
        match speed {
            Speed::Known(v) => v,
            Speed::Unknown => UNKNOWN_SPEED_SENTINEL,
        }
    }
}

/// Velocity for a speed along a heading
///
/// An unknown speed yields a zero vector.
pub fn heading_velocity(speed: Speed, angle: f64) -> Coord {
    match speed {
        Speed::Known(v) => Coord::new(angle.cos(), -angle.sin(), 0.0) * v,
        Speed::Unknown => Coord::zeros(),
    }
}

/// Body orientation for a heading (rotation of `-angle` about +z)
pub fn heading_orientation(angle: f64) -> Orientation {
    UnitQuaternion::from_axis_angle(&Vector3::z_axis(), -angle)
}

/// Latest kinematic state of a vehicle
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicState {
    pub position: Coord,
    pub velocity: Coord,
    pub orientation: Orientation,
    /// Timestamp of the last accepted update (None before the first one)
    pub last_update: Option<SimTime>,
}

impl KinematicState {
    /// State derived from one telemetry sample
    pub fn from_heading(position: Coord, speed: Speed, angle: f64) -> Self {
        Self {
            position,
            velocity: heading_velocity(speed, angle),
            orientation: heading_orientation(angle),
            last_update: None,
        }
    }
}

impl Default for KinematicState {
    fn default() -> Self {
        Self {
            position: Coord::zeros(),
            velocity: Coord::zeros(),
            orientation: Orientation::identity(),
            last_update: None,
        }
    }
}

/// Configured position (metres)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl From<Location> for Coord {
    fn from(loc: Location) -> Self {
        Coord::new(loc.x, loc.y, loc.z)
    }
}
