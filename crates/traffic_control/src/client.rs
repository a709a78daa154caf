//! Traffic-control client abstraction
//!
//! Defines traits for interacting with the traffic-control server, supporting
//! a live client and mock testing through the same interface.

use std::sync::Arc;

use contracts::Speed;

use crate::error::Result;

/// Finds the scenario manager of the running simulation
///
/// Injected into [`crate::ExternalHandleCache`]; any
/// `Fn() -> Option<Arc<dyn ScenarioManager>>` closure is a locator.
pub trait ManagerLocator: Send + Sync {
    /// The manager, or None if the simulation has none
    fn locate(&self) -> Option<Arc<dyn ScenarioManager>>;
}

impl<F> ManagerLocator for F
where
    F: Fn() -> Option<Arc<dyn ScenarioManager>> + Send + Sync,
{
    fn locate(&self) -> Option<Arc<dyn ScenarioManager>> {
        self()
    }
}

/// Scenario manager
///
/// Owns the connection to the traffic-control server. Shared by every
/// vehicle; its lifetime is owned by the simulation, not by the vehicles.
pub trait ScenarioManager: Send + Sync {
    /// Command interface of the current connection
    ///
    /// Returns None while not connected.
    fn command_interface(&self) -> Option<Arc<dyn CommandInterface>>;
}

/// Command interface
///
/// Issues control commands over the manager's connection.
pub trait CommandInterface: Send + Sync {
    /// Create a command handle bound to one vehicle
    ///
    /// # Arguments
    /// * `external_id` - Identifier used by the server for this vehicle
    fn vehicle(&self, external_id: &str) -> Result<Box<dyn VehicleCommands>>;
}

/// Per-vehicle command handle
pub trait VehicleCommands: Send + Sync {
    /// Vehicle this handle is bound to
    fn external_id(&self) -> &str;

    /// Set the vehicle speed
    ///
    /// `Speed::Unknown` releases manual speed control back to the default
    /// car-following behavior.
    fn set_speed(&self, speed: Speed) -> Result<()>;

    /// Reroute the vehicle through `road_id`
    ///
    /// # Arguments
    /// * `road_id` - Road segment to change the route to
    /// * `extent_m` - Length (metres) over which the change applies
    fn change_route(&self, road_id: &str, extent_m: f64) -> Result<()>;

    /// Road segment the vehicle is currently on
    fn road_id(&self) -> Result<String>;

    /// Current speed
    fn speed(&self) -> Result<Speed>;

    /// Current longitudinal acceleration (m/s²)
    fn accel(&self) -> Result<f64>;
}
