//! Per-vehicle cache of traffic-control handles
//!
//! Each slot starts empty, is resolved on first access and then kept for the
//! lifetime of the cache. Accessors take `&self`; the slots are
//! `OnceLock`s, so a concurrent first access still yields one handle.

use std::fmt;
use std::sync::{Arc, OnceLock};

use contracts::ContractError;
use tracing::{debug, instrument};

use crate::client::{CommandInterface, ManagerLocator, ScenarioManager, VehicleCommands};
use crate::error::{Result, TrafficControlError};

/// Lazily resolved manager / command interface / vehicle handle
///
/// The manager and command interface are shared with every other vehicle;
/// the vehicle handle is owned by this cache and released when it drops.
pub struct ExternalHandleCache {
    locator: Arc<dyn ManagerLocator>,
    manager: OnceLock<Arc<dyn ScenarioManager>>,
    command_interface: OnceLock<Arc<dyn CommandInterface>>,
    vehicle: OnceLock<Box<dyn VehicleCommands>>,
}

impl fmt::Debug for ExternalHandleCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalHandleCache")
            .field("manager", &self.manager.get().is_some())
            .field("command_interface", &self.command_interface.get().is_some())
            .field(
                "vehicle",
                &self.vehicle.get().map(|v| v.external_id().to_string()),
            )
            .finish()
    }
}

impl ExternalHandleCache {
    /// Create an empty cache resolving through `locator`
    pub fn new(locator: Arc<dyn ManagerLocator>) -> Self {
        Self {
            locator,
            manager: OnceLock::new(),
            command_interface: OnceLock::new(),
            vehicle: OnceLock::new(),
        }
    }

    /// Scenario manager
    ///
    /// # Errors
    /// `ManagerUnavailable` if the locator finds none.
    pub fn manager(&self) -> Result<&Arc<dyn ScenarioManager>> {
        if let Some(manager) = self.manager.get() {
            return Ok(manager);
        }

        let located =
            self.locator
                .locate()
                .ok_or_else(|| TrafficControlError::ManagerUnavailable {
                    message: "no scenario manager in this simulation".into(),
                })?;
        debug!("scenario manager resolved");
        Ok(self.manager.get_or_init(|| located))
    }

    /// Command interface of the manager's connection
    ///
    /// # Errors
    /// Propagates manager resolution failures; `CommandInterfaceUnavailable`
    /// if the manager is not connected.
    pub fn command_interface(&self) -> Result<&Arc<dyn CommandInterface>> {
        if let Some(interface) = self.command_interface.get() {
            return Ok(interface);
        }

        let resolved = self.manager()?.command_interface().ok_or_else(|| {
            TrafficControlError::CommandInterfaceUnavailable {
                message: "scenario manager is not connected".into(),
            }
        })?;
        debug!("command interface resolved");
        Ok(self.command_interface.get_or_init(|| resolved))
    }

    /// Command handle of the vehicle this cache belongs to
    ///
    /// The identity is only consulted on first resolution; later calls
    /// return the cached handle.
    ///
    /// # Errors
    /// `MissingExternalId` for an empty identity, otherwise propagates
    /// resolution failures.
    #[instrument(name = "handle_cache_vehicle", level = "debug", skip(self))]
    pub fn vehicle(&self, external_id: &str) -> Result<&dyn VehicleCommands> {
        if let Some(handle) = self.vehicle.get() {
            return Ok(handle.as_ref());
        }

        if external_id.is_empty() {
            return Err(ContractError::MissingExternalId.into());
        }

        let handle = self.command_interface()?.vehicle(external_id)?;
        debug!(external_id, "vehicle handle resolved");
        Ok(self.vehicle.get_or_init(|| handle).as_ref())
    }

    /// Whether the vehicle handle has been resolved
    pub fn has_vehicle(&self) -> bool {
        self.vehicle.get().is_some()
    }
}
