// ── Device selection services ──
//
// `ActiveDeviceService` holds the single selected device.
// `DevicesOnSiteService` holds the device list of the active site.
// Both persist through the `StateStore` and broadcast a change event only
// when the stored value actually changes.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use crate::error::CoreError;
use crate::model::Device;
use crate::store::{self, StateStore};

use super::EVENT_CHANNEL_SIZE;

pub const ACTIVE_DEVICE_KEY: &str = "Enapter.Storage.Devices.ActiveDevice";
pub const DEVICES_ON_SITE_KEY: &str = "Enapter.Storage.Devices.DevicesOnSite";

// ── ActiveDeviceService ──────────────────────────────────────────────

/// Change notification from [`ActiveDeviceService`].
#[derive(Debug, Clone, PartialEq)]
pub enum ActiveDeviceEvent {
    /// A different device (or none) is now selected.
    Selected(Option<Device>),
    /// The selected device's data changed.
    Updated(Device),
}

pub struct ActiveDeviceService {
    state: Arc<dyn StateStore>,
    events: broadcast::Sender<ActiveDeviceEvent>,
}

impl ActiveDeviceService {
    pub fn new(state: Arc<dyn StateStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self { state, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ActiveDeviceEvent> {
        self.events.subscribe()
    }

    pub fn get(&self) -> Result<Option<Device>, CoreError> {
        Ok(store::get_json(&*self.state, ACTIVE_DEVICE_KEY)?)
    }

    /// Store, merge or clear the selected device.
    ///
    /// - `None` clears a stored device.
    /// - A device with a new id replaces the stored one.
    /// - Otherwise the candidate is merged over the stored device; if the
    ///   result equals what is stored nothing is written or emitted.
    ///
    /// Returns whether anything changed.
    pub fn update_device(&self, candidate: Option<Device>) -> Result<bool, CoreError> {
        let current = self.get()?;
        let event = match (current, candidate) {
            (None, None) => return Ok(false),
            (Some(_), None) => {
                self.state.delete(ACTIVE_DEVICE_KEY)?;
                ActiveDeviceEvent::Selected(None)
            }
            (None, Some(candidate)) => {
                store::set_json(&*self.state, ACTIVE_DEVICE_KEY, &candidate)?;
                ActiveDeviceEvent::Selected(Some(candidate))
            }
            (Some(current), Some(candidate)) if current.id != candidate.id => {
                store::set_json(&*self.state, ACTIVE_DEVICE_KEY, &candidate)?;
                ActiveDeviceEvent::Selected(Some(candidate))
            }
            (Some(current), Some(candidate)) => {
                let merged = current.merged_with(&candidate);
                if merged == current {
                    return Ok(false);
                }
                store::set_json(&*self.state, ACTIVE_DEVICE_KEY, &merged)?;
                ActiveDeviceEvent::Updated(merged)
            }
        };

        debug!(?event, "active device changed");
        let _ = self.events.send(event);
        Ok(true)
    }

    pub fn clear(&self) -> Result<bool, CoreError> {
        self.update_device(None)
    }
}

// ── DevicesOnSiteService ─────────────────────────────────────────────

pub struct DevicesOnSiteService {
    state: Arc<dyn StateStore>,
    active: Arc<ActiveDeviceService>,
    events: broadcast::Sender<Arc<Vec<Device>>>,
}

impl DevicesOnSiteService {
    pub fn new(state: Arc<dyn StateStore>, active: Arc<ActiveDeviceService>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            state,
            active,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Vec<Device>>> {
        self.events.subscribe()
    }

    pub fn active_device(&self) -> &Arc<ActiveDeviceService> {
        &self.active
    }

    pub fn get_all(&self) -> Result<Vec<Device>, CoreError> {
        Ok(store::get_json(&*self.state, DEVICES_ON_SITE_KEY)?.unwrap_or_default())
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<Device>, CoreError> {
        Ok(self.get_all()?.into_iter().find(|d| d.id == id))
    }

    fn store(&self, devices: Vec<Device>) -> Result<(), CoreError> {
        store::set_json(&*self.state, DEVICES_ON_SITE_KEY, &devices)?;
        debug!(count = devices.len(), "devices on site changed");
        let _ = self.events.send(Arc::new(devices));
        Ok(())
    }

    /// Replace the list wholesale. No event if nothing changed.
    pub fn replace_all(&self, devices: Vec<Device>) -> Result<bool, CoreError> {
        if self.get_all()? == devices {
            return Ok(false);
        }
        self.store(devices)?;
        Ok(true)
    }

    /// Reconcile a fresh remote listing with the stored list.
    ///
    /// A different count replaces the list. Otherwise each incoming device
    /// is merged over the stored device with the same id, so locally known
    /// fields survive; if no device changed nothing is written or emitted.
    pub fn update_all(&self, devices: Vec<Device>) -> Result<bool, CoreError> {
        let current = self.get_all()?;
        if current.len() != devices.len() {
            self.store(devices)?;
            return Ok(true);
        }

        let merged: Vec<Device> = devices
            .into_iter()
            .map(|incoming| match current.iter().find(|d| d.id == incoming.id) {
                Some(existing) => existing.merged_with(&incoming),
                None => incoming,
            })
            .collect();

        let unchanged = merged
            .iter()
            .all(|m| current.iter().any(|c| c.id == m.id && c == m));
        if unchanged {
            return Ok(false);
        }

        self.store(merged)?;
        Ok(true)
    }

    /// Select device `id`: it becomes the only active device in the list
    /// and is mirrored into the [`ActiveDeviceService`].
    pub fn connect_by_id(&self, id: &str) -> Result<Device, CoreError> {
        let devices = self.get_all()?;
        if !devices.iter().any(|d| d.id == id) {
            return Err(CoreError::NotFound {
                entity_type: "Device",
                identifier: id.into(),
            });
        }

        let devices: Vec<Device> = devices
            .iter()
            .map(|d| d.with_is_active(d.id == id))
            .collect();
        let selected = devices
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                entity_type: "Device",
                identifier: id.into(),
            })?;

        self.replace_all(devices)?;
        self.active.update_device(Some(selected.clone()))?;
        Ok(selected)
    }

    /// Deselect device `id` if it is the active one.
    pub fn disconnect_by_id(&self, id: &str) -> Result<bool, CoreError> {
        let mut devices = self.get_all()?;
        let Some(device) = devices.iter_mut().find(|d| d.id == id && d.is_active()) else {
            return Ok(false);
        };
        *device = device.with_is_active(false);
        self.replace_all(devices)?;

        if self.active.get()?.is_some_and(|d| d.id == id) {
            self.active.clear()?;
        }
        Ok(true)
    }

    /// Drop the active device and the whole list.
    pub fn clear(&self) -> Result<(), CoreError> {
        self.active.clear()?;
        self.replace_all(Vec::new())?;
        Ok(())
    }
}
