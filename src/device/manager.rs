use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use super::session::DeviceNode;
use super::{DeviceInfo, DeviceSession};
use crate::config::Settings;
use crate::serial::{Result, SerialError};

enum Slot {
    Loopback(Weak<DeviceNode>),
    /// Identifier claimed by a different kind of device
    Reserved(String),
}

/// Table of named devices, the file-like surface a host registers.
///
/// Opening an identifier creates its device on first use; later opens attach
/// to the same loopback line and configuration. A device lives exactly as
/// long as at least one session on it is open.
pub struct DeviceManager {
    settings: Settings,
    slots: RwLock<HashMap<String, Slot>>,
}

impl DeviceManager {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Open a handle on `identifier`.
    pub fn open(&self, identifier: &str) -> Result<DeviceSession> {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);

        match slots.get(identifier) {
            Some(Slot::Reserved(kind)) => {
                log::warn!("Refusing to open {}: bound to a {} device", identifier, kind);
                return Err(SerialError::ResourceUnavailable(format!(
                    "{} is bound to a {} device",
                    identifier, kind
                )));
            }
            Some(Slot::Loopback(weak)) => {
                if let Some(node) = weak.upgrade() {
                    return Ok(DeviceSession::attach(node));
                }
            }
            None => {}
        }

        prune_released(&mut slots);
        let live = slots.values().filter(|slot| is_live(slot)).count();
        if live >= self.settings.max_devices {
            return Err(SerialError::ResourceUnavailable(format!(
                "device table full ({} devices)",
                self.settings.max_devices
            )));
        }

        let node = Arc::new(DeviceNode::new(identifier, &self.settings)?);
        slots.insert(identifier.to_string(), Slot::Loopback(Arc::downgrade(&node)));
        Ok(DeviceSession::attach(node))
    }

    /// Claim `identifier` for another kind of device so loopback opens on it
    /// fail. Fails if a loopback device is currently live under that name.
    pub fn reserve(&self, identifier: &str, kind: &str) -> Result<()> {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        prune_released(&mut slots);
        if slots.get(identifier).map_or(false, is_live) {
            return Err(SerialError::ResourceUnavailable(format!(
                "{} is in use",
                identifier
            )));
        }
        slots.insert(identifier.to_string(), Slot::Reserved(kind.to_string()));
        Ok(())
    }

    /// Drop a reservation made with `reserve`. Returns whether one existed.
    pub fn unreserve(&self, identifier: &str) -> bool {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        if matches!(slots.get(identifier), Some(Slot::Reserved(_))) {
            slots.remove(identifier);
            true
        } else {
            false
        }
    }

    /// Live devices, sorted by identifier.
    pub fn devices(&self) -> Vec<DeviceInfo> {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        prune_released(&mut slots);

        let mut devices: Vec<DeviceInfo> = slots
            .values()
            .filter_map(|slot| match slot {
                Slot::Loopback(weak) => weak.upgrade().map(|node| node.info()),
                Slot::Reserved(_) => None,
            })
            .collect();
        devices.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        devices
    }

    pub fn device(&self, identifier: &str) -> Option<DeviceInfo> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        match slots.get(identifier)? {
            Slot::Loopback(weak) => weak.upgrade().map(|node| node.info()),
            Slot::Reserved(_) => None,
        }
    }
}

impl Default for DeviceManager {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

// Forget devices whose last handle has gone
fn prune_released(slots: &mut HashMap<String, Slot>) {
    slots.retain(|_, slot| !matches!(slot, Slot::Loopback(weak) if weak.strong_count() == 0));
}

fn is_live(slot: &Slot) -> bool {
    match slot {
        Slot::Loopback(weak) => weak.strong_count() > 0,
        Slot::Reserved(_) => false,
    }
}
