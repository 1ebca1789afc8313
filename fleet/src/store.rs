use crate::errors::{Error, Result};
use crate::model::{Device, DeviceDraft, DeviceKind};
use chrono::{Duration, Utc};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Field of a device record mutated by a store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceField {
    Name,
    Kind,
    IpAddress,
    Online,
    LastSeen,
    FirmwareVersion,
    Units,
    Location,
}

impl std::fmt::Display for DeviceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Name => "name",
            Self::Kind => "kind",
            Self::IpAddress => "ip_address",
            Self::Online => "online",
            Self::LastSeen => "last_seen",
            Self::FirmwareVersion => "firmware_version",
            Self::Units => "units",
            Self::Location => "location",
        };
        f.write_str(label)
    }
}

/// Change notification published after a successful store mutation.
#[derive(Debug, Clone)]
pub enum DeviceChange {
    Added {
        device: Device,
    },
    Updated {
        id: String,
        name: String,
        fields: Vec<DeviceField>,
    },
    Removed {
        id: String,
        name: String,
    },
}

/// Single owned in-memory device list. Callers share it as
/// `Arc<DeviceStore>` and only ever hold read snapshots.
pub struct DeviceStore {
    devices: RwLock<Vec<Device>>,
    changes: broadcast::Sender<DeviceChange>,
}

impl DeviceStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            devices: RwLock::new(Vec::new()),
            changes,
        }
    }

    /// Store preloaded with the sample fleet.
    pub fn seeded() -> Self {
        let now = Utc::now();
        let seed = vec![
            Device {
                id: Uuid::new_v4().to_string(),
                name: "Temperature".to_string(),
                kind: DeviceKind::Sensor,
                ip_address: "192.168.1.101".to_string(),
                online: true,
                last_seen: now,
                firmware_version: "v1.2.3".to_string(),
                units: "°C".to_string(),
                location: "Production Floor A".to_string(),
            },
            Device {
                id: Uuid::new_v4().to_string(),
                name: "Humidity".to_string(),
                kind: DeviceKind::Sensor,
                ip_address: "192.168.1.102".to_string(),
                online: true,
                last_seen: now - Duration::minutes(5),
                firmware_version: "v1.2.1".to_string(),
                units: "%".to_string(),
                location: "Production Floor B".to_string(),
            },
            Device {
                id: Uuid::new_v4().to_string(),
                name: "Sn Actuator".to_string(),
                kind: DeviceKind::Actuator,
                ip_address: "192.168.1.201".to_string(),
                online: false,
                last_seen: now - Duration::hours(2),
                firmware_version: "v2.0.0".to_string(),
                units: "N/A".to_string(),
                location: "Assembly Line 1".to_string(),
            },
            Device {
                id: Uuid::new_v4().to_string(),
                name: "Ga Gateway".to_string(),
                kind: DeviceKind::Gateway,
                ip_address: "192.168.1.1".to_string(),
                online: true,
                last_seen: now - Duration::seconds(30),
                firmware_version: "v3.1.0".to_string(),
                units: "N/A".to_string(),
                location: "Server Room".to_string(),
            },
            Device {
                id: Uuid::new_v4().to_string(),
                name: "Pr Sensor".to_string(),
                kind: DeviceKind::Sensor,
                ip_address: "192.168.1.103".to_string(),
                online: false,
                last_seen: now - Duration::days(1),
                firmware_version: "v1.0.5".to_string(),
                units: "kPa".to_string(),
                location: "Quality Control Lab".to_string(),
            },
        ];
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            devices: RwLock::new(seed),
            changes,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DeviceChange> {
        self.changes.subscribe()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Device>>> {
        self.devices.read().map_err(|_| Error::StorePoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Device>>> {
        self.devices.write().map_err(|_| Error::StorePoisoned)
    }

    fn publish(&self, change: DeviceChange) {
        // No subscribers is fine.
        let _ = self.changes.send(change);
    }

    /// Snapshot copy of the whole fleet; mutating it never touches the
    /// store.
    pub fn list(&self) -> Result<Vec<Device>> {
        Ok(self.read()?.clone())
    }

    /// Snapshot of the devices currently online.
    pub fn online_devices(&self) -> Result<Vec<Device>> {
        Ok(self.read()?.iter().filter(|d| d.online).cloned().collect())
    }

    /// (online, offline) counts.
    pub fn counts(&self) -> Result<(usize, usize)> {
        let devices = self.read()?;
        let online = devices.iter().filter(|d| d.online).count();
        Ok((online, devices.len() - online))
    }

    pub fn get(&self, id: &str) -> Result<Device> {
        self.read()?
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// Stores a new device under a fresh id and returns it.
    pub fn add(&self, draft: DeviceDraft) -> Result<Device> {
        if draft.name.trim().is_empty() {
            return Err(Error::Validation(
                "Device name cannot be empty".to_string(),
            ));
        }

        let device = Device {
            id: Uuid::new_v4().to_string(),
            name: draft.name,
            kind: draft.kind,
            ip_address: draft.ip_address,
            online: draft.online,
            last_seen: Utc::now(),
            firmware_version: draft.firmware_version,
            units: draft.units,
            location: draft.location,
        };

        self.write()?.push(device.clone());
        info!(id = %device.id, name = %device.name, "device added");
        self.publish(DeviceChange::Added {
            device: device.clone(),
        });
        Ok(device)
    }

    /// Overwrites all mutable fields of an existing device and refreshes
    /// its last-seen timestamp.
    pub fn update(&self, updated: &Device) -> Result<()> {
        let mut devices = self.write()?;
        let existing = devices
            .iter_mut()
            .find(|d| d.id == updated.id)
            .ok_or_else(|| Error::NotFound(updated.id.clone()))?;

        let mut fields = Vec::new();
        if existing.name != updated.name {
            fields.push(DeviceField::Name);
        }
        if existing.kind != updated.kind {
            fields.push(DeviceField::Kind);
        }
        if existing.ip_address != updated.ip_address {
            fields.push(DeviceField::IpAddress);
        }
        if existing.online != updated.online {
            fields.push(DeviceField::Online);
        }
        if existing.firmware_version != updated.firmware_version {
            fields.push(DeviceField::FirmwareVersion);
        }
        if existing.units != updated.units {
            fields.push(DeviceField::Units);
        }
        if existing.location != updated.location {
            fields.push(DeviceField::Location);
        }
        fields.push(DeviceField::LastSeen);

        existing.name = updated.name.clone();
        existing.kind = updated.kind;
        existing.ip_address = updated.ip_address.clone();
        existing.online = updated.online;
        existing.firmware_version = updated.firmware_version.clone();
        existing.units = updated.units.clone();
        existing.location = updated.location.clone();
        existing.last_seen = Utc::now();

        let name = existing.name.clone();
        drop(devices);

        debug!(id = %updated.id, "device updated");
        self.publish(DeviceChange::Updated {
            id: updated.id.clone(),
            name,
            fields,
        });
        Ok(())
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let mut devices = self.write()?;
        let index = devices
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        let removed = devices.remove(index);
        drop(devices);

        info!(id = %removed.id, name = %removed.name, "device deleted");
        self.publish(DeviceChange::Removed {
            id: removed.id,
            name: removed.name,
        });
        Ok(())
    }

    /// Flips the online flag, refreshes last-seen, and returns the new
    /// flag. No other field changes.
    pub fn toggle_status(&self, id: &str) -> Result<bool> {
        let mut devices = self.write()?;
        let device = devices
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        device.online = !device.online;
        device.last_seen = Utc::now();
        let online = device.online;
        let (id, name) = (device.id.clone(), device.name.clone());
        drop(devices);

        debug!(%id, online, "device status toggled");
        self.publish(DeviceChange::Updated {
            id,
            name,
            fields: vec![DeviceField::Online, DeviceField::LastSeen],
        });
        Ok(online)
    }
}

impl Default for DeviceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
impl DeviceStore {
    /// Poisons the device lock so fault paths can be exercised.
    pub(crate) fn poison(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = self.devices.write();
            panic!("poisoning device store for test");
        }));
    }
}
