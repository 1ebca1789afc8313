use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of managed equipment. Unrecognized labels map to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Sensor,
    Actuator,
    Gateway,
    Controller,
    Monitor,
    Other,
}

impl DeviceKind {
    pub fn parse(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "sensor" => Self::Sensor,
            "actuator" => Self::Actuator,
            "gateway" => Self::Gateway,
            "controller" => Self::Controller,
            "monitor" => Self::Monitor,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Sensor => "Sensor",
            Self::Actuator => "Actuator",
            Self::Gateway => "Gateway",
            Self::Controller => "Controller",
            Self::Monitor => "Monitor",
            Self::Other => "Other",
        };
        f.write_str(label)
    }
}

/// A managed device with its connectivity status and metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub kind: DeviceKind,
    pub ip_address: String,
    pub online: bool,
    pub last_seen: DateTime<Utc>,
    pub firmware_version: String,
    pub units: String,
    pub location: String,
}

impl Device {
    pub fn status_text(&self) -> &'static str {
        if self.online {
            "Online"
        } else {
            "Offline"
        }
    }
}

/// Caller-supplied fields for a new device; the store assigns id and
/// last-seen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceDraft {
    pub name: String,
    pub kind: DeviceKind,
    pub ip_address: String,
    pub online: bool,
    pub firmware_version: String,
    pub units: String,
    pub location: String,
}
