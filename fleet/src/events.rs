use crate::telemetry::Measurement;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Telemetry data point received from a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    pub device_id: String,
    pub device_name: String,
    pub measurement: Measurement,
    pub value: f64,
    pub unit: String,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}: {}{} at {}",
            self.device_name,
            self.measurement,
            self.value,
            self.unit,
            self.timestamp.format("%H:%M:%S")
        )
    }
}

/// Simulated transport failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionError {
    pub device_id: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[ERROR] {} - {} at {}",
            self.device_id,
            self.message,
            self.timestamp.format("%H:%M:%S")
        )
    }
}

/// One event on the simulator feed.
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    Reading(Reading),
    Error(ConnectionError),
}
