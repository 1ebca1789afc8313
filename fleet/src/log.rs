use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

pub const ACTIVITY_LOG_CAPACITY: usize = 100;

/// Fixed-capacity FIFO display buffer; pushing past capacity evicts the
/// oldest entry first.
#[derive(Debug, Clone)]
pub struct Rolling<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T> Rolling<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(item);
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buffer.iter()
    }

    pub fn latest(&self) -> Option<&T> {
        self.buffer.back()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Success,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::Success => "Success",
        };
        f.write_str(label)
    }
}

/// Immutable record of one application action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub subject: String,
    pub details: String,
    pub level: LogLevel,
}

impl LogEntry {
    pub fn new(
        action: impl Into<String>,
        subject: impl Into<String>,
        details: impl Into<String>,
        level: LogLevel,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            action: action.into(),
            subject: subject.into(),
            details: details.into(),
            level,
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] [{}] {} - {}: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.level,
            self.action,
            self.subject,
            self.details
        )
    }
}

/// Append-only activity log capped at the 100 most recent entries.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: Rolling<LogEntry>,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self {
            entries: Rolling::new(ACTIVITY_LOG_CAPACITY),
        }
    }

    pub fn append(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}
