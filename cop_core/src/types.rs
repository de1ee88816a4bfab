use chrono::{DateTime, Local};
use std::fmt;

/// Connection status as seen by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Faulted,
}

/// Lifecycle of the ingestion thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Stopped = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
    Faulted = 4,
}

impl WorkerState {
    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            1 => WorkerState::Starting,
            2 => WorkerState::Running,
            3 => WorkerState::Stopping,
            4 => WorkerState::Faulted,
            _ => WorkerState::Stopped,
        }
    }

    /// `Stopped` and `Faulted` both mean the transport is released.
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkerState::Stopped | WorkerState::Faulted)
    }
}

impl From<WorkerState> for ConnectionState {
    fn from(s: WorkerState) -> Self {
        match s {
            WorkerState::Starting => ConnectionState::Connecting,
            WorkerState::Running => ConnectionState::Connected,
            WorkerState::Faulted => ConnectionState::Faulted,
            WorkerState::Stopped | WorkerState::Stopping => ConnectionState::Disconnected,
        }
    }
}

/// Operator-facing log line.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub message: String,
}

impl LogEntry {
    pub fn now(message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            message: message.into(),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S"), self.message)
    }
}
