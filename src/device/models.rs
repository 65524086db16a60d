use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Re-export control payload models
pub use crate::config::binary::{DeviceConfiguration, DeviceStatus};

/// Session lifecycle state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closed,
}

/// Description of one open handle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub identifier: String,
    pub state: SessionState,
    pub opened_at: DateTime<Utc>,
}

/// Description of one live device node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub identifier: String,
    /// Sessions currently open on the device
    pub open_handles: usize,
    pub fifo_capacity: usize,
    pub pending_bytes: usize,
    pub status: DeviceStatus,
    pub configuration: DeviceConfiguration,
    pub created_at: DateTime<Utc>,
}
