use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::DeviceConfiguration;
use crate::serial::DEFAULT_FIFO_CAPACITY;

pub const DEFAULT_MAX_DEVICES: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Invalid settings JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid setting: {0}")]
    InvalidValue(String),
}

/// Tunables for device nodes, usually read from a JSON file by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Bytes buffered per direction
    pub fifo_capacity: usize,
    /// Line configuration a freshly created device starts with
    pub default_line: DeviceConfiguration,
    /// Upper bound on simultaneously live devices in a `DeviceManager`
    pub max_devices: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fifo_capacity: DEFAULT_FIFO_CAPACITY,
            default_line: DeviceConfiguration::default(),
            max_devices: DEFAULT_MAX_DEVICES,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.fifo_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "fifo_capacity must be greater than 0".to_string(),
            ));
        }
        if self.max_devices == 0 {
            return Err(SettingsError::InvalidValue(
                "max_devices must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings = Self::from_json_str(&json)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }
}
