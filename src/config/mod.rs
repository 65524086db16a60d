pub mod binary;
pub mod line;
pub mod settings;

pub use binary::{
    DeviceConfiguration, DeviceStatus, DEVICE_CONFIGURATION_SIZE, DEVICE_STATUS_SIZE,
};
pub use line::LineConfig;
pub use settings::{Settings, SettingsError};
