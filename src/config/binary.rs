use serde::{Deserialize, Serialize};

use crate::serial::{Result, SerialError};

// Defaults the device node starts with
pub const DEFAULT_BAUD: u32 = 115200;
pub const DEFAULT_PARITY: u8 = 0;
pub const DEFAULT_STOP_BITS: u8 = 1;

pub const DEVICE_CONFIGURATION_SIZE: usize = 8;
pub const DEVICE_STATUS_SIZE: usize = 8;

pub const PARITY_NONE: u8 = 0;
pub const PARITY_ODD: u8 = 1;
pub const PARITY_EVEN: u8 = 2;

/// Line parameters carried by a CONFIGURE request.
///
/// Values are stored verbatim: parity outside 0..=2 or a zero baud rate are
/// accepted as-is. `reserved` has no meaning but must survive a round trip.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfiguration {
    pub baud: u32,
    pub parity: u8,
    pub stop_bits: u8,
    #[serde(default)]
    pub reserved: [u8; 2],
}

impl DeviceConfiguration {
    pub fn new(baud: u32, parity: u8, stop_bits: u8) -> Self {
        Self {
            baud,
            parity,
            stop_bits,
            reserved: [0; 2],
        }
    }

    /// Native byte order, no padding.
    pub fn to_bytes(&self) -> [u8; DEVICE_CONFIGURATION_SIZE] {
        let mut out = [0u8; DEVICE_CONFIGURATION_SIZE];
        out[0..4].copy_from_slice(&self.baud.to_ne_bytes());
        out[4] = self.parity;
        out[5] = self.stop_bits;
        out[6..8].copy_from_slice(&self.reserved);
        out
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let raw: &[u8; DEVICE_CONFIGURATION_SIZE] = data.try_into().map_err(|_| {
            SerialError::InvalidRequest(format!(
                "configuration payload is {} bytes, expected {}",
                data.len(),
                DEVICE_CONFIGURATION_SIZE
            ))
        })?;

        Ok(Self {
            baud: u32::from_ne_bytes([raw[0], raw[1], raw[2], raw[3]]),
            parity: raw[4],
            stop_bits: raw[5],
            reserved: [raw[6], raw[7]],
        })
    }
}

impl Default for DeviceConfiguration {
    fn default() -> Self {
        Self::new(DEFAULT_BAUD, DEFAULT_PARITY, DEFAULT_STOP_BITS)
    }
}

/// Cumulative transfer counters returned by a STATUS request.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub rx_bytes: u32,
    pub tx_bytes: u32,
}

impl DeviceStatus {
    pub fn to_bytes(&self) -> [u8; DEVICE_STATUS_SIZE] {
        let mut out = [0u8; DEVICE_STATUS_SIZE];
        out[0..4].copy_from_slice(&self.rx_bytes.to_ne_bytes());
        out[4..8].copy_from_slice(&self.tx_bytes.to_ne_bytes());
        out
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let raw: &[u8; DEVICE_STATUS_SIZE] = data.try_into().map_err(|_| {
            SerialError::InvalidRequest(format!(
                "status payload is {} bytes, expected {}",
                data.len(),
                DEVICE_STATUS_SIZE
            ))
        })?;

        Ok(Self {
            rx_bytes: u32::from_ne_bytes([raw[0], raw[1], raw[2], raw[3]]),
            tx_bytes: u32::from_ne_bytes([raw[4], raw[5], raw[6], raw[7]]),
        })
    }
}

// Ensure the in-memory layout matches the exchanged structures
const _: () = assert!(std::mem::size_of::<DeviceConfiguration>() == DEVICE_CONFIGURATION_SIZE);
const _: () = assert!(std::mem::size_of::<DeviceStatus>() == DEVICE_STATUS_SIZE);
