use super::{LoopbackChannel, Result, SerialError};
use crate::config::{
    DeviceConfiguration, DeviceStatus, LineConfig, DEVICE_CONFIGURATION_SIZE, DEVICE_STATUS_SIZE,
};

// ioctl request number encoding (Linux asm-generic layout)
const IOC_NRSHIFT: u32 = 0;
const IOC_TYPESHIFT: u32 = 8;
const IOC_SIZESHIFT: u32 = 16;
const IOC_DIRSHIFT: u32 = 30;
const IOC_SIZEMASK: u32 = (1 << 14) - 1;

pub const IOC_WRITE: u32 = 1;
pub const IOC_READ: u32 = 2;

/// Magic byte shared by every control request of this device.
pub const IOC_MAGIC: u8 = b'M';

pub const fn ioc(dir: u32, ty: u8, nr: u8, size: usize) -> u32 {
    (dir << IOC_DIRSHIFT)
        | ((size as u32 & IOC_SIZEMASK) << IOC_SIZESHIFT)
        | ((ty as u32) << IOC_TYPESHIFT)
        | ((nr as u32) << IOC_NRSHIFT)
}

/// `_IOW('M', 1, DeviceConfiguration)`
pub const CONFIGURE: u32 = ioc(IOC_WRITE, IOC_MAGIC, 1, DEVICE_CONFIGURATION_SIZE);
/// `_IOR('M', 2, DeviceStatus)`
pub const STATUS: u32 = ioc(IOC_READ, IOC_MAGIC, 2, DEVICE_STATUS_SIZE);

/// Size of the structure an opcode says it carries.
pub const fn ioc_size(opcode: u32) -> usize {
    ((opcode >> IOC_SIZESHIFT) & IOC_SIZEMASK) as usize
}

/// Bytes the caller hands in with `opcode`; only write-direction requests
/// carry input.
fn ioc_input_size(opcode: u32) -> usize {
    if (opcode >> IOC_DIRSHIFT) & IOC_WRITE != 0 {
        ioc_size(opcode)
    } else {
        0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    Configure(DeviceConfiguration),
    Status,
}

impl ControlRequest {
    pub fn opcode(&self) -> u32 {
        match self {
            ControlRequest::Configure(_) => CONFIGURE,
            ControlRequest::Status => STATUS,
        }
    }

    /// Decode an opcode and its input payload.
    ///
    /// Unknown opcodes are `UnsupportedRequest`. The payload length must match
    /// the size encoded in a write-direction opcode, and be empty for a
    /// read-only one; anything else is `InvalidRequest`.
    pub fn decode(opcode: u32, payload: &[u8]) -> Result<Self> {
        if opcode != CONFIGURE && opcode != STATUS {
            return Err(SerialError::UnsupportedRequest(opcode));
        }

        let expected = ioc_input_size(opcode);
        if payload.len() != expected {
            return Err(SerialError::InvalidRequest(format!(
                "request 0x{:08X} takes {} input bytes, got {}",
                opcode,
                expected,
                payload.len()
            )));
        }

        match opcode {
            CONFIGURE => DeviceConfiguration::from_bytes(payload).map(ControlRequest::Configure),
            _ => Ok(ControlRequest::Status),
        }
    }

    pub fn payload(&self) -> Vec<u8> {
        match self {
            ControlRequest::Configure(cfg) => cfg.to_bytes().to_vec(),
            ControlRequest::Status => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlResponse {
    Configured,
    Status(DeviceStatus),
}

impl ControlResponse {
    /// Output payload as it would be copied back to the caller.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            ControlResponse::Configured => Vec::new(),
            ControlResponse::Status(status) => status.to_bytes().to_vec(),
        }
    }
}

/// Routes control requests to the line configuration or the channel counters.
/// Holds no state of its own.
pub struct ControlDispatcher;

impl ControlDispatcher {
    pub fn dispatch(
        channel: &LoopbackChannel,
        line: &LineConfig,
        request: ControlRequest,
    ) -> ControlResponse {
        match request {
            ControlRequest::Configure(cfg) => {
                line.configure(cfg);
                ControlResponse::Configured
            }
            ControlRequest::Status => ControlResponse::Status(channel.status()),
        }
    }

    /// Decode and dispatch a raw opcode/payload pair. Nothing is touched when
    /// decoding fails.
    pub fn dispatch_raw(
        channel: &LoopbackChannel,
        line: &LineConfig,
        opcode: u32,
        payload: &[u8],
    ) -> Result<ControlResponse> {
        let request = ControlRequest::decode(opcode, payload).map_err(|e| {
            log::warn!("Rejected control request 0x{:08X}: {}", opcode, e);
            e
        })?;
        Ok(Self::dispatch(channel, line, request))
    }
}
