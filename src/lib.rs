//! Loopback serial device emulator.
//!
//! A device is a pair of bounded FIFOs wired back to back plus a line
//! configuration, driven through a file-like surface: `write` queues bytes,
//! `read` returns them, and ioctl-style control requests set the line
//! parameters or report the transfer counters.
//!
//! ```
//! use serial_loopback::{DeviceManager, DeviceConfiguration};
//!
//! let manager = DeviceManager::default();
//! let session = manager.open("my_serial").unwrap();
//! assert_eq!(session.write(b"hello").unwrap(), 5);
//! assert_eq!(session.read(64).unwrap(), b"hello");
//! session.configure(DeviceConfiguration::new(9600, 1, 2)).unwrap();
//! session.close().unwrap();
//! ```

pub mod config;
pub mod device;
pub mod serial;

pub use config::{DeviceConfiguration, DeviceStatus, Settings};
pub use device::{DeviceManager, DeviceSession, SessionState};
pub use serial::{ControlRequest, ControlResponse, Result, SerialError};
