pub mod channel;
pub mod fifo;
pub mod protocol;

pub use channel::LoopbackChannel;
pub use fifo::{BoundedByteQueue, DEFAULT_FIFO_CAPACITY};
pub use protocol::{ControlDispatcher, ControlRequest, ControlResponse};

#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Session is closed")]
    InvalidState,

    #[error("Cross-boundary copy fault")]
    CrossBoundaryCopyFault,

    #[error("Unsupported control request: 0x{0:08X}")]
    UnsupportedRequest(u32),

    #[error("Invalid control request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, SerialError>;
