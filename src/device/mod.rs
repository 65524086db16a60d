pub mod boundary;
pub mod manager;
pub mod models;
pub mod session;

pub use boundary::{ByteSink, ByteSource};
pub use manager::DeviceManager;
pub use models::*;
pub use session::DeviceSession;
