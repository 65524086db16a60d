use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::boundary::{ByteSink, ByteSource};
use super::{DeviceInfo, SessionInfo, SessionState};
use crate::config::{DeviceConfiguration, DeviceStatus, LineConfig, Settings};
use crate::serial::{
    ControlDispatcher, ControlRequest, ControlResponse, LoopbackChannel, Result, SerialError,
};

/// Backing state of a device: its loopback line and its line configuration.
///
/// Shared by every handle opened on the same identifier and dropped when the
/// last of them closes.
pub(crate) struct DeviceNode {
    identifier: String,
    channel: LoopbackChannel,
    line: LineConfig,
    created_at: DateTime<Utc>,
    // open sessions, not in-flight operations
    handles: AtomicUsize,
}

impl DeviceNode {
    pub(crate) fn new(identifier: &str, settings: &Settings) -> Result<Self> {
        if identifier.is_empty() {
            return Err(SerialError::ResourceUnavailable(
                "empty device identifier".to_string(),
            ));
        }

        let channel = LoopbackChannel::new(settings.fifo_capacity)?;
        log::info!(
            "Created device {} ({} byte fifos)",
            identifier,
            settings.fifo_capacity
        );

        Ok(Self {
            identifier: identifier.to_string(),
            channel,
            line: LineConfig::new(settings.default_line),
            created_at: Utc::now(),
            handles: AtomicUsize::new(0),
        })
    }

    pub(crate) fn info(&self) -> DeviceInfo {
        DeviceInfo {
            identifier: self.identifier.clone(),
            open_handles: self.handles.load(Ordering::SeqCst),
            fifo_capacity: self.channel.capacity(),
            pending_bytes: self.channel.pending(),
            status: self.channel.status(),
            configuration: self.line.current(),
            created_at: self.created_at,
        }
    }
}

impl Drop for DeviceNode {
    fn drop(&mut self) {
        log::info!("Released device {}", self.identifier);
    }
}

/// One open handle on a device.
///
/// All operations take `&self`; a session can be shared between threads
/// (e.g. behind an `Arc`) and every call completes immediately. After
/// `close` the handle is inert and every operation fails with
/// `InvalidState`.
pub struct DeviceSession {
    id: Uuid,
    identifier: String,
    opened_at: DateTime<Utc>,
    node: RwLock<Option<Arc<DeviceNode>>>,
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("id", &self.id)
            .field("identifier", &self.identifier)
            .field("state", &self.state())
            .finish()
    }
}

impl DeviceSession {
    /// Open a private device not shared with any other handle.
    pub fn open(identifier: &str, settings: &Settings) -> Result<Self> {
        let node = DeviceNode::new(identifier, settings)?;
        Ok(Self::attach(Arc::new(node)))
    }

    pub(crate) fn attach(node: Arc<DeviceNode>) -> Self {
        node.handles.fetch_add(1, Ordering::SeqCst);
        let session = Self {
            id: Uuid::new_v4(),
            identifier: node.identifier.clone(),
            opened_at: Utc::now(),
            node: RwLock::new(Some(node)),
        };
        log::debug!("Opened session {} on {}", session.id, session.identifier);
        session
    }

    fn node(&self) -> Result<Arc<DeviceNode>> {
        self.node
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(SerialError::InvalidState)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn state(&self) -> SessionState {
        match *self.node.read().unwrap_or_else(PoisonError::into_inner) {
            Some(_) => SessionState::Open,
            None => SessionState::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == SessionState::Open
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            identifier: self.identifier.clone(),
            state: self.state(),
            opened_at: self.opened_at,
        }
    }

    /// Write bytes to the line; returns how many were accepted.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        let node = self.node()?;
        Ok(node.channel.send(data))
    }

    /// Read up to `max_len` looped-back bytes.
    pub fn read(&self, max_len: usize) -> Result<Vec<u8>> {
        let node = self.node()?;
        let mut buf = vec![0u8; max_len.min(node.channel.capacity())];
        let n = node.channel.recv(&mut buf);
        buf.truncate(n);
        Ok(buf)
    }

    /// Write `len` bytes taken from caller memory.
    ///
    /// The bytes are staged before the channel is touched, so a faulting
    /// source leaves the device exactly as it was.
    pub fn write_from<S>(&self, src: &S, len: usize) -> Result<usize>
    where
        S: ByteSource + ?Sized,
    {
        let node = self.node()?;
        if len == 0 {
            return Ok(0);
        }

        let mut staging = Vec::new();
        staging.try_reserve_exact(len).map_err(|e| {
            SerialError::ResourceUnavailable(format!("staging buffer of {} bytes: {}", len, e))
        })?;
        staging.resize(len, 0);

        if let Err(e) = src.copy_from(&mut staging) {
            log::warn!("Write on {} faulted copying {} bytes in", self.identifier, len);
            return Err(e);
        }
        Ok(node.channel.send(&staging))
    }

    /// Read up to `max_len` bytes into caller memory.
    ///
    /// Bytes are consumed and counted only once the copy out succeeded.
    pub fn read_into<S>(&self, dst: &mut S, max_len: usize) -> Result<usize>
    where
        S: ByteSink + ?Sized,
    {
        let node = self.node()?;
        node.channel
            .recv_with(max_len, |bytes| dst.copy_to(bytes))
            .map_err(|e| {
                log::warn!("Read on {} faulted copying out", self.identifier);
                e
            })
    }

    pub fn control(&self, request: ControlRequest) -> Result<ControlResponse> {
        let node = self.node()?;
        Ok(ControlDispatcher::dispatch(&node.channel, &node.line, request))
    }

    /// ioctl-style entry point: raw opcode and input payload in, encoded
    /// output payload back.
    pub fn control_raw(&self, opcode: u32, payload: &[u8]) -> Result<Vec<u8>> {
        let node = self.node()?;
        ControlDispatcher::dispatch_raw(&node.channel, &node.line, opcode, payload)
            .map(|response| response.to_bytes())
    }

    pub fn configure(&self, cfg: DeviceConfiguration) -> Result<()> {
        self.control(ControlRequest::Configure(cfg)).map(|_| ())
    }

    pub fn status(&self) -> Result<DeviceStatus> {
        match self.control(ControlRequest::Status)? {
            ControlResponse::Status(status) => Ok(status),
            ControlResponse::Configured => unreachable!("STATUS always answers with counters"),
        }
    }

    /// Live line configuration.
    pub fn current_config(&self) -> Result<DeviceConfiguration> {
        Ok(self.node()?.line.current())
    }

    /// Release this handle. The device itself goes away with its last handle.
    pub fn close(&self) -> Result<()> {
        let node = self
            .node
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(SerialError::InvalidState)?;

        node.handles.fetch_sub(1, Ordering::SeqCst);
        log::debug!("Closed session {} on {}", self.id, self.identifier);
        Ok(())
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        let slot = self.node.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(node) = slot.take() {
            node.handles.fetch_sub(1, Ordering::SeqCst);
            log::debug!("Dropped open session {} on {}", self.id, self.identifier);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_session() -> DeviceSession {
        DeviceSession::open("ttyLOOP0", &Settings::default()).unwrap()
    }

    #[test]
    fn test_open_starts_with_defaults() {
        let session = open_session();
        assert!(session.is_open());
        assert_eq!(session.current_config().unwrap(), DeviceConfiguration::default());
        assert_eq!(session.status().unwrap(), DeviceStatus::default());
    }

    #[test]
    fn test_open_uses_settings() {
        let settings = Settings {
            fifo_capacity: 3,
            default_line: DeviceConfiguration::new(9600, 0, 1),
            ..Settings::default()
        };
        let session = DeviceSession::open("ttyLOOP1", &settings).unwrap();
        assert_eq!(session.write(b"abcdef").unwrap(), 3);
        assert_eq!(session.current_config().unwrap().baud, 9600);
    }

    #[test]
    fn test_open_rejects_bad_resources() {
        assert!(matches!(
            DeviceSession::open("", &Settings::default()),
            Err(SerialError::ResourceUnavailable(_))
        ));
        let settings = Settings {
            fifo_capacity: 0,
            ..Settings::default()
        };
        assert!(matches!(
            DeviceSession::open("ttyLOOP2", &settings),
            Err(SerialError::ResourceUnavailable(_))
        ));
    }

    #[test]
    fn test_closed_session_is_inert() {
        let session = open_session();
        session.close().unwrap();
        assert_eq!(session.state(), SessionState::Closed);

        assert!(matches!(session.write(b"x"), Err(SerialError::InvalidState)));
        assert!(matches!(session.read(1), Err(SerialError::InvalidState)));
        assert!(matches!(session.write(&[]), Err(SerialError::InvalidState)));
        assert!(matches!(
            session.control(ControlRequest::Status),
            Err(SerialError::InvalidState)
        ));
        assert!(matches!(session.close(), Err(SerialError::InvalidState)));
    }

    #[test]
    fn test_control_raw_status_bytes() {
        let session = open_session();
        session.write(b"hello").unwrap();
        session.read(2).unwrap();

        let out = session.control_raw(crate::serial::protocol::STATUS, &[]).unwrap();
        let status = DeviceStatus::from_bytes(&out).unwrap();
        assert_eq!(status, DeviceStatus { rx_bytes: 2, tx_bytes: 5 });
    }

    #[test]
    fn test_open_handles_ignore_in_flight_calls() {
        let session = open_session();
        let in_flight = session.node().unwrap();
        assert_eq!(in_flight.info().open_handles, 1);

        let second = DeviceSession::attach(in_flight.clone());
        assert_eq!(in_flight.info().open_handles, 2);
        second.close().unwrap();
        session.close().unwrap();
        assert_eq!(in_flight.info().open_handles, 0);
    }

    #[test]
    fn test_info_tracks_state() {
        let session = open_session();
        let info = session.info();
        assert_eq!(info.identifier, "ttyLOOP0");
        assert_eq!(info.state, SessionState::Open);
        session.close().unwrap();
        assert_eq!(session.info().state, SessionState::Closed);
    }
}
