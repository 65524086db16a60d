//! Copies across the caller/device boundary.
//!
//! A host integration implements these over whatever memory it is bridging
//! (a user-space buffer, shared memory, a guest address). Any failure is
//! reported as `CrossBoundaryCopyFault`; the session guarantees the device
//! state is unchanged when that happens.

use crate::serial::{Result, SerialError};

/// Caller memory that bytes are written from.
pub trait ByteSource {
    /// Fill `dst` completely from the start of the source.
    fn copy_from(&self, dst: &mut [u8]) -> Result<()>;
}

/// Caller memory that received bytes are copied into.
///
/// `copy_to` runs while the reading device's line is locked. It must not call
/// back into that same device (an echo that writes to it would deadlock);
/// other devices are fine.
pub trait ByteSink {
    /// Accept all of `src`.
    fn copy_to(&mut self, src: &[u8]) -> Result<()>;
}

impl ByteSource for [u8] {
    fn copy_from(&self, dst: &mut [u8]) -> Result<()> {
        let src = self
            .get(..dst.len())
            .ok_or(SerialError::CrossBoundaryCopyFault)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

impl ByteSource for Vec<u8> {
    fn copy_from(&self, dst: &mut [u8]) -> Result<()> {
        self.as_slice().copy_from(dst)
    }
}

impl ByteSink for [u8] {
    fn copy_to(&mut self, src: &[u8]) -> Result<()> {
        let dst = self
            .get_mut(..src.len())
            .ok_or(SerialError::CrossBoundaryCopyFault)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}

impl ByteSink for Vec<u8> {
    fn copy_to(&mut self, src: &[u8]) -> Result<()> {
        self.extend_from_slice(src);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_source_faults_past_end() {
        let data = [1u8, 2, 3];
        let mut dst = [0u8; 4];
        assert!(matches!(
            data[..].copy_from(&mut dst),
            Err(SerialError::CrossBoundaryCopyFault)
        ));
        assert!(data[..].copy_from(&mut dst[..3]).is_ok());
        assert_eq!(&dst[..3], &data);
    }

    #[test]
    fn test_slice_sink_faults_when_short() {
        let mut dst = [0u8; 2];
        assert!(matches!(
            dst[..].copy_to(b"abc"),
            Err(SerialError::CrossBoundaryCopyFault)
        ));
        assert_eq!(dst, [0, 0]);
    }
}
