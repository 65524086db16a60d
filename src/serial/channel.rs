use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{BoundedByteQueue, Result};
use crate::config::DeviceStatus;

struct ChannelState {
    outbound: BoundedByteQueue,
    inbound: BoundedByteQueue,
    tx_count: u32,
    rx_count: u32,
}

/// Transmit/receive FIFO pair wired back to back.
///
/// Everything accepted for transmission is immediately readable on the
/// receive side. A single lock covers both queues and both counters, so the
/// number of bytes a call moves and the amount added to its counter are always
/// the same, whatever the interleaving of callers.
///
/// Reading drains the same number of bytes from the transmit FIFO as it
/// delivers from the receive FIFO; the two queues therefore always hold the
/// same amount and a full line stays full until someone reads.
pub struct LoopbackChannel {
    state: Mutex<ChannelState>,
    capacity: usize,
}

impl std::fmt::Debug for LoopbackChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("LoopbackChannel")
            .field("capacity", &self.capacity)
            .field("pending", &state.inbound.len())
            .field("tx_count", &state.tx_count)
            .field("rx_count", &state.rx_count)
            .finish()
    }
}

impl LoopbackChannel {
    pub fn new(capacity: usize) -> Result<Self> {
        let outbound = BoundedByteQueue::with_capacity(capacity)?;
        let inbound = BoundedByteQueue::with_capacity(capacity)?;

        Ok(Self {
            state: Mutex::new(ChannelState {
                outbound,
                inbound,
                tx_count: 0,
                rx_count: 0,
            }),
            capacity,
        })
    }

    // All mutation under the lock is infallible, so a poisoned lock still
    // guards consistent queues and counters.
    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Queue `data` for transmission and loop it back to the receive side.
    /// Returns the number of bytes accepted; the rest is dropped.
    pub fn send(&self, data: &[u8]) -> usize {
        if data.is_empty() {
            return 0;
        }

        let mut state = self.lock();
        let accepted = state.outbound.push(data);
        let looped = state.inbound.push(&data[..accepted]);
        debug_assert_eq!(looped, accepted, "transmit and receive fifos out of step");
        state.tx_count = state.tx_count.wrapping_add(accepted as u32);
        drop(state);

        if accepted < data.len() {
            log::debug!(
                "Transmit fifo full: accepted {} of {} bytes",
                accepted,
                data.len()
            );
        }
        accepted
    }

    /// Move up to `buf.len()` received bytes into `buf`.
    pub fn recv(&self, buf: &mut [u8]) -> usize {
        if buf.is_empty() {
            return 0;
        }

        let mut state = self.lock();
        let delivered = state.inbound.pop(buf);
        state.outbound.discard(delivered);
        state.rx_count = state.rx_count.wrapping_add(delivered as u32);
        delivered
    }

    /// Hand up to `max_len` received bytes to `deliver`, consuming them only
    /// if it succeeds.
    ///
    /// Used when the destination lives across a copy boundary that can fault:
    /// on error the queues and `rx_count` are left exactly as they were.
    /// `deliver` runs with the channel locked and must not re-enter it.
    pub fn recv_with<F>(&self, max_len: usize, deliver: F) -> Result<usize>
    where
        F: FnOnce(&[u8]) -> Result<()>,
    {
        if max_len == 0 {
            return Ok(0);
        }

        let mut state = self.lock();
        let pending = state.inbound.len().min(max_len);
        if pending == 0 {
            return Ok(0);
        }

        let mut staging = vec![0u8; pending];
        state.inbound.peek(&mut staging);
        deliver(&staging)?;

        state.inbound.discard(pending);
        state.outbound.discard(pending);
        state.rx_count = state.rx_count.wrapping_add(pending as u32);
        Ok(pending)
    }

    /// Point-in-time copy of the transfer counters.
    pub fn status(&self) -> DeviceStatus {
        let state = self.lock();
        DeviceStatus {
            rx_bytes: state.rx_count,
            tx_bytes: state.tx_count,
        }
    }

    /// Bytes waiting on the receive side.
    pub fn pending(&self) -> usize {
        self.lock().inbound.len()
    }

    /// Copy the bytes still sitting in the transmit FIFO without consuming
    /// them, for monitoring the line.
    pub fn peek_outbound(&self, out: &mut [u8]) -> usize {
        self.lock().outbound.peek(out)
    }
}
