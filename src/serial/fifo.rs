use super::{Result, SerialError};

/// Capacity of each direction of the loopback line, matching the 4 KiB kfifo
/// the device node allocates.
pub const DEFAULT_FIFO_CAPACITY: usize = 4096;

/// Fixed-capacity byte ring buffer.
///
/// Writes and reads never block: `push` accepts as many bytes as fit and
/// silently drops the rest, `pop` returns whatever is buffered (possibly
/// nothing). Storage is allocated once and never grows.
pub struct BoundedByteQueue {
    buf: Box<[u8]>,
    head: usize,
    len: usize,
}

impl std::fmt::Debug for BoundedByteQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedByteQueue")
            .field("capacity", &self.capacity())
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl BoundedByteQueue {
    /// Allocate a queue holding at most `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(SerialError::ResourceUnavailable(
                "fifo capacity must be non-zero".to_string(),
            ));
        }

        let mut storage = Vec::new();
        storage.try_reserve_exact(capacity).map_err(|e| {
            SerialError::ResourceUnavailable(format!(
                "fifo allocation of {} bytes failed: {}",
                capacity, e
            ))
        })?;
        storage.resize(capacity, 0);

        Ok(Self {
            buf: storage.into_boxed_slice(),
            head: 0,
            len: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Free space left before `push` starts dropping bytes.
    pub fn available(&self) -> usize {
        self.capacity() - self.len
    }

    /// Append bytes from the front of `data`, returning how many were copied.
    pub fn push(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(self.available());
        if n == 0 {
            return 0;
        }

        let capacity = self.capacity();
        let tail = (self.head + self.len) % capacity;
        let first = n.min(capacity - tail);
        self.buf[tail..tail + first].copy_from_slice(&data[..first]);
        self.buf[..n - first].copy_from_slice(&data[first..n]);
        self.len += n;
        n
    }

    /// Copy up to `out.len()` bytes from the head without consuming them.
    pub fn peek(&self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.len);
        if n == 0 {
            return 0;
        }

        let first = n.min(self.capacity() - self.head);
        out[..first].copy_from_slice(&self.buf[self.head..self.head + first]);
        out[first..n].copy_from_slice(&self.buf[..n - first]);
        n
    }

    /// Drop up to `n` bytes from the head.
    pub fn discard(&mut self, n: usize) -> usize {
        let n = n.min(self.len);
        self.len -= n;
        self.head = if self.len == 0 {
            0
        } else {
            (self.head + n) % self.capacity()
        };
        n
    }

    /// Move up to `out.len()` bytes from the head into `out`.
    pub fn pop(&mut self, out: &mut [u8]) -> usize {
        let n = self.peek(out);
        self.discard(n)
    }
}
