//! # Byte Ring Buffer
//!
//! Fixed-capacity circular buffer that carries captured bytes from the input
//! stream to the output stream of a duplex device when the native API opens
//! the two directions separately.
//!
//! - **Capacity**: fixed at creation, in bytes
//! - **Overwrite Policy**: when full, the oldest bytes are dropped so the
//!   output side always sees the most recent input

use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Clone)]
pub struct ByteRingBuffer {
    inner: Arc<Mutex<RingState>>,
}

struct RingState {
    buffer: Vec<u8>,
    read_pos: usize,
    len: usize,
}

impl ByteRingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RingState {
                buffer: vec![0; capacity.max(1)],
                read_pos: 0,
                len: 0,
            })),
        }
    }

    /// Append `data`, dropping the oldest bytes if it does not fit.
    pub fn write(&self, data: &[u8]) -> usize {
        let mut state = self.inner.lock();
        let capacity = state.buffer.len();

        // Only the newest `capacity` bytes can survive.
        let data = if data.len() > capacity {
            &data[data.len() - capacity..]
        } else {
            data
        };

        let overflow = (state.len + data.len()).saturating_sub(capacity);
        if overflow > 0 {
            state.read_pos = (state.read_pos + overflow) % capacity;
            state.len -= overflow;
        }

        let mut write_pos = (state.read_pos + state.len) % capacity;
        for &byte in data {
            state.buffer[write_pos] = byte;
            write_pos = (write_pos + 1) % capacity;
        }
        state.len += data.len();

        data.len()
    }

    /// Move up to `output.len()` bytes into `output`; returns the count.
    pub fn read(&self, output: &mut [u8]) -> usize {
        let mut state = self.inner.lock();
        let capacity = state.buffer.len();
        let to_read = state.len.min(output.len());

        for (i, slot) in output.iter_mut().take(to_read).enumerate() {
            *slot = state.buffer[(state.read_pos + i) % capacity];
        }

        state.read_pos = (state.read_pos + to_read) % capacity;
        state.len -= to_read;
        to_read
    }

    pub fn available(&self) -> usize {
        self.inner.lock().len
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().buffer.len()
    }

    pub fn clear(&self) {
        let mut state = self.inner.lock();
        state.read_pos = 0;
        state.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let ring = ByteRingBuffer::new(8);
        assert_eq!(ring.write(&[1, 2, 3]), 3);
        assert_eq!(ring.available(), 3);

        let mut out = [0u8; 8];
        assert_eq!(ring.read(&mut out), 3);
        assert_eq!(&out[..3], &[1, 2, 3]);
        assert_eq!(ring.available(), 0);
    }

    #[test]
    fn test_wraparound() {
        let ring = ByteRingBuffer::new(4);
        ring.write(&[1, 2, 3]);
        let mut out = [0u8; 2];
        ring.read(&mut out);
        ring.write(&[4, 5, 6]);

        let mut out = [0u8; 4];
        assert_eq!(ring.read(&mut out), 4);
        assert_eq!(out, [3, 4, 5, 6]);
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let ring = ByteRingBuffer::new(4);
        ring.write(&[1, 2, 3]);
        ring.write(&[4, 5, 6]);
        assert_eq!(ring.available(), 4);

        let mut out = [0u8; 4];
        ring.read(&mut out);
        assert_eq!(out, [3, 4, 5, 6]);
    }

    #[test]
    fn test_oversized_write_keeps_tail() {
        let ring = ByteRingBuffer::new(3);
        assert_eq!(ring.write(&[1, 2, 3, 4, 5]), 3);

        let mut out = [0u8; 3];
        ring.read(&mut out);
        assert_eq!(out, [3, 4, 5]);
    }

    #[test]
    fn test_clear() {
        let ring = ByteRingBuffer::new(4);
        ring.write(&[9, 9]);
        ring.clear();
        assert_eq!(ring.available(), 0);
        assert_eq!(ring.capacity(), 4);
    }
}
