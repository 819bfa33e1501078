//! Buffer pool - recycles batch buffers across the scanner and workers

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::BytesMut;
use crossbeam_queue::SegQueue;
use tracing::trace;

/// Concurrency-safe free list of byte buffers
///
/// `acquire` never blocks: it pops an idle buffer or allocates a new one with
/// the capacity hint. `release` clears the buffer (length 0, capacity kept)
/// before pooling it. Buffers that grew past the hint are pooled as-is.
pub struct BufferPool {
    free: SegQueue<BytesMut>,
    capacity_hint: usize,
    allocated: AtomicU64,
    reused: AtomicU64,
}

/// Pool counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Buffers allocated because the free list was empty
    pub allocated: u64,
    /// Acquisitions served from the free list
    pub reused: u64,
    /// Buffers currently idle in the pool
    pub idle: usize,
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("capacity_hint", &self.capacity_hint)
            .field("idle", &self.free.len())
            .finish()
    }
}

impl BufferPool {
    /// Create an empty pool whose new buffers reserve `capacity_hint` bytes
    pub fn new(capacity_hint: usize) -> Self {
        Self {
            free: SegQueue::new(),
            capacity_hint,
            allocated: AtomicU64::new(0),
            reused: AtomicU64::new(0),
        }
    }

    /// Capacity reserved by freshly allocated buffers
    pub fn capacity_hint(&self) -> usize {
        self.capacity_hint
    }

    /// Take a zero-length buffer
    #[inline]
    pub fn acquire(&self) -> BytesMut {
        match self.free.pop() {
            Some(buf) => {
                self.reused.fetch_add(1, Ordering::Relaxed);
                buf
            }
            None => {
                self.allocated.fetch_add(1, Ordering::Relaxed);
                trace!(capacity = self.capacity_hint, "allocating pool buffer");
                BytesMut::with_capacity(self.capacity_hint)
            }
        }
    }

    /// Reset a buffer and return it to the pool
    #[inline]
    pub fn release(&self, mut buf: BytesMut) {
        buf.clear();
        self.free.push(buf);
    }

    /// Number of idle buffers
    pub fn idle(&self) -> usize {
        self.free.len()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            allocated: self.allocated.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            idle: self.free.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_acquire_allocates_with_hint() {
        let pool = BufferPool::new(1024);
        let buf = pool.acquire();
        assert_eq!(buf.len(), 0);
        assert!(buf.capacity() >= 1024);
        assert_eq!(pool.stats().allocated, 1);
    }

    #[test]
    fn test_released_buffer_is_reset() {
        let pool = BufferPool::new(64);
        let mut buf = pool.acquire();
        buf.extend_from_slice(b"some previous batch content\n");
        pool.release(buf);

        let buf = pool.acquire();
        assert_eq!(buf.len(), 0);
        assert!(buf.capacity() >= 64);

        let stats = pool.stats();
        assert_eq!(stats.allocated, 1);
        assert_eq!(stats.reused, 1);
        assert_eq!(stats.idle, 0);
    }

    #[test]
    fn test_grown_buffer_keeps_capacity() {
        let pool = BufferPool::new(8);
        let mut buf = pool.acquire();
        buf.extend_from_slice(&[b'x'; 4096]);
        pool.release(buf);

        let buf = pool.acquire();
        assert_eq!(buf.len(), 0);
        assert!(buf.capacity() >= 4096);
    }

    #[test]
    fn test_concurrent_acquire_release() {
        let pool = Arc::new(BufferPool::new(128));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        let mut buf = pool.acquire();
                        assert!(buf.is_empty());
                        buf.extend_from_slice(&[i as u8; 32]);
                        pool.release(buf);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let stats = pool.stats();
        assert_eq!(stats.allocated + stats.reused, 8000);
        assert!(stats.allocated <= 8);
        assert_eq!(stats.idle as u64, stats.allocated);
    }
}
