//! Bounded batch queue between the scanner and the worker pool
//!
//! A full queue blocks the producer; closing it lets consumers drain the
//! remaining batches and then observe end of stream.

use async_channel::{bounded, Receiver, Sender};
use bytes::BytesMut;

use crate::error::{IngestionError, Result};

/// A whole number of concatenated items in one pooled buffer
///
/// Owned by exactly one stage at a time: scanner -> queue -> worker -> pool.
#[derive(Debug)]
pub struct Batch {
    /// Submission sequence number (0-based)
    pub seq: u64,
    /// Items contained in the buffer
    pub items: usize,
    buf: BytesMut,
}

impl Batch {
    pub fn new(seq: u64, items: usize, buf: BytesMut) -> Self {
        Self { seq, items, buf }
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Payload bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Give the buffer back, typically to `BufferPool::release`
    pub fn into_buffer(self) -> BytesMut {
        self.buf
    }
}

/// Create a bounded batch queue
pub fn batch_queue(capacity: usize) -> (BatchSender, BatchReceiver) {
    let (tx, rx) = bounded(capacity.max(1));
    (BatchSender { tx }, BatchReceiver { rx })
}

/// Producer half, owned by the scanner
#[derive(Debug)]
pub struct BatchSender {
    tx: Sender<Batch>,
}

impl BatchSender {
    /// Submit a batch, blocking the calling thread while the queue is full
    ///
    /// Must not be called from an async context; run the scanner on a blocking thread.
    pub fn submit_blocking(&self, batch: Batch) -> Result<()> {
        self.tx
            .send_blocking(batch)
            .map_err(|_| IngestionError::QueueClosed)
    }

    /// Submit a batch, waiting asynchronously while the queue is full
    pub async fn submit(&self, batch: Batch) -> Result<()> {
        self.tx
            .send(batch)
            .await
            .map_err(|_| IngestionError::QueueClosed)
    }

    /// Close the queue; returns false if it was already closed
    pub fn close(&self) -> bool {
        self.tx.close()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Batches currently waiting
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }
}

/// Consumer half, cloned once per worker
#[derive(Debug, Clone)]
pub struct BatchReceiver {
    rx: Receiver<Batch>,
}

impl BatchReceiver {
    /// Next batch in FIFO order
    ///
    /// Returns `None` only once the queue is closed and fully drained.
    pub async fn next(&self) -> Option<Batch> {
        self.rx.recv().await.ok()
    }

    /// Blocking variant of [`BatchReceiver::next`]
    pub fn next_blocking(&self) -> Option<Batch> {
        self.rx.recv_blocking().ok()
    }

    /// Close the queue from the consumer side
    ///
    /// Blocked producers wake up with `QueueClosed`.
    pub fn close(&self) -> bool {
        self.rx.close()
    }

    pub fn is_closed(&self) -> bool {
        self.rx.is_closed()
    }

    /// Batches currently waiting
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.rx.capacity()
    }
}
