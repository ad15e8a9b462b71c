//! Buffer Pool: a bounded pool of reusable fixed-size byte buffers,
//! checked out and released back on drop.
//!
//! No direct teacher analogue for pooling itself. The RAII-guard shape
//! follows the lock-guard idiom used throughout the corpus
//! (`parking_lot::Mutex` guards, `clasp-transport`'s `Arc<Mutex<bool>>`
//! running flags) generalized to buffer checkout/return.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::BufferConfig;
use crate::error::{Error, Result};

/// A fixed-capacity pool of `size`-byte buffers.
///
/// Invariant: outstanding-borrow count never exceeds `count`. Enforced by
/// a counting semaphore rather than a panic/unwrap, so a saturated pool
/// makes a checkout wait instead of allocating past capacity.
pub struct BufferPool {
    size: usize,
    direct: bool,
    capacity: usize,
    semaphore: Arc<Semaphore>,
    free: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl BufferPool {
    pub fn new(config: BufferConfig) -> Self {
        let free = (0..config.count).map(|_| vec![0u8; config.size]).collect();
        Self {
            size: config.size,
            direct: config.direct,
            capacity: config.count,
            semaphore: Arc::new(Semaphore::new(config.count)),
            free: Arc::new(Mutex::new(free)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn buffer_size(&self) -> usize {
        self.size
    }

    pub fn is_direct(&self) -> bool {
        self.direct
    }

    /// Number of buffers currently checked out.
    pub fn outstanding(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }

    /// Borrow a buffer, waiting if the pool is fully checked out. Fails
    /// with `ChannelClosed` if the pool has been closed.
    pub async fn checkout(&self) -> Result<PooledBuffer> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::ChannelClosed)?;
        let data = {
            let mut free = self.free.lock();
            free.pop().unwrap_or_else(|| vec![0u8; self.size])
        };
        Ok(PooledBuffer {
            data: Some(data),
            free: self.free.clone(),
            permit: Some(permit),
        })
    }

    /// Close the pool. Safe to call repeatedly; idempotent like the rest
    /// of this crate's shutdown paths.
    pub fn close(&self) {
        self.semaphore.close();
    }
}

/// A checked-out buffer. Returns to its pool when dropped or when
/// `release()` is called explicitly; calling `release()` twice, or letting
/// drop run after an explicit release, is a no-op.
pub struct PooledBuffer {
    data: Option<Vec<u8>>,
    free: Arc<Mutex<Vec<Vec<u8>>>>,
    permit: Option<OwnedSemaphorePermit>,
}

impl PooledBuffer {
    pub fn as_slice(&self) -> &[u8] {
        self.data.as_deref().unwrap_or(&[])
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.data.as_deref_mut().unwrap_or(&mut [])
    }

    pub fn len(&self) -> usize {
        self.data.as_ref().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Explicitly release the buffer back to the pool. Idempotent.
    pub fn release(&mut self) {
        if let Some(buf) = self.data.take() {
            self.free.lock().push(buf);
        }
        // Dropping the permit (if still held) frees the slot exactly once.
        self.permit.take();
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        self.release();
    }
}
