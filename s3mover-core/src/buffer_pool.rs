use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};

/// Default capacity of a freshly created compression buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 64 * 1024;

/// A pool of reusable byte buffers for in-memory compression.
///
/// Buffers are checked out with [`BufferPool::acquire`] and go back to the pool
/// when the returned [`PooledBuffer`] is dropped, including on error paths.
/// At most `max_buffers` idle buffers are retained; extras are freed.
#[derive(Debug)]
pub struct BufferPool {
    recycler: Sender<Vec<u8>>,
    receiver: Receiver<Vec<u8>>,
    default_capacity: usize,
    max_buffers: usize,
    stats: Arc<PoolStatsInner>,
}

impl BufferPool {
    pub fn new(default_capacity: usize, max_buffers: usize) -> Self {
        let (tx, rx) = bounded(max_buffers.max(1));
        Self {
            recycler: tx,
            receiver: rx,
            default_capacity,
            max_buffers: max_buffers.max(1),
            stats: Arc::new(PoolStatsInner::default()),
        }
    }

    /// Checks out an empty buffer, reusing an idle one when available.
    pub fn acquire(&self) -> PooledBuffer {
        let buffer = match self.receiver.try_recv() {
            Ok(mut buffer) => {
                buffer.clear();
                self.stats.recycled.fetch_add(1, Ordering::Relaxed);
                buffer
            }
            Err(_) => {
                self.stats.created.fetch_add(1, Ordering::Relaxed);
                Vec::with_capacity(self.default_capacity)
            }
        };
        PooledBuffer {
            buffer,
            recycler: self.recycler.clone(),
            stats: Arc::clone(&self.stats),
        }
    }

    pub fn default_capacity(&self) -> usize {
        self.default_capacity
    }

    pub fn max_buffers(&self) -> usize {
        self.max_buffers
    }

    /// Number of buffers currently idle in the pool.
    pub fn idle(&self) -> usize {
        self.receiver.len()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            created: self.stats.created.load(Ordering::Relaxed),
            recycled: self.stats.recycled.load(Ordering::Relaxed),
            dropped: self.stats.dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY, 16)
    }
}

#[derive(Debug, Default)]
struct PoolStatsInner {
    created: AtomicUsize,
    recycled: AtomicUsize,
    dropped: AtomicUsize,
}

/// Point-in-time pool counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub created: usize,
    pub recycled: usize,
    pub dropped: usize,
}

/// A buffer checked out of a [`BufferPool`]; returned to the pool on drop.
#[derive(Debug)]
pub struct PooledBuffer {
    buffer: Vec<u8>,
    recycler: Sender<Vec<u8>>,
    stats: Arc<PoolStatsInner>,
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.buffer
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.clear();
        // full pool: let the buffer go
        if self.recycler.try_send(buffer).is_err() {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}
