//! Buffer pool implementation for efficient buffer reuse
//!
//! This module provides a thread-safe, bounded pool of byte buffers. The
//! frame reader borrows its 4-byte length-header buffer from here so that a
//! busy listener does not allocate one per connection.
//!
//! A borrowed [`PooledBuffer`] is exclusively owned until it is dropped; the
//! drop hands the cleared buffer back to the free list and then releases the
//! semaphore permit, on every exit path.

use bytes::BytesMut;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// A pool of reusable byte buffers
///
/// Cloning the pool is cheap and yields a handle to the same buffers.
#[derive(Clone)]
pub struct BufferPool {
    /// Inner implementation wrapped in Arc for thread-safety
    inner: Arc<BufferPoolInner>,
}

/// Inner implementation of the buffer pool
struct BufferPoolInner {
    /// Limits the number of buffers that can be borrowed at once
    semaphore: Arc<Semaphore>,
    /// Buffers returned by previous borrowers
    free: Mutex<Vec<BytesMut>>,
    /// Capacity of freshly allocated buffers
    buffer_capacity: usize,
    /// Upper bound given at construction
    max_buffers: usize,
}

/// A buffer borrowed from the pool
///
/// When dropped, the buffer is cleared and returned to the pool.
pub struct PooledBuffer {
    /// The actual buffer
    pub buffer: BytesMut,
    /// The pool this buffer goes back to
    pool: BufferPool,
    /// Released after the buffer is back in the free list
    _permit: OwnedSemaphorePermit,
}

impl BufferPool {
    /// Create a new buffer pool
    ///
    /// # Parameters
    ///
    /// * `max_buffers` - Maximum number of buffers that can be borrowed at once
    /// * `buffer_capacity` - Default capacity of each buffer
    pub fn new(max_buffers: usize, buffer_capacity: usize) -> Self {
        Self {
            inner: Arc::new(BufferPoolInner {
                semaphore: Arc::new(Semaphore::new(max_buffers)),
                free: Mutex::new(Vec::with_capacity(max_buffers)),
                buffer_capacity,
                max_buffers,
            }),
        }
    }

    /// Borrow a buffer from the pool
    ///
    /// If the pool is at capacity, this waits until a buffer is returned.
    ///
    /// # Returns
    ///
    /// `None` only once the pool has been [closed](Self::close).
    pub async fn get_buffer(&self) -> Option<PooledBuffer> {
        let permit = Arc::clone(&self.inner.semaphore).acquire_owned().await.ok()?;
        Some(self.wrap(permit))
    }

    /// Try to borrow a buffer from the pool without waiting
    ///
    /// # Returns
    ///
    /// Some(PooledBuffer) if a buffer is available, None otherwise
    pub fn try_get_buffer(&self) -> Option<PooledBuffer> {
        let permit = Arc::clone(&self.inner.semaphore).try_acquire_owned().ok()?;
        Some(self.wrap(permit))
    }

    /// Number of buffers that can currently be borrowed
    pub fn available(&self) -> usize {
        self.inner.semaphore.available_permits()
    }

    /// Maximum number of buffers that can be borrowed at once
    pub fn max_buffers(&self) -> usize {
        self.inner.max_buffers
    }

    /// Number of idle buffers kept for reuse
    pub fn idle(&self) -> usize {
        self.inner
            .free
            .lock()
            .map(|free| free.len())
            .unwrap_or_default()
    }

    /// Close the pool
    ///
    /// Pending and future borrows return `None`; outstanding buffers are
    /// still returned normally when dropped.
    pub fn close(&self) {
        self.inner.semaphore.close();
    }

    fn wrap(&self, permit: OwnedSemaphorePermit) -> PooledBuffer {
        let recycled = self
            .inner
            .free
            .lock()
            .ok()
            .and_then(|mut free| free.pop());

        let buffer = recycled
            .unwrap_or_else(|| BytesMut::with_capacity(self.inner.buffer_capacity));

        PooledBuffer {
            buffer,
            pool: self.clone(),
            _permit: permit,
        }
    }
}

impl Deref for PooledBuffer {
    type Target = BytesMut;

    fn deref(&self) -> &BytesMut {
        &self.buffer
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.clear();

        if let Ok(mut free) = self.pool.inner.free.lock() {
            if free.len() < self.pool.inner.max_buffers {
                free.push(buffer);
            }
        }

        // The permit is released when the fields are dropped
    }
}
