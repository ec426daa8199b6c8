// libex10-rs/libex10/src/device/fifo_pool.rs

//! Fixed pool of EventFifo buffers.
//!
//! A buffer leaves the pool as a [`FifoBufferNode`] and goes back when the
//! node is dropped, so the number of free buffers plus the number of live
//! nodes always equals the pool size.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, trace};

use crate::constants::EVENT_FIFO_SIZE;
use crate::error::Module;
use crate::protocol::event_fifo::PacketIter;
use crate::{Error, Result};

type ReplenishHook = Arc<dyn Fn() + Send + Sync>;

/// Fixed set of equally sized EventFifo buffers.
pub struct FifoBufferPool {
    free: Mutex<Vec<Vec<u8>>>,
    buffer_size: usize,
    count: usize,
    replenish: Mutex<Option<ReplenishHook>>,
}

impl fmt::Debug for FifoBufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FifoBufferPool")
            .field("count", &self.count)
            .field("buffer_size", &self.buffer_size)
            .field("free", &self.free_count())
            .finish()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl FifoBufferPool {
    /// Allocate `count` buffers of `buffer_size` bytes each. A buffer must
    /// hold a full device fifo.
    pub fn new(count: usize, buffer_size: usize) -> Result<Arc<Self>> {
        if count == 0 {
            return Err(Error::BadParamValue {
                module: Module::FifoBufferList,
                reason: "buffer pool needs at least one buffer",
            });
        }
        if buffer_size < EVENT_FIFO_SIZE {
            return Err(Error::BadParamLength {
                module: Module::FifoBufferList,
                expected: EVENT_FIFO_SIZE,
                actual: buffer_size,
            });
        }
        let free = (0..count).map(|_| vec![0u8; buffer_size]).collect();
        debug!("fifo pool: {} buffers of {} bytes", count, buffer_size);
        Ok(Arc::new(Self {
            free: Mutex::new(free),
            buffer_size,
            count,
            replenish: Mutex::new(None),
        }))
    }

    /// Take a buffer from the free list.
    pub fn acquire(self: &Arc<Self>) -> Option<FifoBufferNode> {
        let data = lock(&self.free).pop()?;
        Some(FifoBufferNode {
            data,
            len: 0,
            pool: Arc::clone(self),
            notify: true,
        })
    }

    /// Buffers currently in the free list.
    pub fn free_count(&self) -> usize {
        lock(&self.free).len()
    }

    /// Total number of buffers owned by the pool.
    pub fn capacity(&self) -> usize {
        self.count
    }

    /// Bytes per buffer.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Install the function called when a buffer returns to an empty free
    /// list. Reading the fifo stalls while no buffer is free; the hook lets
    /// the owner restart it.
    pub fn set_replenish_hook<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *lock(&self.replenish) = Some(Arc::new(hook));
    }

    /// Remove the replenish hook.
    pub fn clear_replenish_hook(&self) {
        *lock(&self.replenish) = None;
    }

    fn release(&self, mut data: Vec<u8>, notify: bool) {
        data.resize(self.buffer_size, 0);
        let was_empty = {
            let mut free = lock(&self.free);
            let was_empty = free.is_empty();
            free.push(data);
            was_empty
        };
        trace!("fifo pool: buffer released, {} free", self.free_count());
        if was_empty && notify {
            let hook = lock(&self.replenish).clone();
            if let Some(hook) = hook {
                hook();
            }
        }
    }
}

/// One EventFifo buffer on loan from a [`FifoBufferPool`].
pub struct FifoBufferNode {
    data: Vec<u8>,
    len: usize,
    pool: Arc<FifoBufferPool>,
    notify: bool,
}

impl fmt::Debug for FifoBufferNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FifoBufferNode")
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl FifoBufferNode {
    /// Size of the backing storage.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Valid bytes held.
    pub fn len(&self) -> usize {
        self.len
    }

    /// No valid bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Valid bytes.
    pub fn data(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// The whole backing storage, for filling.
    pub fn raw_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Mark the first `len` bytes valid.
    pub fn set_len(&mut self, len: usize) -> Result<()> {
        if len > self.capacity() {
            return Err(Error::FreeEventFifoBuffersLengthMismatch {
                module: Module::FifoBufferList,
                capacity: self.capacity(),
                requested: len,
            });
        }
        self.len = len;
        Ok(())
    }

    /// Iterate the packets held in the valid bytes.
    pub fn packets(&self) -> PacketIter<'_> {
        PacketIter::new(self.data())
    }

    /// Return the buffer without invoking the replenish hook.
    pub fn discard(mut self) {
        self.notify = false;
    }
}

impl Drop for FifoBufferNode {
    fn drop(&mut self) {
        let data = std::mem::take(&mut self.data);
        self.pool.release(data, self.notify);
    }
}

/// What the interrupt path hands to the fifo consumer.
#[derive(Debug)]
pub enum FifoEvent {
    /// Fifo bytes read from the device.
    Data(FifoBufferNode),
    /// Reading the fifo failed.
    Error(Error),
}
