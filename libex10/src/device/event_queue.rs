// libex10-rs/libex10/src/device/event_queue.rs

//! Packet queue between the IRQ path and the application.
//!
//! The fifo-data callback pushes whole buffers; readers walk them one
//! packet at a time. A buffer goes back to its pool once its last packet
//! has been removed.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, trace};

use crate::device::fifo_pool::FifoEvent;
use crate::device::protocol::Ex10Protocol;
use crate::error::{Outcome, StopReason};
use crate::protocol::event_fifo::{EventFifoPacket, parse_event_packet};
use crate::types::InterruptFlags;
use crate::{Error, Result};

/// Head of the queue as seen by [`EventFifoQueue::packet_peek`].
#[derive(Debug)]
pub enum QueueItem<'a> {
    /// A decoded packet borrowed from the head buffer.
    Packet(EventFifoPacket<'a>),
    /// Failure raised on the IRQ path, queued in arrival order.
    Error(&'a Error),
}

#[derive(Debug, Default)]
struct QueueState {
    events: VecDeque<FifoEvent>,
    /// Offset of the next packet in the front buffer.
    cursor: usize,
    wake: bool,
}

impl QueueState {
    fn head(&self) -> Option<QueueItem<'_>> {
        match self.events.front()? {
            FifoEvent::Data(node) => {
                let mut rest = &node.data()[self.cursor..];
                Some(QueueItem::Packet(parse_event_packet(&mut rest)))
            }
            FifoEvent::Error(e) => Some(QueueItem::Error(e)),
        }
    }

    /// Step past the head item. Returns the front event once it is used up.
    fn advance(&mut self) -> Option<FifoEvent> {
        let consumed = match self.events.front()? {
            FifoEvent::Data(node) => {
                let data = node.data();
                let mut rest = &data[self.cursor..];
                parse_event_packet(&mut rest);
                self.cursor = data.len() - rest.len();
                self.cursor >= data.len()
            }
            FifoEvent::Error(_) => true,
        };
        if !consumed {
            return None;
        }
        self.cursor = 0;
        self.events.pop_front()
    }
}

/// Queue of EventFifo buffers waiting for the consumer, with packet-level access.
#[derive(Debug, Default)]
pub struct EventFifoQueue {
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl EventFifoQueue {
    /// Empty queue.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue an event from the IRQ path. Empty buffers go straight back to
    /// the pool.
    pub fn push(&self, event: FifoEvent) {
        if let FifoEvent::Data(node) = &event {
            if node.is_empty() {
                return;
            }
            trace!("event queue: buffer of {} bytes", node.len());
        }
        self.lock().events.push_back(event);
        self.ready.notify_all();
    }

    /// Buffers and errors waiting, not packets.
    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    /// Pool buffers currently held by the queue.
    pub fn buffer_count(&self) -> usize {
        self.lock()
            .events
            .iter()
            .filter(|e| matches!(e, FifoEvent::Data(_)))
            .count()
    }

    /// No buffers or errors queued.
    pub fn is_empty(&self) -> bool {
        self.lock().events.is_empty()
    }

    /// Drop everything queued, returning buffers to their pool.
    pub fn clear(&self) {
        let dropped = {
            let mut state = self.lock();
            state.cursor = 0;
            std::mem::take(&mut state.events)
        };
        if !dropped.is_empty() {
            debug!("event queue: discarding {} queued events", dropped.len());
        }
    }

    /// Run `f` on the head of the queue, or return `None` when empty.
    ///
    /// `f` runs with the queue locked and must not call back into it.
    pub fn packet_peek<R>(&self, f: impl FnOnce(QueueItem<'_>) -> R) -> Option<R> {
        let state = self.lock();
        state.head().map(f)
    }

    /// Remove the head packet or error.
    pub fn packet_remove(&self) {
        let finished = self.lock().advance();
        // buffer returns to the pool here, outside the queue lock
        drop(finished);
    }

    /// Block until something is queued or [`packet_unwait`] is called.
    ///
    /// [`packet_unwait`]: EventFifoQueue::packet_unwait
    pub fn packet_wait(&self) {
        let state = self.lock();
        let mut state = self
            .ready
            .wait_while(state, |s| s.events.is_empty() && !s.wake)
            .unwrap_or_else(|e| e.into_inner());
        state.wake = false;
    }

    /// As [`packet_wait`] with an upper bound. Returns whether an item is
    /// available.
    ///
    /// [`packet_wait`]: EventFifoQueue::packet_wait
    pub fn packet_wait_with_timeout(&self, timeout: Duration) -> bool {
        let state = self.lock();
        let (mut state, _) = self
            .ready
            .wait_timeout_while(state, timeout, |s| s.events.is_empty() && !s.wake)
            .unwrap_or_else(|e| e.into_inner());
        state.wake = false;
        !state.events.is_empty()
    }

    /// Release one blocked waiter even though nothing was queued.
    pub fn packet_unwait(&self) {
        self.lock().wake = true;
        self.ready.notify_all();
    }

    /// Hand every queued packet to `handler`, removing each one it accepts.
    ///
    /// Stops at the first queued error, or when `handler` returns an error
    /// or a stop request. Returns the number of packets handled.
    pub fn drain_with<F>(&self, mut handler: F) -> Outcome<usize>
    where
        F: FnMut(&EventFifoPacket<'_>) -> Outcome<()>,
    {
        let mut handled = 0usize;
        loop {
            let step = self.packet_peek(|item| match item {
                QueueItem::Packet(packet) => handler(&packet),
                QueueItem::Error(e) => Outcome::Error(e.clone()),
            });
            let Some(step) = step else {
                return Outcome::Ok(handled);
            };
            self.packet_remove();
            match step {
                Outcome::Ok(()) => handled += 1,
                Outcome::Error(e) => return Outcome::Error(e),
                Outcome::StopRequested(reason) => return Outcome::StopRequested(reason),
            }
        }
    }

    /// Wait up to `idle` for more packets, draining as they arrive, until
    /// `handler` stops the loop. An idle period ends it with
    /// [`StopReason::IdleTimeout`].
    pub fn drain_until_idle<F>(&self, idle: Duration, mut handler: F) -> Outcome<usize>
    where
        F: FnMut(&EventFifoPacket<'_>) -> Outcome<()>,
    {
        let mut total = 0usize;
        loop {
            if !self.packet_wait_with_timeout(idle) {
                return Outcome::StopRequested(StopReason::IdleTimeout);
            }
            match self.drain_with(&mut handler) {
                Outcome::Ok(n) => total += n,
                other => return other.map(|n| total + n),
            }
        }
    }

    /// Feed this queue from `protocol`'s IRQ path. Interrupts in `mask` are
    /// enabled and any of them triggers an EventFifo read.
    pub fn attach(self: &Arc<Self>, protocol: &Ex10Protocol, mask: InterruptFlags) -> Result<()> {
        let queue = Arc::clone(self);
        protocol.register_fifo_data_callback(move |event| queue.push(event))?;
        let attached = protocol.register_interrupt_callback(mask, move |flags| flags.intersects(mask));
        if attached.is_err() {
            protocol.unregister_fifo_data_callback();
        }
        attached
    }

    /// Undo [`attach`](EventFifoQueue::attach).
    pub fn detach(&self, protocol: &Ex10Protocol) -> Result<()> {
        protocol.unregister_fifo_data_callback();
        protocol.unregister_interrupt_callback()
    }
}
