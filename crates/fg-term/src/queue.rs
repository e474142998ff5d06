// SPDX-License-Identifier: MIT
//
// Event queue: the only structure shared between the input thread and
// the owning thread.
//
// Producers hold cloneable `EventSender`s; the single consumer owns the
// `EventQueue`. Underneath is an unbounded `mpsc` channel, so appending
// never blocks and each event is received exactly once, in send order.
// A shared counter tracks how many events are waiting so the consumer can
// ask without popping.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use crate::event::Event;

/// Producer handle for an [`EventQueue`].
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<Event>,
    pending: Arc<AtomicUsize>,
}

impl EventSender {
    /// Append an event. Never blocks.
    ///
    /// Returns `false` if the consumer is gone; the event is discarded.
    pub fn send(&self, event: Event) -> bool {
        tracing::trace!(?event, "event queued");
        self.pending.fetch_add(1, Ordering::AcqRel);
        if self.tx.send(event).is_ok() {
            true
        } else {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            false
        }
    }
}

/// FIFO event queue, consumed by exactly one owner.
#[derive(Debug)]
pub struct EventQueue {
    rx: Receiver<Event>,
    sender: EventSender,
}

impl EventQueue {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            rx,
            sender: EventSender {
                tx,
                pending: Arc::new(AtomicUsize::new(0)),
            },
        }
    }

    /// A new producer handle for this queue.
    #[must_use]
    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    /// Append an event from the consumer side.
    pub fn queue_event(&self, event: Event) {
        self.sender.send(event);
    }

    /// Remove and return the oldest event, if any. Never blocks.
    pub fn pop(&self) -> Option<Event> {
        match self.rx.try_recv() {
            Ok(event) => {
                self.sender.pending.fetch_sub(1, Ordering::AcqRel);
                Some(event)
            }
            // The queue keeps its own sender, so it never disconnects.
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Number of events waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sender.pending.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
