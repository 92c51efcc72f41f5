//! Hand-off between native callbacks and blocking callers.
//!
//! Native callbacks run on the runtime's cooperative event loop and must
//! never block it. Host code wants a plain blocking pull. `event_queue`
//! connects the two with an unbounded tokio channel:
//!
//! - **`EventSender::push`** never blocks, so it is safe inside a callback
//! - **`EventReceiver::recv_blocking`** parks the calling thread until the
//!   next event, or returns `None` once every sender is gone
//!
//! Events come out in the order they were pushed. The queue is unbounded:
//! if nobody drains it, it grows. That is the price of never stalling the
//! event loop.
//!
//! # Example
//!
//! ```rust
//! use webbind_native::event_queue;
//!
//! let (tx, rx) = event_queue::<u32>("example");
//! tx.push(1);
//! tx.push(2);
//! drop(tx);
//!
//! assert_eq!(rx.recv_blocking(), Some(1));
//! assert_eq!(rx.recv_blocking(), Some(2));
//! assert_eq!(rx.recv_blocking(), None);
//! ```

use tokio::sync::{mpsc, Mutex};

/// Create a connected sender/receiver pair.
///
/// `source` names the queue in log output.
pub fn event_queue<T>(source: &'static str) -> (EventSender<T>, EventReceiver<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        EventSender { tx, source },
        EventReceiver {
            rx: Mutex::new(rx),
            source,
        },
    )
}

/// Producer half. Cheap to clone; one clone per installed callback.
pub struct EventSender<T> {
    tx: mpsc::UnboundedSender<T>,
    source: &'static str,
}

impl<T> Clone for EventSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            source: self.source,
        }
    }
}

impl<T> EventSender<T> {
    /// Enqueue an event without blocking.
    ///
    /// Returns false if the receiver is gone and the event was dropped.
    pub fn push(&self, event: T) -> bool {
        match self.tx.send(event) {
            Ok(()) => {
                tracing::trace!(source = self.source, "event queued");
                true
            }
            Err(_) => {
                tracing::warn!(source = self.source, "event dropped: receiver is gone");
                false
            }
        }
    }

    /// Check if the receiving half has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half. Shareable between threads; pulls are serialised.
pub struct EventReceiver<T> {
    rx: Mutex<mpsc::UnboundedReceiver<T>>,
    source: &'static str,
}

impl<T> EventReceiver<T> {
    /// Block the calling thread until the next event.
    ///
    /// Returns `None` once all senders are dropped and the queue is drained.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    /// Never call this from a native callback: the event loop would wait on
    /// itself.
    pub fn recv_blocking(&self) -> Option<T> {
        let mut rx = self.rx.blocking_lock();
        let event = rx.blocking_recv();
        tracing::trace!(source = self.source, received = event.is_some(), "event pulled");
        event
    }

    /// Take the next event if one is already queued.
    ///
    /// Never waits. While another caller is parked in a blocking pull this
    /// returns `None`; that caller receives the next event.
    pub fn try_recv(&self) -> Option<T> {
        let mut rx = self.rx.try_lock().ok()?;
        rx.try_recv().ok()
    }

    /// Like `recv_blocking`, but only waits while `closed()` is false.
    ///
    /// `closed` is evaluated after acquiring the receiver, so a caller that
    /// queued behind another blocked caller sees state changes made while it
    /// was waiting. Once closed, this never blocks: it returns whatever is
    /// still queued, then `None`.
    pub fn recv_blocking_unless(&self, closed: impl Fn() -> bool) -> Option<T> {
        let mut rx = self.rx.blocking_lock();
        if closed() {
            rx.try_recv().ok()
        } else {
            rx.blocking_recv()
        }
    }
}
