use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use webbind_native::{
    describe_error, event_queue, from_value, to_value, Callback, EventReceiver, EventSender,
    Handle, NativeRuntime, Value,
};

use crate::options::WorkerOptions;
use crate::{Result, WorkerError};

/// One entry of the inbound queue, in native delivery order.
enum Inbound {
    Message(Value),
    Error(Value),
    /// Pushed by `terminate` so a blocked receiver wakes up.
    Closed,
}

/// A dedicated native `Worker`.
///
/// Messages and error reports from the worker share one queue, so
/// [`receive`](Self::receive) returns them in the order the worker produced
/// them.
pub struct BackgroundWorker {
    handle: Handle,
    inbound: EventReceiver<Inbound>,
    /// Kept for the close marker; also keeps the queue open if the native
    /// side drops its callbacks.
    closer: EventSender<Inbound>,
    terminated: AtomicBool,
}

impl BackgroundWorker {
    /// Start a classic worker running `script_url`.
    pub fn new(runtime: &Arc<dyn NativeRuntime>, script_url: &str) -> Result<Self> {
        Self::with_options(runtime, WorkerOptions::new(script_url))
    }

    pub fn with_options(runtime: &Arc<dyn NativeRuntime>, options: WorkerOptions) -> Result<Self> {
        let handle = runtime.construct(
            "Worker",
            vec![Value::from(options.script_url.as_str()), options.to_native()?],
        )?;
        tracing::debug!(url = %options.script_url, name = ?options.name, "worker started");
        Self::from_handle(handle)
    }

    /// Take over an existing native worker, replacing its `onmessage` and
    /// `onerror` handlers.
    pub fn from_handle(handle: Handle) -> Result<Self> {
        let (tx, inbound) = event_queue("worker-inbound");
        handle.set("onmessage", Value::Function(on_message(tx.clone())))?;
        handle.set("onerror", Value::Function(on_error(tx.clone())))?;
        Ok(Self {
            handle,
            inbound,
            closer: tx,
            terminated: AtomicBool::new(false),
        })
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Post `payload` to the worker. Does not wait for it to be handled.
    pub fn send(&self, payload: Value) -> Result<()> {
        if self.is_terminated() {
            return Err(WorkerError::Terminated);
        }
        self.handle.call("postMessage", vec![payload])?;
        tracing::trace!("message posted to worker");
        Ok(())
    }

    /// Serialize `message` into a `Value` and post it.
    pub fn send_serialized<T: Serialize>(&self, message: &T) -> Result<()> {
        self.send(to_value(message)?)
    }

    /// Block until the worker delivers something.
    ///
    /// - `Ok(Some(payload))`: a message
    /// - `Err(WorkerError::Reported(payload))`: an error the worker reported
    /// - `Ok(None)`: the worker was terminated and everything delivered
    ///   before that has been received
    ///
    /// Never blocks once the worker is terminated. Must not be called from
    /// the native event loop or inside an async runtime.
    pub fn receive(&self) -> Result<Option<Value>> {
        let next = self.inbound.recv_blocking_unless(|| self.is_terminated());
        unpack(next)
    }

    /// Like [`receive`](Self::receive), but returns `Ok(None)` instead of
    /// blocking when nothing is queued.
    pub fn try_receive(&self) -> Result<Option<Value>> {
        unpack(self.inbound.try_recv())
    }

    /// Receive a message and deserialize it into `T`.
    ///
    /// A message that does not decode is still consumed; it comes back in
    /// `WorkerError::Undecodable`.
    pub fn receive_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let Some(payload) = self.receive()? else {
            return Ok(None);
        };
        match from_value(payload.clone()) {
            Ok(message) => Ok(Some(message)),
            Err(source) => Err(WorkerError::Undecodable { payload, source }),
        }
    }

    /// Stop the worker. Idempotent.
    ///
    /// Messages already queued can still be received; after them,
    /// `receive` returns `Ok(None)`.
    pub fn terminate(&self) -> Result<()> {
        if self.is_terminated() {
            return Ok(());
        }
        self.handle.call("terminate", vec![])?;
        if !self.terminated.swap(true, Ordering::SeqCst) {
            self.closer.push(Inbound::Closed);
            tracing::debug!("worker terminated");
        }
        Ok(())
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

fn unpack(next: Option<Inbound>) -> Result<Option<Value>> {
    match next {
        Some(Inbound::Message(payload)) => Ok(Some(payload)),
        Some(Inbound::Error(payload)) => Err(WorkerError::Reported(payload)),
        Some(Inbound::Closed) | None => Ok(None),
    }
}

/// Read a field of a native event, live object or plain map.
fn event_field(event: &Value, field: &str) -> webbind_native::Result<Value> {
    match event {
        Value::Object(handle) => handle.get(field),
        other => Ok(other.field(field).cloned().unwrap_or_default()),
    }
}

fn on_message(tx: EventSender<Inbound>) -> Callback {
    Callback::new(move |args| {
        let event = args.first().cloned().unwrap_or_default();
        let inbound = match event_field(&event, "data") {
            Ok(data) => Inbound::Message(data),
            Err(err) => {
                tracing::warn!(%err, "unreadable worker message");
                Inbound::Error(Value::from(err.to_string()))
            }
        };
        tx.push(inbound);
    })
}

fn on_error(tx: EventSender<Inbound>) -> Callback {
    Callback::new(move |args| {
        let event = args.first().cloned().unwrap_or_default();
        let message = describe_error(&event);
        tracing::debug!(%message, "worker reported an error");
        let payload = if message.is_empty() {
            event
        } else {
            Value::from(message)
        };
        tx.push(Inbound::Error(payload));
    })
}

impl fmt::Debug for BackgroundWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackgroundWorker")
            .field("terminated", &self.is_terminated())
            .finish_non_exhaustive()
    }
}
