use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use super::{event, EventLoop, Handlers};
use crate::{Error, Handle, NativeObject, Result, Value};

/// Behaviour of a fake worker script: called once per posted message.
pub type WorkerScript = Arc<dyn Fn(&WorkerScope, Value) + Send + Sync>;

/// What a worker script can do in response to a message.
pub struct WorkerScope {
    worker: Weak<FakeWorker>,
}

impl WorkerScope {
    /// Equivalent of `postMessage` inside the worker.
    pub fn post_message(&self, data: Value) {
        self.dispatch("onmessage", event(vec![("data", data)]));
    }

    /// Report an uncaught error, as `onerror` would see it.
    pub fn raise_error(&self, message: &str) {
        self.dispatch(
            "onerror",
            event(vec![
                ("type", Value::from("error")),
                ("message", Value::from(message)),
            ]),
        );
    }

    fn dispatch(&self, slot: &'static str, event: Value) {
        if let Some(worker) = self.worker.upgrade() {
            worker.deliver(slot, event);
        }
    }
}

/// A fake dedicated `Worker`.
///
/// Events are delivered through the event loop; once terminated, nothing
/// further is delivered and posted messages are dropped.
pub struct FakeWorker {
    event_loop: EventLoop,
    url: String,
    name: Option<String>,
    script: Option<WorkerScript>,
    terminated: AtomicBool,
    /// Set while a script load failure is waiting for an `onerror` handler.
    load_failed: AtomicBool,
    handlers: Handlers,
    me: Weak<FakeWorker>,
}

impl FakeWorker {
    pub(crate) fn spawn(
        event_loop: EventLoop,
        url: String,
        name: Option<String>,
        script: Option<WorkerScript>,
    ) -> Result<Handle> {
        if script.is_none() {
            tracing::debug!(url = %url, "fake worker script not registered");
        }
        let load_failed = AtomicBool::new(script.is_none());
        let worker: Arc<FakeWorker> = Arc::new_cyclic(|me| FakeWorker {
            event_loop,
            url,
            name,
            script,
            terminated: AtomicBool::new(false),
            load_failed,
            handlers: Handlers::default(),
            me: me.clone(),
        });
        Ok(worker)
    }

    /// A browser reports a failed script load in a later task, so a handler
    /// installed right after construction still sees it. Emulated by
    /// reporting once the first `onerror` handler arrives.
    fn report_load_failure(&self) {
        if self.load_failed.swap(false, Ordering::SeqCst) {
            let message = format!("failed to load worker script {}", self.url);
            self.deliver(
                "onerror",
                event(vec![
                    ("type", Value::from("error")),
                    ("message", Value::from(message)),
                ]),
            );
        }
    }

    fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    fn deliver(&self, slot: &'static str, event: Value) {
        let Some(me) = self.me.upgrade() else {
            return;
        };
        let queued = self.event_loop.queue(move || {
            if !me.is_terminated() {
                me.handlers.fire(slot, &[event]);
            }
        });
        if queued.is_err() {
            tracing::warn!(slot, "fake worker event lost: event loop stopped");
        }
    }

    fn post_message(&self, args: Vec<Value>) -> Result<Value> {
        let data = args.into_iter().next().unwrap_or_default();
        if contains_function(&data) {
            return Err(Error::native(
                "DataCloneError: functions cannot be cloned",
            ));
        }
        if self.is_terminated() {
            return Ok(Value::Null);
        }
        let Some(script) = self.script.clone() else {
            return Ok(Value::Null);
        };
        let scope = WorkerScope {
            worker: self.me.clone(),
        };
        let me = self.me.upgrade().ok_or(Error::Disconnected)?;
        self.event_loop.queue(move || {
            if !me.is_terminated() {
                script(&scope, data);
            }
        })?;
        Ok(Value::Null)
    }
}

impl NativeObject for FakeWorker {
    fn get(&self, property: &str) -> Result<Value> {
        if property.starts_with("on") {
            return Ok(self.handlers.get(property));
        }
        Ok(match property {
            "name" => Value::from(self.name.clone()),
            _ => Value::Null,
        })
    }

    fn set(&self, property: &str, value: Value) -> Result<()> {
        self.handlers.set(property, &value);
        if property == "onerror" && matches!(value, Value::Function(_)) {
            self.report_load_failure();
        }
        Ok(())
    }

    fn call(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        match method {
            "postMessage" => self.post_message(args),
            "terminate" => {
                self.terminated.store(true, Ordering::SeqCst);
                Ok(Value::Null)
            }
            _ => Err(Error::native(format!("TypeError: {} is not a function", method))),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn contains_function(value: &Value) -> bool {
    match value {
        Value::Function(_) => true,
        Value::Array(items) => items.iter().any(contains_function),
        Value::Map(map) => map.values().any(contains_function),
        _ => false,
    }
}
