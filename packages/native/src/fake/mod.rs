//! An in-process browser for tests.
//!
//! `FakeBrowser` implements `NativeRuntime` with `Blob`, `File`, `FileReader`
//! and `Worker` constructors. Asynchronous work (reads, worker messages) runs
//! on a dedicated event-loop thread, so callbacks fire on a different thread
//! from the caller, the same shape as a real page.
//!
//! Worker scripts are Rust closures registered under a script URL:
//!
//! ```rust
//! use webbind_native::fake::FakeBrowser;
//! use webbind_native::Value;
//!
//! let browser = FakeBrowser::new();
//! browser.register_worker("echo.js", |scope, message| scope.post_message(message));
//! let runtime = browser.into_runtime();
//! ```

mod blob;
mod plain;
mod reader;
mod worker;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use tokio::sync::mpsc;

use crate::{Callback, Error, Handle, NativeRuntime, Result, Value};

pub use blob::FakeBlob;
pub use plain::PlainObject;
pub use reader::FakeFileReader;
pub use worker::{FakeWorker, WorkerScope, WorkerScript};

/// Configuration for the fake browser.
#[derive(Debug, Clone)]
pub struct FakeBrowserConfig {
    /// Bytes covered by each `progress` event during a read.
    pub progress_chunk: usize,
}

impl Default for FakeBrowserConfig {
    fn default() -> Self {
        Self {
            progress_chunk: 4096,
        }
    }
}

/// The fake browser runtime.
pub struct FakeBrowser {
    config: FakeBrowserConfig,
    event_loop: EventLoop,
    scripts: Mutex<BTreeMap<String, WorkerScript>>,
}

impl FakeBrowser {
    /// Create a fake browser with the default configuration.
    pub fn new() -> Self {
        Self::with_config(FakeBrowserConfig::default())
    }

    /// Create a fake browser with the given configuration.
    pub fn with_config(config: FakeBrowserConfig) -> Self {
        Self {
            config,
            event_loop: EventLoop::start(),
            scripts: Mutex::new(BTreeMap::new()),
        }
    }

    /// Register the behaviour of a worker script.
    ///
    /// The closure runs on the event loop once per posted message.
    pub fn register_worker<F>(&self, url: &str, script: F)
    where
        F: Fn(&WorkerScope, Value) + Send + Sync + 'static,
    {
        lock(&self.scripts).insert(url.to_string(), Arc::new(script));
    }

    /// Share this browser as an injected runtime.
    pub fn into_runtime(self) -> Arc<dyn NativeRuntime> {
        Arc::new(self)
    }

    fn construct_blob(&self, args: &[Value]) -> Result<Handle> {
        let data = collect_parts(args.first())?;
        let options = args.get(1).cloned().unwrap_or_default();
        let content_type = option_string(&options, "type");
        Ok(Arc::new(FakeBlob::new(data, content_type)))
    }

    fn construct_file(&self, args: &[Value]) -> Result<Handle> {
        let data = collect_parts(args.first())?;
        let name = args
            .get(1)
            .and_then(Value::as_str)
            .ok_or_else(|| Error::native("TypeError: File requires a name"))?
            .to_string();
        let options = args.get(2).cloned().unwrap_or_default();
        let content_type = option_string(&options, "type");
        let last_modified = options
            .field("lastModified")
            .and_then(Value::as_i64)
            .unwrap_or_else(now_millis);
        Ok(Arc::new(FakeBlob::file(
            data,
            content_type,
            name,
            last_modified,
        )))
    }

    fn construct_worker(&self, args: &[Value]) -> Result<Handle> {
        let url = args
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| Error::native("TypeError: Worker requires a script URL"))?
            .to_string();
        let options = args.get(1).cloned().unwrap_or_default();
        let name = options.field("name").and_then(Value::as_str).map(String::from);
        let script = lock(&self.scripts).get(&url).cloned();
        FakeWorker::spawn(self.event_loop.clone(), url, name, script)
    }
}

impl Default for FakeBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeRuntime for FakeBrowser {
    fn construct(&self, constructor: &str, args: Vec<Value>) -> Result<Handle> {
        tracing::debug!(constructor, "fake browser construct");
        match constructor {
            "Blob" => self.construct_blob(&args),
            "File" => self.construct_file(&args),
            "FileReader" => Ok(FakeFileReader::new(
                self.event_loop.clone(),
                self.config.progress_chunk,
            )),
            "Worker" => self.construct_worker(&args),
            _ => Err(Error::UnknownConstructor(constructor.to_string())),
        }
    }
}

type Task = Box<dyn FnOnce() + Send>;

/// Single-threaded task queue standing in for the browser event loop.
///
/// The loop thread exits once every clone is dropped.
#[derive(Clone)]
pub(crate) struct EventLoop {
    tx: mpsc::UnboundedSender<Task>,
}

impl EventLoop {
    fn start() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Task>();
        thread::spawn(move || {
            while let Some(task) = rx.blocking_recv() {
                task();
            }
            tracing::debug!("fake event loop stopped");
        });
        Self { tx }
    }

    /// Run `task` on the loop after everything already queued.
    pub(crate) fn queue(&self, task: impl FnOnce() + Send + 'static) -> Result<()> {
        self.tx.send(Box::new(task)).map_err(|_| Error::Disconnected)
    }
}

/// Event slots (`onload`, `onmessage`, ...) of a fake object.
#[derive(Default)]
pub(crate) struct Handlers {
    slots: Mutex<BTreeMap<String, Callback>>,
}

impl Handlers {
    /// Handle a property write. Returns false if `property` is not a slot.
    pub(crate) fn set(&self, property: &str, value: &Value) -> bool {
        if !property.starts_with("on") {
            return false;
        }
        let mut slots = lock(&self.slots);
        match value {
            Value::Function(callback) => {
                slots.insert(property.to_string(), callback.clone());
            }
            _ => {
                slots.remove(property);
            }
        }
        true
    }

    pub(crate) fn get(&self, property: &str) -> Value {
        lock(&self.slots)
            .get(property)
            .cloned()
            .map(Value::Function)
            .unwrap_or_default()
    }

    /// Invoke the callback in `slot`, if any. The lock is released first so
    /// a callback may replace handlers.
    pub(crate) fn fire(&self, slot: &str, args: &[Value]) {
        let callback = lock(&self.slots).get(slot).cloned();
        if let Some(callback) = callback {
            tracing::trace!(slot, "fake browser dispatch");
            callback.invoke(args);
        }
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Build a plain event object from key/value pairs.
pub(crate) fn event(fields: Vec<(&str, Value)>) -> Value {
    let obj = PlainObject::new();
    for (key, value) in fields {
        obj.insert(key, value);
    }
    Value::Object(Arc::new(obj))
}

fn option_string(options: &Value, key: &str) -> String {
    options
        .field(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn collect_parts(parts: Option<&Value>) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    let items = match parts {
        None | Some(Value::Null) => return Ok(data),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(Error::native(format!(
                "TypeError: blob parts must be a sequence, got {}",
                other.kind()
            )))
        }
    };
    for item in items {
        match item {
            Value::String(s) => data.extend_from_slice(s.as_bytes()),
            Value::Bytes(b) => data.extend_from_slice(b),
            Value::Object(handle) => {
                let blob = handle
                    .as_any()
                    .downcast_ref::<FakeBlob>()
                    .ok_or_else(|| Error::native("TypeError: unsupported blob part"))?;
                data.extend_from_slice(blob.data());
            }
            other => data.extend_from_slice(format!("{:?}", other).as_bytes()),
        }
    }
    Ok(data)
}

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
