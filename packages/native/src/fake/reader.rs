use std::any::Any;
use std::sync::{Arc, Mutex, Weak};

use base64::Engine;

use super::{event, lock, EventLoop, FakeBlob, Handlers};
use crate::{Error, Handle, NativeObject, Result, Value};

const EMPTY: i64 = 0;
const LOADING: i64 = 1;
const DONE: i64 = 2;

#[derive(Clone, Copy)]
enum Format {
    ArrayBuffer,
    Text,
    DataUrl,
}

/// What a read needs from the blob, captured when the read starts.
struct Snapshot {
    data: Vec<u8>,
    content_type: String,
    name: Option<String>,
    closed: bool,
}

struct ReaderState {
    ready_state: i64,
    result: Value,
    error: Value,
    /// Bumped by every read and abort; a queued read whose generation is
    /// stale stops delivering events.
    generation: u64,
    name: Option<String>,
}

/// A fake `FileReader`.
///
/// Reads run on the event loop: `loadstart`, one `progress` per chunk, then
/// `load` (or `error`), then `loadend`. Progress and abort handlers receive
/// the file name as a second argument when the blob is a `File`.
pub struct FakeFileReader {
    event_loop: EventLoop,
    chunk: usize,
    state: Mutex<ReaderState>,
    handlers: Handlers,
    me: Weak<FakeFileReader>,
}

impl FakeFileReader {
    pub(crate) fn new(event_loop: EventLoop, chunk: usize) -> Handle {
        let reader: Arc<FakeFileReader> = Arc::new_cyclic(|me| FakeFileReader {
            event_loop,
            chunk: chunk.max(1),
            state: Mutex::new(ReaderState {
                ready_state: EMPTY,
                result: Value::Null,
                error: Value::Null,
                generation: 0,
                name: None,
            }),
            handlers: Handlers::default(),
            me: me.clone(),
        });
        reader
    }

    fn start(&self, format: Format, args: &[Value]) -> Result<Value> {
        let blob = args
            .first()
            .and_then(Value::as_object)
            .and_then(|handle| handle.as_any().downcast_ref::<FakeBlob>())
            .ok_or_else(|| Error::native("TypeError: parameter 1 is not of type 'Blob'"))?;
        let snapshot = Snapshot {
            data: blob.data().to_vec(),
            content_type: blob.content_type().to_string(),
            name: blob.file_name().map(String::from),
            closed: blob.is_closed(),
        };

        let generation = {
            let mut state = lock(&self.state);
            if state.ready_state == LOADING {
                return Err(Error::native(
                    "InvalidStateError: the object is already busy reading",
                ));
            }
            state.ready_state = LOADING;
            state.result = Value::Null;
            state.error = Value::Null;
            state.generation += 1;
            state.name = snapshot.name.clone();
            state.generation
        };

        let me = self.me.upgrade().ok_or(Error::Disconnected)?;
        self.event_loop
            .queue(move || me.run(generation, format, snapshot))?;
        Ok(Value::Null)
    }

    fn run(&self, generation: u64, format: Format, snapshot: Snapshot) {
        let name = Value::from(snapshot.name.clone());
        let total = snapshot.data.len() as u64;

        if !self.is_current(generation) {
            return;
        }
        self.handlers
            .fire("onloadstart", &[progress_event("loadstart", 0, total)]);

        if snapshot.closed {
            let error = event(vec![
                ("name", Value::from("NotReadableError")),
                ("message", Value::from("the blob is closed")),
            ]);
            if self.finish(generation, Value::Null, error) {
                self.handlers
                    .fire("onerror", &[progress_event("error", 0, total)]);
                self.handlers
                    .fire("onloadend", &[progress_event("loadend", 0, total)]);
            }
            return;
        }

        let mut loaded = 0u64;
        for chunk in snapshot.data.chunks(self.chunk) {
            if !self.is_current(generation) {
                return;
            }
            loaded += chunk.len() as u64;
            self.handlers.fire(
                "onprogress",
                &[progress_event("progress", loaded, total), name.clone()],
            );
        }

        let result = match format {
            Format::ArrayBuffer => Value::Bytes(snapshot.data),
            Format::Text => Value::String(String::from_utf8_lossy(&snapshot.data).into_owned()),
            Format::DataUrl => Value::String(format!(
                "data:{};base64,{}",
                snapshot.content_type,
                base64::engine::general_purpose::STANDARD.encode(&snapshot.data)
            )),
        };
        if self.finish(generation, result, Value::Null) {
            self.handlers
                .fire("onload", &[progress_event("load", loaded, total)]);
            self.handlers
                .fire("onloadend", &[progress_event("loadend", loaded, total)]);
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        lock(&self.state).generation == generation
    }

    fn finish(&self, generation: u64, result: Value, error: Value) -> bool {
        let mut state = lock(&self.state);
        if state.generation != generation {
            return false;
        }
        state.ready_state = DONE;
        state.result = result;
        state.error = error;
        true
    }

    /// Abort fires synchronously, as in browsers.
    fn abort(&self) -> Value {
        let name = {
            let mut state = lock(&self.state);
            if state.ready_state != LOADING {
                return Value::Null;
            }
            state.generation += 1;
            state.ready_state = DONE;
            state.result = Value::Null;
            state.error = event(vec![
                ("name", Value::from("AbortError")),
                ("message", Value::from("the read was aborted")),
            ]);
            state.name.clone()
        };
        self.handlers
            .fire("onabort", &[progress_event("abort", 0, 0), Value::from(name)]);
        self.handlers
            .fire("onloadend", &[progress_event("loadend", 0, 0)]);
        Value::Null
    }
}

impl NativeObject for FakeFileReader {
    fn get(&self, property: &str) -> Result<Value> {
        if property.starts_with("on") {
            return Ok(self.handlers.get(property));
        }
        let state = lock(&self.state);
        Ok(match property {
            "readyState" => Value::Integer(state.ready_state),
            "result" => state.result.clone(),
            "error" => state.error.clone(),
            _ => Value::Null,
        })
    }

    fn set(&self, property: &str, value: Value) -> Result<()> {
        self.handlers.set(property, &value);
        Ok(())
    }

    fn call(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        match method {
            "readAsArrayBuffer" => self.start(Format::ArrayBuffer, &args),
            "readAsText" => self.start(Format::Text, &args),
            "readAsDataURL" => self.start(Format::DataUrl, &args),
            "abort" => Ok(self.abort()),
            _ => Err(Error::native(format!("TypeError: {} is not a function", method))),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn progress_event(kind: &str, loaded: u64, total: u64) -> Value {
    event(vec![
        ("type", Value::from(kind)),
        ("loaded", Value::from(loaded)),
        ("total", Value::from(total)),
        ("lengthComputable", Value::Bool(true)),
    ])
}
