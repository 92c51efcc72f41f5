use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::{Error, NativeObject, Result, Value};

struct FileMeta {
    name: String,
    last_modified: i64,
}

/// A fake `Blob`, or a `File` when it carries file metadata.
pub struct FakeBlob {
    data: Vec<u8>,
    content_type: String,
    closed: AtomicBool,
    file: Option<FileMeta>,
}

impl FakeBlob {
    pub fn new(data: Vec<u8>, content_type: String) -> Self {
        Self {
            data,
            content_type,
            closed: AtomicBool::new(false),
            file: None,
        }
    }

    pub fn file(data: Vec<u8>, content_type: String, name: String, last_modified: i64) -> Self {
        Self {
            file: Some(FileMeta {
                name,
                last_modified,
            }),
            ..Self::new(data, content_type)
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file.as_ref().map(|f| f.name.as_str())
    }

    /// Browser `slice` semantics: negative offsets count from the end,
    /// out-of-range offsets clamp, an inverted range is empty.
    fn slice(&self, args: &[Value]) -> Value {
        let size = self.data.len() as i64;
        let resolve = |arg: Option<&Value>, default: i64| {
            let offset = arg.and_then(Value::as_i64).unwrap_or(default);
            if offset < 0 {
                (size + offset).max(0)
            } else {
                offset.min(size)
            }
        };
        let start = resolve(args.first(), 0);
        let end = resolve(args.get(1), size).max(start);
        let content_type = args
            .get(2)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let data = self.data[start as usize..end as usize].to_vec();
        Value::Object(Arc::new(FakeBlob::new(data, content_type)))
    }
}

impl NativeObject for FakeBlob {
    fn get(&self, property: &str) -> Result<Value> {
        Ok(match (property, &self.file) {
            ("size", _) => Value::from(self.data.len() as u64),
            ("type", _) => Value::from(self.content_type.as_str()),
            ("isClosed", _) => Value::Bool(self.is_closed()),
            ("name", Some(file)) => Value::from(file.name.as_str()),
            ("lastModified", Some(file)) => Value::Integer(file.last_modified),
            _ => Value::Null,
        })
    }

    fn set(&self, _property: &str, _value: Value) -> Result<()> {
        // Blob attributes are read-only; writes are silently ignored.
        Ok(())
    }

    fn call(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        match method {
            "close" => {
                self.closed.store(true, Ordering::SeqCst);
                Ok(Value::Null)
            }
            "slice" => Ok(self.slice(&args)),
            _ => Err(Error::native(format!("TypeError: {} is not a function", method))),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
