//! The native object protocol: get, set, call, construct.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::{Error, Result, Value};

/// A native object reached through generic property and method access.
///
/// This is the sole interface to the browser runtime. Implementations are
/// expected to be synchronous; anything asynchronous is reported later
/// through a `Callback` installed with `set`.
///
/// # Object Safety
///
/// This trait is object-safe: bindings hold `Arc<dyn NativeObject>`.
pub trait NativeObject: Send + Sync {
    /// Read a property. Missing properties read as `Value::Null`.
    fn get(&self, property: &str) -> Result<Value>;

    /// Write a property. Writing `Value::Function` to an `on*` slot
    /// registers an event callback; writing `Value::Null` clears it.
    fn set(&self, property: &str, value: Value) -> Result<()>;

    /// Invoke a method with positional arguments.
    fn call(&self, method: &str, args: Vec<Value>) -> Result<Value>;

    /// Downcast hook, so a runtime can recognise its own objects when they
    /// come back as arguments.
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a native object.
pub type Handle = Arc<dyn NativeObject>;

impl fmt::Debug for dyn NativeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NativeObject")
    }
}

/// Access to the runtime's global constructors.
///
/// Bindings receive this by injection instead of reaching a global
/// namespace, so a fake runtime can stand in during tests.
pub trait NativeRuntime: Send + Sync {
    /// Equivalent of `new <constructor>(...args)`.
    fn construct(&self, constructor: &str, args: Vec<Value>) -> Result<Handle>;
}

/// A host closure that the native runtime invokes with event arguments.
///
/// Callbacks run on the native event loop. They must not block.
#[derive(Clone)]
pub struct Callback(Arc<dyn Fn(&[Value]) + Send + Sync>);

impl Callback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invoke the callback.
    pub fn invoke(&self, args: &[Value]) {
        (self.0)(args)
    }

    /// Check whether two callbacks are the same closure.
    pub fn ptr_eq(&self, other: &Callback) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback")
    }
}

/// Typed property access on top of `NativeObject::get`.
pub trait ObjectExt {
    /// String property. Null reads as the empty string.
    fn get_string(&self, property: &str) -> Result<String>;

    /// Non-negative integral property.
    fn get_u64(&self, property: &str) -> Result<u64>;

    /// Integral property.
    fn get_i64(&self, property: &str) -> Result<i64>;

    /// Boolean property. Null reads as false.
    fn get_bool(&self, property: &str) -> Result<bool>;

    /// Binary property.
    fn get_bytes(&self, property: &str) -> Result<Vec<u8>>;

    /// Object property.
    fn get_object(&self, property: &str) -> Result<Handle>;
}

impl<T: NativeObject + ?Sized> ObjectExt for T {
    fn get_string(&self, property: &str) -> Result<String> {
        match self.get(property)? {
            Value::String(s) => Ok(s),
            Value::Null => Ok(String::new()),
            other => Err(Error::type_mismatch(property, "string", other.kind())),
        }
    }

    fn get_u64(&self, property: &str) -> Result<u64> {
        let value = self.get(property)?;
        value
            .as_i64()
            .and_then(|i| u64::try_from(i).ok())
            .ok_or_else(|| Error::type_mismatch(property, "non-negative integer", value.kind()))
    }

    fn get_i64(&self, property: &str) -> Result<i64> {
        let value = self.get(property)?;
        value
            .as_i64()
            .ok_or_else(|| Error::type_mismatch(property, "integer", value.kind()))
    }

    fn get_bool(&self, property: &str) -> Result<bool> {
        match self.get(property)? {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(Error::type_mismatch(property, "bool", other.kind())),
        }
    }

    fn get_bytes(&self, property: &str) -> Result<Vec<u8>> {
        match self.get(property)? {
            Value::Bytes(b) => Ok(b),
            other => Err(Error::type_mismatch(property, "bytes", other.kind())),
        }
    }

    fn get_object(&self, property: &str) -> Result<Handle> {
        match self.get(property)? {
            Value::Object(handle) => Ok(handle),
            other => Err(Error::type_mismatch(property, "object", other.kind())),
        }
    }
}

/// Render a native error value as a diagnostic string.
///
/// Error objects (`DOMException`, `ErrorEvent`) are described by their
/// `message`, falling back to `name`. Null describes as the empty string.
pub fn describe_error(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Map(map) => ["message", "name"]
            .iter()
            .filter_map(|key| map.get(*key).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string(),
        Value::Object(handle) => ["message", "name"]
            .iter()
            .filter_map(|key| handle.get_string(key).ok())
            .find(|s| !s.is_empty())
            .unwrap_or_default(),
        other => format!("{:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::PlainObject;

    #[test]
    fn typed_getters() {
        let obj = PlainObject::new();
        obj.set("name", Value::from("a.txt")).unwrap();
        obj.set("size", Value::Float(16.0)).unwrap();
        obj.set("isClosed", Value::Bool(true)).unwrap();

        assert_eq!(obj.get_string("name").unwrap(), "a.txt");
        assert_eq!(obj.get_u64("size").unwrap(), 16);
        assert!(obj.get_bool("isClosed").unwrap());
        assert_eq!(obj.get_string("missing").unwrap(), "");
        assert!(!obj.get_bool("missing").unwrap());
    }

    #[test]
    fn typed_getter_mismatch() {
        let obj = PlainObject::new();
        obj.set("size", Value::from(-1i64)).unwrap();
        obj.set("name", Value::from(3i64)).unwrap();

        assert!(matches!(
            obj.get_u64("size"),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            obj.get_string("name"),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(obj.get_object("missing").is_err());
    }

    #[test]
    fn describe_error_objects() {
        let obj = PlainObject::new();
        obj.set("name", Value::from("NotReadableError")).unwrap();
        let handle: Handle = Arc::new(obj);
        assert_eq!(describe_error(&Value::Object(handle.clone())), "NotReadableError");

        handle.set("message", Value::from("file vanished")).unwrap();
        assert_eq!(describe_error(&Value::Object(handle)), "file vanished");

        assert_eq!(describe_error(&Value::Null), "");
        assert_eq!(describe_error(&Value::from("plain")), "plain");
    }
}
