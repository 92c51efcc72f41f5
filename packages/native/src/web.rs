//! Browser backend over js-sys.
//!
//! `JsRuntime` reaches constructors on the JS global object and `JsObject`
//! forwards get/set/call through `Reflect` and `Function::apply`.
//!
//! Blocking bindings (`bytes`, `receive`, progress polling) park the calling
//! thread, so they only make sense off the page's main thread: inside a
//! worker of a wasm build with shared memory and atomics.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use js_sys::{Array, ArrayBuffer, Function, Object, Reflect, Uint8Array};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};

use crate::{Callback, Error, Handle, NativeObject, NativeRuntime, Result, Value};

/// Native runtime backed by the JS global scope.
pub struct JsRuntime {
    global: Object,
}

impl JsRuntime {
    pub fn new() -> Self {
        Self {
            global: js_sys::global(),
        }
    }
}

impl Default for JsRuntime {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: JS values never leave the thread that created them; the bindings
// only move them between wasm-side structures on that same thread.
unsafe impl Send for JsRuntime {}
unsafe impl Sync for JsRuntime {}

impl NativeRuntime for JsRuntime {
    fn construct(&self, constructor: &str, args: Vec<Value>) -> Result<Handle> {
        let ctor = Reflect::get(&self.global, &JsValue::from_str(constructor))
            .map_err(js_error)?
            .dyn_into::<Function>()
            .map_err(|_| Error::UnknownConstructor(constructor.to_string()))?;
        let object = Reflect::construct(&ctor, &to_js_array(args)?).map_err(js_error)?;
        Ok(Arc::new(JsObject::new(object)))
    }
}

/// A handle to a JS object.
pub struct JsObject {
    inner: JsValue,
}

// SAFETY: see JsRuntime.
unsafe impl Send for JsObject {}
unsafe impl Sync for JsObject {}

impl JsObject {
    pub fn new(inner: JsValue) -> Self {
        Self { inner }
    }

    /// The wrapped JS value.
    pub fn as_js(&self) -> &JsValue {
        &self.inner
    }
}

impl NativeObject for JsObject {
    fn get(&self, property: &str) -> Result<Value> {
        let value = Reflect::get(&self.inner, &JsValue::from_str(property)).map_err(js_error)?;
        Ok(from_js(value))
    }

    fn set(&self, property: &str, value: Value) -> Result<()> {
        Reflect::set(&self.inner, &JsValue::from_str(property), &to_js(value)?)
            .map_err(js_error)?;
        Ok(())
    }

    fn call(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        let function = Reflect::get(&self.inner, &JsValue::from_str(method))
            .map_err(js_error)?
            .dyn_into::<Function>()
            .map_err(|_| Error::native(format!("TypeError: {} is not a function", method)))?;
        let result = function
            .apply(&self.inner, &to_js_array(args)?)
            .map_err(js_error)?;
        Ok(from_js(result))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn js_error(value: JsValue) -> Error {
    let message = value
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| value.as_string())
        .unwrap_or_else(|| format!("{:?}", value));
    Error::native(message)
}

fn to_js_array(values: Vec<Value>) -> Result<Array> {
    let array = Array::new();
    for value in values {
        array.push(&to_js(value)?);
    }
    Ok(array)
}

/// Convert a Value into a JS value.
///
/// Fails for object handles that did not come from this backend.
pub fn to_js(value: Value) -> Result<JsValue> {
    Ok(match value {
        Value::Null => JsValue::NULL,
        Value::Bool(b) => JsValue::from_bool(b),
        Value::Integer(i) => JsValue::from_f64(i as f64),
        Value::Float(f) => JsValue::from_f64(f),
        Value::String(s) => JsValue::from_str(&s),
        Value::Bytes(b) => Uint8Array::from(b.as_slice()).into(),
        Value::Array(items) => to_js_array(items)?.into(),
        Value::Map(map) => {
            let object = Object::new();
            for (key, value) in map {
                Reflect::set(&object, &JsValue::from_str(&key), &to_js(value)?)
                    .map_err(js_error)?;
            }
            object.into()
        }
        Value::Object(handle) => match handle.as_any().downcast_ref::<JsObject>() {
            Some(object) => object.inner.clone(),
            None => {
                return Err(Error::Encode(
                    "object handle does not belong to the JS runtime".to_string(),
                ))
            }
        },
        Value::Function(callback) => callback_to_js(callback),
    })
}

fn callback_to_js(callback: Callback) -> JsValue {
    let closure = Closure::wrap(Box::new(move |first: JsValue, second: JsValue| {
        let mut args = vec![from_js(first)];
        if !second.is_undefined() {
            args.push(from_js(second));
        }
        callback.invoke(&args);
    }) as Box<dyn FnMut(JsValue, JsValue)>);
    // Ownership passes to the JS garbage collector.
    closure.into_js_value()
}

/// Convert a JS value into a Value.
///
/// Plain objects and arrays are copied into `Map`/`Array`; binary buffers
/// become `Bytes`; everything else object-like stays a handle.
pub fn from_js(value: JsValue) -> Value {
    if value.is_null() || value.is_undefined() {
        return Value::Null;
    }
    if let Some(b) = value.as_bool() {
        return Value::Bool(b);
    }
    if let Some(f) = value.as_f64() {
        return if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
            Value::Integer(f as i64)
        } else {
            Value::Float(f)
        };
    }
    if let Some(s) = value.as_string() {
        return Value::String(s);
    }
    if value.is_instance_of::<ArrayBuffer>() {
        return Value::Bytes(Uint8Array::new(&value).to_vec());
    }
    if let Some(bytes) = value.dyn_ref::<Uint8Array>() {
        return Value::Bytes(bytes.to_vec());
    }
    if Array::is_array(&value) {
        return Value::Array(Array::from(&value).iter().map(from_js).collect());
    }
    if is_plain_object(&value) {
        let mut map = BTreeMap::new();
        for entry in Object::entries(value.unchecked_ref::<Object>()).iter() {
            let pair = Array::from(&entry);
            if let Some(key) = pair.get(0).as_string() {
                map.insert(key, from_js(pair.get(1)));
            }
        }
        return Value::Map(map);
    }
    Value::Object(Arc::new(JsObject::new(value)))
}

fn is_plain_object(value: &JsValue) -> bool {
    value
        .dyn_ref::<Object>()
        .map(|object| object.constructor().name() == "Object")
        .unwrap_or(false)
}
