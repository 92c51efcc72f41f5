//! webbind native layer: the protocol every binding is written against.
//!
//! This layer knows nothing about blobs or workers. It defines:
//! - `Value`: the untyped tree that crosses the native boundary
//! - `NativeObject` / `NativeRuntime`: get, set, call and construct
//! - `Callback`: a host closure installed on a native event slot
//! - `event_queue`: the hand-off between native callbacks and blocking callers
//!
//! Typed wrappers (`webbind-blob`, `webbind-filereader`, `webbind-worker`) hold
//! a `Handle` plus the runtime that created it, and translate typed calls into
//! these four generic operations.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use webbind_native::{Error, NativeRuntime, ObjectExt, Value};
//!
//! fn blob_size(runtime: &Arc<dyn NativeRuntime>) -> Result<u64, Error> {
//!     let blob = runtime.construct("Blob", vec![Value::array(), Value::map()])?;
//!     blob.get_u64("size")
//! }
//! ```

mod bridge;
mod convert;
mod error;
mod object;
mod value;

#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub mod web;

#[cfg(any(test, feature = "test-utils"))]
pub mod fake;

pub use bridge::{event_queue, EventReceiver, EventSender};
pub use convert::{from_value, json_to_value, to_value, value_to_json};
pub use error::{Error, Result};
pub use object::{describe_error, Callback, Handle, NativeObject, NativeRuntime, ObjectExt};
pub use value::Value;
