//! webbind: typed bindings over browser-native Blob, File, FileReader and
//! Worker objects.
//!
//! Every binding is a thin wrapper around a native object handle. The
//! handles come from a [`NativeRuntime`], injected by the host: the `web`
//! feature provides one backed by the page's globals, and the `test-utils`
//! feature provides an in-process fake browser.
//!
//! Native objects talk back through callbacks on their event loop. The
//! bindings turn those into blocking pulls for the host thread:
//! [`Blob::bytes`], [`ProgressFeed::next_update`] and
//! [`BackgroundWorker::receive`]. None of them may be called from the event
//! loop itself.
//!
//! # Example
//!
//! ```rust,ignore
//! use webbind::{BackgroundWorker, BinaryBlob, Blob, BlobOptions, Value};
//!
//! let blob = BinaryBlob::new(runtime.clone(), ["some blobby data"], BlobOptions::with_type("text/plain"))?;
//! assert_eq!(blob.size()?, 16);
//!
//! let worker = BackgroundWorker::new(&runtime, "hasher.js")?;
//! worker.send(Value::from(&blob))?;
//! let digest = worker.receive()?;
//! ```

pub use webbind_native as native;

pub use webbind_blob::{
    BinaryBlob, Blob, BlobError, BlobOptions, File, FileHandle, FileOptions, LineEndings,
};
pub use webbind_filereader::{AsyncReader, ProgressEvent, ProgressFeed, ProgressUpdate, ReadyState};
pub use webbind_native::{Callback, Error, Handle, NativeObject, NativeRuntime, Value};
pub use webbind_worker::{BackgroundWorker, WorkerError, WorkerKind, WorkerOptions};
