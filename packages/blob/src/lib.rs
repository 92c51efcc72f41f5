//! Typed bindings for the browser `Blob` and `File` objects.
//!
//! Read more about Blobs at <https://developer.mozilla.org/en-US/docs/Web/API/Blob>.
//!
//! A native handle that already holds a Blob can be internalized:
//!
//! ```rust,ignore
//! let blob = BinaryBlob::from_handle(runtime.clone(), handle);
//! println!("{}", blob.size()?);
//! ```
//!
//! or a new one created from parts:
//!
//! ```rust,ignore
//! let blob = BinaryBlob::new(runtime, ["some blobby data"], BlobOptions::default())?;
//! assert_eq!(blob.size()?, 16);
//! ```

mod blob;
mod error;
mod file;
mod options;
mod read;

pub use blob::{BinaryBlob, Blob};
pub use error::{BlobError, Result};
pub use file::{File, FileHandle};
pub use options::{BlobOptions, FileOptions, LineEndings};
