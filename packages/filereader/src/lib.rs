//! Bindings for the native `FileReader`.
//!
//! [`AsyncReader`] starts reads on a native reader and exposes its state.
//! Progress notifications, which the native reader delivers as callbacks on
//! its event loop, come out of [`AsyncReader::progress`] as a blocking,
//! ordered [`ProgressFeed`].

mod progress;
mod reader;

pub use progress::{ProgressEvent, ProgressFeed, ProgressUpdate};
pub use reader::{AsyncReader, ReadyState};
