//! Bindings for dedicated native workers.
//!
//! A [`BackgroundWorker`] sends messages with [`send`] and pulls replies and
//! reported errors, in delivery order, with a blocking [`receive`].
//!
//! [`send`]: BackgroundWorker::send
//! [`receive`]: BackgroundWorker::receive

mod error;
mod options;
mod worker;

pub use error::{Result, WorkerError};
pub use options::{WorkerKind, WorkerOptions};
pub use worker::BackgroundWorker;
