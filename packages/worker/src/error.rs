//! Error types for worker bindings.

use thiserror::Error;
use webbind_native::{describe_error, Value};

/// Errors that can occur talking to a worker.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The worker reported an error; carries the native payload.
    #[error("worker error: {}", describe_error(.0))]
    Reported(Value),

    /// A message arrived but did not decode into the requested type.
    /// Carries the message so it is not lost.
    #[error("undecodable worker message: {source}")]
    Undecodable {
        payload: Value,
        source: webbind_native::Error,
    },

    /// The worker has been terminated.
    #[error("worker terminated")]
    Terminated,

    /// A native operation failed.
    #[error(transparent)]
    Native(#[from] webbind_native::Error),
}

/// Result type alias for worker operations.
pub type Result<T> = std::result::Result<T, WorkerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reported_error_display_uses_message() {
        let mut payload = Value::map();
        payload.insert("message", Value::from("bad input"));
        let e = WorkerError::Reported(payload);
        assert_eq!(format!("{}", e), "worker error: bad input");
        assert_eq!(
            format!("{}", WorkerError::Reported(Value::from("plain"))),
            "worker error: plain"
        );
    }
}
