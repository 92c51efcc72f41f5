//! Error types for the native layer.

use thiserror::Error;

/// Errors raised while talking to the native runtime.
#[derive(Debug, Error)]
pub enum Error {
    /// A native property access or method call threw.
    #[error("native error: {message}")]
    Native { message: String },

    /// A property held a value of the wrong shape.
    #[error("property `{property}`: expected {expected}, found {found}")]
    TypeMismatch {
        property: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The runtime has no constructor with this name.
    #[error("unknown constructor: {0}")]
    UnknownConstructor(String),

    /// The native event loop went away before delivering an event.
    #[error("native event loop disconnected")]
    Disconnected,

    /// A Value could not be converted into the requested Rust type.
    #[error("decode error: {0}")]
    Decode(String),

    /// A Rust value could not be converted into a Value.
    #[error("encode error: {0}")]
    Encode(String),
}

impl Error {
    /// Create a native error from a message.
    pub fn native(message: impl Into<String>) -> Self {
        Error::Native {
            message: message.into(),
        }
    }

    /// Create a type mismatch error for a property.
    pub fn type_mismatch(
        property: impl Into<String>,
        expected: &'static str,
        found: &'static str,
    ) -> Self {
        Error::TypeMismatch {
            property: property.into(),
            expected,
            found,
        }
    }
}

/// Result type alias for native operations.
pub type Result<T> = std::result::Result<T, Error>;
