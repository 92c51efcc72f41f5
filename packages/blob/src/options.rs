//! Construction options for Blobs and Files.

use chrono::{DateTime, Utc};
use serde::Serialize;
use webbind_native::{to_value, Value};

/// How line endings in string parts are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEndings {
    /// Strings are stored unchanged.
    #[default]
    Transparent,
    /// `\n` is converted to the platform's native line ending.
    Native,
}

/// Options for `new Blob(parts, options)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlobOptions {
    /// MIME type of the blob content; empty if unknown.
    #[serde(rename = "type")]
    pub content_type: String,
    pub endings: LineEndings,
}

impl BlobOptions {
    pub fn with_type(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            ..Self::default()
        }
    }

    pub(crate) fn to_native(&self) -> webbind_native::Result<Value> {
        to_value(self)
    }
}

/// Options for `new File(parts, name, options)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileOptions {
    /// MIME type of the file content; empty if unknown.
    pub content_type: String,
    /// Last modification time; the runtime uses "now" when unset.
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NativeFileOptions<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_modified: Option<i64>,
}

impl FileOptions {
    pub(crate) fn to_native(&self) -> webbind_native::Result<Value> {
        to_value(&NativeFileOptions {
            content_type: &self.content_type,
            last_modified: self.last_modified.map(|t| t.timestamp_millis()),
        })
    }
}
