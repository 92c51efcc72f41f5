//! Construction options for workers.

use serde::Serialize;
use webbind_native::{to_value, Value};

/// How the worker script is loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerKind {
    /// A classic script.
    #[default]
    Classic,
    /// An ES module.
    Module,
}

/// Options for `new Worker(url, options)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkerOptions {
    #[serde(skip)]
    pub script_url: String,
    /// Name exposed to the worker, useful when debugging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: WorkerKind,
}

impl WorkerOptions {
    pub fn new(script_url: impl Into<String>) -> Self {
        Self {
            script_url: script_url.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_kind(mut self, kind: WorkerKind) -> Self {
        self.kind = kind;
        self
    }

    pub(crate) fn to_native(&self) -> webbind_native::Result<Value> {
        to_value(self)
    }
}
