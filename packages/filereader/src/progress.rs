use std::sync::atomic::{AtomicBool, Ordering};

use webbind_native::{EventReceiver, Value};

/// A progress notification from a native reader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressEvent {
    kind: String,
    loaded: u64,
    total: u64,
    length_computable: bool,
}

impl ProgressEvent {
    /// Read the fields of a native event descriptor.
    ///
    /// Descriptors arrive either as live objects or as plain maps. Missing
    /// or mistyped fields read as empty, zero or false.
    pub fn from_native(descriptor: &Value) -> Self {
        Self {
            kind: field(descriptor, "type")
                .as_str()
                .unwrap_or_default()
                .to_string(),
            loaded: non_negative(&field(descriptor, "loaded")),
            total: non_negative(&field(descriptor, "total")),
            length_computable: field(descriptor, "lengthComputable")
                .as_bool()
                .unwrap_or(false),
        }
    }

    /// Event type: `"progress"`, `"abort"`, ...
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Bytes processed so far.
    pub fn loaded(&self) -> u64 {
        self.loaded
    }

    /// Bytes expected in total; only meaningful if `length_computable`.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn length_computable(&self) -> bool {
        self.length_computable
    }
}

fn field(descriptor: &Value, name: &str) -> Value {
    match descriptor {
        Value::Object(handle) => handle.get(name).unwrap_or_else(|err| {
            tracing::debug!(field = name, %err, "unreadable progress event field");
            Value::Null
        }),
        other => other.field(name).cloned().unwrap_or_default(),
    }
}

fn non_negative(value: &Value) -> u64 {
    value
        .as_i64()
        .and_then(|i| u64::try_from(i).ok())
        .unwrap_or(0)
}

/// One entry of a [`ProgressFeed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub event: ProgressEvent,
    /// Name of the file being read, when the native reader reports one.
    pub name: Option<String>,
}

/// What a progress queue carries.
pub(crate) enum FeedItem {
    Update(ProgressUpdate),
    /// Pushed by the reader when it stops feeding this queue.
    End,
}

/// Ordered sequence of progress updates from one reader.
///
/// Every update is handed out exactly once, in the order the native reader
/// produced it. The feed ends (`None`) once drained after the reader is
/// dropped or `progress()` is called again. The backing queue is unbounded.
pub struct ProgressFeed {
    items: EventReceiver<FeedItem>,
    ended: AtomicBool,
}

impl ProgressFeed {
    pub(crate) fn new(items: EventReceiver<FeedItem>) -> Self {
        Self {
            items,
            ended: AtomicBool::new(false),
        }
    }

    /// Block until the next update arrives.
    ///
    /// Returns `None` once the feed has ended and is drained. Must not be
    /// called from the native event loop or inside an async runtime.
    pub fn next_update(&self) -> Option<ProgressUpdate> {
        let next = self
            .items
            .recv_blocking_unless(|| self.ended.load(Ordering::SeqCst));
        self.unpack(next)
    }

    /// The next update if one is already queued.
    pub fn try_next_update(&self) -> Option<ProgressUpdate> {
        self.unpack(self.items.try_recv())
    }

    fn unpack(&self, next: Option<FeedItem>) -> Option<ProgressUpdate> {
        match next {
            Some(FeedItem::Update(update)) => Some(update),
            Some(FeedItem::End) | None => {
                self.ended.store(true, Ordering::SeqCst);
                None
            }
        }
    }
}

impl Iterator for ProgressFeed {
    type Item = ProgressUpdate;

    fn next(&mut self) -> Option<ProgressUpdate> {
        self.next_update()
    }
}
