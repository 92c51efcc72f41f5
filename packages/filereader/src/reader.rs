use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use webbind_blob::Blob;
use webbind_native::{
    describe_error, event_queue, Callback, Error, EventSender, Handle, NativeRuntime, ObjectExt,
    Result, Value,
};

use crate::progress::{FeedItem, ProgressEvent, ProgressFeed, ProgressUpdate};

const PROGRESS_SLOTS: [&str; 2] = ["onprogress", "onabort"];

/// Where a reader is in its current read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    /// No read has started.
    Empty = 0,
    /// A read is in progress.
    Loading = 1,
    /// The last read finished, failed or was aborted.
    Done = 2,
}

impl TryFrom<i64> for ReadyState {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            0 => Ok(ReadyState::Empty),
            1 => Ok(ReadyState::Loading),
            2 => Ok(ReadyState::Done),
            _ => Err(Error::type_mismatch("readyState", "0, 1 or 2", "integer")),
        }
    }
}

/// A native `FileReader`.
///
/// Reads are asynchronous: the `read_as_*` methods return as soon as the
/// native read has started. Progress is observed through [`progress`],
/// the outcome through [`ready_state`], [`result`] and [`error`].
///
/// [`progress`]: AsyncReader::progress
/// [`ready_state`]: AsyncReader::ready_state
/// [`result`]: AsyncReader::result
/// [`error`]: AsyncReader::error
pub struct AsyncReader {
    handle: Handle,
    /// Producer side of the current progress feed, kept to end it.
    feed: Mutex<Option<EventSender<FeedItem>>>,
}

impl AsyncReader {
    pub fn new(runtime: &dyn NativeRuntime) -> Result<Self> {
        let handle = runtime.construct("FileReader", vec![])?;
        tracing::debug!("file reader created");
        Ok(Self::from_handle(handle))
    }

    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            feed: Mutex::new(None),
        }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn ready_state(&self) -> Result<ReadyState> {
        ReadyState::try_from(self.handle.get_i64("readyState")?)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.ready_state()? == ReadyState::Empty)
    }

    pub fn is_loading(&self) -> Result<bool> {
        Ok(self.ready_state()? == ReadyState::Loading)
    }

    pub fn is_done(&self) -> Result<bool> {
        Ok(self.ready_state()? == ReadyState::Done)
    }

    /// Diagnostic for the last failed or aborted read; empty otherwise.
    pub fn error(&self) -> Result<String> {
        Ok(describe_error(&self.handle.get("error")?))
    }

    /// The content produced by the last completed read. Null until then.
    pub fn result(&self) -> Result<Value> {
        self.handle.get("result")
    }

    pub fn read_as_array_buffer<B: Blob + ?Sized>(&self, blob: &B) -> Result<()> {
        self.start("readAsArrayBuffer", blob, None)
    }

    /// Read the blob as text; `encoding` defaults to UTF-8 natively.
    pub fn read_as_text<B: Blob + ?Sized>(&self, blob: &B, encoding: Option<&str>) -> Result<()> {
        self.start("readAsText", blob, encoding)
    }

    pub fn read_as_data_url<B: Blob + ?Sized>(&self, blob: &B) -> Result<()> {
        self.start("readAsDataURL", blob, None)
    }

    fn start<B: Blob + ?Sized>(&self, method: &str, blob: &B, encoding: Option<&str>) -> Result<()> {
        let mut args = vec![Value::Object(blob.handle().clone())];
        if let Some(encoding) = encoding {
            args.push(Value::from(encoding));
        }
        self.handle.call(method, args)?;
        tracing::debug!(method, "read started");
        Ok(())
    }

    /// Abort the read in progress, if any.
    pub fn abort(&self) -> Result<()> {
        self.handle.call("abort", vec![])?;
        tracing::debug!("read aborted");
        Ok(())
    }

    /// Route `progress` and `abort` notifications into a new feed.
    ///
    /// Replaces the callbacks installed by an earlier call; that earlier
    /// feed ends once drained. Dropping the reader ends the current feed.
    pub fn progress(&self) -> Result<ProgressFeed> {
        let (tx, rx) = event_queue("file-reader-progress");
        for slot in PROGRESS_SLOTS {
            self.handle
                .set(slot, Value::Function(progress_callback(tx.clone())))?;
        }
        if let Some(previous) = self.current_feed().replace(tx) {
            end_feed(&previous);
        }
        Ok(ProgressFeed::new(rx))
    }

    fn current_feed(&self) -> MutexGuard<'_, Option<EventSender<FeedItem>>> {
        self.feed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for AsyncReader {
    fn drop(&mut self) {
        let feed = self
            .feed
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(feed) = feed else {
            return;
        };
        // Detached callbacks may outlive their slot; the end marker is what
        // ends the feed.
        for slot in PROGRESS_SLOTS {
            if let Err(err) = self.handle.set(slot, Value::Null) {
                tracing::debug!(slot, %err, "could not clear progress callback");
            }
        }
        end_feed(&feed);
    }
}

fn end_feed(feed: &EventSender<FeedItem>) {
    if !feed.is_closed() {
        feed.push(FeedItem::End);
    }
}

/// Callback for a progress slot. Runs on the event loop, so it only
/// decodes and enqueues. Every notification yields exactly one update.
fn progress_callback(tx: EventSender<FeedItem>) -> Callback {
    Callback::new(move |args| {
        let descriptor = args.first().cloned().unwrap_or_default();
        let event = ProgressEvent::from_native(&descriptor);
        let name = args.get(1).and_then(Value::as_str).map(String::from);
        tx.push(FeedItem::Update(ProgressUpdate { event, name }));
    })
}

impl fmt::Debug for AsyncReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncReader").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use webbind_blob::{BinaryBlob, BlobOptions, FileHandle, FileOptions};
    use webbind_native::fake::{FakeBrowser, FakeBrowserConfig, PlainObject};

    fn browser(chunk: usize) -> Arc<dyn NativeRuntime> {
        FakeBrowser::with_config(FakeBrowserConfig {
            progress_chunk: chunk,
        })
        .into_runtime()
    }

    fn wait_done(reader: &AsyncReader) {
        while !reader.is_done().unwrap() {
            thread::yield_now();
        }
    }

    #[test]
    fn fresh_reader_is_empty() {
        let runtime = browser(4);
        let reader = AsyncReader::new(runtime.as_ref()).unwrap();
        assert_eq!(reader.ready_state().unwrap(), ReadyState::Empty);
        assert!(reader.is_empty().unwrap());
        assert_eq!(reader.error().unwrap(), "");
        assert!(reader.result().unwrap().is_null());
    }

    #[test]
    fn ready_state_from_native_number() {
        assert_eq!(ReadyState::try_from(1i64).unwrap(), ReadyState::Loading);
        assert!(ReadyState::try_from(3i64).is_err());
        assert_eq!(ReadyState::Done as i64, 2);
    }

    #[test]
    fn progress_arrives_in_order() {
        let runtime = browser(4);
        let blob = BinaryBlob::new(runtime.clone(), ["0123456789"], BlobOptions::default()).unwrap();
        let reader = AsyncReader::new(runtime.as_ref()).unwrap();
        let mut feed = reader.progress().unwrap();

        reader.read_as_array_buffer(&blob).unwrap();
        let loaded: Vec<u64> = feed
            .by_ref()
            .take(3)
            .map(|update| {
                assert_eq!(update.event.kind(), "progress");
                assert_eq!(update.event.total(), 10);
                assert!(update.name.is_none());
                update.event.loaded()
            })
            .collect();
        assert_eq!(loaded, vec![4, 8, 10]);

        wait_done(&reader);
        assert_eq!(reader.result().unwrap(), Value::Bytes(b"0123456789".to_vec()));
        assert_eq!(reader.error().unwrap(), "");
        assert!(feed.try_next_update().is_none());
    }

    #[test]
    fn progress_carries_file_name() {
        let runtime = browser(64);
        let file = FileHandle::new(runtime.clone(), ["abc"], "a.txt", FileOptions::default())
            .unwrap();
        let reader = AsyncReader::new(runtime.as_ref()).unwrap();
        let feed = reader.progress().unwrap();
        reader.read_as_text(&file, Some("utf-8")).unwrap();

        let update = feed.next_update().unwrap();
        assert_eq!(update.name.as_deref(), Some("a.txt"));
        wait_done(&reader);
        assert_eq!(reader.result().unwrap(), Value::from("abc"));
    }

    #[test]
    fn data_url_read() {
        let runtime = browser(64);
        let blob = BinaryBlob::new(runtime.clone(), ["hi"], BlobOptions::with_type("text/plain"))
            .unwrap();
        let reader = AsyncReader::new(runtime.as_ref()).unwrap();
        reader.read_as_data_url(&blob).unwrap();
        wait_done(&reader);
        assert_eq!(reader.result().unwrap(), Value::from("data:text/plain;base64,aGk="));
    }

    #[test]
    fn reading_closed_blob_sets_error() {
        let runtime = browser(64);
        let blob = BinaryBlob::new(runtime.clone(), ["gone"], BlobOptions::default()).unwrap();
        // Close natively so the wrapper's own check is not involved.
        blob.handle().call("close", vec![]).unwrap();
        let reader = AsyncReader::new(runtime.as_ref()).unwrap();
        reader.read_as_array_buffer(&blob).unwrap();
        wait_done(&reader);
        assert_eq!(reader.error().unwrap(), "the blob is closed");
        assert!(reader.result().unwrap().is_null());
    }

    #[test]
    fn reader_is_reusable() {
        let runtime = browser(64);
        let reader = AsyncReader::new(runtime.as_ref()).unwrap();
        for text in ["first", "second"] {
            let blob = BinaryBlob::new(runtime.clone(), [text], BlobOptions::default()).unwrap();
            reader.read_as_text(&blob, None).unwrap();
            wait_done(&reader);
            assert_eq!(reader.result().unwrap(), Value::from(text));
        }
    }

    #[test]
    fn abort_is_reported_on_the_feed() {
        let browser = FakeBrowser::new();
        // A worker script that holds the event loop until released.
        let (gate_tx, gate_rx) = event_queue::<()>("gate");
        browser.register_worker("stall.js", move |_, _| {
            gate_rx.recv_blocking();
        });
        let runtime = browser.into_runtime();
        let stall = runtime
            .construct("Worker", vec![Value::from("stall.js")])
            .unwrap();
        stall.call("postMessage", vec![Value::Null]).unwrap();

        let file = FileHandle::new(runtime.clone(), ["payload"], "p.bin", FileOptions::default())
            .unwrap();
        let reader = AsyncReader::new(runtime.as_ref()).unwrap();
        let feed = reader.progress().unwrap();
        reader.read_as_array_buffer(&file).unwrap();
        assert!(reader.is_loading().unwrap());

        reader.abort().unwrap();
        let update = feed.next_update().unwrap();
        assert_eq!(update.event.kind(), "abort");
        assert_eq!(update.name.as_deref(), Some("p.bin"));
        assert!(reader.is_done().unwrap());
        assert!(!reader.error().unwrap().is_empty());
        drop(gate_tx);

        // The stale read must not deliver anything once the loop resumes.
        let sync = AsyncReader::new(runtime.as_ref()).unwrap();
        let blob = BinaryBlob::new(runtime.clone(), ["x"], BlobOptions::default()).unwrap();
        sync.read_as_array_buffer(&blob).unwrap();
        wait_done(&sync);
        assert!(feed.try_next_update().is_none());
    }

    #[test]
    fn malformed_notification_still_yields_one_update() {
        let runtime = browser(4);
        let reader = AsyncReader::new(runtime.as_ref()).unwrap();
        let feed = reader.progress().unwrap();

        let descriptor = PlainObject::new();
        descriptor.insert("type", Value::Integer(7));
        let Value::Function(onprogress) = reader.handle().get("onprogress").unwrap() else {
            panic!("onprogress not installed");
        };
        onprogress.invoke(&[Value::Object(Arc::new(descriptor))]);

        let update = feed.try_next_update().unwrap();
        assert_eq!(update.event, ProgressEvent::default());
        assert!(update.name.is_none());
        assert!(feed.try_next_update().is_none());
    }

    #[test]
    fn dropping_reader_ends_feed_after_drain() {
        let runtime = browser(4);
        let blob = BinaryBlob::new(runtime.clone(), ["abcdefgh"], BlobOptions::default()).unwrap();
        let reader = AsyncReader::new(runtime.as_ref()).unwrap();
        let feed = reader.progress().unwrap();
        reader.read_as_array_buffer(&blob).unwrap();
        wait_done(&reader);
        drop(reader);

        let loaded: Vec<u64> = feed.map(|update| update.event.loaded()).collect();
        assert_eq!(loaded, vec![4, 8]);
    }

    #[test]
    fn dropping_reader_leaves_unrelated_handlers_alone() {
        let runtime = browser(4);
        let handle = runtime.construct("FileReader", vec![]).unwrap();
        handle
            .set("onprogress", Value::Function(Callback::new(|_| {})))
            .unwrap();
        drop(AsyncReader::from_handle(handle.clone()));
        assert!(matches!(handle.get("onprogress").unwrap(), Value::Function(_)));
    }

    #[test]
    fn second_progress_call_ends_first_feed() {
        let runtime = browser(4);
        let reader = AsyncReader::new(runtime.as_ref()).unwrap();
        let first = reader.progress().unwrap();
        let second = reader.progress().unwrap();
        assert!(first.next_update().is_none());

        let blob = BinaryBlob::new(runtime.clone(), ["abcd"], BlobOptions::default()).unwrap();
        reader.read_as_array_buffer(&blob).unwrap();
        assert_eq!(second.next_update().unwrap().event.loaded(), 4);
    }
}
