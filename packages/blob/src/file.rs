//! The File capability: a Blob with a name and a modification time.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use webbind_native::{Error, Handle, NativeRuntime, ObjectExt, Value};

use crate::blob::{BinaryBlob, Blob};
use crate::options::FileOptions;
use crate::Result;

/// A blob that came from (or stands for) a file.
pub trait File: Blob {
    /// The file's name, without path information.
    fn name(&self) -> Result<String> {
        Ok(self.handle().get_string("name")?)
    }

    /// When the file was last modified.
    fn last_modified_date(&self) -> Result<DateTime<Utc>> {
        let millis = self.handle().get_i64("lastModified")?;
        DateTime::from_timestamp_millis(millis).ok_or_else(|| {
            Error::type_mismatch("lastModified", "timestamp in range", "integer").into()
        })
    }
}

/// A native `File`, usually handed over by a file input or drop event.
#[derive(Clone)]
pub struct FileHandle {
    runtime: Arc<dyn NativeRuntime>,
    handle: Handle,
}

impl FileHandle {
    /// Create a file from parts, as `new File(parts, name, options)`.
    pub fn new<I>(
        runtime: Arc<dyn NativeRuntime>,
        parts: I,
        name: &str,
        options: FileOptions,
    ) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let parts: Value = parts.into_iter().map(Into::into).collect();
        let handle = runtime.construct(
            "File",
            vec![parts, Value::from(name), options.to_native()?],
        )?;
        tracing::debug!(name, "file created");
        Ok(Self { runtime, handle })
    }

    /// Wrap an existing native file handle.
    pub fn from_handle(runtime: Arc<dyn NativeRuntime>, handle: Handle) -> Self {
        Self { runtime, handle }
    }

    /// View this file as a plain blob.
    pub fn as_blob(&self) -> BinaryBlob {
        BinaryBlob::from_handle(self.runtime.clone(), self.handle.clone())
    }
}

impl Blob for FileHandle {
    fn handle(&self) -> &Handle {
        &self.handle
    }

    fn runtime(&self) -> &Arc<dyn NativeRuntime> {
        &self.runtime
    }
}

impl File for FileHandle {}

impl From<&FileHandle> for Value {
    fn from(file: &FileHandle) -> Self {
        Value::Object(file.handle.clone())
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BlobError, BlobOptions};
    use webbind_native::fake::FakeBrowser;

    fn notes(runtime: Arc<dyn NativeRuntime>) -> FileHandle {
        FileHandle::new(
            runtime,
            ["line one\n", "line two\n"],
            "notes.txt",
            FileOptions {
                content_type: "text/plain".into(),
                last_modified: DateTime::from_timestamp_millis(1_600_000_000_000),
            },
        )
        .unwrap()
    }

    #[test]
    fn file_metadata() {
        let file = notes(FakeBrowser::new().into_runtime());
        assert_eq!(file.name().unwrap(), "notes.txt");
        assert_eq!(
            file.last_modified_date().unwrap().timestamp_millis(),
            1_600_000_000_000
        );
        assert_eq!(file.size().unwrap(), 18);
        assert_eq!(file.mime_type().unwrap(), "text/plain");
    }

    #[test]
    fn default_timestamp_is_recent() {
        let runtime = FakeBrowser::new().into_runtime();
        let before = Utc::now().timestamp_millis();
        let file = FileHandle::new(runtime, ["x"], "x.bin", FileOptions::default()).unwrap();
        let stamp = file.last_modified_date().unwrap().timestamp_millis();
        assert!(stamp >= before);
    }

    #[test]
    fn bytes_round_trip_into_new_blob() {
        let runtime = FakeBrowser::new().into_runtime();
        let file = notes(runtime.clone());
        let bytes = file.bytes().unwrap();
        let copy = BinaryBlob::new(runtime, [bytes], BlobOptions::default()).unwrap();
        assert_eq!(copy.size().unwrap(), file.size().unwrap());
    }

    #[test]
    fn closed_file_cannot_be_read() {
        let file = notes(FakeBrowser::new().into_runtime());
        file.close().unwrap();
        assert!(matches!(file.bytes(), Err(BlobError::Closed)));
        assert!(file.as_blob().is_closed().unwrap());
    }

    #[test]
    fn slice_of_file_is_plain_blob() {
        let file = notes(FakeBrowser::new().into_runtime());
        let first_line = file.slice(0, 9, "text/plain").unwrap();
        assert_eq!(first_line.bytes().unwrap(), b"line one\n");
        assert_eq!(first_line.handle().get_string("name").unwrap(), "");
    }
}
