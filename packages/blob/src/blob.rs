//! The Blob capability and its plain implementation.

use std::fmt;
use std::sync::Arc;

use webbind_native::{Error, Handle, NativeRuntime, ObjectExt, Value};

use crate::options::BlobOptions;
use crate::read::read_to_end;
use crate::{BlobError, Result};

/// Operations shared by every blob-like native object.
///
/// Implementors only provide the handle and runtime; every operation is a
/// property read or method call on the handle.
pub trait Blob {
    /// The native object behind this blob.
    fn handle(&self) -> &Handle;

    /// The runtime the blob was created in; used to construct readers.
    fn runtime(&self) -> &Arc<dyn NativeRuntime>;

    /// Size, in bytes, of the blob's data.
    fn size(&self) -> Result<u64> {
        Ok(self.handle().get_u64("size")?)
    }

    /// MIME type of the blob's data. Empty if unknown.
    fn mime_type(&self) -> Result<String> {
        Ok(self.handle().get_string("type")?)
    }

    /// True once `close` has been called, here or natively. Closed blobs
    /// cannot be read.
    fn is_closed(&self) -> Result<bool> {
        Ok(self.handle().get_bool("isClosed")?)
    }

    /// Close the blob, possibly freeing native resources. Idempotent.
    fn close(&self) -> Result<()> {
        if self.is_closed()? {
            return Ok(());
        }
        self.handle().call("close", vec![])?;
        tracing::debug!("blob closed");
        Ok(())
    }

    /// A new blob covering bytes `[start, end)` of this one.
    ///
    /// Bounds are checked here; the native `slice` would otherwise clamp
    /// silently.
    fn slice(&self, start: u64, end: u64, content_type: &str) -> Result<BinaryBlob> {
        ensure_open(self)?;
        let size = self.size()?;
        if start > end || end > size {
            return Err(BlobError::InvalidRange { start, end, size });
        }
        let sliced = self.handle().call(
            "slice",
            vec![
                Value::from(start),
                Value::from(end),
                Value::from(content_type),
            ],
        )?;
        match sliced {
            Value::Object(handle) => Ok(BinaryBlob::from_handle(self.runtime().clone(), handle)),
            other => Err(Error::type_mismatch("slice", "object", other.kind()).into()),
        }
    }

    /// The full content of the blob.
    ///
    /// Starts a native read and blocks the calling thread until it
    /// completes. Never call this on the native event loop.
    fn bytes(&self) -> Result<Vec<u8>> {
        ensure_open(self)?;
        read_to_end(self.runtime().as_ref(), self.handle())
    }
}

fn ensure_open<B: Blob + ?Sized>(blob: &B) -> Result<()> {
    if blob.is_closed()? {
        return Err(BlobError::Closed);
    }
    Ok(())
}

/// A native `Blob`.
#[derive(Clone)]
pub struct BinaryBlob {
    runtime: Arc<dyn NativeRuntime>,
    handle: Handle,
}

impl BinaryBlob {
    /// Create a blob whose content is the concatenation of `parts`.
    ///
    /// Parts may be strings, bytes, or other blobs.
    pub fn new<I>(runtime: Arc<dyn NativeRuntime>, parts: I, options: BlobOptions) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let parts: Value = parts.into_iter().map(Into::into).collect();
        let handle = runtime.construct("Blob", vec![parts, options.to_native()?])?;
        tracing::debug!(content_type = %options.content_type, "blob created");
        Ok(Self { runtime, handle })
    }

    /// Wrap an existing native blob handle.
    pub fn from_handle(runtime: Arc<dyn NativeRuntime>, handle: Handle) -> Self {
        Self { runtime, handle }
    }
}

impl Blob for BinaryBlob {
    fn handle(&self) -> &Handle {
        &self.handle
    }

    fn runtime(&self) -> &Arc<dyn NativeRuntime> {
        &self.runtime
    }
}

impl From<&BinaryBlob> for Value {
    fn from(blob: &BinaryBlob) -> Self {
        Value::Object(blob.handle.clone())
    }
}

impl fmt::Debug for BinaryBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryBlob").finish_non_exhaustive()
    }
}
