//! Blocking full-content read through a native FileReader.

use webbind_native::{
    describe_error, event_queue, Callback, Error, Handle, NativeRuntime, ObjectExt, Value,
};

use crate::{BlobError, Result};

#[derive(Clone, Copy)]
enum Outcome {
    Loaded,
    Failed,
    Aborted,
}

const SLOTS: [(&str, Outcome); 3] = [
    ("onload", Outcome::Loaded),
    ("onerror", Outcome::Failed),
    ("onabort", Outcome::Aborted),
];

/// Read all bytes of `blob`, blocking until the native read completes.
pub(crate) fn read_to_end(runtime: &dyn NativeRuntime, blob: &Handle) -> Result<Vec<u8>> {
    let reader = runtime.construct("FileReader", vec![])?;

    let (tx, rx) = event_queue("blob-read");
    for (slot, outcome) in SLOTS {
        let tx = tx.clone();
        reader.set(
            slot,
            Value::Function(Callback::new(move |_| {
                tx.push(outcome);
            })),
        )?;
    }
    // Only the installed callbacks hold senders now: if the reader drops
    // them without firing, the wait below ends instead of hanging.
    drop(tx);

    reader.call("readAsArrayBuffer", vec![Value::Object(blob.clone())])?;
    let outcome = rx.recv_blocking();

    for (slot, _) in SLOTS {
        reader.set(slot, Value::Null)?;
    }

    match outcome {
        Some(Outcome::Loaded) => {
            let bytes = reader.get_bytes("result")?;
            tracing::debug!(len = bytes.len(), "blob read complete");
            Ok(bytes)
        }
        Some(Outcome::Failed) => {
            let diagnostic = describe_error(&reader.get("error")?);
            tracing::debug!(%diagnostic, "blob read failed");
            Err(BlobError::Read(diagnostic))
        }
        Some(Outcome::Aborted) => Err(BlobError::Read("read aborted".to_string())),
        None => Err(Error::Disconnected.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use webbind_native::fake::{FakeBlob, FakeBrowser};

    #[test]
    fn read_closed_blob_reports_native_error() {
        let runtime = FakeBrowser::new().into_runtime();
        let blob: Handle = Arc::new(FakeBlob::new(b"abc".to_vec(), String::new()));
        blob.call("close", vec![]).unwrap();
        // Bypasses the wrapper's closed check to exercise the native failure.
        match read_to_end(runtime.as_ref(), &blob) {
            Err(BlobError::Read(message)) => assert!(message.contains("closed")),
            other => panic!("expected read error, got {:?}", other),
        }
    }

    #[test]
    fn read_large_blob_across_many_progress_events() {
        let runtime = FakeBrowser::new().into_runtime();
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        let blob: Handle = Arc::new(FakeBlob::new(data.clone(), String::new()));
        assert_eq!(read_to_end(runtime.as_ref(), &blob).unwrap(), data);
    }
}
