use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};

use webbind::native::fake::{FakeBrowser, FakeBrowserConfig};
use webbind::native::ObjectExt;
use webbind::{
    AsyncReader, BackgroundWorker, BinaryBlob, Blob, BlobError, BlobOptions, File, FileHandle,
    FileOptions, NativeRuntime, Value, WorkerError,
};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Op {
    op: String,
}

fn ping_pong_runtime() -> Arc<dyn NativeRuntime> {
    let browser = FakeBrowser::new();
    browser.register_worker("pong.js", |scope, message| {
        match message.field("op").and_then(Value::as_str) {
            Some("ping") => {
                let mut reply = Value::map();
                reply.insert("op", Value::from("pong"));
                scope.post_message(reply);
            }
            _ => scope.raise_error("unknown op"),
        }
    });
    browser.register_worker("size.js", |scope, message| {
        let size = message
            .as_object()
            .and_then(|blob| blob.get_u64("size").ok())
            .unwrap_or_default();
        scope.post_message(Value::from(size));
    });
    browser.into_runtime()
}

#[test]
fn text_blob_lifecycle() {
    let runtime = FakeBrowser::new().into_runtime();
    let blob = BinaryBlob::new(
        runtime,
        ["some blobby data"],
        BlobOptions::with_type("text/plain"),
    )
    .unwrap();
    assert_eq!(blob.size().unwrap(), 16);
    assert_eq!(blob.mime_type().unwrap(), "text/plain");

    blob.close().unwrap();
    blob.close().unwrap();
    assert!(matches!(blob.bytes(), Err(BlobError::Closed)));
}

#[test]
fn file_bytes_rewrapped_keep_size() {
    let runtime = FakeBrowser::new().into_runtime();
    let content: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
    let file = FileHandle::new(
        runtime.clone(),
        [content.clone()],
        "data.bin",
        FileOptions::default(),
    )
    .unwrap();
    assert_eq!(file.name().unwrap(), "data.bin");

    let bytes = file.bytes().unwrap();
    assert_eq!(bytes, content);
    let copy = BinaryBlob::new(runtime, [bytes], BlobOptions::default()).unwrap();
    assert_eq!(copy.size().unwrap(), file.size().unwrap());
}

#[test]
fn worker_ping_pong() {
    let runtime = ping_pong_runtime();
    let worker = BackgroundWorker::new(&runtime, "pong.js").unwrap();

    worker.send_serialized(&Op { op: "ping".into() }).unwrap();
    let reply: Op = worker.receive_as().unwrap().unwrap();
    assert_eq!(reply, Op { op: "pong".into() });

    worker.send_serialized(&Op { op: "jump".into() }).unwrap();
    assert!(matches!(worker.receive(), Err(WorkerError::Reported(_))));

    worker.terminate().unwrap();
    assert_eq!(worker.receive().unwrap(), None);
}

#[test]
fn blob_handed_to_worker() {
    let runtime = ping_pong_runtime();
    let blob = BinaryBlob::new(runtime.clone(), ["twelve bytes"], BlobOptions::default()).unwrap();
    let worker = BackgroundWorker::new(&runtime, "size.js").unwrap();
    worker.send(Value::from(&blob)).unwrap();
    assert_eq!(worker.receive().unwrap(), Some(Value::from(12u64)));
}

#[test]
fn progress_while_reading_file() {
    let runtime = FakeBrowser::with_config(FakeBrowserConfig { progress_chunk: 100 }).into_runtime();
    let file = FileHandle::new(
        runtime.clone(),
        [vec![7u8; 1_000]],
        "sevens.bin",
        FileOptions::default(),
    )
    .unwrap();
    let reader = AsyncReader::new(runtime.as_ref()).unwrap();
    let feed = reader.progress().unwrap();
    reader.read_as_array_buffer(&file).unwrap();

    let mut seen = BTreeSet::new();
    let mut last = 0;
    for _ in 0..10 {
        let update = feed.next_update().unwrap();
        assert_eq!(update.name.as_deref(), Some("sevens.bin"));
        assert!(update.event.loaded() > last);
        last = update.event.loaded();
        assert!(seen.insert(last));
    }
    assert_eq!(last, 1_000);
}

#[test]
fn consumer_thread_and_producer_thread() {
    let browser = FakeBrowser::new();
    browser.register_worker("echo.js", |scope, message| scope.post_message(message));
    let runtime = browser.into_runtime();
    let worker = Arc::new(BackgroundWorker::new(&runtime, "echo.js").unwrap());

    let consumer = {
        let worker = worker.clone();
        thread::spawn(move || {
            let mut received = Vec::new();
            while let Some(value) = worker.receive().unwrap() {
                received.push(value);
                if received.len() == 100 {
                    break;
                }
            }
            received
        })
    };
    for i in 0..100i64 {
        worker.send(Value::from(i)).unwrap();
    }
    let received = consumer.join().unwrap();
    let expected: Vec<Value> = (0..100i64).map(Value::from).collect();
    assert_eq!(received, expected);

    worker.terminate().unwrap();
    assert!(matches!(
        worker.send(Value::Null),
        Err(WorkerError::Terminated)
    ));
}

#[test]
fn terminate_unblocks_waiting_thread() {
    let browser = FakeBrowser::new();
    browser.register_worker("silent.js", |_, _| {});
    let runtime = browser.into_runtime();
    let worker = Arc::new(BackgroundWorker::new(&runtime, "silent.js").unwrap());

    let waiter = {
        let worker = worker.clone();
        thread::spawn(move || worker.receive().unwrap())
    };
    worker.send(Value::from("ignored")).unwrap();
    worker.terminate().unwrap();
    assert_eq!(waiter.join().unwrap(), None);
}
