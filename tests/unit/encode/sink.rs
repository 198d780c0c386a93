use super::*;

#[test]
fn in_memory_sink_records_frames_and_end() {
    let mut sink = InMemorySink::new();
    assert!(sink.config().is_none());
    sink.begin(SinkConfig {
        width: 2,
        height: 2,
        fps: 30,
    })
    .unwrap();
    sink.push_frame(FrameIndex(0), &Surface::new(2, 2)).unwrap();
    sink.push_frame(FrameIndex(1), &Surface::new(2, 2)).unwrap();
    assert!(!sink.is_ended());
    sink.end().unwrap();

    assert!(sink.is_ended());
    assert_eq!(sink.config().unwrap().fps, 30);
    let idx: Vec<u64> = sink.frames().iter().map(|(i, _)| i.0).collect();
    assert_eq!(idx, vec![0, 1]);
}

#[test]
fn begin_resets_previous_run() {
    let mut sink = InMemorySink::new();
    let cfg = SinkConfig {
        width: 1,
        height: 1,
        fps: 1,
    };
    sink.begin(cfg.clone()).unwrap();
    sink.push_frame(FrameIndex(0), &Surface::new(1, 1)).unwrap();
    sink.end().unwrap();
    sink.begin(cfg).unwrap();
    assert!(sink.frames().is_empty());
    assert!(!sink.is_ended());
}

#[test]
fn in_memory_sink_has_no_abort_handle() {
    assert!(InMemorySink::new().abort_handle().is_none());
}

#[test]
fn abort_handle_clones_share_the_callback() {
    use std::sync::atomic::{AtomicU32, Ordering};

    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let handle = AbortHandle::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    handle.clone().abort();
    handle.abort();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn concrete_sinks_coerce_to_shared_sink() {
    let sink = Arc::new(Mutex::new(InMemorySink::new()));
    let shared: SharedSink = sink.clone();
    shared
        .lock()
        .unwrap()
        .begin(SinkConfig {
            width: 1,
            height: 1,
            fps: 1,
        })
        .unwrap();
    assert!(sink.lock().unwrap().config().is_some());
}
