use std::sync::Mutex;
use std::time::Instant;

use super::*;
use crate::encode::sink::{AbortHandle, FrameSink, InMemorySink};

fn cfg() -> SinkConfig {
    SinkConfig {
        width: 1,
        height: 1,
        fps: 4,
    }
}

fn range(start: u64, end: u64) -> FrameRange {
    FrameRange::new(FrameIndex(start), FrameIndex(end)).unwrap()
}

fn frame(f: FrameIndex) -> CoverflowResult<Surface> {
    Ok(Surface::filled(1, 1, [f.0 as u8, 0, 0, 255]))
}

#[derive(Default)]
struct FlakySink {
    fail_begin: bool,
    fail_at: Option<u64>,
    pushed: Vec<u64>,
    ends: u32,
}

impl FrameSink for FlakySink {
    fn begin(&mut self, _cfg: SinkConfig) -> CoverflowResult<()> {
        if self.fail_begin {
            return Err(CoverflowError::encode("cannot open output"));
        }
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, _frame: &Surface) -> CoverflowResult<()> {
        if self.fail_at == Some(idx.0) {
            return Err(CoverflowError::encode("disk full"));
        }
        self.pushed.push(idx.0);
        Ok(())
    }

    fn end(&mut self) -> CoverflowResult<()> {
        self.ends += 1;
        Ok(())
    }
}

/// Blocks in `push_frame` until aborted or `stall` elapses, like a wedged encoder process.
struct StallingSink {
    stall: Duration,
    aborted: Arc<AtomicBool>,
    ended: Arc<AtomicBool>,
}

impl StallingSink {
    fn new(stall: Duration) -> Self {
        Self {
            stall,
            aborted: Arc::new(AtomicBool::new(false)),
            ended: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl FrameSink for StallingSink {
    fn begin(&mut self, _cfg: SinkConfig) -> CoverflowResult<()> {
        Ok(())
    }

    fn push_frame(&mut self, _idx: FrameIndex, _frame: &Surface) -> CoverflowResult<()> {
        let start = Instant::now();
        while start.elapsed() < self.stall {
            if self.aborted.load(Ordering::SeqCst) {
                return Err(CoverflowError::encode("output aborted"));
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        Ok(())
    }

    fn end(&mut self) -> CoverflowResult<()> {
        self.ended.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn abort_handle(&self) -> Option<AbortHandle> {
        let aborted = Arc::clone(&self.aborted);
        Some(AbortHandle::new(move || aborted.store(true, Ordering::SeqCst)))
    }
}

fn shared<S: FrameSink + 'static>(sink: S) -> Arc<Mutex<S>> {
    Arc::new(Mutex::new(sink))
}

fn wait_for(flag: &AtomicBool, limit: Duration) -> bool {
    let start = Instant::now();
    while !flag.load(Ordering::SeqCst) && start.elapsed() < limit {
        std::thread::sleep(Duration::from_millis(10));
    }
    flag.load(Ordering::SeqCst)
}

#[test]
fn frames_arrive_in_order_with_progress() {
    let sink = shared(InMemorySink::new());
    let mut seen = Vec::new();
    let stats = run_pipeline(
        sink.clone(),
        cfg(),
        range(0, 10),
        &PipelineOpts::default(),
        &CancelToken::new(),
        frame,
        |done, total| seen.push((done, total)),
    )
    .unwrap();

    assert_eq!(stats.status, RenderStatus::Completed);
    assert_eq!(stats.frames_total, 10);
    assert_eq!(stats.frames_encoded, 10);
    let sink = sink.lock().unwrap();
    assert!(sink.is_ended());
    let order: Vec<u64> = sink.frames().iter().map(|(i, _)| i.0).collect();
    assert_eq!(order, (0..10).collect::<Vec<_>>());
    assert_eq!(sink.frames()[7].1.pixel(0, 0)[0], 7);
    assert_eq!(seen.len(), 10);
    assert_eq!(seen.last(), Some(&(10, 10)));
}

#[test]
fn sub_range_reports_its_own_total() {
    let sink = shared(InMemorySink::new());
    let mut seen = Vec::new();
    let opts = PipelineOpts {
        queue_capacity: Some(1),
        ..PipelineOpts::default()
    };
    run_pipeline(
        sink.clone(),
        cfg(),
        range(3, 7),
        &opts,
        &CancelToken::new(),
        frame,
        |done, total| seen.push((done, total)),
    )
    .unwrap();
    let order: Vec<u64> = sink.lock().unwrap().frames().iter().map(|(i, _)| i.0).collect();
    assert_eq!(order, vec![3, 4, 5, 6]);
    assert_eq!(seen, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
}

#[test]
fn cancellation_stops_and_closes_the_sink() {
    let sink = shared(FlakySink::default());
    let cancel = CancelToken::new();
    let trip = cancel.clone();
    let stats = run_pipeline(
        sink.clone(),
        cfg(),
        range(0, 100),
        &PipelineOpts::default(),
        &cancel,
        |f| {
            if f.0 == 5 {
                trip.cancel();
            }
            frame(f)
        },
        |_, _| {},
    )
    .unwrap();
    assert_eq!(stats.status, RenderStatus::Cancelled);
    assert!(stats.frames_rendered <= 6);
    let sink = sink.lock().unwrap();
    assert!(sink.pushed.len() <= 6);
    assert!(sink.pushed.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(sink.ends, 1);
}

#[test]
fn pre_cancelled_run_renders_nothing() {
    let sink = shared(FlakySink::default());
    let cancel = CancelToken::new();
    cancel.cancel();
    let stats = run_pipeline(
        sink.clone(),
        cfg(),
        range(0, 10),
        &PipelineOpts::default(),
        &cancel,
        frame,
        |_, _| {},
    )
    .unwrap();
    assert_eq!(stats.status, RenderStatus::Cancelled);
    assert_eq!(stats.frames_rendered, 0);
    let sink = sink.lock().unwrap();
    assert!(sink.pushed.is_empty());
    assert_eq!(sink.ends, 1);
}

#[test]
fn begin_failure_is_returned_immediately() {
    let sink = shared(FlakySink {
        fail_begin: true,
        ..FlakySink::default()
    });
    let mut rendered = 0;
    let err = run_pipeline(
        sink.clone(),
        cfg(),
        range(0, 10),
        &PipelineOpts::default(),
        &CancelToken::new(),
        |f| {
            rendered += 1;
            frame(f)
        },
        |_, _| {},
    )
    .unwrap_err();
    assert!(matches!(err, CoverflowError::Encode(_)));
    assert_eq!(rendered, 0);
    assert_eq!(sink.lock().unwrap().ends, 0);
}

#[test]
fn sink_errors_surface_after_shutdown() {
    let sink = shared(FlakySink {
        fail_at: Some(3),
        ..FlakySink::default()
    });
    let err = run_pipeline(
        sink.clone(),
        cfg(),
        range(0, 50),
        &PipelineOpts {
            queue_capacity: Some(2),
            ..PipelineOpts::default()
        },
        &CancelToken::new(),
        frame,
        |_, _| {},
    )
    .unwrap_err();
    assert!(err.to_string().contains("disk full"));
    let sink = sink.lock().unwrap();
    assert_eq!(sink.pushed, vec![0, 1, 2]);
    assert_eq!(sink.ends, 1);
}

#[test]
fn render_errors_surface_and_close_the_sink() {
    let sink = shared(FlakySink::default());
    let err = run_pipeline(
        sink.clone(),
        cfg(),
        range(0, 10),
        &PipelineOpts::default(),
        &CancelToken::new(),
        |f| {
            if f.0 == 4 {
                Err(CoverflowError::render("boom"))
            } else {
                frame(f)
            }
        },
        |_, _| {},
    )
    .unwrap_err();
    assert!(matches!(err, CoverflowError::Render(_)));
    let sink = sink.lock().unwrap();
    assert_eq!(sink.pushed, vec![0, 1, 2, 3]);
    assert_eq!(sink.ends, 1);
}

#[test]
fn stalled_sink_is_aborted_after_the_shutdown_timeout() {
    let sink = StallingSink::new(Duration::from_secs(3));
    let (aborted, ended) = (Arc::clone(&sink.aborted), Arc::clone(&sink.ended));
    let cancel = CancelToken::new();
    let trip = cancel.clone();
    let opts = PipelineOpts {
        shutdown_timeout: Duration::from_millis(200),
        ..PipelineOpts::default()
    };

    let start = Instant::now();
    let stats = run_pipeline(
        shared(sink),
        cfg(),
        range(0, 50),
        &opts,
        &cancel,
        |f| {
            if f.0 == 3 {
                std::thread::sleep(Duration::from_millis(100));
                trip.cancel();
            }
            frame(f)
        },
        |_, _| {},
    )
    .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(stats.status, RenderStatus::Cancelled);
    assert!(elapsed < Duration::from_secs(1), "shutdown took {elapsed:?}");
    assert!(aborted.load(Ordering::SeqCst));
    // The encoder thread still ends the sink once the aborted push returns.
    assert!(wait_for(&ended, Duration::from_secs(5)));
}

#[test]
fn stalled_sink_fails_a_run_that_was_not_cancelled() {
    let sink = StallingSink::new(Duration::from_secs(3));
    let aborted = Arc::clone(&sink.aborted);
    let opts = PipelineOpts {
        shutdown_timeout: Duration::from_millis(200),
        ..PipelineOpts::default()
    };

    let start = Instant::now();
    let err = run_pipeline(
        shared(sink),
        cfg(),
        range(0, 3),
        &opts,
        &CancelToken::new(),
        frame,
        |_, _| {},
    )
    .unwrap_err();

    assert!(matches!(err, CoverflowError::Encode(_)));
    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(aborted.load(Ordering::SeqCst));
}

#[test]
fn cancel_reaches_a_producer_waiting_on_a_full_queue() {
    let sink = StallingSink::new(Duration::from_secs(3));
    let aborted = Arc::clone(&sink.aborted);
    let cancel = CancelToken::new();
    let trip = cancel.clone();
    let opts = PipelineOpts {
        queue_capacity: Some(1),
        shutdown_timeout: Duration::from_millis(200),
        ..PipelineOpts::default()
    };
    let canceller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(150));
        trip.cancel();
    });

    let start = Instant::now();
    let stats = run_pipeline(
        shared(sink),
        cfg(),
        range(0, 50),
        &opts,
        &cancel,
        frame,
        |_, _| {},
    )
    .unwrap();
    canceller.join().unwrap();

    assert_eq!(stats.status, RenderStatus::Cancelled);
    assert!(stats.frames_rendered < 50);
    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(aborted.load(Ordering::SeqCst));
}

#[test]
fn cancel_token_clones_share_state() {
    let a = CancelToken::new();
    let b = a.clone();
    assert!(!b.is_cancelled());
    a.cancel();
    assert!(b.is_cancelled());
}
