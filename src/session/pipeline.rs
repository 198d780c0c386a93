//! Bounded render/encode hand-off.
//!
//! The calling thread renders frames and pushes them into a bounded queue; one encoder thread
//! pops them in order and feeds the [`crate::encode::sink::FrameSink`]. Cancellation is
//! cooperative and checked before every frame.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, TrySendError};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use crate::encode::sink::{SharedSink, SinkConfig};
use crate::foundation::core::{FrameIndex, FrameRange, Surface};
use crate::foundation::error::{CoverflowError, CoverflowResult};

/// Retry delay while the frame queue is full.
const SEND_BACKOFF: Duration = Duration::from_millis(2);

/// Shared cancellation flag.
///
/// Clones observe the same flag; once cancelled it stays cancelled.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create an untripped token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Return `true` once [`CancelToken::cancel`] was called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options controlling queueing and shutdown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineOpts {
    /// Queue capacity in frames. `None` uses one second of frames (`fps`).
    pub queue_capacity: Option<usize>,
    /// How long the encoder waits on an empty queue before re-checking for shutdown.
    pub poll_interval: Duration,
    /// How long to wait for the encoder thread to wind down before aborting the sink.
    pub shutdown_timeout: Duration,
}

impl Default for PipelineOpts {
    fn default() -> Self {
        Self {
            queue_capacity: None,
            poll_interval: Duration::from_millis(100),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderStatus {
    /// Every frame in the range was encoded.
    Completed,
    /// The cancel token was tripped.
    Cancelled,
}

/// Range render statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderStats {
    /// Completion status.
    pub status: RenderStatus,
    /// Frames in the requested range.
    pub frames_total: u64,
    /// Frames rendered and queued.
    pub frames_rendered: u64,
    /// Frames accepted by the sink.
    pub frames_encoded: u64,
}

#[derive(Debug)]
struct FrameMsg {
    idx: FrameIndex,
    frame: Surface,
}

#[derive(Debug)]
struct EncoderOutcome {
    push_err: Option<CoverflowError>,
    end_res: CoverflowResult<()>,
}

/// Render `range` with `render` and stream the frames into `sink`.
///
/// `progress(done, total)` runs on the calling thread after each rendered frame. Once `begin`
/// succeeded the encoder thread always ends the sink, also on error or cancellation. If that
/// thread does not stop within [`PipelineOpts::shutdown_timeout`], the sink's abort handle is
/// fired and the call returns without waiting for it.
#[tracing::instrument(skip_all, fields(start = range.start.0, end = range.end.0))]
pub fn run_pipeline<R, P>(
    sink: SharedSink,
    sink_cfg: SinkConfig,
    range: FrameRange,
    opts: &PipelineOpts,
    cancel: &CancelToken,
    mut render: R,
    mut progress: P,
) -> CoverflowResult<RenderStats>
where
    R: FnMut(FrameIndex) -> CoverflowResult<Surface>,
    P: FnMut(u64, u64),
{
    let cap = opts
        .queue_capacity
        .unwrap_or(sink_cfg.fps as usize)
        .max(1);
    let abort = {
        let mut guard = sink.lock().unwrap_or_else(PoisonError::into_inner);
        guard.begin(sink_cfg)?;
        guard.abort_handle()
    };

    let total = range.len_frames();
    let done = Arc::new(AtomicBool::new(false));
    let abandoned = Arc::new(AtomicBool::new(false));
    let encoded = Arc::new(AtomicU64::new(0));
    let (tx, rx) = mpsc::sync_channel::<FrameMsg>(cap);
    let (exit_tx, exit_rx) = mpsc::channel::<()>();

    let encoder = {
        let sink = Arc::clone(&sink);
        let cancel = cancel.clone();
        let done = Arc::clone(&done);
        let abandoned = Arc::clone(&abandoned);
        let encoded = Arc::clone(&encoded);
        let poll = opts.poll_interval;
        std::thread::Builder::new()
            .name("coverflow-encode".to_owned())
            .spawn(move || {
                let mut push_err = None;
                loop {
                    match rx.recv_timeout(poll) {
                        Ok(msg) => {
                            if abandoned.load(Ordering::SeqCst) {
                                break;
                            }
                            if cancel.is_cancelled() {
                                continue;
                            }
                            let pushed = sink
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner)
                                .push_frame(msg.idx, &msg.frame);
                            if let Err(e) = pushed {
                                push_err = Some(e);
                                break;
                            }
                            encoded.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(RecvTimeoutError::Timeout) => {
                            if done.load(Ordering::SeqCst) {
                                break;
                            }
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                // Unblocks a producer waiting on a full queue.
                drop(rx);
                let end_res = sink.lock().unwrap_or_else(PoisonError::into_inner).end();
                let _ = exit_tx.send(());
                EncoderOutcome { push_err, end_res }
            })
    };
    let encoder = match encoder {
        Ok(handle) => handle,
        Err(e) => {
            let _ = sink.lock().unwrap_or_else(PoisonError::into_inner).end();
            return Err(CoverflowError::encode(format!(
                "failed to spawn encoder thread: {e}"
            )));
        }
    };

    let mut rendered = 0u64;
    let mut produce_res = Ok(());
    for f in range.start.0..range.end.0 {
        if cancel.is_cancelled() {
            break;
        }
        let frame = match render(FrameIndex(f)) {
            Ok(frame) => frame,
            Err(e) if e.is_cancelled() => break,
            Err(e) => {
                produce_res = Err(e);
                break;
            }
        };
        let mut msg = FrameMsg {
            idx: FrameIndex(f),
            frame,
        };
        let sent = loop {
            match tx.try_send(msg) {
                Ok(()) => break true,
                // A full queue must not hide a cancel from a wedged encoder.
                Err(TrySendError::Full(back)) if !cancel.is_cancelled() => {
                    msg = back;
                    std::thread::sleep(SEND_BACKOFF);
                }
                Err(TrySendError::Full(_)) => break false,
                // Encoder stopped; its error is in the outcome.
                Err(TrySendError::Disconnected(_)) => break false,
            }
        };
        if !sent {
            break;
        }
        rendered += 1;
        progress(rendered, total);
    }

    done.store(true, Ordering::SeqCst);
    drop(tx);
    let outcome = match exit_rx.recv_timeout(opts.shutdown_timeout) {
        Ok(()) | Err(RecvTimeoutError::Disconnected) => Some(
            encoder
                .join()
                .map_err(|_| CoverflowError::encode("encoder thread panicked"))?,
        ),
        Err(RecvTimeoutError::Timeout) => {
            tracing::warn!(
                timeout_ms = opts.shutdown_timeout.as_millis() as u64,
                "encoder thread did not stop within the shutdown timeout; aborting the output"
            );
            abandoned.store(true, Ordering::SeqCst);
            if let Some(abort) = &abort {
                abort.abort();
            }
            None
        }
    };

    let status = if cancel.is_cancelled() {
        RenderStatus::Cancelled
    } else {
        RenderStatus::Completed
    };
    match outcome {
        Some(EncoderOutcome { push_err, end_res }) => {
            if let Some(e) = push_err {
                return Err(e);
            }
            produce_res?;
            end_res?;
        }
        None => {
            produce_res?;
            if status == RenderStatus::Completed {
                return Err(CoverflowError::encode(format!(
                    "encoder did not finish within {} ms; output aborted",
                    opts.shutdown_timeout.as_millis()
                )));
            }
        }
    }

    let stats = RenderStats {
        status,
        frames_total: total,
        frames_rendered: rendered,
        frames_encoded: encoded.load(Ordering::SeqCst),
    };
    tracing::info!(
        status = ?stats.status,
        encoded = stats.frames_encoded,
        "pipeline finished"
    );
    Ok(stats)
}

#[cfg(test)]
#[path = "../../tests/unit/session/pipeline.rs"]
mod tests;
