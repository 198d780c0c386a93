use std::fmt;
use std::sync::{Arc, Mutex};

use crate::foundation::core::{FrameIndex, Surface};
use crate::foundation::error::CoverflowResult;

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames per second.
    pub fps: u32,
}

/// Sink contract for consuming rendered frames in timeline order.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order. `end` is
/// called exactly once after a successful `begin`, also when the run fails or is cancelled.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> CoverflowResult<()>;
    /// Push one premultiplied frame.
    fn push_frame(&mut self, idx: FrameIndex, frame: &Surface) -> CoverflowResult<()>;
    /// Flush and release the output.
    fn end(&mut self) -> CoverflowResult<()>;

    /// Handle that force-closes the output from another thread.
    ///
    /// The pipeline fires it when the encoder thread misses the shutdown timeout, so that a
    /// blocked `push_frame` or `end` returns. Sinks without an external resource return `None`.
    fn abort_handle(&self) -> Option<AbortHandle> {
        None
    }
}

/// A sink shared between the caller and the encoder thread.
pub type SharedSink = Arc<Mutex<dyn FrameSink>>;

/// Callback that tears down a sink's output while the sink itself is busy.
#[derive(Clone)]
pub struct AbortHandle(Arc<dyn Fn() + Send + Sync>);

impl AbortHandle {
    /// Wrap an abort callback.
    pub fn new(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Run the callback. Calling it more than once must be harmless.
    pub fn abort(&self) {
        (self.0)()
    }
}

impl fmt::Debug for AbortHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AbortHandle")
    }
}

/// In-memory sink for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, Surface)>,
    ended: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the sink configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg.clone()
    }

    /// Borrow the captured frames.
    pub fn frames(&self) -> &[(FrameIndex, Surface)] {
        &self.frames
    }

    /// Return `true` once `end` has been called.
    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> CoverflowResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &Surface) -> CoverflowResult<()> {
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> CoverflowResult<()> {
        self.ended = true;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
