use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::config::model::EncodeConfig;
use crate::encode::sink::{AbortHandle, FrameSink, SinkConfig};
use crate::foundation::core::{FrameIndex, Surface};
use crate::foundation::error::{CoverflowError, CoverflowResult};
use crate::foundation::math::mul_div255_u16;

const EXIT_POLL: Duration = Duration::from_millis(10);

/// Options for [`FfmpegSink`] output.
#[derive(Clone, Debug, PartialEq)]
pub struct FfmpegSinkOpts {
    /// Output video file path.
    pub out_path: PathBuf,
    /// Overwrite output file if it already exists.
    pub overwrite: bool,
    /// Video codec passed to `-c:v`.
    pub codec: String,
    /// Constant rate factor, used when no bitrate is set.
    pub crf: u8,
    /// Encoder preset.
    pub preset: String,
    /// Target bitrate (`-b:v`), replacing CRF mode.
    pub bitrate: Option<String>,
    /// Background color used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
}

impl FfmpegSinkOpts {
    /// Default H.264 options writing to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self::from(&EncodeConfig {
            output: out_path.into(),
            ..EncodeConfig::default()
        })
    }
}

impl From<&EncodeConfig> for FfmpegSinkOpts {
    fn from(cfg: &EncodeConfig) -> Self {
        Self {
            out_path: cfg.output.clone(),
            overwrite: cfg.overwrite,
            codec: cfg.codec.clone(),
            crf: cfg.crf,
            preset: cfg.preset.clone(),
            bitrate: cfg.bitrate.clone(),
            bg_rgba: [0, 0, 0, 255],
        }
    }
}

/// Sink that spawns the system `ffmpeg` and streams raw frames to stdin.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Arc<Mutex<Option<Child>>>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,

    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl FfmpegSink {
    /// Create a new sink that streams into `ffmpeg`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: Arc::new(Mutex::new(None)),
            stdin: None,
            stderr_drain: None,
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
        }
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> CoverflowResult<()> {
        if cfg.fps == 0 {
            return Err(CoverflowError::validation("fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(CoverflowError::validation(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(CoverflowError::validation(
                "ffmpeg sink width/height must be even (required for yuv420p output)",
            ));
        }

        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(CoverflowError::validation(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }

        if !is_ffmpeg_on_path() {
            return Err(CoverflowError::encode(
                "ffmpeg is required for video encoding, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .args(ffmpeg_args(&self.opts, &cfg));
        tracing::debug!(?cmd, "spawning ffmpeg");

        let mut child = cmd.spawn().map_err(|e| {
            CoverflowError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CoverflowError::encode("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| CoverflowError::encode("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        self.scratch = vec![0u8; (cfg.width as usize) * (cfg.height as usize) * 4];
        *self.child.lock().unwrap_or_else(PoisonError::into_inner) = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &Surface) -> CoverflowResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| CoverflowError::encode("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(CoverflowError::encode(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);

        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(CoverflowError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }

        flatten_premul_over_bg_to_opaque_rgba8(&mut self.scratch, &frame.data, self.opts.bg_rgba)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(CoverflowError::encode("ffmpeg sink is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(&self.scratch).map_err(|e| {
            CoverflowError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    fn end(&mut self) -> CoverflowResult<()> {
        drop(self.stdin.take());

        // Poll so the child lock is free for an abort while ffmpeg finalizes.
        let status = loop {
            let mut guard = self.child.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(child) = guard.as_mut() else {
                // Never started or already finished.
                return Ok(());
            };
            match child.try_wait() {
                Ok(Some(status)) => {
                    guard.take();
                    break status;
                }
                Ok(None) => {}
                Err(e) => {
                    return Err(CoverflowError::encode(format!(
                        "failed to wait for ffmpeg to finish: {e}"
                    )));
                }
            }
            drop(guard);
            std::thread::sleep(EXIT_POLL);
        };
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| CoverflowError::encode("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| CoverflowError::encode(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        self.cfg = None;
        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(CoverflowError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    /// Kills the ffmpeg child; a blocked stdin write then fails and `end` sees the exit status.
    fn abort_handle(&self) -> Option<AbortHandle> {
        let child = Arc::clone(&self.child);
        Some(AbortHandle::new(move || {
            let mut guard = child.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(child) = guard.as_mut() {
                tracing::warn!(pid = child.id(), "killing ffmpeg");
                let _ = child.kill();
            }
        }))
    }
}

/// Full ffmpeg argument list for raw RGBA input on stdin.
pub(crate) fn ffmpeg_args(opts: &FfmpegSinkOpts, cfg: &SinkConfig) -> Vec<String> {
    let size = format!("{}x{}", cfg.width, cfg.height);
    let fps = cfg.fps.to_string();
    let crf = opts.crf.to_string();
    let mut args: Vec<&str> = vec![if opts.overwrite { "-y" } else { "-n" }];
    // Input is flattened to opaque RGBA before it reaches stdin.
    args.extend([
        "-loglevel",
        "error",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgba",
        "-s",
        size.as_str(),
        "-r",
        fps.as_str(),
        "-i",
        "pipe:0",
    ]);
    args.extend([
        "-an",
        "-c:v",
        opts.codec.as_str(),
        "-preset",
        opts.preset.as_str(),
    ]);

    match opts.bitrate.as_deref() {
        Some(rate) => args.extend(["-b:v", rate]),
        None => args.extend(["-crf", crf.as_str()]),
    }
    args.extend(["-pix_fmt", "yuv420p", "-movflags", "+faststart"]);

    let mut out: Vec<String> = args.into_iter().map(str::to_owned).collect();
    out.push(opts.out_path.to_string_lossy().into_owned());
    out
}

fn flatten_premul_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgba: [u8; 4],
) -> CoverflowResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(CoverflowError::validation(
            "flatten_premul_over_bg_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg = [
        u16::from(bg_rgba[0]),
        u16::from(bg_rgba[1]),
        u16::from(bg_rgba[2]),
    ];
    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255u16 - a;
        for c in 0..3 {
            d[c] = (u16::from(s[c]) + mul_div255_u16(bg[c], inv)).min(255) as u8;
        }
        d[3] = 255;
    }

    Ok(())
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> CoverflowResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
