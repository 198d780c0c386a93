use std::path::Path;

use anyhow::Context;

use crate::animation::timeline::{PreviewAt, Statistics, Timeline};
use crate::assets::loader::{load_image, load_images};
use crate::config::model::Config;
use crate::encode::ffmpeg::ensure_parent_dir;
use crate::encode::sink::{SharedSink, SinkConfig};
use crate::foundation::core::{FrameIndex, ImageBuffer, Surface};
use crate::foundation::error::{CoverflowError, CoverflowResult};
use crate::render::motion_blur::MotionBlurCompositor;
use crate::render::renderer::CoverflowRenderer;
use crate::session::pipeline::{CancelToken, PipelineOpts, RenderStats, run_pipeline};

/// One configured coverflow run.
///
/// A session validates the configuration, prescales the images and fixes the timeline up front,
/// then renders previews or streams video from that prepared state.
#[derive(Debug)]
pub struct CoverflowSession {
    config: Config,
    renderer: CoverflowRenderer,
    timeline: Timeline,
    motion_blur: MotionBlurCompositor,
}

impl CoverflowSession {
    /// Build a session from decoded images and an optional decoded background image.
    #[tracing::instrument(skip_all, fields(images = images.len()))]
    pub fn new(
        config: Config,
        images: &[ImageBuffer],
        background: Option<&ImageBuffer>,
    ) -> CoverflowResult<Self> {
        if images.is_empty() {
            return Err(CoverflowError::validation("no images to render"));
        }
        let mut renderer = CoverflowRenderer::new(&config)?;
        renderer.prepare(images, background)?;
        let timeline = Timeline::new(config.timeline_spec(images.len()))?;
        let motion_blur = MotionBlurCompositor::new(config.motion_blur)?;
        tracing::debug!(
            total_frames = timeline.total_frames(),
            hold_frames = timeline.hold_frames(),
            transition_frames = timeline.transition_frames(),
            "session ready"
        );
        Ok(Self {
            config,
            renderer,
            timeline,
            motion_blur,
        })
    }

    /// Load every image in `source_dir` (and the configured background image) and build a session.
    pub fn from_dir(config: Config, source_dir: impl AsRef<Path>) -> CoverflowResult<Self> {
        config.validate()?;
        let images = load_images(source_dir.as_ref())?;
        let background = config
            .background
            .image
            .as_deref()
            .map(load_image)
            .transpose()?;
        Self::new(config, &images, background.as_ref())
    }

    /// Configuration of this run.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Frame schedule of this run.
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Prepared renderer.
    pub fn renderer(&self) -> &CoverflowRenderer {
        &self.renderer
    }

    /// Image count, frame count and duration.
    pub fn statistics(&self) -> Statistics {
        self.timeline.statistics()
    }

    /// Render one timeline frame, with motion blur when enabled.
    pub fn render_frame(
        &self,
        frame: FrameIndex,
        cancel: &CancelToken,
    ) -> CoverflowResult<Surface> {
        if frame.0 >= self.timeline.total_frames() {
            return Err(CoverflowError::validation(format!(
                "frame {} is outside the timeline (0..{})",
                frame.0,
                self.timeline.total_frames()
            )));
        }
        self.motion_blur
            .render(&self.renderer, &self.timeline, frame, cancel)
    }

    /// Render the frame a preview request resolves to.
    pub fn render_preview(&self, at: PreviewAt) -> CoverflowResult<(FrameIndex, Surface)> {
        let frame = self.timeline.resolve_preview(at);
        let surface = self.render_frame(frame, &CancelToken::new())?;
        Ok((frame, surface))
    }

    /// Render a preview and save it; the format follows the file extension.
    #[tracing::instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn write_preview(
        &self,
        at: PreviewAt,
        path: impl AsRef<Path>,
    ) -> CoverflowResult<FrameIndex> {
        let path = path.as_ref();
        let (frame, surface) = self.render_preview(at)?;
        ensure_parent_dir(path)?;
        let rgb =
            image::RgbImage::from_raw(surface.width, surface.height, surface.to_rgb8_over_black())
                .ok_or_else(|| CoverflowError::render("preview buffer size mismatch"))?;
        rgb.save(path)
            .with_context(|| format!("write preview '{}'", path.display()))?;
        tracing::info!(frame = frame.0, "preview written");
        Ok(frame)
    }

    /// Stream the configured frame range into `sink`.
    ///
    /// `progress(done, total)` counts frames of the requested range. The caller keeps its own
    /// handle on `sink` to inspect it afterwards.
    #[tracing::instrument(skip_all)]
    pub fn render_video(
        &self,
        sink: SharedSink,
        opts: &PipelineOpts,
        cancel: &CancelToken,
        progress: impl FnMut(u64, u64),
    ) -> CoverflowResult<RenderStats> {
        let range = self.config.frame_range(self.timeline.total_frames());
        let sink_cfg = SinkConfig {
            width: self.config.width,
            height: self.config.height,
            fps: self.config.fps,
        };
        tracing::info!(
            start = range.start.0,
            end = range.end.0,
            total = self.timeline.total_frames(),
            motion_blur = self.motion_blur.samples(),
            "rendering video"
        );
        run_pipeline(
            sink,
            sink_cfg,
            range,
            opts,
            cancel,
            |f| self.motion_blur.render(&self.renderer, &self.timeline, f, cancel),
            progress,
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/render_session.rs"]
mod tests;
