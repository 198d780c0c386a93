//! Coverflow renders an ordered set of images as a "cover flow" animation.
//!
//! One image at a time rests at the center while its neighbors fan out to both sides, shrunk,
//! faded, blurred and tilted in perspective, and the sequence eases from one image to the next.
//! Frames are composited on the CPU and streamed to the system `ffmpeg` for encoding.
//!
//! The public API is session-oriented:
//!
//! - Load or build a [`Config`]
//! - Create a [`CoverflowSession`] from decoded images or a source directory
//! - Render previews, or stream a frame range into a [`FrameSink`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Easing, depth curves and frame scheduling.
pub mod animation;
/// Image discovery and decoding.
pub mod assets;
/// Run configuration.
pub mod config;
/// Raster effects over premultiplied surfaces.
pub mod effects;
/// Encoding sinks.
pub mod encode;
/// CPU frame rendering.
pub mod render;
/// Session-oriented rendering API.
pub mod session;

pub use crate::foundation::core::{
    Canvas, FrameIndex, FrameRange, ImageBuffer, PixelFormat, Point, Surface,
};
pub use crate::foundation::error::{CoverflowError, CoverflowResult};

pub use crate::animation::curve::SideCurve;
pub use crate::animation::ease::Ease;
pub use crate::animation::timeline::{PreviewAt, Statistics, Timeline};
pub use crate::assets::loader::load_images;
pub use crate::config::color::Color;
pub use crate::config::model::{Alignment, BackgroundConfig, Config, EncodeConfig, LayoutMode};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::sink::{AbortHandle, FrameSink, InMemorySink, SharedSink, SinkConfig};
pub use crate::render::renderer::CoverflowRenderer;
pub use crate::session::pipeline::{CancelToken, PipelineOpts, RenderStats, RenderStatus};
pub use crate::session::render_session::CoverflowSession;
