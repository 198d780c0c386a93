use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::animation::curve::SideCurve;
use crate::animation::ease::Ease;
use crate::animation::timeline::TimelineSpec;
use crate::config::color::Color;
use crate::foundation::core::{Canvas, FrameIndex, FrameRange};
use crate::foundation::error::{CoverflowError, CoverflowResult};

/// How side images are laid out around the center.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// Side images are warped into a receding arc.
    #[default]
    Arc,
    /// Side images stay rectangular on a straight row.
    Flat,
}

/// Which image edge sits on the vertical anchor line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    /// Image centers on the anchor.
    #[default]
    Center,
    /// Image top edge on the anchor.
    Top,
    /// Image bottom edge on the anchor.
    Bottom,
}

/// Canvas background.
///
/// The base is a solid `color`, a vertical gradient when `color_bottom` is set, or the built-in
/// dark gradient when neither is given. An `image` is cover-fitted on top of the base.
///
/// Flattened into [`Config`], so the JSON keys are `background`, `background_color` and
/// `background_color_bottom`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Optional background image path.
    #[serde(rename = "background")]
    pub image: Option<PathBuf>,
    /// Solid color, or the top color of a gradient.
    #[serde(rename = "background_color")]
    pub color: Option<Color>,
    /// Bottom color of a vertical gradient.
    #[serde(rename = "background_color_bottom")]
    pub color_bottom: Option<Color>,
}

/// Video encoder settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    /// Output video path.
    pub output: PathBuf,
    /// ffmpeg video codec name.
    pub codec: String,
    /// Constant rate factor, ignored when `bitrate` is set.
    pub crf: u8,
    /// Encoder speed preset.
    pub preset: String,
    /// Target bitrate such as `"8M"`; switches from CRF to bitrate mode.
    pub bitrate: Option<String>,
    /// Replace an existing output file.
    pub overwrite: bool,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("output.mp4"),
            codec: "libx264".to_owned(),
            crf: 23,
            preset: "medium".to_owned(),
            bitrate: None,
            overwrite: true,
        }
    }
}

/// Complete parameter bundle for one coverflow run.
///
/// Every field has a default, so a JSON file only needs the values it changes. Unknown keys are
/// ignored. The depth-effect keys also accept their `side_` prefixed names (`side_scale_curve`,
/// `side_blur_start` and so on).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Frames per second.
    pub fps: u32,
    /// Seconds each image rests at the center.
    pub hold: f64,
    /// Hold of the first image; falls back to `hold`.
    pub first_hold: Option<f64>,
    /// Seconds per transition.
    pub transition: f64,
    /// Append a transition from the last image back to the first.
    #[serde(rename = "loop")]
    pub loop_back: bool,
    /// Wrap the visible window around the image list.
    pub repeat: bool,

    /// Perspective strength of side images in arc mode.
    pub perspective: f64,
    /// Scale factor per slot away from the center.
    pub side_scale: f64,
    /// Horizontal spacing between slots, as a fraction of canvas width.
    pub spacing: f64,
    /// Images drawn on each side of the center.
    pub visible_range: u32,
    /// Arc or flat layout.
    pub mode: LayoutMode,
    /// Vertical alignment against the anchor line.
    pub alignment: Alignment,
    /// Largest prescaled image size, as a fraction of the canvas.
    pub image_scale: f64,
    /// Anchor line position as a fraction of canvas height.
    pub image_y: f64,

    /// Curve for visual scale.
    #[serde(alias = "side_scale_curve")]
    pub scale_curve: SideCurve,
    /// First slot at which scaling applies.
    #[serde(alias = "side_scale_start")]
    pub scale_start: u32,
    /// Blur radius in pixels one slot from the center.
    pub side_blur: f64,
    /// Curve for blur growth.
    #[serde(alias = "side_blur_curve", deserialize_with = "increase_curve")]
    pub blur_curve: SideCurve,
    /// First slot at which blur applies.
    #[serde(alias = "side_blur_start")]
    pub blur_start: u32,
    /// Opacity one slot from the center.
    pub side_alpha: f64,
    /// Curve for opacity fade.
    #[serde(alias = "side_alpha_curve")]
    pub alpha_curve: SideCurve,
    /// First slot at which fading applies.
    #[serde(alias = "side_alpha_start")]
    pub alpha_start: u32,

    /// Reflection opacity; `0` disables reflections.
    pub reflection: f64,
    /// Reflection height as a fraction of the image height.
    pub reflection_length: f64,
    /// Background specification.
    #[serde(flatten)]
    pub background: BackgroundConfig,

    /// Transition easing.
    pub easing: Ease,
    /// Motion-blur sub-samples per frame; values below 2 disable it.
    pub motion_blur: u32,

    /// Encoder settings.
    pub encode: EncodeConfig,
    /// First frame to render (inclusive).
    pub start_frame: Option<u64>,
    /// Last frame to render (exclusive).
    pub end_frame: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            fps: 30,
            hold: 2.0,
            first_hold: None,
            transition: 2.0,
            loop_back: false,
            repeat: false,
            perspective: 0.3,
            side_scale: 0.8,
            spacing: 0.35,
            visible_range: 3,
            mode: LayoutMode::Arc,
            alignment: Alignment::Center,
            image_scale: 0.6,
            image_y: 0.5,
            scale_curve: SideCurve::Exponential,
            scale_start: 1,
            side_blur: 0.0,
            blur_curve: SideCurve::Linear,
            blur_start: 1,
            side_alpha: 1.0,
            alpha_curve: SideCurve::Exponential,
            alpha_start: 1,
            reflection: 0.2,
            reflection_length: 0.5,
            background: BackgroundConfig::default(),
            easing: Ease::InOutCubic,
            motion_blur: 0,
            encode: EncodeConfig::default(),
            start_frame: None,
            end_frame: None,
        }
    }
}

fn increase_curve<'de, D>(deserializer: D) -> Result<SideCurve, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let name = String::deserialize(deserializer)?;
    Ok(SideCurve::increase_from_name(&name))
}

impl Config {
    /// Parse a configuration from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> CoverflowResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| CoverflowError::validation(format!("parse config JSON: {e}")))
    }

    /// Parse a configuration from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> CoverflowResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            CoverflowError::validation(format!("open config JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Check value ranges.
    pub fn validate(&self) -> CoverflowResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CoverflowError::validation(
                "canvas width/height must be non-zero",
            ));
        }
        if self.fps == 0 {
            return Err(CoverflowError::validation("fps must be > 0"));
        }
        non_negative("hold", self.hold)?;
        non_negative("transition", self.transition)?;
        if let Some(first) = self.first_hold {
            non_negative("first_hold", first)?;
        }
        non_negative("perspective", self.perspective)?;
        non_negative("spacing", self.spacing)?;
        non_negative("side_blur", self.side_blur)?;
        if !self.side_scale.is_finite() || self.side_scale <= 0.0 {
            return Err(CoverflowError::validation("side_scale must be > 0"));
        }
        if !(self.image_scale > 0.0 && self.image_scale <= 1.0) {
            return Err(CoverflowError::validation("image_scale must be in (0, 1]"));
        }
        unit("image_y", self.image_y)?;
        unit("side_alpha", self.side_alpha)?;
        unit("reflection", self.reflection)?;
        unit("reflection_length", self.reflection_length)?;
        if self.encode.crf > 51 {
            return Err(CoverflowError::validation("crf must be in 0..=51"));
        }
        if let (Some(start), Some(end)) = (self.start_frame, self.end_frame)
            && start > end
        {
            return Err(CoverflowError::validation(
                "start_frame must be <= end_frame",
            ));
        }
        Ok(())
    }

    /// Output canvas.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Timeline inputs for `image_count` images.
    pub fn timeline_spec(&self, image_count: usize) -> TimelineSpec {
        TimelineSpec {
            image_count,
            fps: self.fps,
            hold_secs: self.hold,
            first_hold_secs: self.first_hold.unwrap_or(self.hold),
            transition_secs: self.transition,
            loop_back: self.loop_back,
            ease: self.easing,
        }
    }

    /// Requested `[start_frame, end_frame)` clamped to `[0, total)`.
    pub fn frame_range(&self, total: u64) -> FrameRange {
        FrameRange {
            start: FrameIndex(self.start_frame.unwrap_or(0)),
            end: FrameIndex(self.end_frame.unwrap_or(total)),
        }
        .clamp_to(total)
    }
}

fn non_negative(name: &str, v: f64) -> CoverflowResult<()> {
    if !v.is_finite() || v < 0.0 {
        return Err(CoverflowError::validation(format!(
            "{name} must be finite and >= 0"
        )));
    }
    Ok(())
}

fn unit(name: &str, v: f64) -> CoverflowResult<()> {
    if !(0.0..=1.0).contains(&v) {
        return Err(CoverflowError::validation(format!(
            "{name} must be in [0, 1]"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/config/model.rs"]
mod tests;
