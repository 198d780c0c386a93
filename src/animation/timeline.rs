use std::fmt;

use crate::animation::ease::Ease;
use crate::foundation::core::{FrameIndex, FrameRange};
use crate::foundation::error::{CoverflowError, CoverflowResult};

/// Timing inputs for a [`Timeline`], in seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimelineSpec {
    /// Number of images in the sequence.
    pub image_count: usize,
    /// Frames per second.
    pub fps: u32,
    /// Hold duration of every segment but the first.
    pub hold_secs: f64,
    /// Hold duration of the first segment (defaults to `hold_secs` at the config layer).
    pub first_hold_secs: f64,
    /// Duration of each transition.
    pub transition_secs: f64,
    /// Append a transition from the last image back to the first.
    pub loop_back: bool,
    /// Easing applied to transition progress.
    pub ease: Ease,
}

/// Where the animation stands at one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FramePosition {
    /// Index of the center image.
    pub index: usize,
    /// Eased transition progress toward `index + 1`, `0.0` while holding.
    pub offset: f64,
}

impl FramePosition {
    /// Continuous position `index + offset` in image-slot units.
    pub fn continuous(self) -> f64 {
        self.index as f64 + self.offset
    }

    /// Split a continuous position back into index and offset.
    pub fn from_continuous(p: f64) -> Self {
        let p = p.max(0.0);
        let index = p.floor();
        Self {
            index: index as usize,
            offset: p - index,
        }
    }
}

/// Frame scheduling for a hold / transition sequence.
///
/// Segment 0 is `first_hold` followed by a transition to image 1. Every later segment is `hold`
/// followed by a transition, except the last, which only transitions when looping back.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timeline {
    image_count: usize,
    fps: u32,
    hold_frames: u64,
    first_hold_frames: u64,
    transition_frames: u64,
    loop_back: bool,
    ease: Ease,
}

impl Timeline {
    /// Build a timeline, rounding durations to whole frames.
    pub fn new(spec: TimelineSpec) -> CoverflowResult<Self> {
        if spec.image_count == 0 {
            return Err(CoverflowError::validation("timeline needs at least one image"));
        }
        if spec.fps == 0 {
            return Err(CoverflowError::validation("fps must be > 0"));
        }
        for (name, secs) in [
            ("hold", spec.hold_secs),
            ("first_hold", spec.first_hold_secs),
            ("transition", spec.transition_secs),
        ] {
            if !secs.is_finite() || secs < 0.0 {
                return Err(CoverflowError::validation(format!(
                    "{name} duration must be finite and >= 0"
                )));
            }
        }

        let to_frames = |secs: f64| (secs * f64::from(spec.fps)).round() as u64;
        let timeline = Self {
            image_count: spec.image_count,
            fps: spec.fps,
            hold_frames: to_frames(spec.hold_secs),
            first_hold_frames: to_frames(spec.first_hold_secs),
            transition_frames: to_frames(spec.transition_secs),
            loop_back: spec.loop_back,
            ease: spec.ease,
        };
        if timeline.total_frames() == 0 {
            return Err(CoverflowError::validation(
                "timing yields zero frames; increase hold or transition duration",
            ));
        }
        Ok(timeline)
    }

    /// Number of source images.
    pub fn image_count(&self) -> usize {
        self.image_count
    }

    /// Frames per second.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Hold length of segments after the first.
    pub fn hold_frames(&self) -> u64 {
        self.hold_frames
    }

    /// Hold length of the first segment.
    pub fn first_hold_frames(&self) -> u64 {
        self.first_hold_frames
    }

    /// Transition length.
    pub fn transition_frames(&self) -> u64 {
        self.transition_frames
    }

    /// Whether a closing transition back to the first image is appended.
    pub fn loops_back(&self) -> bool {
        self.loop_back
    }

    /// Easing applied to transitions.
    pub fn ease(&self) -> Ease {
        self.ease
    }

    /// Total frame count of the sequence.
    pub fn total_frames(&self) -> u64 {
        let gaps = (self.image_count as u64).saturating_sub(1);
        let mut total =
            self.first_hold_frames + gaps * self.hold_frames + gaps * self.transition_frames;
        if self.loop_back {
            total += self.transition_frames;
        }
        total
    }

    /// Sequence length in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.total_frames() as f64 / f64::from(self.fps)
    }

    /// Full `[0, total)` range.
    pub fn full_range(&self) -> FrameRange {
        FrameRange {
            start: FrameIndex(0),
            end: FrameIndex(self.total_frames()),
        }
    }

    fn transition_after(&self, index: usize) -> u64 {
        if index + 1 < self.image_count || self.loop_back {
            self.transition_frames
        } else {
            0
        }
    }

    /// Map a frame to its center image and eased offset.
    ///
    /// Frames past the end clamp to the last frame.
    pub fn position_at(&self, frame: FrameIndex) -> FramePosition {
        let frame = frame.0.min(self.total_frames().saturating_sub(1));
        let first_len = self.first_hold_frames + self.transition_after(0);
        let seg_len = self.hold_frames + self.transition_frames;

        let (index, local, hold) = if frame < first_len || seg_len == 0 {
            (0usize, frame, self.first_hold_frames)
        } else {
            let f = frame - first_len;
            let index = 1 + (f / seg_len) as usize;
            (index, f % seg_len, self.hold_frames)
        };
        let index = index.min(self.image_count - 1);

        if local < hold || self.transition_frames == 0 {
            return FramePosition { index, offset: 0.0 };
        }
        let trans_frame = local - hold;
        let t = trans_frame as f64 / self.transition_frames as f64;
        FramePosition {
            index,
            offset: self.ease.apply(t),
        }
    }

    /// Resolve a preview request to a frame inside the timeline.
    pub fn resolve_preview(&self, at: PreviewAt) -> FrameIndex {
        let raw = match at {
            PreviewAt::Frame(f) => f,
            PreviewAt::Seconds(s) => (s.max(0.0) * f64::from(self.fps)).floor() as u64,
        };
        FrameIndex(raw.min(self.total_frames().saturating_sub(1)))
    }

    /// Summary counts for the statistics-only mode.
    pub fn statistics(&self) -> Statistics {
        Statistics {
            images: self.image_count,
            total_frames: self.total_frames(),
            duration_secs: self.duration_secs(),
        }
    }
}

/// A preview target: an explicit frame or a timestamp.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PreviewAt {
    /// 0-based frame number.
    Frame(u64),
    /// Seconds from the start; converted with floor semantics.
    Seconds(f64),
}

impl PreviewAt {
    /// Interpret a bare number: whole numbers are frames, fractional values are seconds.
    pub fn from_number(v: f64) -> Self {
        if v.fract() == 0.0 && v >= 0.0 {
            Self::Frame(v as u64)
        } else {
            Self::Seconds(v)
        }
    }
}

/// Statistics-only report.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Statistics {
    /// Number of images.
    pub images: usize,
    /// Total frame count.
    pub total_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Statistics:")?;
        writeln!(f, "  Images: {}", self.images)?;
        writeln!(f, "  Total frames: {}", self.total_frames)?;
        write!(f, "  Duration: {:.2} seconds", self.duration_secs)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/timeline.rs"]
mod tests;
