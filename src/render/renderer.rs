use std::sync::OnceLock;

use rayon::prelude::*;

use crate::animation::timeline::FramePosition;
use crate::config::model::{Alignment, Config};
use crate::effects::composite::blend_onto_canvas;
use crate::foundation::core::{ImageBuffer, Surface};
use crate::foundation::error::{CoverflowError, CoverflowResult};
use crate::render::background::build_background;
use crate::render::transform::{ImageTransformer, TransformParams, create_reflection, resize_to_fit};

/// One entry of the visible set for a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisibleSlot {
    /// Index into the prepared image list.
    pub image: usize,
    /// Signed slot distance from the center, `i - offset`.
    pub position: f64,
}

impl VisibleSlot {
    /// Paint-order key; larger is farther.
    pub fn depth(&self) -> f64 {
        self.position.abs()
    }
}

/// Composites coverflow frames.
///
/// Call [`CoverflowRenderer::prepare`] with the image list before rendering. Given the same
/// prepared state, [`CoverflowRenderer::render_frame`] is a pure function of its arguments and is
/// safe to call from several threads at once.
#[derive(Debug)]
pub struct CoverflowRenderer {
    config: Config,
    transformer: ImageTransformer,
    scaled: Vec<Surface>,
    background_image: Option<Surface>,
    background: OnceLock<Surface>,
    prepared: bool,
}

impl CoverflowRenderer {
    /// Create a renderer for a validated configuration.
    pub fn new(config: &Config) -> CoverflowResult<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            transformer: ImageTransformer::new(TransformParams::from(config)),
            scaled: Vec::new(),
            background_image: None,
            background: OnceLock::new(),
            prepared: false,
        })
    }

    /// Configuration this renderer was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Prescale `images` to fit the configured fraction of the canvas.
    ///
    /// Replaces any previously prepared list and resets the background cache.
    #[tracing::instrument(skip_all, fields(images = images.len()))]
    pub fn prepare(
        &mut self,
        images: &[ImageBuffer],
        background: Option<&ImageBuffer>,
    ) -> CoverflowResult<()> {
        if images.is_empty() {
            return Err(CoverflowError::validation("no images to render"));
        }
        let max_w =
            ((f64::from(self.config.width) * self.config.image_scale).floor() as u32).max(1);
        let max_h =
            ((f64::from(self.config.height) * self.config.image_scale).floor() as u32).max(1);

        self.scaled = images
            .par_iter()
            .map(|img| resize_to_fit(&img.to_surface(), max_w, max_h))
            .collect();
        self.background_image = background.map(ImageBuffer::to_surface);
        self.background = OnceLock::new();
        self.prepared = true;
        tracing::debug!(max_w, max_h, "prescaled image cache built");
        Ok(())
    }

    /// Number of prepared images.
    pub fn image_count(&self) -> usize {
        self.scaled.len()
    }

    /// Prescaled image `index`, if prepared.
    pub fn scaled_image(&self, index: usize) -> Option<&Surface> {
        self.scaled.get(index)
    }

    /// The cached background, built on first use.
    pub fn background(&self) -> &Surface {
        self.background.get_or_init(|| {
            tracing::debug!("building background");
            build_background(
                self.config.canvas(),
                &self.config.background,
                self.background_image.as_ref(),
            )
        })
    }

    /// Image transformer with its perspective cache.
    pub fn transformer(&self) -> &ImageTransformer {
        &self.transformer
    }

    /// Visible images around `center`, farthest first.
    pub fn visible_slots(&self, center: usize, offset: f64) -> Vec<VisibleSlot> {
        let n = self.scaled.len() as i64;
        if n == 0 {
            return Vec::new();
        }
        let range = i64::from(self.config.visible_range);
        let mut slots: Vec<VisibleSlot> = (-range..=range)
            .filter_map(|i| {
                let idx = center as i64 + i;
                let idx = if self.config.repeat {
                    idx.rem_euclid(n)
                } else if (0..n).contains(&idx) {
                    idx
                } else {
                    return None;
                };
                Some(VisibleSlot {
                    image: idx as usize,
                    position: i as f64 - offset,
                })
            })
            .collect();
        slots.sort_by(|a, b| b.depth().total_cmp(&a.depth()));
        slots
    }

    /// Render the frame with image `center` in front, shifted by `offset` toward `center + 1`.
    pub fn render_frame(&self, center: usize, offset: f64) -> CoverflowResult<Surface> {
        if !self.prepared {
            return Err(CoverflowError::render(
                "renderer is not prepared; call prepare() with the image list first",
            ));
        }
        let (cw, ch) = (self.config.width, self.config.height);
        let mut canvas = self.background().clone();
        let anchor = self.config.image_y * f64::from(ch);

        for slot in self.visible_slots(center, offset) {
            let Some(placed) =
                self.transformer
                    .apply_perspective(&self.scaled[slot.image], slot.position, cw, ch)?
            else {
                continue;
            };
            let h = f64::from(placed.surface.height);
            let y = match self.config.alignment {
                Alignment::Center => anchor - h / 2.0,
                Alignment::Top => anchor,
                Alignment::Bottom => anchor - h,
            }
            .floor() as i64;

            blend_onto_canvas(&mut canvas, Some(&placed.surface), placed.x, y);
            if self.config.reflection > 0.0 {
                let reflection = create_reflection(
                    &placed.surface,
                    self.config.reflection,
                    self.config.reflection_length,
                );
                blend_onto_canvas(
                    &mut canvas,
                    reflection.as_ref(),
                    placed.x,
                    y + i64::from(placed.surface.height),
                );
            }
        }
        Ok(canvas)
    }

    /// Render a continuous timeline position (`index + offset`).
    pub fn render_position(&self, position: f64) -> CoverflowResult<Surface> {
        let FramePosition { index, offset } = FramePosition::from_continuous(position);
        self.render_frame(index, offset)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/renderer.rs"]
mod tests;
