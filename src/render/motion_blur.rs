use rayon::prelude::*;

use crate::animation::timeline::Timeline;
use crate::foundation::core::{FrameIndex, Surface};
use crate::foundation::error::{CoverflowError, CoverflowResult};
use crate::render::renderer::CoverflowRenderer;
use crate::session::pipeline::CancelToken;

/// Largest worker pool used for sub-frame renders.
const MAX_THREADS: usize = 4;

/// Averages several renders between consecutive frame positions.
///
/// With fewer than two samples every frame is rendered once.
#[derive(Debug)]
pub struct MotionBlurCompositor {
    samples: u32,
    pool: Option<rayon::ThreadPool>,
}

impl MotionBlurCompositor {
    /// Build a compositor; a pool of `min(samples, 4)` threads is created when `samples >= 3`.
    pub fn new(samples: u32) -> CoverflowResult<Self> {
        let pool = if samples >= 3 {
            Some(build_thread_pool((samples as usize).min(MAX_THREADS))?)
        } else {
            None
        };
        Ok(Self { samples, pool })
    }

    /// Sub-samples per frame (values below 2 mean disabled).
    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Render `frame`, blurred toward the position of the next frame.
    pub fn render(
        &self,
        renderer: &CoverflowRenderer,
        timeline: &Timeline,
        frame: FrameIndex,
        cancel: &CancelToken,
    ) -> CoverflowResult<Surface> {
        let here = timeline.position_at(frame);
        let last = timeline.total_frames().saturating_sub(1);
        let next = if frame.0 < last {
            timeline.position_at(FrameIndex(frame.0 + 1))
        } else {
            here
        };

        let p = here.continuous();
        let step = next.continuous() - p;
        if self.samples < 2 || step == 0.0 {
            return renderer.render_frame(here.index, here.offset);
        }

        let s = self.samples;
        let positions: Vec<f64> = (0..s)
            .map(|k| p + step * f64::from(k) / f64::from(s))
            .collect();
        let render_one = |pos: f64| -> CoverflowResult<Surface> {
            if cancel.is_cancelled() {
                return Err(CoverflowError::cancelled("motion blur sub-sample"));
            }
            renderer.render_position(pos)
        };

        let renders = match &self.pool {
            Some(pool) => pool.install(|| {
                positions
                    .par_iter()
                    .map(|&pos| render_one(pos))
                    .collect::<CoverflowResult<Vec<_>>>()
            })?,
            None => positions
                .iter()
                .map(|&pos| render_one(pos))
                .collect::<CoverflowResult<Vec<_>>>()?,
        };
        average_surfaces(&renders)
    }
}

/// Per-channel mean of equally sized surfaces, rounded to nearest.
pub fn average_surfaces(surfaces: &[Surface]) -> CoverflowResult<Surface> {
    let Some(first) = surfaces.first() else {
        return Err(CoverflowError::render("no sub-frames to average"));
    };
    if surfaces
        .iter()
        .any(|s| s.width != first.width || s.height != first.height)
    {
        return Err(CoverflowError::render("sub-frame size mismatch"));
    }

    let mut acc = vec![0.0f64; first.data.len()];
    for s in surfaces {
        for (a, &v) in acc.iter_mut().zip(&s.data) {
            *a += f64::from(v);
        }
    }
    let n = surfaces.len() as f64;
    let data = acc
        .into_iter()
        .map(|a| (a / n).round().clamp(0.0, 255.0) as u8)
        .collect();
    Surface::from_premul(first.width, first.height, data)
}

fn build_thread_pool(threads: usize) -> CoverflowResult<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("coverflow-blur-{i}"))
        .build()
        .map_err(|e| CoverflowError::render(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/render/motion_blur.rs"]
mod tests;
