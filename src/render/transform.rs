use image::imageops::{self, FilterType};

use crate::animation::curve::{SideCurve, effective_angle, position_scale};
use crate::config::model::{Config, LayoutMode};
use crate::effects::blur::blur_surface;
use crate::effects::warp::{FarEdge, PerspectiveCache, WarpKey, warp_perspective};
use crate::foundation::core::Surface;
use crate::foundation::error::CoverflowResult;
use crate::foundation::math::mul_div255_u8;

/// Angles closer to the center than this are drawn without distortion.
pub const NEAR_CENTER: f64 = 0.01;

/// Cap on the far-edge inset fraction so the warped quad never collapses.
const MAX_PERSPECTIVE: f64 = 0.9;

/// Layout and depth-effect parameters, taken from [`Config`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformParams {
    /// Arc or flat layout.
    pub mode: LayoutMode,
    /// Far-edge inset per slot in arc mode.
    pub perspective: f64,
    /// Scale factor one slot from the center.
    pub side_scale: f64,
    /// Slot spacing.
    pub spacing: f64,
    /// Visual-scale curve.
    pub scale_curve: SideCurve,
    /// First slot affected by scaling.
    pub scale_start: u32,
    /// Blur radius one slot from the center.
    pub side_blur: f64,
    /// Blur growth curve.
    pub blur_curve: SideCurve,
    /// First slot affected by blur.
    pub blur_start: u32,
    /// Opacity one slot from the center.
    pub side_alpha: f64,
    /// Opacity curve.
    pub alpha_curve: SideCurve,
    /// First slot affected by fading.
    pub alpha_start: u32,
}

impl From<&Config> for TransformParams {
    fn from(cfg: &Config) -> Self {
        Self {
            mode: cfg.mode,
            perspective: cfg.perspective,
            side_scale: cfg.side_scale,
            spacing: cfg.spacing,
            scale_curve: cfg.scale_curve,
            scale_start: cfg.scale_start,
            side_blur: cfg.side_blur,
            blur_curve: cfg.blur_curve,
            blur_start: cfg.blur_start,
            side_alpha: cfg.side_alpha,
            alpha_curve: cfg.alpha_curve,
            alpha_start: cfg.alpha_start,
        }
    }
}

/// A transformed image and its top-left position on the canvas.
#[derive(Clone, Debug, PartialEq)]
pub struct Placed {
    /// Transformed pixels.
    pub surface: Surface,
    /// Left edge on the canvas; may be negative.
    pub x: i64,
    /// Top edge on the canvas; may be negative.
    pub y: i64,
}

/// Per-image geometry: scale, blur, fade and perspective placement.
#[derive(Debug)]
pub struct ImageTransformer {
    params: TransformParams,
    perspective: PerspectiveCache,
}

impl ImageTransformer {
    /// Create a transformer with an empty matrix cache.
    pub fn new(params: TransformParams) -> Self {
        Self {
            params,
            perspective: PerspectiveCache::new(),
        }
    }

    /// Warp matrices computed so far.
    pub fn perspective_cache(&self) -> &PerspectiveCache {
        &self.perspective
    }

    /// Transform `image` for a slot at signed distance `angle` from the center.
    ///
    /// `None` means the image shrank or faded to nothing and should be skipped. The returned
    /// `y` centers the image vertically; callers re-anchor it.
    pub fn apply_perspective(
        &self,
        image: &Surface,
        angle: f64,
        canvas_w: u32,
        canvas_h: u32,
    ) -> CoverflowResult<Option<Placed>> {
        let p = &self.params;
        let abs_angle = angle.abs();

        let scale = p
            .scale_curve
            .decay(p.side_scale, effective_angle(angle, p.scale_start));
        let new_w = (f64::from(image.width) * scale).floor();
        let new_h = (f64::from(image.height) * scale).floor();
        if !(new_w >= 1.0 && new_h >= 1.0) {
            return Ok(None);
        }
        let (new_w, new_h) = (new_w as u32, new_h as u32);
        let mut surface = resize_exact(image, new_w, new_h, FilterType::Triangle);

        let blur_angle = effective_angle(angle, p.blur_start);
        if blur_angle > 0.0 {
            let radius = p.blur_curve.increase(p.side_blur, blur_angle).round();
            if radius >= 1.0 {
                surface = blur_surface(&surface, radius as u32)?;
            }
        }

        let alpha_angle = effective_angle(angle, p.alpha_start);
        if alpha_angle > 0.0 {
            let alpha = p.alpha_curve.decay(p.side_alpha, alpha_angle);
            if alpha <= 0.0 {
                return Ok(None);
            }
            surface.scale_alpha(alpha);
        }

        let cw = i64::from(canvas_w);
        let ch = i64::from(canvas_h);
        let centered_x = (cw - i64::from(new_w)) / 2;
        let y = (ch - i64::from(new_h)) / 2;

        if abs_angle < NEAR_CENTER {
            return Ok(Some(Placed {
                surface,
                x: centered_x,
                y,
            }));
        }

        let pos_scale = position_scale(p.side_scale, angle);
        match p.mode {
            LayoutMode::Flat => {
                let s = p.side_scale;
                let k = 0.5 * (1.0 - s) + p.spacing * s;
                let base_w = f64::from(image.width);
                let displacement = if s < 1.0 {
                    base_w * k * (1.0 - pos_scale) / (1.0 - s)
                } else {
                    base_w * k * abs_angle
                };
                let x = centered_x as f64 + displacement.copysign(angle);
                Ok(Some(Placed {
                    surface,
                    x: x.trunc() as i64,
                    y,
                }))
            }
            LayoutMode::Arc => {
                let amount = (abs_angle * p.perspective).min(MAX_PERSPECTIVE);
                let key = WarpKey {
                    width: new_w,
                    height: new_h,
                    h_inset: (f64::from(new_w) * amount).floor() as u32,
                    v_inset: (f64::from(new_h) * amount / 2.0).floor() as u32,
                    far: FarEdge::for_angle(angle),
                };
                if key.h_inset > 0 || key.v_inset > 0 {
                    let inverse = self.perspective.inverse_for(key)?;
                    surface = warp_perspective(&surface, &inverse);
                }
                let x = (cw - i64::from(new_w)) as f64 / 2.0
                    + angle * canvas_w as f64 * p.spacing * pos_scale;
                Ok(Some(Placed {
                    surface,
                    x: x.trunc() as i64,
                    y,
                }))
            }
        }
    }
}

/// Mirror image below a transformed surface.
///
/// Keeps `max(1, floor(h * length))` rows nearest the seam and fades them from `opacity` down to
/// zero. `None` when `opacity` is zero.
pub fn create_reflection(surface: &Surface, opacity: f64, length: f64) -> Option<Surface> {
    if opacity <= 0.0 || surface.is_empty() {
        return None;
    }
    let opacity = opacity.min(1.0);
    let rows = ((f64::from(surface.height) * length.clamp(0.0, 1.0)).floor() as u32)
        .clamp(1, surface.height);
    let row_bytes = surface.width as usize * 4;
    let mut out = Surface::new(surface.width, rows);

    for r in 0..rows {
        let src_row = (surface.height - 1 - r) as usize;
        let gradient = if rows == 1 {
            1.0
        } else {
            1.0 - f64::from(r) / f64::from(rows - 1)
        };
        let factor = ((gradient * opacity * 255.0).round()).clamp(0.0, 255.0) as u16;
        let src = &surface.data[src_row * row_bytes..(src_row + 1) * row_bytes];
        let dst = &mut out.data[r as usize * row_bytes..(r as usize + 1) * row_bytes];
        for (d, s) in dst.iter_mut().zip(src) {
            *d = mul_div255_u8(u16::from(*s), factor);
        }
    }
    Some(out)
}

/// Aspect-preserving resize so that the image fits within `max_w x max_h`.
///
/// Uses a Lanczos filter; dimensions floor and never drop below one pixel.
pub fn resize_to_fit(image: &Surface, max_w: u32, max_h: u32) -> Surface {
    if image.is_empty() {
        return image.clone();
    }
    let scale = (f64::from(max_w) / f64::from(image.width))
        .min(f64::from(max_h) / f64::from(image.height));
    let w = ((f64::from(image.width) * scale).floor() as u32).max(1);
    let h = ((f64::from(image.height) * scale).floor() as u32).max(1);
    resize_exact(image, w, h, FilterType::Lanczos3)
}

pub(crate) fn resize_exact(image: &Surface, w: u32, h: u32, filter: FilterType) -> Surface {
    if image.width == w && image.height == h {
        return image.clone();
    }
    let resized = imageops::resize(&image.to_rgba_image(), w, h, filter);
    let mut out = Surface::from_rgba_image(resized);
    clamp_premul(&mut out.data);
    out
}

/// Keep color channels at or below alpha after filtering with negative lobes.
fn clamp_premul(data: &mut [u8]) {
    for px in data.chunks_exact_mut(4) {
        let a = px[3];
        for c in &mut px[..3] {
            *c = (*c).min(a);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/transform.rs"]
mod tests;
