use image::imageops::FilterType;

use crate::config::color::Color;
use crate::config::model::BackgroundConfig;
use crate::effects::composite::blend_onto_canvas;
use crate::foundation::core::{Canvas, Surface};
use crate::foundation::math::lerp_u8;
use crate::render::transform::resize_exact;

/// Top shade of the built-in gradient.
const DEFAULT_TOP: u8 = 40;

/// Build the static backdrop for every frame of a run.
///
/// `image` is the decoded [`BackgroundConfig::image`], if any; it is cover-fitted, center-cropped
/// and composited over the color base.
pub fn build_background(
    canvas: Canvas,
    spec: &BackgroundConfig,
    image: Option<&Surface>,
) -> Surface {
    let mut base = match (spec.color, spec.color_bottom) {
        (Some(c), None) => Surface::filled(canvas.width, canvas.height, c.to_premul()),
        (Some(top), Some(bottom)) => vertical_gradient(canvas, top, bottom),
        (None, Some(bottom)) => vertical_gradient(canvas, Color::gray(DEFAULT_TOP), bottom),
        (None, None) => default_gradient(canvas),
    };
    if let Some(img) = image
        && !img.is_empty()
    {
        let cover = cover_fit(img, canvas.width, canvas.height);
        blend_onto_canvas(&mut base, Some(&cover), 0, 0);
    }
    base
}

/// Dark gray at the top fading to black: `floor(40 * (1 - y / h))`.
fn default_gradient(canvas: Canvas) -> Surface {
    let mut out = Surface::new(canvas.width, canvas.height);
    let row_bytes = canvas.width as usize * 4;
    if row_bytes == 0 {
        return out;
    }
    for (y, row) in out.data.chunks_exact_mut(row_bytes).enumerate() {
        let v = (f64::from(DEFAULT_TOP) * (1.0 - y as f64 / f64::from(canvas.height))) as u8;
        for px in row.chunks_exact_mut(4) {
            px.copy_from_slice(&[v, v, v, 255]);
        }
    }
    out
}

/// Linear top-to-bottom blend; the last row is exactly `bottom`.
fn vertical_gradient(canvas: Canvas, top: Color, bottom: Color) -> Surface {
    let mut out = Surface::new(canvas.width, canvas.height);
    let row_bytes = canvas.width as usize * 4;
    if row_bytes == 0 {
        return out;
    }
    let (top, bottom) = (top.to_premul(), bottom.to_premul());
    let span = f64::from(canvas.height.saturating_sub(1).max(1));
    for (y, row) in out.data.chunks_exact_mut(row_bytes).enumerate() {
        let t = y as f64 / span;
        let px_val = [
            lerp_u8(top[0], bottom[0], t),
            lerp_u8(top[1], bottom[1], t),
            lerp_u8(top[2], bottom[2], t),
            lerp_u8(top[3], bottom[3], t),
        ];
        for px in row.chunks_exact_mut(4) {
            px.copy_from_slice(&px_val);
        }
    }
    out
}

/// Scale to cover `w x h` and crop the center.
fn cover_fit(image: &Surface, w: u32, h: u32) -> Surface {
    let scale = (f64::from(w) / f64::from(image.width)).max(f64::from(h) / f64::from(image.height));
    let sw = ((f64::from(image.width) * scale).ceil() as u32).max(w);
    let sh = ((f64::from(image.height) * scale).ceil() as u32).max(h);
    let scaled = resize_exact(image, sw, sh, FilterType::Lanczos3);

    let x0 = ((sw - w) / 2) as usize;
    let y0 = ((sh - h) / 2) as usize;
    let mut out = Surface::new(w, h);
    let row_bytes = w as usize * 4;
    for y in 0..h as usize {
        let src = ((y0 + y) * sw as usize + x0) * 4;
        out.data[y * row_bytes..(y + 1) * row_bytes]
            .copy_from_slice(&scaled.data[src..src + row_bytes]);
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/background.rs"]
mod tests;
