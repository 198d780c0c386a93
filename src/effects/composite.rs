use crate::foundation::core::Surface;
use crate::foundation::math::mul_div255_u16;

pub(crate) type PremulRgba8 = [u8; 4];

/// Premultiplied source-over for one pixel.
pub(crate) fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    match src[3] {
        0 => dst,
        255 => src,
        sa => {
            let inv = 255u16 - u16::from(sa);
            let mut out = [0u8; 4];
            for i in 0..4 {
                let dc = mul_div255_u16(u16::from(dst[i]), inv);
                out[i] = (u16::from(src[i]) + dc).min(255) as u8;
            }
            out
        }
    }
}

/// Composite `image` onto `canvas` with its top-left corner at `(x, y)`.
///
/// Only the overlap is touched; an absent image or one fully off-canvas is a no-op.
pub fn blend_onto_canvas(canvas: &mut Surface, image: Option<&Surface>, x: i64, y: i64) {
    let Some(image) = image else {
        return;
    };
    let cw = i64::from(canvas.width);
    let ch = i64::from(canvas.height);
    let x1 = x.max(0);
    let y1 = y.max(0);
    let x2 = (x + i64::from(image.width)).min(cw);
    let y2 = (y + i64::from(image.height)).min(ch);
    if x1 >= x2 || y1 >= y2 {
        return;
    }

    let span = ((x2 - x1) * 4) as usize;
    for cy in y1..y2 {
        let sy = cy - y;
        let src_start = ((sy * i64::from(image.width) + (x1 - x)) * 4) as usize;
        let dst_start = ((cy * cw + x1) * 4) as usize;
        let src_row = &image.data[src_start..src_start + span];
        let dst_row = &mut canvas.data[dst_start..dst_start + span];
        for (d, s) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
            let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
            d.copy_from_slice(&out);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/composite.rs"]
mod tests;
