use anyhow::Context;

use crate::foundation::core::ImageBuffer;
use crate::foundation::error::CoverflowResult;

/// Decode encoded image bytes.
///
/// Sources with an alpha channel become RGBA8 (straight alpha); everything else becomes RGB8.
pub fn decode_image(bytes: &[u8]) -> CoverflowResult<ImageBuffer> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    from_dynamic(dyn_img)
}

pub(crate) fn from_dynamic(dyn_img: image::DynamicImage) -> CoverflowResult<ImageBuffer> {
    if dyn_img.color().has_alpha() {
        let rgba = dyn_img.into_rgba8();
        let (width, height) = rgba.dimensions();
        ImageBuffer::from_rgba8(width, height, rgba.into_raw())
    } else {
        let rgb = dyn_img.into_rgb8();
        let (width, height) = rgb.dimensions();
        ImageBuffer::from_rgb8(width, height, rgb.into_raw())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
