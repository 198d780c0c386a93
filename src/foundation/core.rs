use crate::foundation::error::{CoverflowError, CoverflowResult};
use crate::foundation::math::mul_div255_u8;

pub use kurbo::Point;

/// Absolute 0-based frame index on the animation timeline.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Half-open frame range `[start, end)` on the timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    /// Inclusive range start.
    pub start: FrameIndex,
    /// Exclusive range end.
    pub end: FrameIndex,
}

impl FrameRange {
    /// Create a validated range with `start <= end`.
    pub fn new(start: FrameIndex, end: FrameIndex) -> CoverflowResult<Self> {
        if start.0 > end.0 {
            return Err(CoverflowError::validation("FrameRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    /// Number of frames contained in the range.
    pub fn len_frames(self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    /// Return `true` when the range has no frames.
    pub fn is_empty(self) -> bool {
        self.start.0 == self.end.0
    }

    /// Intersect with `[0, total)`.
    pub fn clamp_to(self, total: u64) -> Self {
        let end = self.end.0.min(total);
        let start = self.start.0.min(end);
        Self {
            start: FrameIndex(start),
            end: FrameIndex(end),
        }
    }
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Channel layout of a decoded [`ImageBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// Three channels, implicitly opaque.
    Rgb8,
    /// Four channels, straight (non-premultiplied) alpha.
    Rgba8,
}

impl PixelFormat {
    /// Bytes per pixel.
    pub fn channels(self) -> usize {
        match self {
            Self::Rgb8 => 3,
            Self::Rgba8 => 4,
        }
    }
}

/// A decoded source raster as handed over by the loader.
///
/// Immutable once built. Pixels are tightly packed, row-major, straight alpha.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl ImageBuffer {
    /// Wrap raw pixels, checking that `data` matches `width * height * channels`.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> CoverflowResult<Self> {
        if width == 0 || height == 0 {
            return Err(CoverflowError::validation(
                "image width/height must be non-zero",
            ));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(format.channels()))
            .ok_or_else(|| CoverflowError::validation("image buffer size overflow"))?;
        if data.len() != expected {
            return Err(CoverflowError::validation(format!(
                "image data length {} does not match {width}x{height}x{}",
                data.len(),
                format.channels()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Build a 3-channel image.
    pub fn from_rgb8(width: u32, height: u32, data: Vec<u8>) -> CoverflowResult<Self> {
        Self::new(width, height, PixelFormat::Rgb8, data)
    }

    /// Build a 4-channel straight-alpha image.
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> CoverflowResult<Self> {
        Self::new(width, height, PixelFormat::Rgba8, data)
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Channel layout.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw pixel bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Convert to a premultiplied RGBA8 [`Surface`].
    pub fn to_surface(&self) -> Surface {
        let mut out = Vec::with_capacity((self.width as usize) * (self.height as usize) * 4);
        match self.format {
            PixelFormat::Rgb8 => {
                for px in self.data.chunks_exact(3) {
                    out.extend_from_slice(&[px[0], px[1], px[2], 255]);
                }
            }
            PixelFormat::Rgba8 => {
                out.extend_from_slice(&self.data);
                premultiply_rgba8_in_place(&mut out);
            }
        }
        Surface {
            width: self.width,
            height: self.height,
            data: out,
        }
    }
}

/// Premultiplied RGBA8 raster (r,g,b already multiplied by a).
///
/// Used for prescaled images, transformed images, reflections, backgrounds and rendered frames.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surface {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major, premultiplied.
    pub data: Vec<u8>,
}

impl Surface {
    /// Fully transparent surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; (width as usize) * (height as usize) * 4],
        }
    }

    /// Surface filled with one premultiplied color.
    pub fn filled(width: u32, height: u32, premul: [u8; 4]) -> Self {
        Self {
            width,
            height,
            data: premul.repeat((width as usize) * (height as usize)),
        }
    }

    /// Wrap premultiplied bytes, checking the buffer length.
    pub fn from_premul(width: u32, height: u32, data: Vec<u8>) -> CoverflowResult<Self> {
        if data.len() != (width as usize) * (height as usize) * 4 {
            return Err(CoverflowError::validation(
                "surface data length must equal width*height*4",
            ));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Return `true` when the surface has no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Read one premultiplied pixel. Panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Multiply every channel by `factor` in `[0, 1]`.
    pub fn scale_alpha(&mut self, factor: f64) {
        let f = ((factor.clamp(0.0, 1.0) * 255.0).round()) as u16;
        if f == 255 {
            return;
        }
        for c in &mut self.data {
            *c = mul_div255_u8(u16::from(*c), f);
        }
    }

    /// Copy into an `image` buffer.
    pub(crate) fn to_rgba_image(&self) -> image::RgbaImage {
        image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| image::RgbaImage::new(self.width, self.height))
    }

    pub(crate) fn from_rgba_image(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }

    /// Drop alpha, keeping premultiplied color (i.e. the surface flattened over black).
    pub fn to_rgb8_over_black(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity((self.width as usize) * (self.height as usize) * 3);
        for px in self.data.chunks_exact(4) {
            out.extend_from_slice(&px[..3]);
        }
        out
    }
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
