//! Raster effects over premultiplied RGBA8 surfaces.

pub(crate) mod blur;
pub(crate) mod composite;
/// Perspective warps and their matrix cache.
pub mod warp;
