//! Image decoding and source-directory scanning.

/// Bytes to [`crate::ImageBuffer`] decoding.
pub mod decode;
/// Directory listing and batch loading.
pub mod loader;
