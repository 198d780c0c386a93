//! CPU frame rendering.
//!
//! [`renderer::CoverflowRenderer`] owns the prescaled images and cached background, and lays out
//! one frame per timeline position. Per-image depth effects live in [`transform`].

/// Background fill and background image fitting.
pub mod background;
/// Sub-frame averaging between consecutive frame positions.
pub mod motion_blur;
/// Frame layout and compositing.
pub mod renderer;
/// Per-image scale, blur, fade, warp and reflection.
pub mod transform;
