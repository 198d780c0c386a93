//! Scalar curves and the hold/transition timeline.

/// Depth-effect decay and increase curves.
pub mod curve;
/// Named easing functions.
pub mod ease;
/// Frame to (center image, offset) scheduling.
pub mod timeline;
