//! Encoding sinks.
//!
//! Sinks consume rendered frames in timeline order and are fed by the render/encode pipeline.

/// `ffmpeg`-based sink (video output via system `ffmpeg`).
pub mod ffmpeg;
/// Generic frame sink trait and built-in sinks.
pub mod sink;
