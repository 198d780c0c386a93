//! Session-oriented rendering API.

/// Render/encode pipeline and cancellation.
pub mod pipeline;
/// [`render_session::CoverflowSession`]: one configured run over one image list.
pub mod render_session;
