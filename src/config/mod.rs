//! Run configuration loaded from JSON or assembled by the CLI.

/// Colors accepted in configuration files.
pub mod color;
/// The [`model::Config`] bundle and its parts.
pub mod model;
