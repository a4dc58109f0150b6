//! Subcommand implementations.

/// Model listing command handler.
pub mod models;

/// Provider listing command handler.
pub mod providers;

/// Markdown rendering command handler.
pub mod render;

/// Translation command handler.
pub mod translate;
