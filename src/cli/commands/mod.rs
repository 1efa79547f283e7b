//! Subcommand implementations.

/// Feed command handler.
pub mod feed;

/// Translation command handler.
pub mod translate;
