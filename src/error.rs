//! Error types for the cache, registry and dispatch layers.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the translation cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The persisted cache file cannot be parsed.
    #[error("cache file {} is corrupted at line {line}: {reason}", path.display())]
    CorruptCache {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// The cache directory cannot be created, read or written.
    #[error("cache directory {} is unusable: {reason}", path.display())]
    PathUnusable { path: PathBuf, reason: String },

    /// A fed pair collides with a different cached translation.
    #[error("key \"{original}\" already exists in the cache as \"{existing}\", not \"{proposed}\"")]
    ConflictingEntry {
        original: String,
        existing: String,
        proposed: String,
    },

    /// The provider returned a different number of translations than requested.
    #[error("provider returned {returned} translations for {submitted} submitted texts")]
    ProviderMismatch { submitted: usize, returned: usize },

    /// The provider call itself failed.
    #[error("provider call failed: {0}")]
    ProviderTransport(String),

    /// The batch carrying this text failed and the text will not be translated.
    #[error("translation of \"{original}\" failed: {reason}")]
    DispatchFailed { original: String, reason: String },

    #[error("unsupported language code: '{0}'")]
    UnsupportedLanguage(String),

    #[error("invalid translator options: {0}")]
    InvalidOptions(String),

    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = CacheError> = std::result::Result<T, E>;
