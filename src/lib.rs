//! # tl-cache - persistent, batched translation cache
//!
//! `tl-cache` keeps translations in an append-only file per language pair
//! and sends cache misses to a translation provider in character-bounded
//! batches. Callers get a [`TranslationCell`](cache::TranslationCell) back
//! immediately and block on it only when they need the text.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tl_cache::registry::{Registry, RegistryConfig};
//! use tl_cache::translation::OpenAiTranslator;
//! use tl_cache::translator::{Translator, TranslatorOptions};
//!
//! # fn main() -> tl_cache::error::Result<()> {
//! let registry = Registry::new(RegistryConfig::default())?;
//! let provider = Arc::new(OpenAiTranslator::new(
//!     "http://localhost:11434".to_string(),
//!     "gemma3:12b".to_string(),
//!     None,
//! ));
//!
//! let translator = Translator::open(
//!     &registry,
//!     provider,
//!     TranslatorOptions::new("en").to("fr").cache_dir("/tmp/tl-cache"),
//! )?;
//!
//! let greeting = translator.translate("Hello");
//! let farewell = translator.translate_now("Goodbye")?;
//! println!("{} / {}", greeting.get()?, farewell.get()?);
//!
//! translator.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Cache files
//!
//! Each `(source, target, directory)` tuple maps to `<SOURCE>_<TARGET>.cache`
//! inside the directory, holding two lines per entry: the original and its
//! translation. Translators opened on the same tuple share one in-memory
//! cache.

/// Result cells, the cache store and its file format.
pub mod cache;

/// Command-line interface definitions and handlers.
pub mod cli;

/// Configuration file management and provider settings.
pub mod config;

/// Threshold batching and asynchronous provider dispatch.
pub mod dispatch;

/// Error types.
pub mod error;

/// Submitter identity derived from credential and application name.
pub mod identity;

/// Input reading from files and stdin.
pub mod input;

/// Global output configuration (quiet mode, colors, logging).
pub mod output;

/// XDG-style path utilities for configuration and cache.
pub mod paths;

/// Registry of shared cache instances.
pub mod registry;

/// Provider abstraction and the OpenAI-compatible client.
pub mod translation;

/// User-facing translator handle.
pub mod translator;

/// Terminal UI components (spinner, colors).
pub mod ui;
