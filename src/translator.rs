//! User-facing translator handle.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};
use tracing::warn;

use crate::cache::TranslationCell;
use crate::error::{CacheError, Result};
use crate::identity::Identity;
use crate::registry::{HandleId, Instance, Registry};
use crate::translation::BatchTranslator;

/// Shared result for empty or whitespace-only input.
static EMPTY: LazyLock<Arc<TranslationCell>> =
    LazyLock::new(|| Arc::new(TranslationCell::resolved("", "")));

/// Options for [`Translator::open`].
///
/// Every field except the source language falls back to the registry's
/// defaults when left unset.
#[derive(Debug, Clone, Default)]
pub struct TranslatorOptions {
    pub source: String,
    pub target: Option<String>,
    pub credential: Option<String>,
    pub app_name: Option<String>,
    pub cache_dir: Option<PathBuf>,
    /// Resolve `cache_dir` under the registry's default cache directory.
    pub relative: bool,
}

impl TranslatorOptions {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn to(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    #[must_use]
    pub fn credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    #[must_use]
    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    #[must_use]
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub const fn relative(mut self, relative: bool) -> Self {
        self.relative = relative;
        self
    }
}

/// A handle binding one submitter identity to a shared cache instance.
///
/// Handles opened with the same languages and directory share one cache.
/// [`translate`](Self::translate) never blocks; misses are batched per
/// identity and translated in the background.
pub struct Translator {
    registry: Registry,
    instance: Arc<Instance>,
    provider: Arc<dyn BatchTranslator>,
    identity: Identity,
    handle: HandleId,
    enabled: AtomicBool,
    closed: bool,
}

impl Translator {
    pub fn open(
        registry: &Registry,
        provider: Arc<dyn BatchTranslator>,
        options: TranslatorOptions,
    ) -> Result<Self> {
        let config = registry.config();
        let dir = resolve_cache_dir(&options, config.default_cache_dir.as_deref())?;
        let target = options
            .target
            .unwrap_or_else(|| config.default_target.clone());
        let credential = options
            .credential
            .or_else(|| config.default_credential.clone())
            .unwrap_or_default();
        let app_name = options
            .app_name
            .unwrap_or_else(|| config.default_app_name.clone());

        let handle = registry.next_handle_id();
        let instance = registry.acquire(&options.source, &target, &dir, handle)?;

        Ok(Self {
            registry: registry.clone(),
            instance,
            provider,
            identity: Identity::new(&credential, &app_name),
            handle,
            enabled: AtomicBool::new(true),
            closed: false,
        })
    }

    /// Submits `text` and returns its cell without waiting.
    ///
    /// A cache hit returns the shared cell for that text. A miss creates a
    /// pending cell and adds it to this identity's batch.
    pub fn translate(&self, text: &str) -> Arc<TranslationCell> {
        if !self.is_enabled() {
            return Arc::new(TranslationCell::resolved(text, ""));
        }
        if text.trim().is_empty() {
            return Arc::clone(&EMPTY);
        }

        // Submit while the store lock is held so a concurrent hit on this
        // cell can always find its batch.
        let (lookup, full_batch) = self.instance.store().lookup_or_create_with(text, |cell| {
            self.instance
                .batches()
                .submit(&self.identity, &self.provider, Arc::clone(cell))
        });

        if let Some(batch) = full_batch.flatten() {
            self.registry.dispatcher().dispatch(&self.instance, batch);
        }
        lookup.into_cell()
    }

    /// Submits `text` and blocks until it is translated.
    ///
    /// The batch holding the text is dispatched right away even if it is
    /// below the threshold, including when another identity submitted it.
    pub fn translate_now(&self, text: &str) -> Result<Arc<TranslationCell>> {
        let cell = self.translate(text);
        if cell.is_resolved() {
            return Ok(cell);
        }

        self.flush_batch();
        if let Some(batch) = self.instance.batches().take_containing(&cell) {
            self.registry.dispatcher().dispatch(&self.instance, batch);
        }

        cell.get()?;
        Ok(cell)
    }

    /// Stores a known translation. Empty or whitespace-only inputs are ignored.
    pub fn feed(&self, original: &str, translation: &str, overwrite: bool) -> Result<()> {
        if original.trim().is_empty() || translation.trim().is_empty() {
            return Ok(());
        }
        self.instance.store().feed(original, translation, overwrite)
    }

    /// Dispatches this identity's pending batch without waiting for it.
    pub fn flush_batch(&self) {
        if let Some(batch) = self.instance.batches().take(&self.identity) {
            self.registry.dispatcher().dispatch(&self.instance, batch);
        }
    }

    /// Forces the cache file to durable storage.
    pub fn flush(&self) -> Result<()> {
        self.instance.store().flush()
    }

    /// Makes every later request return an empty translation immediately.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn source(&self) -> &str {
        self.instance.source()
    }

    pub fn target(&self) -> &str {
        self.instance.target()
    }

    pub fn cache_path(&self) -> &Path {
        self.instance.store().path()
    }

    /// Dispatches the pending batch and releases this handle.
    ///
    /// Closing the last handle of an instance blocks until its in-flight
    /// translations are written and the cache file is closed.
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.flush_batch();
        self.registry.release(&self.instance, self.handle)
    }
}

impl Drop for Translator {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "Failed to close translator");
        }
    }
}

fn resolve_cache_dir(options: &TranslatorOptions, default: Option<&Path>) -> Result<PathBuf> {
    match (&options.cache_dir, options.relative, default) {
        (None, true, _) => Err(CacheError::InvalidOptions(
            "'relative' requires a cache directory".to_string(),
        )),
        (Some(_), true, None) => Err(CacheError::InvalidOptions(
            "'relative' is set but no default cache directory is configured".to_string(),
        )),
        (Some(dir), true, Some(default)) => Ok(default.join(dir)),
        (Some(dir), false, _) => Ok(dir.clone()),
        (None, false, Some(default)) => Ok(default.to_path_buf()),
        (None, false, None) => Err(CacheError::InvalidOptions(
            "no cache directory given and no default configured".to_string(),
        )),
    }
}
