use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

use super::cell::{CellState, TranslationCell, normalize};
use super::record::{decode_line, format_record, parse_records};
use crate::error::{CacheError, Result};

/// Cache hits between two progress log lines.
const HIT_LOG_INTERVAL: usize = 50;

/// Outcome of [`CacheStore::lookup_or_create`].
#[derive(Debug, Clone)]
pub enum Lookup {
    /// The text was already known (resolved or still in flight).
    Hit(Arc<TranslationCell>),
    /// A new pending cell was inserted and must be submitted for translation.
    Miss(Arc<TranslationCell>),
}

impl Lookup {
    pub fn cell(&self) -> &Arc<TranslationCell> {
        match self {
            Self::Hit(cell) | Self::Miss(cell) => cell,
        }
    }

    pub fn into_cell(self) -> Arc<TranslationCell> {
        match self {
            Self::Hit(cell) | Self::Miss(cell) => cell,
        }
    }

    pub const fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }
}

struct StoreInner {
    entries: HashMap<String, Arc<TranslationCell>>,
    log: Option<BufWriter<File>>,
}

impl StoreInner {
    fn append(&mut self, records: &[(&str, &str)]) -> Result<()> {
        let log = self
            .log
            .as_mut()
            .ok_or_else(|| io::Error::other("cache log is already closed"))?;
        for (original, translation) in records {
            log.write_all(format_record(original, translation).as_bytes())?;
        }
        log.flush()?;
        Ok(())
    }
}

/// In-memory map of translations backed by an append-only cache file.
///
/// Map mutation and the durable append that goes with it happen under the
/// same lock, so the file never lags behind what callers can observe.
pub struct CacheStore {
    path: PathBuf,
    inner: Mutex<StoreInner>,
    hits: AtomicUsize,
}

impl CacheStore {
    /// Loads `<SOURCE>_<TARGET>.cache` from `dir` and opens it for append.
    pub fn open(dir: &Path, source: &str, target: &str) -> Result<Self> {
        let path = dir.join(file_name(source, target));
        let entries = Self::load(&path)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| CacheError::PathUnusable {
                path: path.clone(),
                reason: format!("cannot open cache file for append: {e}"),
            })?;

        info!(path = %path.display(), entries = entries.len(), "Opened translation cache");

        Ok(Self {
            path,
            inner: Mutex::new(StoreInner {
                entries,
                log: Some(BufWriter::new(file)),
            }),
            hits: AtomicUsize::new(0),
        })
    }

    /// Parses a cache file into resolved cells keyed by normalized original.
    ///
    /// A missing file is an empty cache.
    pub fn load(path: &Path) -> Result<HashMap<String, Arc<TranslationCell>>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => {
                return Err(CacheError::PathUnusable {
                    path: path.to_path_buf(),
                    reason: format!("cannot read cache file: {e}"),
                });
            }
        };
        let content = String::from_utf8(bytes).map_err(|e| {
            let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
            CacheError::CorruptCache {
                path: path.to_path_buf(),
                line: valid.iter().filter(|&&b| b == b'\n').count() + 1,
                reason: "invalid UTF-8".to_string(),
            }
        })?;

        let entries = parse_records(&content, path)?
            .into_iter()
            .map(|(original, translation)| {
                (
                    normalize(&original),
                    Arc::new(TranslationCell::resolved(original, translation)),
                )
            })
            .collect();

        Ok(entries)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the cached translation of `original`, if resolved.
    pub fn get(&self, original: &str) -> Option<String> {
        self.inner
            .lock()
            .entries
            .get(&normalize(original))
            .and_then(|cell| cell.try_get())
    }

    /// Finds the cell for `original`, inserting a pending one on a miss.
    ///
    /// The pending cell is visible to other callers before this returns, so
    /// concurrent lookups of the same text share one cell.
    pub fn lookup_or_create(&self, original: &str) -> Lookup {
        self.lookup_or_create_with(original, |_| ()).0
    }

    /// Like [`lookup_or_create`](Self::lookup_or_create), running `on_miss`
    /// on the new cell before the store lock is released.
    ///
    /// Concurrent lookups of the same text return only after `on_miss` has
    /// finished, so a submission made there is already visible to them.
    pub fn lookup_or_create_with<T>(
        &self,
        original: &str,
        on_miss: impl FnOnce(&Arc<TranslationCell>) -> T,
    ) -> (Lookup, Option<T>) {
        let key = normalize(original);
        let mut inner = self.inner.lock();

        if let Some(cell) = inner.entries.get(&key) {
            let cell = Arc::clone(cell);
            drop(inner);
            let hits = self.hits.fetch_add(1, Ordering::Relaxed) + 1;
            if hits % HIT_LOG_INTERVAL == 0 {
                debug!(hits, path = %self.path.display(), "Strings served from cache");
            }
            return (Lookup::Hit(cell), None);
        }

        let cell = Arc::new(TranslationCell::pending(original));
        inner.entries.insert(key, Arc::clone(&cell));
        let outcome = on_miss(&cell);
        (Lookup::Miss(cell), Some(outcome))
    }

    /// Inserts a known pair directly.
    ///
    /// Feeding a pair that is already cached (translation compared
    /// case-insensitively) is a no-op. A different translation is rejected
    /// with [`CacheError::ConflictingEntry`] unless `overwrite` is set. A
    /// pending cell for the same text is resolved with the fed translation.
    pub fn feed(&self, original: &str, translation: &str, overwrite: bool) -> Result<()> {
        let original = decode_line(original);
        let translation = decode_line(translation);
        let key = normalize(&original);
        let mut inner = self.inner.lock();

        let existing = inner.entries.get(&key).map(|cell| (Arc::clone(cell), cell.state()));
        match existing {
            Some((_, CellState::Resolved(current))) => {
                if current.to_lowercase() == translation.to_lowercase() {
                    return Ok(());
                }
                if !overwrite {
                    if let Some(log) = inner.log.as_mut() {
                        log.flush()?;
                    }
                    return Err(CacheError::ConflictingEntry {
                        original,
                        existing: current,
                        proposed: translation,
                    });
                }
            }
            Some((cell, CellState::Pending)) => {
                inner.append(&[(original.as_str(), translation.as_str())])?;
                cell.resolve(translation);
                return Ok(());
            }
            Some((_, CellState::Failed(_))) | None => {}
        }

        inner.append(&[(original.as_str(), translation.as_str())])?;
        inner.entries.insert(
            key,
            Arc::new(TranslationCell::resolved(original, translation)),
        );
        Ok(())
    }

    /// Writes one record to the cache file.
    pub fn append(&self, original: &str, translation: &str) -> Result<()> {
        self.inner.lock().append(&[(original, translation)])
    }

    /// Appends the records of the still pending cells as one write, then
    /// resolves those cells with their translations.
    ///
    /// Cells that already left the pending state (for example through
    /// [`feed`](Self::feed)) keep their value and are not written again.
    /// If the write fails no cell is resolved.
    pub fn complete(&self, cells: &[Arc<TranslationCell>], translations: &[String]) -> Result<usize> {
        let mut inner = self.inner.lock();
        let pending: Vec<_> = cells
            .iter()
            .zip(translations)
            .filter(|(cell, _)| cell.is_pending())
            .collect();
        let records: Vec<(&str, &str)> = pending
            .iter()
            .map(|(cell, translation)| (cell.original(), translation.as_str()))
            .collect();

        inner.append(&records)?;
        for (cell, translation) in &pending {
            cell.resolve(translation.as_str());
        }
        Ok(pending.len())
    }

    /// Drops map entries that still point at the given cells.
    pub fn evict(&self, cells: &[Arc<TranslationCell>]) {
        let mut inner = self.inner.lock();
        for cell in cells {
            let key = cell.key();
            if inner
                .entries
                .get(&key)
                .is_some_and(|current| Arc::ptr_eq(current, cell))
            {
                inner.entries.remove(&key);
            }
        }
    }

    /// Forces buffered records to durable storage.
    pub fn flush(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if let Some(log) = inner.log.as_mut() {
            log.flush()?;
            log.get_ref().sync_data()?;
        }
        Ok(())
    }

    /// Releases the in-memory map. Records can still be appended.
    pub fn detach(&self) {
        self.inner.lock().entries.clear();
    }

    /// Flushes and closes the cache file.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if let Some(mut log) = inner.log.take() {
            log.flush()?;
            log.get_ref().sync_data()?;
            info!(path = %self.path.display(), "Closed translation cache");
        }
        Ok(())
    }
}

/// Cache file name for a language pair, e.g. `EN_FR.cache`.
pub fn file_name(source: &str, target: &str) -> String {
    format!(
        "{}_{}.cache",
        source.to_uppercase(),
        target.to_uppercase()
    )
}
