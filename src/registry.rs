//! Shared cache instances keyed by language pair and directory.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use crate::cache::CacheStore;
use crate::dispatch::{
    BatchAccumulator, DEFAULT_MAX_BATCH_CHARS, DEFAULT_MAX_IN_FLIGHT, Dispatcher, InFlight,
};
use crate::error::{CacheError, Result};
use crate::translation::validate_language;

/// Defaults and limits shared by every translator opened on a registry.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Target language used when a translator does not name one.
    pub default_target: String,
    /// Application name used when a translator does not name one.
    pub default_app_name: String,
    /// Credential used when a translator does not provide one.
    pub default_credential: Option<String>,
    /// Cache directory used when a translator does not provide one.
    pub default_cache_dir: Option<PathBuf>,
    /// Character count at which a pending batch is dispatched.
    pub max_batch_chars: usize,
    /// Maximum number of provider calls running at once.
    pub max_in_flight: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_target: "en".to_string(),
            default_app_name: "tl".to_string(),
            default_credential: None,
            default_cache_dir: None,
            max_batch_chars: DEFAULT_MAX_BATCH_CHARS,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

/// Unique id of one open translator handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(u64);

/// Identifies an instance: one cache per language pair and directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceKey {
    pub source: String,
    pub target: String,
    pub dir: PathBuf,
}

/// A cache store together with its batching and in-flight tracking.
pub struct Instance {
    key: InstanceKey,
    store: CacheStore,
    batches: BatchAccumulator,
    in_flight: Arc<InFlight>,
}

impl Instance {
    fn open(key: InstanceKey, max_batch_chars: usize) -> Result<Self> {
        let store = CacheStore::open(&key.dir, &key.source, &key.target)?;
        Ok(Self {
            key,
            store,
            batches: BatchAccumulator::new(max_batch_chars),
            in_flight: Arc::new(InFlight::new()),
        })
    }

    pub const fn key(&self) -> &InstanceKey {
        &self.key
    }

    pub fn source(&self) -> &str {
        &self.key.source
    }

    pub fn target(&self) -> &str {
        &self.key.target
    }

    pub const fn store(&self) -> &CacheStore {
        &self.store
    }

    pub const fn batches(&self) -> &BatchAccumulator {
        &self.batches
    }

    pub const fn in_flight(&self) -> &Arc<InFlight> {
        &self.in_flight
    }
}

struct Entry {
    instance: Arc<Instance>,
    users: HashSet<HandleId>,
}

struct Shared {
    config: RegistryConfig,
    dispatcher: Dispatcher,
    instances: Mutex<HashMap<InstanceKey, Entry>>,
    next_handle: AtomicU64,
}

/// Deduplicates cache instances and tracks which handles use them.
///
/// Cloning is cheap; every clone refers to the same set of instances and
/// the same dispatcher.
#[derive(Clone)]
pub struct Registry {
    shared: Arc<Shared>,
}

impl Registry {
    pub fn new(config: RegistryConfig) -> Result<Self> {
        let dispatcher = Dispatcher::new(config.max_in_flight)?;
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                dispatcher,
                instances: Mutex::new(HashMap::new()),
                next_handle: AtomicU64::new(1),
            }),
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.shared.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.shared.dispatcher
    }

    /// Allocates an id for a new handle.
    pub fn next_handle_id(&self) -> HandleId {
        HandleId(self.shared.next_handle.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the instance for the tuple, opening it on first use, and
    /// registers `handle` as one of its users.
    pub fn acquire(
        &self,
        source: &str,
        target: &str,
        dir: &Path,
        handle: HandleId,
    ) -> Result<Arc<Instance>> {
        validate_language(source)?;
        validate_language(target)?;
        let dir = prepare_cache_dir(dir)?;

        let key = InstanceKey {
            source: source.to_string(),
            target: target.to_string(),
            dir,
        };

        let mut instances = self.shared.instances.lock();
        if let Some(entry) = instances.get_mut(&key) {
            entry.users.insert(handle);
            return Ok(Arc::clone(&entry.instance));
        }

        let instance = Arc::new(Instance::open(
            key.clone(),
            self.shared.config.max_batch_chars,
        )?);
        instances.insert(
            key,
            Entry {
                instance: Arc::clone(&instance),
                users: HashSet::from([handle]),
            },
        );
        Ok(instance)
    }

    /// Unregisters `handle`. The last handle out closes the instance after
    /// every running dispatch has finished.
    ///
    /// The registry lock is held through the drain, so an `acquire` of the
    /// same tuple only proceeds once the cache file is closed.
    pub fn release(&self, instance: &Arc<Instance>, handle: HandleId) -> Result<()> {
        let mut instances = self.shared.instances.lock();
        let Some(entry) = instances.get_mut(instance.key()) else {
            return Ok(());
        };
        if !Arc::ptr_eq(&entry.instance, instance) {
            return Ok(());
        }
        entry.users.remove(&handle);
        if !entry.users.is_empty() {
            return Ok(());
        }

        instance.store().detach();
        instances.remove(instance.key());

        let pending = instance.in_flight().count();
        if pending > 0 {
            info!(
                pending,
                path = %instance.store().path().display(),
                "Waiting for in-flight translations"
            );
        }
        instance.in_flight().wait_drained();
        let closed = instance.store().close();
        drop(instances);
        closed
    }

    /// Number of open instances.
    pub fn instance_count(&self) -> usize {
        self.shared.instances.lock().len()
    }

    /// Number of handles currently using the instance for `key`.
    pub fn user_count(&self, key: &InstanceKey) -> usize {
        self.shared
            .instances
            .lock()
            .get(key)
            .map_or(0, |entry| entry.users.len())
    }
}

/// Makes sure `dir` exists and is readable and writable, returning its
/// canonical form.
pub fn prepare_cache_dir(dir: &Path) -> Result<PathBuf> {
    let unusable = |reason: String| CacheError::PathUnusable {
        path: dir.to_path_buf(),
        reason,
    };

    if dir.exists() {
        if !dir.is_dir() {
            return Err(unusable("path is not a directory".to_string()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| unusable(format!("cannot create directory: {e}")))?;
    }

    fs::read_dir(dir).map_err(|e| unusable(format!("cannot read directory: {e}")))?;

    let metadata = fs::metadata(dir).map_err(|e| unusable(format!("cannot stat directory: {e}")))?;
    if metadata.permissions().readonly() {
        return Err(unusable("directory is read-only".to_string()));
    }

    dir.canonicalize()
        .map_err(|e| unusable(format!("cannot resolve directory: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_registry() -> Registry {
        Registry::new(RegistryConfig::default()).unwrap()
    }

    #[test]
    fn test_prepare_cache_dir_creates_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("nested").join("cache");

        let prepared = prepare_cache_dir(&dir).unwrap();
        assert!(prepared.is_dir());
    }

    #[test]
    fn test_prepare_cache_dir_rejects_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("not-a-dir");
        fs::write(&file, "").unwrap();

        let result = prepare_cache_dir(&file);
        assert!(matches!(result, Err(CacheError::PathUnusable { .. })));
    }

    #[test]
    fn test_acquire_same_tuple_shares_instance() {
        let temp_dir = TempDir::new().unwrap();
        let registry = create_test_registry();
        let (a, b) = (registry.next_handle_id(), registry.next_handle_id());

        let first = registry.acquire("en", "fr", temp_dir.path(), a).unwrap();
        let second = registry.acquire("en", "fr", temp_dir.path(), b).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.instance_count(), 1);
        assert_eq!(registry.user_count(first.key()), 2);
    }

    #[test]
    fn test_acquire_different_target_gets_new_instance() {
        let temp_dir = TempDir::new().unwrap();
        let registry = create_test_registry();

        let fr = registry
            .acquire("en", "fr", temp_dir.path(), registry.next_handle_id())
            .unwrap();
        let de = registry
            .acquire("en", "de", temp_dir.path(), registry.next_handle_id())
            .unwrap();

        assert!(!Arc::ptr_eq(&fr, &de));
        assert_eq!(registry.instance_count(), 2);
    }

    #[test]
    fn test_acquire_rejects_unknown_language() {
        let temp_dir = TempDir::new().unwrap();
        let registry = create_test_registry();

        let result = registry.acquire("en", "xx", temp_dir.path(), registry.next_handle_id());
        assert!(matches!(result, Err(CacheError::UnsupportedLanguage(_))));
    }

    #[test]
    fn test_release_last_user_closes_instance() {
        let temp_dir = TempDir::new().unwrap();
        let registry = create_test_registry();
        let (a, b) = (registry.next_handle_id(), registry.next_handle_id());

        let instance = registry.acquire("en", "fr", temp_dir.path(), a).unwrap();
        registry.acquire("en", "fr", temp_dir.path(), b).unwrap();
        instance.store().feed("Hello", "Bonjour", false).unwrap();

        registry.release(&instance, a).unwrap();
        assert_eq!(registry.instance_count(), 1);
        assert!(instance.store().append("Still", "Open").is_ok());

        registry.release(&instance, b).unwrap();
        assert_eq!(registry.instance_count(), 0);
        assert!(instance.store().is_empty());
        assert!(instance.store().append("Now", "Closed").is_err());
    }

    #[test]
    fn test_reacquire_after_release_reloads_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        let registry = create_test_registry();
        let handle = registry.next_handle_id();

        let instance = registry.acquire("en", "fr", temp_dir.path(), handle).unwrap();
        instance.store().feed("Hello", "Bonjour", false).unwrap();
        registry.release(&instance, handle).unwrap();

        let reopened = registry.acquire("en", "fr", temp_dir.path(), handle).unwrap();
        assert!(!Arc::ptr_eq(&instance, &reopened));
        assert_eq!(reopened.store().get("hello"), Some("Bonjour".to_string()));
    }
}
