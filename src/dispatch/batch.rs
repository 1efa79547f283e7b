use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::cache::TranslationCell;
use crate::identity::Identity;
use crate::translation::BatchTranslator;

/// Default character threshold of a batch.
pub const DEFAULT_MAX_BATCH_CHARS: usize = 2500;

/// A group of cells detached for one provider call.
pub struct Batch {
    identity: Identity,
    provider: Arc<dyn BatchTranslator>,
    cells: Vec<Arc<TranslationCell>>,
    chars: usize,
}

impl Batch {
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    pub const fn provider(&self) -> &Arc<dyn BatchTranslator> {
        &self.provider
    }

    /// Cells in submission order.
    pub fn cells(&self) -> &[Arc<TranslationCell>] {
        &self.cells
    }

    /// Original texts in submission order.
    pub fn texts(&self) -> Vec<String> {
        self.cells
            .iter()
            .map(|cell| cell.original().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Combined character count of the original texts.
    pub const fn chars(&self) -> usize {
        self.chars
    }
}

struct PendingBatch {
    provider: Arc<dyn BatchTranslator>,
    cells: Vec<Arc<TranslationCell>>,
    chars: usize,
}

/// Collects missed cells per identity until a character threshold is crossed.
///
/// Appending a cell, checking the threshold and detaching the pending list
/// happen under one lock, so every cell lands in exactly one batch.
pub struct BatchAccumulator {
    max_chars: usize,
    pending: Mutex<HashMap<Identity, PendingBatch>>,
}

impl BatchAccumulator {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub const fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Adds `cell` to the identity's pending list.
    ///
    /// Returns the detached batch once the running character count reaches
    /// the threshold; the identity then starts again from zero.
    pub fn submit(
        &self,
        identity: &Identity,
        provider: &Arc<dyn BatchTranslator>,
        cell: Arc<TranslationCell>,
    ) -> Option<Batch> {
        let chars = cell.original().chars().count();
        let mut pending = self.pending.lock();

        let entry = pending
            .entry(identity.clone())
            .or_insert_with(|| PendingBatch {
                provider: Arc::clone(provider),
                cells: Vec::new(),
                chars: 0,
            });
        entry.cells.push(cell);
        entry.chars += chars;

        if entry.chars < self.max_chars {
            return None;
        }

        let batch = pending.remove(identity).map(|p| Self::detach(identity.clone(), p));
        drop(pending);

        if let Some(batch) = &batch {
            debug!(
                identity = %identity,
                cells = batch.len(),
                chars = batch.chars(),
                "Batch threshold reached"
            );
        }
        batch
    }

    /// Detaches whatever is pending for the identity, below threshold or not.
    pub fn take(&self, identity: &Identity) -> Option<Batch> {
        let removed = self.pending.lock().remove(identity)?;
        let batch = Self::detach(identity.clone(), removed);
        (!batch.is_empty()).then_some(batch)
    }

    /// Detaches the pending list that holds `cell`, whichever identity owns it.
    pub fn take_containing(&self, cell: &Arc<TranslationCell>) -> Option<Batch> {
        let mut pending = self.pending.lock();
        let owner = pending
            .iter()
            .find(|(_, p)| p.cells.iter().any(|c| Arc::ptr_eq(c, cell)))
            .map(|(identity, _)| identity.clone())?;
        let removed = pending.remove(&owner)?;
        drop(pending);
        Some(Self::detach(owner, removed))
    }

    /// Characters currently pending for the identity.
    pub fn pending_chars(&self, identity: &Identity) -> usize {
        self.pending.lock().get(identity).map_or(0, |p| p.chars)
    }

    fn detach(identity: Identity, pending: PendingBatch) -> Batch {
        Batch {
            identity,
            provider: pending.provider,
            cells: pending.cells,
            chars: pending.chars,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::thread;

    struct Echo;

    #[async_trait]
    impl BatchTranslator for Echo {
        async fn translate_batch(&self, _: &str, _: &str, texts: &[String]) -> Result<Vec<String>> {
            Ok(texts.to_vec())
        }
    }

    fn provider() -> Arc<dyn BatchTranslator> {
        Arc::new(Echo)
    }

    fn cell(text: &str) -> Arc<TranslationCell> {
        Arc::new(TranslationCell::pending(text))
    }

    #[test]
    fn test_submit_below_threshold_keeps_pending() {
        let accumulator = BatchAccumulator::new(10);
        let identity = Identity::new("key", "app");

        assert!(accumulator.submit(&identity, &provider(), cell("Hello")).is_none());
        assert_eq!(accumulator.pending_chars(&identity), 5);
    }

    #[test]
    fn test_submit_crossing_threshold_detaches_in_order() {
        let accumulator = BatchAccumulator::new(10);
        let identity = Identity::new("key", "app");
        let provider = provider();

        assert!(accumulator.submit(&identity, &provider, cell("Hello")).is_none());
        let batch = accumulator.submit(&identity, &provider, cell("World")).unwrap();

        assert_eq!(batch.texts(), vec!["Hello", "World"]);
        assert_eq!(batch.chars(), 10);
        assert_eq!(accumulator.pending_chars(&identity), 0);

        // The next submission starts a fresh count
        assert!(accumulator.submit(&identity, &provider, cell("Again")).is_none());
        assert_eq!(accumulator.pending_chars(&identity), 5);
    }

    #[test]
    fn test_threshold_counts_characters_not_bytes() {
        let accumulator = BatchAccumulator::new(6);
        let identity = Identity::new("key", "app");

        assert!(accumulator.submit(&identity, &provider(), cell("こんにちは")).is_none());
        assert_eq!(accumulator.pending_chars(&identity), 5);
    }

    #[test]
    fn test_identities_are_batched_separately() {
        let accumulator = BatchAccumulator::new(10);
        let alice = Identity::new("alice", "app");
        let bob = Identity::new("bob", "app");
        let provider = provider();

        assert!(accumulator.submit(&alice, &provider, cell("Hello")).is_none());
        assert!(accumulator.submit(&bob, &provider, cell("World")).is_none());

        let batch = accumulator.take(&alice).unwrap();
        assert_eq!(batch.texts(), vec!["Hello"]);
        assert_eq!(accumulator.pending_chars(&bob), 5);
    }

    #[test]
    fn test_take_on_empty_identity() {
        let accumulator = BatchAccumulator::new(10);
        assert!(accumulator.take(&Identity::new("key", "app")).is_none());
    }

    #[test]
    fn test_take_containing_finds_owner() {
        let accumulator = BatchAccumulator::new(100);
        let alice = Identity::new("alice", "app");
        let bob = Identity::new("bob", "app");
        let provider = provider();
        let wanted = cell("World");

        accumulator.submit(&alice, &provider, cell("Hello"));
        accumulator.submit(&bob, &provider, Arc::clone(&wanted));

        let batch = accumulator.take_containing(&wanted).unwrap();
        assert_eq!(batch.identity(), &bob);
        assert_eq!(accumulator.pending_chars(&alice), 5);
        assert!(accumulator.take_containing(&wanted).is_none());
    }

    #[test]
    fn test_concurrent_submissions_land_in_exactly_one_batch() {
        let accumulator = Arc::new(BatchAccumulator::new(50));
        let identity = Identity::new("key", "app");

        let workers: Vec<_> = (0..8)
            .map(|worker| {
                let accumulator = Arc::clone(&accumulator);
                let identity = identity.clone();
                thread::spawn(move || {
                    let provider = provider();
                    let mut detached = Vec::new();
                    for i in 0..100 {
                        let text = format!("w{worker}-{i:03}");
                        if let Some(batch) = accumulator.submit(&identity, &provider, cell(&text)) {
                            detached.extend(batch.texts());
                        }
                    }
                    detached
                })
            })
            .collect();

        let mut seen: Vec<String> = workers
            .into_iter()
            .flat_map(|w| w.join().unwrap())
            .collect();
        if let Some(rest) = accumulator.take(&identity) {
            seen.extend(rest.texts());
        }

        let total = seen.len();
        seen.sort();
        seen.dedup();
        assert_eq!(total, 800);
        assert_eq!(seen.len(), 800);
    }
}
