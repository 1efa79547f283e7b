//! One-shot result cell for a text awaiting its translation.

use parking_lot::{Condvar, Mutex};

use crate::error::{CacheError, Result};

/// Lifecycle of a [`TranslationCell`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellState {
    /// Submitted, waiting for its batch to be dispatched.
    Pending,
    /// Holds the translated text. Terminal.
    Resolved(String),
    /// The batch carrying this cell failed. Terminal.
    Failed(String),
}

/// A unit of text together with its eventually-available translation.
///
/// Cells are shared behind `Arc` by the cache store and every caller that
/// submitted the same text. The state moves out of `Pending` exactly once;
/// all current and future waiters observe the same terminal state.
#[derive(Debug)]
pub struct TranslationCell {
    original: String,
    state: Mutex<CellState>,
    settled: Condvar,
}

impl TranslationCell {
    /// Creates a cell still waiting for its translation.
    pub fn pending(original: impl Into<String>) -> Self {
        Self::with_state(original.into(), CellState::Pending)
    }

    /// Creates a cell whose translation is already known.
    pub fn resolved(original: impl Into<String>, translation: impl Into<String>) -> Self {
        Self::with_state(original.into(), CellState::Resolved(translation.into()))
    }

    const fn with_state(original: String, state: CellState) -> Self {
        Self {
            original,
            state: Mutex::new(state),
            settled: Condvar::new(),
        }
    }

    /// The text as it was submitted.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Case-insensitive lookup key for this cell's text.
    pub fn key(&self) -> String {
        normalize(&self.original)
    }

    /// Moves the cell from pending to resolved and wakes every waiter.
    ///
    /// Returns `false` without changing anything if the cell had already
    /// left the pending state.
    pub fn resolve(&self, translation: impl Into<String>) -> bool {
        self.settle(CellState::Resolved(translation.into()))
    }

    /// Moves the cell from pending to failed and wakes every waiter.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.settle(CellState::Failed(reason.into()))
    }

    fn settle(&self, next: CellState) -> bool {
        let mut state = self.state.lock();
        if *state != CellState::Pending {
            return false;
        }
        *state = next;
        drop(state);
        self.settled.notify_all();
        true
    }

    /// Returns the translation if it is available, without blocking.
    pub fn try_get(&self) -> Option<String> {
        match &*self.state.lock() {
            CellState::Resolved(translation) => Some(translation.clone()),
            CellState::Pending | CellState::Failed(_) => None,
        }
    }

    /// Blocks the calling thread until the cell leaves the pending state.
    ///
    /// There is no timeout: a batch that is never dispatched keeps the
    /// caller waiting.
    pub fn get(&self) -> Result<String> {
        let mut state = self.state.lock();
        loop {
            match &*state {
                CellState::Pending => self.settled.wait(&mut state),
                CellState::Resolved(translation) => return Ok(translation.clone()),
                CellState::Failed(reason) => {
                    return Err(CacheError::DispatchFailed {
                        original: self.original.clone(),
                        reason: reason.clone(),
                    });
                }
            }
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(*self.state.lock(), CellState::Resolved(_))
    }

    pub fn is_pending(&self) -> bool {
        *self.state.lock() == CellState::Pending
    }

    pub fn is_failed(&self) -> bool {
        matches!(*self.state.lock(), CellState::Failed(_))
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> CellState {
        self.state.lock().clone()
    }
}

impl PartialEq for TranslationCell {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key() && self.try_get() == other.try_get()
    }
}

/// Normalizes text into the case-insensitive key used by the cache.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_pending_cell_has_no_translation() {
        let cell = TranslationCell::pending("Hello");
        assert_eq!(cell.original(), "Hello");
        assert!(!cell.is_resolved());
        assert_eq!(cell.try_get(), None);
    }

    #[test]
    fn test_resolved_cell_returns_immediately() {
        let cell = TranslationCell::resolved("Hello", "Bonjour");
        assert!(cell.is_resolved());
        assert_eq!(cell.try_get(), Some("Bonjour".to_string()));
        assert_eq!(cell.get().unwrap(), "Bonjour");
    }

    #[test]
    fn test_resolve_only_once() {
        let cell = TranslationCell::pending("Hello");
        assert!(cell.resolve("Bonjour"));
        assert!(!cell.resolve("Salut"));
        assert!(!cell.fail("late failure"));
        assert_eq!(cell.try_get(), Some("Bonjour".to_string()));
    }

    #[test]
    fn test_get_wakes_all_waiters() {
        let cell = Arc::new(TranslationCell::pending("Hello"));

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let cell = Arc::clone(&cell);
                thread::spawn(move || cell.get().unwrap())
            })
            .collect();

        cell.resolve("Bonjour");

        for waiter in waiters {
            assert_eq!(waiter.join().unwrap(), "Bonjour");
        }
    }

    #[test]
    fn test_failed_cell_releases_waiters_with_error() {
        let cell = Arc::new(TranslationCell::pending("Hello"));
        let waiter = {
            let cell = Arc::clone(&cell);
            thread::spawn(move || cell.get())
        };

        cell.fail("connection refused");

        let err = waiter.join().unwrap().unwrap_err();
        assert!(matches!(err, CacheError::DispatchFailed { .. }));
        assert!(err.to_string().contains("connection refused"));
        assert!(cell.is_failed());
        assert!(!cell.is_resolved());
        assert_eq!(cell.try_get(), None);
    }

    #[test]
    fn test_key_is_case_insensitive() {
        let a = TranslationCell::resolved("Hello World", "Bonjour le monde");
        let b = TranslationCell::resolved("hello world", "Bonjour le monde");
        assert_eq!(a.key(), b.key());
        assert_eq!(a, b);
    }
}
