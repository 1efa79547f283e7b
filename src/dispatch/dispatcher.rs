use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use super::batch::Batch;
use crate::cache::TranslationCell;
use crate::error::{CacheError, Result};
use crate::registry::Instance;

/// Default bound on concurrent provider calls.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Count of dispatches still running for one instance.
#[derive(Debug, Default)]
pub struct InFlight {
    count: Mutex<usize>,
    drained: Condvar,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a dispatch; it counts until the returned guard is dropped.
    pub fn begin(self: &Arc<Self>) -> InFlightGuard {
        *self.count.lock() += 1;
        InFlightGuard {
            in_flight: Arc::clone(self),
        }
    }

    pub fn count(&self) -> usize {
        *self.count.lock()
    }

    /// Blocks until no dispatch is running.
    pub fn wait_drained(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.drained.wait(&mut count);
        }
    }
}

/// Keeps a dispatch counted in its [`InFlight`] while alive.
pub struct InFlightGuard {
    in_flight: Arc<InFlight>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut count = self.in_flight.count.lock();
        *count -= 1;
        if *count == 0 {
            self.in_flight.drained.notify_all();
        }
    }
}

/// Runs provider calls for detached batches on a dedicated runtime.
///
/// Submitters never wait on a dispatch; the number of provider calls
/// running at once is capped by a semaphore.
pub struct Dispatcher {
    /// Taken on drop so the runtime can be shut down from any context.
    runtime: Option<Runtime>,
    handle: Handle,
    permits: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn new(max_in_flight: usize) -> Result<Self> {
        let max_in_flight = max_in_flight.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(max_in_flight)
            .thread_name("tl-dispatch")
            .enable_all()
            .build()?;

        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
            permits: Arc::new(Semaphore::new(max_in_flight)),
        })
    }

    /// Schedules `batch` for translation on behalf of `instance`.
    ///
    /// The instance's in-flight count is raised before this returns, so a
    /// drain started afterwards waits for this batch.
    pub fn dispatch(&self, instance: &Arc<Instance>, batch: Batch) {
        if batch.is_empty() {
            return;
        }

        let guard = instance.in_flight().begin();
        let instance = Arc::clone(instance);
        let permits = Arc::clone(&self.permits);

        self.handle.spawn(async move {
            let _guard = guard;
            // The semaphore is never closed, so this only waits for a slot
            let _permit = permits.acquire_owned().await;

            match run_batch(&instance, &batch).await {
                Ok(written) => debug!(
                    identity = %batch.identity(),
                    cells = batch.len(),
                    written,
                    "Batch translated"
                ),
                Err(e) => {
                    warn!(
                        identity = %batch.identity(),
                        cells = batch.len(),
                        error = %e,
                        "Batch dispatch failed; its texts stay untranslated"
                    );
                    fail_batch(&instance, batch.cells(), &e);
                }
            }
        });
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // A plain drop blocks, which panics inside an async context
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

async fn run_batch(instance: &Instance, batch: &Batch) -> Result<usize> {
    let texts = batch.texts();
    let translations = batch
        .provider()
        .translate_batch(instance.source(), instance.target(), &texts)
        .await
        .map_err(|e| CacheError::ProviderTransport(format!("{e:#}")))?;

    if translations.len() != texts.len() {
        return Err(CacheError::ProviderMismatch {
            submitted: texts.len(),
            returned: translations.len(),
        });
    }

    instance.store().complete(batch.cells(), &translations)
}

fn fail_batch(instance: &Instance, cells: &[Arc<TranslationCell>], error: &CacheError) {
    let reason = error.to_string();
    let failed: Vec<_> = cells
        .iter()
        .filter(|cell| cell.fail(reason.as_str()))
        .cloned()
        .collect();
    instance.store().evict(&failed);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_in_flight_counts_guards() {
        let in_flight = Arc::new(InFlight::new());
        let first = in_flight.begin();
        let second = in_flight.begin();
        assert_eq!(in_flight.count(), 2);

        drop(first);
        assert_eq!(in_flight.count(), 1);
        drop(second);
        assert_eq!(in_flight.count(), 0);
    }

    #[test]
    fn test_wait_drained_returns_when_idle() {
        let in_flight = InFlight::new();
        in_flight.wait_drained();
    }

    #[test]
    fn test_wait_drained_blocks_until_guard_dropped() {
        let in_flight = Arc::new(InFlight::new());
        let guard = in_flight.begin();

        let releaser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            drop(guard);
        });

        in_flight.wait_drained();
        assert_eq!(in_flight.count(), 0);
        releaser.join().unwrap();
    }

    #[test]
    fn test_dispatcher_accepts_zero_workers() {
        assert!(Dispatcher::new(0).is_ok());
    }

    #[tokio::test]
    async fn test_dispatcher_dropped_inside_async_context() {
        let dispatcher = Dispatcher::new(2).unwrap();
        drop(dispatcher);
    }
}
