//! Threshold batching of cache misses and asynchronous provider dispatch.

mod batch;
mod dispatcher;

pub use batch::{Batch, BatchAccumulator, DEFAULT_MAX_BATCH_CHARS};
pub use dispatcher::{DEFAULT_MAX_IN_FLIGHT, Dispatcher, InFlight, InFlightGuard};
