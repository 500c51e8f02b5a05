//! Device capture coordinator.
//!
//! Fans one named operation out over every device, bounded by a worker
//! count, and aggregates outcomes. Every dispatched operation is awaited
//! before a failure is surfaced: device operations have real-world side
//! effects (shutter, mount/unmount) and must never be abandoned mid-flight.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use crate::errors::{DeviceError, DispatchError};

/// Runs `f` for every unit in `units`, at most `worker_limit` concurrently.
///
/// Waits for all units regardless of individual outcomes, then surfaces the
/// first failure found, if any. Failures are not retried.
pub async fn run_on_all<T, F, Fut>(
    operation: &'static str,
    units: Vec<T>,
    worker_limit: usize,
    f: F,
) -> Result<(), DispatchError>
where
    T: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<(), DeviceError>> + Send + 'static,
{
    debug!(
        operation,
        units = units.len(),
        workers = worker_limit,
        "dispatching device operation"
    );
    let permits = Arc::new(Semaphore::new(worker_limit.max(1)));
    let mut tasks = JoinSet::new();
    for unit in units {
        let permits = Arc::clone(&permits);
        let work = f(unit);
        tasks.spawn(async move {
            // The semaphore is never closed, so acquire only fails if it
            // were; holding the permit bounds in-flight device operations.
            let _permit = permits.acquire().await.ok();
            work.await
        });
    }

    let mut first_failure: Option<DispatchError> = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(source)) => {
                first_failure.get_or_insert(DispatchError::OperationFailed { operation, source });
            }
            Err(_) => {
                first_failure.get_or_insert(DispatchError::TaskPanicked { operation });
            }
        }
    }
    match first_failure {
        Some(failure) => Err(failure),
        None => Ok(()),
    }
}
