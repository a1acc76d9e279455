//! Concurrent local tasks behind a join barrier.

use crate::core::JobOutcome;
use crate::stages::FanOutTask;
use futures::future::join_all;
use tracing::{debug, warn};

/// Runs every task on its own tokio task and waits for all of them.
///
/// Returns `(position, outcome)` pairs in the order the tasks were given. A
/// task that panics counts as failed.
pub async fn run_barrier(tasks: Vec<FanOutTask>) -> Vec<(usize, JobOutcome)> {
    debug!(tasks = tasks.len(), "Starting fan-out");
    let (positions, handles): (Vec<_>, Vec<_>) = tasks
        .into_iter()
        .map(|task| (task.position, tokio::spawn(task.future)))
        .unzip();

    positions
        .into_iter()
        .zip(join_all(handles).await)
        .map(|(position, joined)| match joined {
            Ok(outcome) => (position, outcome),
            Err(e) => {
                warn!(position, error = %e, "Fan-out task did not complete");
                (position, JobOutcome::Failed)
            }
        })
        .collect()
}
