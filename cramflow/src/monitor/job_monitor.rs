//! The log-polling completion loop.

use super::{JobLogSource, JobMarkers, PendingJobSet, PollClock};
use crate::core::JobOutcome;
use crate::events::{EventSink, NoOpEventSink};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default pause between sweeps.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How a monitor call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// Every job reached a terminal state.
    Completed {
        /// Number of sweeps performed.
        sweeps: usize,
    },
    /// The deadline passed with jobs still pending.
    DeadlineExceeded {
        /// Keys of jobs that never became terminal.
        still_pending: Vec<String>,
        /// Number of sweeps performed.
        sweeps: usize,
    },
}

impl MonitorOutcome {
    /// Returns true if every job finished.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Polls job logs until every pending job is terminal.
///
/// One loop serves all jobs of a stage: each sweep reads every pending log
/// once, reports terminal jobs through the caller's callback, then sleeps the
/// poll interval. Without a deadline the loop only ends when nothing is
/// pending.
#[derive(Clone)]
pub struct JobMonitor {
    source: Arc<dyn JobLogSource>,
    clock: Arc<dyn PollClock>,
    markers: JobMarkers,
    poll_interval: Duration,
    deadline: Option<Duration>,
    events: Arc<dyn EventSink>,
}

impl JobMonitor {
    /// Creates a monitor with LSF markers, a 5 second interval and no deadline.
    #[must_use]
    pub fn new(source: Arc<dyn JobLogSource>, clock: Arc<dyn PollClock>) -> Self {
        Self {
            source,
            clock,
            markers: JobMarkers::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            deadline: None,
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the log markers.
    #[must_use]
    pub fn with_markers(mut self, markers: JobMarkers) -> Self {
        self.markers = markers;
        self
    }

    /// Sets the pause between sweeps.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets how long one call may wait before giving up.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Returns the pause between sweeps.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Waits for every job in `pending` to reach a terminal state.
    ///
    /// `on_result` is called exactly once per job that becomes terminal. A
    /// log that is missing or lacks the terminal marker keeps its job pending.
    pub async fn await_completion<F>(&self, mut pending: PendingJobSet, mut on_result: F) -> MonitorOutcome
    where
        F: FnMut(&str, JobOutcome) + Send,
    {
        let started = self.clock.elapsed();
        let mut sweeps = 0;

        while !pending.is_empty() {
            sweeps += 1;
            for job in pending.take() {
                let outcome = match self.source.read(&job.log).await {
                    Some(text) => self.markers.classify(&text),
                    None => None,
                };
                let Some(outcome) = outcome else {
                    pending.restore(job);
                    continue;
                };

                match outcome {
                    JobOutcome::Succeeded => {
                        debug!(key = %job.key, log = %job.log.display(), "Job succeeded");
                        self.events.try_emit(
                            "job.succeeded",
                            Some(serde_json::json!({ "key": job.key })),
                        );
                    }
                    JobOutcome::Failed => {
                        warn!(key = %job.key, log = %job.log.display(), "Batch job failed");
                        self.events.try_emit(
                            "job.failed",
                            Some(serde_json::json!({
                                "key": job.key,
                                "log": job.log.display().to_string(),
                            })),
                        );
                    }
                }
                on_result(&job.key, outcome);
            }

            if pending.is_empty() {
                break;
            }

            let waited = self.clock.elapsed().saturating_sub(started);
            if let Some(deadline) = self.deadline {
                if waited >= deadline {
                    info!(
                        pending = pending.len(),
                        waited_secs = waited.as_secs(),
                        "Giving up on pending jobs, deadline reached"
                    );
                    return MonitorOutcome::DeadlineExceeded {
                        still_pending: pending.keys(),
                        sweeps,
                    };
                }
            }

            debug!(pending = pending.len(), sweep = sweeps, "Still waiting on batch jobs");
            self.events.try_emit(
                "monitor.waiting",
                Some(serde_json::json!({
                    "pending": pending.len(),
                    "sweep": sweeps,
                    "waited_secs": waited.as_secs(),
                })),
            );
            self.clock.sleep(self.poll_interval).await;
        }

        MonitorOutcome::Completed { sweeps }
    }
}

impl std::fmt::Debug for JobMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobMonitor")
            .field("markers", &self.markers)
            .field("poll_interval", &self.poll_interval)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}
