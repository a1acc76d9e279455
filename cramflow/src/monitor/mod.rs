//! Completion monitoring for externally submitted batch jobs.
//!
//! The scheduler's only visible contract is a per-job log file that
//! eventually contains a terminal marker. [`JobMonitor`] polls those logs in a
//! single loop until every pending job is terminal, or until an optional
//! deadline passes.

mod clock;
mod job_monitor;
mod markers;
mod pending;
mod source;

pub use clock::{PollClock, TokioClock};
pub use job_monitor::{JobMonitor, MonitorOutcome};
pub use markers::JobMarkers;
pub use pending::{PendingJob, PendingJobSet};
pub use source::{FsLogSource, JobLogSource};
