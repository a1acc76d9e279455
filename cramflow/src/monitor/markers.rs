//! Scheduler log markers.

use crate::core::JobOutcome;
use serde::{Deserialize, Serialize};

/// LSF writes this once a job has finished, whatever the exit status.
pub const LSF_TERMINAL_MARKER: &str = "Terminated at";
/// LSF writes this when a job exited zero.
pub const LSF_SUCCESS_MARKER: &str = "Successfully completed.";

/// Substrings that classify a job log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMarkers {
    /// Present once the job has finished.
    pub terminal: String,
    /// Additionally present when the job succeeded.
    pub success: String,
}

impl Default for JobMarkers {
    fn default() -> Self {
        Self {
            terminal: LSF_TERMINAL_MARKER.to_string(),
            success: LSF_SUCCESS_MARKER.to_string(),
        }
    }
}

impl JobMarkers {
    /// Creates markers from explicit strings.
    #[must_use]
    pub fn new(terminal: impl Into<String>, success: impl Into<String>) -> Self {
        Self {
            terminal: terminal.into(),
            success: success.into(),
        }
    }

    /// Classifies log text. `None` means the job is still running.
    #[must_use]
    pub fn classify(&self, log: &str) -> Option<JobOutcome> {
        if !log.contains(&self.terminal) {
            return None;
        }
        Some(JobOutcome::from_success(log.contains(&self.success)))
    }
}
