//! The stage-scoped set of in-flight jobs.

use std::path::{Path, PathBuf};

/// One submitted job awaiting a terminal log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingJob {
    /// Work item id, or another stage-chosen key for collection-level jobs.
    pub key: String,
    /// Where the scheduler writes this job's log.
    pub log: PathBuf,
}

/// Jobs submitted but not yet confirmed terminal, in submission order.
///
/// Never persisted; it lives only for the duration of one monitor call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingJobSet {
    jobs: Vec<PendingJob>,
}

impl PendingJobSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a job, replacing any earlier entry with the same key.
    pub fn insert(&mut self, key: impl Into<String>, log: impl Into<PathBuf>) {
        let key = key.into();
        let log = log.into();
        if let Some(existing) = self.jobs.iter_mut().find(|j| j.key == key) {
            existing.log = log;
        } else {
            self.jobs.push(PendingJob { key, log });
        }
    }

    /// Returns the log locator for a key.
    #[must_use]
    pub fn log_for(&self, key: &str) -> Option<&Path> {
        self.jobs
            .iter()
            .find(|j| j.key == key)
            .map(|j| j.log.as_path())
    }

    /// Returns the number of pending jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Returns the pending keys in order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.jobs.iter().map(|j| j.key.clone()).collect()
    }

    pub(crate) fn take(&mut self) -> Vec<PendingJob> {
        std::mem::take(&mut self.jobs)
    }

    pub(crate) fn restore(&mut self, job: PendingJob) {
        self.jobs.push(job);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_same_key() {
        let mut set = PendingJobSet::new();
        set.insert("a.cram", "1/a.o");
        set.insert("b.cram", "1/b.o");
        set.insert("a.cram", "1/a2.o");

        assert_eq!(set.len(), 2);
        assert_eq!(set.keys(), vec!["a.cram", "b.cram"]);
        assert_eq!(set.log_for("a.cram"), Some(Path::new("1/a2.o")));
        assert_eq!(set.log_for("c.cram"), None);
    }
}
