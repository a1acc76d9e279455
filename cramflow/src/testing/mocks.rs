//! Scripted stand-ins for the archive, the scheduler, local tools and time.

use crate::core::JobOutcome;
use crate::errors::{CramflowError, SubmissionError};
use crate::external::{
    ArchiveClient, ArchiveObject, BatchScheduler, JobCommand, JobRequest, LocalTools,
};
use crate::monitor::{JobLogSource, PollClock};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Log text the scheduler writes for a job that succeeded.
pub const LOG_SUCCEEDED: &str = "Sender: LSF System\n\nSuccessfully completed.\n\n\
Resource usage summary:\n\n    CPU time :   12.00 sec.\n\n\
Terminated at Fri Oct 16 12:00:00 2026";

/// Log text the scheduler writes for a job that failed.
pub const LOG_FAILED: &str = "Sender: LSF System\n\nExited with exit code 1.\n\n\
Terminated at Fri Oct 16 12:00:00 2026";

/// Log text of a job that has started but not finished.
pub const LOG_RUNNING: &str = "Sender: LSF System\n\nStarted at Fri Oct 16 11:59:00 2026";

/// A clock that only moves when slept on.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
    sleeps: Mutex<usize>,
}

impl ManualClock {
    /// Creates a clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many times the clock was slept on.
    #[must_use]
    pub fn sleeps(&self) -> usize {
        *self.sleeps.lock()
    }
}

#[async_trait]
impl PollClock for ManualClock {
    fn elapsed(&self) -> Duration {
        *self.now.lock()
    }

    async fn sleep(&self, duration: Duration) {
        *self.now.lock() += duration;
        *self.sleeps.lock() += 1;
        tokio::task::yield_now().await;
    }
}

/// Job logs held in memory, optionally changing from one read to the next.
#[derive(Debug, Default)]
pub struct MemoryLogSource {
    logs: Mutex<HashMap<PathBuf, VecDeque<Option<String>>>>,
}

impl MemoryLogSource {
    /// Creates a source with no logs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a log that reads the same every time.
    pub fn set(&self, path: &str, text: &str) {
        self.script(path, vec![Some(text)]);
    }

    /// Sets the successive reads of a log. The last one repeats.
    pub fn script(&self, path: &str, reads: Vec<Option<&str>>) {
        let reads = reads.into_iter().map(|r| r.map(str::to_string)).collect();
        self.logs.lock().insert(PathBuf::from(path), reads);
    }
}

#[async_trait]
impl JobLogSource for MemoryLogSource {
    async fn read(&self, locator: &Path) -> Option<String> {
        let mut logs = self.logs.lock();
        let reads = logs.get_mut(locator)?;
        if reads.len() > 1 {
            reads.pop_front().flatten()
        } else {
            reads.front().cloned().flatten()
        }
    }
}

#[derive(Debug, Default)]
struct ArchiveState {
    objects: Vec<ArchiveObject>,
    metadata: HashMap<String, String>,
    missing: HashSet<String>,
    unreachable: HashSet<String>,
    calls: Vec<String>,
}

/// An archive whose contents are set up front. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ScriptedArchive {
    state: Arc<Mutex<ArchiveState>>,
}

impl ScriptedArchive {
    /// Creates an empty archive.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object to the query result.
    #[must_use]
    pub fn with_object(self, collection: &str, name: &str) -> Self {
        self.state.lock().objects.push(ArchiveObject {
            collection: collection.to_string(),
            name: name.to_string(),
        });
        self
    }

    /// Sets the metadata text of an object.
    #[must_use]
    pub fn with_metadata(self, location: &str, text: &str) -> Self {
        self.state
            .lock()
            .metadata
            .insert(location.to_string(), text.to_string());
        self
    }

    /// Adds an object along with metadata carrying its category and label.
    #[must_use]
    pub fn with_sample(self, collection: &str, name: &str, category: &str, label: &str) -> Self {
        let location = format!("{collection}/{name}");
        self.with_object(collection, name)
            .with_metadata(&location, &super::metadata_text(category, label))
    }

    /// Makes the existence check report the object as absent.
    #[must_use]
    pub fn missing(self, location: &str) -> Self {
        self.state.lock().missing.insert(location.to_string());
        self
    }

    /// Makes the existence check for the object fail outright.
    #[must_use]
    pub fn unreachable(self, location: &str) -> Self {
        self.state.lock().unreachable.insert(location.to_string());
        self
    }

    /// Every call made, as `"<operation> <argument>"`.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    /// Calls whose operation starts with `prefix`.
    #[must_use]
    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn record(&self, call: String) {
        self.state.lock().calls.push(call);
    }
}

#[async_trait]
impl ArchiveClient for ScriptedArchive {
    async fn query(&self, run: &str, lane: &str) -> Result<Vec<ArchiveObject>, CramflowError> {
        self.record(format!("query {run} {lane}"));
        Ok(self.state.lock().objects.clone())
    }

    async fn exists(&self, location: &str) -> Result<bool, CramflowError> {
        self.record(format!("exists {location}"));
        let state = self.state.lock();
        if state.unreachable.contains(location) {
            return Err(SubmissionError::new(
                "Check archive object",
                format!("ils {location}"),
                "exited with status 3",
                "connection refused",
            )
            .into());
        }
        Ok(!state.missing.contains(location))
    }

    async fn fetch_metadata(&self, location: &str) -> Result<String, CramflowError> {
        self.record(format!("metadata {location}"));
        Ok(self
            .state
            .lock()
            .metadata
            .get(location)
            .cloned()
            .unwrap_or_default())
    }

    fn fetch_command(&self, location: &str, destination: &Path) -> JobCommand {
        JobCommand::new(["fetch".to_string(), location.to_string(), destination.display().to_string()])
    }
}

#[derive(Debug, Default)]
struct SchedulerState {
    requests: Vec<JobRequest>,
    rejected: HashSet<String>,
    failing: HashSet<String>,
    unfinished: HashSet<String>,
}

/// Records submissions and writes scheduler-style logs for them straight away.
#[derive(Debug)]
pub struct RecordingScheduler {
    work_dir: PathBuf,
    state: Mutex<SchedulerState>,
}

impl RecordingScheduler {
    /// Creates a scheduler whose jobs run in `work_dir`.
    #[must_use]
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            state: Mutex::new(SchedulerState::default()),
        }
    }

    /// Every accepted request, in submission order.
    #[must_use]
    pub fn requests(&self) -> Vec<JobRequest> {
        self.state.lock().requests.clone()
    }

    /// Keys of every accepted request.
    #[must_use]
    pub fn submitted_keys(&self) -> Vec<String> {
        self.state.lock().requests.iter().map(|r| r.key.clone()).collect()
    }

    /// Refuses submissions for `key`.
    pub fn reject(&self, key: &str) {
        self.state.lock().rejected.insert(key.to_string());
    }

    /// Makes the job for `key` finish unsuccessfully.
    pub fn fail(&self, key: &str) {
        self.state.lock().failing.insert(key.to_string());
    }

    /// Makes the job for `key` start but never finish.
    pub fn never_finish(&self, key: &str) {
        self.state.lock().unfinished.insert(key.to_string());
    }
}

#[async_trait]
impl BatchScheduler for RecordingScheduler {
    async fn submit(&self, request: &JobRequest) -> Result<(), SubmissionError> {
        let log = {
            let mut state = self.state.lock();
            if state.rejected.contains(&request.key) {
                return Err(SubmissionError::new(
                    "Submit job",
                    request.command.render(),
                    "exited with status 255",
                    "Request aborted by esub. Job not submitted.",
                ));
            }
            state.requests.push(request.clone());
            if state.unfinished.contains(&request.key) {
                LOG_RUNNING
            } else if state.failing.contains(&request.key) {
                LOG_FAILED
            } else {
                LOG_SUCCEEDED
            }
        };

        let path = self.work_dir.join(&request.stdout_log);
        let write = async {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, log).await
        };
        write.await.map_err(|e| {
            SubmissionError::new("Write job log", path.display().to_string(), "failed", e.to_string())
        })
    }
}

/// Local tools that succeed unless told otherwise.
#[derive(Debug, Default)]
pub struct ScriptedTools {
    failing_quickcheck: Mutex<HashSet<PathBuf>>,
    failing_index: Mutex<HashSet<PathBuf>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTools {
    /// Creates tools that always succeed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes validation of `bam` fail.
    pub fn fail_quickcheck(&self, bam: impl Into<PathBuf>) {
        self.failing_quickcheck.lock().insert(bam.into());
    }

    /// Makes indexing of `bam` fail.
    pub fn fail_index(&self, bam: impl Into<PathBuf>) {
        self.failing_index.lock().insert(bam.into());
    }

    /// Every call made, as `"<tool> <path>"`.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl LocalTools for ScriptedTools {
    async fn quickcheck(&self, bam: PathBuf) -> JobOutcome {
        self.calls.lock().push(format!("quickcheck {}", bam.display()));
        JobOutcome::from_success(!self.failing_quickcheck.lock().contains(&bam))
    }

    async fn index(&self, bam: PathBuf) -> JobOutcome {
        self.calls.lock().push(format!("index {}", bam.display()));
        JobOutcome::from_success(!self.failing_index.lock().contains(&bam))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JobResources;
    use crate::monitor::JobMarkers;

    #[tokio::test]
    async fn test_scripted_log_reads_advance_then_repeat() {
        let source = MemoryLogSource::new();
        source.script("a.o", vec![None, Some("x"), Some("y")]);
        let path = Path::new("a.o");

        assert_eq!(source.read(path).await, None);
        assert_eq!(source.read(path).await.as_deref(), Some("x"));
        assert_eq!(source.read(path).await.as_deref(), Some("y"));
        assert_eq!(source.read(path).await.as_deref(), Some("y"));
        assert_eq!(source.read(Path::new("b.o")).await, None);
    }

    #[tokio::test]
    async fn test_manual_clock_advances_only_on_sleep() {
        let clock = ManualClock::new();
        assert_eq!(clock.elapsed(), Duration::ZERO);
        clock.sleep(Duration::from_secs(5)).await;
        clock.sleep(Duration::from_secs(5)).await;
        assert_eq!(clock.elapsed(), Duration::from_secs(10));
        assert_eq!(clock.sleeps(), 2);
    }

    #[test]
    fn test_canned_logs_classify_as_intended() {
        let markers = JobMarkers::default();
        assert_eq!(markers.classify(LOG_SUCCEEDED), Some(JobOutcome::Succeeded));
        assert_eq!(markers.classify(LOG_FAILED), Some(JobOutcome::Failed));
        assert_eq!(markers.classify(LOG_RUNNING), None);
    }

    #[tokio::test]
    async fn test_recording_scheduler_writes_logs() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = RecordingScheduler::new(dir.path());
        scheduler.fail("b");
        let request = |key: &str| {
            JobRequest::new(key, format!("logs/{key}"), JobResources::new(1, 1), JobCommand::new(["true"]))
        };

        scheduler.submit(&request("a")).await.unwrap();
        scheduler.submit(&request("b")).await.unwrap();

        let a = std::fs::read_to_string(dir.path().join("logs/a.o")).unwrap();
        let b = std::fs::read_to_string(dir.path().join("logs/b.o")).unwrap();
        assert!(a.contains("Successfully completed."));
        assert!(b.contains("Exited with exit code 1."));
        assert_eq!(scheduler.submitted_keys(), vec!["a", "b"]);
    }
}
