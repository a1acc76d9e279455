//! Reading job logs.

use async_trait::async_trait;
use std::path::Path;

/// Somewhere job logs can be read from.
#[async_trait]
pub trait JobLogSource: Send + Sync {
    /// Reads a job log. `None` means the log is not readable yet.
    async fn read(&self, locator: &Path) -> Option<String>;
}

/// Reads job logs from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLogSource;

#[async_trait]
impl JobLogSource for FsLogSource {
    async fn read(&self, locator: &Path) -> Option<String> {
        let bytes = tokio::fs::read(locator).await.ok()?;
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fs_source_missing_log_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(FsLogSource.read(&dir.path().join("job.o")).await, None);
    }

    #[tokio::test]
    async fn test_fs_source_reads_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.o");
        std::fs::write(&path, "Terminated at").unwrap();
        assert_eq!(FsLogSource.read(&path).await.as_deref(), Some("Terminated at"));
    }
}
