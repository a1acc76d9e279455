//! Stage identity and job outcome enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The nine pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// Query the archive and verify each file exists.
    Discover,
    /// Fetch each file from the archive.
    Download,
    /// Fetch and parse per-file metadata.
    Metadata,
    /// Extract paired reads from each file.
    Extract,
    /// Link extracted reads into a per-category layout.
    Link,
    /// Realign reads with the tool chosen by category.
    Align,
    /// Validate realigned output.
    Validate,
    /// Index validated output.
    Index,
    /// Aggregate counts over the qualifying outputs.
    Aggregate,
}

impl StageId {
    /// All stages in execution order.
    pub const ALL: [Self; 9] = [
        Self::Discover,
        Self::Download,
        Self::Metadata,
        Self::Extract,
        Self::Link,
        Self::Align,
        Self::Validate,
        Self::Index,
        Self::Aggregate,
    ];

    /// Returns the zero-based stage index.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Returns the stage for an index, if any.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Discover => "discover",
            Self::Download => "download",
            Self::Metadata => "metadata",
            Self::Extract => "extract",
            Self::Link => "link",
            Self::Align => "align",
            Self::Validate => "validate",
            Self::Index => "index",
            Self::Aggregate => "aggregate",
        }
    }

    /// Returns the output directory for this stage, relative to the work directory.
    ///
    /// Discovery writes nothing but its checkpoint.
    #[must_use]
    pub fn output_dir(self) -> Option<&'static str> {
        match self {
            Self::Discover => None,
            Self::Download => Some("1_archive_downloads"),
            Self::Metadata => Some("2_metadata"),
            Self::Extract => Some("3_fastq_extraction"),
            Self::Link => Some("4_split_by_category"),
            Self::Align => Some("5_realignments"),
            Self::Validate => Some("6_validation"),
            Self::Index => Some("7_indexing"),
            Self::Aggregate => Some("8_counts_matrix"),
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.index(), self.name())
    }
}

/// Terminal result of one external job or fan-out task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    /// The job finished and reported success.
    Succeeded,
    /// The job finished without reporting success.
    Failed,
}

impl JobOutcome {
    /// Builds an outcome from a success flag.
    #[must_use]
    pub fn from_success(success: bool) -> Self {
        if success {
            Self::Succeeded
        } else {
            Self::Failed
        }
    }

    /// Returns true if the job succeeded.
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_indices_are_contiguous() {
        for (expected, stage) in StageId::ALL.iter().enumerate() {
            assert_eq!(stage.index(), expected);
            assert_eq!(StageId::from_index(expected), Some(*stage));
        }
        assert_eq!(StageId::from_index(9), None);
    }

    #[test]
    fn test_output_dirs_are_prefixed_by_index() {
        for stage in StageId::ALL.iter().skip(1) {
            let dir = stage.output_dir().unwrap();
            assert!(dir.starts_with(&stage.index().to_string()));
        }
        assert!(StageId::Discover.output_dir().is_none());
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(StageId::Align.to_string(), "5 (align)");
    }

    #[test]
    fn test_job_outcome_serialize() {
        let json = serde_json::to_string(&JobOutcome::Failed).unwrap();
        assert_eq!(json, r#""failed""#);
        assert!(JobOutcome::from_success(true).is_success());
        assert!(!JobOutcome::from_success(false).is_success());
    }
}
