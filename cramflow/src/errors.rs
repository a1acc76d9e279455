//! Error types for the cramflow pipeline.
//!
//! Three classes of failure are kept apart:
//!
//! - submission-time errors: a local command that *requests* work failed
//!   ([`SubmissionError`]); always fatal, no checkpoint is written.
//! - job-outcome failures: a submitted job ran and reported failure. These are
//!   not errors at all; they are recorded per item as
//!   [`JobOutcome::Failed`](crate::core::JobOutcome::Failed).
//! - data-integrity errors ([`DataIntegrityError`]); always fatal.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for cramflow operations.
#[derive(Debug, Error)]
pub enum CramflowError {
    /// The configuration could not be loaded or is invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A local command requesting external work failed.
    #[error("{0}")]
    Submission(#[from] SubmissionError),

    /// The work-item data violates an invariant.
    #[error("{0}")]
    DataIntegrity(#[from] DataIntegrityError),

    /// A checkpoint could not be read or written.
    #[error("{0}")]
    Checkpoint(#[from] CheckpointError),

    /// The pipeline definition is inconsistent.
    #[error("{0}")]
    Validation(#[from] PipelineValidationError),

    /// The aggregate job reached a terminal state without succeeding.
    #[error("Aggregate job did not complete successfully, see {log}")]
    AggregateFailed {
        /// The job log of the failed aggregate job.
        log: PathBuf,
    },

    /// The job monitor gave up waiting because the configured deadline passed.
    #[error("Stage {stage} gave up waiting on {} job(s): {}", pending.len(), pending.join(", "))]
    MonitorDeadline {
        /// The stage that was waiting.
        stage: String,
        /// Keys of jobs that never reached a terminal state.
        pending: Vec<String>,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CramflowError {
    /// Returns the process exit code for this error.
    ///
    /// Each fatal condition the operator may need to tell apart gets its own code.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::Validation(_) => 2,
            Self::Submission(_) => 3,
            Self::DataIntegrity(err) => match err {
                DataIntegrityError::DuplicateLabel { .. } => 5,
                DataIntegrityError::EmptyDiscovery { .. } => 6,
                DataIntegrityError::EmptyAggregate => 7,
                _ => 4,
            },
            Self::AggregateFailed { .. } => 8,
            Self::Checkpoint(_) => 9,
            Self::MonitorDeadline { .. } => 10,
            Self::Io(_) => 1,
        }
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {}", path.display())]
    NotFound {
        /// The requested path.
        path: PathBuf,
    },

    /// The config file could not be read.
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        /// The config path.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        /// The config path.
        path: PathBuf,
        /// The underlying parse error.
        source: toml::de::Error,
    },

    /// A config value is invalid.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// A required invocation argument is missing or blank.
    #[error("Missing required argument: {0}")]
    MissingArgument(&'static str),
}

/// A local command that requests work could not be run or exited non-zero.
#[derive(Debug, Clone, Error)]
#[error("{action} failed: `{command}` {status}\n{output}")]
pub struct SubmissionError {
    /// What the command was trying to do.
    pub action: String,
    /// The rendered command line.
    pub command: String,
    /// Exit status description.
    pub status: String,
    /// Combined output captured from the command.
    pub output: String,
}

impl SubmissionError {
    /// Creates a new submission error.
    #[must_use]
    pub fn new(
        action: impl Into<String>,
        command: impl Into<String>,
        status: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            command: command.into(),
            status: status.into(),
            output: output.into(),
        }
    }
}

/// Violations of work-item invariants. All of these are fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataIntegrityError {
    /// A block of archive discovery output could not be understood.
    #[error("Malformed discovery output ({reason}): {block}")]
    MalformedDiscovery {
        /// Why the block was rejected.
        reason: String,
        /// The offending block.
        block: String,
    },

    /// The archive query returned no files.
    #[error("No archive data found for run {run}, lane {lane}")]
    EmptyDiscovery {
        /// The run id.
        run: String,
        /// The lane id.
        lane: String,
    },

    /// Two work items share an id.
    #[error("Duplicate work item id: {0}")]
    DuplicateItem(String),

    /// No item carries a category after metadata parsing.
    #[error("No category information found for any item")]
    NoCategories,

    /// Two items in the same category carry the same label.
    #[error(
        "Duplicate label '{label}' in category '{category}', check the configured label attribute"
    )]
    DuplicateLabel {
        /// The shared category.
        category: String,
        /// The repeated label.
        label: String,
    },

    /// A category link already exists but points at another item's reads.
    #[error("Link {link} points to {existing}, expected {expected}")]
    LinkConflict {
        /// The link path.
        link: String,
        /// Where the existing link points.
        existing: String,
        /// Where this item needs it to point.
        expected: String,
    },

    /// No validated item belongs to the aggregate category set.
    #[error("No validated items in the aggregate category set, nothing to aggregate")]
    EmptyAggregate,
}

/// Errors reading or writing stage checkpoints.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// Writing a checkpoint failed.
    #[error("Failed to write checkpoint for stage {stage} at {}: {source}", path.display())]
    Write {
        /// The stage index.
        stage: usize,
        /// The target path.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Reading a checkpoint failed.
    #[error("Failed to read checkpoint for stage {stage} at {}: {source}", path.display())]
    Read {
        /// The stage index.
        stage: usize,
        /// The source path.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// A checkpoint could not be encoded or decoded.
    #[error("Checkpoint for stage {stage} is not valid JSON: {message}")]
    Serialization {
        /// The stage index.
        stage: usize,
        /// The serializer message.
        message: String,
    },

    /// The checkpoint contents do not match their recorded digest.
    #[error("Checkpoint for stage {stage} is corrupt: digest mismatch")]
    DigestMismatch {
        /// The stage index.
        stage: usize,
    },

    /// The checkpoint file belongs to another stage.
    #[error("Checkpoint file for stage {expected} records stage {found}")]
    StageMismatch {
        /// The stage index requested.
        expected: usize,
        /// The stage index found in the file.
        found: usize,
    },

    /// `exists` reported a checkpoint that `load` could not find.
    #[error("Checkpoint for stage {0} disappeared while resuming")]
    Missing(usize),
}

/// Error raised when a pipeline definition is invalid.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
}

impl PipelineValidationError {
    /// Creates a new pipeline validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }
}

/// Convenience result alias.
pub type Result<T, E = CramflowError> = std::result::Result<T, E>;
