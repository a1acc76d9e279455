//! # Cramflow
//!
//! A checkpoint-resumable batch pipeline that takes the archived CRAM files of
//! one sequencing run and lane through fetching, metadata lookup, read
//! extraction, realignment, validation, indexing and gene counting.
//!
//! Cramflow provides:
//!
//! - **Stage-based execution**: nine stages run strictly in order over one
//!   [`WorkCollection`](core::WorkCollection)
//! - **Resumption**: each finished stage writes a checksummed checkpoint, and
//!   a rerun skips every stage whose checkpoint exists
//! - **Batch job monitoring**: submitted jobs are tracked through their
//!   scheduler logs until each one reports a terminal state
//! - **Event-driven observability**: lifecycle events and `tracing` spans
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cramflow::prelude::*;
//! use std::sync::Arc;
//!
//! let config = load_config(None, &std::env::current_dir()?)?;
//! let ctx = StageContext::new(config.clone(), "35000", "2", "/scratch/35000_2")?;
//! let monitor = JobMonitor::new(Arc::new(FsLogSource), Arc::new(TokioClock::new()))
//!     .with_markers(config.monitor.markers())
//!     .with_poll_interval(config.monitor.poll_interval);
//! let driver = StageDriver::new(Arc::new(FileCheckpointStore::new("/scratch/35000_2")), monitor);
//!
//! let items = Pipeline::standard().run(&ctx, &driver).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod checkpoint;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod external;
pub mod monitor;
pub mod observability;
pub mod pipeline;
pub mod stages;

#[cfg(test)]
pub(crate) mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::checkpoint::{CheckpointStore, FileCheckpointStore, InMemoryCheckpointStore};
    pub use crate::config::{load_config, PipelineConfig};
    pub use crate::core::{JobOutcome, StageId, WorkCollection, WorkItem};
    pub use crate::errors::{CramflowError, DataIntegrityError, Result};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::monitor::{FsLogSource, JobMonitor, MonitorOutcome, TokioClock};
    pub use crate::pipeline::{Pipeline, PipelineBuilder, StageContext, StageDriver};
    pub use crate::stages::{Dispatch, Stage};
}
