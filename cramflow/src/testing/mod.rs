//! Testing utilities for cramflow.
//!
//! This module provides:
//! - Scripted archive, scheduler and local tools that never leave the process
//! - A manual clock and in-memory job logs for the monitor
//! - [`TestHarness`], a temporary work directory wired to all of the above

mod fixtures;
mod mocks;

pub use fixtures::{metadata_text, TestHarness, TEST_LANE, TEST_RUN};
pub use mocks::{
    ManualClock, MemoryLogSource, RecordingScheduler, ScriptedArchive, ScriptedTools,
    LOG_FAILED, LOG_RUNNING, LOG_SUCCEEDED,
};
