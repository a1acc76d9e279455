//! Collaborators outside the process: the archive, the batch scheduler and
//! the locally run tools.
//!
//! Each collaborator sits behind a trait so stages can be driven by scripted
//! implementations in tests. The production implementations shell out through
//! a [`CommandRunner`].

mod archive;
mod runner;
mod scheduler;
mod tools;

pub use archive::{attribute_value, parse_query_output, ArchiveClient, ArchiveObject, IrodsArchive};
pub use runner::{CommandRunner, ProcessCommand, ProcessOutput, TokioCommandRunner};
pub use scheduler::{BatchScheduler, JobCommand, JobRequest, LsfScheduler};
pub use tools::{Aligner, LocalTools, SamtoolsTools, ToolCommands};

#[cfg(test)]
pub use runner::MockCommandRunner;
