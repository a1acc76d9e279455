//! Pipeline execution.
//!
//! - [`StageContext`]: the shared inputs every stage sees
//! - [`StageDriver`]: runs one stage, resuming from its checkpoint when present
//! - [`Pipeline`] and [`PipelineBuilder`]: the ordered controller
//! - [`run_barrier`]: concurrent local tasks behind a join barrier
//! - [`PipelineStatus`]: a progress summary read back from checkpoints

mod builder;
mod context;
mod driver;
mod fanout;
mod status;

pub use builder::{Pipeline, PipelineBuilder};
pub use context::StageContext;
pub use driver::{StageDriver, StageRun};
pub use fanout::run_barrier;
pub use status::{FlagCounts, PipelineStatus};
