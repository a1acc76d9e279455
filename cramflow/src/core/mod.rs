//! Core types for the cramflow pipeline.
//!
//! This module contains:
//! - [`WorkItem`]: the per-file state record
//! - [`WorkCollection`]: the ordered, id-unique set of work items
//! - [`StageId`] and [`JobOutcome`]: stage identity and job results

mod collection;
mod status;
mod work_item;

pub use collection::WorkCollection;
pub use status::{JobOutcome, StageId};
pub use work_item::WorkItem;
