//! The per-file state record.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One archived sequence file and everything the pipeline has learned about it.
///
/// Fields are populated monotonically: a stage sets the fields it owns and
/// never clears a field written by an earlier stage. Every `ready_for_*`
/// predicate excludes control items, whatever else the record says.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Archived file name; unique across the collection.
    pub id: String,
    /// Archive collection holding the file.
    pub collection: String,
    /// Sequencing lane parsed from the file name.
    pub lane: String,
    /// Full archive locator of the file.
    pub source_location: String,
    /// Set by discovery once the archive confirms the file exists.
    pub exists_remote: bool,
    /// Spike-in control; never processed past discovery.
    pub is_control: bool,

    /// Where the download job writes the file.
    pub local_path: Option<PathBuf>,
    /// Download job succeeded.
    pub download_success: bool,

    /// Where the fetched metadata text is stored.
    pub metadata_path: Option<PathBuf>,
    /// Metadata text was fetched.
    pub metadata_fetched: bool,
    /// A label was parsed from the metadata.
    pub metadata_parsed: bool,
    /// Classification driving the downstream tool choice (library type).
    pub category: Option<String>,
    /// Item label (sample name), unique within a category.
    pub label: Option<String>,

    /// First extracted read file.
    pub extracted_path_1: Option<PathBuf>,
    /// Second extracted read file.
    pub extracted_path_2: Option<PathBuf>,
    /// Extraction job succeeded.
    pub extraction_success: bool,

    /// First read file linked into the per-category layout.
    pub linked_path_1: Option<PathBuf>,
    /// Second read file linked into the per-category layout.
    pub linked_path_2: Option<PathBuf>,

    /// Realigned output file.
    pub aligned_path: Option<PathBuf>,
    /// Alignment job succeeded.
    pub alignment_success: bool,
    /// Realigned output passed validation.
    pub validation_success: bool,
    /// Realigned output was indexed.
    pub index_success: bool,
}

impl WorkItem {
    /// Creates a freshly discovered item.
    #[must_use]
    pub fn discovered(
        id: impl Into<String>,
        collection: impl Into<String>,
        lane: impl Into<String>,
        is_control: bool,
    ) -> Self {
        let id = id.into();
        let collection = collection.into();
        let source_location = format!("{}/{}", collection.trim_end_matches('/'), id);
        Self {
            id,
            collection,
            lane: lane.into(),
            source_location,
            is_control,
            ..Self::default()
        }
    }

    /// File name without its `.cram` extension.
    #[must_use]
    pub fn file_stem(&self) -> &str {
        self.id.strip_suffix(".cram").unwrap_or(&self.id)
    }

    /// Category with spaces replaced, suitable for a directory name.
    #[must_use]
    pub fn category_dir(&self) -> Option<String> {
        self.category
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(|c| c.replace(' ', "_"))
    }

    /// Returns true if the item has a non-empty category.
    #[must_use]
    pub fn has_category(&self) -> bool {
        self.category.as_deref().is_some_and(|c| !c.is_empty())
    }

    /// Returns true if the item takes part in processing after discovery.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.is_control
    }

    /// Stage 1 gate.
    #[must_use]
    pub fn ready_for_download(&self) -> bool {
        self.is_active() && self.exists_remote
    }

    /// Stage 2 gate.
    #[must_use]
    pub fn ready_for_metadata(&self) -> bool {
        self.is_active() && self.download_success
    }

    /// Stage 3 gate.
    #[must_use]
    pub fn ready_for_extraction(&self) -> bool {
        self.is_active() && self.metadata_parsed
    }

    /// Stage 4 gate.
    #[must_use]
    pub fn ready_for_linking(&self) -> bool {
        self.is_active() && self.extraction_success && self.has_category() && self.label.is_some()
    }

    /// Stage 5 gate.
    #[must_use]
    pub fn ready_for_alignment(&self) -> bool {
        self.is_active() && self.linked_path_1.is_some() && self.linked_path_2.is_some()
    }

    /// Stage 6 gate.
    #[must_use]
    pub fn ready_for_validation(&self) -> bool {
        self.is_active() && self.alignment_success && self.aligned_path.is_some()
    }

    /// Stage 7 gate.
    #[must_use]
    pub fn ready_for_indexing(&self) -> bool {
        self.is_active() && self.validation_success
    }

    /// Stage 8 gate: validated and in the given category set.
    #[must_use]
    pub fn ready_for_aggregate(&self, categories: &[String]) -> bool {
        self.is_active()
            && self.validation_success
            && self.aligned_path.is_some()
            && self
                .category
                .as_ref()
                .is_some_and(|c| categories.contains(c))
    }
}
