//! Pipeline configuration.
//!
//! Every value has a built-in default; a TOML file may override any subset.
//! Lookup order is an explicit `--config` path, then `./cramflow.toml`, then
//! `<user config dir>/cramflow/cramflow.toml`.

mod loader;

pub use loader::{discover_config_path, load_config, EXAMPLE_CONFIG, CONFIG_FILE_NAME};

use crate::errors::ConfigError;
use crate::monitor::JobMarkers;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Which metadata attributes hold the category and label.
    pub metadata: MetadataConfig,
    /// Which categories go to which aligner.
    pub alignment: AlignmentConfig,
    /// External tool and reference locations.
    pub tools: ToolsConfig,
    /// Job log polling.
    pub monitor: MonitorConfig,
    /// Archive discovery rules.
    pub archive: ArchiveConfig,
    /// Batch job resource requests.
    pub resources: ResourcesConfig,
}

impl PipelineConfig {
    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metadata.label_attribute.trim().is_empty() {
            return Err(ConfigError::Invalid("metadata.label_attribute is empty".into()));
        }
        if self.metadata.category_attribute.trim().is_empty() {
            return Err(ConfigError::Invalid("metadata.category_attribute is empty".into()));
        }
        if let Some(shared) = self
            .alignment
            .star_categories
            .iter()
            .find(|c| self.alignment.bwa_categories.contains(c))
        {
            return Err(ConfigError::Invalid(format!(
                "category '{shared}' is assigned to both aligners"
            )));
        }
        if self.monitor.poll_interval.is_zero() {
            return Err(ConfigError::Invalid("monitor.poll_interval must be non-zero".into()));
        }
        Ok(())
    }
}

/// Metadata attribute names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetadataConfig {
    /// Attribute providing an item's category.
    pub category_attribute: String,
    /// Attribute providing an item's label.
    pub label_attribute: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            category_attribute: "library_type".to_string(),
            label_attribute: "sample_supplier_name".to_string(),
        }
    }
}

/// Category-to-aligner assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlignmentConfig {
    /// Categories aligned with STAR. These also feed the aggregate stage.
    pub star_categories: Vec<String>,
    /// Categories aligned with BWA.
    pub bwa_categories: Vec<String>,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            star_categories: vec!["GnT scRNA".to_string()],
            bwa_categories: vec!["GnT Picoplex".to_string()],
        }
    }
}

/// Tool executables and reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    /// samtools executable.
    pub samtools: PathBuf,
    /// STAR executable.
    pub star: PathBuf,
    /// STAR genome index directory.
    pub star_genome_dir: PathBuf,
    /// BWA executable.
    pub bwa: PathBuf,
    /// BWA reference FASTA.
    pub bwa_reference: PathBuf,
    /// featureCounts executable.
    pub featurecounts: PathBuf,
    /// Gene annotation GTF used by featureCounts.
    pub annotation: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            samtools: "/software/CASM/modules/installs/samtools/samtools-1.11/bin/samtools".into(),
            star: "/nfs/users/nfs_r/rr11/Tools/STAR-2.5.2a/bin/Linux_x86_64_static/STAR".into(),
            star_genome_dir:
                "/lustre/scratch119/casm/team78pipelines/reference/human/GRCh37d5_ERCC92/star/75/"
                    .into(),
            bwa: "/software/CASM/modules/installs/bwa/bwa-0.7.17/bin/bwa".into(),
            bwa_reference:
                "/lustre/scratch119/casm/team78pipelines/reference/human/GRCH37d5/genome.fa".into(),
            featurecounts:
                "/nfs/users/nfs_s/sl31/Tools/subread-2.0.1-Linux-x86_64/bin/featureCounts".into(),
            annotation: "/lustre/scratch119/realdata/mdt1/team78pipelines/canpipe/live/ref/Homo_sapiens/GRCH37d5/star/e75/ensembl.gtf".into(),
        }
    }
}

/// Job monitor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    /// Pause between sweeps over pending job logs.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Give up on a stage's jobs after this long. Unset means wait forever.
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub deadline: Option<Duration>,
    /// Log substring marking a finished job.
    pub terminal_marker: String,
    /// Log substring marking a successful job.
    pub success_marker: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let markers = JobMarkers::default();
        Self {
            poll_interval: Duration::from_secs(5),
            deadline: None,
            terminal_marker: markers.terminal,
            success_marker: markers.success,
        }
    }
}

impl MonitorConfig {
    /// Returns the configured log markers.
    #[must_use]
    pub fn markers(&self) -> JobMarkers {
        JobMarkers::new(&self.terminal_marker, &self.success_marker)
    }
}

/// Archive discovery rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
    /// Every discovered collection must start with this prefix.
    pub collection_prefix: String,
    /// A file whose `_`-separated name contains this part is a control.
    pub control_marker: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            collection_prefix: "/seq/".to_string(),
            control_marker: "phix.cram".to_string(),
        }
    }
}

/// Memory and core requests for one kind of batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobResources {
    /// Memory in megabytes.
    pub memory_mb: u32,
    /// CPU cores.
    pub cores: u32,
}

impl JobResources {
    /// Creates a resource request.
    #[must_use]
    pub const fn new(memory_mb: u32, cores: u32) -> Self {
        Self { memory_mb, cores }
    }
}

/// Resource requests per job kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourcesConfig {
    /// Archive fetch jobs.
    pub fetch: JobResources,
    /// Read extraction jobs.
    pub extract: JobResources,
    /// Alignment jobs.
    pub align: JobResources,
    /// The aggregate counting job.
    pub aggregate: JobResources,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            fetch: JobResources::new(2000, 1),
            extract: JobResources::new(2000, 4),
            align: JobResources::new(50000, 10),
            aggregate: JobResources::new(20000, 14),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.metadata.label_attribute, "sample_supplier_name");
        assert_eq!(config.monitor.poll_interval, Duration::from_secs(5));
        assert_eq!(config.monitor.deadline, None);
        assert_eq!(config.monitor.markers(), JobMarkers::default());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
            [metadata]
            label_attribute = "sample"

            [monitor]
            poll_interval = "30s"
            deadline = "2h"
            "#,
        )
        .unwrap();

        assert_eq!(config.metadata.label_attribute, "sample");
        assert_eq!(config.metadata.category_attribute, "library_type");
        assert_eq!(config.monitor.poll_interval, Duration::from_secs(30));
        assert_eq!(config.monitor.deadline, Some(Duration::from_secs(7200)));
        assert_eq!(config.alignment, AlignmentConfig::default());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(toml::from_str::<PipelineConfig>("[tools]\nsamtool = \"x\"").is_err());
    }

    #[test]
    fn test_overlapping_categories_are_invalid() {
        let mut config = PipelineConfig::default();
        config.alignment.bwa_categories.push("GnT scRNA".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("both aligners"));
    }

    #[test]
    fn test_blank_label_attribute_is_invalid() {
        let mut config = PipelineConfig::default();
        config.metadata.label_attribute = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialize_round_trip() {
        let config = PipelineConfig::default();
        let text = toml::to_string(&config).unwrap();
        let restored: PipelineConfig = toml::from_str(&text).unwrap();
        assert_eq!(restored, config);
    }
}
