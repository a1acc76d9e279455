//! Config file discovery and loading.

use super::PipelineConfig;
use crate::errors::ConfigError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name searched for in the working directory and the user config dir.
pub const CONFIG_FILE_NAME: &str = "cramflow.toml";

/// Fully commented example configuration, printed by `cramflow example-config`.
pub const EXAMPLE_CONFIG: &str = r#"# cramflow configuration
#
# Every key is optional. Missing keys keep their built-in default.

[metadata]
# Archive metadata attribute holding the library type. Selects the aligner.
category_attribute = "library_type"
# Attribute used to name output files. Must be unique within a library type.
label_attribute = "sample_supplier_name"

[alignment]
# Library types aligned with STAR. Only these feed the counts matrix.
star_categories = ["GnT scRNA"]
# Library types aligned with BWA.
bwa_categories = ["GnT Picoplex"]

[tools]
samtools = "/software/CASM/modules/installs/samtools/samtools-1.11/bin/samtools"
star = "/nfs/users/nfs_r/rr11/Tools/STAR-2.5.2a/bin/Linux_x86_64_static/STAR"
star_genome_dir = "/lustre/scratch119/casm/team78pipelines/reference/human/GRCh37d5_ERCC92/star/75/"
bwa = "/software/CASM/modules/installs/bwa/bwa-0.7.17/bin/bwa"
bwa_reference = "/lustre/scratch119/casm/team78pipelines/reference/human/GRCH37d5/genome.fa"
featurecounts = "/nfs/users/nfs_s/sl31/Tools/subread-2.0.1-Linux-x86_64/bin/featureCounts"
annotation = "/lustre/scratch119/realdata/mdt1/team78pipelines/canpipe/live/ref/Homo_sapiens/GRCH37d5/star/e75/ensembl.gtf"

[monitor]
# Pause between sweeps over job logs.
poll_interval = "5s"
# Give up on a stage's jobs after this long. Leave unset to wait forever.
# deadline = "48h"
terminal_marker = "Terminated at"
success_marker = "Successfully completed."

[archive]
collection_prefix = "/seq/"
# Files whose underscore-separated name contains this part are controls.
control_marker = "phix.cram"

# Memory (MB) and cores requested from the batch scheduler per job kind.
[resources]
fetch = { memory_mb = 2000, cores = 1 }
extract = { memory_mb = 2000, cores = 4 }
align = { memory_mb = 50000, cores = 10 }
aggregate = { memory_mb = 20000, cores = 14 }
"#;

/// Finds the config file to use when none is given explicitly.
///
/// Checks `<cwd>/cramflow.toml`, then `<config dir>/cramflow/cramflow.toml`.
#[must_use]
pub fn discover_config_path(cwd: &Path) -> Option<PathBuf> {
    let local = cwd.join(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|dir| dir.join("cramflow").join(CONFIG_FILE_NAME))
        .filter(|path| path.is_file())
}

/// Loads and validates the configuration.
///
/// An explicit path must exist. Without one, the discovered file is used if
/// any, otherwise the defaults.
pub fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<PipelineConfig, ConfigError> {
    let path = match explicit {
        Some(path) if !path.is_file() => {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            })
        }
        Some(path) => Some(path.to_path_buf()),
        None => discover_config_path(cwd),
    };

    let config = match path {
        Some(path) => {
            let config = parse_file(&path)?;
            info!(path = %path.display(), "Loaded configuration");
            config
        }
        None => {
            debug!("No config file found, using defaults");
            PipelineConfig::default()
        }
    };

    config.validate()?;
    Ok(config)
}

fn parse_file(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
