//! The sequence archive: discovery, existence checks, metadata and fetching.

use super::runner::{CommandRunner, ProcessCommand, ProcessOutput};
use super::scheduler::JobCommand;
use crate::config::ArchiveConfig;
use crate::errors::{CramflowError, DataIntegrityError};
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Block separator used by the archive's text output.
const BLOCK_SEPARATOR: &str = "----";

/// Query output meaning no objects matched.
const NO_ROWS: &str = "No rows found";

/// One archived file found by discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveObject {
    /// Collection holding the file.
    pub collection: String,
    /// File name.
    pub name: String,
}

impl ArchiveObject {
    /// Lane number: the part of the name between the first `_` and the next `#`.
    pub fn lane(&self) -> Result<String, DataIntegrityError> {
        let after_run = self.name.split('_').nth(1).ok_or_else(|| {
            DataIntegrityError::MalformedDiscovery {
                reason: "file name has no lane part".into(),
                block: self.name.clone(),
            }
        })?;
        let lane = after_run.split('#').next().unwrap_or(after_run).trim();
        Ok(lane.to_string())
    }

    /// Returns true if any `_`-separated part of the name equals `marker`.
    #[must_use]
    pub fn is_control(&self, marker: &str) -> bool {
        self.name.split('_').any(|part| part == marker)
    }
}

/// Parses archive query output into objects.
///
/// Output is a sequence of `----`-separated blocks, each holding a
/// `collection:` and a `dataObj:` line. Any block that does not fit is an
/// error; the whole output is rejected.
pub fn parse_query_output(
    output: &str,
    config: &ArchiveConfig,
) -> Result<Vec<ArchiveObject>, DataIntegrityError> {
    if output.trim() == NO_ROWS {
        return Ok(Vec::new());
    }

    let mut objects = Vec::new();
    for block in output.split(BLOCK_SEPARATOR) {
        if block.trim().is_empty() {
            continue;
        }
        let malformed = |reason: &str| DataIntegrityError::MalformedDiscovery {
            reason: reason.to_string(),
            block: block.trim().to_string(),
        };

        let mut collection = None;
        let mut name = None;
        for line in block.lines() {
            if let Some(value) = line.strip_prefix("collection:") {
                let value = value.trim();
                if !value.starts_with(&config.collection_prefix) {
                    return Err(malformed("unexpected collection"));
                }
                collection = Some(value.to_string());
            } else if let Some(value) = line.strip_prefix("dataObj:") {
                let value = value.trim();
                if !value.ends_with(".cram") {
                    return Err(malformed("not a cram file"));
                }
                name = Some(value.replace(':', ""));
            }
        }

        match (collection, name) {
            (Some(collection), Some(name)) if !collection.is_empty() && !name.is_empty() => {
                objects.push(ArchiveObject { collection, name });
            }
            _ => return Err(malformed("missing collection or file name")),
        }
    }
    Ok(objects)
}

fn avu_line() -> Option<&'static Regex> {
    static AVU_LINE: OnceLock<Option<Regex>> = OnceLock::new();
    AVU_LINE
        .get_or_init(|| Regex::new(r"^\s*(attribute|value|units):\s?(.*)$").ok())
        .as_ref()
}

/// Returns the value of the first metadata block whose attribute is `attribute`.
///
/// Metadata text is a sequence of `----`-separated blocks of `attribute:`,
/// `value:` and `units:` lines. Blank values count as absent.
#[must_use]
pub fn attribute_value(metadata: &str, attribute: &str) -> Option<String> {
    let pattern = avu_line()?;
    metadata.split(BLOCK_SEPARATOR).find_map(|block| {
        let mut name = None;
        let mut value = None;
        for line in block.lines() {
            let Some(caps) = pattern.captures(line) else {
                continue;
            };
            let text = caps.get(2).map_or("", |m| m.as_str()).trim();
            match caps.get(1).map_or("", |m| m.as_str()) {
                "attribute" => name = Some(text),
                "value" if value.is_none() => value = Some(text),
                _ => {}
            }
        }
        match (name, value) {
            (Some(name), Some(value)) if name == attribute && !value.is_empty() => {
                Some(value.to_string())
            }
            _ => None,
        }
    })
}

/// Returns true if failed icommand output says the object is absent,
/// as opposed to the command failing for another reason.
fn reports_missing_object(output: &ProcessOutput) -> bool {
    [&output.stderr, &output.stdout].iter().any(|text| {
        text.contains("does not exist") || text.contains("USER_FILE_DOES_NOT_EXIST")
    })
}

/// Access to the sequence archive.
#[async_trait]
pub trait ArchiveClient: Send + Sync {
    /// Lists the sequence files recorded for a run and lane.
    async fn query(&self, run: &str, lane: &str) -> Result<Vec<ArchiveObject>, CramflowError>;

    /// Returns true if an object exists at `location`.
    ///
    /// `Err` means the check itself could not be made.
    async fn exists(&self, location: &str) -> Result<bool, CramflowError>;

    /// Returns the raw metadata text of the object at `location`.
    async fn fetch_metadata(&self, location: &str) -> Result<String, CramflowError>;

    /// Builds the batch command that copies `location` to `destination`.
    fn fetch_command(&self, location: &str, destination: &Path) -> JobCommand;
}

/// The iRODS archive, driven through the icommands.
#[derive(Clone)]
pub struct IrodsArchive {
    runner: Arc<dyn CommandRunner>,
    config: ArchiveConfig,
}

impl IrodsArchive {
    /// Creates an archive client.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>, config: ArchiveConfig) -> Self {
        Self { runner, config }
    }

    fn query_command(run: &str, lane: &str) -> ProcessCommand {
        ProcessCommand::new("imeta").args([
            "qu", "-z", "seq", "-d", "id_run", "=", run, "and", "lane", "=", lane, "and", "type",
            "=", "cram",
        ])
    }
}

#[async_trait]
impl ArchiveClient for IrodsArchive {
    async fn query(&self, run: &str, lane: &str) -> Result<Vec<ArchiveObject>, CramflowError> {
        let command = Self::query_command(run, lane);
        let output = self.runner.run(command.clone()).await?;
        // imeta reports an empty result on stdout with a zero exit
        let output = output.check("Query archive", &command)?;
        let objects = parse_query_output(&output.stdout, &self.config)?;
        debug!(run, lane, found = objects.len(), "Archive query finished");
        Ok(objects)
    }

    async fn exists(&self, location: &str) -> Result<bool, CramflowError> {
        let command = ProcessCommand::new("ils").arg(location);
        let output = self.runner.run(command.clone()).await?;
        if !output.is_success() && reports_missing_object(&output) {
            debug!(location, "Archive object not found");
            return Ok(false);
        }
        output.check("Check archive object", &command)?;
        Ok(true)
    }

    async fn fetch_metadata(&self, location: &str) -> Result<String, CramflowError> {
        let command = ProcessCommand::new("imeta").args(["ls", "-d", location]);
        let output = self.runner.run(command.clone()).await?;
        Ok(output.check("Fetch archive metadata", &command)?.stdout)
    }

    fn fetch_command(&self, location: &str, destination: &Path) -> JobCommand {
        JobCommand::new(["iget", "-K", location, &destination.display().to_string()])
    }
}

impl std::fmt::Debug for IrodsArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IrodsArchive")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
