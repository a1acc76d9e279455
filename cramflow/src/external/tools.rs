//! Command lines for the bioinformatics tools, and the locally run checks.

use super::runner::{CommandRunner, ProcessCommand};
use super::scheduler::JobCommand;
use crate::config::{AlignmentConfig, ToolsConfig};
use crate::core::JobOutcome;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Which aligner a category goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aligner {
    /// Splice-aware RNA alignment.
    Star,
    /// DNA alignment.
    Bwa,
}

impl Aligner {
    /// Picks the aligner for a category, if it is in either configured set.
    #[must_use]
    pub fn for_category(config: &AlignmentConfig, category: &str) -> Option<Self> {
        if config.star_categories.iter().any(|c| c == category) {
            Some(Self::Star)
        } else if config.bwa_categories.iter().any(|c| c == category) {
            Some(Self::Bwa)
        } else {
            None
        }
    }
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

/// Builds the batch command lines for each tool.
#[derive(Debug, Clone, Copy)]
pub struct ToolCommands<'a> {
    tools: &'a ToolsConfig,
}

impl<'a> ToolCommands<'a> {
    /// Wraps the configured tool locations.
    #[must_use]
    pub fn new(tools: &'a ToolsConfig) -> Self {
        Self { tools }
    }

    fn samtools(&self) -> String {
        path_arg(&self.tools.samtools)
    }

    /// Paired reads out of a CRAM; singletons and unpaired reads are dropped.
    #[must_use]
    pub fn extract(&self, cram: &Path, read_1: &Path, read_2: &Path) -> JobCommand {
        JobCommand::new([
            self.samtools(),
            "fastq".into(),
            "-c".into(),
            "7".into(),
            "-@".into(),
            "4".into(),
            "-1".into(),
            path_arg(read_1),
            "-2".into(),
            path_arg(read_2),
            "-0".into(),
            "/dev/null".into(),
            "-s".into(),
            "/dev/null".into(),
            "-n".into(),
            path_arg(cram),
        ])
    }

    /// STAR alignment streamed into a coordinate sort.
    #[must_use]
    pub fn star_align(
        &self,
        read_1: &Path,
        read_2: &Path,
        output_prefix: &Path,
        bam: &Path,
    ) -> JobCommand {
        JobCommand::new([
            path_arg(&self.tools.star),
            "--runThreadN".into(),
            "10".into(),
            "--outSAMattributes".into(),
            "NH".into(),
            "HI".into(),
            "NM".into(),
            "MD".into(),
            "--limitBAMsortRAM".into(),
            "31532137230".into(),
            "--outSAMtype".into(),
            "BAM".into(),
            "SortedByCoordinate".into(),
            "--genomeDir".into(),
            path_arg(&self.tools.star_genome_dir),
            "--readFilesCommand".into(),
            "zcat".into(),
            "--outFileNamePrefix".into(),
            path_arg(output_prefix),
            "--readFilesIn".into(),
            path_arg(read_1),
            path_arg(read_2),
            "--outStd".into(),
            "BAM_SortedByCoordinate".into(),
        ])
        .pipe(self.sort_into(bam))
    }

    /// BWA-MEM alignment streamed into a coordinate sort.
    #[must_use]
    pub fn bwa_align(&self, read_1: &Path, read_2: &Path, bam: &Path) -> JobCommand {
        JobCommand::new([
            path_arg(&self.tools.bwa),
            "mem".into(),
            "-t".into(),
            "10".into(),
            path_arg(&self.tools.bwa_reference),
            path_arg(read_1),
            path_arg(read_2),
        ])
        .pipe(self.sort_into(bam))
    }

    fn sort_into(&self, bam: &Path) -> Vec<String> {
        vec![
            self.samtools(),
            "sort".into(),
            "-@3".into(),
            "-l7".into(),
            "-o".into(),
            path_arg(bam),
        ]
    }

    /// Gene-level counts over all `bams` into one matrix.
    #[must_use]
    pub fn featurecounts(&self, matrix: &Path, bams: &[PathBuf]) -> JobCommand {
        let mut argv = vec![
            path_arg(&self.tools.featurecounts),
            "-Q".into(),
            "30".into(),
            "-p".into(),
            "-t".into(),
            "exon".into(),
            "-g".into(),
            "gene_name".into(),
            "-F".into(),
            "GTF".into(),
            "-a".into(),
            path_arg(&self.tools.annotation),
            "-o".into(),
            path_arg(matrix),
        ];
        argv.extend(bams.iter().map(|bam| path_arg(bam)));
        JobCommand::new(argv)
    }
}

/// Checks run directly on this host rather than through the scheduler.
#[async_trait]
pub trait LocalTools: Send + Sync {
    /// Verifies a BAM file is intact.
    async fn quickcheck(&self, bam: PathBuf) -> JobOutcome;

    /// Builds the index for a BAM file.
    async fn index(&self, bam: PathBuf) -> JobOutcome;
}

/// [`LocalTools`] backed by samtools.
#[derive(Clone)]
pub struct SamtoolsTools {
    runner: Arc<dyn CommandRunner>,
    samtools: PathBuf,
    work_dir: PathBuf,
}

impl SamtoolsTools {
    /// Runs `samtools` from `work_dir`.
    #[must_use]
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        samtools: impl Into<PathBuf>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            samtools: samtools.into(),
            work_dir: work_dir.into(),
        }
    }

    async fn run(&self, subcommand: &str, bam: PathBuf) -> JobOutcome {
        let command = ProcessCommand::new(path_arg(&self.samtools))
            .arg(subcommand)
            .arg(path_arg(&bam))
            .current_dir(&self.work_dir);
        match self.runner.run(command).await {
            Ok(output) if output.is_success() => JobOutcome::Succeeded,
            Ok(output) => {
                warn!(
                    bam = %bam.display(),
                    subcommand,
                    code = ?output.code,
                    output = %format!("{}{}", output.stdout, output.stderr).trim(),
                    "samtools reported a problem"
                );
                JobOutcome::Failed
            }
            Err(e) => {
                warn!(bam = %bam.display(), subcommand, error = %e, "samtools could not run");
                JobOutcome::Failed
            }
        }
    }
}

#[async_trait]
impl LocalTools for SamtoolsTools {
    async fn quickcheck(&self, bam: PathBuf) -> JobOutcome {
        self.run("quickcheck", bam).await
    }

    async fn index(&self, bam: PathBuf) -> JobOutcome {
        self.run("index", bam).await
    }
}

impl std::fmt::Debug for SamtoolsTools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamtoolsTools")
            .field("samtools", &self.samtools)
            .field("work_dir", &self.work_dir)
            .finish_non_exhaustive()
    }
}
