use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use cramflow::checkpoint::FileCheckpointStore;
use cramflow::config::{load_config, EXAMPLE_CONFIG};
use cramflow::errors::CramflowError;
use cramflow::monitor::{FsLogSource, JobMonitor, TokioClock};
use cramflow::observability::{init_logging, LogFormat};
use cramflow::pipeline::{FlagCounts, Pipeline, PipelineStatus, StageContext, StageDriver};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Turn the archived CRAM files of one run and lane into realigned, counted BAMs
#[derive(Parser)]
#[command(name = "cramflow", version)]
#[command(about = "Checkpoint-resumable realignment pipeline for archived CRAM files", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log line format: text or json
    #[arg(long, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline, resuming after the last checkpointed stage
    Run(RunArgs),
    /// Show which stages have checkpoints and what the latest one holds
    Status {
        /// Directory holding the checkpoint files
        #[arg(long, default_value = ".")]
        checkpoint_dir: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a fully commented example config file
    ExampleConfig,
}

#[derive(Args)]
struct RunArgs {
    /// Sequencing run id
    #[arg(short, long)]
    run: String,

    /// Lane number
    #[arg(short, long)]
    lane: String,

    /// Directory all stage outputs are written under (default: current directory)
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Directory for checkpoint files (default: the work directory)
    #[arg(long)]
    checkpoint_dir: Option<PathBuf>,

    /// Path to the configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);
    debug!("cramflow started with verbosity level: {}", cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => run_pipeline(args).await,
        Commands::Status {
            checkpoint_dir,
            json,
        } => show_status(&checkpoint_dir, json).await,
        Commands::ExampleConfig => {
            print!("{EXAMPLE_CONFIG}");
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = e
                .downcast_ref::<CramflowError>()
                .map_or(1, CramflowError::exit_code);
            error!(exit_code = code, "Fatal error: {e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::from(code)
        }
    }
}

fn absolute(cwd: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}

async fn run_pipeline(args: RunArgs) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("Cannot determine the current directory")?;
    let config = load_config(args.config.as_deref(), &cwd).map_err(CramflowError::from)?;

    let work_dir = absolute(&cwd, args.work_dir.unwrap_or_else(|| cwd.clone()));
    let checkpoint_dir = args
        .checkpoint_dir
        .map_or_else(|| work_dir.clone(), |dir| absolute(&cwd, dir));
    tokio::fs::create_dir_all(&work_dir)
        .await
        .map_err(CramflowError::from)?;

    let ctx = StageContext::new(config.clone(), args.run, args.lane, &work_dir)?;
    let monitor = JobMonitor::new(Arc::new(FsLogSource), Arc::new(TokioClock::new()))
        .with_markers(config.monitor.markers())
        .with_poll_interval(config.monitor.poll_interval)
        .with_deadline(config.monitor.deadline)
        .with_events(ctx.events().clone());
    let driver = StageDriver::new(Arc::new(FileCheckpointStore::new(&checkpoint_dir)), monitor);

    info!(
        run = ctx.run_id(),
        lane = ctx.lane(),
        work_dir = %work_dir.display(),
        checkpoint_dir = %checkpoint_dir.display(),
        "Starting cramflow"
    );
    let items = Pipeline::standard().run(&ctx, &driver).await?;

    let counts = FlagCounts::from_collection(&items);
    println!(
        "Run {} lane {}: {} files, {} realigned, {} validated, {} indexed",
        ctx.run_id(),
        ctx.lane(),
        counts.total,
        counts.aligned,
        counts.validated,
        counts.indexed
    );
    Ok(())
}

async fn show_status(checkpoint_dir: &Path, json: bool) -> anyhow::Result<()> {
    let store = FileCheckpointStore::new(checkpoint_dir);
    let status = PipelineStatus::collect(&store).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print!("{status}");
    }
    Ok(())
}
