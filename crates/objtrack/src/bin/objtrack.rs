//! objtrack CLI: run the tracking engine over image sequences.

use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use objtrack::run::{run, RunConfig};
use objtrack::{TrackerConfig, TrackingMode};
use std::path::PathBuf;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "objtrack")]
#[command(about = "Track a single object across image frames (marker, markerless or segmentation mode)")]
#[command(version)]
struct Cli {
    /// Log level when OBJTRACK_LOG is unset (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "info")]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track over the frames listed in a run config.
    Run(RunArgs),

    /// Write a run config with every tracker parameter at its default.
    InitConfig {
        /// Destination JSON file.
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
    /// Run config (JSON).
    #[arg(long)]
    config: PathBuf,

    /// Override the tracking mode (marker, markerless, segmentation, sam2).
    #[arg(long)]
    mode: Option<TrackingMode>,

    /// Write the report here instead of the config's `report_path`.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Write annotated frames here instead of the config's `output_dir`.
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn init_logging(level: LevelFilter) -> CliResult<()> {
    #[cfg(feature = "tracing")]
    {
        let _ = level;
        objtrack::core::init_tracing(false);
        Ok(())
    }
    #[cfg(not(feature = "tracing"))]
    {
        objtrack::core::init_from_env(level)?;
        Ok(())
    }
}

fn cmd_run(args: RunArgs) -> CliResult<()> {
    let mut config = RunConfig::load_json(&args.config)?;
    if args.mode.is_some() {
        config.mode = args.mode;
    }
    if args.report.is_some() {
        config.report_path = args.report;
    }
    if args.output_dir.is_some() {
        config.output_dir = args.output_dir;
    }

    let report = run(&config)?;
    if config.report_path.is_none() {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    eprintln!(
        "{} mode: {}/{} frames tracked",
        report.mode,
        report.found_count(),
        report.frames.len()
    );
    Ok(())
}

fn cmd_init_config(out: PathBuf) -> CliResult<()> {
    let config = RunConfig {
        frames: vec![PathBuf::from("frame_000.png")],
        output_dir: Some(PathBuf::from("tracked")),
        tracker: TrackerConfig::default(),
        report_path: Some(PathBuf::from("report.json")),
        ..RunConfig::default()
    };
    config.write_json(&out)?;
    println!("wrote {}", out.display());
    Ok(())
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level)?;

    match cli.command {
        Commands::Run(args) => cmd_run(args),
        Commands::InitConfig { out } => cmd_init_config(out),
    }
}
