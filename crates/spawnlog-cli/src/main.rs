//! spawnlog - execution log determinism tools.
//!
//! Three tools over one data model: `text` renders binary logs in the
//! canonical text format (reordering a second log against the first),
//! `compare` pairs two logs and reports non-deterministic actions, and
//! `analyze` filters an externally diffed text rendering down to the
//! actions that matter for caching.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod commands;

/// Diagnose non-determinism in execution logs.
#[derive(Parser, Debug)]
#[command(name = "spawnlog")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render binary execution logs as text
    Text {
        /// Input binary log file (may be given once or twice; with two
        /// logs the second is reordered to match the first)
        #[arg(long = "log_path")]
        log_path: Vec<PathBuf>,

        /// Output text file (up to one per log; a single log defaults to
        /// stdout)
        #[arg(long = "output_path")]
        output_path: Vec<PathBuf>,

        /// Only keep records executed by this runner
        #[arg(long = "restrict_to_runner")]
        restrict_to_runner: Option<String>,
    },

    /// Compare two execution logs for non-determinism
    Compare {
        /// Input binary log file (must be given exactly twice)
        #[arg(long = "log_path")]
        log_path: Vec<PathBuf>,

        /// Only compare records executed by this runner
        #[arg(long = "restrict_to_runner")]
        restrict_to_runner: Option<String>,

        /// Print per-group detail for each differing action
        #[arg(long)]
        verbose: bool,
    },

    /// Filter a diffed text rendering down to suspicious actions
    Analyze {
        /// Text-format diff file
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Text {
            log_path,
            output_path,
            restrict_to_runner,
        } => commands::text::run(&log_path, &output_path, restrict_to_runner),
        Commands::Compare {
            log_path,
            restrict_to_runner,
            verbose,
        } => commands::compare::run(&log_path, restrict_to_runner, verbose),
        Commands::Analyze { file } => commands::analyze::run(&file),
    }
}
