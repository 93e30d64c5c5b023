//! `spawnlog compare` - pair two logs and report non-determinism.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use spawnlog_core::compare::{compare_logs, CompareOptions};
use tracing::debug;

/// No non-deterministic actions were found.
const EXIT_DETERMINISTIC: u8 = 0;
/// At least one paired, cache-relevant action differed.
const EXIT_NON_DETERMINISTIC: u8 = 1;
/// Usage, I/O, or decode error.
const EXIT_USAGE_ERROR: u8 = 2;

/// Entry point. Exit code encodes the outcome, not just success.
pub fn run(
    log_paths: &[PathBuf],
    restrict_to_runner: Option<String>,
    verbose: bool,
) -> ExitCode {
    if log_paths.len() != 2 {
        eprintln!(
            "Error: exactly two --log_path values required, got {}",
            log_paths.len()
        );
        return ExitCode::from(EXIT_USAGE_ERROR);
    }

    debug!(
        log1 = %log_paths[0].display(),
        log2 = %log_paths[1].display(),
        "comparing logs"
    );
    let options = CompareOptions { restrict_to_runner };
    let report = match compare_logs(&log_paths[0], &log_paths[1], &options) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::from(EXIT_USAGE_ERROR);
        },
    };

    if let Err(err) = report.write_to(&mut io::stdout().lock(), verbose) {
        eprintln!("Error: {err}");
        return ExitCode::from(EXIT_USAGE_ERROR);
    }

    if report.is_deterministic() {
        ExitCode::from(EXIT_DETERMINISTIC)
    } else {
        ExitCode::from(EXIT_NON_DETERMINISTIC)
    }
}
