//! `spawnlog text` - render binary logs in the canonical text format.
//!
//! With one log, the rendering goes to `--output_path` or stdout. With two
//! logs, both outputs must be files and the second log is reordered
//! against the first, so line-diffing the two outputs pairs up the same
//! actions.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use spawnlog_core::parse::{FilteringParser, Golden, RecordParser, ReorderingParser};
use spawnlog_core::text::{write_spawn_exec, RECORD_DELIMITER};
use tracing::debug;

/// Entry point. Any failure is reported on stderr and maps to exit 1.
pub fn run(
    log_paths: &[PathBuf],
    output_paths: &[PathBuf],
    restrict_to_runner: Option<String>,
) -> ExitCode {
    match render(log_paths, output_paths, restrict_to_runner) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        },
    }
}

fn render(
    log_paths: &[PathBuf],
    output_paths: &[PathBuf],
    restrict_to_runner: Option<String>,
) -> Result<()> {
    if log_paths.is_empty() {
        bail!("--log_path needs to be specified");
    }
    if log_paths.len() > 2 {
        bail!("too many --log_path values: at most two logs are supported");
    }
    if output_paths.len() > log_paths.len() {
        bail!("too many --output_path values");
    }
    if log_paths.len() == 2 && output_paths.len() != 2 {
        bail!("exactly two --output_path values expected, one per --log_path");
    }

    if log_paths.len() == 2 {
        let mut golden = Golden::new();
        render_log(
            &log_paths[0],
            Some(&output_paths[0]),
            restrict_to_runner.clone(),
            Some(&mut golden),
        )?;
        render_reordered(&log_paths[1], &output_paths[1], restrict_to_runner, &golden)
    } else {
        render_log(
            &log_paths[0],
            output_paths.first().map(PathBuf::as_path),
            restrict_to_runner,
            None,
        )
    }
}

/// Streams one log through the filter and renders it, optionally feeding
/// every rendered record into the golden index for a later second pass.
fn render_log(
    log_path: &Path,
    output_path: Option<&Path>,
    restrict_to_runner: Option<String>,
    golden: Option<&mut Golden>,
) -> Result<()> {
    debug!(log = %log_path.display(), "rendering log");
    let file = fs::File::open(log_path)
        .with_context(|| format!("opening {}", log_path.display()))?;
    let mut parser = FilteringParser::new(file, restrict_to_runner);
    let mut writer = open_output(output_path)?;
    write_all(&mut parser, &mut writer, golden)
        .with_context(|| format!("processing {}", log_path.display()))?;
    writer.flush()?;
    Ok(())
}

/// Renders the second log, reordered against the first log's index.
fn render_reordered(
    log_path: &Path,
    output_path: &Path,
    restrict_to_runner: Option<String>,
    golden: &Golden,
) -> Result<()> {
    debug!(log = %log_path.display(), "rendering log in reference order");
    let file = fs::File::open(log_path)
        .with_context(|| format!("opening {}", log_path.display()))?;
    let parser = FilteringParser::new(file, restrict_to_runner);
    let mut reordered = ReorderingParser::new(golden, parser)
        .with_context(|| format!("processing {}", log_path.display()))?;
    let mut writer = open_output(Some(output_path))?;
    write_all(&mut reordered, &mut writer, None)
        .with_context(|| format!("processing {}", log_path.display()))?;
    writer.flush()?;
    Ok(())
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => {
            let file = fs::File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            Box::new(BufWriter::new(file))
        },
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

fn write_all<P: RecordParser, W: Write>(
    parser: &mut P,
    w: &mut W,
    mut golden: Option<&mut Golden>,
) -> Result<()> {
    while let Some(exec) = parser.next_record()? {
        write_spawn_exec(w, &exec)?;
        w.write_all(RECORD_DELIMITER.as_bytes())?;
        if let Some(golden) = golden.as_deref_mut() {
            golden.add(&exec);
        }
    }
    Ok(())
}
