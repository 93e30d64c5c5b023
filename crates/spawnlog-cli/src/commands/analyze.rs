//! `spawnlog analyze` - filter a diffed text rendering.

use std::fs;
use std::io::{self, BufReader};
use std::path::Path;
use std::process::ExitCode;

use spawnlog_core::analyze::Analyzer;
use tracing::debug;

/// Entry point. I/O failures map to exit 1; a malformed stream panics by
/// design, since the input violates the renderer's framing.
pub fn run(file: &Path) -> ExitCode {
    match analyze(file) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        },
    }
}

fn analyze(path: &Path) -> io::Result<()> {
    debug!(file = %path.display(), "analyzing diff stream");
    let file = fs::File::open(path)?;
    // Rendered diff lines can get long; give the reader generous room.
    let mut reader = BufReader::with_capacity(1 << 20, file);
    let mut analyzer = Analyzer::new(path, io::stdout().lock());
    analyzer.run(&mut reader)
}
