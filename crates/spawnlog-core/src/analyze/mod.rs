//! Line-oriented filter over rendered action diffs.
//!
//! The input is the text rendering of two execution logs after external
//! line diffing: indented lines come straight from the renderer, while
//! lines starting in column zero were injected by the diff tool and mark
//! a difference. The analyzer buffers each action, and an action survives
//! the filter only when it has a diff marker inside at least one section
//! *and* is remotable or cacheable; everything else is noise for cache
//! debugging.
//!
//! The stream can be enormous, so the analyzer never looks back: state is
//! a single action's lines, reused across actions by truncation, plus a
//! handful of flags. Throughput summaries are printed every thousand
//! actions and at end of input.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Instant;

use regex::Regex;

/// A line literally equal to two spaces followed by 57 dashes separates
/// two actions in the diffed rendering.
const ACTION_SEPARATOR: &str =
    "  ---------------------------------------------------------";

/// Interval, in actions, between throughput summaries.
const SUMMARY_INTERVAL: u64 = 1000;

static SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^  ([^ ]+) \{").expect("section regex compiles"));

static SCALAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^  ([^ ]+): (.+)").expect("scalar regex compiles"));

/// Classification of a single input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// Boundary between two actions.
    ActionSeparator,
    /// Non-indented line injected by the external diff tool.
    Diff,
    /// Opening line of a top-level message section, e.g. `  inputs {`.
    Section(String),
    /// A `mnemonic` scalar; the raw (still quoted) value.
    Mnemonic(String),
    /// A `remotable` scalar.
    Remotable(bool),
    /// A `cacheable` scalar.
    Cacheable(bool),
    /// Anything else.
    Boring,
}

/// Classifies one line of the diffed rendering.
///
/// # Panics
///
/// Panics when a `remotable` or `cacheable` value is not literally `true`
/// or `false`. The stream is malformed at that point and continuing would
/// silently misclassify actions.
#[must_use]
pub fn classify_line(line: &str) -> LineKind {
    if line == ACTION_SEPARATOR {
        return LineKind::ActionSeparator;
    }
    if !line.is_empty() && !line.starts_with(' ') {
        return LineKind::Diff;
    }
    if let Some(captures) = SECTION_RE.captures(line) {
        return LineKind::Section(captures[1].to_string());
    }
    if let Some(captures) = SCALAR_RE.captures(line) {
        let value = &captures[2];
        match &captures[1] {
            "mnemonic" => return LineKind::Mnemonic(value.to_string()),
            "remotable" => return LineKind::Remotable(parse_bool("remotable", value)),
            "cacheable" => return LineKind::Cacheable(parse_bool("cacheable", value)),
            _ => {},
        }
    }
    LineKind::Boring
}

fn parse_bool(field: &str, value: &str) -> bool {
    match value {
        "true" => true,
        "false" => false,
        _ => panic!("failed to parse {field} value {value:?}"),
    }
}

/// Streaming filter that keeps only cache-relevant differing actions.
pub struct Analyzer<W> {
    out: W,
    source: PathBuf,
    current: Vec<String>,
    action_count: u64,
    line_count: u64,
    remotable: bool,
    cacheable: bool,
    section: Option<String>,
    diff_sections: Vec<String>,
    // Tracked for every action but not part of the output.
    #[allow(dead_code)]
    mnemonic: Option<String>,
    started: Instant,
}

impl<W: Write> Analyzer<W> {
    /// Creates an analyzer for a stream read from `source` (used only in
    /// diagnostics), writing kept actions and summaries to `out`.
    pub fn new(source: impl Into<PathBuf>, out: W) -> Self {
        Self {
            out,
            source: source.into(),
            current: Vec::new(),
            action_count: 0,
            line_count: 0,
            remotable: false,
            cacheable: false,
            section: None,
            diff_sections: Vec::new(),
            mnemonic: None,
            started: Instant::now(),
        }
    }

    /// Processes the whole stream and prints the final summary.
    ///
    /// # Errors
    ///
    /// Propagates read failures from `reader` and write failures to the
    /// output.
    ///
    /// # Panics
    ///
    /// Panics on a malformed stream: a diff marker outside any section, or
    /// an unparseable boolean (see [`classify_line`]).
    pub fn run<R: BufRead>(&mut self, reader: &mut R) -> io::Result<()> {
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            if line.ends_with('\n') {
                line.pop();
                if line.ends_with('\r') {
                    line.pop();
                }
            }
            self.process_line(&line)?;
        }
        self.print_summary(self.line_count)
    }

    /// Classifies one line and updates per-action state.
    ///
    /// Every line, the separator included, is appended to the action
    /// buffer *after* classification, so a separator ends up at the head
    /// of the following action's buffer and an emitted action carries its
    /// leading separator but not its trailing one.
    ///
    /// # Errors
    ///
    /// Propagates write failures to the output.
    ///
    /// # Panics
    ///
    /// Panics when a diff marker appears outside any section while the
    /// action buffer is non-empty; the stream violates the renderer's
    /// framing at that point.
    pub fn process_line(&mut self, line: &str) -> io::Result<()> {
        self.line_count += 1;
        match classify_line(line) {
            LineKind::ActionSeparator => {
                self.action_count += 1;
                if self.action_count % SUMMARY_INTERVAL == 0 {
                    // The separator itself is not part of the throughput.
                    self.print_summary(self.line_count - 1)?;
                }
                if !self.diff_sections.is_empty() && (self.remotable || self.cacheable) {
                    writeln!(self.out, "{}", self.current.join("\n"))?;
                }
                self.current.clear();
                self.remotable = false;
                self.cacheable = false;
                self.section = None;
                self.diff_sections.clear();
                self.mnemonic = None;
            },
            LineKind::Section(name) => self.section = Some(name),
            LineKind::Mnemonic(value) => self.mnemonic = Some(value),
            LineKind::Remotable(value) => self.remotable = value,
            LineKind::Cacheable(value) => self.cacheable = value,
            LineKind::Diff => {
                if let Some(section) = &self.section {
                    self.diff_sections.push(section.clone());
                } else {
                    assert!(
                        self.current.is_empty(),
                        "{}:{}: diff marker outside of a section",
                        self.source.display(),
                        self.line_count
                    );
                }
            },
            LineKind::Boring => {},
        }
        self.current.push(line.to_string());
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)] // throughput numbers are approximate
    fn print_summary(&mut self, line_count: u64) -> io::Result<()> {
        let elapsed = self.started.elapsed().as_secs_f64();
        writeln!(
            self.out,
            "Processed {:5} total messages in {elapsed:.1} seconds \
             ({:7.0} messages/sec, {:10.0} lines/sec)",
            self.action_count,
            self.action_count as f64 / elapsed,
            line_count as f64 / elapsed,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_separator() {
        assert_eq!(classify_line(ACTION_SEPARATOR), LineKind::ActionSeparator);
    }

    #[test]
    fn test_classify_diff_lines() {
        assert_eq!(classify_line("1|  some content"), LineKind::Diff);
        assert_eq!(classify_line("2|  other content"), LineKind::Diff);
    }

    #[test]
    fn test_classify_section() {
        assert_eq!(
            classify_line("  inputs {"),
            LineKind::Section("inputs".to_string())
        );
    }

    #[test]
    fn test_classify_mnemonic_keeps_raw_value() {
        assert_eq!(
            classify_line("  mnemonic: \"Genrule\""),
            LineKind::Mnemonic("\"Genrule\"".to_string())
        );
    }

    #[test]
    fn test_classify_booleans() {
        assert_eq!(classify_line("  remotable: true"), LineKind::Remotable(true));
        assert_eq!(
            classify_line("  cacheable: false"),
            LineKind::Cacheable(false)
        );
    }

    #[test]
    fn test_classify_boring() {
        // Empty, nested-indent, and unrelated scalar lines are all boring.
        assert_eq!(classify_line(""), LineKind::Boring);
        assert_eq!(classify_line("    path: \"in/x.txt\""), LineKind::Boring);
        assert_eq!(classify_line("  }"), LineKind::Boring);
        assert_eq!(
            classify_line("  runner: \"linux-sandbox\""),
            LineKind::Boring
        );
    }

    #[test]
    #[should_panic(expected = "failed to parse remotable value")]
    fn test_malformed_boolean_panics() {
        let _ = classify_line("  remotable: maybe");
    }

    fn run_analyzer(lines: &[&str]) -> String {
        let mut out = Vec::new();
        let mut analyzer = Analyzer::new("test.diff", &mut out);
        let input = lines.join("\n");
        analyzer.run(&mut input.as_bytes()).unwrap();
        drop(analyzer);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_emits_only_diffed_cache_relevant_actions() {
        let out = run_analyzer(&[
            // Action 1: diff inside a section, remotable. Kept.
            "  command_args: \"a\"",
            "  inputs {",
            "1|    path: \"in/x.txt\"",
            "  }",
            "  remotable: true",
            ACTION_SEPARATOR,
            // Action 2: no diff markers. Dropped.
            "  command_args: \"b\"",
            "  cacheable: true",
            ACTION_SEPARATOR,
            // Action 3: diff, but neither remotable nor cacheable. Dropped.
            "  actual_outputs {",
            "2|    path: \"out/y.txt\"",
            "  }",
            ACTION_SEPARATOR,
        ]);

        assert!(out.contains("1|    path: \"in/x.txt\""));
        assert!(out.contains("  remotable: true"));
        assert!(!out.contains("command_args: \"b\""));
        assert!(!out.contains("2|    path: \"out/y.txt\""));
        // Final throughput summary is always printed.
        assert!(out.contains("total messages"));
    }

    #[test]
    fn test_emitted_action_stops_at_its_separator() {
        let out = run_analyzer(&[
            "  inputs {",
            "1|    path: \"in/x.txt\"",
            "  }",
            "  cacheable: true",
            ACTION_SEPARATOR,
        ]);

        // The kept block ends before the separator line.
        let block_end = out.find("  }").unwrap();
        let separator_pos = out.find(ACTION_SEPARATOR);
        assert!(separator_pos.is_none() || separator_pos.unwrap() > block_end);
    }

    #[test]
    fn test_leading_diff_noise_before_any_action_is_tolerated() {
        // A diff header before the first line of the first action.
        let out = run_analyzer(&["--- log1.txt", ACTION_SEPARATOR]);
        assert!(out.contains("total messages"));
    }

    #[test]
    #[should_panic(expected = "diff marker outside of a section")]
    fn test_diff_outside_section_panics() {
        let mut out = Vec::new();
        let mut analyzer = Analyzer::new("test.diff", &mut out);
        analyzer.process_line("  command_args: \"a\"").unwrap();
        analyzer.process_line("1| stray diff line").unwrap();
    }
}
