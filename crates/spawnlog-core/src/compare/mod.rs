//! Two-phase comparison of a pair of execution logs.
//!
//! Phase one streams the first ("reference") log, indexing its action
//! order and collecting its keyed records. Phase two buffers the second
//! log, reordered against the reference so both sides iterate the same
//! way. Phase three pairs records by key and classifies every pair:
//! equal, differing-but-ineligible (neither remotable nor cacheable),
//! or non-deterministic.
//!
//! Only the last class makes the run fail: a difference in an action that
//! can never be cached or executed remotely cannot poison a cache.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::diff::{diff_groups, group_details, FieldGroup};
use crate::model::SpawnExec;
use crate::parse::{FilteringParser, Golden, ParseError, RecordParser, ReorderingParser};

/// Options for a compare run.
#[derive(Debug, Clone, Default)]
pub struct CompareOptions {
    /// Only consider records executed by this runner. `None` (or an empty
    /// string) compares everything.
    pub restrict_to_runner: Option<String>,
}

/// One paired action whose field groups differ across the two logs.
#[derive(Debug, Clone)]
pub struct ActionDiff {
    /// Pairing key: the action's first listed output.
    pub key: String,
    /// Mnemonic from the first log's record, `(unknown)` when empty.
    pub mnemonic: String,
    /// Differing field groups, in schema order.
    pub groups: Vec<FieldGroup>,
    /// The record as the first log saw it.
    pub first: SpawnExec,
    /// The record as the second log saw it.
    pub second: SpawnExec,
}

/// Outcome of comparing two logs.
///
/// Listings are sorted by pairing key, so the same pair of logs always
/// produces the same report.
#[derive(Debug, Clone, Default)]
pub struct CompareReport {
    /// Paired actions that differ and are remotable or cacheable.
    pub non_deterministic: Vec<ActionDiff>,
    /// Differing pairs skipped because they are neither remotable nor
    /// cacheable.
    pub skipped: usize,
    /// Records with no listed outputs, invisible to pairing and to the
    /// unique listings below.
    pub keyless: usize,
    /// Keys present only in the first log.
    pub unique_to_log1: Vec<String>,
    /// Keys present only in the second log.
    pub unique_to_log2: Vec<String>,
    /// Number of keys paired across both logs.
    pub paired: usize,
}

impl CompareReport {
    /// Returns `true` when no non-deterministic pair was found.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.non_deterministic.is_empty()
    }

    /// Renders the report. With `verbose`, each differing group is
    /// followed by its per-entry detail lines.
    ///
    /// # Errors
    ///
    /// Propagates write failures from `w`.
    pub fn write_to<W: Write>(&self, w: &mut W, verbose: bool) -> io::Result<()> {
        if !self.non_deterministic.is_empty() {
            writeln!(
                w,
                "Non-deterministic actions found: {}",
                self.non_deterministic.len()
            )?;
            writeln!(w)?;
            for diff in &self.non_deterministic {
                writeln!(w, "  {} [{}]", diff.key, diff.mnemonic)?;
                let groups = diff
                    .groups
                    .iter()
                    .map(|group| group.name())
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(w, "    differs in: {groups}")?;
                if verbose {
                    for group in &diff.groups {
                        writeln!(w, "    {group}:")?;
                        for line in group_details(*group, &diff.first, &diff.second) {
                            writeln!(w, "      {line}")?;
                        }
                    }
                }
            }
            writeln!(w)?;
        }

        if self.skipped > 0 {
            writeln!(
                w,
                "Skipped {} non-remotable/non-cacheable differing action(s)",
                self.skipped
            )?;
        }
        if self.keyless > 0 {
            writeln!(w, "Ignored {} action(s) with no listed outputs", self.keyless)?;
        }
        if !self.unique_to_log1.is_empty() {
            writeln!(w, "Actions unique to log1: {}", self.unique_to_log1.len())?;
            for key in &self.unique_to_log1 {
                writeln!(w, "  {key}")?;
            }
        }
        if !self.unique_to_log2.is_empty() {
            writeln!(w, "Actions unique to log2: {}", self.unique_to_log2.len())?;
            for key in &self.unique_to_log2 {
                writeln!(w, "  {key}")?;
            }
        }

        writeln!(w)?;
        writeln!(
            w,
            "Summary: {} paired actions compared, {} non-deterministic",
            self.paired,
            self.non_deterministic.len()
        )?;
        Ok(())
    }
}

/// Compares `log2` against the reference `log1`.
///
/// # Errors
///
/// Returns a [`ParseError`] when either log cannot be opened or decoded.
/// Errors abort the comparison; no partial report is produced.
pub fn compare_logs(
    log1: &Path,
    log2: &Path,
    options: &CompareOptions,
) -> Result<CompareReport, ParseError> {
    let mut report = CompareReport::default();

    // Phase 1: index the reference log.
    let mut golden = Golden::new();
    let mut first_actions = BTreeMap::new();
    let mut parser = FilteringParser::new(
        fs::File::open(log1)?,
        options.restrict_to_runner.clone(),
    );
    while let Some(exec) = parser.next_record()? {
        golden.add(&exec);
        match exec.first_output() {
            Some(key) => {
                let key = key.to_string();
                first_actions.insert(key, exec);
            },
            None => report.keyless += 1,
        }
    }

    // Phase 2: buffer the second log, reordered to the reference order.
    let input = FilteringParser::new(
        fs::File::open(log2)?,
        options.restrict_to_runner.clone(),
    );
    let mut reordered = ReorderingParser::new(&golden, input)?;
    let mut second_actions = BTreeMap::new();
    while let Some(exec) = reordered.next_record()? {
        match exec.first_output() {
            Some(key) => {
                let key = key.to_string();
                second_actions.insert(key, exec);
            },
            None => report.keyless += 1,
        }
    }

    // Phase 3: pair and classify.
    let first_count = first_actions.len();
    for (key, a) in first_actions {
        let Some(b) = second_actions.remove(&key) else {
            report.unique_to_log1.push(key);
            continue;
        };
        if a == b {
            continue;
        }
        if !a.remotable && !a.cacheable {
            report.skipped += 1;
            continue;
        }
        let groups = diff_groups(&a, &b);
        if groups.is_empty() {
            // The pair differs only in fields outside the diffable groups
            // (status, exit code, timings); not a hermeticity problem.
            continue;
        }
        let mnemonic = if a.mnemonic.is_empty() {
            "(unknown)".to_string()
        } else {
            a.mnemonic.clone()
        };
        report.non_deterministic.push(ActionDiff {
            key,
            mnemonic,
            groups,
            first: a,
            second: b,
        });
    }
    report.unique_to_log2 = second_actions.into_keys().collect();
    report.paired = first_count - report.unique_to_log1.len();

    Ok(report)
}
