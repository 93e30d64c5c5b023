//! Field-group diffing between paired records.
//!
//! The differ answers two questions about a pair of records describing the
//! "same" action in two logs: *which* field groups differ (the coarse
//! pass), and *how* they differ (per-group detail lines, produced on
//! demand for verbose reports).
//!
//! The coarse pass uses field-order-sensitive message equality on the
//! projected group, so a reordered-but-equal repeated field still counts as
//! a difference; that is deliberate, since ordering differences in the log
//! are themselves a symptom of non-determinism. The detail pass, by
//! contrast, views map-like groups (environment, platform properties,
//! files) as mappings by name or path.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::model::{Digest, File, SpawnExec};
use crate::text::quote_string;

/// The record field groups the differ reports on.
///
/// Scalar fields (`status`, `exit_code`, timings, cache flags) are outside
/// the set: they describe how the action ran, not what it computed, and do
/// not make an action non-deterministic on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldGroup {
    /// The command line.
    CommandArgs,
    /// The environment, viewed as a mapping by variable name.
    EnvironmentVariables,
    /// Platform constraint properties.
    Platform,
    /// Input files and digests.
    Inputs,
    /// Declared output paths.
    ListedOutputs,
    /// Observed output files and digests.
    ActualOutputs,
}

impl FieldGroup {
    /// Wire-schema name of the group.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CommandArgs => "command_args",
            Self::EnvironmentVariables => "environment_variables",
            Self::Platform => "platform",
            Self::Inputs => "inputs",
            Self::ListedOutputs => "listed_outputs",
            Self::ActualOutputs => "actual_outputs",
        }
    }
}

impl fmt::Display for FieldGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns the groups in which `a` and `b` differ, in schema order.
///
/// The result is symmetric: swapping the arguments yields the same set.
#[must_use]
pub fn diff_groups(a: &SpawnExec, b: &SpawnExec) -> Vec<FieldGroup> {
    let mut groups = Vec::new();
    if a.command_args != b.command_args {
        groups.push(FieldGroup::CommandArgs);
    }
    if a.environment_variables != b.environment_variables {
        groups.push(FieldGroup::EnvironmentVariables);
    }
    if a.platform != b.platform {
        groups.push(FieldGroup::Platform);
    }
    if a.inputs != b.inputs {
        groups.push(FieldGroup::Inputs);
    }
    if a.listed_outputs != b.listed_outputs {
        groups.push(FieldGroup::ListedOutputs);
    }
    if a.actual_outputs != b.actual_outputs {
        groups.push(FieldGroup::ActualOutputs);
    }
    groups
}

/// Produces the human-readable detail lines for one differing group.
///
/// Map-like groups are walked in sorted key order so that repeated runs
/// over the same pair of logs print identical reports.
#[must_use]
pub fn group_details(group: FieldGroup, a: &SpawnExec, b: &SpawnExec) -> Vec<String> {
    match group {
        FieldGroup::CommandArgs => command_arg_details(&a.command_args, &b.command_args),
        FieldGroup::EnvironmentVariables => {
            string_map_details(&env_map(a), &env_map(b))
        },
        FieldGroup::Platform => {
            // A record without a platform object diffs as an empty map.
            string_map_details(&platform_map(a), &platform_map(b))
        },
        FieldGroup::Inputs => file_map_details(&a.inputs, &b.inputs),
        FieldGroup::ListedOutputs => {
            listed_output_details(&a.listed_outputs, &b.listed_outputs)
        },
        FieldGroup::ActualOutputs => file_map_details(&a.actual_outputs, &b.actual_outputs),
    }
}

/// Index-by-index walk over both argument lists.
fn command_arg_details(old: &[String], new: &[String]) -> Vec<String> {
    let mut lines = Vec::new();
    for i in 0..old.len().max(new.len()) {
        match (old.get(i), new.get(i)) {
            (Some(o), Some(n)) if o != n => lines.push(format!(
                "changed [{i}]: {} -> {}",
                quote_string(o),
                quote_string(n)
            )),
            (Some(o), None) => lines.push(format!("removed [{i}]: {}", quote_string(o))),
            (None, Some(n)) => lines.push(format!("added [{i}]: {}", quote_string(n))),
            _ => {},
        }
    }
    lines
}

fn env_map(exec: &SpawnExec) -> BTreeMap<&str, &str> {
    exec.environment_variables
        .iter()
        .map(|env| (env.name.as_str(), env.value.as_str()))
        .collect()
}

fn platform_map(exec: &SpawnExec) -> BTreeMap<&str, &str> {
    exec.platform
        .iter()
        .flat_map(|platform| &platform.properties)
        .map(|property| (property.name.as_str(), property.value.as_str()))
        .collect()
}

fn string_map_details(old: &BTreeMap<&str, &str>, new: &BTreeMap<&str, &str>) -> Vec<String> {
    let mut lines = Vec::new();
    for (key, value) in old {
        if !new.contains_key(key) {
            lines.push(format!("removed: {key}=\"{value}\""));
        }
    }
    for (key, old_value) in old {
        if let Some(new_value) = new.get(key) {
            if new_value != old_value {
                lines.push(format!("changed: {key}=\"{old_value}\" -> \"{new_value}\""));
            }
        }
    }
    for (key, value) in new {
        if !old.contains_key(key) {
            lines.push(format!("added: {key}=\"{value}\""));
        }
    }
    lines
}

fn file_map_details(old: &[File], new: &[File]) -> Vec<String> {
    let old: BTreeMap<&str, Option<&Digest>> = old
        .iter()
        .map(|file| (file.path.as_str(), file.digest.as_ref()))
        .collect();
    let new: BTreeMap<&str, Option<&Digest>> = new
        .iter()
        .map(|file| (file.path.as_str(), file.digest.as_ref()))
        .collect();

    let mut lines = Vec::new();
    for (path, digest) in &old {
        if !new.contains_key(path) {
            lines.push(format!("removed: {path} ({})", digest_desc(*digest)));
        }
    }
    for (path, old_digest) in &old {
        if let Some(new_digest) = new.get(path) {
            if new_digest != old_digest {
                lines.push(format!(
                    "changed: {path} ({} -> {})",
                    digest_desc(*old_digest),
                    digest_desc(*new_digest)
                ));
            }
        }
    }
    for (path, digest) in &new {
        if !old.contains_key(path) {
            lines.push(format!("added: {path} ({})", digest_desc(*digest)));
        }
    }
    lines
}

fn digest_desc(digest: Option<&Digest>) -> String {
    match digest {
        Some(digest) => format!("hash={} size={}", digest.hash, digest.size_bytes),
        None => "no digest".to_string(),
    }
}

fn listed_output_details(old: &[String], new: &[String]) -> Vec<String> {
    let old: BTreeSet<&str> = old.iter().map(String::as_str).collect();
    let new: BTreeSet<&str> = new.iter().map(String::as_str).collect();

    let mut lines = Vec::new();
    for output in old.difference(&new) {
        lines.push(format!("removed: {output}"));
    }
    for output in new.difference(&old) {
        lines.push(format!("added: {output}"));
    }
    lines
}
