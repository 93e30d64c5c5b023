//! Byte-exact text rendering of execution records.
//!
//! The rendering is consumed by golden-file regression tests and by
//! external line-based diff tooling, so it is a wire contract of its own:
//! fields appear in schema order, zero-valued scalars (empty string,
//! `false`, numeric 0) are omitted, nested messages indent by two spaces
//! per level, and strings are double-quoted with C-style escapes. None of
//! this may drift, which is why the renderer is hand-rolled rather than
//! delegated to a generic text-format printer.

use std::fmt::Write as _;
use std::io::{self, Write};

use crate::model::{Digest, File, SpawnExec};

/// Line separating two records in rendered output: a newline, 57 dashes,
/// and another newline.
pub const RECORD_DELIMITER: &str =
    "\n---------------------------------------------------------\n";

/// Writes the textual rendering of `exec` to `w`.
///
/// A record whose every field holds its zero value renders as nothing at
/// all.
///
/// # Errors
///
/// Propagates write failures from `w`.
pub fn write_spawn_exec<W: Write>(w: &mut W, exec: &SpawnExec) -> io::Result<()> {
    for arg in &exec.command_args {
        writeln!(w, "command_args: {}", quote_string(arg))?;
    }
    for env in &exec.environment_variables {
        writeln!(w, "environment_variables {{")?;
        write_string_field(w, "  ", "name", &env.name)?;
        write_string_field(w, "  ", "value", &env.value)?;
        writeln!(w, "}}")?;
    }
    if let Some(platform) = &exec.platform {
        // A platform wrapper with no properties renders as nothing.
        if !platform.properties.is_empty() {
            writeln!(w, "platform {{")?;
            for property in &platform.properties {
                writeln!(w, "  properties {{")?;
                write_string_field(w, "    ", "name", &property.name)?;
                write_string_field(w, "    ", "value", &property.value)?;
                writeln!(w, "  }}")?;
            }
            writeln!(w, "}}")?;
        }
    }
    for input in &exec.inputs {
        write_file(w, "inputs", input)?;
    }
    for output in &exec.listed_outputs {
        writeln!(w, "listed_outputs: {}", quote_string(output))?;
    }
    write_bool_field(w, "", "remotable", exec.remotable)?;
    write_bool_field(w, "", "cacheable", exec.cacheable)?;
    write_int_field(w, "", "timeout_millis", exec.timeout_millis)?;
    write_string_field(w, "", "progress_message", &exec.progress_message)?;
    write_string_field(w, "", "mnemonic", &exec.mnemonic)?;
    for output in &exec.actual_outputs {
        write_file(w, "actual_outputs", output)?;
    }
    write_string_field(w, "", "runner", &exec.runner)?;
    write_bool_field(w, "", "remote_cache_hit", exec.remote_cache_hit)?;
    write_string_field(w, "", "status", &exec.status)?;
    write_int_field(w, "", "exit_code", i64::from(exec.exit_code))?;
    Ok(())
}

fn write_file<W: Write>(w: &mut W, field_name: &str, file: &File) -> io::Result<()> {
    writeln!(w, "{field_name} {{")?;
    write_string_field(w, "  ", "path", &file.path)?;
    if let Some(digest) = &file.digest {
        write_digest(w, "  ", digest)?;
    }
    writeln!(w, "}}")?;
    Ok(())
}

fn write_digest<W: Write>(w: &mut W, indent: &str, digest: &Digest) -> io::Result<()> {
    writeln!(w, "{indent}digest {{")?;
    let inner = format!("{indent}  ");
    write_string_field(w, &inner, "hash", &digest.hash)?;
    write_int_field(w, &inner, "size_bytes", digest.size_bytes)?;
    write_string_field(w, &inner, "hash_function_name", &digest.hash_function_name)?;
    writeln!(w, "{indent}}}")?;
    Ok(())
}

fn write_string_field<W: Write>(
    w: &mut W,
    indent: &str,
    name: &str,
    value: &str,
) -> io::Result<()> {
    if value.is_empty() {
        return Ok(());
    }
    writeln!(w, "{indent}{name}: {}", quote_string(value))
}

fn write_bool_field<W: Write>(w: &mut W, indent: &str, name: &str, value: bool) -> io::Result<()> {
    if !value {
        return Ok(());
    }
    writeln!(w, "{indent}{name}: true")
}

fn write_int_field<W: Write>(w: &mut W, indent: &str, name: &str, value: i64) -> io::Result<()> {
    if value == 0 {
        return Ok(());
    }
    writeln!(w, "{indent}{name}: {value}")
}

/// Quotes `s` as a double-quoted string with C-style escaping.
///
/// `\n`, `\r`, `\t`, `"` and `\` use their short escapes; any other
/// character below 0x20, and DEL, is emitted as a three-digit zero-padded
/// octal escape. Everything else passes through verbatim.
#[must_use]
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(out, "\\{:03o}", c as u32);
            },
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}
