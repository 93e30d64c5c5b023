//! # spawnlog-core
//!
//! Library for diagnosing non-determinism in a hermetic build system's
//! execution log.
//!
//! An execution log is a stream of varint-length-prefixed binary records,
//! one per spawned subprocess. Running the same build twice should produce
//! byte-identical logs; deviations point at non-hermetic actions that
//! poison remote caching. This crate provides the pieces needed to find
//! them:
//!
//! - **Decoding**: [`parse`] streams records off a reader, optionally
//!   filtered by runner, and can replay a second log in the order of a
//!   reference log so paired diffs line up despite scheduling jitter.
//! - **Rendering**: [`text`] is a byte-exact textual rendering of a record,
//!   suitable for golden files and external line diffing.
//! - **Diffing**: [`diff`] classifies differences between paired records by
//!   field group and produces per-group detail; [`compare`] drives the
//!   whole two-log comparison and builds the report.
//! - **Analysis**: [`analyze`] is a line-oriented filter over rendered diff
//!   streams that keeps only cache-relevant suspicious actions.
//!
//! ## Example
//!
//! ```rust,no_run
//! use spawnlog_core::compare::{CompareOptions, compare_logs};
//!
//! let report = compare_logs(
//!     "exec-1.log".as_ref(),
//!     "exec-2.log".as_ref(),
//!     &CompareOptions::default(),
//! )?;
//! assert!(report.is_deterministic());
//! # Ok::<(), spawnlog_core::parse::ParseError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod analyze;
pub mod compare;
pub mod diff;
pub mod model;
pub mod parse;
pub mod text;

pub use model::SpawnExec;
pub use parse::{FilteringParser, Golden, ParseError, RecordParser, ReorderingParser};
