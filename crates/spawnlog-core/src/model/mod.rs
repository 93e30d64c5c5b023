//! In-memory model of execution log records.
//!
//! The wire schema is a stable external contract: field numbers below must
//! not change, or existing logs become unreadable. Messages are written by
//! the build system and never mutated here.

use prost::Message;

/// A single spawned subprocess recorded by the build system.
///
/// The record's *pairing key* is its first listed output; two logs of the
/// same build are matched action-by-action on that key. A record with no
/// listed outputs has no key and cannot be paired.
#[derive(Clone, PartialEq, Message)]
pub struct SpawnExec {
    /// Ordered argv of the spawned command.
    #[prost(string, repeated, tag = "1")]
    pub command_args: Vec<String>,

    /// Environment of the spawned command. Names are unique within one
    /// record.
    #[prost(message, repeated, tag = "2")]
    pub environment_variables: Vec<EnvironmentVariable>,

    /// Platform constraints the action was scheduled under, if any.
    #[prost(message, optional, tag = "3")]
    pub platform: Option<Platform>,

    /// Input files with their content digests. Paths are unique within one
    /// record.
    #[prost(message, repeated, tag = "4")]
    pub inputs: Vec<File>,

    /// Declared output paths. The first entry is the pairing key.
    #[prost(string, repeated, tag = "5")]
    pub listed_outputs: Vec<String>,

    /// Whether the action may execute on a remote worker.
    #[prost(bool, tag = "6")]
    pub remotable: bool,

    /// Whether the action's outputs may be served from a cache.
    #[prost(bool, tag = "7")]
    pub cacheable: bool,

    /// Execution timeout in milliseconds, zero when unset.
    #[prost(int64, tag = "8")]
    pub timeout_millis: i64,

    /// Progress message shown while the action ran.
    #[prost(string, tag = "9")]
    pub progress_message: String,

    /// Short action category, e.g. `Genrule` or `CppCompile`.
    #[prost(string, tag = "10")]
    pub mnemonic: String,

    /// Outputs actually observed after execution.
    #[prost(message, repeated, tag = "11")]
    pub actual_outputs: Vec<File>,

    /// Execution strategy used, e.g. `linux-sandbox` or `remote`.
    #[prost(string, tag = "12")]
    pub runner: String,

    /// Whether the result came out of the remote cache.
    #[prost(bool, tag = "13")]
    pub remote_cache_hit: bool,

    /// Final status string reported by the runner.
    #[prost(string, tag = "14")]
    pub status: String,

    /// Exit code of the subprocess.
    #[prost(int32, tag = "15")]
    pub exit_code: i32,
}

impl SpawnExec {
    /// Pairing key: the first listed output, or `None` when the record
    /// declares no outputs.
    #[must_use]
    pub fn first_output(&self) -> Option<&str> {
        self.listed_outputs.first().map(String::as_str)
    }
}

/// One (name, value) environment pair.
#[derive(Clone, PartialEq, Message)]
pub struct EnvironmentVariable {
    /// Variable name.
    #[prost(string, tag = "1")]
    pub name: String,

    /// Variable value.
    #[prost(string, tag = "2")]
    pub value: String,
}

/// Platform constraint set for an action.
#[derive(Clone, PartialEq, Message)]
pub struct Platform {
    /// Ordered constraint properties; names are unique within one record.
    #[prost(message, repeated, tag = "1")]
    pub properties: Vec<Property>,
}

/// One (name, value) platform property.
#[derive(Clone, PartialEq, Message)]
pub struct Property {
    /// Property name.
    #[prost(string, tag = "1")]
    pub name: String,

    /// Property value.
    #[prost(string, tag = "2")]
    pub value: String,
}

/// A file the action consumed or produced.
#[derive(Clone, PartialEq, Message)]
pub struct File {
    /// Path relative to the execution root.
    #[prost(string, tag = "1")]
    pub path: String,

    /// Content digest, absent for files whose digest was not computed.
    #[prost(message, optional, tag = "2")]
    pub digest: Option<Digest>,
}

/// Content digest of a file.
#[derive(Clone, PartialEq, Message)]
pub struct Digest {
    /// Hex-encoded hash of the file contents.
    #[prost(string, tag = "1")]
    pub hash: String,

    /// File size in bytes.
    #[prost(int64, tag = "2")]
    pub size_bytes: i64,

    /// Name of the hash function, e.g. `SHA-256`.
    #[prost(string, tag = "3")]
    pub hash_function_name: String,
}
