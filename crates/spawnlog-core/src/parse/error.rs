//! Decode errors for the binary record stream.

use thiserror::Error;

/// Errors produced while reading the delimited record stream.
///
/// None of these are recoverable: the stream has no resynchronization
/// points, so callers abort the run on the first error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Reading from the underlying stream failed.
    #[error("i/o error while reading log: {0}")]
    Io(#[from] std::io::Error),

    /// The record length prefix is not a valid varint.
    #[error("malformed varint length prefix")]
    InvalidLength,

    /// The stream ended in the middle of a record.
    #[error("log truncated mid-record")]
    Truncated,

    /// The length prefix declares a record larger than the sanity cap.
    #[error("record of {size} bytes exceeds the limit of {max}")]
    RecordTooLarge {
        /// Declared record size in bytes.
        size: u64,
        /// The enforced cap.
        max: u64,
    },

    /// The record body is not a valid message.
    #[error("record decode error: {0}")]
    Decode(#[from] prost::DecodeError),
}
