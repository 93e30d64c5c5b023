//! Streaming decoders for the binary execution log.
//!
//! A log is a flat sequence of records, each preceded by its encoded
//! length:
//!
//! ```text
//! +------------------+------------------+------------------+----
//! | varint(len)      | record (len B)   | varint(len)      | ...
//! +------------------+------------------+------------------+----
//! ```
//!
//! The length prefix is a standard unsigned base-128 varint (little-endian
//! groups, MSB continuation). EOF at a record boundary is the normal end of
//! stream; EOF anywhere else is a truncation error. The declared length is
//! validated against [`MAX_RECORD_SIZE`] before any allocation, so a
//! corrupt prefix cannot trigger a multi-gigabyte allocation.

mod error;
mod golden;
mod reorder;

use std::io::{BufRead, BufReader, ErrorKind, Read};

use prost::Message;

pub use self::error::ParseError;
pub use self::golden::Golden;
pub use self::reorder::ReorderingParser;

use crate::model::SpawnExec;

/// Maximum accepted size of a single encoded record (64 MiB).
///
/// Real records top out in the low megabytes even for link actions with
/// enormous input lists; anything larger is a corrupt or misframed stream.
pub const MAX_RECORD_SIZE: u64 = 64 * 1024 * 1024;

/// A pull-based source of decoded records.
///
/// The two implementations are [`FilteringParser`], which streams straight
/// off a reader, and [`ReorderingParser`], which replays a fully buffered
/// log in reference order.
pub trait RecordParser {
    /// Returns the next record, or `None` once the stream is exhausted.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] when the underlying stream fails or a
    /// record cannot be decoded. Errors are not recoverable; the stream
    /// must be abandoned.
    fn next_record(&mut self) -> Result<Option<SpawnExec>, ParseError>;
}

/// Reads one varint-delimited record from `reader`.
///
/// Returns `Ok(None)` on clean EOF at a record boundary.
///
/// # Errors
///
/// [`ParseError::Truncated`] when the stream ends inside the length prefix
/// or the record body, [`ParseError::InvalidLength`] for an overlong
/// varint, [`ParseError::RecordTooLarge`] when the declared length exceeds
/// [`MAX_RECORD_SIZE`], and [`ParseError::Decode`] when the body is not a
/// valid record.
pub fn read_record<R: BufRead>(reader: &mut R) -> Result<Option<SpawnExec>, ParseError> {
    let Some(len) = read_length_prefix(reader)? else {
        return Ok(None);
    };
    if len > MAX_RECORD_SIZE {
        return Err(ParseError::RecordTooLarge {
            size: len,
            max: MAX_RECORD_SIZE,
        });
    }

    #[allow(clippy::cast_possible_truncation)] // bounded by MAX_RECORD_SIZE
    let mut body = vec![0_u8; len as usize];
    reader.read_exact(&mut body).map_err(|err| {
        if err.kind() == ErrorKind::UnexpectedEof {
            ParseError::Truncated
        } else {
            ParseError::Io(err)
        }
    })?;

    let exec = SpawnExec::decode(body.as_slice())?;
    Ok(Some(exec))
}

/// Reads the base-128 varint length prefix.
///
/// Returns `Ok(None)` when the stream is exhausted before the first byte,
/// which is the only clean end-of-stream position.
fn read_length_prefix<R: BufRead>(reader: &mut R) -> Result<Option<u64>, ParseError> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;
    loop {
        let byte = {
            let buf = reader.fill_buf()?;
            if buf.is_empty() {
                if shift == 0 {
                    return Ok(None);
                }
                return Err(ParseError::Truncated);
            }
            buf[0]
        };
        reader.consume(1);

        // A u64 varint never takes more than ten groups of seven bits.
        if shift >= 64 {
            return Err(ParseError::InvalidLength);
        }
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(Some(value));
        }
        shift += 7;
    }
}

/// Streams records from a reader, optionally dropping records whose
/// `runner` does not match a filter.
///
/// An empty filter string is treated the same as no filter, matching the
/// flag default on the command line.
pub struct FilteringParser<R> {
    reader: BufReader<R>,
    restrict_to_runner: Option<String>,
}

impl<R: Read> FilteringParser<R> {
    /// Creates a parser over `input`. When `restrict_to_runner` names a
    /// runner, records executed by any other runner are silently skipped.
    pub fn new(input: R, restrict_to_runner: Option<String>) -> Self {
        Self {
            reader: BufReader::new(input),
            restrict_to_runner: restrict_to_runner.filter(|runner| !runner.is_empty()),
        }
    }
}

impl<R: Read> RecordParser for FilteringParser<R> {
    fn next_record(&mut self) -> Result<Option<SpawnExec>, ParseError> {
        loop {
            let Some(exec) = read_record(&mut self.reader)? else {
                return Ok(None);
            };
            match &self.restrict_to_runner {
                Some(runner) if exec.runner != *runner => {},
                _ => return Ok(Some(exec)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use prost::encoding::encode_varint;

    use super::*;

    fn record(mnemonic: &str, runner: &str) -> SpawnExec {
        SpawnExec {
            mnemonic: mnemonic.to_string(),
            runner: runner.to_string(),
            ..SpawnExec::default()
        }
    }

    fn encode_log(execs: &[SpawnExec]) -> Vec<u8> {
        let mut buf = Vec::new();
        for exec in execs {
            exec.encode_length_delimited(&mut buf).unwrap();
        }
        buf
    }

    #[test]
    fn test_next_record_without_filter() {
        let log = encode_log(&[
            record("Genrule", "linux-sandbox"),
            record("CppCompile", "remote"),
        ]);
        let mut parser = FilteringParser::new(log.as_slice(), None);

        assert_eq!(parser.next_record().unwrap().unwrap().mnemonic, "Genrule");
        assert_eq!(
            parser.next_record().unwrap().unwrap().mnemonic,
            "CppCompile"
        );
        assert!(parser.next_record().unwrap().is_none());
    }

    #[test]
    fn test_filter_by_runner() {
        let log = encode_log(&[
            record("Genrule", "linux-sandbox"),
            record("CppCompile", "remote"),
            record("Action", "linux-sandbox"),
        ]);
        let mut parser =
            FilteringParser::new(log.as_slice(), Some("linux-sandbox".to_string()));

        assert_eq!(parser.next_record().unwrap().unwrap().mnemonic, "Genrule");
        assert_eq!(parser.next_record().unwrap().unwrap().mnemonic, "Action");
        assert!(parser.next_record().unwrap().is_none());
    }

    #[test]
    fn test_empty_filter_means_no_filter() {
        let log = encode_log(&[record("Genrule", "linux-sandbox")]);
        let mut parser = FilteringParser::new(log.as_slice(), Some(String::new()));

        assert!(parser.next_record().unwrap().is_some());
        assert!(parser.next_record().unwrap().is_none());
    }

    #[test]
    fn test_eof_on_empty_input() {
        let mut parser = FilteringParser::new([].as_slice(), None);
        assert!(parser.next_record().unwrap().is_none());
    }

    #[test]
    fn test_truncated_body() {
        let mut log = encode_log(&[record("Genrule", "linux-sandbox")]);
        log.truncate(log.len() - 1);
        let mut parser = FilteringParser::new(log.as_slice(), None);

        assert!(matches!(
            parser.next_record(),
            Err(ParseError::Truncated)
        ));
    }

    #[test]
    fn test_truncated_length_prefix() {
        // A lone continuation byte: the varint never terminates.
        let log = [0x80_u8];
        let mut parser = FilteringParser::new(log.as_slice(), None);

        assert!(matches!(
            parser.next_record(),
            Err(ParseError::Truncated)
        ));
    }

    #[test]
    fn test_overlong_length_prefix() {
        // Eleven groups exceed the ten a u64 varint can occupy.
        let log = [0x80_u8; 11];
        let mut parser = FilteringParser::new(log.as_slice(), None);

        assert!(matches!(
            parser.next_record(),
            Err(ParseError::InvalidLength)
        ));
    }

    #[test]
    fn test_record_too_large_rejected_before_allocation() {
        let mut log = Vec::new();
        encode_varint(MAX_RECORD_SIZE + 1, &mut log);
        let mut parser = FilteringParser::new(log.as_slice(), None);

        assert!(matches!(
            parser.next_record(),
            Err(ParseError::RecordTooLarge { size, max })
                if size == MAX_RECORD_SIZE + 1 && max == MAX_RECORD_SIZE
        ));
    }

    #[test]
    fn test_garbage_body_is_a_decode_error() {
        // Length 1, then a tag byte whose wire type does not match the
        // schema (field 1 is length-delimited, 0x08 claims varint).
        let log = [0x01_u8, 0x08];
        let mut parser = FilteringParser::new(log.as_slice(), None);

        assert!(matches!(
            parser.next_record(),
            Err(ParseError::Decode(_))
        ));
    }
}
