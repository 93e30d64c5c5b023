//! Replays a second log in the reference log's action order.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};

use super::{Golden, ParseError, RecordParser};
use crate::model::SpawnExec;

/// Heap entry pairing a record with its reference position.
struct Positioned {
    position: usize,
    exec: SpawnExec,
}

impl PartialEq for Positioned {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
    }
}

impl Eq for Positioned {}

impl PartialOrd for Positioned {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Positioned {
    // Positions in the index are unique, so ordering by position alone is
    // total over any one log's entries and ties cannot occur.
    fn cmp(&self, other: &Self) -> Ordering {
        self.position.cmp(&other.position)
    }
}

/// Serves a fully buffered log in reference order.
///
/// Construction drains its input completely: records whose pairing key
/// appears in the reference index go into a min-heap keyed by reference
/// position, everything else (unknown keys and keyless records) into an
/// arrival-order queue. [`RecordParser::next_record`] then yields matched
/// records in ascending reference position, followed by the unmatched
/// records in their original order.
///
/// Memory is proportional to the whole input log; the input parser is not
/// retained past construction.
pub struct ReorderingParser {
    matched: BinaryHeap<Reverse<Positioned>>,
    unique: VecDeque<SpawnExec>,
}

impl ReorderingParser {
    /// Drains `input` and partitions its records against `golden`.
    ///
    /// # Errors
    ///
    /// Propagates the first decode or I/O error from `input`; no records
    /// are served after a failed construction.
    pub fn new<P: RecordParser>(golden: &Golden, mut input: P) -> Result<Self, ParseError> {
        let mut matched = BinaryHeap::new();
        let mut unique = VecDeque::new();
        while let Some(exec) = input.next_record()? {
            match golden.position_for(&exec) {
                Some(position) => matched.push(Reverse(Positioned { position, exec })),
                None => unique.push_back(exec),
            }
        }
        Ok(Self { matched, unique })
    }
}

impl RecordParser for ReorderingParser {
    fn next_record(&mut self) -> Result<Option<SpawnExec>, ParseError> {
        if let Some(Reverse(entry)) = self.matched.pop() {
            return Ok(Some(entry.exec));
        }
        Ok(self.unique.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(output: &str, mnemonic: &str) -> SpawnExec {
        SpawnExec {
            listed_outputs: vec![output.to_string()],
            mnemonic: mnemonic.to_string(),
            ..SpawnExec::default()
        }
    }

    /// Minimal in-memory source for driving the reordering parser.
    struct VecParser(VecDeque<SpawnExec>);

    impl RecordParser for VecParser {
        fn next_record(&mut self) -> Result<Option<SpawnExec>, ParseError> {
            Ok(self.0.pop_front())
        }
    }

    fn drain(parser: &mut ReorderingParser) -> Vec<String> {
        let mut mnemonics = Vec::new();
        while let Some(exec) = parser.next_record().unwrap() {
            mnemonics.push(exec.mnemonic);
        }
        mnemonics
    }

    #[test]
    fn test_matched_records_come_back_in_reference_order() {
        let mut golden = Golden::new();
        golden.add(&action("out/a.txt", ""));
        golden.add(&action("out/b.txt", ""));
        golden.add(&action("out/c.txt", ""));

        let input = VecParser(VecDeque::from([
            action("out/c.txt", "C"),
            action("out/b.txt", "B"),
            action("out/a.txt", "A"),
            action("out/d.txt", "D"),
        ]));

        let mut parser = ReorderingParser::new(&golden, input).unwrap();
        assert_eq!(drain(&mut parser), ["A", "B", "C", "D"]);
        assert!(parser.next_record().unwrap().is_none());
    }

    #[test]
    fn test_unmatched_records_keep_arrival_order() {
        let golden = Golden::new();
        let input = VecParser(VecDeque::from([
            action("out/z.txt", "Z"),
            SpawnExec {
                mnemonic: "Keyless".to_string(),
                ..SpawnExec::default()
            },
            action("out/y.txt", "Y"),
        ]));

        let mut parser = ReorderingParser::new(&golden, input).unwrap();
        assert_eq!(drain(&mut parser), ["Z", "Keyless", "Y"]);
    }

    #[test]
    fn test_length_is_preserved() {
        let mut golden = Golden::new();
        golden.add(&action("out/a.txt", ""));

        let input = VecParser(VecDeque::from([
            action("out/a.txt", "A"),
            action("out/b.txt", "B"),
            SpawnExec::default(),
        ]));

        let mut parser = ReorderingParser::new(&golden, input).unwrap();
        assert_eq!(drain(&mut parser).len(), 3);
    }
}
