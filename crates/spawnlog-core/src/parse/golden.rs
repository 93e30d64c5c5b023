//! Position index over the reference log's action order.

use std::collections::HashMap;

use tracing::warn;

use crate::model::SpawnExec;

/// Records the order in which keyed actions appear in the reference log.
///
/// Positions are dense, starting at zero, and only records with at least
/// one listed output consume a position. The index is append-only: it is
/// built while streaming the reference log and read-only afterwards.
#[derive(Debug, Default)]
pub struct Golden {
    positions: HashMap<String, usize>,
    next_position: usize,
}

impl Golden {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns the next position to `exec`'s pairing key.
    ///
    /// Records without a listed output do not consume a position. A
    /// duplicate key keeps the most recent position; the log is almost
    /// certainly malformed in that case, so a warning is logged, but the
    /// run continues.
    pub fn add(&mut self, exec: &SpawnExec) {
        let Some(key) = exec.first_output() else {
            return;
        };
        if let Some(previous) = self.positions.insert(key.to_string(), self.next_position) {
            warn!(key, previous, "duplicate first output in reference log");
        }
        self.next_position += 1;
    }

    /// Returns the recorded position for `exec`'s pairing key, or `None`
    /// for keyless and unknown records.
    #[must_use]
    pub fn position_for(&self, exec: &SpawnExec) -> Option<usize> {
        self.positions.get(exec.first_output()?).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed(output: &str) -> SpawnExec {
        SpawnExec {
            listed_outputs: vec![output.to_string()],
            ..SpawnExec::default()
        }
    }

    #[test]
    fn test_positions_are_dense_over_keyed_records() {
        let mut golden = Golden::new();
        let a = keyed("out/a.txt");
        let b = keyed("out/b.txt");
        let keyless = SpawnExec::default();

        golden.add(&a);
        golden.add(&keyless);
        golden.add(&b);

        assert_eq!(golden.position_for(&a), Some(0));
        assert_eq!(golden.position_for(&b), Some(1));
        assert_eq!(golden.position_for(&keyless), None);
    }

    #[test]
    fn test_unknown_key_has_no_position() {
        let mut golden = Golden::new();
        golden.add(&keyed("out/a.txt"));

        assert_eq!(golden.position_for(&keyed("out/unknown.txt")), None);
    }

    #[test]
    fn test_duplicate_key_keeps_most_recent_position() {
        let mut golden = Golden::new();
        let a = keyed("out/a.txt");
        golden.add(&a);
        golden.add(&keyed("out/b.txt"));
        golden.add(&a);

        assert_eq!(golden.position_for(&a), Some(2));
    }
}
