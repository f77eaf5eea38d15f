//! Store-assigned ordering keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Ordering key assigned by the document store at write time.
///
/// Documents are ordered by `at`; documents written within the same clock tick
/// fall back to `sequence`, which the store increments on every insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreTimestamp {
    pub at: DateTime<Utc>,
    pub sequence: u64,
}

impl StoreTimestamp {
    pub fn new(at: DateTime<Utc>, sequence: u64) -> Self {
        Self { at, sequence }
    }
}

impl Ord for StoreTimestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at
            .cmp(&other.at)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for StoreTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ties_fall_back_to_sequence() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let first = StoreTimestamp::new(at, 1);
        let second = StoreTimestamp::new(at, 2);
        assert!(first < second);
    }

    #[test]
    fn clock_wins_over_sequence() {
        let earlier = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 1).unwrap();
        assert!(StoreTimestamp::new(earlier, 9) < StoreTimestamp::new(later, 1));
    }
}
