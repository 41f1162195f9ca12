//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Ranked entries and validated leaderboard snapshots

use std::time::SystemTime;
use thiserror::Error;

/// A single ranked row, produced only by the data gateway and never mutated
/// after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// 1-based rank
    pub rank: i64,
    /// Display name
    pub name: String,
    /// Accumulated score
    pub score: i64,
}

impl Entry {
    /// Create a new entry
    pub fn new(rank: i64, name: impl Into<String>, score: i64) -> Self {
        Self {
            rank,
            name: name.into(),
            score,
        }
    }
}

/// Errors raised when a row set does not form a valid snapshot
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// A rank below 1 appeared in the row set
    #[error("rank {rank} at row {index} is not 1-based")]
    InvalidRank { index: usize, rank: i64 },
    /// Ranks are not strictly increasing in sequence order
    #[error("rank {rank} at row {index} does not increase over {prev}")]
    OutOfOrder { index: usize, rank: i64, prev: i64 },
}

/// An ordered sequence of entries captured at one fetch.
///
/// Ranks within a snapshot are unique and strictly increasing in sequence
/// order; construction enforces this, so holders can index rows without
/// re-checking. A session replaces its snapshot whole on every successful
/// refresh, there is no row-level mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardSnapshot {
    entries: Vec<Entry>,
    captured_at: SystemTime,
}

impl LeaderboardSnapshot {
    /// Build a snapshot from gateway rows, validating the rank order
    pub fn new(entries: Vec<Entry>, captured_at: SystemTime) -> Result<Self, SnapshotError> {
        let mut prev: Option<i64> = None;
        for (index, entry) in entries.iter().enumerate() {
            if entry.rank < 1 {
                return Err(SnapshotError::InvalidRank {
                    index,
                    rank: entry.rank,
                });
            }
            if let Some(prev) = prev {
                if entry.rank <= prev {
                    return Err(SnapshotError::OutOfOrder {
                        index,
                        rank: entry.rank,
                        prev,
                    });
                }
            }
            prev = Some(entry.rank);
        }
        Ok(Self {
            entries,
            captured_at,
        })
    }

    /// An empty snapshot (a board with no rows is still a valid board)
    pub fn empty(captured_at: SystemTime) -> Self {
        Self {
            entries: Vec::new(),
            captured_at,
        }
    }

    /// The ranked rows, ascending by rank
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the snapshot holds no rows
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// When the gateway captured these rows
    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(secs)
    }

    #[test]
    fn test_snapshot_accepts_strictly_increasing_ranks() {
        let snapshot = LeaderboardSnapshot::new(
            vec![
                Entry::new(1, "Alpha", 500),
                Entry::new(2, "Beta", 300),
                Entry::new(5, "Gamma", 100),
            ],
            at(0),
        )
        .unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.entries()[0].name, "Alpha");
        assert_eq!(snapshot.entries()[2].rank, 5);
    }

    #[test]
    fn test_snapshot_rejects_duplicate_rank() {
        let err = LeaderboardSnapshot::new(
            vec![Entry::new(1, "Alpha", 500), Entry::new(1, "Beta", 500)],
            at(0),
        )
        .unwrap_err();
        assert_eq!(
            err,
            SnapshotError::OutOfOrder {
                index: 1,
                rank: 1,
                prev: 1
            }
        );
    }

    #[test]
    fn test_snapshot_rejects_decreasing_rank() {
        let err = LeaderboardSnapshot::new(
            vec![Entry::new(2, "Beta", 300), Entry::new(1, "Alpha", 500)],
            at(0),
        )
        .unwrap_err();
        assert!(matches!(err, SnapshotError::OutOfOrder { index: 1, .. }));
    }

    #[test]
    fn test_snapshot_rejects_zero_rank() {
        let err =
            LeaderboardSnapshot::new(vec![Entry::new(0, "Alpha", 500)], at(0)).unwrap_err();
        assert_eq!(err, SnapshotError::InvalidRank { index: 0, rank: 0 });
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = LeaderboardSnapshot::empty(at(7));
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.len(), 0);
        assert_eq!(snapshot.captured_at(), at(7));
    }

    #[test]
    fn test_error_display() {
        let err = SnapshotError::InvalidRank { index: 3, rank: -2 };
        assert_eq!(err.to_string(), "rank -2 at row 3 is not 1-based");

        let err = SnapshotError::OutOfOrder {
            index: 1,
            rank: 2,
            prev: 4,
        };
        assert_eq!(err.to_string(), "rank 2 at row 1 does not increase over 4");
    }
}
