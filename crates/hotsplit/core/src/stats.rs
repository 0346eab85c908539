// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Per-key access statistics

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::SplitConfig;
use crate::error::{SplitError, SplitResult};
use crate::key::Key;

/// Commutative operation applied by a key's writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Sum,
    Max,
    Write,
    List,
    OrderedWrite,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Sum => "sum",
            OperationKind::Max => "max",
            OperationKind::Write => "write",
            OperationKind::List => "list",
            OperationKind::OrderedWrite => "ordered_write",
        };
        f.write_str(name)
    }
}

/// Sampled access counts for one key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyStat {
    pub(crate) key: Key,
    pub(crate) op: Option<OperationKind>,
    pub(crate) reads: f64,
    pub(crate) writes: f64,
    pub(crate) conflicts: f64,
    pub(crate) stash: f64,
}

impl KeyStat {
    /// A record with every count at zero and no operation recorded
    pub fn empty(key: Key) -> Self {
        Self {
            key,
            op: None,
            reads: 0.0,
            writes: 0.0,
            conflicts: 0.0,
            stash: 0.0,
        }
    }

    pub fn key(&self) -> Key {
        self.key
    }

    pub fn op(&self) -> Option<OperationKind> {
        self.op
    }

    pub fn reads(&self) -> f64 {
        self.reads
    }

    pub fn writes(&self) -> f64 {
        self.writes
    }

    pub fn conflicts(&self) -> f64 {
        self.conflicts
    }

    pub fn stash(&self) -> f64 {
        self.stash
    }

    /// Weighted ratio of contention (conflicts, writes) to non-contended use (reads,
    /// stashed writes). A record with nothing on the bottom of the ratio scores
    /// `f64::INFINITY`.
    pub fn score(&self, config: &SplitConfig) -> f64 {
        let contention = config.conflict_weight * self.conflicts + self.writes;
        let dilution = config.read_weight * self.reads + self.stash;
        if dilution <= 0.0 { f64::INFINITY } else { contention / dilution }
    }

    /// Records `op` on first use and rejects any later write of a different kind.
    /// The record is left untouched on error.
    pub(crate) fn bind_op(&mut self, op: OperationKind) -> SplitResult<()> {
        match self.op {
            None => {
                self.op = Some(op);
                Ok(())
            }
            Some(recorded) if recorded == op => Ok(()),
            Some(recorded) => Err(SplitError::IncompatibleOperation {
                key: self.key,
                attempted: op,
                recorded,
            }),
        }
    }

    /// Adds another record's counts into this one.
    pub(crate) fn absorb(&mut self, other: &KeyStat) {
        if self.op.is_none() {
            self.op = other.op;
        }
        self.reads += other.reads;
        self.writes += other.writes;
        self.conflicts += other.conflicts;
        self.stash += other.stash;
    }

    pub(crate) fn clear_counts(&mut self) {
        self.reads = 0.0;
        self.writes = 0.0;
        self.conflicts = 0.0;
        self.stash = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn stat(reads: f64, writes: f64, conflicts: f64, stash: f64) -> KeyStat {
        KeyStat {
            reads,
            writes,
            conflicts,
            stash,
            ..KeyStat::empty(Key::composite(1, 0))
        }
    }

    #[test]
    fn test_score_weights() {
        let config = SplitConfig::default();
        // (2 * 2 + 0) / (0.5 * 1 + 0)
        assert_eq!(stat(1.0, 0.0, 2.0, 0.0).score(&config), 8.0);
        // (2 * 1 + 3) / (0.5 * 4 + 1)
        assert!((stat(4.0, 3.0, 1.0, 1.0).score(&config) - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_denominator_is_max_interest() {
        let config = SplitConfig::default();
        assert_eq!(KeyStat::empty(Key::composite(1, 0)).score(&config), f64::INFINITY);
        assert_eq!(stat(0.0, 3.0, 0.0, 0.0).score(&config), f64::INFINITY);
    }

    #[test]
    fn test_stash_only_scores_zero() {
        assert_eq!(stat(0.0, 0.0, 0.0, 1.0).score(&SplitConfig::default()), 0.0);
    }

    #[test]
    fn test_bind_op() {
        let mut s = KeyStat::empty(Key::composite(9, 1));
        assert!(s.bind_op(OperationKind::Sum).is_ok());
        assert!(s.bind_op(OperationKind::Sum).is_ok());
        let err = s.bind_op(OperationKind::Max).unwrap_err();
        assert_eq!(
            err,
            SplitError::IncompatibleOperation {
                key: Key::composite(9, 1),
                attempted: OperationKind::Max,
                recorded: OperationKind::Sum,
            }
        );
        assert_eq!(s.op(), Some(OperationKind::Sum));
    }

    #[test]
    fn test_absorb_adopts_op_and_adds_counts() {
        let mut target = stat(1.0, 1.0, 0.0, 0.0);
        let mut source = stat(2.0, 0.5, 3.0, 1.0);
        source.op = Some(OperationKind::List);
        target.absorb(&source);
        assert_eq!(target.op(), Some(OperationKind::List));
        assert_eq!((target.reads(), target.writes(), target.conflicts(), target.stash()), (3.0, 1.5, 3.0, 1.0));
    }

    proptest! {
        #[test]
        fn prop_contention_never_lowers_score(
            reads in 0.0f64..1e4, writes in 0.0f64..1e4, conflicts in 0.0f64..1e4, stash in 0.0f64..1e4,
            extra in 0.0f64..1e4,
        ) {
            let config = SplitConfig::default();
            let base = stat(reads, writes, conflicts, stash).score(&config);
            prop_assert!(stat(reads, writes, conflicts + extra, stash).score(&config) >= base);
            prop_assert!(stat(reads, writes + extra, conflicts, stash).score(&config) >= base);
        }

        #[test]
        fn prop_dilution_never_raises_score(
            reads in 0.0f64..1e4, writes in 0.0f64..1e4, conflicts in 0.0f64..1e4, stash in 0.0f64..1e4,
            extra in 0.0f64..1e4,
        ) {
            let config = SplitConfig::default();
            let base = stat(reads, writes, conflicts, stash).score(&config);
            prop_assert!(stat(reads + extra, writes, conflicts, stash).score(&config) <= base);
            prop_assert!(stat(reads, writes, conflicts, stash + extra).score(&config) <= base);
        }
    }
}
