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

//! Split candidate tracking
//!
//! A [`CandidateSet`] is owned by one worker and fed inline from the transaction
//! path: every sampled read, write, conflict and stash lands here. It keeps a record for
//! every key it has ever seen, and ranks the interesting subset (keys scoring above the
//! threshold, plus keys that are already split) in a [`StatQueue`].
//!
//! At epoch boundaries a coordinator folds worker sets into an aggregate with
//! [`CandidateSet::merge`]. That is the only point where two sets meet, and it needs
//! exclusive access to both.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tracing::{debug, error};

use crate::config::{SourceRetention, SplitConfig};
use crate::error::{SplitError, SplitResult};
use crate::key::Key;
use crate::queue::{QueueEntry, StatQueue};
use crate::stats::{KeyStat, OperationKind};

/// Per-key statistics plus the ranked subset worth considering for split mode
#[derive(Debug, Clone)]
pub struct CandidateSet {
    config: Arc<SplitConfig>,
    stats: HashMap<Key, KeyStat>,
    queue: StatQueue<Key>,
}

impl CandidateSet {
    pub fn new(config: Arc<SplitConfig>) -> Self {
        Self {
            config,
            stats: HashMap::new(),
            queue: StatQueue::new(),
        }
    }

    /// A set presized for `capacity` observed keys; the queue is presized for a tenth of
    /// that, since only the interesting subset is ranked.
    pub fn with_capacity(config: Arc<SplitConfig>, capacity: usize) -> Self {
        Self {
            config,
            stats: HashMap::with_capacity(capacity),
            queue: StatQueue::with_capacity(capacity / 10),
        }
    }

    pub fn config(&self) -> &Arc<SplitConfig> {
        &self.config
    }

    /// Looks up the record for `key`, creating it from `init` if this is the first time
    /// the key has been seen. The flag reports whether the record was created.
    pub fn entry(&mut self, key: Key, init: impl FnOnce(Key) -> KeyStat) -> (&mut KeyStat, bool) {
        lookup_or_insert(&mut self.stats, key, init)
    }

    /// A sampled read.
    pub fn read(&mut self, key: Key, is_split: bool) {
        let (stat, created) = lookup_or_insert(&mut self.stats, key, |key| KeyStat { reads: 1.0, ..KeyStat::empty(key) });
        if !created {
            stat.reads += 1.0;
        }
        let interesting = stat.score(&self.config) > self.config.score_threshold;
        self.requeue_if(key, interesting || is_split);
    }

    /// A sampled write applying `op`. Writes alone are not enough to make a key
    /// interesting; it also needs more than one observed conflict.
    pub fn write(&mut self, key: Key, is_split: bool, op: OperationKind) -> SplitResult<()> {
        let (stat, created) = lookup_or_insert(&mut self.stats, key, |key| KeyStat {
            op: Some(op),
            reads: 1.0,
            writes: 1.0,
            ..KeyStat::empty(key)
        });
        if !created {
            stat.bind_op(op).inspect_err(|e| error!(%key, error = %e, "rejected write"))?;
            stat.writes += 1.0;
        }
        let interesting = stat.score(&self.config) > self.config.score_threshold && stat.conflicts > 1.0;
        self.requeue_if(key, interesting || is_split);
        Ok(())
    }

    /// A detected write-write or write-read conflict. A conflict implies the key was
    /// read, so a first-seen key starts with one read.
    pub fn conflict(&mut self, key: Key, is_split: bool, op: OperationKind) -> SplitResult<()> {
        let (stat, created) = lookup_or_insert(&mut self.stats, key, |key| KeyStat {
            op: Some(op),
            reads: 1.0,
            conflicts: 1.0,
            ..KeyStat::empty(key)
        });
        if !created {
            stat.bind_op(op).inspect_err(|e| error!(%key, error = %e, "rejected conflict"))?;
            stat.conflicts += 1.0;
        }
        let interesting = stat.score(&self.config) > self.config.score_threshold;
        self.requeue_if(key, interesting || is_split);
        Ok(())
    }

    /// A write deferred because the key is already split. Conflicts cannot happen in
    /// split mode, so stashes stand in for them and the key is always ranked.
    pub fn stash(&mut self, key: Key) {
        let (stat, created) = lookup_or_insert(&mut self.stats, key, |key| KeyStat { stash: 1.0, ..KeyStat::empty(key) });
        if !created {
            stat.stash += 1.0;
        }
        self.requeue_if(key, true);
    }

    /// A read-modify-write on a split key. Each one pulls the score down, since the key
    /// is being used in a way split mode does not help with.
    pub fn read_write(&mut self, key: Key, is_split: bool) {
        let (stat, created) = lookup_or_insert(&mut self.stats, key, |key| KeyStat { reads: 5.0, ..KeyStat::empty(key) });
        if !created {
            stat.reads += 10.0;
            stat.conflicts -= 1.0;
        }
        let interesting = stat.score(&self.config) > self.config.score_threshold;
        self.requeue_if(key, interesting || is_split);
    }

    /// Folds `source` into this set.
    ///
    /// Every record queued in `source` is popped, added into the matching record here
    /// (created if missing) and re-ranked. Records `source` never queued are not
    /// carried over. Operation kinds are checked up front, so a mismatch leaves both
    /// sets untouched. What happens to the drained source records afterwards is set by
    /// [`SourceRetention`] on the source's configuration.
    pub fn merge(&mut self, source: &mut CandidateSet) -> SplitResult<usize> {
        for entry in source.queue.iter() {
            let recorded = self.stats.get(&entry.key).and_then(KeyStat::op);
            let attempted = source.stats.get(&entry.key).and_then(KeyStat::op);
            if let (Some(recorded), Some(attempted)) = (recorded, attempted) {
                if recorded != attempted {
                    let err = SplitError::IncompatibleOperation { key: entry.key, attempted, recorded };
                    error!(key = %entry.key, error = %err, "rejected merge");
                    return Err(err);
                }
            }
        }

        let retention = source.config.source_retention;
        let mut merged = 0;
        while let Some(QueueEntry { key, .. }) = source.queue.pop() {
            let Some(theirs) = source.stats.get_mut(&key) else {
                continue;
            };
            let (mine, _) = self.entry(key, KeyStat::empty);
            mine.absorb(theirs);
            if retention == SourceRetention::Reset {
                theirs.clear_counts();
            }
            let score = self.score_of(&key);
            self.queue.update(key, score);
            merged += 1;
        }
        Ok(merged)
    }

    pub fn get(&self, key: &Key) -> Option<&KeyStat> {
        self.stats.get(key)
    }

    pub fn score(&self, key: &Key) -> Option<f64> {
        self.stats.get(key).map(|stat| stat.score(&self.config))
    }

    pub fn is_queued(&self, key: &Key) -> bool {
        self.queue.contains(key)
    }

    pub fn queue_position(&self, key: &Key) -> Option<usize> {
        self.queue.position(key)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Number of distinct keys ever observed
    pub fn key_count(&self) -> usize {
        self.stats.len()
    }

    /// Up to `n` queued records, highest score first
    pub fn top(&self, n: usize) -> Vec<(&KeyStat, f64)> {
        self.queue.top(n).into_iter().filter_map(|entry| self.stats.get(&entry.key).map(|stat| (stat, entry.score))).collect()
    }

    /// Queued keys currently scoring above the threshold, highest first. This is what
    /// a promotion pass reads.
    pub fn candidates(&self) -> Vec<Key> {
        self.queue
            .top(self.queue.len())
            .into_iter()
            .filter(|entry| entry.score > self.config.score_threshold)
            .map(|entry| entry.key)
            .collect()
    }

    /// Zeroes every record and empties the queue. Keys and their operation kinds are
    /// kept.
    pub fn reset(&mut self) {
        self.queue.clear();
        for stat in self.stats.values_mut() {
            stat.clear_counts();
        }
    }

    fn score_of(&self, key: &Key) -> f64 {
        self.stats.get(key).map(|stat| stat.score(&self.config)).unwrap_or(f64::INFINITY)
    }

    /// Re-ranks `key` if `wanted`, or unconditionally when it is already queued since
    /// its score just moved.
    fn requeue_if(&mut self, key: Key, wanted: bool) {
        let queued = self.queue.contains(&key);
        if !wanted && !queued {
            return;
        }
        if !queued {
            debug!(%key, "key entered split candidate queue");
        }
        let score = self.score_of(&key);
        self.queue.update(key, score);
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        self.queue.assert_consistent();
        for entry in self.queue.iter() {
            assert_eq!(Some(entry.score), self.score(&entry.key));
        }
    }
}

fn lookup_or_insert(stats: &mut HashMap<Key, KeyStat>, key: Key, init: impl FnOnce(Key) -> KeyStat) -> (&mut KeyStat, bool) {
    match stats.entry(key) {
        Entry::Occupied(slot) => (slot.into_mut(), false),
        Entry::Vacant(slot) => (slot.insert(init(key)), true),
    }
}
