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

//! Indexed max-heap of scored keys
//!
//! A binary heap stored in a `Vec`, plus a side table from key to its current slot.
//! The side table is rewritten on every swap, so any queued key can be removed or
//! repositioned in O(log n) without a scan.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;

/// A queued key with the score it was ranked under
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueueEntry<K> {
    pub key: K,
    pub score: f64,
}

/// Priority queue ordered by descending score
#[derive(Debug, Clone)]
pub struct StatQueue<K> {
    heap: Vec<QueueEntry<K>>,
    positions: HashMap<K, usize>,
}

impl<K> Default for StatQueue<K>
where
    K: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> StatQueue<K>
where
    K: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            heap: Vec::new(),
            positions: HashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
            positions: HashMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.positions.contains_key(key)
    }

    /// Slot currently held by `key`, `None` when it is not queued
    pub fn position(&self, key: &K) -> Option<usize> {
        self.positions.get(key).copied()
    }

    pub fn score(&self, key: &K) -> Option<f64> {
        self.position(key).map(|idx| self.heap[idx].score)
    }

    pub fn peek(&self) -> Option<&QueueEntry<K>> {
        self.heap.first()
    }

    /// Inserts `key`. A key that is already queued is re-ranked in place and its
    /// previous score returned.
    pub fn push(&mut self, key: K, score: f64) -> Option<f64> {
        if let Some(idx) = self.position(&key) {
            let previous = std::mem::replace(&mut self.heap[idx].score, score);
            self.restore(idx);
            return Some(previous);
        }

        let idx = self.heap.len();
        self.positions.insert(key.clone(), idx);
        self.heap.push(QueueEntry { key, score });
        self.sift_up(idx);
        None
    }

    /// Removes and returns the highest scoring entry.
    pub fn pop(&mut self) -> Option<QueueEntry<K>> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.swap(0, last);
        let entry = self.heap.pop()?;
        self.positions.remove(&entry.key);
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some(entry)
    }

    pub fn remove(&mut self, key: &K) -> Option<QueueEntry<K>> {
        let idx = self.position(key)?;
        let last = self.heap.len() - 1;
        self.swap(idx, last);
        let entry = self.heap.pop()?;
        self.positions.remove(&entry.key);
        if idx < self.heap.len() {
            self.restore(idx);
        }
        Some(entry)
    }

    /// Drops `key` from its current slot if queued, then inserts it with `score`.
    /// Queue length grows by one only for keys that were not queued before.
    pub fn update(&mut self, key: K, score: f64) {
        self.remove(&key);
        self.push(key, score);
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.positions.clear();
    }

    /// Entries in heap order (only the first is guaranteed to be the maximum).
    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry<K>> {
        self.heap.iter()
    }

    /// Up to `n` entries, highest score first, without disturbing the queue.
    pub fn top(&self, n: usize) -> Vec<QueueEntry<K>> {
        let mut entries = self.heap.clone();
        entries.sort_by(|a, b| b.score.total_cmp(&a.score));
        entries.truncate(n);
        entries
    }

    /// Pops every entry, highest score first.
    pub fn drain(&mut self) -> impl Iterator<Item = QueueEntry<K>> + '_ {
        std::iter::from_fn(move || self.pop())
    }

    fn outranks(&self, a: usize, b: usize) -> bool {
        self.heap[a].score.total_cmp(&self.heap[b].score) == Ordering::Greater
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.heap.swap(a, b);
        self.positions.insert(self.heap[a].key.clone(), a);
        self.positions.insert(self.heap[b].key.clone(), b);
    }

    fn restore(&mut self, idx: usize) {
        if idx > 0 && self.outranks(idx, (idx - 1) / 2) {
            self.sift_up(idx);
        } else {
            self.sift_down(idx);
        }
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if !self.outranks(idx, parent) {
                break;
            }
            self.swap(idx, parent);
            idx = parent;
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * idx + 1;
            let right = left + 1;
            let mut largest = idx;
            if left < len && self.outranks(left, largest) {
                largest = left;
            }
            if right < len && self.outranks(right, largest) {
                largest = right;
            }
            if largest == idx {
                break;
            }
            self.swap(idx, largest);
            idx = largest;
        }
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        assert_eq!(self.heap.len(), self.positions.len());
        for (idx, entry) in self.heap.iter().enumerate() {
            assert_eq!(self.positions.get(&entry.key), Some(&idx));
            if idx > 0 {
                assert!(!self.outranks(idx, (idx - 1) / 2), "heap order violated at {idx}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_descending() {
        let mut queue = StatQueue::new();
        for (key, score) in [("a", 1.0), ("b", 5.0), ("c", 3.0), ("d", f64::INFINITY), ("e", 0.0)] {
            queue.push(key, score);
        }
        queue.assert_consistent();

        let order: Vec<_> = queue.drain().map(|e| e.key).collect();
        assert_eq!(order, vec!["d", "b", "c", "a", "e"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_update_keeps_single_occupancy() {
        let mut queue = StatQueue::new();
        queue.update("a", 1.0);
        queue.update("b", 2.0);
        assert_eq!(queue.len(), 2);

        queue.update("a", 10.0);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.peek().map(|e| e.key), Some("a"));
        assert_eq!(queue.position(&"a"), Some(0));
        queue.assert_consistent();
    }

    #[test]
    fn test_push_existing_reranks() {
        let mut queue = StatQueue::new();
        queue.push(1u32, 4.0);
        queue.push(2u32, 3.0);
        assert_eq!(queue.push(1u32, 1.0), Some(4.0));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.peek().map(|e| e.key), Some(2));
        queue.assert_consistent();
    }

    #[test]
    fn test_remove_from_middle() {
        let mut queue = StatQueue::new();
        for i in 0..32u32 {
            queue.push(i, f64::from((i * 7) % 13));
        }
        for i in (0..32u32).step_by(3) {
            let removed = queue.remove(&i).unwrap();
            assert_eq!(removed.key, i);
            assert!(!queue.contains(&i));
            queue.assert_consistent();
        }
        assert!(queue.remove(&0).is_none());
        assert_eq!(queue.len(), 32 - 11);
    }

    #[test]
    fn test_top_is_non_destructive() {
        let mut queue = StatQueue::new();
        for i in 0..10u32 {
            queue.push(i, f64::from(i));
        }
        let top: Vec<_> = queue.top(3).into_iter().map(|e| e.key).collect();
        assert_eq!(top, vec![9, 8, 7]);
        assert_eq!(queue.len(), 10);
        assert_eq!(queue.top(50).len(), 10);
    }

    #[test]
    fn test_pop_empty() {
        let mut queue: StatQueue<u8> = StatQueue::new();
        assert!(queue.pop().is_none());
        assert!(queue.peek().is_none());
    }
}
