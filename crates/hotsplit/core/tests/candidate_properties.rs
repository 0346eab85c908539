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

use hotsplit_core::{CandidateSet, Key, OperationKind, SplitConfig};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
enum Event {
    Read(bool),
    Write(bool),
    Conflict(bool),
    Stash,
    ReadWrite(bool),
}

fn event() -> impl Strategy<Value = Event> {
    prop_oneof![
        any::<bool>().prop_map(Event::Read),
        any::<bool>().prop_map(Event::Write),
        any::<bool>().prop_map(Event::Conflict),
        Just(Event::Stash),
        any::<bool>().prop_map(Event::ReadWrite),
    ]
}

/// Events on split keys: every key touched is queued by the set that saw it.
fn split_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::Read(true)),
        Just(Event::Write(true)),
        Just(Event::Conflict(true)),
        Just(Event::Stash),
        Just(Event::ReadWrite(true)),
    ]
}

fn apply(set: &mut CandidateSet, key: Key, event: Event) {
    match event {
        Event::Read(split) => set.read(key, split),
        Event::Write(split) => set.write(key, split, OperationKind::Sum).unwrap(),
        Event::Conflict(split) => set.conflict(key, split, OperationKind::Sum).unwrap(),
        Event::Stash => set.stash(key),
        Event::ReadWrite(split) => set.read_write(key, split),
    }
}

fn new_set() -> CandidateSet {
    CandidateSet::new(Arc::new(SplitConfig::default()))
}

fn snapshot(set: &CandidateSet, keys: impl IntoIterator<Item = Key>) -> BTreeMap<Key, (f64, f64, f64, f64)> {
    keys.into_iter()
        .filter_map(|key| set.get(&key).map(|s| (key, (s.reads(), s.writes(), s.conflicts(), s.stash()))))
        .collect()
}

proptest! {
    #[test]
    fn prop_counter_fidelity(events in prop::collection::vec(event(), 1..64)) {
        let key = Key::composite(1, 1);
        let mut set = new_set();
        let mut expected = None::<(f64, f64, f64, f64)>;

        for ev in &events {
            apply(&mut set, key, *ev);
            expected = Some(match (expected, ev) {
                (None, Event::Read(_)) => (1.0, 0.0, 0.0, 0.0),
                (None, Event::Write(_)) => (1.0, 1.0, 0.0, 0.0),
                (None, Event::Conflict(_)) => (1.0, 0.0, 1.0, 0.0),
                (None, Event::Stash) => (0.0, 0.0, 0.0, 1.0),
                (None, Event::ReadWrite(_)) => (5.0, 0.0, 0.0, 0.0),
                (Some((r, w, c, s)), Event::Read(_)) => (r + 1.0, w, c, s),
                (Some((r, w, c, s)), Event::Write(_)) => (r, w + 1.0, c, s),
                (Some((r, w, c, s)), Event::Conflict(_)) => (r, w, c + 1.0, s),
                (Some((r, w, c, s)), Event::Stash) => (r, w, c, s + 1.0),
                (Some((r, w, c, s)), Event::ReadWrite(_)) => (r + 10.0, w, c - 1.0, s),
            });
        }

        let stat = set.get(&key).unwrap();
        prop_assert_eq!(Some((stat.reads(), stat.writes(), stat.conflicts(), stat.stash())), expected);
    }

    #[test]
    fn prop_single_occupancy(events in prop::collection::vec((0u64..8, event()), 1..200)) {
        let mut set = new_set();
        let mut seen = std::collections::HashSet::new();
        for (id, ev) in events {
            let key = Key::composite(id, 0);
            let was_queued = set.is_queued(&key);
            let before = set.queue_len();
            apply(&mut set, key, ev);
            seen.insert(key);

            prop_assert!(set.queue_len() <= seen.len());
            if was_queued {
                prop_assert_eq!(set.queue_len(), before);
                prop_assert!(set.is_queued(&key));
            } else if set.is_queued(&key) {
                prop_assert_eq!(set.queue_len(), before + 1);
            }
        }
    }

    #[test]
    fn prop_merge_associative(events in prop::collection::vec((0u64..6, split_event(), any::<bool>()), 1..120)) {
        let mut b = new_set();
        let mut c = new_set();
        for (id, ev, to_b) in &events {
            let target = if *to_b { &mut b } else { &mut c };
            apply(target, Key::composite(*id, 0), *ev);
        }
        let keys: Vec<Key> = (0..6).map(|id| Key::composite(id, 0)).collect();

        let mut sequential = new_set();
        sequential.merge(&mut b.clone()).unwrap();
        sequential.merge(&mut c.clone()).unwrap();

        let mut combined = c.clone();
        combined.merge(&mut b.clone()).unwrap();
        let mut grouped = new_set();
        grouped.merge(&mut combined).unwrap();

        prop_assert_eq!(snapshot(&sequential, keys.clone()), snapshot(&grouped, keys));
        prop_assert_eq!(sequential.queue_len(), grouped.queue_len());
    }
}

#[test]
fn test_same_op_writes_accepted_mismatch_rejected() {
    let mut set = new_set();
    let key = Key::composite(3, 3);
    set.write(key, false, OperationKind::Max).unwrap();
    set.write(key, false, OperationKind::Max).unwrap();
    assert!(set.write(key, false, OperationKind::Sum).is_err());
}
