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

//! Epoch-boundary folding of worker candidate sets

use metrics::{counter, gauge};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::candidates::CandidateSet;
use crate::config::SplitConfig;
use crate::error::SplitResult;

/// Outcome of folding one epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EpochSummary {
    pub epoch: u64,
    pub workers: usize,
    pub merged_records: usize,
    pub queued_keys: usize,
}

/// Owns the global candidate set that worker sets are folded into
#[derive(Debug)]
pub struct EpochAggregator {
    aggregate: CandidateSet,
    epoch: u64,
}

impl EpochAggregator {
    pub fn new(config: Arc<SplitConfig>) -> Self {
        Self {
            aggregate: CandidateSet::new(config),
            epoch: 0,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Read-only view for the promotion pass
    pub fn aggregate(&self) -> &CandidateSet {
        &self.aggregate
    }

    /// Merges every worker set, in order, and closes the epoch. Workers must not be
    /// recording while this runs; the `&mut` borrow enforces it.
    pub fn fold(&mut self, workers: &mut [CandidateSet]) -> SplitResult<EpochSummary> {
        let mut merged_records = 0;
        for worker in workers.iter_mut() {
            merged_records += self.aggregate.merge(worker)?;
        }
        self.epoch += 1;

        let summary = EpochSummary {
            epoch: self.epoch,
            workers: workers.len(),
            merged_records,
            queued_keys: self.aggregate.queue_len(),
        };

        counter!("hotsplit_epochs_total", 1);
        counter!("hotsplit_merged_records_total", merged_records as u64);
        gauge!("hotsplit_queued_keys", summary.queued_keys as f64);
        info!(
            epoch = summary.epoch,
            workers = summary.workers,
            merged = summary.merged_records,
            queued = summary.queued_keys,
            "folded worker candidate sets"
        );
        Ok(summary)
    }

    pub fn into_aggregate(self) -> CandidateSet {
        self.aggregate
    }
}
