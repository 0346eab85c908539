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

use serde::Serialize;
use std::fmt;
use tracing::info;

use crate::candidates::CandidateSet;
use crate::key::KeyParts;
use crate::stats::OperationKind;

/// One ranked candidate, with its key decoded for operators
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub key: KeyParts,
    pub op: Option<OperationKind>,
    pub reads: f64,
    pub writes: f64,
    pub conflicts: f64,
    pub stash: f64,
    pub score: f64,
}

/// Snapshot of the highest scoring queued keys, best first
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CandidateReport {
    pub entries: Vec<ReportEntry>,
}

impl CandidateReport {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "k: {}, r: {}, w: {}, conflicts: {}, stash: {}, score: {:.3}",
            self.key, self.reads, self.writes, self.conflicts, self.stash, self.score
        )
    }
}

impl fmt::Display for CandidateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}

impl CandidateSet {
    /// Builds a report of at most `report_limit` queued keys.
    pub fn report(&self) -> CandidateReport {
        let entries = self
            .top(self.config().report_limit)
            .into_iter()
            .map(|(stat, score)| ReportEntry {
                key: stat.key().decode(),
                op: stat.op(),
                reads: stat.reads(),
                writes: stat.writes(),
                conflicts: stat.conflicts(),
                stash: stat.stash(),
                score,
            })
            .collect();
        CandidateReport { entries }
    }

    /// Writes the report to the operator log.
    pub fn print(&self) {
        let report = self.report();
        info!(queued = self.queue_len(), shown = report.len(), "split candidates");
        for entry in &report.entries {
            info!("{entry}");
        }
    }
}
