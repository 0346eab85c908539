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

use serde::{Deserialize, Serialize};

use crate::error::{SplitError, SplitResult};

/// What a merge leaves behind in the source candidate set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceRetention {
    /// Drained records keep their counts, so the source reports cumulative totals
    /// and a record requeued later is folded again with everything it has seen.
    #[default]
    Retain,
    /// Drained records have their counts zeroed (the op kind survives), so each
    /// merge carries only what the worker observed since the previous one.
    Reset,
}

/// Tuning for split candidate selection. Built once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Score above which a key is considered for split mode
    pub score_threshold: f64,
    /// Weight of sampled conflicts relative to sampled writes
    pub conflict_weight: f64,
    /// Weight of sampled reads relative to stashed writes
    pub read_weight: f64,
    /// Maximum number of entries in a diagnostic report
    pub report_limit: usize,
    pub source_retention: SourceRetention,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            score_threshold: 2.0,
            conflict_weight: 2.0,
            read_weight: 0.5,
            report_limit: 20,
            source_retention: SourceRetention::Retain,
        }
    }
}

impl SplitConfig {
    pub fn with_score_threshold(mut self, threshold: f64) -> Self {
        self.score_threshold = threshold;
        self
    }

    pub fn with_conflict_weight(mut self, weight: f64) -> Self {
        self.conflict_weight = weight;
        self
    }

    pub fn with_read_weight(mut self, weight: f64) -> Self {
        self.read_weight = weight;
        self
    }

    pub fn with_report_limit(mut self, limit: usize) -> Self {
        self.report_limit = limit;
        self
    }

    pub fn with_source_retention(mut self, retention: SourceRetention) -> Self {
        self.source_retention = retention;
        self
    }

    /// Parses a JSON document; absent fields take their defaults.
    pub fn from_json(json: &str) -> SplitResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| SplitError::InvalidConfiguration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SplitResult<()> {
        for (name, value) in [
            ("score_threshold", self.score_threshold),
            ("conflict_weight", self.conflict_weight),
            ("read_weight", self.read_weight),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SplitError::InvalidConfiguration(format!("{name} must be a positive finite number, got {value}")));
            }
        }
        if self.report_limit == 0 {
            return Err(SplitError::InvalidConfiguration("report_limit must be at least 1".to_string()));
        }
        Ok(())
    }
}
