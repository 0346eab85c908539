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

//! Hot-key split detection
//!
//! Transaction workers sample every key access into a worker-local [`CandidateSet`].
//! Each key gets a [`KeyStat`] whose score weighs contention (conflicts, writes)
//! against plain use (reads, stashed writes); keys scoring above the configured
//! threshold, and keys already running split, are ranked in an indexed max-heap. At
//! epoch boundaries worker sets are folded into an aggregate that a promotion pass
//! reads to decide which keys to move into split mode.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use hotsplit_core::{CandidateSet, Key, OperationKind, SplitConfig};
//!
//! let config = Arc::new(SplitConfig::default());
//! let mut worker = CandidateSet::new(config.clone());
//! let key = Key::composite(17, 1);
//!
//! worker.conflict(key, false, OperationKind::Sum).unwrap();
//! worker.conflict(key, false, OperationKind::Sum).unwrap();
//! worker.read(key, false);
//! assert_eq!(worker.score(&key), Some(4.0));
//!
//! let mut aggregate = CandidateSet::new(config);
//! aggregate.merge(&mut worker).unwrap();
//! assert_eq!(aggregate.candidates(), vec![key]);
//! ```

pub mod aggregator;
pub mod candidates;
pub mod config;
pub mod error;
pub mod key;
pub mod queue;
pub mod report;
pub mod stats;

pub use aggregator::{EpochAggregator, EpochSummary};
pub use candidates::CandidateSet;
pub use config::{SourceRetention, SplitConfig};
pub use error::{SplitError, SplitResult};
pub use key::{KEY_LEN, Key, KeyParts};
pub use queue::{QueueEntry, StatQueue};
pub use report::{CandidateReport, ReportEntry};
pub use stats::{KeyStat, OperationKind};
