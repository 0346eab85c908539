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

use thiserror::Error;

use crate::key::Key;
use crate::stats::OperationKind;

/// Errors raised by split statistics tracking
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SplitError {
    /// A write or conflict carried a different commutative operation than the one
    /// already recorded for the key. Split-mode merging assumes one operation per key.
    #[error("Incompatible operation for key {key}: attempted {attempted}, recorded {recorded}")]
    IncompatibleOperation { key: Key, attempted: OperationKind, recorded: OperationKind },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for split statistics operations
pub type SplitResult<T> = std::result::Result<T, SplitError>;
