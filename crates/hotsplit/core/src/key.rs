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

//! Opaque record keys
//!
//! Keys are fixed-width byte strings handed to us by the execution engine. The only
//! structure we ever look at is the composite `(id, table)` layout, and only when
//! printing diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of an encoded key in bytes
pub const KEY_LEN: usize = 16;

/// An opaque, comparable record key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key([u8; KEY_LEN]);

/// Human-readable form of a composite key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyParts {
    pub id: u64,
    pub table: u32,
}

impl Key {
    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Builds a composite key: big-endian id in the first 8 bytes, table tag in the next 4.
    pub fn composite(id: u64, table: u32) -> Self {
        let mut bytes = [0u8; KEY_LEN];
        bytes[..8].copy_from_slice(&id.to_be_bytes());
        bytes[8..12].copy_from_slice(&table.to_be_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Decodes the composite layout. Keys not built by [`Key::composite`] still decode,
    /// the trailing bytes are ignored.
    pub fn decode(&self) -> KeyParts {
        let mut id = [0u8; 8];
        let mut table = [0u8; 4];
        id.copy_from_slice(&self.0[..8]);
        table.copy_from_slice(&self.0[8..12]);
        KeyParts {
            id: u64::from_be_bytes(id),
            table: u32::from_be_bytes(table),
        }
    }
}

impl From<KeyParts> for Key {
    fn from(parts: KeyParts) -> Self {
        Key::composite(parts.id, parts.table)
    }
}

impl fmt::Display for KeyParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.table)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.decode())
    }
}
