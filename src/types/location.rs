use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ColumnId;

/// A (page, slot) coordinate inside one column's page list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhysicalLocation {
    pub page: usize,
    pub slot: usize,
}

impl PhysicalLocation {
    pub fn new(page: usize, slot: usize) -> Self {
        Self { page, slot }
    }
}

/// One update's worth of superseded values.
///
/// `columns[c]` points into column `c`'s tail pages at the value the column
/// held just before the update, or is `None` when the update left `c` alone.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaSnapshot {
    pub columns: Vec<Option<PhysicalLocation>>,
    pub updated_at: DateTime<Utc>,
}

impl DeltaSnapshot {
    pub fn new(columns: Vec<Option<PhysicalLocation>>) -> Self {
        Self {
            columns,
            updated_at: Utc::now(),
        }
    }

    pub fn location(&self, column: ColumnId) -> Option<PhysicalLocation> {
        self.columns.get(column).copied().flatten()
    }

    /// Bit `c` is set when column `c` changed in this update.
    pub fn schema_encoding(&self) -> u64 {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, loc)| loc.is_some())
            .fold(0u64, |bits, (c, _)| bits | (1u64 << (c % 64)))
    }

    pub fn changed_columns(&self) -> impl Iterator<Item = ColumnId> + '_ {
        self.columns
            .iter()
            .enumerate()
            .filter_map(|(c, loc)| loc.map(|_| c))
    }
}
