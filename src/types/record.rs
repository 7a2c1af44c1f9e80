use serde::{Deserialize, Serialize};

use crate::types::{ColumnId, ColumnValue, Rid};

/// A resolved row as returned by a read. Non-projected columns are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub rid: Rid,
    pub key: ColumnValue,
    pub columns: Vec<Option<ColumnValue>>,
}

impl Record {
    pub fn new(rid: Rid, key: ColumnValue, columns: Vec<Option<ColumnValue>>) -> Self {
        Self { rid, key, columns }
    }

    pub fn get_value(&self, column_index: ColumnId) -> Option<ColumnValue> {
        self.columns.get(column_index).copied().flatten()
    }

    /// Projected values in column order, skipping columns that were not requested.
    pub fn values(&self) -> Vec<ColumnValue> {
        self.columns.iter().filter_map(|v| *v).collect()
    }
}

/// Derived lifecycle state of a RID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    Unallocated,
    Live { updates: usize },
    Deleted,
}
