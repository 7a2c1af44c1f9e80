use thiserror::Error;

use crate::types::{ColumnId, ColumnValue, Rid};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatabaseError {
    #[error("No live record with key {key}")]
    NotFound { key: ColumnValue },

    #[error("No live record with rid {rid}")]
    RidNotFound { rid: Rid },

    #[error("Duplicate primary key {key}")]
    DuplicateKey { key: ColumnValue },

    #[error("Expected {expected} columns, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("No records in key range [{begin}, {end}]")]
    RangeEmpty { begin: ColumnValue, end: ColumnValue },

    #[error("Arithmetic on column {column} overflowed i64")]
    Overflow { column: ColumnId },

    #[error("Page is full")]
    PageFull,

    #[error("Invalid slot index {index} (max: {max})")]
    InvalidSlotIndex { index: usize, max: usize },

    #[error("Column index {index} out of bounds")]
    ColumnIndexOutOfBounds { index: ColumnId },

    #[error("Column {column} has no index")]
    IndexNotFound { column: ColumnId },

    #[error("Relative version {version} must be zero or negative")]
    InvalidVersion { version: i64 },

    #[error("Record {rid} is locked")]
    RecordLocked { rid: Rid },

    #[error("Table '{name}' not found")]
    TableNotFound { name: String },

    #[error("Table '{name}' already exists")]
    TableAlreadyExists { name: String },

    #[error("Invalid configuration: {details}")]
    InvalidConfig { details: String },
}

impl DatabaseError {
    /// Errors a caller can act on by retrying later, as opposed to errors
    /// that will recur for the same input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DatabaseError::RecordLocked { .. })
    }
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
