//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::types::{DEFAULT_INDEX_ORDER, MIN_INDEX_ORDER, error::{DatabaseError, Result}};

/// Tunables shared by every table a `Database` creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum branching factor of each B+ tree index.
    pub index_order: usize,
    /// Build the primary-key index when a table is created.
    pub create_primary_index: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            index_order: DEFAULT_INDEX_ORDER,
            create_primary_index: true,
        }
    }
}

impl EngineConfig {
    pub fn with_index_order(mut self, order: usize) -> Self {
        self.index_order = order;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.index_order < MIN_INDEX_ORDER {
            return Err(DatabaseError::InvalidConfig {
                details: format!(
                    "index_order must be at least {MIN_INDEX_ORDER}, got {}",
                    self.index_order
                ),
            });
        }
        Ok(())
    }
}
