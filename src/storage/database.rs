use std::collections::HashMap;

use tracing::info;

use crate::{
    config::EngineConfig,
    storage::table::{SharedTable, Table},
    types::{ColumnId, error::{DatabaseError, Result}},
};

/// Named collection of independently lockable tables.
#[derive(Debug, Default)]
pub struct Database {
    config: EngineConfig,
    tables: HashMap<String, SharedTable>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            tables: HashMap::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn create_table(
        &mut self,
        name: &str,
        num_columns: usize,
        key_column: ColumnId,
    ) -> Result<SharedTable> {
        if self.tables.contains_key(name) {
            return Err(DatabaseError::TableAlreadyExists {
                name: name.to_string(),
            });
        }
        let table = Table::new(name, num_columns, key_column, &self.config)?.into_shared();
        self.tables.insert(name.to_string(), table.clone());
        info!(table = name, num_columns, key_column, "table created");
        Ok(table)
    }

    pub fn get_table(&self, name: &str) -> Result<SharedTable> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| DatabaseError::TableNotFound {
                name: name.to_string(),
            })
    }

    /// Remove `name` from the catalog. Handles held elsewhere stay usable.
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        self.tables
            .remove(name)
            .map(|_| info!(table = name, "table dropped"))
            .ok_or_else(|| DatabaseError::TableNotFound {
                name: name.to_string(),
            })
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }
}
