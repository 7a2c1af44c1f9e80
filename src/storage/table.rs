use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    config::EngineConfig,
    storage::index::Index,
    types::{
        ColumnId, ColumnValue, FIRST_RID, Rid,
        error::{DatabaseError, Result},
        location::{DeltaSnapshot, PhysicalLocation},
        page::Page,
        record::RowState,
    },
};

pub type SharedTable = Arc<RwLock<Table>>;

/// The page list of one column, either base or tail.
#[derive(Debug, Clone, Default)]
struct ColumnPages {
    pages: Vec<Page>,
}

impl ColumnPages {
    fn with_first_page() -> Self {
        Self {
            pages: vec![Page::new()],
        }
    }

    fn append(&mut self, value: ColumnValue) -> PhysicalLocation {
        if self.pages.last().is_none_or(|page| !page.has_capacity()) {
            self.pages.push(Page::new());
            debug!(pages = self.pages.len(), "column page allocated");
        }
        let page = self.pages.len() - 1;
        let slot = self.pages[page]
            .write(value)
            .unwrap_or_else(|err| panic!("append to page {page} after capacity check: {err}"));
        PhysicalLocation::new(page, slot)
    }

    fn read(&self, location: PhysicalLocation) -> ColumnValue {
        self.pages[location.page].read(location.slot)
    }

    fn patch(&mut self, location: PhysicalLocation, value: ColumnValue) {
        self.pages[location.page]
            .patch(location.slot, value)
            .unwrap_or_else(|err| panic!("patch of directory location {location:?}: {err}"));
    }

    fn record_count(&self) -> usize {
        self.pages.iter().map(Page::num_records).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStats {
    pub live_rows: usize,
    pub allocated_rids: u64,
    pub updated_rows: usize,
    pub base_pages: usize,
    pub tail_pages: usize,
    pub tail_records: usize,
}

/// Columnar storage for one table.
///
/// Base pages always hold each row's newest value; every update copies the
/// superseded value into the column's tail pages and prepends a
/// `DeltaSnapshot` pointing at it to the row's version chain.
#[derive(Debug)]
pub struct Table {
    name: String,
    num_columns: usize,
    key_column: ColumnId,
    base: Vec<ColumnPages>,
    tail: Vec<ColumnPages>,
    next_rid: Rid,
    page_directory: HashMap<Rid, Vec<PhysicalLocation>>,
    version_chains: HashMap<Rid, VecDeque<DeltaSnapshot>>,
    index: Index,
}

impl Table {
    pub fn new(
        name: impl Into<String>,
        num_columns: usize,
        key_column: ColumnId,
        config: &EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        if num_columns == 0 {
            return Err(DatabaseError::InvalidConfig {
                details: "table must have at least one column".to_string(),
            });
        }
        if key_column >= num_columns {
            return Err(DatabaseError::ColumnIndexOutOfBounds { index: key_column });
        }
        let mut table = Self {
            name: name.into(),
            num_columns,
            key_column,
            base: (0..num_columns).map(|_| ColumnPages::with_first_page()).collect(),
            tail: vec![ColumnPages::default(); num_columns],
            next_rid: FIRST_RID,
            page_directory: HashMap::new(),
            version_chains: HashMap::new(),
            index: Index::new(num_columns, config.index_order),
        };
        if config.create_primary_index {
            table.create_index(key_column)?;
        }
        Ok(table)
    }

    pub fn into_shared(self) -> SharedTable {
        Arc::new(RwLock::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    pub fn key_column(&self) -> ColumnId {
        self.key_column
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn check_column(&self, column: ColumnId) -> Result<()> {
        if column >= self.num_columns {
            return Err(DatabaseError::ColumnIndexOutOfBounds { index: column });
        }
        Ok(())
    }

    pub fn check_arity(&self, actual: usize) -> Result<()> {
        if actual != self.num_columns {
            return Err(DatabaseError::ArityMismatch {
                expected: self.num_columns,
                actual,
            });
        }
        Ok(())
    }

    /// Append a new row to the base pages and return its RID.
    pub fn insert_row(&mut self, values: &[ColumnValue]) -> Result<Rid> {
        self.check_arity(values.len())?;
        let rid = self.next_rid;
        self.next_rid += 1;

        let locations: Vec<PhysicalLocation> = values
            .iter()
            .zip(self.base.iter_mut())
            .map(|(value, pages)| pages.append(*value))
            .collect();
        self.page_directory.insert(rid, locations);

        let indexed: Vec<ColumnId> = self.index.indexed_columns().collect();
        for column in indexed {
            self.index.insert(column, values[column], rid);
        }
        debug!(table = %self.name, rid, "row inserted");
        Ok(rid)
    }

    pub fn read_column(&self, column: ColumnId, page_idx: usize, slot_idx: usize) -> ColumnValue {
        self.base[column].read(PhysicalLocation::new(page_idx, slot_idx))
    }

    pub fn read_tail(&self, column: ColumnId, location: PhysicalLocation) -> ColumnValue {
        self.tail[column].read(location)
    }

    pub fn contains(&self, rid: Rid) -> bool {
        self.page_directory.contains_key(&rid)
    }

    pub fn locations(&self, rid: Rid) -> Option<&[PhysicalLocation]> {
        self.page_directory.get(&rid).map(Vec::as_slice)
    }

    /// The newest value of `column` for a live row.
    pub fn current_value(&self, rid: Rid, column: ColumnId) -> Option<ColumnValue> {
        let location = *self.page_directory.get(&rid)?.get(column)?;
        Some(self.base[column].read(location))
    }

    /// Delta snapshots for `rid`, newest first.
    pub fn version_chain(&self, rid: Rid) -> Option<&VecDeque<DeltaSnapshot>> {
        self.version_chains.get(&rid)
    }

    /// Move each `Some` column's current value into the tail pages, patch the
    /// base slot with the new value and prepend the resulting snapshot.
    ///
    /// Returns false, without recording a snapshot, when no column is set.
    /// Callers validate the row and key constraints first.
    pub fn update_row(
        &mut self,
        rid: Rid,
        columns: &[Option<ColumnValue>],
    ) -> Result<bool> {
        self.check_arity(columns.len())?;
        let base_locations = match self.page_directory.get(&rid) {
            Some(locations) => locations.clone(),
            None => return Err(DatabaseError::RidNotFound { rid }),
        };
        if columns.iter().all(Option::is_none) {
            return Ok(false);
        }
        assert_eq!(
            base_locations.len(),
            self.num_columns,
            "directory entry for rid {rid} has the wrong arity"
        );

        let mut delta = Vec::with_capacity(self.num_columns);
        for (column, new_value) in columns.iter().enumerate() {
            let Some(new_value) = *new_value else {
                delta.push(None);
                continue;
            };
            let base_location = base_locations[column];
            let old_value = self.base[column].read(base_location);
            let tail_location = self.tail[column].append(old_value);
            self.base[column].patch(base_location, new_value);
            // An A -> B -> A sequence would otherwise repeat (A, rid)
            if new_value != old_value && !self.index.contains(column, new_value, rid) {
                self.index.insert(column, new_value, rid);
            }
            delta.push(Some(tail_location));
        }

        let chain = self.version_chains.entry(rid).or_default();
        chain.push_front(DeltaSnapshot::new(delta));
        debug!(table = %self.name, rid, versions = chain.len(), "row updated");
        Ok(true)
    }

    /// Sever the directory entry. Page bytes, index entries and the version
    /// chain stay behind.
    pub fn delete_row(&mut self, rid: Rid) -> bool {
        let removed = self.page_directory.remove(&rid).is_some();
        if removed {
            debug!(table = %self.name, rid, "row deleted");
        }
        removed
    }

    pub fn row_state(&self, rid: Rid) -> RowState {
        if self.page_directory.contains_key(&rid) {
            RowState::Live {
                updates: self.version_chains.get(&rid).map_or(0, VecDeque::len),
            }
        } else if (FIRST_RID..self.next_rid).contains(&rid) {
            RowState::Deleted
        } else {
            RowState::Unallocated
        }
    }

    /// Build an index on `column` from the current contents of the directory.
    pub fn create_index(&mut self, column: ColumnId) -> Result<()> {
        self.check_column(column)?;
        let mut rids: Vec<Rid> = self.page_directory.keys().copied().collect();
        rids.sort_unstable();
        let entries: Vec<(ColumnValue, Rid)> = rids
            .into_iter()
            .filter_map(|rid| self.current_value(rid, column).map(|value| (value, rid)))
            .collect();
        self.index.create_index(column, entries)?;
        Ok(())
    }

    pub fn drop_index(&mut self, column: ColumnId) -> Result<()> {
        self.index.drop_index(column)?;
        Ok(())
    }

    pub fn stats(&self) -> TableStats {
        TableStats {
            live_rows: self.page_directory.len(),
            allocated_rids: self.next_rid - FIRST_RID,
            updated_rows: self.version_chains.len(),
            base_pages: self.base.iter().map(|c| c.pages.len()).sum(),
            tail_pages: self.tail.iter().map(|c| c.pages.len()).sum(),
            tail_records: self.tail.iter().map(ColumnPages::record_count).sum(),
        }
    }

    /// Compaction hook. Base pages already carry the newest values, so there
    /// is nothing to fold back; this reports what a compactor would work on.
    pub fn merge(&mut self) -> TableStats {
        let stats = self.stats();
        info!(
            table = %self.name,
            tail_pages = stats.tail_pages,
            tail_records = stats.tail_records,
            "merge requested"
        );
        stats
    }
}
