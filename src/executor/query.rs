use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    executor::{
        lock::{LockManager, LockMode, RidLockGuard, RowLockTable},
        resolve::{matching_rids, matching_rids_in_range, resolve_row, resolve_value, versions_back},
    },
    storage::table::{SharedTable, Table},
    types::{ColumnId, ColumnValue, Rid, error::{DatabaseError, Result}, record::Record},
};

/// Record-level operations on one table.
///
/// Every key-based operation goes through an index. Structural changes run
/// under the table's write lock; each touched record is additionally locked
/// through the `LockManager`, and a conflict fails the call with
/// `RecordLocked` instead of waiting.
#[derive(Debug, Clone)]
pub struct Query {
    table: SharedTable,
    locks: Arc<dyn LockManager>,
}

impl Query {
    pub fn new(table: SharedTable) -> Self {
        Self::with_lock_manager(table, Arc::new(RowLockTable::new()))
    }

    pub fn with_lock_manager(table: SharedTable, locks: Arc<dyn LockManager>) -> Self {
        Self { table, locks }
    }

    pub fn table(&self) -> &SharedTable {
        &self.table
    }

    pub fn lock_manager(&self) -> &Arc<dyn LockManager> {
        &self.locks
    }

    fn primary_rid(table: &Table, key: ColumnValue) -> Result<Option<Rid>> {
        Ok(matching_rids(table, table.key_column(), key)?.first().copied())
    }

    /// Insert a full row. Fails if a live row already has the same primary key.
    pub fn insert(&self, columns: &[ColumnValue]) -> Result<Rid> {
        let mut table = self.table.write();
        table.check_arity(columns.len())?;
        let key = columns[table.key_column()];
        if Self::primary_rid(&table, key)?.is_some() {
            warn!(table = table.name(), key, "insert rejected: duplicate key");
            return Err(DatabaseError::DuplicateKey { key });
        }
        table.insert_row(columns)
    }

    pub fn delete(&self, primary_key: ColumnValue) -> Result<()> {
        let mut table = self.table.write();
        let rid = Self::primary_rid(&table, primary_key)?
            .ok_or(DatabaseError::NotFound { key: primary_key })?;
        let _guard = RidLockGuard::acquire(self.locks.as_ref(), rid, LockMode::Exclusive)?;
        table.delete_row(rid);
        Ok(())
    }

    /// Current values of every live row whose `key_column` equals `key`.
    pub fn select(
        &self,
        key: ColumnValue,
        key_column: ColumnId,
        projection: &[bool],
    ) -> Result<Vec<Record>> {
        let table = self.table.read();
        self.read_records(&table, key, key_column, projection, 0)
    }

    /// Like `select`, but as of `-relative_version` updates ago.
    pub fn select_version(
        &self,
        key: ColumnValue,
        key_column: ColumnId,
        projection: &[bool],
        relative_version: i64,
    ) -> Result<Vec<Record>> {
        let versions_back = versions_back(relative_version)?;
        let table = self.table.read();
        self.read_records(&table, key, key_column, projection, versions_back)
    }

    fn read_records(
        &self,
        table: &Table,
        key: ColumnValue,
        key_column: ColumnId,
        projection: &[bool],
        versions_back: usize,
    ) -> Result<Vec<Record>> {
        table.check_arity(projection.len())?;
        let rids = matching_rids(table, key_column, key)?;
        let mut records = Vec::with_capacity(rids.len());
        for rid in rids {
            let _guard = RidLockGuard::acquire(self.locks.as_ref(), rid, LockMode::Shared)?;
            if let Some(columns) = resolve_row(table, rid, projection, versions_back) {
                records.push(Record::new(rid, key, columns));
            }
        }
        Ok(records)
    }

    /// Apply a sparse update: `None` leaves a column unchanged.
    pub fn update(
        &self,
        primary_key: ColumnValue,
        columns: &[Option<ColumnValue>],
    ) -> Result<()> {
        let mut table = self.table.write();
        table.check_arity(columns.len())?;
        let rid = Self::primary_rid(&table, primary_key)?
            .ok_or(DatabaseError::NotFound { key: primary_key })?;
        let _guard = RidLockGuard::acquire(self.locks.as_ref(), rid, LockMode::Exclusive)?;
        Self::apply_update(&mut table, rid, primary_key, columns)
    }

    /// Key checks and the write itself, for a row already locked by the caller.
    fn apply_update(
        table: &mut Table,
        rid: Rid,
        primary_key: ColumnValue,
        columns: &[Option<ColumnValue>],
    ) -> Result<()> {
        if let Some(new_key) = columns[table.key_column()] {
            if new_key != primary_key && Self::primary_rid(table, new_key)?.is_some() {
                warn!(
                    table = table.name(),
                    key = new_key,
                    "update rejected: duplicate key"
                );
                return Err(DatabaseError::DuplicateKey { key: new_key });
            }
        }
        if !table.update_row(rid, columns)? {
            debug!(table = table.name(), rid, "update with no columns set");
        }
        Ok(())
    }

    pub fn sum(
        &self,
        begin: ColumnValue,
        end: ColumnValue,
        column: ColumnId,
    ) -> Result<ColumnValue> {
        self.sum_version(begin, end, column, 0)
    }

    /// Sum `column` over live rows with primary keys in `[begin, end]`, each
    /// resolved as of `-relative_version` updates ago. A running total that
    /// leaves the `i64` range fails with `Overflow`.
    pub fn sum_version(
        &self,
        begin: ColumnValue,
        end: ColumnValue,
        column: ColumnId,
        relative_version: i64,
    ) -> Result<ColumnValue> {
        let versions_back = versions_back(relative_version)?;
        let table = self.table.read();
        table.check_column(column)?;
        let rids = matching_rids_in_range(&table, table.key_column(), begin, end)?;

        let mut total: ColumnValue = 0;
        let mut found = false;
        for rid in rids {
            let _guard = RidLockGuard::acquire(self.locks.as_ref(), rid, LockMode::Shared)?;
            if let Some(value) = resolve_value(&table, rid, column, versions_back) {
                total = total
                    .checked_add(value)
                    .ok_or(DatabaseError::Overflow { column })?;
                found = true;
            }
        }
        if !found {
            return Err(DatabaseError::RangeEmpty { begin, end });
        }
        Ok(total)
    }

    /// Add one to `column` of the row with `primary_key`.
    pub fn increment(&self, primary_key: ColumnValue, column: ColumnId) -> Result<()> {
        let mut table = self.table.write();
        table.check_column(column)?;
        let rid = Self::primary_rid(&table, primary_key)?
            .ok_or(DatabaseError::NotFound { key: primary_key })?;
        let _guard = RidLockGuard::acquire(self.locks.as_ref(), rid, LockMode::Exclusive)?;
        let current = table
            .current_value(rid, column)
            .ok_or(DatabaseError::RidNotFound { rid })?;

        let next = current
            .checked_add(1)
            .ok_or(DatabaseError::Overflow { column })?;
        let mut columns = vec![None; table.num_columns()];
        columns[column] = Some(next);
        Self::apply_update(&mut table, rid, primary_key, &columns)
    }

    pub fn create_index(&self, column: ColumnId) -> Result<()> {
        self.table.write().create_index(column)
    }

    pub fn drop_index(&self, column: ColumnId) -> Result<()> {
        self.table.write().drop_index(column)
    }
}
