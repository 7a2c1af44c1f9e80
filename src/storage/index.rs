use tracing::info;

use crate::{
    storage::bplus_tree::BPlusTree,
    types::{ColumnId, ColumnValue, Rid, error::{DatabaseError, Result}},
};

pub type ColumnTree = BPlusTree<ColumnValue, Rid>;

/// Per-column secondary structure: at most one B+ tree per column.
///
/// Entries are never removed. A tree may hold (value, rid) pairs for values a
/// row no longer has, or for rows that were deleted; callers re-check hits
/// against the page directory.
#[derive(Debug, Clone)]
pub struct Index {
    order: usize,
    trees: Vec<Option<ColumnTree>>,
}

impl Index {
    pub fn new(num_columns: usize, order: usize) -> Self {
        Self {
            order,
            trees: vec![None; num_columns],
        }
    }

    fn check_column(&self, column: ColumnId) -> Result<()> {
        if column >= self.trees.len() {
            return Err(DatabaseError::ColumnIndexOutOfBounds { index: column });
        }
        Ok(())
    }

    fn tree_for(&self, column: ColumnId) -> Result<&ColumnTree> {
        self.check_column(column)?;
        self.trees[column]
            .as_ref()
            .ok_or(DatabaseError::IndexNotFound { column })
    }

    pub fn has_index(&self, column: ColumnId) -> bool {
        matches!(self.trees.get(column), Some(Some(_)))
    }

    pub fn tree(&self, column: ColumnId) -> Option<&ColumnTree> {
        self.trees.get(column).and_then(|t| t.as_ref())
    }

    pub fn indexed_columns(&self) -> impl Iterator<Item = ColumnId> + '_ {
        self.trees
            .iter()
            .enumerate()
            .filter_map(|(column, tree)| tree.as_ref().map(|_| column))
    }

    /// RIDs stored under `value` in `column`'s tree.
    pub fn locate(&self, column: ColumnId, value: ColumnValue) -> Result<Vec<Rid>> {
        Ok(self.tree_for(column)?.locate(&value))
    }

    /// RIDs stored under values in `[begin, end]`, in value order.
    pub fn locate_range(
        &self,
        column: ColumnId,
        begin: ColumnValue,
        end: ColumnValue,
    ) -> Result<Vec<Rid>> {
        Ok(self.tree_for(column)?.locate_range(&begin, &end))
    }

    /// Add an entry if `column` is indexed; otherwise a no-op.
    pub fn insert(&mut self, column: ColumnId, value: ColumnValue, rid: Rid) {
        if let Some(Some(tree)) = self.trees.get_mut(column) {
            tree.insert(value, rid);
        }
    }

    /// Whether `column`'s tree already maps `value` to `rid`.
    pub fn contains(&self, column: ColumnId, value: ColumnValue, rid: Rid) -> bool {
        self.tree(column)
            .is_some_and(|tree| tree.locate(&value).contains(&rid))
    }

    /// Build `column`'s tree from `entries`. Returns false if it already existed.
    pub fn create_index<I>(&mut self, column: ColumnId, entries: I) -> Result<bool>
    where
        I: IntoIterator<Item = (ColumnValue, Rid)>,
    {
        self.check_column(column)?;
        if self.trees[column].is_some() {
            return Ok(false);
        }
        let mut tree = ColumnTree::with_order(self.order)?;
        for (value, rid) in entries {
            tree.insert(value, rid);
        }
        info!(column, entries = tree.len(), "index created");
        self.trees[column] = Some(tree);
        Ok(true)
    }

    /// Discard `column`'s tree. Returns false if there was none.
    pub fn drop_index(&mut self, column: ColumnId) -> Result<bool> {
        self.check_column(column)?;
        let dropped = self.trees[column].take().is_some();
        if dropped {
            info!(column, "index dropped");
        }
        Ok(dropped)
    }
}
