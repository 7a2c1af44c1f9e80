//! Current and historical value resolution over a table's version chains.

use std::collections::HashSet;

use crate::{
    storage::table::Table,
    types::{ColumnId, ColumnValue, Rid, error::{DatabaseError, Result}},
};

/// Value of `column` for `rid` as it stood `versions_back` updates ago.
///
/// Each snapshot keeps the value its update replaced, so the answer is the
/// tail value saved by the oldest of the newest `versions_back` updates that
/// touched the column. If none of them did, the base value is still the one
/// in effect. Requests older than the chain clamp to its oldest snapshot.
pub fn resolve_value(
    table: &Table,
    rid: Rid,
    column: ColumnId,
    versions_back: usize,
) -> Option<ColumnValue> {
    let current = table.current_value(rid, column)?;
    if versions_back == 0 {
        return Some(current);
    }
    let Some(chain) = table.version_chain(rid) else {
        return Some(current);
    };
    let depth = versions_back.min(chain.len());
    let historical = chain
        .iter()
        .take(depth)
        .rev()
        .find_map(|snapshot| snapshot.location(column))
        .map(|location| table.read_tail(column, location));
    Some(historical.unwrap_or(current))
}

/// Resolve every projected column of a live row.
pub fn resolve_row(
    table: &Table,
    rid: Rid,
    projection: &[bool],
    versions_back: usize,
) -> Option<Vec<Option<ColumnValue>>> {
    if !table.contains(rid) {
        return None;
    }
    Some(
        projection
            .iter()
            .enumerate()
            .map(|(column, wanted)| {
                if *wanted {
                    resolve_value(table, rid, column, versions_back)
                } else {
                    None
                }
            })
            .collect(),
    )
}

/// Convert a non-positive relative version into a count of updates to undo.
pub fn versions_back(relative_version: i64) -> Result<usize> {
    if relative_version > 0 {
        return Err(DatabaseError::InvalidVersion {
            version: relative_version,
        });
    }
    Ok(usize::try_from(relative_version.unsigned_abs()).unwrap_or(usize::MAX))
}

/// Live rows whose current `column` value is `value`, found through the
/// column's index. Stale and repeated index hits are dropped.
pub fn matching_rids(
    table: &Table,
    column: ColumnId,
    value: ColumnValue,
) -> Result<Vec<Rid>> {
    let candidates = table.index().locate(column, value)?;
    Ok(live_unique(table, candidates, |current| current == value, column))
}

/// Live rows whose current `column` value lies in `[begin, end]`, in index order.
pub fn matching_rids_in_range(
    table: &Table,
    column: ColumnId,
    begin: ColumnValue,
    end: ColumnValue,
) -> Result<Vec<Rid>> {
    let candidates = table.index().locate_range(column, begin, end)?;
    Ok(live_unique(
        table,
        candidates,
        |current| (begin..=end).contains(&current),
        column,
    ))
}

fn live_unique(
    table: &Table,
    candidates: Vec<Rid>,
    keep: impl Fn(ColumnValue) -> bool,
    column: ColumnId,
) -> Vec<Rid> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|rid| table.current_value(*rid, column).is_some_and(&keep))
        .filter(|rid| seen.insert(*rid))
        .collect()
}
