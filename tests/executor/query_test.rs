use std::{sync::Arc, thread};

use lstore::{
    Database, DatabaseError, Query,
    executor::lock::LockMode,
    types::record::RowState,
};

const ALL: [bool; 5] = [true; 5];

fn grades_query() -> Query {
    let mut db = Database::new();
    let table = db.create_table("Grades", 5, 0).unwrap();
    Query::new(table)
}

fn seeded_query() -> Result<Query, DatabaseError> {
    let query = grades_query();
    for key in 1..=5 {
        query.insert(&[key, key * 10, 0, 0, 0])?;
    }
    Ok(query)
}

#[test]
fn test_insert_then_select_round_trip() -> Result<(), DatabaseError> {
    let query = grades_query();
    let row = [906659671, 93, 0, 0, 0];
    let rid = query.insert(&row)?;

    let records = query.select(906659671, 0, &ALL)?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].rid, rid);
    assert_eq!(records[0].key, 906659671);
    assert_eq!(records[0].values(), row.to_vec());

    Ok(())
}

#[test]
fn test_projection_hides_columns() -> Result<(), DatabaseError> {
    let query = seeded_query()?;
    let records = query.select(3, 0, &[false, true, false, false, true])?;

    assert_eq!(
        records[0].columns,
        vec![None, Some(30), None, None, Some(0)]
    );

    Ok(())
}

#[test]
fn test_duplicate_insert_leaves_table_unchanged() -> Result<(), DatabaseError> {
    let query = seeded_query()?;
    let before = query.table().read().stats();

    // Same primary key, different payload
    let result = query.insert(&[3, 999, 999, 999, 999]);
    assert_eq!(result, Err(DatabaseError::DuplicateKey { key: 3 }));

    assert_eq!(query.table().read().stats(), before);
    assert_eq!(query.select(3, 0, &ALL)?[0].values(), vec![3, 30, 0, 0, 0]);

    Ok(())
}

#[test]
fn test_arity_mismatch() {
    let query = grades_query();
    assert_eq!(
        query.insert(&[1, 2]),
        Err(DatabaseError::ArityMismatch {
            expected: 5,
            actual: 2
        })
    );
    assert!(matches!(
        query.select(1, 0, &[true, true]),
        Err(DatabaseError::ArityMismatch { .. })
    ));
    assert!(matches!(
        query.update(1, &[None]),
        Err(DatabaseError::ArityMismatch { .. })
    ));
}

#[test]
fn test_select_missing_key_is_empty() -> Result<(), DatabaseError> {
    let query = seeded_query()?;
    assert!(query.select(42, 0, &ALL)?.is_empty());
    Ok(())
}

#[test]
fn test_select_is_idempotent() -> Result<(), DatabaseError> {
    let query = seeded_query()?;
    query.update(2, &[None, Some(21), None, Some(7), None])?;

    let first = query.select(2, 0, &ALL)?;
    let second = query.select(2, 0, &ALL)?;
    assert_eq!(first, second);

    Ok(())
}

#[test]
fn test_update_changes_current_value() -> Result<(), DatabaseError> {
    let query = seeded_query()?;
    query.update(4, &[None, Some(44), None, None, Some(1)])?;

    assert_eq!(query.select(4, 0, &ALL)?[0].values(), vec![4, 44, 0, 0, 1]);
    Ok(())
}

#[test]
fn test_update_missing_key() -> Result<(), DatabaseError> {
    let query = seeded_query()?;
    assert_eq!(
        query.update(77, &[None, Some(1), None, None, None]),
        Err(DatabaseError::NotFound { key: 77 })
    );
    Ok(())
}

#[test]
fn test_update_primary_key() -> Result<(), DatabaseError> {
    let query = seeded_query()?;

    // Moving onto a live key is rejected
    assert_eq!(
        query.update(1, &[Some(2), None, None, None, None]),
        Err(DatabaseError::DuplicateKey { key: 2 })
    );
    assert_eq!(query.select(1, 0, &ALL)?[0].values(), vec![1, 10, 0, 0, 0]);

    // Moving onto a free key re-keys the row
    query.update(1, &[Some(100), None, None, None, None])?;
    assert!(query.select(1, 0, &ALL)?.is_empty());
    assert_eq!(query.select(100, 0, &ALL)?[0].values(), vec![100, 10, 0, 0, 0]);

    // The old key is free again
    query.insert(&[1, 11, 0, 0, 0])?;
    assert_eq!(query.select(1, 0, &ALL)?[0].values()[1], 11);

    Ok(())
}

#[test]
fn test_delete_then_not_found() -> Result<(), DatabaseError> {
    let query = seeded_query()?;
    query.delete(3)?;

    assert!(query.select(3, 0, &ALL)?.is_empty());
    assert_eq!(query.delete(3), Err(DatabaseError::NotFound { key: 3 }));
    assert_eq!(
        query.update(3, &[None, Some(1), None, None, None]),
        Err(DatabaseError::NotFound { key: 3 })
    );
    assert_eq!(query.increment(3, 1), Err(DatabaseError::NotFound { key: 3 }));

    Ok(())
}

#[test]
fn test_reinsert_after_delete_gets_new_rid() -> Result<(), DatabaseError> {
    let query = seeded_query()?;
    let old_rid = query.select(3, 0, &ALL)?[0].rid;
    query.delete(3)?;

    let new_rid = query.insert(&[3, 333, 0, 0, 0])?;
    assert!(new_rid > old_rid);

    let records = query.select(3, 0, &ALL)?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].rid, new_rid);
    assert_eq!(records[0].values()[1], 333);

    Ok(())
}

#[test]
fn test_sum_over_key_range() -> Result<(), DatabaseError> {
    let query = seeded_query()?;

    assert_eq!(query.sum(2, 4, 1)?, 90);
    assert_eq!(query.sum(1, 5, 1)?, 150);
    assert_eq!(query.sum(5, 5, 1)?, 50);
    assert_eq!(query.sum(0, 2, 0)?, 3);

    Ok(())
}

#[test]
fn test_sum_empty_range() -> Result<(), DatabaseError> {
    let query = seeded_query()?;

    assert_eq!(
        query.sum(10, 20, 1),
        Err(DatabaseError::RangeEmpty { begin: 10, end: 20 })
    );
    assert!(matches!(query.sum(4, 2, 1), Err(DatabaseError::RangeEmpty { .. })));

    Ok(())
}

#[test]
fn test_sum_skips_deleted_rows() -> Result<(), DatabaseError> {
    let query = seeded_query()?;
    query.delete(3)?;
    assert_eq!(query.sum(2, 4, 1)?, 60);
    Ok(())
}

#[test]
fn test_sum_column_out_of_bounds() -> Result<(), DatabaseError> {
    let query = seeded_query()?;
    assert_eq!(
        query.sum(1, 5, 5),
        Err(DatabaseError::ColumnIndexOutOfBounds { index: 5 })
    );
    Ok(())
}

#[test]
fn test_sum_overflow_is_an_error() -> Result<(), DatabaseError> {
    let query = grades_query();
    query.insert(&[1, i64::MAX, 0, 0, 0])?;
    query.insert(&[2, 1, 0, 0, 0])?;

    assert_eq!(query.sum(1, 2, 1), Err(DatabaseError::Overflow { column: 1 }));

    // Row locks taken during the failed sum are released
    assert_eq!(query.sum(1, 1, 1)?, i64::MAX);
    query.update(2, &[None, Some(0), None, None, None])?;
    assert_eq!(query.sum(1, 2, 1)?, i64::MAX);

    Ok(())
}

#[test]
fn test_increment_overflow_is_an_error() -> Result<(), DatabaseError> {
    let query = grades_query();
    let rid = query.insert(&[1, i64::MAX, 0, 0, 0])?;

    assert_eq!(query.increment(1, 1), Err(DatabaseError::Overflow { column: 1 }));

    // Nothing was written and the row is not left locked
    assert_eq!(query.select(1, 0, &ALL)?[0].values(), vec![1, i64::MAX, 0, 0, 0]);
    assert_eq!(
        query.table().read().row_state(rid),
        RowState::Live { updates: 0 }
    );
    query.increment(1, 2)?;
    assert_eq!(query.select(1, 0, &ALL)?[0].values()[2], 1);

    Ok(())
}

#[test]
fn test_increment() -> Result<(), DatabaseError> {
    let query = seeded_query()?;
    query.increment(2, 1)?;
    query.increment(2, 1)?;
    query.increment(2, 4)?;

    assert_eq!(query.select(2, 0, &ALL)?[0].values(), vec![2, 22, 0, 0, 1]);
    assert_eq!(query.select_version(2, 0, &ALL, -1)?[0].values(), vec![2, 22, 0, 0, 0]);
    assert_eq!(query.select_version(2, 0, &ALL, -3)?[0].values(), vec![2, 20, 0, 0, 0]);

    Ok(())
}

#[test]
fn test_increment_primary_key_collision() -> Result<(), DatabaseError> {
    let query = seeded_query()?;
    assert_eq!(query.increment(1, 0), Err(DatabaseError::DuplicateKey { key: 2 }));
    query.increment(5, 0)?;
    assert_eq!(query.select(6, 0, &ALL)?[0].values()[1], 50);
    Ok(())
}

#[test]
fn test_locked_record_is_rejected() -> Result<(), DatabaseError> {
    let query = seeded_query()?;
    let rid = query.select(2, 0, &ALL)?[0].rid;

    // Another transaction holds the row exclusively
    assert!(query.lock_manager().try_lock(rid, LockMode::Exclusive));

    assert_eq!(
        query.update(2, &[None, Some(1), None, None, None]),
        Err(DatabaseError::RecordLocked { rid })
    );
    assert_eq!(query.select(2, 0, &ALL), Err(DatabaseError::RecordLocked { rid }));
    assert_eq!(query.delete(2), Err(DatabaseError::RecordLocked { rid }));
    assert!(DatabaseError::RecordLocked { rid }.is_retryable());

    // Other rows are unaffected
    assert_eq!(query.select(3, 0, &ALL)?.len(), 1);

    query.lock_manager().unlock(rid, LockMode::Exclusive);
    query.update(2, &[None, Some(1), None, None, None])?;
    assert_eq!(query.select(2, 0, &ALL)?[0].values()[1], 1);

    Ok(())
}

#[test]
fn test_shared_lock_allows_reads_blocks_writes() -> Result<(), DatabaseError> {
    let query = seeded_query()?;
    let rid = query.select(4, 0, &ALL)?[0].rid;
    assert!(query.lock_manager().try_lock(rid, LockMode::Shared));

    assert_eq!(query.select(4, 0, &ALL)?.len(), 1);
    assert_eq!(query.increment(4, 1), Err(DatabaseError::RecordLocked { rid }));

    query.lock_manager().unlock(rid, LockMode::Shared);
    query.increment(4, 1)?;
    Ok(())
}

#[test]
fn test_secondary_index_select() -> Result<(), DatabaseError> {
    let query = grades_query();
    query.insert(&[1, 7, 0, 0, 0])?;
    query.insert(&[2, 8, 0, 0, 0])?;
    query.insert(&[3, 7, 0, 0, 0])?;

    // No index on column 1 yet
    assert_eq!(
        query.select(7, 1, &ALL),
        Err(DatabaseError::IndexNotFound { column: 1 })
    );

    query.create_index(1)?;
    let keys: Vec<i64> = query
        .select(7, 1, &ALL)?
        .iter()
        .map(|r| r.values()[0])
        .collect();
    assert_eq!(keys, vec![1, 3]);

    // Updates keep the secondary index usable
    query.update(2, &[None, Some(7), None, None, None])?;
    query.update(1, &[None, Some(9), None, None, None])?;
    let keys: Vec<i64> = query
        .select(7, 1, &ALL)?
        .iter()
        .map(|r| r.values()[0])
        .collect();
    assert_eq!(keys, vec![3, 2]);
    assert!(query.select(8, 1, &ALL)?.is_empty());

    query.drop_index(1)?;
    assert!(matches!(
        query.select(7, 1, &ALL),
        Err(DatabaseError::IndexNotFound { column: 1 })
    ));

    Ok(())
}

#[test]
fn test_drop_primary_index() -> Result<(), DatabaseError> {
    let query = seeded_query()?;
    query.drop_index(0)?;

    assert_eq!(query.insert(&[9, 0, 0, 0, 0]), Err(DatabaseError::IndexNotFound { column: 0 }));
    assert_eq!(query.select(1, 0, &ALL), Err(DatabaseError::IndexNotFound { column: 0 }));
    assert_eq!(query.sum(1, 5, 1), Err(DatabaseError::IndexNotFound { column: 0 }));

    // Rebuilding from the directory restores key access
    query.create_index(0)?;
    assert_eq!(query.sum(1, 5, 1)?, 150);

    Ok(())
}

#[test]
fn test_concurrent_inserts_get_unique_rids() -> Result<(), DatabaseError> {
    let query = Arc::new(grades_query());
    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let query = Arc::clone(&query);
            thread::spawn(move || {
                (0..50)
                    .map(|i| query.insert(&[worker * 1000 + i, i, 0, 0, 0]))
                    .collect::<Result<Vec<_>, _>>()
            })
        })
        .collect();

    let mut rids = Vec::new();
    for handle in handles {
        rids.extend(handle.join().expect("worker panicked")?);
    }
    rids.sort_unstable();
    rids.dedup();
    assert_eq!(rids.len(), 200);
    assert_eq!(query.table().read().stats().live_rows, 200);

    Ok(())
}
