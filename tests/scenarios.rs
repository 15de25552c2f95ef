//! End-to-end scenarios exercising the DML executors against
//! `testutil::MemoryStore`, mirroring the six walkthroughs used to validate
//! this crate's behavior during design.

use dml_core::prelude::*;
use dml_core::row::Value;
use dml_core::table::ColumnDescriptor;
use dml_core::testutil::MemoryStore;
use std::sync::Arc;

fn accounts_table() -> TableDescriptor {
    TableDescriptor::new(
        "t",
        vec![
            ColumnDescriptor {
                name: "a".into(),
                ordinal: 0,
                not_null: true,
                is_identity: false,
                has_default: false,
                default_is_constant: false,
            },
            ColumnDescriptor {
                name: "b".into(),
                ordinal: 1,
                not_null: true,
                is_identity: false,
                default_is_constant: false,
                has_default: false,
            },
        ],
    )
    .with_primary_key(vec![0])
}

/// 1. `DELETE FROM T WHERE b>=10 FETCH FIRST 1 ROWS ONLY` with a RETURNING
/// collector projecting `a`.
#[test]
fn scenario_delete_with_fetch_limit_and_returning() {
    let store = MemoryStore::new();
    let mut session = BasicSession::new();
    let table = accounts_table();

    store.seed(Row::new(vec![Value::Int(1), Value::Int(10)]));
    store.seed(Row::new(vec![Value::Int(2), Value::Int(20)]));

    let sink = new_sink();
    let mut collector = dml_core::collector::factory::returning(
        &session,
        &table,
        vec![Arc::new(|row: &Row| row.get(0).cloned().unwrap())],
        sink.clone(),
    );

    let result = delete(
        &store,
        &mut session,
        &table,
        store.scan_all(),
        Some(1),
        &mut |row| matches!(row.get(1), Some(Value::Int(b)) if *b >= 10),
        &mut collector,
    )
    .unwrap();

    assert_eq!(result.rows_affected, 1);
    assert_eq!(store.row_count(), 1);
    let returned = sink.lock();
    assert_eq!(returned.len(), 1);
    assert_eq!(returned[0].get(0), Some(&Value::Int(1)));
}

/// 2. `UPDATE T SET b=b+1 WHERE a=1` with a `DataChangeDeltaTable(NEW)`
/// collector.
#[test]
fn scenario_update_with_new_delta_table() {
    let store = MemoryStore::new();
    let mut session = BasicSession::new();
    let table = accounts_table();

    store.seed(Row::new(vec![Value::Int(1), Value::Int(10)]));
    store.seed(Row::new(vec![Value::Int(2), Value::Int(20)]));

    let sink = new_sink();
    let mut collector =
        dml_core::collector::factory::data_change_delta_table(&session, &table, sink.clone(), ResultOption::New);

    let assignments: Vec<(ColumnIndex, SetExpr)> = vec![(
        1,
        Arc::new(|row: &Row| match row.get(1) {
            Some(Value::Int(v)) => Value::Int(v + 1),
            _ => Value::Null,
        }),
    )];

    let result = update(
        &store,
        &mut session,
        &table,
        store.scan_all(),
        None,
        &mut |row| matches!(row.get(0), Some(Value::Int(1))),
        &assignments,
        &[],
        ConstraintViolationPolicy::Raise,
        &mut collector,
    )
    .unwrap();

    assert_eq!(result.rows_affected, 1);
    let rows = sink.lock();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get(0), Some(&Value::Int(1)));
    assert_eq!(rows[0].get(1), Some(&Value::Int(11)));
}

/// 3. `INSERT INTO I(v) VALUES (7),(8)` with a GeneratedKeys collector
/// selecting `{id}`.
#[test]
fn scenario_insert_with_generated_keys_and_last_identity() {
    let store = MemoryStore::new();
    let mut session = BasicSession::new();
    let table = TableDescriptor::new(
        "i",
        vec![
            ColumnDescriptor {
                name: "id".into(),
                ordinal: 0,
                not_null: true,
                is_identity: true,
                has_default: true,
                default_is_constant: false,
            },
            ColumnDescriptor {
                name: "v".into(),
                ordinal: 1,
                not_null: true,
                is_identity: false,
                has_default: false,
                default_is_constant: false,
            },
        ],
    );

    let resolved =
        resolve_generated_keys(&session, &table, &GeneratedKeysRequest::Names(vec!["id".into()]))
            .unwrap();
    let sink = new_sink();
    let mut collector =
        dml_core::collector::factory::generated_keys(&session, &table, resolved, sink.clone());

    let result = insert(
        &store,
        &mut session,
        &table,
        vec![
            Row::new(vec![Value::Int(1), Value::Int(7)]),
            Row::new(vec![Value::Int(2), Value::Int(8)]),
        ],
        &mut collector,
    )
    .unwrap();

    assert_eq!(result.rows_affected, 2);
    let generated = sink.lock();
    assert_eq!(generated.len(), 2);
    assert_eq!(generated[0].get(0), Some(&Value::Int(1)));
    assert_eq!(generated[1].get(0), Some(&Value::Int(2)));
    assert_eq!(session.last_identity(), Some(&Value::Int(2)));
}

/// 4. `UPDATE T SET a=a WHERE TRUE` — NEW == OLD for every row; no collector
/// events (not even OLD/NEW), count 0.
#[test]
fn scenario_update_no_op_for_every_row() {
    let store = MemoryStore::new();
    let mut session = BasicSession::new();
    let table = accounts_table();

    store.seed(Row::new(vec![Value::Int(1), Value::Int(10)]));
    store.seed(Row::new(vec![Value::Int(2), Value::Int(20)]));

    let sink = new_sink();
    let mut collector =
        dml_core::collector::factory::data_change_delta_table(&session, &table, sink.clone(), ResultOption::Old);

    let assignments: Vec<(ColumnIndex, SetExpr)> =
        vec![(0, Arc::new(|row: &Row| row.get(0).cloned().unwrap()))];

    let result = update(
        &store,
        &mut session,
        &table,
        store.scan_all(),
        None,
        &mut |_row| true,
        &assignments,
        &[],
        ConstraintViolationPolicy::Raise,
        &mut collector,
    )
    .unwrap();

    assert_eq!(result.rows_affected, 0);
    assert!(sink.lock().is_empty());
}

/// 5. `MERGE INTO T USING ... ON a=?` — match routes through UPDATE,
/// no-match routes through INSERT.
#[test]
fn scenario_merge_routes_to_update_or_insert() {
    let store = MemoryStore::new();
    let mut session = BasicSession::new();
    let table = accounts_table();

    let existing = store.seed(Row::new(vec![Value::Int(1), Value::Int(10)]));

    let sink = new_sink();
    let mut collector =
        dml_core::collector::factory::data_change_delta_table(&session, &table, sink.clone(), ResultOption::Final);

    let assignments: Vec<(ColumnIndex, SetExpr)> = vec![(
        1,
        Arc::new(|row: &Row| match row.get(1) {
            Some(Value::Int(v)) => Value::Int(v + 100),
            _ => Value::Null,
        }),
    )];

    let mut find = move |incoming: &Row| -> Option<u64> {
        match incoming.get(0) {
            Some(Value::Int(1)) => Some(existing),
            _ => None,
        }
    };

    let result = merge(
        &store,
        &mut session,
        &table,
        vec![
            Row::new(vec![Value::Int(1), Value::Int(0)]),
            Row::new(vec![Value::Int(3), Value::Int(30)]),
        ],
        &mut find,
        &assignments,
        &[],
        &mut collector,
    )
    .unwrap();

    assert_eq!(result.rows_affected, 2);
    assert_eq!(store.row_count(), 2);
    let final_rows = sink.lock();
    assert_eq!(final_rows.len(), 2);
}

/// 6. `DELETE FROM T` while another session holds a write lock on one row
/// → statement fails with `LockTimeout`. Rolling the already-deleted rows
/// back is the row store's transactional responsibility (out of scope
/// here); this executor's contract is only to stop and propagate the error
/// rather than silently skip the locked row.
#[test]
fn scenario_delete_fails_with_lock_timeout_when_a_row_is_externally_locked() {
    let store = MemoryStore::new();
    let mut session = BasicSession::new();
    let table = accounts_table();

    store.seed(Row::new(vec![Value::Int(1), Value::Int(10)]));
    let locked = store.seed(Row::new(vec![Value::Int(2), Value::Int(20)]));

    // Simulate another session holding this row's write lock.
    store.lock_row(&session, &locked).unwrap();

    let mut collector = dml_core::collector::factory::default(&session, &table);

    let err = delete(
        &store,
        &mut session,
        &table,
        store.scan_all(),
        None,
        &mut |_row| true,
        &mut collector,
    )
    .unwrap_err();

    assert_eq!(err.kind, ErrorKind::LockTimeout);
}
