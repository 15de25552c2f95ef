//! INSERT / MERGE executor.
//!
//! MERGE routes each incoming row to the UPDATE path when a matching row
//! already exists, and to the INSERT path otherwise — the same row-trigger
//! and delta-observer plumbing either way, just a different store call.

use super::update::{self, ConstraintCheck, ConstraintViolationPolicy, Prepared, SetExpr};
use crate::{
    collector::DeltaCollector,
    error::DmlError,
    metrics::{self, ExecKind},
    row::{ColumnIndex, Row},
    session::Session,
    store::RowStore,
    table::{Action, ResultOption, TableDescriptor},
};

use super::{ExecResult, PlanSummary};

/// Report what `insert` would do against `table` without touching any rows.
#[must_use]
pub fn explain<S: RowStore>(store: &S, table: &TableDescriptor) -> PlanSummary {
    PlanSummary::new(store, table, Action::Insert)
}

/// Report what `merge` would do against `table` without touching any rows;
/// the match-or-insert routing itself has no static shape to report, so this
/// reflects the UPDATE branch's lock mode and triggers, the same way the
/// UPDATE executor's own `explain` does.
#[must_use]
pub fn explain_merge<S: RowStore>(store: &S, table: &TableDescriptor) -> PlanSummary {
    PlanSummary::new(store, table, Action::Update)
}

/// Insert every row in `rows`, firing `collector` with NEW (after defaults,
/// before triggers) and FINAL (after triggers) snapshots for each one that
/// isn't vetoed by a BEFORE row trigger.
pub fn insert<S: RowStore>(
    store: &S,
    session: &mut dyn Session,
    table: &TableDescriptor,
    rows: impl IntoIterator<Item = Row>,
    collector: &mut DeltaCollector,
) -> Result<ExecResult, DmlError> {
    session.check_permission(&table.name, Action::Insert)?;
    metrics::record_exec_start(ExecKind::Insert, &table.name);

    if store.fire_statement_trigger(session, Action::Insert, true)? {
        return Ok(ExecResult::default());
    }

    let mut rows_affected = 0u64;
    for row in rows {
        if insert_one(store, session, table, row, collector)? {
            rows_affected += 1;
        }
    }

    store.fire_statement_trigger(session, Action::Insert, false)?;
    metrics::record_exec_finish(ExecKind::Insert, &table.name, rows_affected);

    Ok(ExecResult { rows_affected })
}

fn insert_one<S: RowStore>(
    store: &S,
    session: &mut dyn Session,
    table: &TableDescriptor,
    row: Row,
    collector: &mut DeltaCollector,
) -> Result<bool, DmlError> {
    let mut new_row = row;
    collector.trigger(session, Action::Insert, ResultOption::New, &new_row)?;

    if store.has_before_row_trigger(Action::Insert) {
        let vetoed = store.fire_before_row(session, Action::Insert, None, &mut new_row)?;
        metrics::record_row_trigger(ExecKind::Insert, &table.name, true, vetoed);
        if vetoed {
            return Ok(false);
        }
    }

    store.add_row(session, new_row.clone())?;
    collector.trigger(session, Action::Insert, ResultOption::Final, &new_row)?;
    store.fire_after_row(session, Action::Insert, None, Some(&new_row), false)?;
    if store.has_after_row_trigger(Action::Insert) {
        metrics::record_row_trigger(ExecKind::Insert, &table.name, false, false);
    }
    Ok(true)
}

/// For each incoming row, look it up via `find_existing`; when found, apply
/// `assignments_on_match` against the existing row's OLD snapshot (the
/// UPDATE path, including the no-op optimization) — a constraint violation
/// here skips the row rather than aborting the statement, since MERGE's
/// update branch is always the ON DUPLICATE KEY fallback path; otherwise
/// insert it (the INSERT path).
#[allow(clippy::too_many_arguments)]
pub fn merge<S: RowStore>(
    store: &S,
    session: &mut dyn Session,
    table: &TableDescriptor,
    rows: impl IntoIterator<Item = Row>,
    find_existing: &mut dyn FnMut(&Row) -> Option<S::RowPtr>,
    assignments_on_match: &[(ColumnIndex, SetExpr)],
    checks: &[ConstraintCheck],
    collector: &mut DeltaCollector,
) -> Result<ExecResult, DmlError> {
    session.check_permission(&table.name, Action::Update)?;
    session.check_permission(&table.name, Action::Insert)?;
    metrics::record_exec_start(ExecKind::Merge, &table.name);

    let mut rows_affected = 0u64;

    for incoming in rows {
        match find_existing(&incoming) {
            Some(ptr) => {
                if merge_update_one(
                    store,
                    session,
                    table,
                    &ptr,
                    assignments_on_match,
                    checks,
                    collector,
                )? {
                    rows_affected += 1;
                }
            }
            None => {
                if insert_one(store, session, table, incoming, collector)? {
                    rows_affected += 1;
                }
            }
        }
    }

    metrics::record_exec_finish(ExecKind::Merge, &table.name, rows_affected);

    Ok(ExecResult { rows_affected })
}

fn merge_update_one<S: RowStore>(
    store: &S,
    session: &mut dyn Session,
    table: &TableDescriptor,
    ptr: &S::RowPtr,
    assignments: &[(ColumnIndex, SetExpr)],
    checks: &[ConstraintCheck],
    collector: &mut DeltaCollector,
) -> Result<bool, DmlError> {
    store.lock_row(session, ptr)?;
    let Some(old_row) = store.read_row(ptr)? else {
        store.unlock_row(ptr);
        return Ok(false);
    };

    let mut new_row = match update::prepare_new_row(
        table,
        &old_row,
        assignments,
        checks,
        ConstraintViolationPolicy::SkipRow,
    )? {
        Prepared::Row(r) => r,
        Prepared::Skipped => {
            store.unlock_row(ptr);
            return Ok(false);
        }
    };

    if old_row.same_values_as(&new_row) {
        store.unlock_row(ptr);
        return Ok(false);
    }

    collector.trigger(session, Action::Update, ResultOption::Old, &old_row)?;
    collector.trigger(session, Action::Update, ResultOption::New, &new_row)?;

    if store.has_before_row_trigger(Action::Update) {
        let vetoed = store.fire_before_row(session, Action::Update, Some(&old_row), &mut new_row)?;
        metrics::record_row_trigger(ExecKind::Merge, &table.name, true, vetoed);
        if vetoed {
            store.unlock_row(ptr);
            return Ok(false);
        }
    }

    let new_ptr = store.update_row(session, ptr, new_row.clone())?;
    collector.trigger(session, Action::Update, ResultOption::Final, &new_row)?;
    store.fire_after_row(session, Action::Update, Some(&old_row), Some(&new_row), false)?;
    if store.has_after_row_trigger(Action::Update) {
        metrics::record_row_trigger(ExecKind::Merge, &table.name, false, false);
    }
    store.unlock_row(&new_ptr);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        collector::{factory, new_sink},
        row::Value,
        session::BasicSession,
        table::ColumnDescriptor,
        testutil::MemoryStore,
    };
    use std::sync::Arc;

    fn table() -> TableDescriptor {
        TableDescriptor::new(
            "accounts",
            vec![
                ColumnDescriptor {
                    name: "id".into(),
                    ordinal: 0,
                    not_null: true,
                    is_identity: true,
                    has_default: false,
                    default_is_constant: false,
                },
                ColumnDescriptor {
                    name: "balance".into(),
                    ordinal: 1,
                    not_null: true,
                    is_identity: false,
                    has_default: false,
                    default_is_constant: false,
                },
            ],
        )
    }

    #[test]
    fn insert_fires_new_then_final_and_sets_last_identity() {
        let store = MemoryStore::new();
        let mut session = BasicSession::new();
        let table = table();
        let mut collector = factory::default(&session, &table);

        let result = insert(
            &store,
            &mut session,
            &table,
            vec![Row::new(vec![Value::Int(1), Value::Int(50)])],
            &mut collector,
        )
        .unwrap();

        assert_eq!(result.rows_affected, 1);
        assert_eq!(store.row_count(), 1);
        assert_eq!(session.last_identity(), Some(&Value::Int(1)));
    }

    #[test]
    fn merge_updates_existing_row_and_inserts_new_one() {
        let store = MemoryStore::new();
        let mut session = BasicSession::new();
        let table = table();
        let existing_ptr = store.seed(Row::new(vec![Value::Int(1), Value::Int(50)]));

        let sink = new_sink();
        let mut collector =
            factory::data_change_delta_table(&session, &table, sink.clone(), ResultOption::Final);

        let assignments: Vec<(ColumnIndex, SetExpr)> = vec![(
            1,
            Arc::new(|row: &Row| match row.get(1) {
                Some(Value::Int(v)) => Value::Int(v + 1),
                _ => Value::Null,
            }),
        )];

        let mut find = move |incoming: &Row| -> Option<u64> {
            match incoming.get(0) {
                Some(Value::Int(1)) => Some(existing_ptr),
                _ => None,
            }
        };

        let result = merge(
            &store,
            &mut session,
            &table,
            vec![
                Row::new(vec![Value::Int(1), Value::Int(999)]),
                Row::new(vec![Value::Int(2), Value::Int(5)]),
            ],
            &mut find,
            &assignments,
            &[],
            &mut collector,
        )
        .unwrap();

        assert_eq!(result.rows_affected, 2);
        assert_eq!(store.row_count(), 2);
        assert_eq!(sink.lock().len(), 2);
    }

    #[test]
    fn explain_and_explain_merge_report_the_right_action() {
        let store = MemoryStore::new();
        let table = table();

        let insert_summary = explain(&store, &table);
        assert_eq!(insert_summary.action, Action::Insert);

        let merge_summary = explain_merge(&store, &table);
        assert_eq!(merge_summary.action, Action::Update);
        assert_eq!(store.row_count(), 0);
    }

    #[test]
    fn merge_update_branch_skips_row_on_constraint_violation_instead_of_erroring() {
        let store = MemoryStore::new();
        let mut session = BasicSession::new();
        let table = table();
        let existing_ptr = store.seed(Row::new(vec![Value::Int(1), Value::Int(50)]));

        let mut collector = factory::default(&session, &table);

        let assignments: Vec<(ColumnIndex, SetExpr)> = vec![(1, Arc::new(|_row: &Row| Value::Null))];

        let mut find = move |incoming: &Row| -> Option<u64> {
            match incoming.get(0) {
                Some(Value::Int(1)) => Some(existing_ptr),
                _ => None,
            }
        };

        let result = merge(
            &store,
            &mut session,
            &table,
            vec![Row::new(vec![Value::Int(1), Value::Int(999)])],
            &mut find,
            &assignments,
            &[],
            &mut collector,
        )
        .unwrap();

        assert_eq!(result.rows_affected, 0);
        assert_eq!(store.row_count(), 1);
    }
}
