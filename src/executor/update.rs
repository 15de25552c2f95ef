//! UPDATE executor.

use super::acquire_table_lock;
use crate::{
    collector::DeltaCollector,
    error::DmlError,
    lock_recheck::lock_and_recheck,
    metrics::{self, ExecKind},
    row::{ColumnIndex, Row, Value},
    scan::{Limit, ScanDriver},
    session::Session,
    store::{RowSource, RowStore},
    table::{Action, ResultOption, TableDescriptor},
};
use std::sync::Arc;

use super::{ExecResult, PlanSummary};

/// Report what `update` would do against `table` without scanning or
/// mutating anything.
#[must_use]
pub fn explain<S: RowStore>(store: &S, table: &TableDescriptor) -> PlanSummary {
    PlanSummary::new(store, table, Action::Update)
}

/// A single `SET column = expr` assignment. The expression itself is an
/// external collaborator; it is modeled as a closure over
/// the OLD row, mirroring `ReturningExpr` (collector module).
pub type SetExpr = Arc<dyn Fn(&Row) -> Value + Send + Sync>;

/// A CHECK/DOMAIN/type constraint evaluated against a prepared NEW row.
/// NOT NULL is enforced directly off the table's column descriptors;
/// everything else is an external expression-engine collaborator, modeled
/// as a closure the same way `SetExpr`/`ReturningExpr` are.
pub type ConstraintCheck = Arc<dyn Fn(&Row) -> Result<(), DmlError> + Send + Sync>;

/// Whether a constraint violation while preparing NEW aborts the statement
/// (`Raise`, the default for a plain UPDATE) or is tolerated as a per-row
/// skip (`SkipRow`, the mode an UPDATE runs in when it is the fallback path
/// of an ON DUPLICATE KEY INSERT).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConstraintViolationPolicy {
    Raise,
    SkipRow,
}

/// Outcome of preparing a candidate NEW row from OLD plus `assignments`.
pub(crate) enum Prepared {
    Row(Row),
    Skipped,
}

fn enforce_constraints(
    table: &TableDescriptor,
    new_row: &Row,
    checks: &[ConstraintCheck],
) -> Result<(), DmlError> {
    for col in &table.columns {
        if col.not_null && matches!(new_row.get(col.ordinal), None | Some(Value::Null)) {
            return Err(DmlError::invalid_value(format!(
                "column {} is NOT NULL",
                col.name
            )));
        }
    }
    for check in checks {
        check(new_row)?;
    }
    Ok(())
}

/// Copy `old_row`, apply `assignments`, and enforce `checks` (plus NOT NULL)
/// against the result. A violation either raises the normal error or, under
/// `ConstraintViolationPolicy::SkipRow`, reports the row as skipped with no
/// error and no count.
pub(crate) fn prepare_new_row(
    table: &TableDescriptor,
    old_row: &Row,
    assignments: &[(ColumnIndex, SetExpr)],
    checks: &[ConstraintCheck],
    policy: ConstraintViolationPolicy,
) -> Result<Prepared, DmlError> {
    let mut new_row = old_row.clone();
    for (col, expr) in assignments {
        new_row.set(*col, expr(old_row));
    }

    if let Err(e) = enforce_constraints(table, &new_row, checks) {
        return match policy {
            ConstraintViolationPolicy::Raise => Err(e),
            ConstraintViolationPolicy::SkipRow => Ok(Prepared::Skipped),
        };
    }

    Ok(Prepared::Row(new_row))
}

/// Scan, lock-and-recheck, apply `assignments` against the OLD snapshot to
/// produce NEW, and enforce `checks` (plus NOT NULL) against NEW — under
/// `ConstraintViolationPolicy::SkipRow` a violation skips the row instead of
/// aborting the statement. Skip the mutation entirely when NEW is bitwise
/// identical to OLD (no-op optimization — no events, no store call, no row
/// triggers); otherwise fire OLD then NEW, then BEFORE/AFTER row triggers
/// around the store mutation.
#[allow(clippy::too_many_arguments)]
pub fn update<S: RowStore>(
    store: &S,
    session: &mut dyn Session,
    table: &TableDescriptor,
    source: impl RowSource<S::RowPtr>,
    limit: Limit,
    predicate: &mut dyn FnMut(&Row) -> bool,
    assignments: &[(ColumnIndex, SetExpr)],
    checks: &[ConstraintCheck],
    policy: ConstraintViolationPolicy,
    collector: &mut DeltaCollector,
) -> Result<ExecResult, DmlError> {
    session.check_permission(&table.name, Action::Update)?;
    metrics::record_exec_start(ExecKind::Update, &table.name);

    if store.fire_statement_trigger(session, Action::Update, true)? {
        return Ok(ExecResult::default());
    }

    acquire_table_lock(store, session, table)?;

    let mut driver = ScanDriver::new(source, table.name.clone());
    let mut matched = 0usize;
    let mut rows_affected = 0u64;

    while let Some((ptr, _candidate)) = driver.next_row(session, limit, matched)? {
        let lock_result = lock_and_recheck(store, session, &ptr, predicate);
        if matches!(&lock_result, Err(e) if e.kind == crate::error::ErrorKind::LockTimeout) {
            metrics::record_lock_timeout(&table.name);
        }
        let Some(old_row) = lock_result? else {
            continue;
        };
        matched += 1;

        let mut new_row = match prepare_new_row(table, &old_row, assignments, checks, policy) {
            Ok(Prepared::Row(r)) => r,
            Ok(Prepared::Skipped) => {
                store.unlock_row(&ptr);
                continue;
            }
            Err(e) => {
                store.unlock_row(&ptr);
                return Err(e);
            }
        };

        if old_row.same_values_as(&new_row) {
            store.unlock_row(&ptr);
            continue;
        }

        collector.trigger(session, Action::Update, ResultOption::Old, &old_row)?;
        collector.trigger(session, Action::Update, ResultOption::New, &new_row)?;

        if store.has_before_row_trigger(Action::Update) {
            let vetoed =
                store.fire_before_row(session, Action::Update, Some(&old_row), &mut new_row)?;
            metrics::record_row_trigger(ExecKind::Update, &table.name, true, vetoed);
            if vetoed {
                store.unlock_row(&ptr);
                continue;
            }
        }

        let new_ptr = store.update_row(session, &ptr, new_row.clone())?;
        collector.trigger(session, Action::Update, ResultOption::Final, &new_row)?;
        store.fire_after_row(session, Action::Update, Some(&old_row), Some(&new_row), false)?;
        if store.has_after_row_trigger(Action::Update) {
            metrics::record_row_trigger(ExecKind::Update, &table.name, false, false);
        }
        store.unlock_row(&new_ptr);
        rows_affected += 1;
    }

    store.fire_statement_trigger(session, Action::Update, false)?;
    metrics::record_exec_finish(ExecKind::Update, &table.name, rows_affected);

    Ok(ExecResult { rows_affected })
}
