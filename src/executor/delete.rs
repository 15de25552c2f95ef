//! DELETE executor.

use super::acquire_table_lock;
use crate::{
    collector::DeltaCollector,
    error::DmlError,
    lock_recheck::lock_and_recheck,
    metrics::{self, ExecKind},
    row::Row,
    scan::{Limit, ScanDriver},
    session::Session,
    store::{RowSource, RowStore},
    table::{Action, ResultOption, TableDescriptor},
};

use super::{ExecResult, PlanSummary};

/// Report what `delete` would do against `table` without scanning or
/// mutating anything.
#[must_use]
pub fn explain<S: RowStore>(store: &S, table: &TableDescriptor) -> PlanSummary {
    PlanSummary::new(store, table, Action::Delete)
}

/// Cancellation is polled every 128 rows while the post-scan passes rescan
/// the victim buffer, and once more at the start of each such pass —
/// distinct from the live scan's own cadence (`scan::ScanDriver`).
const POST_SCAN_CANCEL_INTERVAL: usize = 128;

/// Scan `source` for rows matching `predicate` and buffer every matched row
/// together with its OLD snapshot; only once the scan completes does a
/// separate post-scan pass call `remove_row` for each buffered row, followed
/// by a third pass firing AFTER row triggers (when one is registered).
/// Materializing the victim set before mutating avoids cursor stability
/// issues when the scan uses an index the delete would invalidate.
///
/// `collector` sees the OLD snapshot for every matched row — including ones
/// a BEFORE row trigger subsequently vetoes, since the OLD event precedes
/// the veto check (vetoed rows are still visible to DELETE's OLD table).
///
/// `predicate` re-checks the match after the row's write lock is acquired,
/// closing the read-modify-write gap a non-serializable index scan can
/// leave open.
pub fn delete<S: RowStore>(
    store: &S,
    session: &mut dyn Session,
    table: &TableDescriptor,
    source: impl RowSource<S::RowPtr>,
    limit: Limit,
    predicate: &mut dyn FnMut(&Row) -> bool,
    collector: &mut DeltaCollector,
) -> Result<ExecResult, DmlError> {
    session.check_permission(&table.name, Action::Delete)?;
    metrics::record_exec_start(ExecKind::Delete, &table.name);

    if store.fire_statement_trigger(session, Action::Delete, true)? {
        return Ok(ExecResult::default());
    }

    acquire_table_lock(store, session, table)?;

    let mut driver = ScanDriver::new(source, table.name.clone());
    let mut matched = 0usize;
    let mut victims: Vec<(S::RowPtr, Row)> = Vec::new();

    loop {
        let (ptr, _candidate) = match driver.next_row(session, limit, matched) {
            Ok(Some(row)) => row,
            Ok(None) => break,
            Err(e) => return abort(store, &victims, e),
        };

        let lock_result = lock_and_recheck(store, session, &ptr, predicate);
        if matches!(&lock_result, Err(e) if e.kind == crate::error::ErrorKind::LockTimeout) {
            metrics::record_lock_timeout(&table.name);
        }
        let old_row = match lock_result {
            Ok(Some(row)) => row,
            Ok(None) => continue,
            Err(e) => return abort(store, &victims, e),
        };
        matched += 1;

        if let Err(e) = collector.trigger(session, Action::Delete, ResultOption::Old, &old_row) {
            store.unlock_row(&ptr);
            return abort(store, &victims, e);
        }

        if store.has_before_row_trigger(Action::Delete) {
            let mut scratch = old_row.clone();
            let vetoed = match store.fire_before_row(
                session,
                Action::Delete,
                Some(&old_row),
                &mut scratch,
            ) {
                Ok(v) => v,
                Err(e) => {
                    store.unlock_row(&ptr);
                    return abort(store, &victims, e);
                }
            };
            metrics::record_row_trigger(ExecKind::Delete, &table.name, true, vetoed);
            if vetoed {
                store.unlock_row(&ptr);
                continue;
            }
        }

        victims.push((ptr, old_row));
    }

    if session.is_canceled() {
        metrics::record_canceled(&table.name);
        return abort(store, &victims, DmlError::canceled());
    }

    let mut rows_affected = 0u64;
    for (i, (ptr, _)) in victims.iter().enumerate() {
        if i > 0 && i % POST_SCAN_CANCEL_INTERVAL == 0 && session.is_canceled() {
            metrics::record_canceled(&table.name);
            return abort(store, &victims[i..], DmlError::canceled());
        }
        if let Err(e) = store.remove_row(session, ptr) {
            return abort(store, &victims[i..], e);
        }
        rows_affected += 1;
    }

    if store.has_after_row_trigger(Action::Delete) {
        if session.is_canceled() {
            metrics::record_canceled(&table.name);
            return abort(store, &victims, DmlError::canceled());
        }
        for (ptr, old_row) in &victims {
            if let Err(e) = store.fire_after_row(session, Action::Delete, Some(old_row), None, false) {
                return abort(store, &victims, e);
            }
            metrics::record_row_trigger(ExecKind::Delete, &table.name, false, false);
        }
    }

    unlock_all(store, &victims);

    store.fire_statement_trigger(session, Action::Delete, false)?;
    metrics::record_exec_finish(ExecKind::Delete, &table.name, rows_affected);

    Ok(ExecResult { rows_affected })
}

/// Release every buffered row's write lock; buffered-but-not-yet-applied
/// rows are discarded on error, per the propagation contract.
fn unlock_all<S: RowStore>(store: &S, victims: &[(S::RowPtr, Row)]) {
    for (ptr, _) in victims {
        store.unlock_row(ptr);
    }
}

fn abort<S: RowStore>(
    store: &S,
    victims: &[(S::RowPtr, Row)],
    err: DmlError,
) -> Result<ExecResult, DmlError> {
    unlock_all(store, victims);
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        collector::{factory, new_sink},
        session::BasicSession,
        table::{ColumnDescriptor, LockingMode},
        testutil::MemoryStore,
    };

    fn table() -> TableDescriptor {
        TableDescriptor::new(
            "accounts",
            vec![ColumnDescriptor {
                name: "id".into(),
                ordinal: 0,
                not_null: true,
                is_identity: false,
                has_default: false,
                default_is_constant: false,
            }],
        )
    }

    #[test]
    fn deletes_matching_rows_and_reports_old_rows_via_returning() {
        let store = MemoryStore::new();
        let mut session = BasicSession::new();
        let table = table();

        store.seed(Row::new(vec![crate::row::Value::Int(1)]));
        store.seed(Row::new(vec![crate::row::Value::Int(2)]));

        let sink = new_sink();
        let mut collector = factory::returning(
            &session,
            &table,
            vec![std::sync::Arc::new(|row: &Row| row.get(0).cloned().unwrap())],
            sink.clone(),
        );

        let result = delete(
            &store,
            &mut session,
            &table,
            store.scan_all(),
            None,
            &mut |_row| true,
            &mut collector,
        )
        .unwrap();

        assert_eq!(result.rows_affected, 2);
        assert_eq!(store.row_count(), 0);
        assert_eq!(sink.lock().len(), 2);
    }

    #[test]
    fn vetoed_row_is_still_visible_to_old_table_but_not_deleted() {
        let store = MemoryStore::new();
        store.veto_before_row_trigger(Action::Delete);
        let mut session = BasicSession::new();
        let table = table();

        store.seed(Row::new(vec![crate::row::Value::Int(1)]));

        let sink = new_sink();
        let mut collector =
            factory::data_change_delta_table(&session, &table, sink.clone(), ResultOption::Old);

        let result = delete(
            &store,
            &mut session,
            &table,
            store.scan_all(),
            None,
            &mut |_row| true,
            &mut collector,
        )
        .unwrap();

        assert_eq!(result.rows_affected, 0);
        assert_eq!(store.row_count(), 1);
        assert_eq!(sink.lock().len(), 1);
    }

    #[test]
    fn explain_reports_table_and_trigger_presence_without_touching_rows() {
        let store = MemoryStore::new();
        store.with_after_row_trigger(Action::Delete);
        store.seed(Row::new(vec![crate::row::Value::Int(1)]));

        let table = table();
        let summary = explain(&store, &table);

        assert_eq!(summary.table, "accounts");
        assert_eq!(summary.action, Action::Delete);
        assert!(summary.has_after_row_trigger);
        assert!(!summary.has_before_row_trigger);
        assert_eq!(store.row_count(), 1);
    }

    #[test]
    fn after_row_trigger_fires_once_per_removed_row_in_a_separate_pass() {
        let store = MemoryStore::new();
        store.with_after_row_trigger(Action::Delete);
        let mut session = BasicSession::new();
        let table = table();

        store.seed(Row::new(vec![crate::row::Value::Int(1)]));
        store.seed(Row::new(vec![crate::row::Value::Int(2)]));

        let mut collector = factory::default(&session, &table);

        let result = delete(
            &store,
            &mut session,
            &table,
            store.scan_all(),
            None,
            &mut |_row| true,
            &mut collector,
        )
        .unwrap();

        assert_eq!(result.rows_affected, 2);
        let log = store.fire_log();
        let after_count = log.iter().filter(|l| l.starts_with("after_row")).count();
        assert_eq!(after_count, 2);
    }
}
