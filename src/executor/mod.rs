//! DML executors: the statement-level drivers that sit on top of the scan
//! driver, lock-and-recheck, and delta observer.
//!
//! Each one follows the same shape: scan → lock-and-recheck → fire BEFORE
//! row trigger → mutate → fire AFTER row trigger → advance, wrapped by a
//! statement-level BEFORE/AFTER trigger pair and a single table lock
//! acquired up front per the table's locking mode.

pub mod delete;
pub mod generated_keys;
pub mod insert;
pub mod update;

use crate::{
    session::Session,
    store::{LockMode, RowStore},
    table::{LockingMode, TableDescriptor},
};

pub use delete::delete;
pub use generated_keys::{GeneratedKeysRequest, resolve_generated_keys};
pub use insert::{insert, merge};
pub use update::{ConstraintCheck, ConstraintViolationPolicy, SetExpr, update};

/// Outcome of a single DML statement: every executor in this module
/// returns one. Generated keys / RETURNING rows are not carried here —
/// they live in whichever sink the caller's `DeltaCollector` was built
/// around, since the executor itself is agnostic to which collector
/// variant it was handed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ExecResult {
    pub rows_affected: u64,
}

impl ExecResult {
    /// Fail unless the statement affected at least one row.
    pub fn require_any(&self) -> Result<(), crate::error::DmlError> {
        if self.rows_affected == 0 {
            Err(crate::error::DmlError::integrity_violation(
                "statement affected no rows",
            ))
        } else {
            Ok(())
        }
    }
}

fn table_lock_mode(table: &TableDescriptor) -> LockMode {
    match table.locking_mode {
        LockingMode::RowLocking => LockMode::Read,
        LockingMode::TableLocking => LockMode::Write,
    }
}

fn acquire_table_lock<S: RowStore>(
    store: &S,
    session: &dyn Session,
    table: &TableDescriptor,
) -> Result<(), crate::error::DmlError> {
    store.lock_table(session, table_lock_mode(table))
}

/// A dry-run plan summary, for `explain()` entry points that report what a
/// statement would do without executing it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlanSummary {
    pub table: String,
    pub action: crate::table::Action,
    pub lock_mode: String,
    pub has_before_row_trigger: bool,
    pub has_after_row_trigger: bool,
}

impl PlanSummary {
    #[must_use]
    pub fn new<S: RowStore>(store: &S, table: &TableDescriptor, action: crate::table::Action) -> Self {
        Self {
            table: table.name.clone(),
            action,
            lock_mode: format!("{:?}", table_lock_mode(table)),
            has_before_row_trigger: store.has_before_row_trigger(action),
            has_after_row_trigger: store.has_after_row_trigger(action),
        }
    }
}
