//! Metrics/tracing bridge.
//!
//! Executor logic never talks to `tracing`/`metrics` macros directly except
//! through the free functions here — this module is the only allowed bridge
//! between execution logic and the process-wide telemetry backends, the same
//! separation a `MetricsSink` boundary enforces elsewhere.

use crate::table::Action;

/// Which executor a metrics/tracing event belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ExecKind {
    Delete,
    Update,
    Insert,
    Merge,
}

impl ExecKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Update => "update",
            Self::Insert => "insert",
            Self::Merge => "merge",
        }
    }
}

impl From<Action> for ExecKind {
    fn from(action: Action) -> Self {
        match action {
            Action::Delete => Self::Delete,
            Action::Update => Self::Update,
            Action::Insert => Self::Insert,
        }
    }
}

/// A statement started executing against `table`.
pub fn record_exec_start(kind: ExecKind, table: &str) {
    tracing::debug!(table, kind = kind.as_str(), "statement started");
    metrics::counter!("dml_exec_calls_total", "table" => table.to_string(), "kind" => kind.as_str())
        .increment(1);
}

/// A statement finished, having affected `rows_affected` rows.
pub fn record_exec_finish(kind: ExecKind, table: &str, rows_affected: u64) {
    tracing::debug!(table, kind = kind.as_str(), rows_affected, "statement finished");
    metrics::counter!("dml_rows_affected_total", "table" => table.to_string(), "kind" => kind.as_str())
        .increment(rows_affected);
}

/// The scan driver pulled another candidate row off the source.
pub fn record_row_scanned(table: &str) {
    metrics::counter!("dml_rows_scanned_total", "table" => table.to_string()).increment(1);
}

/// The in-flight statement observed cancellation during a scan.
pub fn record_canceled(table: &str) {
    tracing::warn!(table, "statement canceled");
    metrics::counter!("dml_canceled_total", "table" => table.to_string()).increment(1);
}

/// A row's write lock could not be acquired before the session's lock-wait
/// timeout elapsed.
pub fn record_lock_timeout(table: &str) {
    tracing::warn!(table, "row lock wait timed out");
    metrics::counter!("dml_lock_timeouts_total", "table" => table.to_string()).increment(1);
}

/// A row-level BEFORE/AFTER trigger fired; `vetoed` only applies to BEFORE.
pub fn record_row_trigger(kind: ExecKind, table: &str, before: bool, vetoed: bool) {
    tracing::debug!(table, kind = kind.as_str(), before, vetoed, "row trigger fired");
    metrics::counter!("dml_row_triggers_total", "table" => table.to_string(), "kind" => kind.as_str())
        .increment(1);
}

/// A delta collector dispatched one OLD/NEW/FINAL event.
pub fn record_collector_dispatch(kind: ExecKind) {
    metrics::counter!("dml_collector_dispatches_total", "kind" => kind.as_str()).increment(1);
}
