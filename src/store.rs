//! `RowStore` — the external interface this subsystem consumes from the
//! MVCC/row-store collaborator. The core never implements storage; it only
//! ever drives this trait. `testutil::MemoryStore` is a reference
//! implementation used by the crate's own tests.

use crate::{error::DmlError, row::Row, session::Session, table::Action};

/// Table-level lock mode requested via `RowStore::lock_table`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LockMode {
    Read,
    Write,
}

///
/// RowStore
///
/// `RowPtr` is the opaque, stable row identity: stable for the physical
/// lifetime of the row, issued by the store.
///

pub trait RowStore {
    type RowPtr: Clone + Eq + std::hash::Hash + std::fmt::Debug;

    fn add_row(&self, session: &mut dyn Session, row: Row) -> Result<Self::RowPtr, DmlError>;

    fn remove_row(&self, session: &mut dyn Session, ptr: &Self::RowPtr) -> Result<(), DmlError>;

    fn update_row(
        &self,
        session: &mut dyn Session,
        old: &Self::RowPtr,
        new: Row,
    ) -> Result<Self::RowPtr, DmlError>;

    /// Acquire the row's write lock; blocks until acquired or the session's
    /// lock-wait timeout elapses (`LockTimeout`).
    fn lock_row(&self, session: &dyn Session, ptr: &Self::RowPtr) -> Result<(), DmlError>;

    fn unlock_row(&self, ptr: &Self::RowPtr);

    /// Re-read current row bytes; `None` means the row was concurrently
    /// deleted.
    fn read_row(&self, ptr: &Self::RowPtr) -> Result<Option<Row>, DmlError>;

    fn lock_table(&self, session: &dyn Session, mode: LockMode) -> Result<(), DmlError>;

    /// Fire the statement-level (BEFORE/AFTER) trigger for `action`.
    /// Returns `true` if the BEFORE trigger vetoed the statement.
    fn fire_statement_trigger(
        &self,
        session: &mut dyn Session,
        action: Action,
        before: bool,
    ) -> Result<bool, DmlError>;

    /// Fire the row-level BEFORE trigger, if one exists for `action`. May
    /// mutate `new_row` in place; returns `true` if vetoed.
    fn fire_before_row(
        &self,
        session: &mut dyn Session,
        action: Action,
        old: Option<&Row>,
        new_row: &mut Row,
    ) -> Result<bool, DmlError>;

    fn fire_after_row(
        &self,
        session: &mut dyn Session,
        action: Action,
        old: Option<&Row>,
        new_row: Option<&Row>,
        rollback: bool,
    ) -> Result<(), DmlError>;

    fn has_before_row_trigger(&self, action: Action) -> bool;

    fn has_after_row_trigger(&self, action: Action) -> bool;
}

///
/// RowSource
///
/// The scan driver's view of the planner-chosen access path: an
/// iterator of row-store candidates. Produced by the out-of-scope
/// `Planner`/index-selection collaborator; the scan driver only ever pulls
/// from it.
///

pub trait RowSource<P> {
    /// Pull the next raw candidate from the planned access path, or `None`
    /// when the source is exhausted.
    fn next_candidate(&mut self) -> Option<(P, Row)>;
}

impl<P, F: FnMut() -> Option<(P, Row)>> RowSource<P> for F {
    fn next_candidate(&mut self) -> Option<(P, Row)> {
        self()
    }
}
