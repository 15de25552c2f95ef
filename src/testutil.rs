//! In-memory `RowStore` reference implementation, used by this crate's own
//! tests and by `tests/scenarios.rs`. Not part of the public contract any
//! real deployment would use — a real row store is an external MVCC engine
//! — but every executor is generic over `RowStore`, so a fake backing store
//! is enough to exercise the full scan/lock/trigger/mutate pipeline.

use crate::{
    error::DmlError,
    row::Row,
    session::Session,
    store::{LockMode, RowStore},
    table::Action,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<u64, Row>>,
    next_id: AtomicU64,
    locked: Mutex<HashSet<u64>>,
    before_row_triggers: Mutex<HashSet<Action>>,
    after_row_triggers: Mutex<HashSet<Action>>,
    veto_before_row: Mutex<HashSet<Action>>,
    veto_statement: Mutex<HashSet<Action>>,
    fire_log: Mutex<Vec<String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row directly, bypassing `add_row`'s trigger plumbing; used
    /// to set up fixtures before exercising an executor.
    pub fn seed(&self, row: Row) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.rows.lock().insert(id, row);
        id
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn with_before_row_trigger(&self, action: Action) {
        self.before_row_triggers.lock().insert(action);
    }

    pub fn with_after_row_trigger(&self, action: Action) {
        self.after_row_triggers.lock().insert(action);
    }

    pub fn veto_before_row_trigger(&self, action: Action) {
        self.before_row_triggers.lock().insert(action);
        self.veto_before_row.lock().insert(action);
    }

    pub fn veto_statement_trigger(&self, action: Action) {
        self.veto_statement.lock().insert(action);
    }

    #[must_use]
    pub fn fire_log(&self) -> Vec<String> {
        self.fire_log.lock().clone()
    }

    /// A `RowSource` over every currently stored row, snapshot at call time.
    #[must_use]
    pub fn scan_all(&self) -> impl FnMut() -> Option<(u64, Row)> {
        let mut remaining: Vec<(u64, Row)> = self
            .rows
            .lock()
            .iter()
            .map(|(id, row)| (*id, row.clone()))
            .collect();
        remaining.sort_by_key(|(id, _)| *id);
        remaining.reverse();
        move || remaining.pop()
    }
}

impl RowStore for MemoryStore {
    type RowPtr = u64;

    fn add_row(&self, _session: &mut dyn Session, row: Row) -> Result<u64, DmlError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.rows.lock().insert(id, row);
        Ok(id)
    }

    fn remove_row(&self, _session: &mut dyn Session, ptr: &u64) -> Result<(), DmlError> {
        self.rows.lock().remove(ptr);
        Ok(())
    }

    fn update_row(&self, _session: &mut dyn Session, old: &u64, new: Row) -> Result<u64, DmlError> {
        self.rows.lock().insert(*old, new);
        Ok(*old)
    }

    fn lock_row(&self, _session: &dyn Session, ptr: &u64) -> Result<(), DmlError> {
        let mut locked = self.locked.lock();
        if locked.contains(ptr) {
            return Err(DmlError::lock_timeout(format!("row {ptr} already locked")));
        }
        locked.insert(*ptr);
        Ok(())
    }

    fn unlock_row(&self, ptr: &u64) {
        self.locked.lock().remove(ptr);
    }

    fn read_row(&self, ptr: &u64) -> Result<Option<Row>, DmlError> {
        Ok(self.rows.lock().get(ptr).cloned())
    }

    fn lock_table(&self, _session: &dyn Session, _mode: LockMode) -> Result<(), DmlError> {
        Ok(())
    }

    fn fire_statement_trigger(
        &self,
        _session: &mut dyn Session,
        action: Action,
        before: bool,
    ) -> Result<bool, DmlError> {
        self.fire_log
            .lock()
            .push(format!("stmt:{}:{before}", action.as_str()));
        Ok(before && self.veto_statement.lock().contains(&action))
    }

    fn fire_before_row(
        &self,
        _session: &mut dyn Session,
        action: Action,
        _old: Option<&Row>,
        _new_row: &mut Row,
    ) -> Result<bool, DmlError> {
        self.fire_log.lock().push(format!("before_row:{}", action.as_str()));
        Ok(self.veto_before_row.lock().contains(&action))
    }

    fn fire_after_row(
        &self,
        _session: &mut dyn Session,
        action: Action,
        _old: Option<&Row>,
        _new_row: Option<&Row>,
        rollback: bool,
    ) -> Result<(), DmlError> {
        self.fire_log
            .lock()
            .push(format!("after_row:{}:{rollback}", action.as_str()));
        Ok(())
    }

    fn has_before_row_trigger(&self, action: Action) -> bool {
        self.before_row_triggers.lock().contains(&action)
    }

    fn has_after_row_trigger(&self, action: Action) -> bool {
        self.after_row_triggers.lock().contains(&action)
    }
}
