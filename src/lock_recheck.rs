//! Lock-and-recheck.
//!
//! The optimizer may have produced non-serializable reads through indexes;
//! rechecking closes the read-modify-write gap without escalating to a
//! table-wide lock.

use crate::{error::DmlError, row::Row, session::Session, store::RowStore};

/// Acquire the row's write lock, re-read it, and re-evaluate `predicate`
/// against the fresh values.
///
/// Returns `Ok(None)` when the row was concurrently deleted or no longer
/// matches the predicate — the candidate is skipped as if it were never
/// scanned, with no collector events and no effect on the returned count.
/// On a successful match the caller holds the row's write lock and must
/// release it itself (via the store) once it is done with the row.
pub fn lock_and_recheck<S: RowStore>(
    store: &S,
    session: &dyn Session,
    ptr: &S::RowPtr,
    predicate: &mut dyn FnMut(&Row) -> bool,
) -> Result<Option<Row>, DmlError> {
    store.lock_row(session, ptr)?;

    let Some(row) = store.read_row(ptr)? else {
        store.unlock_row(ptr);
        return Ok(None);
    };

    if !predicate(&row) {
        store.unlock_row(ptr);
        return Ok(None);
    }

    Ok(Some(row))
}
