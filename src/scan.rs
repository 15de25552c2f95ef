//! Filtered scan driver.

use crate::{error::DmlError, metrics, row::Row, session::Session, store::RowSource};

/// Cancellation is polled every 127 rows while scanning.
const SCAN_CANCEL_INTERVAL: usize = 127;

/// `FETCH` clause resolved to a row limit: `None` means unlimited.
pub type Limit = Option<usize>;

///
/// ScanDriver
///
/// Wraps a planner-provided `RowSource` with fetch-limit and cancellation
/// semantics. Halts when the source is exhausted or
/// `limit.is_some() && count_so_far >= limit`.
///

pub struct ScanDriver<P, Src> {
    source: Src,
    table: String,
    rows_examined: usize,
    _marker: std::marker::PhantomData<P>,
}

impl<P, Src: RowSource<P>> ScanDriver<P, Src> {
    pub fn new(source: Src, table: impl Into<String>) -> Self {
        Self {
            source,
            table: table.into(),
            rows_examined: 0,
            _marker: std::marker::PhantomData,
        }
    }

    /// Pull the next raw candidate, honoring `limit` and cancellation.
    /// Returns `Ok(None)` when the scan should stop (source exhausted or
    /// limit reached); `Err(Canceled)` if the session was canceled.
    pub fn next_row(
        &mut self,
        session: &dyn Session,
        limit: Limit,
        count_so_far: usize,
    ) -> Result<Option<(P, Row)>, DmlError> {
        if let Some(lim) = limit
            && count_so_far >= lim
        {
            return Ok(None);
        }

        self.rows_examined += 1;
        if self.rows_examined % SCAN_CANCEL_INTERVAL == 0 && session.is_canceled() {
            metrics::record_canceled(&self.table);
            return Err(DmlError::canceled());
        }

        let next = self.source.next_candidate();
        if next.is_some() {
            metrics::record_row_scanned(&self.table);
        }
        Ok(next)
    }
}
