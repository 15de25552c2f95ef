//! DML execution core: DELETE, UPDATE, INSERT, and MERGE over a row store,
//! with triggers, lock-and-recheck concurrency control, a delta-observer
//! hook for OLD/NEW/FINAL row snapshots, generated-keys projection, and
//! RETURNING.
//!
//! The core never talks to storage directly; it is generic over the
//! [`store::RowStore`] trait, and never evaluates expressions itself —
//! `SET` assignments and `RETURNING` projections are closures the caller
//! builds from its own expression engine. See [`testutil::MemoryStore`] for
//! a reference `RowStore` used by this crate's own tests.

pub mod collector;
pub mod error;
pub mod executor;
pub mod lock_recheck;
pub mod metrics;
pub mod row;
pub mod scan;
pub mod session;
pub mod store;
pub mod strutil;
pub mod table;

pub mod testutil;

pub mod prelude {
    pub use crate::collector::{DeltaCollector, Sink, new_sink};
    pub use crate::error::{DmlError, ErrorKind, Result};
    pub use crate::executor::{
        ConstraintCheck, ConstraintViolationPolicy, ExecResult, GeneratedKeysRequest, PlanSummary,
        SetExpr, delete, insert, merge, resolve_generated_keys, update,
    };
    pub use crate::row::{ColumnIndex, Row, Value};
    pub use crate::session::{BasicSession, Session};
    pub use crate::store::{LockMode, RowSource, RowStore};
    pub use crate::table::{Action, ColumnDescriptor, LockingMode, ResultOption, TableDescriptor};
}
