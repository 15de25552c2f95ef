//! Session contract and a concrete, builder-configured implementation.
//!
//! Session-scoped policy is threaded through every executor call via a
//! fluent builder on `BasicSession`: mode flags are set fluently rather
//! than parsed from a config file, since this subsystem owns no process
//! bootstrap.

use crate::{error::DmlError, row::Value, table::Action};
use std::time::{Duration, Instant};

///
/// Session
///
/// External collaborator: cancellation flag, lock-wait timeout,
/// last-identity setter, permission check, and mode flags. The executors
/// only ever see this trait, never a concrete session type — `Db`/`RowStore`
/// implementations may back it however they like (thread-local, actor
/// mailbox, connection-scoped struct, ...).
///

pub trait Session {
    /// Polled at scan and post-scan granularity; once true, the in-flight
    /// statement must raise `Canceled`.
    fn is_canceled(&self) -> bool;

    /// Row/table lock wait timeout; exceeding it is a `LockTimeout`.
    fn lock_timeout(&self) -> Duration;

    /// `INSERT` with an identity column records the last inserted identity
    /// here when eligible.
    fn set_last_identity(&mut self, value: Value);

    fn last_identity(&self) -> Option<&Value>;

    /// Permission check for the given action on the given table; must fail
    /// with `AccessDenied` before any scan begins.
    fn check_permission(&self, table: &str, action: Action) -> Result<(), DmlError>;

    /// Session mode flag: eligibility gate for `LastIdentity` wrapping.
    fn take_inserted_identity(&self) -> bool;

    fn database_to_upper(&self) -> bool;

    fn database_to_lower(&self) -> bool;
}

///
/// BasicSession
///
/// Reference `Session` implementation, configured fluently. Suitable for
/// embedding, tests, and single-tenant deployments; a multi-connection
/// server would instead implement `Session` per-connection over its own
/// state.
///

#[derive(Debug)]
pub struct BasicSession {
    take_inserted_identity: bool,
    database_to_upper: bool,
    database_to_lower: bool,
    lock_timeout: Duration,
    canceled: bool,
    last_identity: Option<Value>,
    denied_tables: Vec<(String, Action)>,
}

impl Default for BasicSession {
    fn default() -> Self {
        Self::new()
    }
}

impl BasicSession {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            take_inserted_identity: true,
            database_to_upper: false,
            database_to_lower: false,
            lock_timeout: Duration::from_secs(10),
            canceled: false,
            last_identity: None,
            denied_tables: Vec::new(),
        }
    }

    #[must_use]
    pub const fn take_inserted_identity(mut self, enabled: bool) -> Self {
        self.take_inserted_identity = enabled;
        self
    }

    #[must_use]
    pub const fn database_to_upper(mut self, enabled: bool) -> Self {
        self.database_to_upper = enabled;
        self.database_to_lower = false;
        self
    }

    #[must_use]
    pub const fn database_to_lower(mut self, enabled: bool) -> Self {
        self.database_to_lower = enabled;
        self.database_to_upper = false;
        self
    }

    #[must_use]
    pub const fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Deny a specific (table, action) pair; used by tests exercising the
    /// `AccessDenied` path.
    #[must_use]
    pub fn deny(mut self, table: impl Into<String>, action: Action) -> Self {
        self.denied_tables.push((table.into(), action));
        self
    }

    pub fn cancel(&mut self) {
        self.canceled = true;
    }

    #[must_use]
    pub const fn is_canceled_flag(&self) -> bool {
        self.canceled
    }
}

impl Session for BasicSession {
    fn is_canceled(&self) -> bool {
        self.canceled
    }

    fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    fn set_last_identity(&mut self, value: Value) {
        self.last_identity = Some(value);
    }

    fn last_identity(&self) -> Option<&Value> {
        self.last_identity.as_ref()
    }

    fn check_permission(&self, table: &str, action: Action) -> Result<(), DmlError> {
        if self
            .denied_tables
            .iter()
            .any(|(t, a)| t == table && *a == action)
        {
            return Err(DmlError::access_denied(format!(
                "user lacks {} right on table {table}",
                action.as_str()
            )));
        }
        Ok(())
    }

    fn take_inserted_identity(&self) -> bool {
        self.take_inserted_identity
    }

    fn database_to_upper(&self) -> bool {
        self.database_to_upper
    }

    fn database_to_lower(&self) -> bool {
        self.database_to_lower
    }
}

/// A lock-wait deadline derived from a session's configured timeout,
/// consumed by `lock_recheck`.
#[must_use]
pub fn lock_deadline(session: &dyn Session) -> Instant {
    Instant::now() + session.lock_timeout()
}
