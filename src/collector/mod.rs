//! Delta Observer.
//!
//! `DeltaCollector` is a sum type, not a trait-object inheritance chain:
//! fan-out is represented as an explicit variant holding a
//! `Vec<DeltaCollector>` rather than a chain of trait objects, and
//! `LastIdentity` wrapping is construction-site logic in `factory` rather
//! than subclass gymnastics.

use crate::{
    error::DmlError,
    metrics,
    row::{Row, Value},
    session::Session,
    table::{Action, ColumnDescriptor, ResultOption, TableDescriptor},
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Shared result sink a collector projects matching rows into. Plain
/// `Arc<Mutex<Vec<Row>>>` rather than a custom trait: sinks are owned by
/// the current statement and never shared across sessions, so there is no
/// need for anything fancier than a shared buffer.
pub type Sink = Arc<Mutex<Vec<Row>>>;

#[must_use]
pub fn new_sink() -> Sink {
    Arc::new(Mutex::new(Vec::new()))
}

/// A RETURNING projection expression. The expression tree itself is out of
/// scope; "evaluate a fixed expression against the current row" is modeled
/// as a boxed closure, which is what an `ExpressionEngine::evaluate` call
/// ultimately reduces to from this subsystem's point of view.
pub type ReturningExpr = Arc<dyn Fn(&Row) -> Value + Send + Sync>;

///
/// DeltaCollector
///

pub enum DeltaCollector {
    Noop,
    LastIdentity {
        identity_column: ColumnDescriptorOrdinal,
        inner: Box<DeltaCollector>,
    },
    GeneratedKeys {
        indexes: Vec<ColumnDescriptorOrdinal>,
        sink: Sink,
    },
    DataChangeDeltaTable {
        option: ResultOption,
        sink: Sink,
    },
    Returning {
        exprs: Vec<ReturningExpr>,
        sink: Sink,
    },
    Composite(Vec<DeltaCollector>),
}

/// Alias kept distinct from `crate::row::ColumnIndex` purely for call-site
/// readability at the collector boundary; same representation.
pub type ColumnDescriptorOrdinal = crate::row::ColumnIndex;

impl DeltaCollector {
    /// Dispatch one `(action, option, values)` event. OLD < NEW < FINAL
    /// ordering is the caller's responsibility, not this method's — the
    /// collector only reacts to whatever it's handed.
    pub fn trigger(
        &mut self,
        session: &mut dyn Session,
        action: Action,
        option: ResultOption,
        values: &Row,
    ) -> Result<(), DmlError> {
        metrics::record_collector_dispatch(action.into());
        match self {
            Self::Noop => Ok(()),

            Self::LastIdentity {
                identity_column,
                inner,
            } => {
                if action == Action::Insert && option == ResultOption::Final {
                    if let Some(v) = values.get(*identity_column) {
                        session.set_last_identity(v.clone());
                    }
                }
                // LastIdentity observes before any caller-supplied collector,
                // so session.last_identity() is already updated when a user
                // sink fires.
                inner.trigger(session, action, option, values)
            }

            Self::GeneratedKeys { indexes, sink } => {
                if option == ResultOption::Final {
                    let projected = indexes
                        .iter()
                        .map(|&i| values.get(i).cloned().unwrap_or(Value::Null))
                        .collect::<Vec<_>>();
                    sink.lock().push(Row::new(projected));
                }
                Ok(())
            }

            Self::DataChangeDeltaTable { option: want, sink } => {
                if option == *want {
                    sink.lock().push(values.clone());
                }
                Ok(())
            }

            Self::Returning { exprs, sink } => {
                let matches = matches!(
                    (action, option),
                    (Action::Delete, ResultOption::Old)
                        | (Action::Insert | Action::Update, ResultOption::Final)
                );
                if matches {
                    let projected = exprs.iter().map(|f| f(values)).collect::<Vec<_>>();
                    sink.lock().push(Row::new(projected));
                }
                Ok(())
            }

            Self::Composite(children) => {
                // Construction order == dispatch order; no short-circuit.
                for child in children.iter_mut() {
                    child.trigger(session, action, option, values)?;
                }
                Ok(())
            }
        }
    }

    /// Fan-out breadth of a `Composite`; `1` for every other variant, since
    /// they dispatch to exactly one sink of their own.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Composite(children) => children.len(),
            _ => 1,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn eligible_for_last_identity(session: &dyn Session, table: &TableDescriptor) -> bool {
    session.take_inserted_identity() && table.has_identity_column()
}

fn wrap_with_last_identity(
    session: &dyn Session,
    table: &TableDescriptor,
    inner: DeltaCollector,
) -> DeltaCollector {
    if eligible_for_last_identity(session, table) {
        DeltaCollector::LastIdentity {
            identity_column: table
                .identity_column()
                .expect("eligible_for_last_identity checked has_identity_column"),
            inner: Box::new(inner),
        }
    } else {
        inner
    }
}

pub mod factory {
    //! Construction rules: `LastIdentity` composes *in front of* any
    //! caller-supplied collector, transparently to the caller.

    use super::{
        DeltaCollector, ReturningExpr, Sink, TableDescriptor, wrap_with_last_identity,
    };
    use crate::{session::Session, table::ResultOption};

    #[must_use]
    pub fn default(session: &dyn Session, table: &TableDescriptor) -> DeltaCollector {
        wrap_with_last_identity(session, table, DeltaCollector::Noop)
    }

    #[must_use]
    pub fn data_change_delta_table(
        session: &dyn Session,
        table: &TableDescriptor,
        sink: Sink,
        option: ResultOption,
    ) -> DeltaCollector {
        wrap_with_last_identity(
            session,
            table,
            DeltaCollector::DataChangeDeltaTable { option, sink },
        )
    }

    /// `indexes` must already be resolved; an empty vector should be
    /// turned into a `Noop` by the caller (the generated-keys projector),
    /// not handled here.
    #[must_use]
    pub fn generated_keys(
        session: &dyn Session,
        table: &TableDescriptor,
        indexes: Vec<super::ColumnDescriptorOrdinal>,
        sink: Sink,
    ) -> DeltaCollector {
        wrap_with_last_identity(
            session,
            table,
            DeltaCollector::GeneratedKeys { indexes, sink },
        )
    }

    #[must_use]
    pub fn returning(
        session: &dyn Session,
        table: &TableDescriptor,
        exprs: Vec<ReturningExpr>,
        sink: Sink,
    ) -> DeltaCollector {
        wrap_with_last_identity(session, table, DeltaCollector::Returning { exprs, sink })
    }
}
