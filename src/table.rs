//! Table descriptor and the `Action`/`ResultOption` vocabulary shared by
//! the delta observer and every executor.

use crate::row::ColumnIndex;

///
/// Action
///
/// The DML action a delta event belongs to.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Action {
    Delete,
    Insert,
    Update,
}

impl Action {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
        }
    }
}

///
/// ResultOption
///
/// The row lifecycle snapshot a delta event captures: before the change,
/// after defaults+SET but before triggers, after triggers.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ResultOption {
    Old,
    New,
    Final,
}

///
/// ColumnDescriptor
///

#[derive(Clone, Debug)]
pub struct ColumnDescriptor {
    pub name: String,
    pub ordinal: ColumnIndex,
    pub not_null: bool,
    pub is_identity: bool,
    pub has_default: bool,
    /// `true` when the default expression is a compile-time constant
    /// (`ExpressionEngine::isConstant`) — non-constant defaults are
    /// "interesting" for the generated-keys ALL request.
    pub default_is_constant: bool,
}

///
/// LockingMode
///
/// How the owning row store expects callers to escalate locks around a
/// mutation.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LockingMode {
    RowLocking,
    TableLocking,
}

///
/// TableDescriptor
///
/// Columns, primary key, identity column, and locking mode. Trigger
/// presence/veto behavior is owned by the `RowStore` implementation
/// (`fire`, `fireBeforeRow`, `fireAfterRow` are row-store operations), so
/// this descriptor only carries the data the executors need to reason
/// about columns and keys.
///

#[derive(Clone, Debug)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub primary_key: Option<Vec<ColumnIndex>>,
    pub locking_mode: LockingMode,
}

impl TableDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            name: name.into(),
            columns,
            primary_key: None,
            locking_mode: LockingMode::RowLocking,
        }
    }

    #[must_use]
    pub fn with_primary_key(mut self, pk: Vec<ColumnIndex>) -> Self {
        self.primary_key = Some(pk);
        self
    }

    #[must_use]
    pub const fn column_count(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn identity_column(&self) -> Option<ColumnIndex> {
        self.columns.iter().find(|c| c.is_identity).map(|c| c.ordinal)
    }

    #[must_use]
    pub fn has_identity_column(&self) -> bool {
        self.identity_column().is_some()
    }

    #[must_use]
    pub fn column_by_name(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The columns considered "interesting" for a generated-keys `ALL`
    /// request: identity, primary-key members, and non-constant default
    /// columns.
    #[must_use]
    pub fn interesting_columns(&self) -> Vec<ColumnIndex> {
        let mut cols = Vec::new();
        for col in &self.columns {
            let in_pk = self
                .primary_key
                .as_ref()
                .is_some_and(|pk| pk.contains(&col.ordinal));
            let interesting_default = col.has_default && !col.default_is_constant;
            if col.is_identity || in_pk || interesting_default {
                cols.push(col.ordinal);
            }
        }
        cols.sort_unstable();
        cols.dedup();
        cols
    }
}
