//! Row / Value model.
//!
//! A `Row` is an ordered array of typed `Value`s, one per table column, with
//! optional hidden values (identity/rowid) appended after user columns.
//! Deliberately small and scalar-only: the scalar kinds below are enough to
//! move values around and evaluate assignments and predicates over them.

use std::fmt;

/// Zero-based index into a `Row`'s value array.
pub type ColumnIndex = usize;

///
/// Value
///
/// A single typed cell. The expression engine and row store are external
/// collaborators, so this subsystem only needs enough of a value model to
/// move values around and compare them for the no-op UPDATE optimization.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Bytes(b) => write!(f, "{}", crate::strutil::hex_encode(b)),
        }
    }
}

///
/// Row
///
/// Ordered sequence of typed values of length *C* (the table's column
/// count). Collectors receive read-only views and never extend row
/// lifetime — enforced here by only ever handing out `&[Value]` to
/// collectors, never an owned, mutable handle.
///

#[derive(Clone, Debug, PartialEq, Default)]
pub struct Row(Vec<Value>);

impl Row {
    #[must_use]
    pub const fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.0
    }

    #[must_use]
    pub fn get(&self, idx: ColumnIndex) -> Option<&Value> {
        self.0.get(idx)
    }

    pub fn set(&mut self, idx: ColumnIndex, value: Value) {
        if idx >= self.0.len() {
            self.0.resize(idx + 1, Value::Null);
        }
        self.0[idx] = value;
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Bitwise column-by-column equality, used for the UPDATE no-op
    /// optimization: when NEW is identical to OLD, the mutation is skipped
    /// entirely.
    #[must_use]
    pub fn same_values_as(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}
