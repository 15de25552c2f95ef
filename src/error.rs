//! Error taxonomy for the DML execution core.
//!
//! A single `ErrorKind` enum rather than a two-axis class/origin split:
//! the eight kinds below are already concrete enough that composing them
//! from finer-grained axes would just be indirection.

use std::fmt;
use thiserror::Error as ThisError;

/// Crate-wide result alias; every public entry point returns this.
pub type Result<T> = std::result::Result<T, DmlError>;

///
/// ErrorKind
///
/// The eight abstract error kinds this subsystem can raise.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    AccessDenied,
    InvalidValue,
    ColumnNotFound,
    IntegrityViolation,
    LockTimeout,
    Canceled,
    FormatError,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::AccessDenied => "access_denied",
            Self::InvalidValue => "invalid_value",
            Self::ColumnNotFound => "column_not_found",
            Self::IntegrityViolation => "integrity_violation",
            Self::LockTimeout => "lock_timeout",
            Self::Canceled => "canceled",
            Self::FormatError => "format_error",
            Self::Internal => "internal",
        };
        write!(f, "{label}")
    }
}

///
/// DmlError
///
/// Structured runtime error with a stable kind and an optional fault
/// position, used by the quoted-string and hex decoders to carry the
/// input with `[*]` inserted at the fault position.
///

#[derive(Debug, ThisError)]
#[error("{kind}: {message}")]
pub struct DmlError {
    pub kind: ErrorKind,
    pub message: String,
    pub annotated_input: Option<String>,
}

impl DmlError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            annotated_input: None,
        }
    }

    /// Build a `FormatError` carrying `input` with `[*]` inserted at
    /// `fault_index` (a byte offset).
    #[must_use]
    pub fn format_error(message: impl Into<String>, input: &str, fault_index: usize) -> Self {
        let idx = fault_index.min(input.len());
        let mut annotated = String::with_capacity(input.len() + 3);
        annotated.push_str(&input[..idx]);
        annotated.push_str("[*]");
        annotated.push_str(&input[idx..]);
        Self {
            kind: ErrorKind::FormatError,
            message: message.into(),
            annotated_input: Some(annotated),
        }
    }

    #[must_use]
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AccessDenied, message)
    }

    #[must_use]
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidValue, message)
    }

    #[must_use]
    pub fn column_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ColumnNotFound, message)
    }

    #[must_use]
    pub fn integrity_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IntegrityViolation, message)
    }

    #[must_use]
    pub fn lock_timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::LockTimeout, message)
    }

    #[must_use]
    pub fn canceled() -> Self {
        Self::new(ErrorKind::Canceled, "statement canceled")
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        matches!(self.kind, ErrorKind::Canceled)
    }
}
