//! Error types for the rowset engine.

use crate::types::DataKind;
use crate::value::Value;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// Result type alias for rowset operations.
pub type Result<T> = core::result::Result<T, Error>;

/// A null violation deferred during bulk load, reported at load end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredViolation {
    pub table: String,
    pub column: String,
    pub row: usize,
}

/// Error types for rowset operations.
#[derive(Debug)]
pub enum Error {
    /// Type mismatch or failed coercion.
    TypeMismatch {
        expected: DataKind,
        got: Option<DataKind>,
    },
    /// Value does not fit the target kind's range.
    OutOfRange {
        target: DataKind,
        value: Value,
    },
    /// Null assigned to a non-nullable column.
    NullNotAllowed {
        column: String,
    },
    /// String or bytes value exceeds the column's max length.
    MaxLengthExceeded {
        column: String,
        max_length: usize,
        actual: usize,
    },
    /// Write to a read-only column.
    ReadOnlyColumn {
        column: String,
    },
    /// Unique constraint violation.
    UniquenessViolation {
        constraint: String,
        key: Vec<Value>,
    },
    /// Child rows block a parent delete or key change.
    CascadeBlocked {
        constraint: String,
        message: String,
    },
    /// Child key has no matching parent row.
    ForeignKeyViolation {
        constraint: String,
        key: Vec<Value>,
    },
    /// Requested row version does not exist for the row's state.
    VersionNotFound {
        version: &'static str,
        state: &'static str,
    },
    /// Row is detached or deleted and cannot serve the request.
    RowUnavailable {
        state: &'static str,
    },
    /// Invalid schema definition.
    InvalidSchema {
        message: String,
    },
    /// Duplicate table, column, or constraint name.
    DuplicateName {
        name: String,
    },
    /// Column not found.
    ColumnNotFound {
        table: String,
        column: String,
    },
    /// Table not found.
    TableNotFound {
        name: String,
    },
    /// Constraint not found.
    ConstraintNotFound {
        table: String,
        constraint: String,
    },
    /// Column cannot be removed while referenced.
    ColumnInUse {
        column: String,
        message: String,
    },
    /// Null violations accumulated during a bulk load.
    DeferredViolations {
        violations: Vec<DeferredViolation>,
    },
    /// Invalid operation for the current state.
    InvalidOperation {
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TypeMismatch { expected, got } => match got {
                Some(got) => write!(f, "Type mismatch: expected {:?}, got {:?}", expected, got),
                None => write!(f, "Type mismatch: expected {:?}, got null", expected),
            },
            Error::OutOfRange { target, value } => {
                write!(f, "Value out of range for {:?}: {:?}", target, value)
            }
            Error::NullNotAllowed { column } => {
                write!(f, "Column {} does not allow nulls", column)
            }
            Error::MaxLengthExceeded {
                column,
                max_length,
                actual,
            } => write!(
                f,
                "Column {} limited to {} chars, got {}",
                column, max_length, actual
            ),
            Error::ReadOnlyColumn { column } => {
                write!(f, "Column {} is read-only", column)
            }
            Error::UniquenessViolation { constraint, key } => {
                write!(f, "Unique constraint {} violated by {:?}", constraint, key)
            }
            Error::CascadeBlocked {
                constraint,
                message,
            } => {
                write!(f, "Constraint {} blocks the change: {}", constraint, message)
            }
            Error::ForeignKeyViolation { constraint, key } => {
                write!(
                    f,
                    "Foreign key {} has no parent for key {:?}",
                    constraint, key
                )
            }
            Error::VersionNotFound { version, state } => {
                write!(f, "Row in state {} has no {} version", state, version)
            }
            Error::RowUnavailable { state } => {
                write!(f, "Row in state {} cannot be accessed", state)
            }
            Error::InvalidSchema { message } => {
                write!(f, "Invalid schema: {}", message)
            }
            Error::DuplicateName { name } => {
                write!(f, "Duplicate name: {}", name)
            }
            Error::ColumnNotFound { table, column } => {
                write!(f, "Column {} not found in table {}", column, table)
            }
            Error::TableNotFound { name } => {
                write!(f, "Table not found: {}", name)
            }
            Error::ConstraintNotFound { table, constraint } => {
                write!(f, "Constraint {} not found in table {}", constraint, table)
            }
            Error::ColumnInUse { column, message } => {
                write!(f, "Column {} is in use: {}", column, message)
            }
            Error::DeferredViolations { violations } => {
                write!(f, "{} null violations deferred during load", violations.len())
            }
            Error::InvalidOperation { message } => {
                write!(f, "Invalid operation: {}", message)
            }
        }
    }
}

impl Error {
    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: DataKind, got: Option<DataKind>) -> Self {
        Error::TypeMismatch { expected, got }
    }

    /// Creates an out-of-range error.
    pub fn out_of_range(target: DataKind, value: Value) -> Self {
        Error::OutOfRange { target, value }
    }

    /// Creates a null-not-allowed error.
    pub fn null_not_allowed(column: impl Into<String>) -> Self {
        Error::NullNotAllowed {
            column: column.into(),
        }
    }

    /// Creates a max-length error.
    pub fn max_length_exceeded(
        column: impl Into<String>,
        max_length: usize,
        actual: usize,
    ) -> Self {
        Error::MaxLengthExceeded {
            column: column.into(),
            max_length,
            actual,
        }
    }

    /// Creates a read-only column error.
    pub fn read_only_column(column: impl Into<String>) -> Self {
        Error::ReadOnlyColumn {
            column: column.into(),
        }
    }

    /// Creates a uniqueness violation error.
    pub fn uniqueness_violation(constraint: impl Into<String>, key: Vec<Value>) -> Self {
        Error::UniquenessViolation {
            constraint: constraint.into(),
            key,
        }
    }

    /// Creates a cascade-blocked error.
    pub fn cascade_blocked(constraint: impl Into<String>, message: impl Into<String>) -> Self {
        Error::CascadeBlocked {
            constraint: constraint.into(),
            message: message.into(),
        }
    }

    /// Creates a foreign key violation error.
    pub fn foreign_key_violation(constraint: impl Into<String>, key: Vec<Value>) -> Self {
        Error::ForeignKeyViolation {
            constraint: constraint.into(),
            key,
        }
    }

    /// Creates a version-not-found error.
    pub fn version_not_found(version: &'static str, state: &'static str) -> Self {
        Error::VersionNotFound { version, state }
    }

    /// Creates a row-unavailable error.
    pub fn row_unavailable(state: &'static str) -> Self {
        Error::RowUnavailable { state }
    }

    /// Creates an invalid schema error.
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Error::InvalidSchema {
            message: message.into(),
        }
    }

    /// Creates a duplicate name error.
    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Error::DuplicateName { name: name.into() }
    }

    /// Creates a column not found error.
    pub fn column_not_found(table: impl Into<String>, column: impl Into<String>) -> Self {
        Error::ColumnNotFound {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Creates a table not found error.
    pub fn table_not_found(name: impl Into<String>) -> Self {
        Error::TableNotFound { name: name.into() }
    }

    /// Creates a constraint not found error.
    pub fn constraint_not_found(table: impl Into<String>, constraint: impl Into<String>) -> Self {
        Error::ConstraintNotFound {
            table: table.into(),
            constraint: constraint.into(),
        }
    }

    /// Creates a column-in-use error.
    pub fn column_in_use(column: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ColumnInUse {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation {
            message: message.into(),
        }
    }
}
