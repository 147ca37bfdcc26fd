//! External-collaborator traits for predicates and computed expressions.
//!
//! Filter parsing and expression evaluation live outside the engine; the
//! engine only holds handles and calls back through these traits.

use crate::table::Table;
use alloc::string::String;
use rowset_core::{RowId, Value};

/// A compiled row predicate, used by `select` and filtered indexes.
pub trait RowFilter {
    /// Evaluates the predicate against a row's default-version values.
    fn matches(&self, table: &Table, row: RowId) -> bool;

    /// Stable identity of the predicate, part of the structural index key.
    /// Two filters with the same key must select the same rows.
    fn key(&self) -> &str;
}

/// A computed-column expression, re-evaluated when a row commits.
pub trait RowExpr {
    /// Produces the column value for a row.
    fn evaluate(&self, table: &Table, row: RowId) -> Value;

    /// Source text of the expression, for diagnostics.
    fn text(&self) -> &str;
}

/// A predicate comparing one column against a constant, the common case
/// for tests and simple callers.
pub struct ColumnEquals {
    column: String,
    value: Value,
    key: String,
}

impl ColumnEquals {
    pub fn new(column: impl Into<String>, value: Value) -> Self {
        let column = column.into();
        let key = {
            let mut k = String::new();
            core::fmt::write(&mut k, format_args!("{}={:?}", column, value)).ok();
            k
        };
        Self { column, value, key }
    }
}

impl RowFilter for ColumnEquals {
    fn matches(&self, table: &Table, row: RowId) -> bool {
        match table.get_value(row, &self.column, rowset_core::RowVersion::Default) {
            Ok(v) => v == self.value,
            Err(_) => false,
        }
    }

    fn key(&self) -> &str {
        &self.key
    }
}
