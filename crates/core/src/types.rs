//! Data kind definitions for the rowset engine.
//!
//! This module defines the closed set of kinds a table cell can hold.

/// Storable data kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataKind {
    /// Boolean (true/false)
    Bool,
    /// 8-bit signed integer
    Int8,
    /// 16-bit signed integer
    Int16,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 64-bit floating point
    Float64,
    /// Fixed-point decimal (scaled integer mantissa)
    Decimal,
    /// Single character
    Char,
    /// UTF-8 string
    String,
    /// Date and time stored as Unix timestamp (milliseconds)
    DateTime,
    /// Binary data
    Bytes,
}

impl DataKind {
    /// Returns whether this kind is one of the signed integer widths.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataKind::Int8 | DataKind::Int16 | DataKind::Int32 | DataKind::Int64
        )
    }

    /// Returns whether this kind is numeric (integer, float, or decimal).
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, DataKind::Float64 | DataKind::Decimal)
    }

    /// Returns whether this kind is nullable by default.
    pub fn is_nullable_by_default(&self) -> bool {
        matches!(self, DataKind::Bytes)
    }

    /// Returns whether this kind can be used as an index key.
    pub fn is_indexable(&self) -> bool {
        !matches!(self, DataKind::Bytes)
    }
}
