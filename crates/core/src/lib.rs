//! Core types for the rowset in-memory table engine.
//!
//! This crate defines the value model (kinds, values, coercion), the row
//! lifecycle vocabulary (states, versions, state masks), and the shared
//! error type. It has no dependencies and is `no_std` + `alloc`.

#![no_std]

extern crate alloc;

pub mod coerce;
pub mod error;
pub mod types;
pub mod value;
pub mod version;

pub use coerce::{coerce, is_coercible};
pub use error::{DeferredViolation, Error, Result};
pub use types::DataKind;
pub use value::{cmp_str_ci, compare_values, Decimal, Value, MAX_DECIMAL_SCALE};
pub use version::{RowState, RowStateMask, RowVersion};

/// Stable per-table row handle.
pub type RowId = usize;

/// Stable per-table record slot handle.
pub type RecordId = usize;
