//! In-memory relational tables with change tracking.
//!
//! Tables hold typed columns and versioned rows (original, current, and
//! proposed records), enforce unique and foreign-key constraints, and
//! answer filtered, sorted selects through shared balanced-tree indexes.
//! [`TableSet`] groups tables under named relations with delete and
//! update cascades, and merges whole sets schema-first.
//!
//! # Example
//!
//! ```
//! use rowset_engine::{ColumnDef, SortKey, Table};
//! use rowset_core::{DataKind, Result, RowStateMask, RowVersion, Value};
//!
//! fn main() -> Result<()> {
//!     let mut orders = Table::new("orders")?;
//!     orders.add_column(ColumnDef::new("id", DataKind::Int32).auto_increment(1, 1))?;
//!     orders.add_column(ColumnDef::new("customer", DataKind::String))?;
//!     orders.set_primary_key(vec!["id".into()])?;
//!
//!     orders.add_row_values(vec![Value::Null, Value::String("nina".into())])?;
//!     orders.add_row_values(vec![Value::Null, Value::String("marc".into())])?;
//!     orders.accept_changes()?;
//!
//!     let by_name = orders.select(None, &[SortKey::asc("customer")], RowStateMask::LIVE)?;
//!     assert_eq!(
//!         orders.get_value(by_name[0], "customer", RowVersion::Default)?,
//!         Value::String("marc".into())
//!     );
//!     Ok(())
//! }
//! ```

#![no_std]

extern crate alloc;

pub mod column;
pub mod constraint;
pub mod events;
pub mod expr;
mod indexes;
pub mod merge;
mod record_store;
mod relation;
mod row;
mod select;
pub mod set;
pub mod table;

pub use column::{AutoIncrement, ColumnData, ColumnDef};
pub use constraint::{CascadeRule, Constraint, ForeignKeyConstraint, UniqueConstraint};
pub use events::TableEvent;
pub use expr::{ColumnEquals, RowExpr, RowFilter};
pub use merge::{MergeFailure, MergeOptions, MergeReport, MissingSchemaAction};
pub use relation::Relation;
pub use select::SortKey;
pub use set::TableSet;
pub use table::Table;
