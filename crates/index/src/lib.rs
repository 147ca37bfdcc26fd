//! Rowset Index - ordered index structures for the rowset table engine.
//!
//! The central type is `AvlTree`, a height-balanced tree over composite
//! value keys with a `Vec<RowId>` payload per key. Ordering is delegated
//! to a `Comparator`, with `KeyComparator` covering the common case of
//! per-column directions and optional case-insensitive strings.
//!
//! # Example
//!
//! ```rust
//! use rowset_index::{AvlTree, KeyComparator, Order};
//! use rowset_core::Value;
//!
//! let cmp = KeyComparator::new(vec![Order::Asc], false);
//! let mut tree = AvlTree::new(cmp, false);
//! tree.insert(vec![Value::Int64(10)], 0).unwrap();
//! tree.insert(vec![Value::Int64(5)], 1).unwrap();
//!
//! assert_eq!(tree.row_ids(), vec![1, 0]);
//! assert_eq!(tree.get(&vec![Value::Int64(10)]), vec![0]);
//! ```

#![no_std]

extern crate alloc;

pub mod avl;
pub mod comparator;

pub use avl::{AvlTree, IndexError, Iter};
pub use comparator::{Comparator, KeyComparator, Order};
