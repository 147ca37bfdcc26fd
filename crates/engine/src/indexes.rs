//! Shared index registry.
//!
//! Indexes are cached by structural key and reference-counted, so two
//! logically-equivalent requests share one tree. Unfiltered indexes are
//! maintained incrementally on every committed row transition; filtered
//! indexes are marked dirty and rebuilt lazily, since evaluating the
//! predicate mid-transition would observe half-applied state.

use crate::expr::RowFilter;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;
use rowset_core::Value;
use rowset_index::{AvlTree, KeyComparator, Order};

/// Structural identity of an index.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IndexKey {
    /// Lowercased column names, in key order.
    pub columns: Vec<String>,
    pub orders: Vec<Order>,
    /// Row-state mask bits the index covers.
    pub mask_bits: u8,
    /// Predicate identity, when the index is filtered.
    pub filter: Option<String>,
    /// Whether the tree rejects duplicate keys.
    pub unique: bool,
}

/// One cached index.
pub struct SharedIndex {
    pub tree: AvlTree<Vec<Value>, KeyComparator>,
    pub refs: usize,
    pub dirty: bool,
    pub filter: Option<Rc<dyn RowFilter>>,
}

impl core::fmt::Debug for SharedIndex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SharedIndex")
            .field("keys", &self.tree.len())
            .field("refs", &self.refs)
            .field("dirty", &self.dirty)
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}

/// Registry of shared indexes for one table.
#[derive(Debug, Default)]
pub struct IndexRegistry {
    indexes: HashMap<IndexKey, SharedIndex>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self {
            indexes: HashMap::new(),
        }
    }

    pub fn get(&self, key: &IndexKey) -> Option<&SharedIndex> {
        self.indexes.get(key)
    }

    pub fn get_mut(&mut self, key: &IndexKey) -> Option<&mut SharedIndex> {
        self.indexes.get_mut(key)
    }

    /// Registers a freshly built index with one reference.
    pub fn insert(&mut self, key: IndexKey, index: SharedIndex) {
        self.indexes.insert(key, index);
    }

    /// Takes an additional reference on an existing index.
    pub fn acquire(&mut self, key: &IndexKey) -> bool {
        match self.indexes.get_mut(key) {
            Some(shared) => {
                shared.refs += 1;
                true
            }
            None => false,
        }
    }

    /// Drops a reference; the index is removed when the count hits zero.
    pub fn release(&mut self, key: &IndexKey) {
        if let Some(shared) = self.indexes.get_mut(key) {
            shared.refs -= 1;
            if shared.refs == 0 {
                self.indexes.remove(key);
            }
        }
    }

    /// Visits every unfiltered index for incremental maintenance.
    pub fn for_each_unfiltered<F>(&mut self, mut f: F)
    where
        F: FnMut(&IndexKey, &mut SharedIndex),
    {
        for (key, shared) in self.indexes.iter_mut() {
            if shared.filter.is_none() {
                f(key, shared);
            }
        }
    }

    /// Drops every index whose key covers the (folded) column name.
    pub fn remove_referencing(&mut self, column: &str) {
        self.indexes
            .retain(|key, _| !key.columns.iter().any(|c| c == column));
    }

    /// Marks every filtered index for lazy rebuild.
    pub fn invalidate_filtered(&mut self) {
        for shared in self.indexes.values_mut() {
            if shared.filter.is_some() {
                shared.dirty = true;
            }
        }
    }

    /// Marks every index for rebuild (bulk load, schema change).
    pub fn invalidate_all(&mut self) {
        for shared in self.indexes.values_mut() {
            shared.dirty = true;
        }
    }

    /// Keys of every index currently marked dirty.
    pub fn dirty_keys(&self) -> Vec<IndexKey> {
        self.indexes
            .iter()
            .filter(|(_, s)| s.dirty)
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }
}

/// Builds an empty tree matching a structural key.
pub fn empty_tree(key: &IndexKey, case_insensitive: bool) -> AvlTree<Vec<Value>, KeyComparator> {
    let comparator = KeyComparator::new(key.orders.clone(), case_insensitive);
    AvlTree::new(comparator, key.unique)
}
