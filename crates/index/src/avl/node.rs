//! AVL node definitions.

use alloc::vec::Vec;
use rowset_core::RowId;

/// Node identifier in the AVL arena.
pub type NodeId = usize;

/// Sentinel value for null node references.
pub const NIL: NodeId = usize::MAX;

/// A node in the AVL tree.
///
/// Nodes live in the tree's arena and address each other by index, so the
/// tree is a single allocation pool rather than a web of boxed nodes.
#[derive(Clone, Debug)]
pub struct Node<K> {
    /// The key stored in this node.
    pub key: K,
    /// Row IDs associated with the key (one entry for unique trees).
    pub rows: Vec<RowId>,
    /// Left child, or NIL.
    pub left: NodeId,
    /// Right child, or NIL.
    pub right: NodeId,
    /// Height of the subtree rooted here (leaf = 1).
    pub height: u32,
}

impl<K> Node<K> {
    /// Creates a fresh leaf node holding one row.
    pub fn new(key: K, row: RowId) -> Self {
        Self {
            key,
            rows: alloc::vec![row],
            left: NIL,
            right: NIL,
            height: 1,
        }
    }

    /// Resets this node in place for reuse from the free list.
    pub fn reset(&mut self, key: K, row: RowId) {
        self.key = key;
        self.rows.clear();
        self.rows.push(row);
        self.left = NIL;
        self.right = NIL;
        self.height = 1;
    }
}
