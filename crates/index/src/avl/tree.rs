//! Arena-based AVL tree mapping keys to row ID lists.

use super::node::{Node, NodeId, NIL};
use crate::comparator::Comparator;
use alloc::vec::Vec;
use core::cmp::Ordering;
use rowset_core::RowId;

/// Error type for index operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexError {
    /// Attempted to insert a duplicate key in a unique index.
    DuplicateKey,
}

impl core::fmt::Display for IndexError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            IndexError::DuplicateKey => write!(f, "Duplicate key in unique index"),
        }
    }
}

/// A height-balanced ordered index.
///
/// Nodes live in an arena and are addressed by index; freed slots are
/// recycled through a free list. Non-unique trees keep a `Vec<RowId>` per
/// key in insertion order, unique trees reject duplicate keys.
#[derive(Clone, Debug)]
pub struct AvlTree<K, C: Comparator<K>> {
    arena: Vec<Node<K>>,
    free: Vec<NodeId>,
    root: NodeId,
    comparator: C,
    unique: bool,
    keys: usize,
    rows: usize,
}

impl<K, C: Comparator<K>> AvlTree<K, C> {
    /// Creates an empty tree with the given comparator.
    pub fn new(comparator: C, unique: bool) -> Self {
        Self {
            arena: Vec::new(),
            free: Vec::new(),
            root: NIL,
            comparator,
            unique,
            keys: 0,
            rows: 0,
        }
    }

    /// Returns the comparator.
    pub fn comparator(&self) -> &C {
        &self.comparator
    }

    /// Returns whether this tree rejects duplicate keys.
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.keys
    }

    /// Returns the total number of row entries.
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Returns true if the tree holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys == 0
    }

    /// Removes all entries, keeping allocated capacity.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.free.clear();
        self.root = NIL;
        self.keys = 0;
        self.rows = 0;
    }

    /// Inserts a row under the given key.
    ///
    /// On a unique tree an existing key yields `DuplicateKey` and the tree
    /// is left unchanged.
    pub fn insert(&mut self, key: K, row: RowId) -> Result<(), IndexError> {
        let root = self.root;
        let new_root = self.insert_at(root, key, row)?;
        self.root = new_root;
        self.rows += 1;
        Ok(())
    }

    /// Removes entries for a key.
    ///
    /// With `Some(row)` only that row is removed (the key disappears when
    /// its last row goes); with `None` the whole key is removed. Returns
    /// the number of row entries removed.
    pub fn remove(&mut self, key: &K, row: Option<RowId>) -> usize {
        let mut removed = 0;
        let root = self.root;
        self.root = self.remove_at(root, key, row, &mut removed);
        self.rows -= removed;
        removed
    }

    /// Returns the rows stored under a key.
    pub fn get(&self, key: &K) -> Vec<RowId> {
        let mut id = self.root;
        while id != NIL {
            match self.comparator.compare(key, &self.arena[id].key) {
                Ordering::Less => id = self.arena[id].left,
                Ordering::Greater => id = self.arena[id].right,
                Ordering::Equal => return self.arena[id].rows.clone(),
            }
        }
        Vec::new()
    }

    /// Returns whether the key is present.
    pub fn contains_key(&self, key: &K) -> bool {
        let mut id = self.root;
        while id != NIL {
            match self.comparator.compare(key, &self.arena[id].key) {
                Ordering::Less => id = self.arena[id].left,
                Ordering::Greater => id = self.arena[id].right,
                Ordering::Equal => return true,
            }
        }
        false
    }

    /// Returns all rows whose key matches a leading-component prefix,
    /// in key order.
    pub fn get_prefix(&self, prefix: &K) -> Vec<RowId> {
        let mut out = Vec::new();
        self.collect_prefix(self.root, prefix, &mut out);
        out
    }

    /// Returns the smallest key and its rows.
    pub fn first(&self) -> Option<(&K, &[RowId])> {
        if self.root == NIL {
            return None;
        }
        let mut id = self.root;
        while self.arena[id].left != NIL {
            id = self.arena[id].left;
        }
        Some((&self.arena[id].key, &self.arena[id].rows))
    }

    /// Returns the largest key and its rows.
    pub fn last(&self) -> Option<(&K, &[RowId])> {
        if self.root == NIL {
            return None;
        }
        let mut id = self.root;
        while self.arena[id].right != NIL {
            id = self.arena[id].right;
        }
        Some((&self.arena[id].key, &self.arena[id].rows))
    }

    /// In-order iterator over `(key, rows)` pairs.
    pub fn iter(&self) -> Iter<'_, K> {
        let mut iter = Iter {
            arena: &self.arena,
            stack: Vec::new(),
        };
        iter.push_left(self.root);
        iter
    }

    /// All row IDs in key order.
    pub fn row_ids(&self) -> Vec<RowId> {
        let mut out = Vec::with_capacity(self.rows);
        for (_, rows) in self.iter() {
            out.extend_from_slice(rows);
        }
        out
    }

    fn alloc(&mut self, key: K, row: RowId) -> NodeId {
        self.keys += 1;
        match self.free.pop() {
            Some(id) => {
                self.arena[id].reset(key, row);
                id
            }
            None => {
                self.arena.push(Node::new(key, row));
                self.arena.len() - 1
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        self.keys -= 1;
        self.arena[id].rows.clear();
        self.free.push(id);
    }

    fn height(&self, id: NodeId) -> u32 {
        if id == NIL {
            0
        } else {
            self.arena[id].height
        }
    }

    fn update_height(&mut self, id: NodeId) {
        let h = 1 + self
            .height(self.arena[id].left)
            .max(self.height(self.arena[id].right));
        self.arena[id].height = h;
    }

    fn balance_factor(&self, id: NodeId) -> i32 {
        self.height(self.arena[id].left) as i32 - self.height(self.arena[id].right) as i32
    }

    fn rotate_right(&mut self, id: NodeId) -> NodeId {
        let l = self.arena[id].left;
        self.arena[id].left = self.arena[l].right;
        self.arena[l].right = id;
        self.update_height(id);
        self.update_height(l);
        l
    }

    fn rotate_left(&mut self, id: NodeId) -> NodeId {
        let r = self.arena[id].right;
        self.arena[id].right = self.arena[r].left;
        self.arena[r].left = id;
        self.update_height(id);
        self.update_height(r);
        r
    }

    fn rebalance(&mut self, id: NodeId) -> NodeId {
        self.update_height(id);
        let bf = self.balance_factor(id);
        if bf > 1 {
            let l = self.arena[id].left;
            if self.balance_factor(l) < 0 {
                let nl = self.rotate_left(l);
                self.arena[id].left = nl;
            }
            self.rotate_right(id)
        } else if bf < -1 {
            let r = self.arena[id].right;
            if self.balance_factor(r) > 0 {
                let nr = self.rotate_right(r);
                self.arena[id].right = nr;
            }
            self.rotate_left(id)
        } else {
            id
        }
    }

    fn insert_at(&mut self, id: NodeId, key: K, row: RowId) -> Result<NodeId, IndexError> {
        if id == NIL {
            return Ok(self.alloc(key, row));
        }
        match self.comparator.compare(&key, &self.arena[id].key) {
            Ordering::Equal => {
                if self.unique {
                    return Err(IndexError::DuplicateKey);
                }
                self.arena[id].rows.push(row);
                Ok(id)
            }
            Ordering::Less => {
                let left = self.arena[id].left;
                let new_left = self.insert_at(left, key, row)?;
                self.arena[id].left = new_left;
                Ok(self.rebalance(id))
            }
            Ordering::Greater => {
                let right = self.arena[id].right;
                let new_right = self.insert_at(right, key, row)?;
                self.arena[id].right = new_right;
                Ok(self.rebalance(id))
            }
        }
    }

    fn remove_at(
        &mut self,
        id: NodeId,
        key: &K,
        row: Option<RowId>,
        removed: &mut usize,
    ) -> NodeId {
        if id == NIL {
            return NIL;
        }
        match self.comparator.compare(key, &self.arena[id].key) {
            Ordering::Less => {
                let left = self.arena[id].left;
                let new_left = self.remove_at(left, key, row, removed);
                self.arena[id].left = new_left;
                self.rebalance(id)
            }
            Ordering::Greater => {
                let right = self.arena[id].right;
                let new_right = self.remove_at(right, key, row, removed);
                self.arena[id].right = new_right;
                self.rebalance(id)
            }
            Ordering::Equal => {
                if let Some(r) = row {
                    let rows = &mut self.arena[id].rows;
                    let before = rows.len();
                    rows.retain(|&x| x != r);
                    *removed += before - rows.len();
                    if !self.arena[id].rows.is_empty() {
                        return id;
                    }
                } else {
                    *removed += self.arena[id].rows.len();
                }
                self.unlink(id)
            }
        }
    }

    /// Removes node `id` from the tree structure and returns the subtree
    /// that replaces it.
    fn unlink(&mut self, id: NodeId) -> NodeId {
        let left = self.arena[id].left;
        let right = self.arena[id].right;
        if left == NIL || right == NIL {
            let child = if left == NIL { right } else { left };
            self.release(id);
            child
        } else {
            // Two children: pull up the in-order predecessor's payload.
            let (new_left, pred) = self.detach_max(left);
            self.swap_payload(id, pred);
            self.release(pred);
            self.arena[id].left = new_left;
            self.rebalance(id)
        }
    }

    /// Structurally detaches the maximum node of a subtree, returning the
    /// rebalanced subtree root and the detached node's id. The detached
    /// node keeps its payload and must be released by the caller.
    fn detach_max(&mut self, id: NodeId) -> (NodeId, NodeId) {
        let right = self.arena[id].right;
        if right == NIL {
            (self.arena[id].left, id)
        } else {
            let (new_right, max) = self.detach_max(right);
            self.arena[id].right = new_right;
            (self.rebalance(id), max)
        }
    }

    fn swap_payload(&mut self, a: NodeId, b: NodeId) {
        debug_assert_ne!(a, b);
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (head, tail) = self.arena.split_at_mut(hi);
        let x = &mut head[lo];
        let y = &mut tail[0];
        core::mem::swap(&mut x.key, &mut y.key);
        core::mem::swap(&mut x.rows, &mut y.rows);
    }

    fn collect_prefix(&self, id: NodeId, prefix: &K, out: &mut Vec<RowId>) {
        if id == NIL {
            return;
        }
        match self.comparator.compare_prefix(&self.arena[id].key, prefix) {
            Ordering::Less => self.collect_prefix(self.arena[id].right, prefix, out),
            Ordering::Greater => self.collect_prefix(self.arena[id].left, prefix, out),
            Ordering::Equal => {
                self.collect_prefix(self.arena[id].left, prefix, out);
                out.extend_from_slice(&self.arena[id].rows);
                self.collect_prefix(self.arena[id].right, prefix, out);
            }
        }
    }
}

/// Stack-based in-order iterator.
pub struct Iter<'a, K> {
    arena: &'a [Node<K>],
    stack: Vec<NodeId>,
}

impl<'a, K> Iter<'a, K> {
    fn push_left(&mut self, mut id: NodeId) {
        while id != NIL {
            self.stack.push(id);
            id = self.arena[id].left;
        }
    }
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = (&'a K, &'a [RowId]);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = &self.arena[id];
        self.push_left(node.right);
        Some((&node.key, node.rows.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::{KeyComparator, Order};
    use alloc::vec;
    use rowset_core::Value;

    fn key(v: i64) -> Vec<Value> {
        vec![Value::Int64(v)]
    }

    fn tree(unique: bool) -> AvlTree<Vec<Value>, KeyComparator> {
        AvlTree::new(KeyComparator::ascending(1, false), unique)
    }

    #[test]
    fn test_insert_and_get() {
        let mut t = tree(false);
        t.insert(key(10), 100).unwrap();
        t.insert(key(20), 200).unwrap();
        t.insert(key(5), 50).unwrap();

        assert_eq!(t.get(&key(10)), vec![100]);
        assert_eq!(t.get(&key(20)), vec![200]);
        assert_eq!(t.get(&key(99)), Vec::<RowId>::new());
        assert_eq!(t.len(), 3);
        assert_eq!(t.row_count(), 3);
    }

    #[test]
    fn test_duplicate_rows_non_unique() {
        let mut t = tree(false);
        t.insert(key(1), 10).unwrap();
        t.insert(key(1), 11).unwrap();
        t.insert(key(1), 12).unwrap();
        assert_eq!(t.get(&key(1)), vec![10, 11, 12]);
        assert_eq!(t.len(), 1);
        assert_eq!(t.row_count(), 3);
    }

    #[test]
    fn test_unique_rejects_duplicates() {
        let mut t = tree(true);
        t.insert(key(1), 10).unwrap();
        assert_eq!(t.insert(key(1), 11), Err(IndexError::DuplicateKey));
        // Unchanged after the failed insert
        assert_eq!(t.get(&key(1)), vec![10]);
        assert_eq!(t.row_count(), 1);
    }

    #[test]
    fn test_in_order_after_ascending_inserts() {
        let mut t = tree(false);
        for i in 0..100 {
            t.insert(key(i), i as RowId).unwrap();
        }
        let ids = t.row_ids();
        assert_eq!(ids, (0..100).collect::<Vec<_>>());
        assert_eq!(t.first().map(|(k, _)| k.clone()), Some(key(0)));
        assert_eq!(t.last().map(|(k, _)| k.clone()), Some(key(99)));
    }

    #[test]
    fn test_in_order_after_descending_inserts() {
        let mut t = tree(false);
        for i in (0..100).rev() {
            t.insert(key(i), i as RowId).unwrap();
        }
        assert_eq!(t.row_ids(), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_remove_specific_row() {
        let mut t = tree(false);
        t.insert(key(1), 10).unwrap();
        t.insert(key(1), 11).unwrap();

        assert_eq!(t.remove(&key(1), Some(10)), 1);
        assert_eq!(t.get(&key(1)), vec![11]);
        assert_eq!(t.len(), 1);

        // Last row removes the key
        assert_eq!(t.remove(&key(1), Some(11)), 1);
        assert!(!t.contains_key(&key(1)));
        assert_eq!(t.len(), 0);
    }

    #[test]
    fn test_remove_whole_key() {
        let mut t = tree(false);
        t.insert(key(1), 10).unwrap();
        t.insert(key(1), 11).unwrap();
        t.insert(key(2), 20).unwrap();

        assert_eq!(t.remove(&key(1), None), 2);
        assert_eq!(t.len(), 1);
        assert_eq!(t.row_count(), 1);
        assert_eq!(t.remove(&key(9), None), 0);
    }

    #[test]
    fn test_remove_internal_nodes() {
        let mut t = tree(false);
        for i in 0..50 {
            t.insert(key(i), i as RowId).unwrap();
        }
        // Remove every other key, including interior ones
        for i in (0..50).step_by(2) {
            assert_eq!(t.remove(&key(i), None), 1);
        }
        let expected: Vec<RowId> = (0..50).filter(|i| i % 2 == 1).collect();
        assert_eq!(t.row_ids(), expected);
    }

    #[test]
    fn test_arena_slot_reuse() {
        let mut t = tree(false);
        for i in 0..10 {
            t.insert(key(i), i as RowId).unwrap();
        }
        for i in 0..10 {
            t.remove(&key(i), None);
        }
        let slots = t.arena.len();
        for i in 10..20 {
            t.insert(key(i), i as RowId).unwrap();
        }
        assert_eq!(t.arena.len(), slots);
    }

    #[test]
    fn test_descending_order() {
        let cmp = KeyComparator::new(vec![Order::Desc], false);
        let mut t = AvlTree::new(cmp, false);
        for i in 0..10 {
            t.insert(key(i), i as RowId).unwrap();
        }
        assert_eq!(t.row_ids(), (0..10).rev().collect::<Vec<_>>());
    }

    #[test]
    fn test_prefix_scan() {
        let cmp = KeyComparator::ascending(2, false);
        let mut t = AvlTree::new(cmp, false);
        t.insert(vec![Value::Int64(1), Value::Int64(1)], 11).unwrap();
        t.insert(vec![Value::Int64(1), Value::Int64(2)], 12).unwrap();
        t.insert(vec![Value::Int64(2), Value::Int64(1)], 21).unwrap();

        assert_eq!(t.get_prefix(&key(1)), vec![11, 12]);
        assert_eq!(t.get_prefix(&key(2)), vec![21]);
        assert_eq!(t.get_prefix(&key(3)), Vec::<RowId>::new());
    }

    #[test]
    fn test_clear() {
        let mut t = tree(false);
        t.insert(key(1), 1).unwrap();
        t.insert(key(2), 2).unwrap();
        t.clear();
        assert!(t.is_empty());
        assert_eq!(t.row_count(), 0);
        t.insert(key(3), 3).unwrap();
        assert_eq!(t.row_ids(), vec![3]);
    }

    #[test]
    fn test_height_stays_logarithmic() {
        let mut t = tree(false);
        for i in 0..1024 {
            t.insert(key(i), i as RowId).unwrap();
        }
        // A balanced tree of 1024 keys must stay well under 1.44*log2(n)+2
        let root_height = t.arena[t.root].height;
        assert!(root_height <= 16, "height {} too large", root_height);
    }
}
