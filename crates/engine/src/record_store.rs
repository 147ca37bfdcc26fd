//! Record slot allocation.
//!
//! A record is one column-complete set of values for a row version. The
//! store hands out stable integer ids slab-style; the per-column value
//! vectors live in the columns themselves and are sized to `capacity`.

use alloc::vec::Vec;
use rowset_core::RecordId;

/// Allocator of record slots.
///
/// Allocation never fails; disposing a still-referenced id is caller
/// misuse and leaves the table in an unspecified state.
#[derive(Clone, Debug, Default)]
pub struct RecordStore {
    capacity: usize,
    free: Vec<RecordId>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self {
            capacity: 0,
            free: Vec::new(),
        }
    }

    /// Allocates a slot, recycling a freed id when one exists.
    /// Returns the id and whether the store grew (columns must extend
    /// their value vectors when it did).
    pub fn allocate(&mut self) -> (RecordId, bool) {
        match self.free.pop() {
            Some(id) => (id, false),
            None => {
                let id = self.capacity;
                self.capacity += 1;
                (id, true)
            }
        }
    }

    /// Returns a slot to the free list.
    pub fn dispose(&mut self, id: RecordId) {
        debug_assert!(id < self.capacity);
        self.free.push(id);
    }

    /// Total slots ever allocated (live + free).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently handed out.
    pub fn live(&self) -> usize {
        self.capacity - self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_ids() {
        let mut store = RecordStore::new();
        let (a, grew_a) = store.allocate();
        let (b, grew_b) = store.allocate();
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert!(grew_a && grew_b);
        assert_eq!(store.capacity(), 2);
    }

    #[test]
    fn test_recycling() {
        let mut store = RecordStore::new();
        let (a, _) = store.allocate();
        let (_b, _) = store.allocate();
        store.dispose(a);
        assert_eq!(store.live(), 1);
        let (c, grew) = store.allocate();
        assert_eq!(c, a);
        assert!(!grew);
        assert_eq!(store.capacity(), 2);
    }
}
