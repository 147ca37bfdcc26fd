//! Filtered, sorted row selection over cached indexes.

use crate::expr::RowFilter;
use crate::indexes::{empty_tree, IndexKey, SharedIndex};
use crate::table::Table;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use rowset_core::{Result, RowId, RowStateMask};
use rowset_index::Order;

/// One sort component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub order: Order,
}

impl SortKey {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            order: Order::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            order: Order::Desc,
        }
    }
}

impl Table {
    /// Returns rows matching the filter and state mask, ordered by the
    /// sort keys. An empty sort yields collection order via a scan; a
    /// non-empty sort resolves or builds a cached index, so repeated
    /// selects with the same shape share one tree.
    pub fn select(
        &self,
        filter: Option<&Rc<dyn RowFilter>>,
        sort: &[SortKey],
        mask: RowStateMask,
    ) -> Result<Vec<RowId>> {
        if sort.is_empty() {
            return self.scan(filter, mask);
        }
        let mut columns = Vec::with_capacity(sort.len());
        let mut orders = Vec::with_capacity(sort.len());
        for key in sort {
            // Validates the column exists before the key is built.
            self.ordinal(&key.column)?;
            columns.push(Table::fold(&key.column));
            orders.push(key.order);
        }
        let index_key = IndexKey {
            columns,
            orders,
            mask_bits: mask.bits(),
            filter: filter.map(|f| f.key().to_string()),
            unique: false,
        };
        let cached = {
            let registry = self.indexes().borrow();
            match registry.get(&index_key) {
                Some(shared) if !shared.dirty => Some(shared.tree.row_ids()),
                Some(_) => None,
                None => {
                    drop(registry);
                    self.build_index(&index_key, filter)?;
                    None
                }
            }
        };
        if let Some(rows) = cached {
            return Ok(rows);
        }
        self.rebuild_index(&index_key)?;
        let registry = self.indexes().borrow();
        Ok(registry
            .get(&index_key)
            .map(|shared| shared.tree.row_ids())
            .unwrap_or_default())
    }

    /// Collection-order scan used when no sort is requested; also the
    /// reference semantics indexes must agree with.
    pub fn scan(
        &self,
        filter: Option<&Rc<dyn RowFilter>>,
        mask: RowStateMask,
    ) -> Result<Vec<RowId>> {
        let mut out = Vec::new();
        for row in self.attached_rows() {
            let state = self.state(row)?;
            if !mask.contains(state) {
                continue;
            }
            if let Some(f) = filter {
                if !f.matches(self, row) {
                    continue;
                }
            }
            out.push(row);
        }
        Ok(out)
    }

    /// Registers an empty dirty index; `rebuild_index` fills it.
    fn build_index(&self, index_key: &IndexKey, filter: Option<&Rc<dyn RowFilter>>) -> Result<()> {
        let tree = empty_tree(index_key, !self.is_case_sensitive());
        self.indexes().borrow_mut().insert(
            index_key.clone(),
            SharedIndex {
                tree,
                refs: 1,
                dirty: true,
                filter: filter.cloned(),
            },
        );
        Ok(())
    }
}
