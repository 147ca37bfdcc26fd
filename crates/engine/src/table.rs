//! Tables: columns, the row arena, constraints, and the index registry.

use crate::column::{ColumnData, ColumnDef};
use crate::constraint::{Constraint, UniqueConstraint};
use crate::events::{Listeners, TableEvent};
use crate::indexes::{empty_tree, IndexKey, IndexRegistry, SharedIndex};
use crate::row::Row;
use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;
use hashbrown::HashMap;
use rowset_core::{
    compare_values, DeferredViolation, Error, RecordId, Result, RowId, RowState, RowStateMask,
    RowVersion, Value,
};
use rowset_index::Order;

/// Validates a table/column/constraint name: a letter or underscore
/// followed by letters, digits, or underscores.
pub(crate) fn check_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) => c.is_alphabetic() || c == '_',
        None => false,
    };
    if valid && chars.all(|c| c.is_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(Error::invalid_schema(alloc::format!(
            "invalid name: {:?}",
            name
        )))
    }
}

fn fold_name(name: &str) -> String {
    name.chars().flat_map(char::to_lowercase).collect()
}

/// An in-memory table.
pub struct Table {
    name: String,
    case_sensitive: bool,
    columns: Vec<ColumnData>,
    column_lookup: HashMap<String, usize>,
    records: crate::record_store::RecordStore,
    rows: Vec<Option<Row>>,
    free_rows: Vec<RowId>,
    order: Vec<RowId>,
    constraints: Vec<Constraint>,
    indexes: RefCell<IndexRegistry>,
    listeners: Listeners,
    loading: bool,
}

impl core::fmt::Debug for Table {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("columns", &self.columns.len())
            .field("rows", &self.row_count())
            .field("records", &self.records.live())
            .field("constraints", &self.constraints.len())
            .field("indexes", &self.indexes.borrow().len())
            .finish()
    }
}

impl Table {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        check_name(&name)?;
        Ok(Self {
            name,
            case_sensitive: false,
            columns: Vec::new(),
            column_lookup: HashMap::new(),
            records: crate::record_store::RecordStore::new(),
            rows: Vec::new(),
            free_rows: Vec::new(),
            order: Vec::new(),
            constraints: Vec::new(),
            indexes: RefCell::new(IndexRegistry::new()),
            listeners: Listeners::new(),
            loading: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Switches string comparison. Unfiltered indexes are rebuilt under
    /// the new folding right away; a uniqueness violation surfacing from
    /// the rebuild means existing keys collide under the new comparison,
    /// and the affected index stays dirty until the data is corrected.
    pub fn set_case_sensitive(&mut self, case_sensitive: bool) -> Result<()> {
        if self.case_sensitive == case_sensitive {
            return Ok(());
        }
        self.case_sensitive = case_sensitive;
        self.indexes.borrow_mut().invalidate_all();
        let dirty = self.indexes.borrow().dirty_keys();
        for key in dirty {
            if key.filter.is_none() {
                self.rebuild_index(&key)?;
            }
        }
        Ok(())
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Registers a structural-change listener.
    pub fn on_change(&mut self, callback: Box<dyn Fn(&TableEvent)>) {
        self.listeners.register(callback);
    }

    fn notify(&self, event: TableEvent) {
        self.listeners.notify(&event);
    }

    // ---- columns ----------------------------------------------------

    pub fn add_column(&mut self, def: ColumnDef) -> Result<usize> {
        check_name(&def.name)?;
        let key = fold_name(&def.name);
        if self.column_lookup.contains_key(&key) {
            return Err(Error::duplicate_name(&def.name));
        }
        if !self.order.is_empty()
            && !def.nullable
            && def.default.is_null()
            && def.auto_increment.is_none()
        {
            return Err(Error::invalid_operation(alloc::format!(
                "cannot add non-nullable column {} without a default to a populated table",
                def.name
            )));
        }
        let name = def.name.clone();
        let mut column = ColumnData::new(def);
        column.ensure_capacity(self.records.capacity());
        let ordinal = self.columns.len();
        self.columns.push(column);
        self.column_lookup.insert(key, ordinal);
        self.notify(TableEvent::ColumnAdded(name));
        Ok(ordinal)
    }

    pub fn remove_column(&mut self, name: &str) -> Result<ColumnDef> {
        let ordinal = self.ordinal(name)?;
        let column_name = self.columns[ordinal].name().to_string();
        for constraint in &self.constraints {
            if constraint
                .local_columns()
                .iter()
                .any(|c| fold_name(c) == fold_name(&column_name))
            {
                return Err(Error::column_in_use(
                    &column_name,
                    alloc::format!("referenced by constraint {}", constraint.name()),
                ));
            }
        }
        let removed = self.columns.remove(ordinal);
        self.column_lookup.clear();
        for (i, col) in self.columns.iter().enumerate() {
            self.column_lookup.insert(fold_name(col.name()), i);
        }
        {
            // Indexes keyed on surviving columns are untouched; their key
            // values do not change. Filters may read the column, so
            // filtered indexes get a lazy rebuild.
            let mut registry = self.indexes.borrow_mut();
            registry.remove_referencing(&fold_name(&column_name));
            registry.invalidate_filtered();
        }
        self.notify(TableEvent::ColumnRemoved(column_name));
        Ok(removed.def)
    }

    pub fn ordinal(&self, name: &str) -> Result<usize> {
        self.column_lookup
            .get(&fold_name(name))
            .copied()
            .ok_or_else(|| Error::column_not_found(&self.name, name))
    }

    pub fn column(&self, name: &str) -> Result<&ColumnData> {
        Ok(&self.columns[self.ordinal(name)?])
    }

    pub fn columns(&self) -> &[ColumnData] {
        &self.columns
    }

    // ---- records ----------------------------------------------------

    fn new_record(&mut self) -> RecordId {
        let (id, grew) = self.records.allocate();
        if grew {
            let capacity = self.records.capacity();
            for col in &mut self.columns {
                col.ensure_capacity(capacity);
            }
        } else {
            for col in &mut self.columns {
                col.reset_record(id);
            }
        }
        id
    }

    fn clone_record(&mut self, src: RecordId) -> RecordId {
        let dst = self.new_record();
        for col in &mut self.columns {
            let v = col.get(src).clone();
            col.store(dst, v);
        }
        dst
    }

    // ---- row access -------------------------------------------------

    fn slot(&self, row: RowId) -> Result<Row> {
        self.rows
            .get(row)
            .and_then(|r| *r)
            .ok_or_else(|| Error::invalid_operation("row id is not valid for this table"))
    }

    fn slot_mut(&mut self, row: RowId) -> Result<&mut Row> {
        self.rows
            .get_mut(row)
            .and_then(|r| r.as_mut())
            .ok_or_else(|| Error::invalid_operation("row id is not valid for this table"))
    }

    pub fn state(&self, row: RowId) -> Result<RowState> {
        Ok(self.slot(row)?.state)
    }

    /// Whether the row has an open (or detached) proposed record.
    pub fn is_editing(&self, row: RowId) -> Result<bool> {
        Ok(self.slot(row)?.has_proposed())
    }

    /// Every attached row in collection order, Deleted included.
    pub fn attached_rows(&self) -> Vec<RowId> {
        self.order.clone()
    }

    /// Live rows in collection order.
    pub fn rows(&self) -> Vec<RowId> {
        self.order
            .iter()
            .copied()
            .filter(|&r| {
                self.rows[r]
                    .map(|slot| slot.state.is_live())
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Number of live rows.
    pub fn row_count(&self) -> usize {
        self.rows().len()
    }

    /// Position of a row among live rows.
    pub fn index_of(&self, row: RowId) -> Option<usize> {
        self.rows().iter().position(|&r| r == row)
    }

    pub fn get_value(&self, row: RowId, column: &str, version: RowVersion) -> Result<Value> {
        let slot = self.slot(row)?;
        let record = slot.resolve(version)?;
        let ordinal = self.ordinal(column)?;
        Ok(self.columns[ordinal].get(record).clone())
    }

    pub(crate) fn record_values(&self, record: RecordId, columns: &[String]) -> Result<Vec<Value>> {
        columns
            .iter()
            .map(|c| Ok(self.columns[self.ordinal(c)?].get(record).clone()))
            .collect()
    }

    /// Key tuple of a row's committed values over the given columns.
    pub(crate) fn committed_key(&self, row: RowId, columns: &[String]) -> Result<Option<Vec<Value>>> {
        let slot = self.slot(row)?;
        match slot.committed_record() {
            Some(record) => Ok(Some(self.record_values(record, columns)?)),
            None => Ok(None),
        }
    }

    // ---- row lifecycle ----------------------------------------------

    /// Creates a detached row initialized to column defaults.
    pub fn new_row(&mut self) -> RowId {
        let record = self.new_record();
        let slot = Row::detached(record);
        match self.free_rows.pop() {
            Some(id) => {
                self.rows[id] = Some(slot);
                id
            }
            None => {
                self.rows.push(Some(slot));
                self.rows.len() - 1
            }
        }
    }

    /// Attaches a detached row: Added state, proposed becomes current.
    pub fn add_row(&mut self, row: RowId) -> Result<()> {
        let slot = self.slot(row)?;
        if slot.state != RowState::Detached {
            return Err(Error::invalid_operation("row is already attached"));
        }
        let record = slot
            .proposed
            .ok_or_else(|| Error::invalid_operation("detached row lost its record"))?;
        self.assign_auto_increment(record)?;
        if !self.loading {
            self.validate_record(row, record)?;
        }
        {
            let slot = self.slot_mut(row)?;
            slot.current = Some(record);
            slot.proposed = None;
            slot.state = RowState::Added;
        }
        self.order.push(row);
        self.recompute_computed(row)?;
        self.indexes_insert(row)?;
        self.indexes.borrow_mut().invalidate_filtered();
        self.notify(TableEvent::RowAdded(row));
        Ok(())
    }

    /// Convenience: new row, positional values, attach. On failure the
    /// row is discarded.
    pub fn add_row_values(&mut self, values: Vec<Value>) -> Result<RowId> {
        if values.len() > self.columns.len() {
            return Err(Error::invalid_operation("more values than columns"));
        }
        let row = self.new_row();
        let result = self
            .stage_values(row, values)
            .and_then(|()| self.add_row(row));
        match result {
            Ok(()) => Ok(row),
            Err(e) => {
                self.discard_detached(row);
                Err(e)
            }
        }
    }

    /// Writes one named value into an open proposed record, bypassing the
    /// read-only flag. Used when copying whole rows between tables.
    pub(crate) fn stage_value(&mut self, row: RowId, column: &str, value: Value) -> Result<()> {
        let ordinal = self.ordinal(column)?;
        let record = self
            .slot(row)?
            .proposed
            .ok_or_else(|| Error::invalid_operation("row has no open proposed record"))?;
        let checked = self.columns[ordinal].check(value)?;
        self.observe_auto_increment(ordinal, &checked);
        self.columns[ordinal].store(record, checked);
        Ok(())
    }

    /// Writes positional values into a detached row's proposed record.
    pub(crate) fn stage_values(&mut self, row: RowId, values: Vec<Value>) -> Result<()> {
        let record = self
            .slot(row)?
            .proposed
            .ok_or_else(|| Error::invalid_operation("detached row lost its record"))?;
        for (ordinal, value) in values.into_iter().enumerate() {
            if value.is_null() {
                continue;
            }
            let checked = self.columns[ordinal].check(value)?;
            self.observe_auto_increment(ordinal, &checked);
            self.columns[ordinal].store(record, checked);
        }
        Ok(())
    }

    pub(crate) fn discard_detached(&mut self, row: RowId) {
        if let Some(Some(slot)) = self.rows.get(row).copied() {
            if let Some(p) = slot.proposed {
                self.records.dispose(p);
            }
            if let Some(c) = slot.current {
                self.records.dispose(c);
            }
            self.rows[row] = None;
            self.free_rows.push(row);
        }
    }

    fn assign_auto_increment(&mut self, record: RecordId) -> Result<()> {
        for ordinal in 0..self.columns.len() {
            let Some(_) = self.columns[ordinal].def.auto_increment else {
                continue;
            };
            let value = self.columns[ordinal].get(record).clone();
            if value.is_null() {
                let next = self.columns[ordinal]
                    .def
                    .auto_increment
                    .as_mut()
                    .map(|ai| ai.take())
                    .unwrap_or_default();
                let v = self.columns[ordinal].check(Value::Int64(next))?;
                self.columns[ordinal].store(record, v);
            } else {
                self.observe_auto_increment(ordinal, &value);
            }
        }
        Ok(())
    }

    fn observe_auto_increment(&mut self, ordinal: usize, value: &Value) {
        if let Some(ai) = self.columns[ordinal].def.auto_increment.as_mut() {
            if let Some(v) = value.as_int() {
                ai.observe(v);
            }
        }
    }

    /// Opens an edit by duplicating current into proposed. Idempotent.
    pub fn begin_edit(&mut self, row: RowId) -> Result<()> {
        let slot = self.slot(row)?;
        if slot.state == RowState::Deleted {
            return Err(Error::row_unavailable("Deleted"));
        }
        if slot.proposed.is_some() {
            return Ok(());
        }
        let current = slot
            .current
            .ok_or_else(|| Error::invalid_operation("row has no current record"))?;
        let proposed = self.clone_record(current);
        self.slot_mut(row)?.proposed = Some(proposed);
        Ok(())
    }

    /// Discards an open edit.
    pub fn cancel_edit(&mut self, row: RowId) -> Result<()> {
        let slot = self.slot(row)?;
        if slot.state == RowState::Detached {
            return Ok(());
        }
        if let Some(proposed) = slot.proposed {
            self.records.dispose(proposed);
            self.slot_mut(row)?.proposed = None;
        }
        Ok(())
    }

    /// Commits an open edit: validate, promote proposed to current,
    /// Unchanged becomes Modified. On failure the proposed record is
    /// discarded and the error returned.
    pub fn end_edit(&mut self, row: RowId) -> Result<()> {
        let slot = self.slot(row)?;
        if slot.state == RowState::Detached {
            return Ok(());
        }
        let Some(proposed) = slot.proposed else {
            return Ok(());
        };
        if !self.loading {
            if let Err(e) = self.validate_record(row, proposed) {
                self.records.dispose(proposed);
                self.slot_mut(row)?.proposed = None;
                return Err(e);
            }
        }
        self.indexes_remove(row);
        {
            let old_current = slot.current;
            let slot = self.slot_mut(row)?;
            slot.current = Some(proposed);
            slot.proposed = None;
            if slot.state == RowState::Unchanged {
                slot.state = RowState::Modified;
            }
            // The displaced current record is disposed unless it is still
            // the original snapshot.
            if let Some(old) = old_current {
                if slot.original != Some(old) {
                    self.records.dispose(old);
                }
            }
        }
        self.recompute_computed(row)?;
        self.indexes_insert(row)?;
        self.indexes.borrow_mut().invalidate_filtered();
        self.notify(TableEvent::RowChanged(row));
        Ok(())
    }

    /// Assigns a value. Outside an explicit edit this commits immediately
    /// (implicit begin/end edit); inside one it only updates the proposed
    /// record.
    pub fn set_value(&mut self, row: RowId, column: &str, value: Value) -> Result<()> {
        let ordinal = self.ordinal(column)?;
        if self.columns[ordinal].def.read_only && !self.loading {
            return Err(Error::read_only_column(column));
        }
        let slot = self.slot(row)?;
        if slot.state == RowState::Deleted {
            return Err(Error::row_unavailable("Deleted"));
        }
        let was_editing = slot.proposed.is_some();
        if !was_editing {
            self.begin_edit(row)?;
        }
        let record = self.slot(row)?.proposed.ok_or_else(|| {
            Error::invalid_operation("edit did not open")
        })?;
        let mut checked = match self.columns[ordinal].check(value) {
            Ok(v) => v,
            Err(e) => {
                if !was_editing && self.slot(row)?.state != RowState::Detached {
                    self.cancel_edit(row)?;
                }
                return Err(e);
            }
        };
        // Auto-increment treats an explicit null as "assign the next
        // counter value", same as at attach.
        if checked.is_null() {
            if let Some(ai) = self.columns[ordinal].def.auto_increment.as_mut() {
                let next = ai.take();
                checked = match self.columns[ordinal].check(Value::Int64(next)) {
                    Ok(v) => v,
                    Err(e) => {
                        if !was_editing && self.slot(row)?.state != RowState::Detached {
                            self.cancel_edit(row)?;
                        }
                        return Err(e);
                    }
                };
            }
        }
        if checked.is_null()
            && !self.columns[ordinal].def.nullable
            && self.columns[ordinal].def.auto_increment.is_none()
            && !self.loading
        {
            if !was_editing && self.slot(row)?.state != RowState::Detached {
                self.cancel_edit(row)?;
            }
            return Err(Error::null_not_allowed(column));
        }
        self.observe_auto_increment(ordinal, &checked);
        self.columns[ordinal].store(record, checked);
        if !was_editing && self.slot(row)?.state != RowState::Detached {
            self.end_edit(row)?;
        }
        Ok(())
    }

    /// Deletes a row without cascade evaluation (single-table use; rows
    /// participating in foreign keys go through `TableSet::delete_row`).
    pub fn delete_row(&mut self, row: RowId) -> Result<()> {
        let slot = self.slot(row)?;
        match slot.state {
            RowState::Detached => Err(Error::invalid_operation("row is not attached")),
            RowState::Deleted => Err(Error::row_unavailable("Deleted")),
            RowState::Added => {
                if let Some(p) = slot.proposed {
                    self.records.dispose(p);
                    self.slot_mut(row)?.proposed = None;
                }
                self.detach(row);
                self.notify(TableEvent::RowDeleted(row));
                Ok(())
            }
            RowState::Unchanged | RowState::Modified => {
                if let Some(p) = slot.proposed {
                    self.records.dispose(p);
                    self.slot_mut(row)?.proposed = None;
                }
                self.indexes_remove(row);
                self.slot_mut(row)?.state = RowState::Deleted;
                self.indexes_insert(row)?;
                self.indexes.borrow_mut().invalidate_filtered();
                self.notify(TableEvent::RowDeleted(row));
                Ok(())
            }
        }
    }

    /// Delete plus accept: the row is physically removed.
    pub fn remove_row(&mut self, row: RowId) -> Result<()> {
        self.delete_row(row)?;
        // An Added row is already gone after delete.
        if self.rows.get(row).map(|r| r.is_some()).unwrap_or(false) {
            self.accept_changes_row(row)?;
        }
        Ok(())
    }

    /// Detaches a row entirely, recycling its records and slot.
    fn detach(&mut self, row: RowId) {
        self.indexes_remove(row);
        if let Some(Some(slot)) = self.rows.get(row).copied() {
            let mut dispose = Vec::new();
            if let Some(p) = slot.proposed {
                dispose.push(p);
            }
            if let Some(c) = slot.current {
                dispose.push(c);
            }
            if let Some(o) = slot.original {
                if slot.current != Some(o) {
                    dispose.push(o);
                }
            }
            for r in dispose {
                self.records.dispose(r);
            }
        }
        self.rows[row] = None;
        self.free_rows.push(row);
        self.order.retain(|&r| r != row);
        self.indexes.borrow_mut().invalidate_filtered();
    }

    pub fn accept_changes_row(&mut self, row: RowId) -> Result<()> {
        if self.slot(row)?.proposed.is_some() {
            self.end_edit(row)?;
        }
        let slot = self.slot(row)?;
        match slot.state {
            RowState::Detached => Err(Error::invalid_operation("row is not attached")),
            RowState::Unchanged => Ok(()),
            RowState::Added | RowState::Modified => {
                self.indexes_remove(row);
                let slot = self.slot_mut(row)?;
                let old_original = slot.original;
                slot.original = slot.current;
                slot.state = RowState::Unchanged;
                if let (Some(old), current) = (old_original, slot.current) {
                    if current != Some(old) {
                        self.records.dispose(old);
                    }
                }
                self.indexes_insert(row)?;
                self.indexes.borrow_mut().invalidate_filtered();
                Ok(())
            }
            RowState::Deleted => {
                self.indexes_remove(row);
                self.detach(row);
                Ok(())
            }
        }
    }

    pub fn reject_changes_row(&mut self, row: RowId) -> Result<()> {
        let slot = self.slot(row)?;
        match slot.state {
            RowState::Detached => Ok(()),
            RowState::Unchanged => self.cancel_edit(row),
            RowState::Added => {
                self.detach(row);
                self.notify(TableEvent::RowDeleted(row));
                Ok(())
            }
            RowState::Modified | RowState::Deleted => {
                if let Some(p) = slot.proposed {
                    self.records.dispose(p);
                    self.slot_mut(row)?.proposed = None;
                }
                self.indexes_remove(row);
                let slot = self.slot_mut(row)?;
                let old_current = slot.current;
                slot.current = slot.original;
                slot.state = RowState::Unchanged;
                if let Some(old) = old_current {
                    if slot.original != Some(old) {
                        self.records.dispose(old);
                    }
                }
                self.indexes_insert(row)?;
                self.indexes.borrow_mut().invalidate_filtered();
                self.notify(TableEvent::RowChanged(row));
                Ok(())
            }
        }
    }

    /// Accepts every row's pending changes.
    pub fn accept_changes(&mut self) -> Result<()> {
        for row in self.order.clone() {
            if self.rows.get(row).map(|r| r.is_some()).unwrap_or(false) {
                self.accept_changes_row(row)?;
            }
        }
        Ok(())
    }

    /// Rejects every row's pending changes.
    pub fn reject_changes(&mut self) -> Result<()> {
        for row in self.order.clone() {
            if self.rows.get(row).map(|r| r.is_some()).unwrap_or(false) {
                self.reject_changes_row(row)?;
            }
        }
        Ok(())
    }

    fn recompute_computed(&mut self, row: RowId) -> Result<()> {
        let exprs: Vec<(usize, Rc<dyn crate::expr::RowExpr>)> = self
            .columns
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.def.computed.clone().map(|e| (i, e)))
            .collect();
        if exprs.is_empty() {
            return Ok(());
        }
        let record = match self.slot(row)?.current {
            Some(r) => r,
            None => return Ok(()),
        };
        for (ordinal, expr) in exprs {
            let value = expr.evaluate(&*self, row);
            let value = self.columns[ordinal].check(value)?;
            self.columns[ordinal].store(record, value);
        }
        Ok(())
    }

    // ---- validation -------------------------------------------------

    /// Validates a record against nullability and unique constraints.
    pub(crate) fn validate_record(&self, row: RowId, record: RecordId) -> Result<()> {
        for col in &self.columns {
            if !col.def.nullable
                && col.def.auto_increment.is_none()
                && col.get(record).is_null()
            {
                return Err(Error::null_not_allowed(col.name()));
            }
        }
        for constraint in &self.constraints {
            let Some(unique) = constraint.as_unique() else {
                continue;
            };
            let key = self.record_values(record, &unique.columns)?;
            if let Some(pos) = key.iter().position(|v| v.is_null()) {
                return Err(Error::null_not_allowed(&unique.columns[pos]));
            }
            let matches = self.find_rows_by_key(&unique.columns, &key, RowStateMask::LIVE)?;
            if matches.iter().any(|&r| r != row) {
                return Err(Error::uniqueness_violation(&unique.name, key));
            }
        }
        Ok(())
    }

    /// Table-level unique validation over all live rows, used when a
    /// constraint is added to a populated table.
    fn validate_unique_over_rows(&self, unique: &UniqueConstraint) -> Result<()> {
        let mut tree = empty_tree(
            &IndexKey {
                columns: unique.columns.iter().map(|c| fold_name(c)).collect(),
                orders: unique.columns.iter().map(|_| Order::Asc).collect(),
                mask_bits: RowStateMask::LIVE.bits(),
                filter: None,
                unique: true,
            },
            !self.case_sensitive,
        );
        for &row in &self.rows() {
            let Some(key) = self.committed_key(row, &unique.columns)? else {
                continue;
            };
            if let Some(pos) = key.iter().position(|v| v.is_null()) {
                return Err(Error::null_not_allowed(&unique.columns[pos]));
            }
            if tree.insert(key.clone(), row).is_err() {
                return Err(Error::uniqueness_violation(&unique.name, key));
            }
        }
        Ok(())
    }

    /// Finds rows whose committed key equals the tuple, using a matching
    /// cached index when one exists, else a scan.
    pub fn find_rows_by_key(
        &self,
        columns: &[String],
        key: &[Value],
        mask: RowStateMask,
    ) -> Result<Vec<RowId>> {
        let folded: Vec<String> = columns.iter().map(|c| fold_name(c)).collect();
        let orders: Vec<Order> = columns.iter().map(|_| Order::Asc).collect();
        for unique in [true, false] {
            let index_key = IndexKey {
                columns: folded.clone(),
                orders: orders.clone(),
                mask_bits: mask.bits(),
                filter: None,
                unique,
            };
            let registry = self.indexes.borrow();
            if let Some(shared) = registry.get(&index_key) {
                if !shared.dirty {
                    return Ok(shared.tree.get(&key.to_vec()));
                }
            }
        }
        // No usable index: scan.
        let mut out = Vec::new();
        for &row in &self.order {
            let Some(slot) = self.rows[row] else { continue };
            if !mask.contains(slot.state) {
                continue;
            }
            let Some(record) = slot.committed_record() else {
                continue;
            };
            let values = self.record_values(record, columns)?;
            let equal = values.len() == key.len()
                && values
                    .iter()
                    .zip(key)
                    .all(|(a, b)| {
                        compare_values(a, b, !self.case_sensitive) == core::cmp::Ordering::Equal
                    });
            if equal {
                out.push(row);
            }
        }
        Ok(out)
    }

    // ---- constraints ------------------------------------------------

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraints
            .iter()
            .find(|c| fold_name(c.name()) == fold_name(name))
    }

    pub fn primary_key(&self) -> Option<&UniqueConstraint> {
        self.constraints
            .iter()
            .filter_map(|c| c.as_unique())
            .find(|u| u.primary_key)
    }

    /// Adds a uniqueness constraint, validating existing rows and
    /// creating the backing unique index.
    pub fn add_unique_constraint(
        &mut self,
        name: impl Into<String>,
        columns: Vec<String>,
        primary_key: bool,
    ) -> Result<()> {
        let name = name.into();
        check_name(&name)?;
        if self.constraint(&name).is_some() {
            return Err(Error::duplicate_name(name));
        }
        if columns.is_empty() {
            return Err(Error::invalid_schema("unique constraint needs columns"));
        }
        if primary_key && self.primary_key().is_some() {
            return Err(Error::invalid_schema("table already has a primary key"));
        }
        for col in &columns {
            let ordinal = self.ordinal(col)?;
            if !self.columns[ordinal].kind().is_indexable() {
                return Err(Error::invalid_schema(alloc::format!(
                    "column {} cannot be indexed",
                    col
                )));
            }
        }
        let unique = UniqueConstraint {
            name,
            columns,
            primary_key,
        };
        self.validate_unique_over_rows(&unique)?;
        if primary_key {
            for col in unique.columns.clone() {
                let ordinal = self.ordinal(&col)?;
                self.columns[ordinal].def.nullable = false;
            }
        }
        self.install_unique_index(&unique)?;
        self.constraints.push(Constraint::Unique(unique));
        self.notify(TableEvent::ConstraintsChanged);
        Ok(())
    }

    /// Shorthand for a primary-key unique constraint.
    pub fn set_primary_key(&mut self, columns: Vec<String>) -> Result<()> {
        let name = alloc::format!("PK_{}", self.name);
        self.add_unique_constraint(name, columns, true)
    }

    fn install_unique_index(&mut self, unique: &UniqueConstraint) -> Result<()> {
        let index_key = IndexKey {
            columns: unique.columns.iter().map(|c| fold_name(c)).collect(),
            orders: unique.columns.iter().map(|_| Order::Asc).collect(),
            mask_bits: RowStateMask::LIVE.bits(),
            filter: None,
            unique: true,
        };
        let mut registry = self.indexes.borrow_mut();
        if registry.acquire(&index_key) {
            return Ok(());
        }
        drop(registry);
        let mut tree = empty_tree(&index_key, !self.case_sensitive);
        for &row in &self.rows() {
            if let Some(key) = self.committed_key(row, &unique.columns)? {
                tree.insert(key.clone(), row)
                    .map_err(|_| Error::uniqueness_violation(&unique.name, key))?;
            }
        }
        self.indexes.borrow_mut().insert(
            index_key,
            SharedIndex {
                tree,
                refs: 1,
                dirty: false,
                filter: None,
            },
        );
        Ok(())
    }

    /// Removes a constraint by name. Cross-table reference checks (a
    /// Unique still referenced by a ForeignKey) are the table set's job.
    pub fn remove_constraint(&mut self, name: &str) -> Result<Constraint> {
        let pos = self
            .constraints
            .iter()
            .position(|c| fold_name(c.name()) == fold_name(name))
            .ok_or_else(|| Error::constraint_not_found(&self.name, name))?;
        let removed = self.constraints.remove(pos);
        if let Some(unique) = removed.as_unique() {
            let index_key = IndexKey {
                columns: unique.columns.iter().map(|c| fold_name(c)).collect(),
                orders: unique.columns.iter().map(|_| Order::Asc).collect(),
                mask_bits: RowStateMask::LIVE.bits(),
                filter: None,
                unique: true,
            };
            self.indexes.borrow_mut().release(&index_key);
        }
        self.notify(TableEvent::ConstraintsChanged);
        Ok(removed)
    }

    pub(crate) fn push_foreign_key(&mut self, fk: crate::constraint::ForeignKeyConstraint) {
        self.constraints.push(Constraint::ForeignKey(fk));
        self.notify(TableEvent::ConstraintsChanged);
    }

    // ---- index maintenance ------------------------------------------

    fn index_key_values(&self, columns: &[String], record: RecordId) -> Vec<Value> {
        columns
            .iter()
            .map(|c| {
                self.column_lookup
                    .get(c)
                    .map(|&ord| self.columns[ord].get(record).clone())
                    .unwrap_or(Value::Null)
            })
            .collect()
    }

    fn indexes_remove(&mut self, row: RowId) {
        if self.loading {
            return;
        }
        let Ok(slot) = self.slot(row) else { return };
        let Some(record) = slot.committed_record() else {
            return;
        };
        let columns = &self.columns;
        let lookup = &self.column_lookup;
        self.indexes.borrow_mut().for_each_unfiltered(|key, shared| {
            // Dirty trees are rebuilt from scratch before use; mutating
            // them here would desynchronize them further.
            if shared.dirty {
                return;
            }
            if key.mask_bits & RowStateMask::of(slot.state).bits() == 0 {
                return;
            }
            let values: Vec<Value> = key
                .columns
                .iter()
                .map(|c| {
                    lookup
                        .get(c)
                        .map(|&ord| columns[ord].get(record).clone())
                        .unwrap_or(Value::Null)
                })
                .collect();
            shared.tree.remove(&values, Some(row));
        });
    }

    fn indexes_insert(&mut self, row: RowId) -> Result<()> {
        if self.loading {
            return Ok(());
        }
        let Ok(slot) = self.slot(row) else {
            return Ok(());
        };
        let Some(record) = slot.committed_record() else {
            return Ok(());
        };
        let columns = &self.columns;
        let lookup = &self.column_lookup;
        let mut conflict: Option<(String, Vec<Value>)> = None;
        self.indexes.borrow_mut().for_each_unfiltered(|key, shared| {
            if shared.dirty {
                return;
            }
            if key.mask_bits & RowStateMask::of(slot.state).bits() == 0 {
                return;
            }
            let values: Vec<Value> = key
                .columns
                .iter()
                .map(|c| {
                    lookup
                        .get(c)
                        .map(|&ord| columns[ord].get(record).clone())
                        .unwrap_or(Value::Null)
                })
                .collect();
            if shared.tree.insert(values.clone(), row).is_err() && conflict.is_none() {
                conflict = Some((key.columns.join(","), values));
            }
        });
        match conflict {
            Some((name, key)) => Err(Error::uniqueness_violation(name, key)),
            None => Ok(()),
        }
    }

    pub(crate) fn rebuild_index(&self, index_key: &IndexKey) -> Result<()> {
        let filter = {
            let registry = self.indexes.borrow();
            match registry.get(index_key) {
                Some(shared) => shared.filter.clone(),
                None => return Ok(()),
            }
        };
        let mut tree = empty_tree(index_key, !self.case_sensitive);
        for &row in &self.order {
            let Some(slot) = self.rows[row] else { continue };
            if index_key.mask_bits & RowStateMask::of(slot.state).bits() == 0 {
                continue;
            }
            let Some(record) = slot.committed_record() else {
                continue;
            };
            if let Some(f) = &filter {
                if !f.matches(self, row) {
                    continue;
                }
            }
            let values = self.index_key_values(&index_key.columns, record);
            tree.insert(values.clone(), row)
                .map_err(|_| Error::uniqueness_violation(index_key.columns.join(","), values))?;
        }
        let mut registry = self.indexes.borrow_mut();
        if let Some(shared) = registry.get_mut(index_key) {
            shared.tree = tree;
            shared.dirty = false;
        }
        Ok(())
    }

    pub(crate) fn indexes(&self) -> &RefCell<IndexRegistry> {
        &self.indexes
    }

    pub(crate) fn fold(name: &str) -> String {
        fold_name(name)
    }

    // ---- bulk load --------------------------------------------------

    /// Enters bulk-load mode: constraint checks and index maintenance are
    /// suspended until `end_load_data`.
    pub fn begin_load_data(&mut self) {
        if !self.loading {
            self.loading = true;
            let mut registry = self.indexes.borrow_mut();
            if !registry.is_empty() {
                registry.invalidate_all();
            }
        }
    }

    /// Leaves bulk-load mode: rebuilds every index (unique violations
    /// fail immediately), then reports all deferred null violations as
    /// one aggregate error.
    pub fn end_load_data(&mut self) -> Result<()> {
        if !self.loading {
            return Ok(());
        }
        self.loading = false;
        let dirty = self.indexes.borrow().dirty_keys();
        for key in dirty {
            self.rebuild_index(&key)?;
        }
        let mut violations = Vec::new();
        for (position, &row) in self.rows().iter().enumerate() {
            let Some(slot) = self.rows[row] else { continue };
            let Some(record) = slot.committed_record() else {
                continue;
            };
            for col in &self.columns {
                if !col.def.nullable
                    && col.def.auto_increment.is_none()
                    && col.get(record).is_null()
                {
                    violations.push(DeferredViolation {
                        table: self.name.clone(),
                        column: col.name().to_string(),
                        row: position,
                    });
                }
            }
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(Error::DeferredViolations { violations })
        }
    }
}
