//! Table sets: named tables, relations, and cross-table enforcement.
//!
//! Foreign keys are validated and cascaded here rather than in `Table`,
//! since both sides of a relation must be visible. Tables that belong to
//! a set should be mutated through the set's wrappers.

use crate::constraint::{CascadeRule, Constraint, ForeignKeyConstraint};
use crate::relation::Relation;
use crate::table::{check_name, Table};
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use rowset_core::{
    compare_values, is_coercible, Error, Result, RowId, RowStateMask, RowVersion, Value,
};

fn fold(name: &str) -> String {
    Table::fold(name)
}

fn keys_equal(a: &[Value], b: &[Value], case_insensitive: bool) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| compare_values(x, y, case_insensitive) == core::cmp::Ordering::Equal)
}

/// A collection of tables related by foreign keys.
#[derive(Debug)]
pub struct TableSet {
    name: String,
    tables: BTreeMap<String, Table>,
    relations: Vec<Relation>,
}

impl TableSet {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        check_name(&name)?;
        Ok(Self {
            name,
            tables: BTreeMap::new(),
            relations: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ---- tables -----------------------------------------------------

    pub fn add_table(&mut self, table: Table) -> Result<()> {
        let key = fold(table.name());
        if self.tables.contains_key(&key) {
            return Err(Error::duplicate_name(table.name()));
        }
        self.tables.insert(key, table);
        Ok(())
    }

    pub fn remove_table(&mut self, name: &str) -> Result<Table> {
        let key = fold(name);
        for rel in &self.relations {
            if fold(&rel.parent_table) == key || fold(&rel.child_table) == key {
                return Err(Error::invalid_operation(alloc::format!(
                    "table {} participates in relation {}",
                    name,
                    rel.name
                )));
            }
        }
        self.tables
            .remove(&key)
            .ok_or_else(|| Error::table_not_found(name))
    }

    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(&fold(name))
            .ok_or_else(|| Error::table_not_found(name))
    }

    pub fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(&fold(name))
            .ok_or_else(|| Error::table_not_found(name))
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    // ---- relations --------------------------------------------------

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn relation(&self, name: &str) -> Result<&Relation> {
        self.relations
            .iter()
            .find(|r| fold(&r.name) == fold(name))
            .ok_or_else(|| Error::constraint_not_found(&self.name, name))
    }

    /// Creates a relation: ensures a uniqueness constraint over the parent
    /// columns (creating one when absent), validates existing child rows,
    /// and installs the foreign key on the child table.
    #[allow(clippy::too_many_arguments)]
    pub fn add_relation(
        &mut self,
        name: impl Into<String>,
        parent_table: &str,
        parent_columns: Vec<String>,
        child_table: &str,
        child_columns: Vec<String>,
        delete_rule: CascadeRule,
        update_rule: CascadeRule,
    ) -> Result<()> {
        let name = name.into();
        check_name(&name)?;
        if self.relations.iter().any(|r| fold(&r.name) == fold(&name)) {
            return Err(Error::duplicate_name(name));
        }
        if parent_columns.is_empty() || parent_columns.len() != child_columns.len() {
            return Err(Error::invalid_schema(
                "relation key column lists must be non-empty and of equal length",
            ));
        }
        {
            let parent = self.table(parent_table)?;
            let child = self.table(child_table)?;
            for (p, c) in parent_columns.iter().zip(&child_columns) {
                let pk = parent.column(p)?.kind();
                let ck = child.column(c)?.kind();
                if !is_coercible(ck, pk) {
                    return Err(Error::invalid_schema(alloc::format!(
                        "child column {} ({:?}) is not compatible with parent column {} ({:?})",
                        c, ck, p, pk
                    )));
                }
            }
        }

        // Ensure the parent side is covered by a uniqueness constraint.
        let folded_parent: Vec<String> = parent_columns.iter().map(|c| fold(c)).collect();
        let existing = self
            .table(parent_table)?
            .constraints()
            .iter()
            .filter_map(Constraint::as_unique)
            .find(|u| {
                u.columns.len() == folded_parent.len()
                    && u.columns.iter().map(|c| fold(c)).eq(folded_parent.iter().cloned())
            })
            .map(|u| u.name.clone());
        let unique = match existing {
            Some(n) => n,
            None => {
                let unique_name = alloc::format!("UQ_{}", name);
                self.table_mut(parent_table)?.add_unique_constraint(
                    unique_name.clone(),
                    parent_columns.clone(),
                    false,
                )?;
                unique_name
            }
        };

        // Existing child rows must already satisfy the key.
        {
            let parent = self.table(parent_table)?;
            let child = self.table(child_table)?;
            for row in child.rows() {
                let key: Vec<Value> = child_columns
                    .iter()
                    .map(|c| child.get_value(row, c, RowVersion::Current))
                    .collect::<Result<_>>()?;
                if key.iter().any(Value::is_null) {
                    continue;
                }
                let matches =
                    parent.find_rows_by_key(&parent_columns, &key, RowStateMask::LIVE)?;
                if matches.is_empty() {
                    return Err(Error::foreign_key_violation(&name, key));
                }
            }
        }

        let fk = ForeignKeyConstraint {
            name: name.clone(),
            parent_table: parent_table.to_string(),
            parent_columns: parent_columns.clone(),
            child_columns: child_columns.clone(),
            delete_rule,
            update_rule,
        };
        self.table_mut(child_table)?.push_foreign_key(fk);
        self.relations.push(Relation {
            name: name.clone(),
            parent_table: parent_table.to_string(),
            parent_columns,
            child_table: child_table.to_string(),
            child_columns,
            foreign_key: name,
            unique,
            delete_rule,
            update_rule,
            nested: false,
        });
        Ok(())
    }

    pub fn set_nested(&mut self, relation: &str, nested: bool) -> Result<()> {
        let key = fold(relation);
        let rel = self
            .relations
            .iter_mut()
            .find(|r| fold(&r.name) == key)
            .ok_or_else(|| Error::constraint_not_found(&self.name, relation))?;
        rel.nested = nested;
        Ok(())
    }

    /// Removes a relation and its foreign-key constraint. The backing
    /// uniqueness constraint on the parent stays.
    pub fn remove_relation(&mut self, name: &str) -> Result<Relation> {
        let key = fold(name);
        let pos = self
            .relations
            .iter()
            .position(|r| fold(&r.name) == key)
            .ok_or_else(|| Error::constraint_not_found(&self.name, name))?;
        let rel = self.relations.remove(pos);
        self.table_mut(&rel.child_table)?
            .remove_constraint(&rel.foreign_key)?;
        Ok(rel)
    }

    /// Removes a constraint from a member table, refusing when a relation
    /// still depends on it. Removing a relation's foreign key removes the
    /// relation too.
    pub fn remove_constraint(&mut self, table: &str, name: &str) -> Result<()> {
        let table_key = fold(table);
        let name_key = fold(name);
        if let Some(rel) = self
            .relations
            .iter()
            .find(|r| fold(&r.parent_table) == table_key && fold(&r.unique) == name_key)
        {
            return Err(Error::invalid_operation(alloc::format!(
                "unique constraint {} is referenced by relation {}",
                name,
                rel.name
            )));
        }
        let is_relation_fk = self
            .relations
            .iter()
            .any(|r| fold(&r.child_table) == table_key && fold(&r.foreign_key) == name_key);
        if is_relation_fk {
            self.remove_relation(name)?;
            return Ok(());
        }
        self.table_mut(table)?.remove_constraint(name)?;
        Ok(())
    }

    // ---- foreign-key enforcement ------------------------------------

    /// Checks every foreign key on the row against live parent rows. A key
    /// with any null component is exempt.
    fn check_foreign_keys(&self, table: &str, row: RowId, version: RowVersion) -> Result<()> {
        let t = self.table(table)?;
        for constraint in t.constraints() {
            let Some(fk) = constraint.as_foreign_key() else {
                continue;
            };
            let key: Vec<Value> = fk
                .child_columns
                .iter()
                .map(|c| t.get_value(row, c, version))
                .collect::<Result<_>>()?;
            if key.iter().any(Value::is_null) {
                continue;
            }
            let parent = self.table(&fk.parent_table)?;
            let matches =
                parent.find_rows_by_key(&fk.parent_columns, &key, RowStateMask::LIVE)?;
            if matches.is_empty() {
                return Err(Error::foreign_key_violation(&fk.name, key));
            }
        }
        Ok(())
    }

    /// Attaches a detached row after foreign-key validation.
    pub fn add_row(&mut self, table: &str, row: RowId) -> Result<()> {
        self.check_foreign_keys(table, row, RowVersion::Proposed)?;
        self.table_mut(table)?.add_row(row)
    }

    /// New row, positional values, validate, attach.
    pub fn add_row_values(&mut self, table: &str, values: Vec<Value>) -> Result<RowId> {
        let row = {
            let t = self.table_mut(table)?;
            let row = t.new_row();
            if let Err(e) = t.stage_values(row, values) {
                t.discard_detached(row);
                return Err(e);
            }
            row
        };
        match self.add_row(table, row) {
            Ok(()) => Ok(row),
            Err(e) => {
                if let Ok(t) = self.table_mut(table) {
                    t.discard_detached(row);
                }
                Err(e)
            }
        }
    }

    /// Assigns a value with relation enforcement. Inside an explicit edit
    /// this only writes the proposed record; enforcement runs at
    /// `end_edit`.
    pub fn set_value(&mut self, table: &str, row: RowId, column: &str, value: Value) -> Result<()> {
        let t = self.table(table)?;
        let state = t.state(row)?;
        if t.is_editing(row)? || state == rowset_core::RowState::Detached {
            return self.table_mut(table)?.set_value(row, column, value);
        }
        let coerced = t.column(column)?.check(value.clone())?;
        let column_key = fold(column);

        // Child side: the assigned value must still point at a parent.
        for constraint in t.constraints() {
            let Some(fk) = constraint.as_foreign_key() else {
                continue;
            };
            if !fk.child_columns.iter().any(|c| fold(c) == column_key) {
                continue;
            }
            let key: Vec<Value> = fk
                .child_columns
                .iter()
                .map(|c| {
                    if fold(c) == column_key {
                        Ok(coerced.clone())
                    } else {
                        t.get_value(row, c, RowVersion::Current)
                    }
                })
                .collect::<Result<_>>()?;
            if key.iter().any(Value::is_null) {
                continue;
            }
            let parent = self.table(&fk.parent_table)?;
            if parent
                .find_rows_by_key(&fk.parent_columns, &key, RowStateMask::LIVE)?
                .is_empty()
            {
                return Err(Error::foreign_key_violation(&fk.name, key));
            }
        }

        // Parent side: plan update cascades before committing.
        let cascades = self.plan_key_change(table, row, |rel, t| {
            if !rel.parent_columns.iter().any(|c| fold(c) == column_key) {
                return Ok(None);
            }
            let old: Vec<Value> = rel
                .parent_columns
                .iter()
                .map(|c| t.get_value(row, c, RowVersion::Current))
                .collect::<Result<_>>()?;
            let new: Vec<Value> = rel
                .parent_columns
                .iter()
                .map(|c| {
                    if fold(c) == column_key {
                        Ok(coerced.clone())
                    } else {
                        t.get_value(row, c, RowVersion::Current)
                    }
                })
                .collect::<Result<_>>()?;
            Ok(Some((old, new)))
        })?;

        self.table_mut(table)?.set_value(row, column, value)?;
        self.apply_update_cascades(cascades)
    }

    /// Commits an open edit with relation enforcement, then runs any
    /// update cascades the key change requires. On a foreign-key failure
    /// the edit stays open so the caller can correct it.
    pub fn end_edit(&mut self, table: &str, row: RowId) -> Result<()> {
        let t = self.table(table)?;
        if !t.is_editing(row)? {
            return self.table_mut(table)?.end_edit(row);
        }
        self.check_foreign_keys(table, row, RowVersion::Proposed)?;
        let cascades = self.plan_key_change(table, row, |rel, t| {
            let old: Vec<Value> = rel
                .parent_columns
                .iter()
                .map(|c| t.get_value(row, c, RowVersion::Current))
                .collect::<Result<_>>()?;
            let new: Vec<Value> = rel
                .parent_columns
                .iter()
                .map(|c| t.get_value(row, c, RowVersion::Proposed))
                .collect::<Result<_>>()?;
            Ok(Some((old, new)))
        })?;
        self.table_mut(table)?.end_edit(row)?;
        self.apply_update_cascades(cascades)
    }

    /// Shared planning for parent key changes: collects affected child
    /// rows per relation and fails early on a `None` update rule.
    fn plan_key_change<F>(
        &self,
        table: &str,
        row: RowId,
        old_new: F,
    ) -> Result<Vec<(Relation, Vec<Value>, Vec<RowId>)>>
    where
        F: Fn(&Relation, &Table) -> Result<Option<(Vec<Value>, Vec<Value>)>>,
    {
        let table_key = fold(table);
        let t = self.table(table)?;
        if t.state(row)? == rowset_core::RowState::Added {
            // A row nothing can reference yet has no children.
            return Ok(Vec::new());
        }
        let mut plans = Vec::new();
        for rel in &self.relations {
            if fold(&rel.parent_table) != table_key {
                continue;
            }
            let Some((old, new)) = old_new(rel, t)? else {
                continue;
            };
            if old.iter().any(Value::is_null)
                || keys_equal(&old, &new, !t.is_case_sensitive())
            {
                continue;
            }
            let child = self.table(&rel.child_table)?;
            let children = child.find_rows_by_key(&rel.child_columns, &old, RowStateMask::LIVE)?;
            if children.is_empty() {
                continue;
            }
            if rel.update_rule == CascadeRule::None {
                return Err(Error::cascade_blocked(
                    &rel.foreign_key,
                    "live child rows reference the key",
                ));
            }
            plans.push((rel.clone(), new, children));
        }
        Ok(plans)
    }

    fn apply_update_cascades(
        &mut self,
        plans: Vec<(Relation, Vec<Value>, Vec<RowId>)>,
    ) -> Result<()> {
        for (rel, new_key, children) in plans {
            for child_row in children {
                {
                    let child = self.table_mut(&rel.child_table)?;
                    child.begin_edit(child_row)?;
                    for (i, col) in rel.child_columns.iter().enumerate() {
                        let value = match rel.update_rule {
                            CascadeRule::Cascade => new_key[i].clone(),
                            CascadeRule::SetNull => Value::Null,
                            CascadeRule::SetDefault => child.column(col)?.def.default.clone(),
                            CascadeRule::None => unreachable!(),
                        };
                        child.set_value(child_row, col, value)?;
                    }
                }
                self.end_edit(&rel.child_table, child_row)?;
            }
        }
        Ok(())
    }

    /// Deletes a row, evaluating each relation's delete rule over its live
    /// children in relation registration order. `None` rules are checked
    /// before anything mutates; later failures abort without rolling back
    /// completed sibling cascades.
    pub fn delete_row(&mut self, table: &str, row: RowId) -> Result<()> {
        let table_key = fold(table);
        let mut plans = Vec::new();
        for rel in self.relations.clone() {
            if fold(&rel.parent_table) != table_key {
                continue;
            }
            let t = self.table(table)?;
            let Some(key) = t.committed_key(row, &rel.parent_columns)? else {
                continue;
            };
            if key.iter().any(Value::is_null) {
                continue;
            }
            let child = self.table(&rel.child_table)?;
            let children = child.find_rows_by_key(&rel.child_columns, &key, RowStateMask::LIVE)?;
            if children.is_empty() {
                continue;
            }
            if rel.delete_rule == CascadeRule::None {
                return Err(Error::cascade_blocked(
                    &rel.foreign_key,
                    "live child rows reference the row",
                ));
            }
            plans.push((rel, children));
        }
        for (rel, children) in plans {
            match rel.delete_rule {
                CascadeRule::Cascade => {
                    for child_row in children {
                        self.delete_row(&rel.child_table, child_row)?;
                    }
                }
                CascadeRule::SetNull | CascadeRule::SetDefault => {
                    for child_row in children {
                        {
                            let child = self.table_mut(&rel.child_table)?;
                            child.begin_edit(child_row)?;
                            for col in &rel.child_columns {
                                let value = if rel.delete_rule == CascadeRule::SetNull {
                                    Value::Null
                                } else {
                                    child.column(col)?.def.default.clone()
                                };
                                child.set_value(child_row, col, value)?;
                            }
                        }
                        self.end_edit(&rel.child_table, child_row)?;
                    }
                }
                CascadeRule::None => {}
            }
        }
        self.table_mut(table)?.delete_row(row)
    }

    // ---- navigation -------------------------------------------------

    /// Live child rows of a parent row under a relation.
    pub fn child_rows(&self, relation: &str, parent_row: RowId) -> Result<Vec<RowId>> {
        let rel = self.relation(relation)?.clone();
        let parent = self.table(&rel.parent_table)?;
        let key: Vec<Value> = rel
            .parent_columns
            .iter()
            .map(|c| parent.get_value(parent_row, c, RowVersion::Default))
            .collect::<Result<_>>()?;
        if key.iter().any(Value::is_null) {
            return Ok(Vec::new());
        }
        self.table(&rel.child_table)?
            .find_rows_by_key(&rel.child_columns, &key, RowStateMask::LIVE)
    }

    /// The parent row of a child row under a relation, when its key is
    /// fully non-null.
    pub fn parent_row(&self, relation: &str, child_row: RowId) -> Result<Option<RowId>> {
        let rel = self.relation(relation)?.clone();
        let child = self.table(&rel.child_table)?;
        let key: Vec<Value> = rel
            .child_columns
            .iter()
            .map(|c| child.get_value(child_row, c, RowVersion::Default))
            .collect::<Result<_>>()?;
        if key.iter().any(Value::is_null) {
            return Ok(None);
        }
        Ok(self
            .table(&rel.parent_table)?
            .find_rows_by_key(&rel.parent_columns, &key, RowStateMask::LIVE)?
            .first()
            .copied())
    }

    // ---- change tracking --------------------------------------------

    pub fn accept_changes(&mut self) -> Result<()> {
        for table in self.tables.values_mut() {
            table.accept_changes()?;
        }
        Ok(())
    }

    pub fn reject_changes(&mut self) -> Result<()> {
        for table in self.tables.values_mut() {
            table.reject_changes()?;
        }
        Ok(())
    }

    /// Whether any member table carries uncommitted changes.
    pub fn has_changes(&self) -> bool {
        self.tables.values().any(|t| {
            t.attached_rows().iter().any(|&r| {
                t.state(r)
                    .map(|s| s != rowset_core::RowState::Unchanged)
                    .unwrap_or(false)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnDef;
    use alloc::vec;
    use rowset_core::DataKind;

    fn orders_and_lines(delete_rule: CascadeRule, update_rule: CascadeRule) -> TableSet {
        let mut set = TableSet::new("shop").unwrap();

        let mut orders = Table::new("orders").unwrap();
        orders
            .add_column(ColumnDef::new("id", DataKind::Int32).auto_increment(1, 1))
            .unwrap();
        orders
            .add_column(ColumnDef::new("customer", DataKind::String))
            .unwrap();
        orders.set_primary_key(vec!["id".into()]).unwrap();
        set.add_table(orders).unwrap();

        let mut lines = Table::new("lines").unwrap();
        lines
            .add_column(ColumnDef::new("id", DataKind::Int32).auto_increment(1, 1))
            .unwrap();
        lines
            .add_column(ColumnDef::new("order_id", DataKind::Int32))
            .unwrap();
        lines
            .add_column(ColumnDef::new("qty", DataKind::Int32))
            .unwrap();
        lines.set_primary_key(vec!["id".into()]).unwrap();
        set.add_table(lines).unwrap();

        set.add_relation(
            "order_lines",
            "orders",
            vec!["id".into()],
            "lines",
            vec!["order_id".into()],
            delete_rule,
            update_rule,
        )
        .unwrap();
        set
    }

    fn seed(set: &mut TableSet) -> (RowId, RowId, RowId) {
        let order = set
            .add_row_values(
                "orders",
                vec![Value::Null, Value::String("alice".into())],
            )
            .unwrap();
        let line1 = set
            .add_row_values("lines", vec![Value::Null, Value::Int32(1), Value::Int32(2)])
            .unwrap();
        let line2 = set
            .add_row_values("lines", vec![Value::Null, Value::Int32(1), Value::Int32(5)])
            .unwrap();
        set.accept_changes().unwrap();
        (order, line1, line2)
    }

    #[test]
    fn test_fk_rejects_orphan_child() {
        let mut set = orders_and_lines(CascadeRule::Cascade, CascadeRule::Cascade);
        let err = set.add_row_values(
            "lines",
            vec![Value::Null, Value::Int32(99), Value::Int32(1)],
        );
        assert!(matches!(err, Err(Error::ForeignKeyViolation { .. })));
        assert_eq!(set.table("lines").unwrap().row_count(), 0);
    }

    #[test]
    fn test_fk_null_key_is_exempt() {
        let mut set = orders_and_lines(CascadeRule::Cascade, CascadeRule::Cascade);
        set.add_row_values("lines", vec![Value::Null, Value::Null, Value::Int32(1)])
            .unwrap();
        assert_eq!(set.table("lines").unwrap().row_count(), 1);
    }

    #[test]
    fn test_cascade_delete_reaches_children() {
        let mut set = orders_and_lines(CascadeRule::Cascade, CascadeRule::Cascade);
        let (order, _, _) = seed(&mut set);

        set.delete_row("orders", order).unwrap();
        assert_eq!(set.table("orders").unwrap().row_count(), 0);
        assert_eq!(set.table("lines").unwrap().row_count(), 0);

        set.accept_changes().unwrap();
        assert!(set.table("lines").unwrap().attached_rows().is_empty());
        assert_eq!(set.table("lines").unwrap().row_count(), 0);
    }

    #[test]
    fn test_none_rule_blocks_delete() {
        let mut set = orders_and_lines(CascadeRule::None, CascadeRule::None);
        let (order, _, _) = seed(&mut set);

        let err = set.delete_row("orders", order);
        assert!(matches!(err, Err(Error::CascadeBlocked { .. })));
        assert_eq!(set.table("orders").unwrap().row_count(), 1);
        assert_eq!(set.table("lines").unwrap().row_count(), 2);
    }

    #[test]
    fn test_none_rule_allows_delete_after_children_go() {
        let mut set = orders_and_lines(CascadeRule::None, CascadeRule::None);
        let (order, line1, line2) = seed(&mut set);

        set.delete_row("lines", line1).unwrap();
        set.delete_row("lines", line2).unwrap();
        set.delete_row("orders", order).unwrap();
        assert_eq!(set.table("orders").unwrap().row_count(), 0);
    }

    #[test]
    fn test_set_null_on_delete() {
        let mut set = orders_and_lines(CascadeRule::SetNull, CascadeRule::SetNull);
        let (order, line1, _) = seed(&mut set);

        set.delete_row("orders", order).unwrap();
        let lines = set.table("lines").unwrap();
        assert_eq!(lines.row_count(), 2);
        assert_eq!(
            lines.get_value(line1, "order_id", RowVersion::Default).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_update_cascade_follows_key_change() {
        let mut set = orders_and_lines(CascadeRule::Cascade, CascadeRule::Cascade);
        let (order, line1, line2) = seed(&mut set);

        set.set_value("orders", order, "id", Value::Int32(42)).unwrap();
        let lines = set.table("lines").unwrap();
        for line in [line1, line2] {
            assert_eq!(
                lines.get_value(line, "order_id", RowVersion::Default).unwrap(),
                Value::Int32(42)
            );
        }
    }

    #[test]
    fn test_update_none_blocks_key_change() {
        let mut set = orders_and_lines(CascadeRule::None, CascadeRule::None);
        let (order, _, _) = seed(&mut set);

        let err = set.set_value("orders", order, "id", Value::Int32(42));
        assert!(matches!(err, Err(Error::CascadeBlocked { .. })));
        assert_eq!(
            set.table("orders")
                .unwrap()
                .get_value(order, "id", RowVersion::Default)
                .unwrap(),
            Value::Int32(1)
        );
    }

    #[test]
    fn test_child_set_value_validated() {
        let mut set = orders_and_lines(CascadeRule::Cascade, CascadeRule::Cascade);
        let (_, line1, _) = seed(&mut set);

        let err = set.set_value("lines", line1, "order_id", Value::Int32(7));
        assert!(matches!(err, Err(Error::ForeignKeyViolation { .. })));
        set.set_value("lines", line1, "order_id", Value::Null).unwrap();
    }

    #[test]
    fn test_edit_protocol_defers_fk_check() {
        let mut set = orders_and_lines(CascadeRule::Cascade, CascadeRule::Cascade);
        let (_, line1, _) = seed(&mut set);

        set.table_mut("lines").unwrap().begin_edit(line1).unwrap();
        // Dangling mid-edit value is fine until the edit ends
        set.set_value("lines", line1, "order_id", Value::Int32(7)).unwrap();
        let err = set.end_edit("lines", line1);
        assert!(matches!(err, Err(Error::ForeignKeyViolation { .. })));
        // Fixing the key lets the commit through
        set.set_value("lines", line1, "order_id", Value::Int32(1)).unwrap();
        set.end_edit("lines", line1).unwrap();
    }

    #[test]
    fn test_relation_auto_creates_parent_unique() {
        let set = orders_and_lines(CascadeRule::Cascade, CascadeRule::Cascade);
        // The primary key already covers orders.id, so it was reused
        assert_eq!(set.relation("order_lines").unwrap().unique, "PK_orders");
    }

    #[test]
    fn test_referenced_unique_cannot_be_removed() {
        let mut set = orders_and_lines(CascadeRule::Cascade, CascadeRule::Cascade);
        let err = set.remove_constraint("orders", "PK_orders");
        assert!(matches!(err, Err(Error::InvalidOperation { .. })));

        set.remove_relation("order_lines").unwrap();
        set.remove_constraint("orders", "PK_orders").unwrap();
    }

    #[test]
    fn test_navigation() {
        let mut set = orders_and_lines(CascadeRule::Cascade, CascadeRule::Cascade);
        let (order, line1, line2) = seed(&mut set);

        let children = set.child_rows("order_lines", order).unwrap();
        assert_eq!(children.len(), 2);
        assert!(children.contains(&line1) && children.contains(&line2));
        assert_eq!(set.parent_row("order_lines", line1).unwrap(), Some(order));
    }

    #[test]
    fn test_relation_validates_existing_rows() {
        let mut set = TableSet::new("s").unwrap();
        let mut parent = Table::new("p").unwrap();
        parent.add_column(ColumnDef::new("id", DataKind::Int32)).unwrap();
        set.add_table(parent).unwrap();
        let mut child = Table::new("c").unwrap();
        child.add_column(ColumnDef::new("pid", DataKind::Int32)).unwrap();
        set.add_table(child).unwrap();
        set.add_row_values("c", vec![Value::Int32(5)]).unwrap();
        set.accept_changes().unwrap();

        let err = set.add_relation(
            "pc",
            "p",
            vec!["id".into()],
            "c",
            vec!["pid".into()],
            CascadeRule::Cascade,
            CascadeRule::Cascade,
        );
        assert!(matches!(err, Err(Error::ForeignKeyViolation { .. })));
    }

    #[test]
    fn test_grandchild_cascade() {
        let mut set = orders_and_lines(CascadeRule::Cascade, CascadeRule::Cascade);

        let mut notes = Table::new("notes").unwrap();
        notes
            .add_column(ColumnDef::new("line_id", DataKind::Int32))
            .unwrap();
        notes
            .add_column(ColumnDef::new("text", DataKind::String))
            .unwrap();
        set.add_table(notes).unwrap();
        set.add_relation(
            "line_notes",
            "lines",
            vec!["id".into()],
            "notes",
            vec!["line_id".into()],
            CascadeRule::Cascade,
            CascadeRule::Cascade,
        )
        .unwrap();

        let (order, _, _) = seed(&mut set);
        set.add_row_values(
            "notes",
            vec![Value::Int32(1), Value::String("gift wrap".into())],
        )
        .unwrap();
        set.accept_changes().unwrap();

        set.delete_row("orders", order).unwrap();
        assert_eq!(set.table("notes").unwrap().row_count(), 0);
    }
}
