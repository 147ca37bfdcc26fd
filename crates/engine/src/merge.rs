//! Merging one table set into another: schema reconciliation followed by
//! row matching on primary keys.

use crate::set::TableSet;
use crate::table::Table;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use rowset_core::{is_coercible, Error, Result, RowStateMask, RowVersion, Value};

/// How to treat source schema elements absent from the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissingSchemaAction {
    /// Clone the missing table or column into the target.
    Add,
    /// Skip the missing element and its data.
    Ignore,
    /// Fail the whole merge.
    Error,
}

/// Merge options.
#[derive(Clone, Copy, Debug)]
pub struct MergeOptions {
    /// Leave rows with local uncommitted changes untouched when a source
    /// row matches them.
    pub preserve_changes: bool,
    pub missing_schema_action: MissingSchemaAction,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            preserve_changes: false,
            missing_schema_action: MissingSchemaAction::Add,
        }
    }
}

/// A recoverable per-table merge problem; the table's rows were skipped.
#[derive(Clone, Debug)]
pub struct MergeFailure {
    pub table: String,
    pub message: String,
}

/// Outcome of a merge.
#[derive(Clone, Debug, Default)]
pub struct MergeReport {
    pub tables_added: Vec<String>,
    pub columns_added: Vec<(String, String)>,
    pub rows_added: usize,
    pub rows_updated: usize,
    pub failures: Vec<MergeFailure>,
}

impl MergeReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

fn clone_schema(source: &Table) -> Result<Table> {
    let mut table = Table::new(source.name())?;
    table.set_case_sensitive(source.is_case_sensitive())?;
    for col in source.columns() {
        table.add_column(col.def.clone())?;
    }
    for constraint in source.constraints() {
        if let Some(unique) = constraint.as_unique() {
            table.add_unique_constraint(unique.name.clone(), unique.columns.clone(), unique.primary_key)?;
        }
    }
    Ok(table)
}

fn folded(columns: &[String]) -> Vec<String> {
    columns.iter().map(|c| Table::fold(c)).collect()
}

impl TableSet {
    /// Merges another set into this one. Missing schema is handled per
    /// `MissingSchemaAction`; rows are matched on the target primary key.
    /// Matched rows are overwritten unless `preserve_changes` is set, and
    /// merged rows always arrive Unchanged, so merging the same source
    /// twice is a no-op. Primary-key shape conflicts skip the table and
    /// land in the report instead of failing the merge.
    pub fn merge(&mut self, source: &TableSet, options: &MergeOptions) -> Result<MergeReport> {
        let mut report = MergeReport::default();
        let source_tables: Vec<&Table> = source.tables().collect();

        // Schema phase.
        let mut skipped_tables: Vec<String> = Vec::new();
        for src in &source_tables {
            match self.table(src.name()) {
                Ok(_) => {}
                Err(_) => match options.missing_schema_action {
                    MissingSchemaAction::Add => {
                        self.add_table(clone_schema(src)?)?;
                        report.tables_added.push(src.name().to_string());
                    }
                    MissingSchemaAction::Ignore => {
                        skipped_tables.push(Table::fold(src.name()));
                        continue;
                    }
                    MissingSchemaAction::Error => {
                        return Err(Error::invalid_schema(alloc::format!(
                            "merge source table {} is missing from the target",
                            src.name()
                        )));
                    }
                },
            }
            let mut incompatible = None;
            let mut missing: Vec<(String, crate::column::ColumnDef)> = Vec::new();
            {
                let dst = self.table(src.name())?;
                for col in src.columns() {
                    match dst.column(col.name()) {
                        Ok(existing) => {
                            if !is_coercible(col.kind(), existing.kind()) {
                                incompatible = Some(alloc::format!(
                                    "column {} kind {:?} does not convert to {:?}",
                                    col.name(),
                                    col.kind(),
                                    existing.kind()
                                ));
                                break;
                            }
                        }
                        Err(_) => missing.push((src.name().to_string(), col.def.clone())),
                    }
                }
            }
            if let Some(message) = incompatible {
                report.failures.push(MergeFailure {
                    table: src.name().to_string(),
                    message,
                });
                skipped_tables.push(Table::fold(src.name()));
                continue;
            }
            for (table_name, def) in missing {
                match options.missing_schema_action {
                    MissingSchemaAction::Add => {
                        let col = def.name.clone();
                        self.table_mut(&table_name)?.add_column(def)?;
                        report.columns_added.push((table_name.clone(), col));
                    }
                    MissingSchemaAction::Ignore => {}
                    MissingSchemaAction::Error => {
                        return Err(Error::invalid_schema(alloc::format!(
                            "merge source column {}.{} is missing from the target",
                            table_name, def.name
                        )));
                    }
                }
            }
        }

        // Row phase.
        for src in &source_tables {
            if skipped_tables.contains(&Table::fold(src.name())) {
                continue;
            }
            self.merge_rows(src, options, &mut report)?;
        }
        Ok(report)
    }

    fn merge_rows(
        &mut self,
        src: &Table,
        options: &MergeOptions,
        report: &mut MergeReport,
    ) -> Result<()> {
        let name = src.name().to_string();

        // Key columns come from the target primary key, and conflicting
        // key shapes make row matching meaningless.
        let key_columns: Option<Vec<String>> = {
            let dst = self.table(&name)?;
            match (dst.primary_key(), src.primary_key()) {
                (Some(d), Some(s)) if folded(&d.columns) != folded(&s.columns) => {
                    report.failures.push(MergeFailure {
                        table: name.clone(),
                        message: "primary key shapes differ".into(),
                    });
                    return Ok(());
                }
                (Some(d), _) => Some(d.columns.clone()),
                (None, _) => None,
            }
        };

        let copy_columns: Vec<String> = {
            let dst = self.table(&name)?;
            dst.columns()
                .iter()
                .map(|c| c.name().to_string())
                .filter(|c| src.column(c).is_ok())
                .collect()
        };

        for src_row in src.rows() {
            let matched = match &key_columns {
                Some(key_cols) => {
                    let key: Vec<Value> = key_cols
                        .iter()
                        .map(|c| src.get_value(src_row, c, RowVersion::Current))
                        .collect::<Result<_>>()?;
                    if key.iter().any(Value::is_null) {
                        None
                    } else {
                        self.table(&name)?
                            .find_rows_by_key(key_cols, &key, RowStateMask::LIVE)?
                            .first()
                            .copied()
                    }
                }
                None => None,
            };
            match matched {
                Some(dst_row) => {
                    if options.preserve_changes {
                        continue;
                    }
                    let dst = self.table_mut(&name)?;
                    dst.begin_edit(dst_row)?;
                    for col in &copy_columns {
                        let value = src.get_value(src_row, col, RowVersion::Current)?;
                        dst.stage_value(dst_row, col, value)?;
                    }
                    dst.end_edit(dst_row)?;
                    dst.accept_changes_row(dst_row)?;
                    report.rows_updated += 1;
                }
                None => {
                    let dst = self.table_mut(&name)?;
                    let row = dst.new_row();
                    let staged = (|| {
                        for col in &copy_columns {
                            let value = src.get_value(src_row, col, RowVersion::Current)?;
                            dst.stage_value(row, col, value)?;
                        }
                        dst.add_row(row)?;
                        dst.accept_changes_row(row)
                    })();
                    if let Err(e) = staged {
                        dst.discard_detached(row);
                        return Err(e);
                    }
                    report.rows_added += 1;
                }
            }
        }
        Ok(())
    }
}
