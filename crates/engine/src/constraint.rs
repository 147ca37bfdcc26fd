//! Constraint definitions.
//!
//! Constraints reference columns by name, so they stay valid while the
//! table renumbers ordinals. Validation and cascade execution live in
//! `Table` and `TableSet`.

use alloc::string::String;
use alloc::vec::Vec;

/// Action applied to dependent child rows when the referenced parent row
/// is deleted or its key changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CascadeRule {
    /// Propagate the delete / key change to children.
    Cascade,
    /// Refuse the parent operation while live children match.
    None,
    /// Set child key columns to null.
    SetNull,
    /// Set child key columns to their defaults.
    SetDefault,
}

/// A uniqueness constraint over an ordered column list.
#[derive(Clone, Debug)]
pub struct UniqueConstraint {
    pub name: String,
    pub columns: Vec<String>,
    pub primary_key: bool,
}

/// A foreign-key constraint stored on the child table.
#[derive(Clone, Debug)]
pub struct ForeignKeyConstraint {
    pub name: String,
    pub parent_table: String,
    pub parent_columns: Vec<String>,
    pub child_columns: Vec<String>,
    pub delete_rule: CascadeRule,
    pub update_rule: CascadeRule,
}

/// A table constraint.
#[derive(Clone, Debug)]
pub enum Constraint {
    Unique(UniqueConstraint),
    ForeignKey(ForeignKeyConstraint),
}

impl Constraint {
    pub fn name(&self) -> &str {
        match self {
            Constraint::Unique(u) => &u.name,
            Constraint::ForeignKey(fk) => &fk.name,
        }
    }

    /// Columns of this table the constraint covers.
    pub fn local_columns(&self) -> &[String] {
        match self {
            Constraint::Unique(u) => &u.columns,
            Constraint::ForeignKey(fk) => &fk.child_columns,
        }
    }

    pub fn as_unique(&self) -> Option<&UniqueConstraint> {
        match self {
            Constraint::Unique(u) => Some(u),
            _ => None,
        }
    }

    pub fn as_foreign_key(&self) -> Option<&ForeignKeyConstraint> {
        match self {
            Constraint::ForeignKey(fk) => Some(fk),
            _ => None,
        }
    }
}
