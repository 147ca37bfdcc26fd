//! Parent/child relations between tables in a set.

use crate::constraint::CascadeRule;
use alloc::string::String;
use alloc::vec::Vec;

/// A named parent/child link backed by a foreign-key constraint on the
/// child table and a uniqueness constraint on the parent.
///
/// The cascade rules mirror the ones on the child's foreign key; cascade
/// planning reads them from here.
#[derive(Clone, Debug)]
pub struct Relation {
    pub name: String,
    pub parent_table: String,
    pub parent_columns: Vec<String>,
    pub child_table: String,
    pub child_columns: Vec<String>,
    /// Name of the foreign-key constraint stored on the child table.
    pub foreign_key: String,
    /// Name of the uniqueness constraint on the parent the link targets.
    pub unique: String,
    pub delete_rule: CascadeRule,
    pub update_rule: CascadeRule,
    /// Nested relations group child rows under their parent during
    /// hierarchical export.
    pub nested: bool,
}
