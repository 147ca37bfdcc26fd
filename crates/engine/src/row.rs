//! Row slots: record-id bindings plus lifecycle state.
//!
//! The table owns an arena of these; all transitions that touch storage,
//! constraints, or indexes go through the table. This type only encodes
//! which record ids are valid in which state, and version resolution.

use rowset_core::{Error, RecordId, Result, RowState, RowVersion};

/// One row: up to three record ids and a lifecycle state.
///
/// Invariants: Detached has no current; Added has current but no original;
/// Unchanged has current == original; Modified has distinct current and
/// original; Deleted retains original for inspection (current survives
/// internally for rollback but is not readable).
#[derive(Clone, Copy, Debug)]
pub struct Row {
    pub original: Option<RecordId>,
    pub current: Option<RecordId>,
    pub proposed: Option<RecordId>,
    pub state: RowState,
}

impl Row {
    /// Creates a detached row around a freshly allocated proposed record.
    pub fn detached(proposed: RecordId) -> Self {
        Self {
            original: None,
            current: None,
            proposed: Some(proposed),
            state: RowState::Detached,
        }
    }

    /// Returns whether an edit is open (or the row is still detached).
    pub fn has_proposed(&self) -> bool {
        self.proposed.is_some()
    }

    /// Resolves a version request to a record id.
    ///
    /// Default reads Proposed while editing or detached, else Current.
    /// Current/Proposed/Default on a Deleted row fail `RowUnavailable`;
    /// Original stays readable. An absent version fails `VersionNotFound`.
    pub fn resolve(&self, version: RowVersion) -> Result<RecordId> {
        match version {
            RowVersion::Original => self
                .original
                .ok_or_else(|| Error::version_not_found("Original", self.state.name())),
            RowVersion::Current => {
                if self.state == RowState::Deleted {
                    return Err(Error::row_unavailable(self.state.name()));
                }
                self.current
                    .ok_or_else(|| Error::version_not_found("Current", self.state.name()))
            }
            RowVersion::Proposed => {
                if self.state == RowState::Deleted {
                    return Err(Error::row_unavailable(self.state.name()));
                }
                self.proposed
                    .ok_or_else(|| Error::version_not_found("Proposed", self.state.name()))
            }
            RowVersion::Default => {
                if self.state == RowState::Deleted {
                    return Err(Error::row_unavailable(self.state.name()));
                }
                if let Some(p) = self.proposed {
                    return Ok(p);
                }
                self.current
                    .ok_or_else(|| Error::version_not_found("Current", self.state.name()))
            }
        }
    }

    /// The record whose values represent the row for indexing and key
    /// lookups: original for Deleted rows, else current.
    pub fn committed_record(&self) -> Option<RecordId> {
        if self.state == RowState::Deleted {
            self.original
        } else {
            self.current
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_reads_proposed() {
        let row = Row::detached(3);
        assert_eq!(row.resolve(RowVersion::Default).unwrap(), 3);
        assert_eq!(row.resolve(RowVersion::Proposed).unwrap(), 3);
        assert!(matches!(
            row.resolve(RowVersion::Current),
            Err(Error::VersionNotFound { .. })
        ));
        assert!(matches!(
            row.resolve(RowVersion::Original),
            Err(Error::VersionNotFound { .. })
        ));
    }

    #[test]
    fn test_unchanged_resolution() {
        let row = Row {
            original: Some(1),
            current: Some(1),
            proposed: None,
            state: RowState::Unchanged,
        };
        assert_eq!(row.resolve(RowVersion::Default).unwrap(), 1);
        assert_eq!(row.resolve(RowVersion::Original).unwrap(), 1);
        assert!(matches!(
            row.resolve(RowVersion::Proposed),
            Err(Error::VersionNotFound { .. })
        ));
    }

    #[test]
    fn test_editing_default_is_proposed() {
        let row = Row {
            original: Some(1),
            current: Some(1),
            proposed: Some(2),
            state: RowState::Unchanged,
        };
        assert_eq!(row.resolve(RowVersion::Default).unwrap(), 2);
        assert_eq!(row.resolve(RowVersion::Current).unwrap(), 1);
    }

    #[test]
    fn test_deleted_keeps_original_readable() {
        let row = Row {
            original: Some(1),
            current: Some(1),
            proposed: None,
            state: RowState::Deleted,
        };
        assert_eq!(row.resolve(RowVersion::Original).unwrap(), 1);
        assert!(matches!(
            row.resolve(RowVersion::Current),
            Err(Error::RowUnavailable { .. })
        ));
        assert!(matches!(
            row.resolve(RowVersion::Default),
            Err(Error::RowUnavailable { .. })
        ));
        assert_eq!(row.committed_record(), Some(1));
    }
}
