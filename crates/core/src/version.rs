//! Row lifecycle states, record versions, and state masks.

/// Lifecycle state of a row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RowState {
    /// Created but not attached to a table.
    Detached,
    /// Attached, new since the last accept.
    Added,
    /// Attached, identical to its accepted snapshot.
    Unchanged,
    /// Attached, edited since the last accept.
    Modified,
    /// Attached, deleted since the last accept.
    Deleted,
}

impl RowState {
    /// Short state name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            RowState::Detached => "Detached",
            RowState::Added => "Added",
            RowState::Unchanged => "Unchanged",
            RowState::Modified => "Modified",
            RowState::Deleted => "Deleted",
        }
    }

    /// Returns whether rows in this state are visible to iteration.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            RowState::Added | RowState::Unchanged | RowState::Modified
        )
    }
}

/// Which stored record of a row to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RowVersion {
    /// Proposed if an edit is open, otherwise current.
    Default,
    /// The accepted snapshot.
    Original,
    /// The committed working record.
    Current,
    /// The uncommitted record of an open edit.
    Proposed,
}

impl RowVersion {
    /// Short version name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            RowVersion::Default => "Default",
            RowVersion::Original => "Original",
            RowVersion::Current => "Current",
            RowVersion::Proposed => "Proposed",
        }
    }
}

/// A bit set of row states, used to scope views and index membership.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RowStateMask(u8);

impl RowStateMask {
    pub const ADDED: RowStateMask = RowStateMask(1 << 0);
    pub const UNCHANGED: RowStateMask = RowStateMask(1 << 1);
    pub const MODIFIED: RowStateMask = RowStateMask(1 << 2);
    pub const DELETED: RowStateMask = RowStateMask(1 << 3);

    /// Added, unchanged, and modified rows.
    pub const LIVE: RowStateMask = RowStateMask(1 << 0 | 1 << 1 | 1 << 2);
    /// Every attached state.
    pub const ALL: RowStateMask = RowStateMask(1 << 0 | 1 << 1 | 1 << 2 | 1 << 3);

    /// Returns the mask selecting a single state (empty for Detached).
    pub fn of(state: RowState) -> Self {
        match state {
            RowState::Detached => RowStateMask(0),
            RowState::Added => Self::ADDED,
            RowState::Unchanged => Self::UNCHANGED,
            RowState::Modified => Self::MODIFIED,
            RowState::Deleted => Self::DELETED,
        }
    }

    /// Returns whether the mask selects the given state.
    pub fn contains(&self, state: RowState) -> bool {
        self.0 & Self::of(state).0 != 0
    }

    /// Raw bits, used as part of index identity.
    pub fn bits(&self) -> u8 {
        self.0
    }

    /// Union of two masks.
    pub fn union(&self, other: RowStateMask) -> Self {
        RowStateMask(self.0 | other.0)
    }
}

impl Default for RowStateMask {
    fn default() -> Self {
        Self::LIVE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_states() {
        assert!(RowState::Added.is_live());
        assert!(RowState::Unchanged.is_live());
        assert!(RowState::Modified.is_live());
        assert!(!RowState::Deleted.is_live());
        assert!(!RowState::Detached.is_live());
    }

    #[test]
    fn test_mask_contains() {
        assert!(RowStateMask::LIVE.contains(RowState::Added));
        assert!(RowStateMask::LIVE.contains(RowState::Modified));
        assert!(!RowStateMask::LIVE.contains(RowState::Deleted));
        assert!(RowStateMask::ALL.contains(RowState::Deleted));
        assert!(!RowStateMask::ALL.contains(RowState::Detached));
    }

    #[test]
    fn test_mask_union() {
        let m = RowStateMask::UNCHANGED.union(RowStateMask::DELETED);
        assert!(m.contains(RowState::Unchanged));
        assert!(m.contains(RowState::Deleted));
        assert!(!m.contains(RowState::Added));
    }

    #[test]
    fn test_default_mask_is_live() {
        assert_eq!(RowStateMask::default(), RowStateMask::LIVE);
    }

    #[test]
    fn test_names() {
        assert_eq!(RowState::Modified.name(), "Modified");
        assert_eq!(RowVersion::Proposed.name(), "Proposed");
    }
}
