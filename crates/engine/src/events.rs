//! Structural change notifications.
//!
//! Listeners are plain closures registered per table and invoked
//! synchronously after the change has committed.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use rowset_core::RowId;

/// A post-commit structural change on a table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TableEvent {
    /// A row was attached.
    RowAdded(RowId),
    /// A row's values were committed.
    RowChanged(RowId),
    /// A row was deleted or detached.
    RowDeleted(RowId),
    /// A column was added.
    ColumnAdded(String),
    /// A column was removed.
    ColumnRemoved(String),
    /// The constraint collection changed.
    ConstraintsChanged,
}

/// Listener list for one table.
#[derive(Default)]
pub struct Listeners {
    callbacks: Vec<Box<dyn Fn(&TableEvent)>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }

    /// Registers a listener. Listeners fire in registration order.
    pub fn register(&mut self, callback: Box<dyn Fn(&TableEvent)>) {
        self.callbacks.push(callback);
    }

    /// Invokes every listener with the event.
    pub fn notify(&self, event: &TableEvent) {
        for callback in &self.callbacks {
            callback(event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl core::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.callbacks.len())
            .finish()
    }
}
