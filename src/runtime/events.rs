//! Change events emitted by the database task.

use crate::types::NightId;

/// Emitted after a mutation has been committed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NightEvent {
    /// A night was inserted.
    Inserted {
        /// Assigned id.
        id: NightId,
    },
    /// An existing night was overwritten.
    Updated {
        /// Updated id.
        id: NightId,
    },
    /// The table was emptied.
    Cleared {
        /// Number of rows deleted.
        removed: usize,
    },
}
