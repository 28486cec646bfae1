pub mod memory;
pub mod sqlite;

use thiserror::Error;

use crate::{night::SleepNight, types::NightId};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("night {0} already exists")]
    DuplicateId(NightId),
    #[error("blocking task failed: {0}")]
    Join(String),
    #[error("{0}")]
    Message(String),
}

pub type PersistResult<T> = Result<T, PersistError>;

/// Single-table storage for [`SleepNight`] rows.
///
/// Absent rows are reported as `Ok(None)` / `Ok(false)`, never as errors.
pub trait NightStore: Send {
    /// Persists `night`, assigning an id when it carries [`crate::types::UNASSIGNED_ID`].
    fn insert(&mut self, night: &SleepNight) -> PersistResult<NightId>;
    /// Overwrites the row with `night.id`. Returns `false` when no row matched.
    fn update(&mut self, night: &SleepNight) -> PersistResult<bool>;
    fn get(&self, id: NightId) -> PersistResult<Option<SleepNight>>;
    /// Row with the greatest id.
    fn most_recent(&self) -> PersistResult<Option<SleepNight>>;
    /// Deletes every row, returning how many were removed.
    fn clear(&mut self) -> PersistResult<usize>;
    /// All rows ordered by id descending.
    fn all_desc(&self) -> PersistResult<Vec<SleepNight>>;
}
