//! Volatile night table for tests and ephemeral sessions.

use hashbrown::HashMap;

use crate::{
    night::SleepNight,
    types::{NightId, UNASSIGNED_ID},
};

use super::{NightStore, PersistError, PersistResult};

/// In-memory implementation of [`crate::persist::NightStore`].
///
/// Id assignment follows SQLite `AUTOINCREMENT`: ids are never reused, even
/// after [`NightStore::clear`].
#[derive(Debug)]
pub struct MemoryNightStore {
    records: HashMap<NightId, SleepNight>,
    next_id: NightId,
}

impl Default for MemoryNightStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryNightStore {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl NightStore for MemoryNightStore {
    fn insert(&mut self, night: &SleepNight) -> PersistResult<NightId> {
        let id = if night.id == UNASSIGNED_ID {
            self.next_id
        } else {
            night.id
        };

        if self.records.contains_key(&id) {
            return Err(PersistError::DuplicateId(id));
        }

        self.next_id = self.next_id.max(id.saturating_add(1));
        self.records.insert(id, SleepNight { id, ..night.clone() });
        Ok(id)
    }

    fn update(&mut self, night: &SleepNight) -> PersistResult<bool> {
        let Some(rec) = self.records.get_mut(&night.id) else {
            return Ok(false);
        };
        *rec = night.clone();
        Ok(true)
    }

    fn get(&self, id: NightId) -> PersistResult<Option<SleepNight>> {
        Ok(self.records.get(&id).cloned())
    }

    fn most_recent(&self) -> PersistResult<Option<SleepNight>> {
        Ok(self
            .records
            .iter()
            .max_by_key(|(id, _)| **id)
            .map(|(_, night)| night.clone()))
    }

    fn clear(&mut self) -> PersistResult<usize> {
        let removed = self.records.len();
        self.records.clear();
        Ok(removed)
    }

    fn all_desc(&self) -> PersistResult<Vec<SleepNight>> {
        let mut out: Vec<SleepNight> = self.records.values().cloned().collect();
        out.sort_unstable_by(|a, b| b.id.cmp(&a.id));
        Ok(out)
    }
}
