//! SQLite-backed night table.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row, ffi, params};

use crate::{
    night::SleepNight,
    types::{NightId, UNASSIGNED_ID},
};

use super::{NightStore, PersistError, PersistResult};

const COLUMNS: &str = "night_id, start_time_milli, end_time_milli, quality_rating";

/// SQLite implementation of [`crate::persist::NightStore`].
pub struct SqliteNightStore {
    conn: Connection,
}

impl SqliteNightStore {
    /// Opens or creates the night table at `path`.
    ///
    /// Enables WAL mode and sets `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Opens an in-memory SQLite database.
    pub fn open_in_memory() -> PersistResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> PersistResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self { conn })
    }

    /// Number of stored nights.
    pub fn count(&self) -> PersistResult<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM daily_sleep_quality_table", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

impl NightStore for SqliteNightStore {
    fn insert(&mut self, night: &SleepNight) -> PersistResult<NightId> {
        let res = if night.id == UNASSIGNED_ID {
            self.conn.execute(
                "INSERT INTO daily_sleep_quality_table(start_time_milli, end_time_milli, quality_rating) VALUES (?1, ?2, ?3)",
                params![night.start_time_ms, night.end_time_ms, night.sleep_quality],
            )
        } else {
            self.conn.execute(
                "INSERT INTO daily_sleep_quality_table(night_id, start_time_milli, end_time_milli, quality_rating) VALUES (?1, ?2, ?3, ?4)",
                params![night.id, night.start_time_ms, night.end_time_ms, night.sleep_quality],
            )
        };

        match res {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(err) if is_key_conflict(&err) => Err(PersistError::DuplicateId(night.id)),
            Err(err) => Err(err.into()),
        }
    }

    fn update(&mut self, night: &SleepNight) -> PersistResult<bool> {
        let changed = self.conn.execute(
            "UPDATE daily_sleep_quality_table SET start_time_milli = ?2, end_time_milli = ?3, quality_rating = ?4 WHERE night_id = ?1",
            params![night.id, night.start_time_ms, night.end_time_ms, night.sleep_quality],
        )?;
        Ok(changed > 0)
    }

    fn get(&self, id: NightId) -> PersistResult<Option<SleepNight>> {
        let night = self
            .conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM daily_sleep_quality_table WHERE night_id = ?1"),
                params![id],
                night_from_row,
            )
            .optional()?;
        Ok(night)
    }

    fn most_recent(&self) -> PersistResult<Option<SleepNight>> {
        let night = self
            .conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM daily_sleep_quality_table ORDER BY night_id DESC LIMIT 1"
                ),
                [],
                night_from_row,
            )
            .optional()?;
        Ok(night)
    }

    fn clear(&mut self) -> PersistResult<usize> {
        let removed = self.conn.execute("DELETE FROM daily_sleep_quality_table", [])?;
        Ok(removed)
    }

    fn all_desc(&self) -> PersistResult<Vec<SleepNight>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM daily_sleep_quality_table ORDER BY night_id DESC"
        ))?;

        let rows = stmt.query_map([], night_from_row)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

/// Primary-key clash on `night_id`. Other constraint failures are not duplicates.
fn is_key_conflict(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || e.extended_code == ffi::SQLITE_CONSTRAINT_ROWID
    )
}

fn night_from_row(row: &Row<'_>) -> rusqlite::Result<SleepNight> {
    Ok(SleepNight {
        id: row.get(0)?,
        start_time_ms: row.get(1)?,
        end_time_ms: row.get(2)?,
        sleep_quality: row.get(3)?,
    })
}
