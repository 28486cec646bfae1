//! Sleep night record.

use serde::{Deserialize, Serialize};

use crate::types::{NightId, Quality, TimestampMs, QUALITY_UNRATED, UNASSIGNED_ID};

/// One persisted sleep session.
///
/// A night is open while `end_time_ms == start_time_ms`; closing it writes the
/// real end time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepNight {
    /// Surrogate key, [`UNASSIGNED_ID`] until inserted.
    pub id: NightId,
    /// Session start in milliseconds since epoch.
    pub start_time_ms: TimestampMs,
    /// Session end in milliseconds since epoch, equal to the start while open.
    pub end_time_ms: TimestampMs,
    /// Rating, [`QUALITY_UNRATED`] until rated.
    pub sleep_quality: Quality,
}

impl SleepNight {
    /// New unsaved, open, unrated night starting at `start_time_ms`.
    pub fn starting_at(start_time_ms: TimestampMs) -> Self {
        Self {
            id: UNASSIGNED_ID,
            start_time_ms,
            end_time_ms: start_time_ms,
            sleep_quality: QUALITY_UNRATED,
        }
    }

    /// True while the session has not been stopped.
    pub fn is_open(&self) -> bool {
        self.end_time_ms == self.start_time_ms
    }

    /// True once a quality rating has been recorded.
    pub fn is_rated(&self) -> bool {
        self.sleep_quality != QUALITY_UNRATED
    }

    /// Time slept, zero for open nights.
    pub fn duration_ms(&self) -> TimestampMs {
        (self.end_time_ms - self.start_time_ms).max(0)
    }
}
