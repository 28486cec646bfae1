//! Shared primitive IDs, timestamps, and quality constants.

/// Surrogate key of a stored night. `0` means "not yet assigned".
pub type NightId = i64;
/// Wall-clock timestamp in milliseconds since the Unix epoch.
pub type TimestampMs = i64;
/// Quality rating on the 0..=5 scale, or [`QUALITY_UNRATED`].
pub type Quality = i32;

/// Id carried by a night that has not been inserted yet.
pub const UNASSIGNED_ID: NightId = 0;
/// Sentinel quality meaning "not yet rated".
pub const QUALITY_UNRATED: Quality = -1;
