//! Human-readable and JSON renderings of the sleep history.

use std::fmt::Write as _;

use chrono::{
    DateTime, FixedOffset, Offset, Utc,
    format::{Item, StrftimeItems},
};
use serde::{Deserialize, Serialize};

use crate::{
    night::SleepNight,
    types::{Quality, TimestampMs},
};

/// Pattern used when [`HistoryResources::date_format`] does not parse.
pub const DEFAULT_DATE_FORMAT: &str = "%A %b-%d-%Y Time: %H:%M";

/// Display strings and locale settings used to render the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryResources {
    pub title: String,
    pub start_time: String,
    pub end_time: String,
    pub quality: String,
    pub hours_slept: String,
    /// Labels for ratings 0..=5, lowest first.
    pub quality_labels: [String; 6],
    /// Shown for [`crate::types::QUALITY_UNRATED`] and out-of-scale values.
    pub unrated_label: String,
    /// `chrono` format string for timestamps.
    pub date_format: String,
    /// Offset from UTC in seconds applied before formatting.
    pub utc_offset_secs: i32,
}

impl Default for HistoryResources {
    fn default() -> Self {
        Self {
            title: "Here is your sleep data".to_string(),
            start_time: "Start:".to_string(),
            end_time: "End:".to_string(),
            quality: "Quality:".to_string(),
            hours_slept: "Hours:Minutes:Seconds".to_string(),
            quality_labels: [
                "Very bad".to_string(),
                "Poor".to_string(),
                "So-so".to_string(),
                "OK".to_string(),
                "Pretty good".to_string(),
                "Excellent".to_string(),
            ],
            unrated_label: "--".to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            utc_offset_secs: 0,
        }
    }
}

/// Label for a quality rating.
pub fn quality_label(quality: Quality, res: &HistoryResources) -> &str {
    usize::try_from(quality)
        .ok()
        .and_then(|idx| res.quality_labels.get(idx))
        .map(String::as_str)
        .unwrap_or(res.unrated_label.as_str())
}

/// True when chrono accepts every specifier in `pattern`.
pub fn is_valid_date_format(pattern: &str) -> bool {
    !StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
}

/// Renders `ts` with the resources' date format and offset.
///
/// An unparseable format falls back to [`DEFAULT_DATE_FORMAT`]; a timestamp
/// outside chrono's range is rendered as the raw number.
pub fn format_timestamp(ts: TimestampMs, res: &HistoryResources) -> String {
    let offset = FixedOffset::east_opt(res.utc_offset_secs).unwrap_or_else(|| Utc.fix());
    let Some(dt) = DateTime::<Utc>::from_timestamp_millis(ts) else {
        return ts.to_string();
    };
    let pattern = if is_valid_date_format(&res.date_format) {
        res.date_format.as_str()
    } else {
        DEFAULT_DATE_FORMAT
    };

    let mut out = String::new();
    match write!(out, "{}", dt.with_timezone(&offset).format(pattern)) {
        Ok(()) => out,
        Err(_) => ts.to_string(),
    }
}

/// `H:MM:SS` for a span in milliseconds.
pub fn format_duration(ms: TimestampMs) -> String {
    let secs = ms.max(0) / 1000;
    format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Renders the history shown under the tracker buttons.
///
/// Open nights only show their start time.
pub fn format_nights(nights: &[SleepNight], res: &HistoryResources) -> String {
    let mut out = String::new();
    out.push_str(&res.title);
    out.push('\n');

    for night in nights {
        out.push('\n');
        let _ = writeln!(out, "{}\t{}", res.start_time, format_timestamp(night.start_time_ms, res));
        if night.is_open() {
            continue;
        }
        let _ = writeln!(out, "{}\t{}", res.end_time, format_timestamp(night.end_time_ms, res));
        let _ = writeln!(out, "{}\t{}", res.quality, quality_label(night.sleep_quality, res));
        let _ = writeln!(out, "{}\t{}", res.hours_slept, format_duration(night.duration_ms()));
    }

    out
}

/// JSON array export of `nights`.
pub fn nights_to_json(nights: &[SleepNight]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(nights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QUALITY_UNRATED;

    fn closed(id: i64, start: i64, end: i64, quality: Quality) -> SleepNight {
        SleepNight {
            id,
            start_time_ms: start,
            end_time_ms: end,
            sleep_quality: quality,
        }
    }

    #[test]
    fn quality_labels_cover_scale_and_sentinel() {
        let res = HistoryResources::default();
        assert_eq!(quality_label(0, &res), "Very bad");
        assert_eq!(quality_label(3, &res), "OK");
        assert_eq!(quality_label(5, &res), "Excellent");
        assert_eq!(quality_label(QUALITY_UNRATED, &res), "--");
        assert_eq!(quality_label(9, &res), "--");
    }

    #[test]
    fn duration_is_hours_minutes_seconds() {
        assert_eq!(format_duration(0), "0:00:00");
        assert_eq!(format_duration(((7 * 60 + 5) * 60 + 9) * 1000 + 400), "7:05:09");
    }

    #[test]
    fn open_night_omits_end_quality_and_duration() {
        let res = HistoryResources::default();
        let text = format_nights(&[SleepNight::starting_at(0)], &res);
        assert!(text.starts_with("Here is your sleep data\n"));
        assert!(text.contains("Start:\tThursday Jan-01-1970 Time: 00:00"));
        assert!(!text.contains("End:"));
        assert!(!text.contains("Quality:"));
    }

    #[test]
    fn closed_night_lists_every_field() {
        let res = HistoryResources::default();
        let text = format_nights(&[closed(1, 0, 8 * 3_600_000, 4)], &res);
        assert!(text.contains("End:\tThursday Jan-01-1970 Time: 08:00"));
        assert!(text.contains("Quality:\tPretty good"));
        assert!(text.contains("Hours:Minutes:Seconds\t8:00:00"));
    }

    #[test]
    fn offset_shifts_rendered_time() {
        let res = HistoryResources {
            utc_offset_secs: 2 * 3600,
            ..HistoryResources::default()
        };
        assert_eq!(format_timestamp(0, &res), "Thursday Jan-01-1970 Time: 02:00");
    }

    #[test]
    fn bad_date_format_falls_back_to_default() {
        assert!(is_valid_date_format(DEFAULT_DATE_FORMAT));
        assert!(!is_valid_date_format("%Q"));

        let res = HistoryResources {
            date_format: "%Q".to_string(),
            ..HistoryResources::default()
        };
        assert_eq!(format_timestamp(0, &res), "Thursday Jan-01-1970 Time: 00:00");

        let text = format_nights(&[closed(1, 0, 3_600_000, 2)], &res);
        assert!(text.contains("End:\tThursday Jan-01-1970 Time: 01:00"));
    }

    #[test]
    fn json_export_round_trips() {
        let nights = vec![closed(2, 10, 20, 1), closed(1, 1, 1, QUALITY_UNRATED)];
        let json = nights_to_json(&nights).expect("json");
        let back: Vec<SleepNight> = serde_json::from_str(&json).expect("parse");
        assert_eq!(back, nights);
    }
}
