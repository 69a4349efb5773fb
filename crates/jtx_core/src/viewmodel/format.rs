//! Display formatting for timestamps shown on screens.

use crate::model::ical_object::ICalObject;
use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};

const LONG_DATE: &str = "%B %-d, %Y";
const SHORT_TIME: &str = "%H:%M";

/// Formats epoch-millisecond values in one display offset.
///
/// All-day values are always formatted in UTC since they are stored as UTC
/// midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateFormatter {
    offset: FixedOffset,
}

impl Default for DateFormatter {
    fn default() -> Self {
        Self::utc()
    }
}

impl DateFormatter {
    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// `March 5, 2024`
    pub fn long_date(&self, epoch_ms: i64) -> String {
        self.local(epoch_ms)
            .map(|value| value.format(LONG_DATE).to_string())
            .unwrap_or_default()
    }

    /// `14:30`
    pub fn short_time(&self, epoch_ms: i64) -> String {
        self.local(epoch_ms)
            .map(|value| value.format(SHORT_TIME).to_string())
            .unwrap_or_default()
    }

    /// `March 5, 2024 14:30`
    pub fn date_time(&self, epoch_ms: i64) -> String {
        self.local(epoch_ms)
            .map(|value| format!("{} {}", value.format(LONG_DATE), value.format(SHORT_TIME)))
            .unwrap_or_default()
    }

    /// Start value of `object`: date only when all-day, empty when unset.
    pub fn dtstart(&self, object: &ICalObject) -> String {
        match object.dtstart {
            None => String::new(),
            Some(start) if object.is_all_day() => Self::utc().long_date(start),
            Some(start) => self.date_time(start),
        }
    }

    fn local(&self, epoch_ms: i64) -> Option<DateTime<FixedOffset>> {
        self.offset.timestamp_millis_opt(epoch_ms).single()
    }
}
