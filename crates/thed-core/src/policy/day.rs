use chrono::{Duration, FixedOffset, Local, LocalResult, TimeZone};

use super::DAY_MS;

/// Which calendar decides where a day starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayClock {
    /// The host's local time zone.
    Local,
    /// A fixed UTC offset (tests, or users pinning a zone in config).
    Fixed(FixedOffset),
}

impl Default for DayClock {
    fn default() -> Self {
        DayClock::Local
    }
}

impl DayClock {
    /// `None` means host local time.
    pub fn from_offset_minutes(minutes: Option<i32>) -> Self {
        minutes
            .and_then(|m| FixedOffset::east_opt(m * 60))
            .map(DayClock::Fixed)
            .unwrap_or(DayClock::Local)
    }

    /// Midnight (ms since epoch) of the day containing `now`.
    pub fn midnight(&self, now: i64) -> i64 {
        match self {
            DayClock::Local => midnight_in(&Local, now),
            DayClock::Fixed(offset) => midnight_in(offset, now),
        }
    }

    /// `HH:MM` wall-clock label for a timestamp.
    pub fn slot_label(&self, at: i64) -> String {
        match self {
            DayClock::Local => label_in(&Local, at),
            DayClock::Fixed(offset) => label_in(offset, at),
        }
    }
}

fn midnight_in<Tz: TimeZone>(tz: &Tz, now: i64) -> i64 {
    let utc_day = now - now.rem_euclid(DAY_MS);
    let Some(start) = tz
        .timestamp_millis_opt(now)
        .single()
        .and_then(|at| at.date_naive().and_hms_opt(0, 0, 0))
    else {
        return utc_day;
    };
    match tz.from_local_datetime(&start) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.timestamp_millis(),
        // DST gap at midnight: the day starts at the first valid hour.
        LocalResult::None => tz
            .from_local_datetime(&(start + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.timestamp_millis())
            .unwrap_or(utc_day),
    }
}

fn label_in<Tz: TimeZone>(tz: &Tz, at: i64) -> String
where
    Tz::Offset: std::fmt::Display,
{
    tz.timestamp_millis_opt(at)
        .single()
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_default()
}
