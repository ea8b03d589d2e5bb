//! Departure times
//!
//! Jobs depart on a fixed weekday and hour so durations are comparable
//! across runs.

use std::time::{SystemTime, UNIX_EPOCH};

/// Default ISO weekday of departure (Wednesday)
pub const DEPARTURE_WEEKDAY: u8 = 3;

/// Default hour of departure
pub const DEPARTURE_HOUR: u8 = 11;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Seconds since the unix epoch
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// ISO weekday (1 = Monday … 7 = Sunday) of a unix timestamp, in UTC
pub fn iso_weekday(unix_secs: u64) -> u8 {
    // 1970-01-01 was a Thursday
    ((unix_secs / SECONDS_PER_DAY + 3) % 7 + 1) as u8
}

/// Midnight (UTC) of the first day on or after `now` that falls on `weekday`
///
/// Today counts if it already is that weekday. `None` for a weekday outside 1–7.
pub fn next_weekday(now: u64, weekday: u8) -> Option<u64> {
    if !(1..=7).contains(&weekday) {
        return None;
    }

    let today = u64::from(iso_weekday(now));
    let delta = (u64::from(weekday) + 7 - today) % 7;
    Some((now / SECONDS_PER_DAY + delta) * SECONDS_PER_DAY)
}

/// Unix timestamp of the next `weekday` at `hour:00` UTC
pub fn departure_time(now: u64, weekday: u8, hour: u8) -> Option<u64> {
    if hour > 23 {
        return None;
    }
    next_weekday(now, weekday).map(|day| day + u64::from(hour) * 3600)
}
