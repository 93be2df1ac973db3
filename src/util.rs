//! Time helpers: canonical timestamp formatting and local calendar-day
//! windows.
//!
//! Timestamps are stored as UTC RFC3339 TEXT (`2026-08-06T12:00:00Z`) and
//! compared lexicographically in SQL, so every write must go through
//! `fmt_ts`. Day bucketing happens in the configured timezone: a "day" is
//! [local midnight, next local midnight) converted back to UTC.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;

/// Format a timestamp in the canonical stored form: UTC, whole seconds, `Z`
/// suffix. Mixing offset styles would break lexicographic range queries.
pub fn fmt_ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// The local calendar date an instant falls on in `tz`.
pub fn local_date(when: DateTime<Utc>, tz: Tz) -> NaiveDate {
    when.with_timezone(&tz).date_naive()
}

/// The UTC instant of local midnight on `date` in `tz`.
///
/// DST edges: an ambiguous midnight (clocks fell back) takes the earlier
/// instant; a nonexistent midnight (clocks sprang forward over it) takes the
/// first valid instant of the day.
pub fn local_midnight_utc(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let naive = match date.and_hms_opt(0, 0, 0) {
        Some(n) => n,
        None => return Utc::now(),
    };
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earlier, _) => earlier.with_timezone(&Utc),
        LocalResult::None => {
            let shifted = naive + Duration::hours(1);
            match tz.from_local_datetime(&shifted).earliest() {
                Some(dt) => dt.with_timezone(&Utc),
                None => Utc.from_utc_datetime(&naive),
            }
        }
    }
}

/// The `[start, end)` UTC window covering one local calendar day, as stored
/// timestamp strings ready for SQL range comparison.
pub fn day_bounds(date: NaiveDate, tz: Tz) -> (String, String) {
    let start = local_midnight_utc(date, tz);
    let end = match date.succ_opt() {
        Some(next) => local_midnight_utc(next, tz),
        None => start + Duration::days(1),
    };
    (fmt_ts(start), fmt_ts(end))
}
