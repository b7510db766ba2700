// =============================================================================
// Market session clock — US/Eastern, no external tz database
// =============================================================================
//
// The spec requires all "minutes to close" / "minutes since open" math to run
// in America/New_York. Rather than pull in a timezone-database crate, we use
// a fixed DST rule good for the modern US calendar: DST runs from the second
// Sunday in March to the first Sunday in November, UTC-4 during DST and
// UTC-5 otherwise. Regular market hours are 09:30-16:00 ET on weekdays.
// =============================================================================

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};

/// Offset (hours) of US/Eastern from UTC at a given UTC instant.
fn eastern_offset_hours(utc: DateTime<Utc>) -> i64 {
    if is_us_dst(utc) {
        -4
    } else {
        -5
    }
}

/// Whether `utc` falls within US daylight saving time (second Sunday in
/// March 02:00 local to first Sunday in November 02:00 local, approximated
/// at day granularity which is sufficient for session-hours computations).
fn is_us_dst(utc: DateTime<Utc>) -> bool {
    let year = utc.year();
    let march_start = NaiveDate::from_ymd_opt(year, 3, 1).unwrap();
    let dst_start = nth_sunday(march_start, 2);
    let nov_start = NaiveDate::from_ymd_opt(year, 11, 1).unwrap();
    let dst_end = nth_sunday(nov_start, 1);

    let date = utc.date_naive();
    date >= dst_start && date < dst_end
}

/// The `n`th Sunday (1-indexed) on/after `month_start`.
fn nth_sunday(month_start: NaiveDate, n: u32) -> NaiveDate {
    let mut d = month_start;
    while d.weekday() != Weekday::Sun {
        d = d.succ_opt().unwrap();
    }
    d + Duration::weeks((n - 1) as i64)
}

/// Convert a UTC instant to the equivalent US/Eastern wall-clock instant,
/// represented as a `DateTime<Utc>` holding Eastern wall-clock fields (a
/// common trick to avoid pulling in a `TimeZone` impl for a synthetic zone).
pub fn to_eastern_naive(utc: DateTime<Utc>) -> chrono::NaiveDateTime {
    let offset = eastern_offset_hours(utc);
    (utc + Duration::hours(offset)).naive_utc()
}

/// Whether `utc` falls on a US business weekday (Mon-Fri). Does not account
/// for exchange holidays.
pub fn is_weekday(utc: DateTime<Utc>) -> bool {
    let eastern = to_eastern_naive(utc);
    !matches!(eastern.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Whether `utc` falls within regular market hours, 09:30-16:00 ET, on a
/// weekday.
pub fn is_market_hours(utc: DateTime<Utc>) -> bool {
    if !is_weekday(utc) {
        return false;
    }
    let eastern = to_eastern_naive(utc);
    let open = eastern
        .date()
        .and_hms_opt(9, 30, 0)
        .expect("valid time");
    let close = eastern
        .date()
        .and_hms_opt(16, 0, 0)
        .expect("valid time");
    eastern >= open && eastern < close
}

/// Minutes elapsed since today's 09:30 ET open. Negative/irrelevant outside
/// market hours; callers should gate on `is_market_hours` first.
pub fn minutes_since_open(utc: DateTime<Utc>) -> i64 {
    let eastern = to_eastern_naive(utc);
    let open = eastern.date().and_hms_opt(9, 30, 0).expect("valid time");
    (eastern - open).num_minutes()
}

/// Minutes remaining until today's 16:00 ET close.
pub fn minutes_to_close(utc: DateTime<Utc>) -> i64 {
    let eastern = to_eastern_naive(utc);
    let close = eastern.date().and_hms_opt(16, 0, 0).expect("valid time");
    (close - eastern).num_minutes()
}

/// Calendar date (ET) for grouping daily accounting / audit-log rotation.
pub fn eastern_date(utc: DateTime<Utc>) -> NaiveDate {
    to_eastern_naive(utc).date()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn summer_is_dst_utc_minus_4() {
        // July 15 2026, 14:30 UTC == 10:30 ET (UTC-4)
        let t = utc(2026, 7, 15, 14, 30);
        assert!(is_market_hours(t));
        assert_eq!(minutes_since_open(t), 60);
    }

    #[test]
    fn winter_is_standard_utc_minus_5() {
        // Jan 15 2026, 14:30 UTC == 09:30 ET (UTC-5) == open
        let t = utc(2026, 1, 15, 14, 30);
        assert!(is_market_hours(t));
        assert_eq!(minutes_since_open(t), 0);
    }

    #[test]
    fn before_open_is_not_market_hours() {
        let t = utc(2026, 7, 15, 12, 0); // 08:00 ET
        assert!(!is_market_hours(t));
    }

    #[test]
    fn after_close_is_not_market_hours() {
        let t = utc(2026, 7, 15, 21, 0); // 17:00 ET
        assert!(!is_market_hours(t));
    }

    #[test]
    fn weekend_is_not_market_hours() {
        // July 18 2026 is a Saturday
        let t = utc(2026, 7, 18, 15, 0);
        assert!(!is_market_hours(t));
    }

    #[test]
    fn minutes_to_close_decreases_towards_zero() {
        let t = utc(2026, 7, 15, 19, 45); // 15:45 ET
        assert_eq!(minutes_to_close(t), 15);
    }

    #[test]
    fn eastern_date_rolls_over_correctly() {
        // 2026-07-16 03:00 UTC is still 2026-07-15 23:00 ET
        let t = utc(2026, 7, 16, 3, 0);
        assert_eq!(eastern_date(t), NaiveDate::from_ymd_opt(2026, 7, 15).unwrap());
    }
}
