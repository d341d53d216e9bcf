//! Working-day arithmetic backing review and revision deadlines.
//!
//! A working day is any day that is not Saturday or Sunday. Holiday
//! calendars are an extension point the portal has not needed yet.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

pub fn is_working_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Advances `days` working days past `date`, walking one calendar day at a
/// time. `days == 0` returns the input unchanged; for any positive count the
/// result is always a working day.
pub fn add_working_days(date: NaiveDate, days: u32) -> NaiveDate {
    let mut current = date;
    let mut remaining = days;
    while remaining > 0 {
        current += Duration::days(1);
        if is_working_day(current) {
            remaining -= 1;
        }
    }
    current
}

/// Counts working days strictly after `start` up to and including `end`.
/// Zero when `end <= start` or the span crosses no working days.
pub fn working_days_between(start: NaiveDate, end: NaiveDate) -> u32 {
    if end <= start {
        return 0;
    }

    let mut count = 0;
    let mut current = start;
    while current < end {
        current += Duration::days(1);
        if is_working_day(current) {
            count += 1;
        }
    }
    count
}
