// src/utils/calendar.rs

//! Business-day arithmetic (weekends excluded, no holiday calendar).

use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Whether `date` falls on Monday through Friday.
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The date `n` business days before `date`.
///
/// `n == 0` returns `date` unchanged, even on a weekend.
pub fn subtract_business_days(date: NaiveDate, n: u32) -> NaiveDate {
    let mut current = date;
    let mut remaining = n;
    while remaining > 0 {
        current = current - Days::new(1);
        if is_business_day(current) {
            remaining -= 1;
        }
    }
    current
}
