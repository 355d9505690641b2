//! Day and month keys used by the expense endpoints.
//!
//! Budgets are keyed by calendar day (`YYYY-MM-DD`), monthly summaries by
//! month id (`MM-YYYY`). The backend sends full ISO timestamps in listings;
//! only their date part matters here.

#[cfg(test)]
#[path = "dates_test.rs"]
mod dates_test;

use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// Today's date in the local timezone, falling back to UTC when the local
/// offset cannot be determined.
#[must_use]
pub fn today() -> Date {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc()).date()
}

/// `YYYY-MM-DD` key for `date`.
#[must_use]
pub fn day_string(date: Date) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day())
}

/// `MM-YYYY` month id for `date`.
#[must_use]
pub fn month_id(date: Date) -> String {
    format!("{:02}-{:04}", u8::from(date.month()), date.year())
}

/// Parse a plain day or the date part of an ISO timestamp.
#[must_use]
pub fn parse_day(raw: &str) -> Option<Date> {
    let day = raw.trim().get(..10)?;
    Date::parse(day, format_description!("[year]-[month]-[day]")).ok()
}

/// Whether two day strings or timestamps fall on the same calendar day.
#[must_use]
pub fn same_day(a: &str, b: &str) -> bool {
    match (parse_day(a), parse_day(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
