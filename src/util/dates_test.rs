use super::*;
use time::Month;

fn date(year: i32, month: Month, day: u8) -> Date {
    Date::from_calendar_date(year, month, day).unwrap()
}

#[test]
fn day_string_is_zero_padded() {
    assert_eq!(day_string(date(2024, Month::March, 5)), "2024-03-05");
}

#[test]
fn month_id_is_month_then_year() {
    assert_eq!(month_id(date(2024, Month::March, 5)), "03-2024");
    assert_eq!(month_id(date(2023, Month::December, 31)), "12-2023");
}

#[test]
fn parse_day_accepts_plain_days() {
    assert_eq!(parse_day("2024-03-05"), Some(date(2024, Month::March, 5)));
}

#[test]
fn parse_day_accepts_iso_timestamps() {
    assert_eq!(parse_day("2024-03-05T18:30:00.000Z"), Some(date(2024, Month::March, 5)));
}

#[test]
fn parse_day_rejects_garbage() {
    assert_eq!(parse_day("yesterday"), None);
    assert_eq!(parse_day("2024-13-05"), None);
    assert_eq!(parse_day(""), None);
}

#[test]
fn same_day_compares_dates_only() {
    assert!(same_day("2024-03-05", "2024-03-05T23:59:59Z"));
    assert!(!same_day("2024-03-05", "2024-03-06"));
    assert!(!same_day("nope", "nope"));
}

#[test]
fn today_round_trips_through_day_string() {
    let today = today();
    assert_eq!(parse_day(&day_string(today)), Some(today));
}
