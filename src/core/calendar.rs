//! Calendar utilities - weekday naming, week and month ranges, and "today".
//!
//! All ranges are half-open (`[start, end)`). "Today" is resolved through a [`Clock`]
//! so the scheduler and the template projection can be driven by a fixed date in tests.

use crate::errors::{Error, Result};
use chrono::{Datelike, Days, Months, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;

/// Wire format for dates at every interface boundary.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Source of the current civil date.
pub trait Clock: Send + Sync {
    /// The current date in the office's timezone.
    fn today(&self) -> NaiveDate;
}

/// Resolves "today" from the system clock in a fixed civil timezone.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    timezone: Tz,
}

impl SystemClock {
    /// Creates a clock for the given IANA timezone.
    #[must_use]
    pub const fn new(timezone: Tz) -> Self {
        Self { timezone }
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }
}

/// A clock pinned to one date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Parses a strict `YYYY-MM-DD` date. Unpadded forms such as `2024-7-1` are rejected.
pub fn parse_iso_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, ISO_DATE_FORMAT)
        .ok()
        .filter(|date| format_iso_date(*date) == value)
        .ok_or_else(|| Error::InvalidDate {
            value: value.to_string(),
        })
}

/// Formats a date as `YYYY-MM-DD`.
#[must_use]
pub fn format_iso_date(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}

/// Human-readable form used in notifications, e.g. "Wednesday, July 10, 2024".
#[must_use]
pub fn format_long_date(date: NaiveDate) -> String {
    date.format("%A, %B %d, %Y").to_string()
}

/// English name of the date's weekday.
#[must_use]
pub fn weekday_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Monday through Friday.
#[must_use]
pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The day after `date`.
#[must_use]
pub fn tomorrow(date: NaiveDate) -> NaiveDate {
    date + Days::new(1)
}

/// A half-open range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// First date in the range
    pub start: NaiveDate,
    /// First date after the range
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates `[start, end)`. An `end` at or before `start` gives an empty range.
    #[must_use]
    pub const fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// True when the range holds no dates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Every date in the range, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day < end)
    }

    /// Every Monday-Friday date in the range, in order.
    pub fn weekdays(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        self.days().filter(|day| is_weekday(*day))
    }
}

/// The Monday-based week containing `date`: Monday up to (not including) the next Monday.
#[must_use]
pub fn week_range(date: NaiveDate) -> DateRange {
    let monday = date - Days::new(u64::from(date.weekday().num_days_from_monday()));
    DateRange::new(monday, monday + Days::new(7))
}

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct YearMonth(NaiveDate);

impl YearMonth {
    /// The month containing `date`.
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self(date.with_day(1).unwrap_or(date))
    }

    /// Builds a month from its number (1-12); `None` when out of range.
    #[must_use]
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    /// Calendar year.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Month number, 1-12.
    #[must_use]
    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// The following month, rolling December over into January.
    #[must_use]
    pub fn next(self) -> Self {
        self.0.checked_add_months(Months::new(1)).map_or(self, Self)
    }

    /// The preceding month, rolling January back into December.
    #[must_use]
    pub fn previous(self) -> Self {
        self.0.checked_sub_months(Months::new(1)).map_or(self, Self)
    }

    /// The whole month as a half-open range.
    #[must_use]
    pub fn range(self) -> DateRange {
        DateRange::new(self.0, self.next().0)
    }
}

/// Half-open range covering the given month; `None` for an invalid month number.
#[must_use]
pub fn month_range(year: i32, month: u32) -> Option<DateRange> {
    YearMonth::new(year, month).map(YearMonth::range)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_iso_date_is_strict() {
        assert_eq!(parse_iso_date("2024-07-10").unwrap(), date(2024, 7, 10));
        assert!(matches!(
            parse_iso_date("2024-7-10"),
            Err(Error::InvalidDate { .. })
        ));
        assert!(parse_iso_date("10/07/2024").is_err());
        assert!(parse_iso_date("2024-02-30").is_err());
        assert!(parse_iso_date("").is_err());
    }

    #[test]
    fn test_format_dates() {
        assert_eq!(format_iso_date(date(2024, 7, 1)), "2024-07-01");
        assert_eq!(
            format_long_date(date(2024, 7, 10)),
            "Wednesday, July 10, 2024"
        );
        assert_eq!(weekday_name(date(2024, 7, 13)), "Saturday");
    }

    #[test]
    fn test_week_range_starts_on_monday() {
        let range = week_range(date(2024, 7, 10));
        assert_eq!(range.start, date(2024, 7, 8));
        assert_eq!(range.end, date(2024, 7, 15));

        // A Sunday belongs to the week that started six days earlier
        let sunday = week_range(date(2024, 7, 14));
        assert_eq!(sunday.start, date(2024, 7, 8));
    }

    #[test]
    fn test_month_range_rolls_over_year() {
        let december = month_range(2024, 12).unwrap();
        assert_eq!(december.start, date(2024, 12, 1));
        assert_eq!(december.end, date(2025, 1, 1));
        assert_eq!(december.days().last(), Some(date(2024, 12, 31)));
        assert!(month_range(2024, 13).is_none());

        let january = YearMonth::of(date(2025, 1, 20));
        assert_eq!(january.previous(), YearMonth::new(2024, 12).unwrap());
        assert_eq!(january.previous().next(), january);
    }

    #[test]
    fn test_weekdays_skip_weekends() {
        let july = month_range(2024, 7).unwrap();
        assert_eq!(july.days().count(), 31);
        assert_eq!(july.weekdays().count(), 23);
        assert!(july.weekdays().all(is_weekday));

        let february_leap = month_range(2024, 2).unwrap();
        assert_eq!(february_leap.days().count(), 29);
    }

    #[test]
    fn test_empty_range() {
        let day = date(2024, 7, 31);
        let range = DateRange::new(tomorrow(day), date(2024, 8, 1));
        assert!(range.is_empty());
        assert_eq!(range.days().count(), 0);
    }
}
