//! Text to number coercion and date serials
//!
//! Dates are OA serial numbers: day 0 is 1899-12-30 and serial 60 is the
//! fictitious 1900-02-29, so serials below 61 are shifted by one day.

use crate::options::NumberFormatInfo;
use chrono::{Datelike, Duration, NaiveDate};
use lazy_regex::{regex, regex_is_match};

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

/// Parse text as a number using the given separators.
///
/// Accepts a trailing `%` and time literals such as `12:30` or `6:15 PM`.
pub fn parse_number(text: &str, format: &NumberFormatInfo) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(rest) = trimmed.strip_suffix('%') {
        return parse_number(rest, format).map(|n| n / 100.0);
    }
    if let Some(time) = parse_time(trimmed) {
        return Some(time);
    }

    let normalized: String = trimmed
        .chars()
        .filter(|c| *c != format.group_separator)
        .map(|c| if c == format.decimal_separator { '.' } else { c })
        .collect();
    if !regex_is_match!(r"^[+-]?([0-9]+\.?[0-9]*|\.[0-9]+)([eE][+-]?[0-9]+)?$", &normalized) {
        return None;
    }
    normalized.parse().ok()
}

/// Numbers first, then dates
pub fn text_to_number(text: &str, format: &NumberFormatInfo) -> Option<f64> {
    parse_number(text, format).or_else(|| parse_date(text))
}

/// A time literal as a fraction of a day
pub fn parse_time(text: &str) -> Option<f64> {
    let captures = regex!(r"(?i)^(\d{1,2}):(\d{1,2})(?::(\d{1,2}(?:\.\d+)?))?\s*(am|pm)?$")
        .captures(text.trim())?;

    let mut hours: f64 = captures.get(1)?.as_str().parse().ok()?;
    let minutes: f64 = captures.get(2)?.as_str().parse().ok()?;
    let seconds: f64 = match captures.get(3) {
        Some(s) => s.as_str().parse().ok()?,
        None => 0.0,
    };
    if minutes >= 60.0 || seconds >= 60.0 {
        return None;
    }

    if let Some(meridiem) = captures.get(4) {
        if !(1.0..=12.0).contains(&hours) {
            return None;
        }
        let pm = meridiem.as_str().eq_ignore_ascii_case("pm");
        hours %= 12.0;
        if pm {
            hours += 12.0;
        }
    }

    Some((hours * 3600.0 + minutes * 60.0 + seconds) / 86_400.0)
}

/// A date literal (`2024-01-15`, `1/15/2024`, `15-Jan-2024`, `January 15, 2024`) as a serial
pub fn parse_date(text: &str) -> Option<f64> {
    const FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d-%b-%Y", "%B %d, %Y", "%b %d, %Y"];
    let text = text.trim();
    FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .map(date_to_serial)
}

pub fn date_to_serial(date: NaiveDate) -> f64 {
    let days = (date - epoch()).num_days();
    if days < 61 {
        (days - 1) as f64
    } else {
        days as f64
    }
}

/// Serial for a year, month and day, normalizing overflowing months and days
/// the way DATE does (`DATE(2024,14,1)` is February 2025).
pub fn ymd_to_serial(year: i32, month: i32, day: i32) -> Option<f64> {
    let year = if (0..1900).contains(&year) { year + 1900 } else { year };
    let months = year * 12 + (month - 1);
    let first = NaiveDate::from_ymd_opt(months.div_euclid(12), (months.rem_euclid(12) + 1) as u32, 1)?;
    let date = first.checked_add_signed(Duration::days(i64::from(day) - 1))?;
    if date.year() < 1900 || date.year() > 9999 {
        return None;
    }
    Some(date_to_serial(date))
}

/// Year, month and day of a serial. Serial 60 is 1900-02-29.
pub fn serial_to_ymd(serial: f64) -> Option<(i32, u32, u32)> {
    let days = serial.floor() as i64;
    if !(0..=2_958_465).contains(&days) {
        return None;
    }
    if days == 60 {
        return Some((1900, 2, 29));
    }
    let date = serial_to_date(serial)?;
    Some((date.year(), date.month(), date.day()))
}

/// The calendar date of a serial; `None` for serial 60, which has no real date
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    let days = serial.floor() as i64;
    match days {
        60 => None,
        d if d < 60 => epoch().checked_add_signed(Duration::days(d + 1)),
        d => epoch().checked_add_signed(Duration::days(d)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_with_locale() {
        let us = NumberFormatInfo::default();
        assert_eq!(parse_number("1,234.5", &us), Some(1234.5));
        assert_eq!(parse_number(" 42 ", &us), Some(42.0));
        assert_eq!(parse_number("50%", &us), Some(0.5));
        assert_eq!(parse_number("1e3", &us), Some(1000.0));
        assert_eq!(parse_number("abc", &us), None);
        assert_eq!(parse_number("inf", &us), None);

        let german = NumberFormatInfo {
            decimal_separator: ',',
            group_separator: '.',
        };
        assert_eq!(parse_number("1.234,5", &german), Some(1234.5));
    }

    #[test]
    fn test_time_literals() {
        assert_eq!(parse_time("12:00"), Some(0.5));
        assert_eq!(parse_time("6:00 PM"), Some(0.75));
        assert_eq!(parse_time("12:00 am"), Some(0.0));
        assert_eq!(parse_time("10:75"), None);
        assert_eq!(parse_number("18:00", &NumberFormatInfo::default()), Some(0.75));
    }

    #[test]
    fn test_serials_around_the_1900_quirk() {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(date_to_serial(date(1900, 1, 1)), 1.0);
        assert_eq!(date_to_serial(date(1900, 2, 28)), 59.0);
        assert_eq!(date_to_serial(date(1900, 3, 1)), 61.0);
        assert_eq!(date_to_serial(date(2024, 1, 15)), 45306.0);

        assert_eq!(serial_to_ymd(1.0), Some((1900, 1, 1)));
        assert_eq!(serial_to_ymd(60.0), Some((1900, 2, 29)));
        assert_eq!(serial_to_ymd(61.0), Some((1900, 3, 1)));
        assert_eq!(serial_to_ymd(45306.75), Some((2024, 1, 15)));
    }

    #[test]
    fn test_date_normalization() {
        assert_eq!(ymd_to_serial(2024, 1, 15), Some(45306.0));
        assert_eq!(ymd_to_serial(2023, 13, 15), Some(45306.0));
        assert_eq!(ymd_to_serial(2024, 2, 0), ymd_to_serial(2024, 1, 31));
        assert_eq!(parse_date("2024-01-15"), Some(45306.0));
        assert_eq!(parse_date("1/15/2024"), Some(45306.0));
    }
}
