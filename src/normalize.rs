//! Field normalization for legacy CSV cells.
//!
//! [`clean`] turns a raw cell plus its declared [`FieldType`] into a typed
//! [`SqlValue`]. Malformed input never fails: integers fall back to zero and
//! dates to NULL, and the returned [`Cleaned`] carries a [`Degradation`] so
//! callers can count what was lost.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::entity::SqlValue;
use crate::report::Degradation;

/// Cell values that mean "no value" in the legacy exports.
const NULL_MARKERS: [&str; 2] = ["NULL", "NA"];

/// Declared semantic type of a source column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Integer,
    Boolean,
    Date,
}

/// Result of normalizing one cell
#[derive(Debug, Clone, PartialEq)]
pub struct Cleaned {
    pub value: SqlValue,
    pub degradation: Option<Degradation>,
}

impl Cleaned {
    fn exact(value: SqlValue) -> Self {
        Self {
            value,
            degradation: None,
        }
    }

    fn degraded(value: SqlValue, kind: Degradation) -> Self {
        Self {
            value,
            degradation: Some(kind),
        }
    }

    /// SQL literal for the cleaned value (`NULL`, `12`, `true`, `'text'`, ...)
    pub fn literal(&self) -> String {
        self.value.to_string()
    }
}

/// One candidate layout for legacy date cells.
#[derive(Debug, Clone, Copy)]
pub struct DateFormat {
    pub pattern: &'static str,
    has_time: bool,
    fractional: bool,
    year_first: bool,
    year_digits: usize,
}

impl DateFormat {
    const fn new(
        pattern: &'static str,
        has_time: bool,
        fractional: bool,
        year_first: bool,
        year_digits: usize,
    ) -> Self {
        Self {
            pattern,
            has_time,
            fractional,
            year_first,
            year_digits,
        }
    }

    /// Parse `value` with this layout.
    pub fn parse(&self, value: &str) -> Option<NaiveDateTime> {
        // chrono is looser than the legacy layouts on year width and on the
        // fraction, which must be present with one to six digits
        if !self.year_width_matches(value) {
            return None;
        }
        if self.fractional && !has_fractional_seconds(value) {
            return None;
        }

        let parsed = if self.has_time {
            let parsed = NaiveDateTime::parse_from_str(value, self.pattern).ok()?;
            // second 60 comes back as a leap-second nanosecond value
            if parsed.nanosecond() >= 1_000_000_000 {
                return None;
            }
            parsed
        } else {
            NaiveDate::parse_from_str(value, self.pattern)
                .ok()?
                .and_hms_opt(0, 0, 0)?
        };

        if self.year_digits == 2 {
            Some(pivot_two_digit_year(parsed))
        } else {
            Some(parsed)
        }
    }

    fn year_width_matches(&self, value: &str) -> bool {
        let date_part = value.split(' ').next().unwrap_or_default();
        let mut parts = date_part.split('-');
        let year = if self.year_first {
            parts.next()
        } else {
            parts.nth(2)
        };

        year.map_or(false, |y| {
            y.len() == self.year_digits && y.bytes().all(|b| b.is_ascii_digit())
        })
    }
}

/// Candidate date layouts, tried in order. The first layout that parses
/// wins, so the order decides how ambiguous cells are read.
pub const DATE_FORMATS: [DateFormat; 6] = [
    DateFormat::new("%d-%m-%y", false, false, false, 2),
    DateFormat::new("%Y-%m-%d %H:%M:%S%.f", true, true, true, 4),
    DateFormat::new("%d-%m-%y %H:%M:%S%.f", true, true, false, 2),
    DateFormat::new("%d-%m-%y %H:%M:%S", true, false, false, 2),
    DateFormat::new("%Y-%m-%d", false, false, true, 4),
    DateFormat::new("%d-%m-%Y", false, false, false, 4),
];

/// Normalize a raw cell according to its declared type.
///
/// Blank cells and the `NULL`/`NA` markers become [`SqlValue::Null`]
/// whatever the declared type.
pub fn clean(raw: Option<&str>, field_type: FieldType) -> Cleaned {
    let value = match raw.map(str::trim) {
        Some(v) if !v.is_empty() && !NULL_MARKERS.contains(&v) => v,
        _ => return Cleaned::exact(SqlValue::Null),
    };

    match field_type {
        FieldType::Text => Cleaned::exact(SqlValue::Text(value.to_string())),
        FieldType::Integer => match parse_integer(value) {
            Ok(n) => Cleaned::exact(SqlValue::Integer(n)),
            Err(kind) => Cleaned::degraded(SqlValue::Integer(0), kind),
        },
        FieldType::Boolean => {
            let cleaned = SqlValue::Bool(value == "1");
            if value == "1" || value == "0" {
                Cleaned::exact(cleaned)
            } else {
                Cleaned::degraded(cleaned, Degradation::BooleanDefaulted)
            }
        }
        FieldType::Date => match parse_date(value) {
            Some(ts) => Cleaned::exact(SqlValue::Timestamp(ts)),
            None => Cleaned::degraded(SqlValue::Null, Degradation::DateUnparsed),
        },
    }
}

/// Parse a decimal-looking number and truncate it toward zero.
///
/// Text that is not a finite number is [`Degradation::IntegerCoercedToZero`];
/// a number that truncates outside `i64` is [`Degradation::IntegerOutOfRange`].
pub fn parse_integer(value: &str) -> Result<i64, Degradation> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| Degradation::IntegerCoercedToZero)?;
    if !parsed.is_finite() {
        return Err(Degradation::IntegerCoercedToZero);
    }

    let truncated = parsed.trunc();
    if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
        return Err(Degradation::IntegerOutOfRange);
    }
    Ok(truncated as i64)
}

/// Parse a date cell against [`DATE_FORMATS`], first match wins.
pub fn parse_date(value: &str) -> Option<NaiveDateTime> {
    DATE_FORMATS.iter().find_map(|format| format.parse(value))
}

/// True when the seconds field carries a `.` followed by 1 to 6 digits.
fn has_fractional_seconds(value: &str) -> bool {
    let seconds = value.rsplit(':').next().unwrap_or_default();
    match seconds.split_once('.') {
        Some((_, fraction)) => {
            (1..=6).contains(&fraction.len()) && fraction.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

/// Two-digit years follow the POSIX `strptime` pivot: 69..=99 is the 1900s,
/// 00..=68 is the 2000s.
fn pivot_two_digit_year(parsed: NaiveDateTime) -> NaiveDateTime {
    if parsed.year() >= 2069 {
        parsed.with_year(parsed.year() - 100).unwrap_or(parsed)
    } else {
        parsed
    }
}
