//! Calendar arithmetic, parsing and formatting behind `moment`.
//!
//! Instants cross the script boundary as epoch milliseconds. Each call says
//! whether it works in UTC or in the host's local zone.

use std::str::FromStr;

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Local, Months, NaiveDate, NaiveDateTime, TimeZone,
    Timelike, Utc,
};

use super::LibraryError;

/// Which wall clock an operation uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    /// Coordinated universal time.
    Utc,
    /// The host's local zone.
    Local,
}

impl Zone {
    /// Picks UTC when `utc` is set.
    #[must_use]
    pub const fn from_utc_flag(utc: bool) -> Self {
        if utc { Self::Utc } else { Self::Local }
    }

    /// The wall-clock view of an instant.
    #[must_use]
    pub fn wall(self, millis: i64) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::Utc => Utc.timestamp_millis_opt(millis).single().map(|d| d.fixed_offset()),
            Self::Local => Local
                .timestamp_millis_opt(millis)
                .single()
                .map(|d| d.fixed_offset()),
        }
    }

    /// The instant a wall-clock time names; ambiguous local times take the earlier.
    #[must_use]
    pub fn resolve(self, naive: NaiveDateTime) -> Option<i64> {
        match self {
            Self::Utc => Some(Utc.from_utc_datetime(&naive).timestamp_millis()),
            Self::Local => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|d| d.timestamp_millis()),
        }
    }
}

/// Calendar units accepted by `add`, `startOf` and `diff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// Years
    Year,
    /// Quarters
    Quarter,
    /// Months
    Month,
    /// Weeks, starting Sunday
    Week,
    /// Days
    Day,
    /// Hours
    Hour,
    /// Minutes
    Minute,
    /// Seconds
    Second,
    /// Milliseconds
    Millisecond,
}

impl FromStr for Unit {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Single-letter aliases are case-sensitive: `M` is month, `m` minute.
        match s {
            "y" => return Ok(Self::Year),
            "Q" => return Ok(Self::Quarter),
            "M" => return Ok(Self::Month),
            "w" => return Ok(Self::Week),
            "d" | "D" => return Ok(Self::Day),
            "h" => return Ok(Self::Hour),
            "m" => return Ok(Self::Minute),
            "s" => return Ok(Self::Second),
            "ms" => return Ok(Self::Millisecond),
            _ => {}
        }
        match s.to_ascii_lowercase().trim_end_matches('s') {
            "year" => Ok(Self::Year),
            "quarter" => Ok(Self::Quarter),
            "month" => Ok(Self::Month),
            "week" => Ok(Self::Week),
            "day" | "date" => Ok(Self::Day),
            "hour" => Ok(Self::Hour),
            "minute" => Ok(Self::Minute),
            "second" => Ok(Self::Second),
            "millisecond" => Ok(Self::Millisecond),
            _ => Err(LibraryError::UnknownUnit(s.to_string())),
        }
    }
}

impl Unit {
    const fn fixed_millis(self) -> Option<i64> {
        match self {
            Self::Week => Some(7 * 86_400_000),
            Self::Day => Some(86_400_000),
            Self::Hour => Some(3_600_000),
            Self::Minute => Some(60_000),
            Self::Second => Some(1000),
            Self::Millisecond => Some(1),
            Self::Year | Self::Quarter | Self::Month => None,
        }
    }
}

/// Largest distance from the epoch, in milliseconds, of a valid instant.
pub const MAX_INSTANT_MILLIS: i64 = 8_640_000_000_000_000;

/// Epoch milliseconds from a script number; `None` when not a valid instant.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn instant(value: f64) -> Option<i64> {
    (value.is_finite() && value.abs() <= MAX_INSTANT_MILLIS as f64).then(|| value.trunc() as i64)
}

/// Current instant in epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Broken-down fields: year, month (0-based), day, hour, minute, second,
/// millisecond, weekday (0 = Sunday), UTC offset in minutes.
#[must_use]
pub fn fields(millis: i64, zone: Zone) -> Option<[i64; 9]> {
    let dt = zone.wall(millis)?;
    Some([
        i64::from(dt.year()),
        i64::from(dt.month0()),
        i64::from(dt.day()),
        i64::from(dt.hour()),
        i64::from(dt.minute()),
        i64::from(dt.second()),
        i64::from(dt.timestamp_subsec_millis()),
        i64::from(dt.weekday().num_days_from_sunday()),
        i64::from(dt.offset().local_minus_utc() / 60),
    ])
}

/// Instant from broken-down fields; the month is 0-based.
#[must_use]
pub fn from_fields(parts: [i64; 7], zone: Zone) -> Option<i64> {
    let [year, month0, day, hour, minute, second, milli] = parts;
    let date = NaiveDate::from_ymd_opt(
        i32::try_from(year).ok()?,
        u32::try_from(month0 + 1).ok()?,
        u32::try_from(day).ok()?,
    )?;
    let naive = date.and_hms_milli_opt(
        u32::try_from(hour).ok()?,
        u32::try_from(minute).ok()?,
        u32::try_from(second).ok()?,
        u32::try_from(milli).ok()?,
    )?;
    zone.resolve(naive)
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parses ISO 8601 and RFC 2822 text, or text in an explicit `moment` format.
///
/// Text without an offset is read in `zone`.
#[must_use]
pub fn parse(input: &str, format: Option<&str>, zone: Zone) -> Option<i64> {
    let input = input.trim();
    match format {
        Some(format) => parse_with_format(input, format, zone),
        None => parse_iso(input, zone),
    }
}

fn parse_iso(input: &str, zone: Zone) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
        return Some(dt.timestamp_millis());
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return zone.resolve(naive);
        }
    }
    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d").ok()?;
    zone.resolve(date.and_hms_opt(0, 0, 0)?)
}

fn parse_with_format(input: &str, format: &str, zone: Zone) -> Option<i64> {
    if format == "x" {
        return input.parse().ok();
    }
    let pattern = to_strftime(format);
    if let Ok(dt) = DateTime::parse_from_str(input, &pattern) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, &pattern) {
        return zone.resolve(naive);
    }
    let date = NaiveDate::parse_from_str(input, &pattern).ok()?;
    zone.resolve(date.and_hms_opt(0, 0, 0)?)
}

const TOKENS: [&str; 27] = [
    "YYYY", "YY", "MMMM", "MMM", "MM", "M", "Do", "DD", "D", "dddd", "ddd", "d", "HH", "H", "hh",
    "h", "mm", "m", "ss", "s", "SSS", "A", "a", "ZZ", "Z", "X", "x",
];

/// Splits a `moment` format into tokens and literal runs.
fn tokenize(format: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut rest = format;
    while let Some(c) = rest.chars().next() {
        if c == '['
            && let Some(end) = rest.find(']')
        {
            pieces.push(Piece::Literal(&rest[1..end]));
            rest = &rest[end + 1..];
            continue;
        }
        if let Some(token) = TOKENS.iter().find(|t| rest.starts_with(**t)) {
            pieces.push(Piece::Token(token));
            rest = &rest[token.len()..];
            continue;
        }
        pieces.push(Piece::Literal(&rest[..c.len_utf8()]));
        rest = &rest[c.len_utf8()..];
    }
    pieces
}

enum Piece<'a> {
    Token(&'a str),
    Literal(&'a str),
}

fn to_strftime(format: &str) -> String {
    let mut pattern = String::new();
    for piece in tokenize(format) {
        match piece {
            Piece::Literal(text) => pattern.push_str(&text.replace('%', "%%")),
            Piece::Token(token) => pattern.push_str(match token {
                "YYYY" => "%Y",
                "YY" => "%y",
                "MMMM" => "%B",
                "MMM" => "%b",
                "MM" | "M" => "%m",
                "DD" | "D" | "Do" => "%d",
                "dddd" => "%A",
                "ddd" => "%a",
                "d" => "%w",
                "HH" | "H" => "%H",
                "hh" | "h" => "%I",
                "mm" | "m" => "%M",
                "ss" | "s" => "%S",
                "SSS" => "%3f",
                "A" | "a" => "%p",
                "ZZ" => "%z",
                "Z" => "%:z",
                _ => "%s",
            }),
        }
    }
    pattern
}

/// Renders an instant with a `moment` format string.
#[must_use]
pub fn format(millis: i64, zone: Zone, format: &str) -> Option<String> {
    let dt = zone.wall(millis)?;
    let mut out = String::new();
    for piece in tokenize(format) {
        match piece {
            Piece::Literal(text) => out.push_str(text),
            Piece::Token(token) => out.push_str(&render(token, &dt)),
        }
    }
    Some(out)
}

fn render(token: &str, dt: &DateTime<FixedOffset>) -> String {
    let (pm, hour12) = dt.hour12();
    match token {
        "YYYY" => format!("{:04}", dt.year()),
        "YY" => format!("{:02}", dt.year().rem_euclid(100)),
        "MMMM" => dt.format("%B").to_string(),
        "MMM" => dt.format("%b").to_string(),
        "MM" => format!("{:02}", dt.month()),
        "M" => dt.month().to_string(),
        "Do" => ordinal(dt.day()),
        "DD" => format!("{:02}", dt.day()),
        "D" => dt.day().to_string(),
        "dddd" => dt.format("%A").to_string(),
        "ddd" => dt.format("%a").to_string(),
        "d" => dt.weekday().num_days_from_sunday().to_string(),
        "HH" => format!("{:02}", dt.hour()),
        "H" => dt.hour().to_string(),
        "hh" => format!("{hour12:02}"),
        "h" => hour12.to_string(),
        "mm" => format!("{:02}", dt.minute()),
        "m" => dt.minute().to_string(),
        "ss" => format!("{:02}", dt.second()),
        "s" => dt.second().to_string(),
        "SSS" => format!("{:03}", dt.timestamp_subsec_millis()),
        "A" => (if pm { "PM" } else { "AM" }).to_string(),
        "a" => (if pm { "pm" } else { "am" }).to_string(),
        "ZZ" => dt.format("%z").to_string(),
        "Z" => dt.format("%:z").to_string(),
        "X" => dt.timestamp().to_string(),
        _ => dt.timestamp_millis().to_string(),
    }
}

fn ordinal(day: u32) -> String {
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{day}{suffix}")
}

/// Adds `amount` units; calendar units keep the wall-clock time of day.
#[must_use]
pub fn add(millis: i64, zone: Zone, unit: Unit, amount: f64) -> Option<i64> {
    if !amount.is_finite() {
        return None;
    }
    match unit {
        Unit::Year | Unit::Quarter | Unit::Month => {
            let factor = match unit {
                Unit::Year => 12,
                Unit::Quarter => 3,
                _ => 1,
            };
            add_months(millis, zone, round(amount)?.checked_mul(factor)?)
        }
        Unit::Week | Unit::Day => {
            let days = round(amount)? * if unit == Unit::Week { 7 } else { 1 };
            let naive = zone.wall(millis)?.naive_local();
            zone.resolve(naive.checked_add_signed(Duration::try_days(days)?)?)
        }
        _ => {
            let step = unit.fixed_millis()?;
            millis.checked_add(round(amount * to_f64(step))?)
        }
    }
}

fn add_months(millis: i64, zone: Zone, months: i64) -> Option<i64> {
    let naive = zone.wall(millis)?.naive_local();
    let shifted = if months >= 0 {
        naive.checked_add_months(Months::new(u32::try_from(months).ok()?))?
    } else {
        naive.checked_sub_months(Months::new(u32::try_from(-months).ok()?))?
    };
    zone.resolve(shifted)
}

/// Rounds the instant down to the start of `unit`.
#[must_use]
pub fn start_of(millis: i64, zone: Zone, unit: Unit) -> Option<i64> {
    let naive = zone.wall(millis)?.naive_local();
    let date = naive.date();
    let start = match unit {
        Unit::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1)?.and_hms_opt(0, 0, 0)?,
        Unit::Quarter => {
            let month = date.month0() / 3 * 3 + 1;
            NaiveDate::from_ymd_opt(date.year(), month, 1)?.and_hms_opt(0, 0, 0)?
        }
        Unit::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?.and_hms_opt(0, 0, 0)?,
        Unit::Week => {
            let back = i64::from(date.weekday().num_days_from_sunday());
            date.checked_sub_signed(Duration::try_days(back)?)?
                .and_hms_opt(0, 0, 0)?
        }
        Unit::Day => date.and_hms_opt(0, 0, 0)?,
        Unit::Hour => date.and_hms_opt(naive.hour(), 0, 0)?,
        Unit::Minute => date.and_hms_opt(naive.hour(), naive.minute(), 0)?,
        Unit::Second => date.and_hms_opt(naive.hour(), naive.minute(), naive.second())?,
        Unit::Millisecond => return Some(millis),
    };
    zone.resolve(start)
}

/// Difference `a - b` in `unit`, truncated toward zero unless `precise`.
#[must_use]
pub fn diff(a: i64, b: i64, zone: Zone, unit: Unit, precise: bool) -> Option<f64> {
    let value = match unit.fixed_millis() {
        Some(step) => to_f64(a.checked_sub(b)?) / to_f64(step),
        None => {
            let months = month_diff(a, b, zone)?;
            match unit {
                Unit::Year => months / 12.0,
                Unit::Quarter => months / 3.0,
                _ => months,
            }
        }
    };
    Some(if precise { value } else { value.trunc() + 0.0 })
}

/// Whole and fractional months from `b` to `a`, anchored on `a`.
fn month_diff(a: i64, b: i64, zone: Zone) -> Option<f64> {
    let wa = zone.wall(a)?;
    let wb = zone.wall(b)?;
    let whole = i64::from(wb.year() - wa.year()) * 12 + i64::from(wb.month0()) - i64::from(wa.month0());
    let anchor = add_months(a, zone, whole)?;
    let adjust = if b < anchor {
        let previous = add_months(a, zone, whole - 1)?;
        to_f64(b - anchor) / to_f64(anchor - previous)
    } else {
        let next = add_months(a, zone, whole + 1)?;
        to_f64(b - anchor) / to_f64(next - anchor)
    };
    Some(-(to_f64(whole) + adjust) + 0.0)
}

#[allow(clippy::cast_precision_loss)]
const fn to_f64(value: i64) -> f64 {
    value as f64
}

#[allow(clippy::cast_possible_truncation)]
fn round(value: f64) -> Option<i64> {
    let rounded = value.round();
    (rounded.is_finite() && rounded.abs() < 9.0e15).then_some(rounded as i64)
}
