//! Bound parsers and value formatters.
//!
//! Parsers turn the string literals of a range declaration into the numeric
//! bounds the matcher works on. Formatters only decorate output and never
//! influence matching.

use crate::error::{Error, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, SecondsFormat, TimeDelta, Timelike, Utc};
use std::fmt::{Debug, Write};

/// Execution context handed to bound parsers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregationContext {
    /// Anchor for `now` in date-math expressions.
    pub now: DateTime<Utc>,
}

impl AggregationContext {
    pub fn new() -> Self {
        Self { now: Utc::now() }
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Default for AggregationContext {
    fn default() -> Self {
        Self::new()
    }
}

pub trait ValueParser: Debug + Send + Sync {
    fn parse(&self, literal: &str, ctx: &AggregationContext) -> Result<f64>;
}

pub trait ValueFormatter: Debug + Send + Sync {
    fn format(&self, value: f64) -> String;
}

/// Plain decimal parser, also used when a field declares no parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberParser;

impl ValueParser for NumberParser {
    fn parse(&self, literal: &str, _ctx: &AggregationContext) -> Result<f64> {
        literal
            .trim()
            .parse::<f64>()
            .map_err(|e| Error::invalid_bound(literal, e))
    }
}

/// Parses dates and date-math into epoch milliseconds.
///
/// Accepted anchors: `now`, RFC 3339 timestamps, `YYYY-MM-DD`,
/// `YYYY-MM-DDTHH:MM:SS` and raw integer milliseconds. A non-`now` anchor
/// takes math after a `||` separator (`2024-01-01||+1M`). Math is a sequence
/// of `+N<unit>`, `-N<unit>` and `/<unit>` (round down) with units
/// `y M w d h H m s`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateMathParser;

impl ValueParser for DateMathParser {
    fn parse(&self, literal: &str, ctx: &AggregationContext) -> Result<f64> {
        let text = literal.trim();
        let (anchor, math) = if let Some(rest) = text.strip_prefix("now") {
            (ctx.now, rest)
        } else if let Some((date, rest)) = text.split_once("||") {
            (parse_date(date).ok_or_else(|| invalid_date(literal))?, rest)
        } else {
            (parse_date(text).ok_or_else(|| invalid_date(literal))?, "")
        };

        let resolved = apply_math(anchor, math).map_err(|reason| Error::invalid_bound(literal, reason))?;
        Ok(resolved.timestamp_millis() as f64)
    }
}

fn invalid_date(literal: &str) -> Error {
    Error::invalid_bound(literal, "not a recognized date")
}

fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(millis) = text.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn apply_math(mut dt: DateTime<Utc>, math: &str) -> std::result::Result<DateTime<Utc>, String> {
    let mut chars = math.chars().peekable();
    while let Some(op) = chars.next() {
        match op {
            '/' => {
                let unit = chars.next().ok_or("missing rounding unit")?;
                dt = round_down(dt, unit).ok_or_else(|| format!("cannot round to unit '{}'", unit))?;
            }
            '+' | '-' => {
                let mut digits = String::new();
                while let Some(c) = chars.peek().filter(|c| c.is_ascii_digit()) {
                    digits.push(*c);
                    chars.next();
                }
                let amount: i64 = if digits.is_empty() {
                    1
                } else {
                    digits.parse().map_err(|_| format!("bad amount '{}'", digits))?
                };
                let unit = chars.next().ok_or("missing unit after amount")?;
                let signed = if op == '-' { -amount } else { amount };
                dt = shift(dt, signed, unit).ok_or_else(|| format!("cannot shift by {}{}", signed, unit))?;
            }
            other => return Err(format!("unexpected '{}' in date math", other)),
        }
    }
    Ok(dt)
}

fn shift(dt: DateTime<Utc>, amount: i64, unit: char) -> Option<DateTime<Utc>> {
    let months = |n: i64| -> Option<DateTime<Utc>> {
        let m = Months::new(u32::try_from(n.unsigned_abs()).ok()?);
        if n >= 0 {
            dt.checked_add_months(m)
        } else {
            dt.checked_sub_months(m)
        }
    };
    let delta = match unit {
        'y' => return months(amount.checked_mul(12)?),
        'M' => return months(amount),
        'w' => TimeDelta::try_weeks(amount)?,
        'd' => TimeDelta::try_days(amount)?,
        'h' | 'H' => TimeDelta::try_hours(amount)?,
        'm' => TimeDelta::try_minutes(amount)?,
        's' => TimeDelta::try_seconds(amount)?,
        _ => return None,
    };
    dt.checked_add_signed(delta)
}

fn round_down(dt: DateTime<Utc>, unit: char) -> Option<DateTime<Utc>> {
    let date = dt.date_naive();
    let naive = match unit {
        'y' => NaiveDate::from_ymd_opt(date.year(), 1, 1)?.and_hms_opt(0, 0, 0)?,
        'M' => NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?.and_hms_opt(0, 0, 0)?,
        'w' => date
            .checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_monday())))?
            .and_hms_opt(0, 0, 0)?,
        'd' => date.and_hms_opt(0, 0, 0)?,
        'h' | 'H' => date.and_hms_opt(dt.hour(), 0, 0)?,
        'm' => date.and_hms_opt(dt.hour(), dt.minute(), 0)?,
        's' => date.and_hms_opt(dt.hour(), dt.minute(), dt.second())?,
        _ => return None,
    };
    Some(naive.and_utc())
}

/// Renders numbers the way they appear in generated bucket keys (`10.0`).
#[derive(Debug, Clone, Copy, Default)]
pub struct RawFormatter;

impl ValueFormatter for RawFormatter {
    fn format(&self, value: f64) -> String {
        if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
            format!("{:.1}", value)
        } else {
            value.to_string()
        }
    }
}

/// Renders epoch milliseconds as dates.
#[derive(Debug, Clone, Default)]
pub struct DateFormatter {
    /// chrono `strftime` pattern; RFC 3339 with millis when absent.
    pattern: Option<String>,
}

impl DateFormatter {
    pub fn new(pattern: Option<String>) -> Self {
        Self { pattern }
    }

    /// Like [`DateFormatter::new`], but rejects patterns chrono cannot render.
    pub fn validated(pattern: Option<String>) -> Result<Self> {
        if let Some(p) = &pattern {
            if StrftimeItems::new(p).any(|item| matches!(item, Item::Error)) {
                return Err(Error::InvalidRequest(format!("invalid date format pattern {:?}", p)));
            }
        }
        Ok(Self::new(pattern))
    }
}

impl ValueFormatter for DateFormatter {
    fn format(&self, value: f64) -> String {
        let Some(dt) = DateTime::from_timestamp_millis(value as i64) else {
            return RawFormatter.format(value);
        };
        let rfc3339 = || dt.to_rfc3339_opts(SecondsFormat::Millis, true);
        match &self.pattern {
            Some(pattern) => {
                let mut out = String::new();
                match write!(out, "{}", dt.format(pattern)) {
                    Ok(()) => out,
                    Err(_) => rfc3339(),
                }
            }
            None => rfc3339(),
        }
    }
}
