//! Date math parsing with optional rounding precision.
//!
//! Supports `now`, ISO-8601 timestamps, epoch milliseconds and anchored
//! expressions (`2015-05-01||+1M/d`) followed by any number of `+N<unit>`,
//! `-N<unit>` and `/<unit>` operations. Units are `y M w d h H m s`.
//! Rounding (`/unit` or the configured precision) goes to the start of the
//! unit for lower bounds and to its last millisecond for upper bounds.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, TimeDelta, Timelike, Utc};
use regex::Regex;

use crate::error::{StateError, StateResult};
use crate::types::Timestamp;

/// One `+N<unit>`, `-N<unit>` or `/<unit>` operation.
static MATH_OP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([+-])(\d*)([yMwdhHms])|/([yMwdhHms])").expect("valid regex")
});

/// Calendar units understood by date math and the time precision setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Year,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
}

impl TimeUnit {
    /// Parse a single date-math unit symbol (`M` is month, `m` is minute).
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "y" => Some(Self::Year),
            "M" => Some(Self::Month),
            "w" => Some(Self::Week),
            "d" => Some(Self::Day),
            "h" | "H" => Some(Self::Hour),
            "m" => Some(Self::Minute),
            "s" => Some(Self::Second),
            _ => None,
        }
    }
}

impl FromStr for TimeUnit {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_symbol(s).ok_or_else(|| StateError::InvalidDateMath(format!("unknown unit '{s}'")))
    }
}

/// Parse a date-math expression relative to `now`.
pub fn parse(text: &str, round_up: bool, now: Timestamp) -> StateResult<Timestamp> {
    let text = text.trim();
    let (anchor, math) = if let Some(math) = text.strip_prefix("now") {
        (now, math)
    } else if let Some((anchor, math)) = text.split_once("||") {
        (parse_anchor(anchor)?, math)
    } else {
        return parse_anchor(text);
    };
    apply_math(anchor, math, round_up).ok_or_else(|| StateError::InvalidDateMath(text.to_string()))
}

/// Parse a date-math expression, then round it to `precision` when one is set.
pub fn parse_with_precision(
    text: &str,
    round_up: bool,
    precision: Option<TimeUnit>,
    now: Timestamp,
) -> StateResult<Timestamp> {
    let time = parse(text, round_up, now)?;
    match precision {
        None => Ok(time),
        Some(unit) => round(time, unit, round_up)
            .ok_or_else(|| StateError::InvalidDateMath(text.to_string())),
    }
}

fn parse_anchor(text: &str) -> StateResult<Timestamp> {
    if let Ok(time) = DateTime::parse_from_rfc3339(text) {
        return Ok(time.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }
    text.parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| StateError::InvalidDateMath(text.to_string()))
}

fn apply_math(mut time: Timestamp, math: &str, round_up: bool) -> Option<Timestamp> {
    let mut consumed = 0;
    for caps in MATH_OP_RE.captures_iter(math) {
        let whole = caps.get(0)?;
        if whole.start() != consumed {
            return None;
        }
        consumed = whole.end();

        if let Some(unit) = caps.get(4) {
            time = round(time, TimeUnit::from_symbol(unit.as_str())?, round_up)?;
            continue;
        }
        let amount: i64 = match caps.get(2).map(|m| m.as_str()) {
            None | Some("") => 1,
            Some(digits) => digits.parse().ok()?,
        };
        let amount = if caps.get(1)?.as_str() == "-" { -amount } else { amount };
        time = shift(time, amount, TimeUnit::from_symbol(caps.get(3)?.as_str())?)?;
    }
    (consumed == math.len()).then_some(time)
}

pub(crate) fn shift(time: Timestamp, amount: i64, unit: TimeUnit) -> Option<Timestamp> {
    let months = match unit {
        TimeUnit::Year => Some(amount.checked_mul(12)?),
        TimeUnit::Month => Some(amount),
        _ => None,
    };
    if let Some(months) = months {
        let count = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
        return if months >= 0 {
            time.checked_add_months(count)
        } else {
            time.checked_sub_months(count)
        };
    }
    let delta = match unit {
        TimeUnit::Week => TimeDelta::try_weeks(amount)?,
        TimeUnit::Day => TimeDelta::try_days(amount)?,
        TimeUnit::Hour => TimeDelta::try_hours(amount)?,
        TimeUnit::Minute => TimeDelta::try_minutes(amount)?,
        TimeUnit::Second => TimeDelta::try_seconds(amount)?,
        TimeUnit::Year | TimeUnit::Month => return None,
    };
    time.checked_add_signed(delta)
}

pub(crate) fn round(time: Timestamp, unit: TimeUnit, round_up: bool) -> Option<Timestamp> {
    let start = start_of(time, unit)?;
    if !round_up {
        return Some(start);
    }
    shift(start, 1, unit)?.checked_sub_signed(TimeDelta::milliseconds(1))
}

pub(crate) fn start_of(time: Timestamp, unit: TimeUnit) -> Option<Timestamp> {
    let date = time.date_naive();
    let start = match unit {
        TimeUnit::Second => return time.with_nanosecond(0),
        TimeUnit::Minute => return time.with_second(0)?.with_nanosecond(0),
        TimeUnit::Hour => date.and_hms_opt(time.hour(), 0, 0)?,
        TimeUnit::Day => date.and_hms_opt(0, 0, 0)?,
        TimeUnit::Week => {
            let offset = i64::from(date.weekday().num_days_from_monday());
            (date - TimeDelta::try_days(offset)?).and_hms_opt(0, 0, 0)?
        }
        TimeUnit::Month => NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?.and_hms_opt(0, 0, 0)?,
        TimeUnit::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1)?.and_hms_opt(0, 0, 0)?,
    };
    Some(start.and_utc())
}
