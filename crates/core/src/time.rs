//! Time range settings, default-time detection and bound intersection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::date_math::{self, TimeUnit};
use crate::error::{StateError, StateResult};
use crate::types::Timestamp;

/// How the time picker expresses a range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeMode {
    #[default]
    Quick,
    Relative,
    Absolute,
}

impl fmt::Display for TimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Quick => "quick",
            Self::Relative => "relative",
            Self::Absolute => "absolute",
        };
        f.write_str(name)
    }
}

impl FromStr for TimeMode {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quick" => Ok(Self::Quick),
            "relative" => Ok(Self::Relative),
            "absolute" => Ok(Self::Absolute),
            other => Err(StateError::Serialization(format!("unknown time mode '{other}'"))),
        }
    }
}

/// A time range as shown by the time picker: mode plus date-math bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSettings {
    pub mode: TimeMode,
    pub from: String,
    pub to: String,
}

impl TimeSettings {
    pub fn new(mode: TimeMode, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            mode,
            from: from.into(),
            to: to.into(),
        }
    }

    /// Resolve `from`/`to` into absolute instants.
    pub fn bounds(&self, precision: Option<TimeUnit>, now: Timestamp) -> StateResult<TimeBounds> {
        Ok(TimeBounds {
            min: date_math::parse_with_precision(&self.from, false, precision, now)?,
            max: date_math::parse_with_precision(&self.to, true, precision, now)?,
        })
    }
}

/// Compact form of [`TimeSettings`] stored per dashboard (`{m, f, t}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedTime {
    #[serde(rename = "m")]
    pub mode: TimeMode,
    #[serde(rename = "f")]
    pub from: String,
    #[serde(rename = "t")]
    pub to: String,
}

impl From<TimeSettings> for PersistedTime {
    fn from(time: TimeSettings) -> Self {
        Self {
            mode: time.mode,
            from: time.from,
            to: time.to,
        }
    }
}

impl From<PersistedTime> for TimeSettings {
    fn from(time: PersistedTime) -> Self {
        Self {
            mode: time.mode,
            from: time.from,
            to: time.to,
        }
    }
}

/// Returns `true` iff mode and both bounds equal the configured `timepicker:timeDefaults`.
pub fn is_default_time(mode: TimeMode, from: &str, to: &str, defaults: &TimeSettings) -> bool {
    mode == defaults.mode && from == defaults.from && to == defaults.to
}

/// An absolute time interval. `min > max` denotes an empty interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBounds {
    pub min: Timestamp,
    pub max: Timestamp,
}

impl TimeBounds {
    /// Narrow to the overlap with `other`: latest min, earliest max.
    pub fn intersect(self, other: TimeBounds) -> TimeBounds {
        TimeBounds {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }
}

/// Intersect every interval. Returns `None` for an empty input.
pub fn intersect_all(bounds: impl IntoIterator<Item = TimeBounds>) -> Option<TimeBounds> {
    bounds.into_iter().reduce(TimeBounds::intersect)
}
