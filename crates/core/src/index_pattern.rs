//! Index patterns and interval-based index expansion.

use serde::{Deserialize, Serialize};

use crate::date_math::{self, TimeUnit};
use crate::time::TimeBounds;
use crate::types::Timestamp;

/// Failures reported by the index-pattern service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexPatternError {
    /// The pattern matches no concrete index. Callers treat this as "nothing to show".
    #[error("No indices match pattern \"{0}\"")]
    MissingIndices(String),

    #[error("Index pattern not found: {0}")]
    NotFound(String),

    #[error("Index pattern service error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexField {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
}

/// Rollover interval of an interval-based pattern such as `[logs-]YYYY.MM.DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexInterval {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl IndexInterval {
    fn unit(self) -> TimeUnit {
        match self {
            Self::Hourly => TimeUnit::Hour,
            Self::Daily => TimeUnit::Day,
            Self::Weekly => TimeUnit::Week,
            Self::Monthly => TimeUnit::Month,
            Self::Yearly => TimeUnit::Year,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexPattern {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub time_field_name: Option<String>,
    #[serde(default)]
    pub fields: Vec<IndexField>,
    #[serde(default)]
    pub interval_name: Option<IndexInterval>,
}

impl IndexPattern {
    pub fn is_time_based(&self) -> bool {
        self.time_field_name.as_deref().is_some_and(|name| !name.is_empty())
    }

    /// The declared time field, if it is also one of the pattern's fields.
    pub fn time_field(&self) -> Option<&IndexField> {
        let name = self.time_field_name.as_deref()?;
        self.fields.iter().find(|field| field.name == name)
    }

    /// Concrete index names of an interval-based pattern covering `bounds`,
    /// oldest first. `None` when the pattern has no interval.
    pub fn interval_indices(&self, bounds: TimeBounds) -> Option<Vec<String>> {
        let unit = self.interval_name?.unit();
        let format = strftime_from_moment(if self.title.is_empty() { &self.id } else { &self.title });

        let mut indices: Vec<String> = Vec::new();
        let mut cursor: Timestamp = date_math::start_of(bounds.min, unit)?;
        while cursor <= bounds.max {
            let name = cursor.format(&format).to_string();
            if indices.last() != Some(&name) {
                indices.push(name);
            }
            cursor = date_math::shift(cursor, 1, unit)?;
        }
        Some(indices)
    }
}

/// Translate a moment-style index format (`[logs-]YYYY.MM.DD`) into a strftime format.
fn strftime_from_moment(pattern: &str) -> String {
    const TOKENS: &[(&str, &str)] = &[
        ("YYYY", "%Y"),
        ("GGGG", "%G"),
        ("MM", "%m"),
        ("DD", "%d"),
        ("HH", "%H"),
        ("WW", "%V"),
    ];

    let mut out = String::with_capacity(pattern.len() + 8);
    let mut rest = pattern;
    'outer: while let Some(c) = rest.chars().next() {
        if c == '[' {
            let literal_end = rest.find(']').unwrap_or(rest.len());
            out.push_str(&rest[1..literal_end].replace('%', "%%"));
            rest = rest.get(literal_end + 1..).unwrap_or("");
            continue;
        }
        for (token, spec) in TOKENS {
            if let Some(after) = rest.strip_prefix(token) {
                out.push_str(spec);
                rest = after;
                continue 'outer;
            }
        }
        if c == '%' {
            out.push_str("%%");
        } else {
            out.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }
    out
}
