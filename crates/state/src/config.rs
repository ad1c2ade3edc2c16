use kibi_core::date_math::TimeUnit;
use kibi_core::query::default_query_string_options;
use kibi_core::{TimeMode, TimeSettings};
use serde_json::{Map, Value};

use crate::collaborators::ConfigService;

/// Error raised when an environment variable holds an unusable value.
#[derive(Debug, thiserror::Error)]
#[error("{var} must be {expected}, got '{value}'")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// Kibi state settings loaded from environment variables.
///
/// All fields have defaults matching a fresh installation.
#[derive(Debug, Clone, PartialEq)]
pub struct StateConfig {
    /// `timepicker:timeDefaults`.
    pub time_defaults: TimeSettings,
    /// Index pattern used when a dashboard has none.
    pub default_index: Option<String>,
    /// Rounding unit applied to resolved time bounds.
    pub time_precision: Option<TimeUnit>,
    /// `analyze_wildcard` option merged into every `query_string` clause.
    pub analyze_wildcard: bool,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            time_defaults: TimeSettings::new(TimeMode::Quick, "now-15m", "now"),
            default_index: None,
            time_precision: None,
            analyze_wildcard: true,
        }
    }
}

impl StateConfig {
    /// Load `.env` if present, then read the environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default   |
    /// |-------------------------------|-----------|
    /// | `KIBI_TIME_DEFAULTS_MODE`     | `quick`   |
    /// | `KIBI_TIME_DEFAULTS_FROM`     | `now-15m` |
    /// | `KIBI_TIME_DEFAULTS_TO`       | `now`     |
    /// | `KIBI_DEFAULT_INDEX`          | unset     |
    /// | `KIBI_TIME_PRECISION`         | unset     |
    /// | `KIBI_QUERY_ANALYZE_WILDCARD` | `true`    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mode = match non_empty("KIBI_TIME_DEFAULTS_MODE") {
            Some(value) => value.parse().map_err(|_| ConfigError {
                var: "KIBI_TIME_DEFAULTS_MODE",
                value,
                expected: "one of quick, relative, absolute",
            })?,
            None => defaults.time_defaults.mode,
        };
        let from = non_empty("KIBI_TIME_DEFAULTS_FROM").unwrap_or(defaults.time_defaults.from);
        let to = non_empty("KIBI_TIME_DEFAULTS_TO").unwrap_or(defaults.time_defaults.to);

        let time_precision = match non_empty("KIBI_TIME_PRECISION") {
            Some(value) => Some(value.trim().parse().map_err(|_| ConfigError {
                var: "KIBI_TIME_PRECISION",
                value,
                expected: "one of y, M, w, d, h, m, s",
            })?),
            None => None,
        };

        let analyze_wildcard = match non_empty("KIBI_QUERY_ANALYZE_WILDCARD") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError {
                var: "KIBI_QUERY_ANALYZE_WILDCARD",
                value,
                expected: "true or false",
            })?,
            None => defaults.analyze_wildcard,
        };

        Ok(Self {
            time_defaults: TimeSettings { mode, from, to },
            default_index: non_empty("KIBI_DEFAULT_INDEX"),
            time_precision,
            analyze_wildcard,
        })
    }
}

impl ConfigService for StateConfig {
    fn time_defaults(&self) -> TimeSettings {
        self.time_defaults.clone()
    }

    fn default_index(&self) -> Option<String> {
        self.default_index.clone()
    }

    fn query_string_options(&self) -> Map<String, Value> {
        let mut options = default_query_string_options();
        options.insert("analyze_wildcard".to_string(), Value::Bool(self.analyze_wildcard));
        options
    }

    fn time_precision(&self) -> Option<TimeUnit> {
        self.time_precision
    }
}
