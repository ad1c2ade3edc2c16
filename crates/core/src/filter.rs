//! Filter model, semantic uniqueness and outdated-join detection.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::time::TimeBounds;

/// Which state container a filter was attached to in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterStore {
    #[serde(rename = "appState")]
    AppState,
    #[serde(rename = "globalState")]
    GlobalState,
}

/// UI bookkeeping stored under `$state`. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub store: FilterStore,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterMeta {
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub negate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(
        rename = "fromSavedSearch",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub from_saved_search: Option<bool>,
    /// Set on join filters built with the current relational API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A search filter: a query clause plus its `meta` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    pub meta: FilterMeta,
    #[serde(rename = "$state", default, skip_serializing_if = "Option::is_none")]
    pub state: Option<FilterState>,
    /// Legacy relational join representation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_sequence: Option<Value>,
    /// Every other key of the filter, e.g. `query`, `range` or `exists`.
    #[serde(flatten)]
    pub clause: Map<String, Value>,
}

impl Filter {
    /// Build a filter from the clause keys of a JSON object, with empty meta.
    pub fn from_clause(clause: Value) -> Self {
        let clause = match clause {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            clause,
            ..Self::default()
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.meta.alias = Some(alias.into());
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.meta.disabled = disabled;
        self
    }

    pub fn negated(mut self, negate: bool) -> Self {
        self.meta.negate = negate;
        self
    }

    /// A filter is outdated when it carries a `join_sequence` but no `meta.version`.
    pub fn is_outdated(&self) -> bool {
        self.join_sequence.is_some() && !self.meta.version.as_ref().is_some_and(is_truthy)
    }

    /// Copy without `$state` and any other `$`-prefixed UI key.
    pub fn without_private_fields(&self) -> Filter {
        let mut stripped = self.clone();
        stripped.state = None;
        stripped.clause.retain(|key, _| !key.starts_with('$'));
        stripped
    }

    /// Uniqueness signature: the clause without `meta` and UI bookkeeping,
    /// plus the negate and disabled flags.
    pub fn signature(&self) -> Value {
        let clause: Map<String, Value> = self
            .clause
            .iter()
            .filter(|(key, _)| !key.starts_with('$'))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        json!({
            "clause": clause,
            "join_sequence": self.join_sequence,
            "negate": self.meta.negate,
            "disabled": self.meta.disabled,
        })
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Time restriction on a date field: `{range: {<field>: {gte, lte, format: "epoch_millis"}}}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeFilter {
    pub field: String,
    pub gte: i64,
    pub lte: i64,
}

impl RangeFilter {
    pub fn from_bounds(field: impl Into<String>, bounds: TimeBounds) -> Self {
        Self {
            field: field.into(),
            gte: bounds.min.timestamp_millis(),
            lte: bounds.max.timestamp_millis(),
        }
    }

    pub fn to_value(&self) -> Value {
        let mut range = Map::new();
        range.insert(
            self.field.clone(),
            json!({ "gte": self.gte, "lte": self.lte, "format": "epoch_millis" }),
        );
        json!({ "range": range })
    }
}

impl Serialize for RangeFilter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Remove duplicate filters by [`Filter::signature`], keeping the first occurrence.
pub fn uniq_filters(filters: Vec<Filter>) -> Vec<Filter> {
    let mut seen: Vec<Value> = Vec::with_capacity(filters.len());
    let mut unique = Vec::with_capacity(filters.len());
    for filter in filters {
        let signature = filter.signature();
        if !seen.contains(&signature) {
            seen.push(signature);
            unique.push(filter);
        }
    }
    unique
}

/// Drop null slots. The flag is `true` when anything was removed.
pub fn compact_filters(filters: Vec<Option<Filter>>) -> (Vec<Filter>, bool) {
    let before = filters.len();
    let compacted: Vec<Filter> = filters.into_iter().flatten().collect();
    let changed = compacted.len() != before;
    (compacted, changed)
}
