//! Query clauses and default-query detection.
//!
//! A dashboard that has never been searched carries the decorated wildcard
//! `query_string` clause. Nothing that equals it is ever persisted.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// The wildcard matched by the default query.
pub const WILDCARD: &str = "*";

/// A structured query clause, e.g. `{"query_string": {"query": "*"}}`.
///
/// Equality is structural.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(pub Value);

impl Query {
    /// Build an undecorated `query_string` clause.
    pub fn query_string(query: &str) -> Self {
        Self(json!({ "query_string": { "query": query } }))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Returns the `query_string.query` text when this is a `query_string` clause.
    pub fn query_string_text(&self) -> Option<&str> {
        self.0
            .get("query_string")
            .and_then(|qs| qs.get("query"))
            .and_then(Value::as_str)
    }
}

impl From<Value> for Query {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Options merged into every `query_string` clause when none are configured.
pub fn default_query_string_options() -> Map<String, Value> {
    let mut options = Map::new();
    options.insert("analyze_wildcard".to_string(), Value::Bool(true));
    options
}

/// Merge the configured `query:queryString:options` into a `query_string` clause.
///
/// Configured options override keys already present on the clause. Clauses
/// without a `query_string.query` are returned unchanged.
pub fn decorate_query(mut query: Query, options: &Map<String, Value>) -> Query {
    if query.query_string_text().is_none() {
        return query;
    }
    if let Some(Value::Object(clause)) = query.0.get_mut("query_string") {
        for (key, value) in options {
            clause.insert(key.clone(), value.clone());
        }
    }
    query
}

/// The decorated wildcard query.
pub fn default_query(options: &Map<String, Value>) -> Query {
    decorate_query(Query::query_string(WILDCARD), options)
}

/// Returns `true` iff `query` deep-equals the decorated wildcard query.
pub fn is_default_query(query: &Query, options: &Map<String, Value>) -> bool {
    *query == default_query(options)
}
