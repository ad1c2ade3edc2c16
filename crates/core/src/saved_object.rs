//! Saved dashboards and saved searches as returned by the saved-object store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StateError, StateResult};
use crate::filter::Filter;
use crate::query::Query;
use crate::time::{TimeMode, TimeSettings};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedObjectMeta {
    #[serde(rename = "searchSourceJSON", default)]
    pub search_source_json: String,
}

/// A saved dashboard hit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedDashboard {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub saved_search_id: Option<String>,
    #[serde(default)]
    pub time_restore: bool,
    #[serde(default)]
    pub time_from: Option<String>,
    #[serde(default)]
    pub time_to: Option<String>,
    #[serde(default)]
    pub time_mode: Option<TimeMode>,
    #[serde(default)]
    pub kibana_saved_object_meta: SavedObjectMeta,
}

/// A saved search hit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSearch {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub kibana_saved_object_meta: SavedObjectMeta,
}

/// Parsed `searchSourceJSON` of a saved search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSource {
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default)]
    pub query: Option<Query>,
    #[serde(default)]
    pub filter: Vec<Filter>,
}

/// Filters and query saved with a dashboard.
///
/// Dashboards store their query as a meta-less `{query: {query_string: ...}}`
/// entry inside the `filter` array; it is split out here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSearchSource {
    pub filters: Vec<Filter>,
    pub query: Option<Query>,
}

#[derive(Deserialize)]
struct RawSearchSource {
    #[serde(default)]
    filter: Vec<Value>,
}

fn parse_json<T: serde::de::DeserializeOwned>(object_id: &str, json: &str) -> StateResult<T> {
    let json = if json.trim().is_empty() { "{}" } else { json };
    serde_json::from_str(json).map_err(|e| StateError::InvalidSearchSource {
        object_id: object_id.to_string(),
        reason: e.to_string(),
    })
}

fn is_query_entry(entry: &Value) -> bool {
    entry.get("meta").is_none()
        && entry
            .get("query")
            .and_then(|query| query.get("query_string"))
            .is_some()
}

impl SavedDashboard {
    pub fn search_source(&self) -> StateResult<DashboardSearchSource> {
        let raw: RawSearchSource =
            parse_json(&self.id, &self.kibana_saved_object_meta.search_source_json)?;

        let mut source = DashboardSearchSource::default();
        for entry in raw.filter {
            if is_query_entry(&entry) {
                if source.query.is_none() {
                    source.query = entry.get("query").cloned().map(Query);
                }
                continue;
            }
            let filter: Filter =
                serde_json::from_value(entry).map_err(|e| StateError::InvalidSearchSource {
                    object_id: self.id.clone(),
                    reason: e.to_string(),
                })?;
            source.filters.push(filter);
        }
        Ok(source)
    }

    /// The time stored with the dashboard, if it restores one.
    pub fn restored_time(&self) -> Option<TimeSettings> {
        if !self.time_restore {
            return None;
        }
        let from = self.time_from.as_deref().filter(|s| !s.is_empty())?;
        let to = self.time_to.as_deref().filter(|s| !s.is_empty())?;
        Some(TimeSettings::new(self.time_mode.unwrap_or_default(), from, to))
    }
}

impl SavedSearch {
    pub fn search_source(&self) -> StateResult<SearchSource> {
        parse_json(&self.id, &self.kibana_saved_object_meta.search_source_json)
    }
}

/// A saved dashboard paired with the parsed source of its saved search.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardMeta {
    pub dashboard: SavedDashboard,
    pub saved_search: Option<SearchSource>,
}

impl DashboardMeta {
    /// Index pattern ID of the associated saved search.
    pub fn index(&self) -> Option<&str> {
        self.saved_search.as_ref()?.index.as_deref()
    }
}
