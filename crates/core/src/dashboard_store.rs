//! Per-dashboard property store.
//!
//! Holds the filters, query, time and synced dashboards of every dashboard
//! that deviates from its defaults. An entry whose last property is deleted
//! is removed, so the persisted object never carries empty residue.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::filter::Filter;
use crate::query::Query;
use crate::time::PersistedTime;

/// Names of the per-dashboard properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    Filters,
    Query,
    Time,
    SyncedDashboards,
}

impl PropertyKey {
    /// Compact key used in the persisted object.
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Filters => "f",
            Self::Query => "q",
            Self::Time => "t",
            Self::SyncedDashboards => "s",
        }
    }
}

/// A property value together with its key.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardProperty {
    Filters(Vec<Filter>),
    Query(Query),
    Time(PersistedTime),
    SyncedDashboards(Vec<String>),
}

impl DashboardProperty {
    pub fn key(&self) -> PropertyKey {
        match self {
            Self::Filters(_) => PropertyKey::Filters,
            Self::Query(_) => PropertyKey::Query,
            Self::Time(_) => PropertyKey::Time,
            Self::SyncedDashboards(_) => PropertyKey::SyncedDashboards,
        }
    }
}

/// Stored state of one dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardState {
    #[serde(rename = "f", default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<Filter>>,
    #[serde(rename = "q", default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Query>,
    #[serde(rename = "t", default, skip_serializing_if = "Option::is_none")]
    pub time: Option<PersistedTime>,
    #[serde(rename = "s", default, skip_serializing_if = "Option::is_none")]
    pub synced_dashboards: Option<Vec<String>>,
}

impl DashboardState {
    pub fn is_empty(&self) -> bool {
        self.filters.is_none()
            && self.query.is_none()
            && self.time.is_none()
            && self.synced_dashboards.is_none()
    }

    fn get(&self, key: PropertyKey) -> Option<DashboardProperty> {
        match key {
            PropertyKey::Filters => self.filters.clone().map(DashboardProperty::Filters),
            PropertyKey::Query => self.query.clone().map(DashboardProperty::Query),
            PropertyKey::Time => self.time.clone().map(DashboardProperty::Time),
            PropertyKey::SyncedDashboards => self
                .synced_dashboards
                .clone()
                .map(DashboardProperty::SyncedDashboards),
        }
    }

    fn clear(&mut self, key: PropertyKey) {
        match key {
            PropertyKey::Filters => self.filters = None,
            PropertyKey::Query => self.query = None,
            PropertyKey::Time => self.time = None,
            PropertyKey::SyncedDashboards => self.synced_dashboards = None,
        }
    }

    /// Overwrite a property. Returns `true` if the value differs from the previous one.
    fn set(&mut self, value: DashboardProperty) -> bool {
        match value {
            DashboardProperty::Filters(filters) => replace(&mut self.filters, filters),
            DashboardProperty::Query(query) => replace(&mut self.query, query),
            DashboardProperty::Time(time) => replace(&mut self.time, time),
            DashboardProperty::SyncedDashboards(ids) => replace(&mut self.synced_dashboards, ids),
        }
    }
}

fn replace<T: PartialEq>(slot: &mut Option<T>, value: T) -> bool {
    let changed = slot.as_ref() != Some(&value);
    *slot = Some(value);
    changed
}

/// Mapping from dashboard ID to its [`DashboardState`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DashboardPropertyStore {
    dashboards: BTreeMap<String, DashboardState>,
}

impl DashboardPropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, creating the dashboard entry if needed.
    ///
    /// The value is always written; the return value tells whether it changed.
    pub fn set_property(&mut self, dashboard_id: &str, value: DashboardProperty) -> bool {
        self.dashboards
            .entry(dashboard_id.to_string())
            .or_default()
            .set(value)
    }

    pub fn get_property(&self, dashboard_id: &str, key: PropertyKey) -> Option<DashboardProperty> {
        self.dashboards.get(dashboard_id).and_then(|state| state.get(key))
    }

    /// Remove a property and drop the dashboard entry once it is empty.
    pub fn delete_property(&mut self, dashboard_id: &str, key: PropertyKey) {
        let Some(state) = self.dashboards.get_mut(dashboard_id) else {
            return;
        };
        state.clear(key);
        if state.is_empty() {
            self.dashboards.remove(dashboard_id);
        }
    }

    pub fn dashboard(&self, dashboard_id: &str) -> Option<&DashboardState> {
        self.dashboards.get(dashboard_id)
    }

    pub fn filters(&self, dashboard_id: &str) -> Option<&[Filter]> {
        self.dashboard(dashboard_id)?.filters.as_deref()
    }

    pub fn query(&self, dashboard_id: &str) -> Option<&Query> {
        self.dashboard(dashboard_id)?.query.as_ref()
    }

    pub fn time(&self, dashboard_id: &str) -> Option<&PersistedTime> {
        self.dashboard(dashboard_id)?.time.as_ref()
    }

    pub fn synced_dashboards(&self, dashboard_id: &str) -> Option<&[String]> {
        self.dashboard(dashboard_id)?.synced_dashboards.as_deref()
    }

    /// Mutable access to the stored filters of a dashboard.
    pub fn filters_mut(&mut self, dashboard_id: &str) -> Option<&mut Vec<Filter>> {
        self.dashboards.get_mut(dashboard_id)?.filters.as_mut()
    }

    /// IDs of the dashboards that currently carry some state.
    pub fn dashboard_ids(&self) -> Vec<String> {
        self.dashboards.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.dashboards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dashboards.is_empty()
    }

    /// Remove entries that hold no property, e.g. after deserializing `{"d": {"x": {}}}`.
    pub fn prune_empty(&mut self) {
        self.dashboards.retain(|_, state| !state.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::time::TimeMode;

    fn time() -> PersistedTime {
        PersistedTime {
            mode: TimeMode::Absolute,
            from: "2017-01-01T00:00:00.000Z".to_string(),
            to: "2017-02-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut store = DashboardPropertyStore::new();
        let query = Query::query_string("status:500");
        assert!(store.set_property("dash", DashboardProperty::Query(query.clone())));
        assert_eq!(
            store.get_property("dash", PropertyKey::Query),
            Some(DashboardProperty::Query(query))
        );
    }

    #[test]
    fn set_reports_change_only_when_value_differs() {
        let mut store = DashboardPropertyStore::new();
        assert!(store.set_property("dash", DashboardProperty::Time(time())));
        assert!(!store.set_property("dash", DashboardProperty::Time(time())));
        let mut other = time();
        other.to = "now".to_string();
        assert!(store.set_property("dash", DashboardProperty::Time(other)));
    }

    #[test]
    fn deleting_last_property_removes_dashboard() {
        let mut store = DashboardPropertyStore::new();
        store.set_property("a", DashboardProperty::Query(Query::query_string("x")));
        store.set_property("b", DashboardProperty::Time(time()));
        store.set_property("b", DashboardProperty::SyncedDashboards(vec!["a".to_string()]));
        assert_eq!(store.len(), 2);

        store.delete_property("a", PropertyKey::Query);
        assert_eq!(store.len(), 1);
        assert!(store.dashboard("a").is_none());

        store.delete_property("b", PropertyKey::Time);
        assert_eq!(store.len(), 1);
        store.delete_property("b", PropertyKey::SyncedDashboards);
        assert!(store.is_empty());
    }

    #[test]
    fn delete_on_unknown_dashboard_is_noop() {
        let mut store = DashboardPropertyStore::new();
        store.delete_property("ghost", PropertyKey::Filters);
        assert!(store.is_empty());
    }

    #[test]
    fn get_on_unknown_dashboard_is_none() {
        let store = DashboardPropertyStore::new();
        assert!(store.get_property("ghost", PropertyKey::Time).is_none());
        assert!(store.filters("ghost").is_none());
    }

    #[test]
    fn serializes_with_compact_keys() {
        let mut store = DashboardPropertyStore::new();
        store.set_property("dash", DashboardProperty::Time(time()));
        store.set_property("dash", DashboardProperty::Filters(vec![]));
        let value = serde_json::to_value(&store).unwrap();
        assert_eq!(
            value,
            json!({
                "dash": {
                    "f": [],
                    "t": { "m": "absolute", "f": "2017-01-01T00:00:00.000Z", "t": "2017-02-01T00:00:00.000Z" }
                }
            })
        );
    }

    #[test]
    fn prune_drops_empty_entries() {
        let mut store: DashboardPropertyStore =
            serde_json::from_value(json!({ "a": {}, "b": { "q": { "match_all": {} } } })).unwrap();
        store.prune_empty();
        assert_eq!(store.dashboard_ids(), vec!["b".to_string()]);
    }
}
