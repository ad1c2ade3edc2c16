//! The serializable Kibi state object, with the compact keys used in URLs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dashboard_store::DashboardPropertyStore;

/// A document selected in a dashboard, visualization or management page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityUri {
    #[serde(default)]
    pub index: String,
    #[serde(rename = "type", default)]
    pub doc_type: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub column: String,
}

impl EntityUri {
    pub fn new(
        index: impl Into<String>,
        doc_type: impl Into<String>,
        id: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            index: index.into(),
            doc_type: doc_type.into(),
            id: id.into(),
            column: column.into(),
        }
    }
}

/// Everything the Kibi state persists.
///
/// | key | content |
/// |-----|---------|
/// | `d` | per-dashboard properties |
/// | `g` | selected dashboard per dashboard group |
/// | `u` | entity selected on a dashboard |
/// | `v` | entity selected on visualize/management pages |
/// | `x` | selected entity disabled flag |
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KibiStateData {
    #[serde(rename = "d", default, skip_serializing_if = "DashboardPropertyStore::is_empty")]
    pub dashboards: DashboardPropertyStore,
    #[serde(rename = "g", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub groups: BTreeMap<String, String>,
    #[serde(rename = "u", default, skip_serializing_if = "Option::is_none")]
    pub selected_entity: Option<EntityUri>,
    #[serde(rename = "v", default, skip_serializing_if = "Option::is_none")]
    pub test_selected_entity: Option<EntityUri>,
    #[serde(rename = "x", default, skip_serializing_if = "std::ops::Not::not")]
    pub selected_entity_disabled: bool,
}

impl KibiStateData {
    pub fn is_empty(&self) -> bool {
        self.dashboards.is_empty()
            && self.groups.is_empty()
            && self.selected_entity.is_none()
            && self.test_selected_entity.is_none()
            && !self.selected_entity_disabled
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::dashboard_store::DashboardProperty;
    use crate::query::Query;

    #[test]
    fn empty_state_serializes_to_empty_object() {
        let data = KibiStateData::default();
        assert!(data.is_empty());
        assert_eq!(serde_json::to_value(&data).unwrap(), json!({}));
    }

    #[test]
    fn populated_state_uses_compact_keys() {
        let mut data = KibiStateData::default();
        data.dashboards
            .set_property("dash", DashboardProperty::Query(Query::query_string("x")));
        data.groups.insert("group".to_string(), "dash".to_string());
        data.selected_entity = Some(EntityUri::new("i", "t", "1", "c"));
        data.selected_entity_disabled = true;

        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["d"]["dash"]["q"]["query_string"]["query"], "x");
        assert_eq!(value["g"]["group"], "dash");
        assert_eq!(value["u"]["type"], "t");
        assert_eq!(value["x"], true);
        assert!(value.get("v").is_none());
        assert!(!data.is_empty());
    }

    #[test]
    fn deserializes_partial_object() {
        let data: KibiStateData = serde_json::from_value(json!({ "g": { "a": "b" } })).unwrap();
        assert!(data.dashboards.is_empty());
        assert_eq!(data.groups["a"], "b");
    }
}
