//! Contracts of the services the Kibi state depends on.
//!
//! Backends (saved objects, index patterns, installed plugins) are async;
//! live UI state (application state, global state, timefilter, route) is
//! read and written synchronously between suspension points.

use std::sync::Arc;

use async_trait::async_trait;
use kibi_core::date_math::TimeUnit;
use kibi_core::saved_object::{SavedDashboard, SavedSearch};
use kibi_core::{Filter, IndexPattern, IndexPatternError, Query, StateResult, TimeBounds, TimeSettings};
use serde_json::{Map, Value};

use crate::notify::Notifier;
use crate::plugins::PluginRegistry;

/// Saved dashboards and saved searches.
#[async_trait]
pub trait SavedObjectStore: Send + Sync {
    async fn find_dashboards(&self) -> StateResult<Vec<SavedDashboard>>;

    async fn find_saved_searches(&self) -> StateResult<Vec<SavedSearch>>;
}

/// Index-pattern lookups.
///
/// Both methods fail with [`IndexPatternError::MissingIndices`] when the
/// pattern matches no concrete index.
#[async_trait]
pub trait IndexPatternService: Send + Sync {
    async fn get(&self, id: &str) -> Result<IndexPattern, IndexPatternError>;

    /// Concrete indices of `pattern` holding data within `bounds`.
    ///
    /// The provided implementation expands interval-based patterns and
    /// otherwise returns the pattern title.
    async fn to_index_list(
        &self,
        pattern: &IndexPattern,
        bounds: TimeBounds,
    ) -> Result<Vec<String>, IndexPatternError> {
        Ok(pattern.interval_indices(bounds).unwrap_or_else(|| {
            let name = if pattern.title.is_empty() { &pattern.id } else { &pattern.title };
            vec![name.clone()]
        }))
    }
}

/// URL and storage adapter that persists the serialized Kibi state.
pub trait PersistedState: Send + Sync {
    /// Name of the URL parameter holding the state (e.g. `_k`).
    fn url_param(&self) -> &str;

    /// The state object found in the current URL, if any.
    fn read_from_url(&self) -> Option<Value>;

    /// Write the state. `persist` forces a URL write even when unchanged;
    /// `silent` suppresses change notifications of the adapter.
    fn save(&self, object: &Value, persist: bool, silent: bool) -> StateResult<()>;

    /// Replace the URL state without adding a history entry.
    fn replace(&self, object: &Value) -> StateResult<()>;
}

/// A live state container holding filters that may contain null slots.
pub trait FilterContainer: Send + Sync {
    fn filters(&self) -> Vec<Option<Filter>>;

    fn set_filters(&self, filters: Vec<Filter>);

    /// Rewrite the container's URL representation in place.
    fn replace(&self);

    fn save(&self);
}

/// The application state of the open dashboard.
pub trait AppStateHandle: FilterContainer {
    /// ID of the dashboard this state belongs to.
    fn id(&self) -> Option<String>;

    fn query(&self) -> Option<Query>;

    fn set_query(&self, query: Query);
}

/// Pinned filters shared across all dashboards.
pub trait GlobalStateHandle: FilterContainer {}

/// The time picker.
pub trait Timefilter: Send + Sync {
    fn time(&self) -> TimeSettings;

    fn set_time(&self, time: TimeSettings);
}

/// Which application page is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Dashboard,
    Visualize,
    Management,
    Other,
}

/// The current route.
pub trait Navigation: Send + Sync {
    /// ID of the open dashboard; `None` when no dashboard is open or it is locked.
    fn current_dashboard_id(&self) -> Option<String>;

    fn current_page(&self) -> Page;

    /// Application state of the current route, if it has one.
    fn app_state(&self) -> Option<Arc<dyn AppStateHandle>>;

    /// Base URL of the application, shown in outdated-filter warnings.
    fn app_url(&self) -> String;
}

/// Read-only advanced settings.
pub trait ConfigService: Send + Sync {
    /// `timepicker:timeDefaults`
    fn time_defaults(&self) -> TimeSettings;

    /// `defaultIndex`
    fn default_index(&self) -> Option<String>;

    /// `query:queryString:options`
    fn query_string_options(&self) -> Map<String, Value>;

    /// Rounding unit applied to time bounds, if any.
    fn time_precision(&self) -> Option<TimeUnit>;
}

/// Everything the Kibi state is wired to.
#[derive(Clone)]
pub struct Collaborators {
    pub saved_objects: Arc<dyn SavedObjectStore>,
    pub index_patterns: Arc<dyn IndexPatternService>,
    pub persistence: Arc<dyn PersistedState>,
    pub global_state: Arc<dyn GlobalStateHandle>,
    pub navigation: Arc<dyn Navigation>,
    pub timefilter: Arc<dyn Timefilter>,
    pub config: Arc<dyn ConfigService>,
    pub plugins: Arc<PluginRegistry>,
    pub notifier: Arc<dyn Notifier>,
}
