#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kibi_core::saved_object::{SavedDashboard, SavedObjectMeta, SavedSearch};
use kibi_core::{
    Filter, IndexPattern, IndexPatternError, Query, StateError, StateResult, TimeBounds,
    TimeMode, TimeSettings,
};
use kibi_core::index_pattern::IndexField;
use kibi_state::collaborators::{
    AppStateHandle, FilterContainer, GlobalStateHandle, IndexPatternService, Navigation, Page,
    PersistedState, SavedObjectStore, Timefilter,
};
use kibi_state::plugins::SIREN_VANGUARD_PLUGIN;
use kibi_state::{Collaborators, KibiState, Notifier, PluginRegistry, PluginSource, StateConfig};
use serde_json::{json, Map, Value};

/// Install a test subscriber once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A `{query: {match: {<field>: {query: <value>}}}}` filter.
pub fn match_filter(field: &str, value: &str) -> Filter {
    let mut matcher = Map::new();
    matcher.insert(field.to_string(), json!({ "query": value }));
    Filter::from_clause(json!({ "query": { "match": matcher } }))
}

/// A legacy join filter without a version marker.
pub fn outdated_join(alias: &str) -> Filter {
    let mut filter = Filter::from_clause(json!({}));
    filter.join_sequence = Some(json!([{ "relation": [{ "indices": ["a"] }, { "indices": ["b"] }] }]));
    filter.with_alias(alias)
}

pub fn dashboard(id: &str) -> SavedDashboard {
    SavedDashboard {
        id: id.to_string(),
        title: format!("Dashboard {id}"),
        ..SavedDashboard::default()
    }
}

/// Attach a `searchSourceJSON` with these filters and an optional query.
pub fn with_source(mut dashboard: SavedDashboard, filters: &[Filter], query: Option<&str>) -> SavedDashboard {
    let mut entries: Vec<Value> = filters
        .iter()
        .map(|filter| serde_json::to_value(filter).unwrap())
        .collect();
    if let Some(query) = query {
        entries.push(json!({ "query": { "query_string": { "query": query, "analyze_wildcard": true } } }));
    }
    dashboard.kibana_saved_object_meta = SavedObjectMeta {
        search_source_json: json!({ "filter": entries }).to_string(),
    };
    dashboard
}

pub fn with_time(mut dashboard: SavedDashboard, mode: TimeMode, from: &str, to: &str) -> SavedDashboard {
    dashboard.time_restore = true;
    dashboard.time_mode = Some(mode);
    dashboard.time_from = Some(from.to_string());
    dashboard.time_to = Some(to.to_string());
    dashboard
}

pub fn saved_search(id: &str, index: &str, query: Option<&str>, filters: &[Filter]) -> SavedSearch {
    let mut source = json!({ "index": index, "filter": filters });
    if let Some(query) = query {
        source["query"] = json!({ "query_string": { "query": query } });
    }
    SavedSearch {
        id: id.to_string(),
        title: id.to_string(),
        kibana_saved_object_meta: SavedObjectMeta {
            search_source_json: source.to_string(),
        },
    }
}

pub fn time_pattern(id: &str, field: &str) -> IndexPattern {
    IndexPattern {
        id: id.to_string(),
        title: id.to_string(),
        time_field_name: Some(field.to_string()),
        fields: vec![IndexField {
            name: field.to_string(),
            field_type: "date".to_string(),
        }],
        interval_name: None,
    }
}

pub fn plain_pattern(id: &str) -> IndexPattern {
    IndexPattern {
        id: id.to_string(),
        title: id.to_string(),
        ..IndexPattern::default()
    }
}

pub fn default_query() -> Query {
    Query(json!({ "query_string": { "query": "*", "analyze_wildcard": true } }))
}

// ---------------------------------------------------------------------------
// Saved objects
// ---------------------------------------------------------------------------

type Hook = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub struct FakeSavedObjects {
    pub dashboards: Mutex<Vec<SavedDashboard>>,
    pub searches: Mutex<Vec<SavedSearch>>,
    pub fail: Mutex<Option<StateError>>,
    /// Runs while `find_dashboards` is in flight.
    pub on_find_dashboards: Mutex<Option<Hook>>,
    pub find_calls: AtomicUsize,
}

impl FakeSavedObjects {
    pub fn add_dashboard(&self, dashboard: SavedDashboard) {
        self.dashboards.lock().unwrap().push(dashboard);
    }

    pub fn add_search(&self, search: SavedSearch) {
        self.searches.lock().unwrap().push(search);
    }
}

#[async_trait]
impl SavedObjectStore for FakeSavedObjects {
    async fn find_dashboards(&self) -> StateResult<Vec<SavedDashboard>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if let Some(hook) = self.on_find_dashboards.lock().unwrap().as_ref() {
            hook();
        }
        if let Some(err) = self.fail.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.dashboards.lock().unwrap().clone())
    }

    async fn find_saved_searches(&self) -> StateResult<Vec<SavedSearch>> {
        Ok(self.searches.lock().unwrap().clone())
    }
}

// ---------------------------------------------------------------------------
// Index patterns
// ---------------------------------------------------------------------------

/// Patterns by ID; `to_index_list` records the requested window and returns
/// a single `<id>:<min>-<max>` name in epoch millis.
#[derive(Default)]
pub struct FakeIndexPatterns {
    pub patterns: Mutex<HashMap<String, Result<IndexPattern, IndexPatternError>>>,
    pub windows: Mutex<Vec<TimeBounds>>,
}

impl FakeIndexPatterns {
    pub fn add(&self, pattern: IndexPattern) {
        self.patterns
            .lock()
            .unwrap()
            .insert(pattern.id.clone(), Ok(pattern));
    }

    pub fn fail(&self, id: &str, err: IndexPatternError) {
        self.patterns.lock().unwrap().insert(id.to_string(), Err(err));
    }
}

#[async_trait]
impl IndexPatternService for FakeIndexPatterns {
    async fn get(&self, id: &str) -> Result<IndexPattern, IndexPatternError> {
        self.patterns
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_else(|| Err(IndexPatternError::NotFound(id.to_string())))
    }

    async fn to_index_list(
        &self,
        pattern: &IndexPattern,
        bounds: TimeBounds,
    ) -> Result<Vec<String>, IndexPatternError> {
        self.windows.lock().unwrap().push(bounds);
        Ok(vec![format!(
            "{}:{}-{}",
            pattern.id,
            bounds.min.timestamp_millis(),
            bounds.max.timestamp_millis()
        )])
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakePersistence {
    pub url: Mutex<Option<Value>>,
    /// Every saved object with its `persist` and `silent` flags.
    pub saved: Mutex<Vec<(Value, bool, bool)>>,
}

impl FakePersistence {
    pub fn last_saved(&self) -> Option<(Value, bool, bool)> {
        self.saved.lock().unwrap().last().cloned()
    }
}

impl PersistedState for FakePersistence {
    fn url_param(&self) -> &str {
        "_k"
    }

    fn read_from_url(&self) -> Option<Value> {
        self.url.lock().unwrap().clone()
    }

    fn save(&self, object: &Value, persist: bool, silent: bool) -> StateResult<()> {
        self.saved
            .lock()
            .unwrap()
            .push((object.clone(), persist, silent));
        Ok(())
    }

    fn replace(&self, object: &Value) -> StateResult<()> {
        *self.url.lock().unwrap() = Some(object.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Live state
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeFilters {
    pub filters: Mutex<Vec<Option<Filter>>>,
    pub replaced: AtomicUsize,
    pub saved: AtomicUsize,
}

impl FakeFilters {
    pub fn set(&self, filters: Vec<Option<Filter>>) {
        *self.filters.lock().unwrap() = filters;
    }

    pub fn get(&self) -> Vec<Option<Filter>> {
        self.filters.lock().unwrap().clone()
    }
}

pub struct FakeAppState {
    pub id: String,
    pub filters: FakeFilters,
    pub query: Mutex<Option<Query>>,
}

impl FakeAppState {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            filters: FakeFilters::default(),
            query: Mutex::new(Some(default_query())),
        }
    }

    pub fn with_filters(self, filters: Vec<Filter>) -> Self {
        self.filters.set(filters.into_iter().map(Some).collect());
        self
    }

    pub fn with_query(self, query: Query) -> Self {
        *self.query.lock().unwrap() = Some(query);
        self
    }
}

impl FilterContainer for FakeAppState {
    fn filters(&self) -> Vec<Option<Filter>> {
        self.filters.get()
    }

    fn set_filters(&self, filters: Vec<Filter>) {
        self.filters.set(filters.into_iter().map(Some).collect());
    }

    fn replace(&self) {
        self.filters.replaced.fetch_add(1, Ordering::SeqCst);
    }

    fn save(&self) {
        self.filters.saved.fetch_add(1, Ordering::SeqCst);
    }
}

impl AppStateHandle for FakeAppState {
    fn id(&self) -> Option<String> {
        Some(self.id.clone())
    }

    fn query(&self) -> Option<Query> {
        self.query.lock().unwrap().clone()
    }

    fn set_query(&self, query: Query) {
        *self.query.lock().unwrap() = Some(query);
    }
}

#[derive(Default)]
pub struct FakeGlobalState {
    pub filters: FakeFilters,
}

impl FilterContainer for FakeGlobalState {
    fn filters(&self) -> Vec<Option<Filter>> {
        self.filters.get()
    }

    fn set_filters(&self, filters: Vec<Filter>) {
        self.filters.set(filters.into_iter().map(Some).collect());
    }

    fn replace(&self) {
        self.filters.replaced.fetch_add(1, Ordering::SeqCst);
    }

    fn save(&self) {
        self.filters.saved.fetch_add(1, Ordering::SeqCst);
    }
}

impl GlobalStateHandle for FakeGlobalState {}

pub struct FakeTimefilter {
    pub time: Mutex<TimeSettings>,
}

impl Timefilter for FakeTimefilter {
    fn time(&self) -> TimeSettings {
        self.time.lock().unwrap().clone()
    }

    fn set_time(&self, time: TimeSettings) {
        *self.time.lock().unwrap() = time;
    }
}

pub struct FakeNavigation {
    pub dashboard_id: Mutex<Option<String>>,
    pub page: Mutex<Page>,
    pub app_state: Mutex<Option<Arc<FakeAppState>>>,
}

impl FakeNavigation {
    /// Open a dashboard with this application state.
    pub fn open(&self, app_state: FakeAppState) -> Arc<FakeAppState> {
        let app_state = Arc::new(app_state);
        *self.dashboard_id.lock().unwrap() = Some(app_state.id.clone());
        *self.page.lock().unwrap() = Page::Dashboard;
        *self.app_state.lock().unwrap() = Some(app_state.clone());
        app_state
    }

    pub fn leave(&self, page: Page) {
        *self.dashboard_id.lock().unwrap() = None;
        *self.page.lock().unwrap() = page;
        *self.app_state.lock().unwrap() = None;
    }
}

impl Navigation for FakeNavigation {
    fn current_dashboard_id(&self) -> Option<String> {
        self.dashboard_id.lock().unwrap().clone()
    }

    fn current_page(&self) -> Page {
        *self.page.lock().unwrap()
    }

    fn app_state(&self) -> Option<Arc<dyn AppStateHandle>> {
        self.app_state
            .lock()
            .unwrap()
            .clone()
            .map(|app_state| app_state as Arc<dyn AppStateHandle>)
    }

    fn app_url(&self) -> String {
        "http://localhost:5606/app/kibana".to_string()
    }
}

// ---------------------------------------------------------------------------
// Plugins and notifications
// ---------------------------------------------------------------------------

pub struct FakePlugins(pub Vec<String>);

#[async_trait]
impl PluginSource for FakePlugins {
    async fn installed_plugins(&self) -> StateResult<Vec<String>> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub warnings: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn warning(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// A [`KibiState`] wired to in-memory fakes that tests can reach into.
pub struct Harness {
    pub state: KibiState,
    pub saved_objects: Arc<FakeSavedObjects>,
    pub index_patterns: Arc<FakeIndexPatterns>,
    pub persistence: Arc<FakePersistence>,
    pub global_state: Arc<FakeGlobalState>,
    pub navigation: Arc<FakeNavigation>,
    pub timefilter: Arc<FakeTimefilter>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    /// Default configuration with the relational plugin installed.
    pub async fn new() -> Self {
        Self::with_plugins(&[SIREN_VANGUARD_PLUGIN]).await
    }

    pub async fn with_plugins(plugins: &[&str]) -> Self {
        init_tracing();
        let config = StateConfig::default();

        let saved_objects = Arc::new(FakeSavedObjects::default());
        let index_patterns = Arc::new(FakeIndexPatterns::default());
        let persistence = Arc::new(FakePersistence::default());
        let global_state = Arc::new(FakeGlobalState::default());
        let navigation = Arc::new(FakeNavigation {
            dashboard_id: Mutex::new(None),
            page: Mutex::new(Page::Other),
            app_state: Mutex::new(None),
        });
        let timefilter = Arc::new(FakeTimefilter {
            time: Mutex::new(config.time_defaults.clone()),
        });
        let notifier = Arc::new(RecordingNotifier::default());
        let plugins = Arc::new(PluginRegistry::new(Arc::new(FakePlugins(
            plugins.iter().map(|name| name.to_string()).collect(),
        ))));
        plugins.init().await.unwrap();

        let collaborators = Collaborators {
            saved_objects: saved_objects.clone(),
            index_patterns: index_patterns.clone(),
            persistence: persistence.clone(),
            global_state: global_state.clone(),
            navigation: navigation.clone(),
            timefilter: timefilter.clone(),
            config: Arc::new(config),
            plugins,
            notifier: notifier.clone(),
        };

        Self {
            state: KibiState::new(collaborators),
            saved_objects,
            index_patterns,
            persistence,
            global_state,
            navigation,
            timefilter,
            notifier,
        }
    }
}
