//! The Kibi state: per-dashboard filters, queries and times kept in sync
//! between the live application state, the persisted URL state and the
//! saved objects.

use std::collections::BTreeMap;

use chrono::Utc;
use futures::future::join_all;
use kibi_core::dashboard_store::DashboardProperty;
use kibi_core::filter::{compact_filters, uniq_filters, RangeFilter};
use kibi_core::query::{default_query, is_default_query};
use kibi_core::saved_object::{DashboardMeta, DashboardSearchSource, SavedDashboard};
use kibi_core::time::is_default_time;
use kibi_core::{
    EntityUri, Filter, KibiStateData, PropertyKey, Query, StateError, StateResult, TimeMode,
    TimeSettings,
};
use kibi_events::{EventBus, StateEvent};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, OnceCell, RwLock};

use crate::collaborators::{Collaborators, Page};
use crate::plugins::SIREN_VANGUARD_PLUGIN;
use crate::resolve::{FilterOptions, Snapshot};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Resolved search context of one dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    /// Index pattern of the dashboard's saved search.
    pub index: Option<String>,
    pub filters: Vec<Filter>,
    pub queries: Vec<Query>,
    pub time: Option<RangeFilter>,
}

/// One entry of [`KibiState::get_states`].
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardStateEntry {
    State(DashboardSnapshot),
    /// Resolution of this dashboard failed; the others are unaffected.
    Error(StateError),
    /// No saved dashboard was found for this ID.
    Empty,
}

impl DashboardStateEntry {
    pub fn state(&self) -> Option<&DashboardSnapshot> {
        match self {
            Self::State(state) => Some(state),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&StateError> {
        match self {
            Self::Error(err) => Some(err),
            _ => None,
        }
    }
}

const GET_STATE_OPTIONS: FilterOptions = FilterOptions {
    pinned: true,
    disabled: false,
};

// ---------------------------------------------------------------------------
// KibiState
// ---------------------------------------------------------------------------

/// Owner of the Kibi state object.
///
/// All mutations go through this type. The inner lock is never held across
/// a collaborator call.
pub struct KibiState {
    data: RwLock<KibiStateData>,
    collaborators: Collaborators,
    events: EventBus,
    initialized: OnceCell<()>,
}

impl KibiState {
    pub fn new(collaborators: Collaborators) -> Self {
        Self::with_data(collaborators, KibiStateData::default())
    }

    /// Start from an already restored state object.
    pub fn with_data(collaborators: Collaborators, data: KibiStateData) -> Self {
        Self {
            data: RwLock::new(data),
            collaborators,
            events: EventBus::default(),
            initialized: OnceCell::new(),
        }
    }

    pub(crate) fn data(&self) -> &RwLock<KibiStateData> {
        &self.data
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Subscribe to `time`, `reset` and `reset_app_state_query` events.
    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.events.subscribe()
    }

    /// Capture the route-dependent inputs of an operation.
    pub fn snapshot(&self) -> Snapshot {
        let navigation = &self.collaborators.navigation;
        Snapshot {
            current_dashboard_id: navigation.current_dashboard_id(),
            app_state: navigation.app_state(),
            time: self.collaborators.timefilter.time(),
            now: Utc::now(),
        }
    }

    // -- persistence --------------------------------------------------------

    /// The state object with its compact keys.
    pub async fn to_object(&self) -> StateResult<Value> {
        Ok(serde_json::to_value(&*self.data.read().await)?)
    }

    /// Write the state through the persistence adapter.
    pub async fn save(&self, persist: bool, silent: bool) -> StateResult<()> {
        let object = self.to_object().await?;
        self.collaborators.persistence.save(&object, persist, silent)
    }

    /// Load the state found in the URL, disabling outdated join filters.
    ///
    /// When filters were disabled the URL is replaced with the corrected
    /// state. Returns `false` and leaves the state untouched when the URL
    /// has none.
    pub async fn read_from_url(&self) -> StateResult<bool> {
        let persistence = &self.collaborators.persistence;
        let Some(object) = persistence.read_from_url() else {
            return Ok(false);
        };
        let mut restored: KibiStateData = serde_json::from_value(object)?;
        restored.dashboards.prune_empty();

        let snapshot = self.snapshot();
        let mut disabled = 0;
        for dashboard_id in restored.dashboards.dashboard_ids() {
            if let Some(filters) = restored.dashboards.filters_mut(&dashboard_id) {
                disabled += self.disable_filters_if_outdated(&snapshot, filters, &dashboard_id)?;
            }
        }

        tracing::debug!(
            param = persistence.url_param(),
            dashboards = restored.dashboards.len(),
            disabled,
            "Kibi state read from URL"
        );
        *self.data.write().await = restored;
        if disabled > 0 {
            persistence.replace(&self.to_object().await?)?;
        }
        Ok(true)
    }

    // -- initialization -----------------------------------------------------

    /// Route setup work: seed the state, then cache the installed plugins.
    pub async fn setup(&self) -> StateResult<()> {
        self.init().await;
        self.collaborators.plugins.init().await
    }

    /// Seed an empty state from the saved dashboards. Runs once per instance.
    ///
    /// Failures are reported through the notifier.
    pub async fn init(&self) {
        self.initialized
            .get_or_init(|| async {
                if let Err(e) = self.seed_from_saved_dashboards().await {
                    tracing::error!(error = %e, "Kibi state initialization failed");
                    self.collaborators.notifier.error(&e.to_string());
                }
            })
            .await;
    }

    async fn seed_from_saved_dashboards(&self) -> StateResult<()> {
        // State restored from the URL wins.
        if !self.data.read().await.is_empty() {
            return Ok(());
        }
        let dashboards = self.collaborators.saved_objects.find_dashboards().await?;
        let sources = parse_search_sources(dashboards)?;
        let snapshot = self.snapshot();
        let options = self.collaborators.config.query_string_options();

        {
            let mut data = self.data.write().await;
            if !data.is_empty() {
                return Ok(());
            }
            for (dashboard, source) in &sources {
                if let Some(query) = &source.query {
                    if !is_default_query(query, &options) {
                        data.dashboards
                            .set_property(&dashboard.id, DashboardProperty::Query(query.clone()));
                    }
                }
                if !source.filters.is_empty() {
                    let filters = source.filters.iter().map(Filter::without_private_fields).collect();
                    data.dashboards
                        .set_property(&dashboard.id, DashboardProperty::Filters(filters));
                }
                if let Some(time) = dashboard.restored_time() {
                    self.save_time_locked(&mut data, &snapshot, &dashboard.id, time);
                }
            }
            tracing::info!(
                dashboards = sources.len(),
                seeded = data.dashboards.len(),
                "Kibi state seeded from saved dashboards"
            );
        }
        self.save(true, true).await
    }

    // -- saved objects ------------------------------------------------------

    /// Saved dashboards with the parsed source of their saved search, in the
    /// order of `dashboard_ids`. `None` selects every dashboard.
    ///
    /// Unknown dashboards, unknown saved searches and saved searches that do
    /// not parse fail the call when `fail_on_missing_meta` is set and are
    /// otherwise reported as warnings and skipped.
    pub async fn dashboard_and_saved_search_metas(
        &self,
        dashboard_ids: Option<&[&str]>,
        fail_on_missing_meta: bool,
    ) -> StateResult<Vec<DashboardMeta>> {
        let entries = self.meta_entries(dashboard_ids, fail_on_missing_meta).await?;
        let mut metas = Vec::with_capacity(entries.len());
        for (_, entry) in entries {
            match entry {
                Ok(meta) => metas.push(meta),
                Err(e) if fail_on_missing_meta => return Err(e),
                Err(e) => self.warn_incomplete_meta(&e),
            }
        }
        Ok(metas)
    }

    /// Metadata per selected dashboard, keyed by dashboard ID. A saved search
    /// that cannot be parsed is kept as that dashboard's error.
    async fn meta_entries(
        &self,
        dashboard_ids: Option<&[&str]>,
        fail_on_missing_meta: bool,
    ) -> StateResult<Vec<(String, StateResult<DashboardMeta>)>> {
        let saved_objects = &self.collaborators.saved_objects;
        let (searches, dashboards) =
            tokio::try_join!(saved_objects.find_saved_searches(), saved_objects.find_dashboards())?;

        let wanted: Option<Vec<&str>> = dashboard_ids.map(|ids| {
            let mut unique: Vec<&str> = Vec::with_capacity(ids.len());
            for id in ids {
                if !id.is_empty() && !unique.contains(id) {
                    unique.push(*id);
                }
            }
            unique
        });
        let mut errors = Vec::new();

        let mut selected: Vec<SavedDashboard> = match &wanted {
            Some(ids) => dashboards
                .into_iter()
                .filter(|dashboard| ids.contains(&dashboard.id.as_str()))
                .collect(),
            None => dashboards,
        };
        if let Some(ids) = &wanted {
            if selected.len() != ids.len() {
                let missing = ids
                    .iter()
                    .filter(|id| !selected.iter().any(|dashboard| dashboard.id == **id))
                    .map(|id| id.to_string())
                    .collect();
                errors.push(StateError::MissingDashboards(missing));
            }
            selected.sort_by_key(|dashboard| {
                ids.iter().position(|id| *id == dashboard.id).unwrap_or(usize::MAX)
            });
        }

        let mut entries = Vec::with_capacity(selected.len());
        for dashboard in selected {
            let search = dashboard
                .saved_search_id
                .as_deref()
                .and_then(|id| searches.iter().find(|search| search.id == id));
            match search {
                Some(search) => {
                    let dashboard_id = dashboard.id.clone();
                    let meta = search.search_source().map(|source| DashboardMeta {
                        dashboard,
                        saved_search: Some(source),
                    });
                    entries.push((dashboard_id, meta));
                }
                None if dashboard.saved_search_id.is_some() => {
                    errors.push(StateError::UnknownSavedSearch {
                        title: dashboard.title.clone(),
                    })
                }
                None => entries.push((
                    dashboard.id.clone(),
                    Ok(DashboardMeta {
                        dashboard,
                        saved_search: None,
                    }),
                )),
            }
        }

        if let Some(first) = errors.first() {
            if fail_on_missing_meta {
                return Err(first.clone());
            }
            for error in &errors {
                self.warn_incomplete_meta(error);
            }
        }
        Ok(entries)
    }

    fn warn_incomplete_meta(&self, error: &StateError) {
        tracing::warn!(error = %error, "Incomplete dashboard metadata");
        self.collaborators.notifier.warning(&error.to_string());
    }

    // -- resolution ---------------------------------------------------------

    /// Filters, queries and time of one dashboard, including pinned filters.
    pub async fn get_state(&self, dashboard_id: &str) -> StateResult<DashboardSnapshot> {
        if dashboard_id.is_empty() {
            return Err(StateError::MissingDashboardId);
        }
        let snapshot = self.snapshot();
        if !self.collaborators.plugins.is_installed(SIREN_VANGUARD_PLUGIN) {
            return Err(StateError::PluginNotInstalled(SIREN_VANGUARD_PLUGIN.to_string()));
        }

        let metas = self
            .dashboard_and_saved_search_metas(Some(std::slice::from_ref(&dashboard_id)), true)
            .await?;
        let meta = metas
            .into_iter()
            .next()
            .ok_or_else(|| StateError::MissingDashboards(vec![dashboard_id.to_string()]))?;

        let state = self.resolve_meta(&snapshot, &meta).await?;
        tracing::debug!(
            dashboard_id,
            filters = state.filters.len(),
            queries = state.queries.len(),
            "Dashboard state resolved"
        );
        Ok(state)
    }

    /// Bulk form of [`get_state`](Self::get_state).
    ///
    /// A dashboard whose resolution fails gets an
    /// [`Error`](DashboardStateEntry::Error) entry, and an ID without a saved
    /// dashboard gets an [`Empty`](DashboardStateEntry::Empty) one, as does
    /// one whose saved search is unknown. Only a failure to list the saved
    /// objects fails the call.
    pub async fn get_states(
        &self,
        dashboard_ids: &[&str],
    ) -> StateResult<BTreeMap<String, DashboardStateEntry>> {
        if dashboard_ids.is_empty() {
            return Ok(BTreeMap::new());
        }
        let snapshot = self.snapshot();
        let entries = self.meta_entries(Some(dashboard_ids), false).await?;

        let snapshot = &snapshot;
        let resolved = join_all(entries.iter().map(|(dashboard_id, meta)| async move {
            let result = match meta {
                Ok(meta) => self.resolve_meta(snapshot, meta).await,
                Err(e) => Err(e.clone()),
            };
            (dashboard_id.clone(), result)
        }))
        .await;

        let mut states = BTreeMap::new();
        for (dashboard_id, result) in resolved {
            let entry = match result {
                Ok(state) => DashboardStateEntry::State(state),
                Err(e) => {
                    tracing::warn!(dashboard_id = %dashboard_id, error = %e, "Dashboard state resolution failed");
                    self.collaborators.notifier.warning(&e.to_string());
                    DashboardStateEntry::Error(e)
                }
            };
            states.insert(dashboard_id, entry);
        }
        for dashboard_id in dashboard_ids {
            states
                .entry(dashboard_id.to_string())
                .or_insert(DashboardStateEntry::Empty);
        }
        Ok(states)
    }

    async fn resolve_meta(
        &self,
        snapshot: &Snapshot,
        meta: &DashboardMeta,
    ) -> StateResult<DashboardSnapshot> {
        let dashboard_id = meta.dashboard.id.as_str();
        let index = meta.index();
        let (filters, queries, time) = tokio::join!(
            self.get_filters(snapshot, dashboard_id, Some(meta), GET_STATE_OPTIONS),
            self.get_queries(snapshot, dashboard_id, Some(meta)),
            self.get_time(snapshot, dashboard_id, index),
        );
        Ok(DashboardSnapshot {
            index: index.map(str::to_string),
            filters: filters?,
            queries: queries?,
            time: time?,
        })
    }

    // -- save and reset -----------------------------------------------------

    /// Copy the open dashboard's application state into the stored state.
    ///
    /// Properties equal to what a fresh load of the saved dashboard would
    /// show are deleted instead of stored. Returns `false` when no dashboard
    /// is open.
    pub async fn save_app_state(&self) -> StateResult<bool> {
        let snapshot = self.snapshot();
        let Some(dashboard_id) = snapshot.current_dashboard_id.clone() else {
            return Ok(false);
        };
        if snapshot.app_state.is_none() {
            return Ok(false);
        }

        let options = FilterOptions {
            pinned: false,
            disabled: true,
        };
        let (filters, queries, dashboards) = tokio::try_join!(
            self.get_filters(&snapshot, &dashboard_id, None, options),
            self.get_queries(&snapshot, &dashboard_id, None),
            self.collaborators.saved_objects.find_dashboards(),
        )?;

        let saved = dashboards
            .into_iter()
            .find(|dashboard| dashboard.id == dashboard_id)
            .ok_or_else(|| StateError::DashboardNotSaved(dashboard_id.clone()))?;
        let source = saved.search_source()?;

        let query_options = self.collaborators.config.query_string_options();
        let defaults = self.collaborators.config.time_defaults();
        let filters: Vec<Filter> = filters.iter().map(Filter::without_private_fields).collect();
        let query = queries
            .into_iter()
            .next()
            .unwrap_or_else(|| default_query(&query_options));
        let time = snapshot.time.clone();

        {
            let mut data = self.data.write().await;
            let store = &mut data.dashboards;

            if filters.is_empty() && source.filters.is_empty() {
                store.delete_property(&dashboard_id, PropertyKey::Filters);
            } else {
                store.set_property(&dashboard_id, DashboardProperty::Filters(filters));
            }

            let saved_query_is_default = source
                .query
                .as_ref()
                .map_or(true, |saved_query| is_default_query(saved_query, &query_options));
            if is_default_query(&query, &query_options) && saved_query_is_default {
                store.delete_property(&dashboard_id, PropertyKey::Query);
            } else {
                store.set_property(&dashboard_id, DashboardProperty::Query(query));
            }

            let saved_time_is_default = !saved.time_restore
                || is_default_time(
                    saved.time_mode.unwrap_or_default(),
                    saved.time_from.as_deref().unwrap_or_default(),
                    saved.time_to.as_deref().unwrap_or_default(),
                    &defaults,
                );
            if is_default_time(time.mode, &time.from, &time.to, &defaults) && saved_time_is_default {
                data.dashboards.delete_property(&dashboard_id, PropertyKey::Time);
            } else {
                self.save_time_locked(&mut data, &snapshot, &dashboard_id, time);
            }
        }

        tracing::info!(dashboard_id = %dashboard_id, "Application state saved");
        self.save(false, false).await?;
        Ok(true)
    }

    /// Restore filters, queries and times of `dashboard_id`, or of every
    /// dashboard, to their saved definitions.
    ///
    /// Resetting every dashboard also clears the pinned filters. Returns the
    /// IDs of the dashboards whose stored state changed.
    pub async fn reset_filters_queries_times(
        &self,
        dashboard_id: Option<&str>,
    ) -> StateResult<Vec<String>> {
        let snapshot = self.snapshot();

        if dashboard_id.is_none() {
            let global_state = &self.collaborators.global_state;
            let (pinned, _) = compact_filters(global_state.filters());
            if !pinned.is_empty() {
                global_state.set_filters(Vec::new());
                global_state.save();
            }
        }

        let dashboards = self
            .collaborators
            .saved_objects
            .find_dashboards()
            .await?
            .into_iter()
            .filter(|dashboard| dashboard_id.map_or(true, |id| dashboard.id == id))
            .collect();
        let sources = parse_search_sources(dashboards)?;

        let query_options = self.collaborators.config.query_string_options();
        let defaults = self.collaborators.config.time_defaults();
        let mut modified = Vec::new();

        for (dashboard, mut source) in sources {
            let id = dashboard.id.as_str();
            self.disable_filters_if_outdated(&snapshot, &mut source.filters, id)?;
            let restored_time = dashboard.restored_time();

            let app_state = snapshot
                .app_state
                .as_ref()
                .filter(|app_state| app_state.id().as_deref() == Some(id));
            if let Some(app_state) = app_state {
                app_state.set_filters(source.filters.clone());
                let saved_query = source
                    .query
                    .clone()
                    .unwrap_or_else(|| default_query(&query_options));
                let query_changed = app_state.query().as_ref() != Some(&saved_query);
                app_state.set_query(saved_query.clone());
                self.collaborators
                    .timefilter
                    .set_time(restored_time.clone().unwrap_or_else(|| defaults.clone()));
                if query_changed {
                    self.events
                        .publish(StateEvent::ResetAppStateQuery { query: saved_query });
                } else {
                    app_state.save();
                }
            }

            let mut data = self.data.write().await;
            if data.dashboards.dashboard(id).is_none() {
                continue;
            }
            let mut changed = false;

            match source.query {
                Some(query) if !is_default_query(&query, &query_options) => {
                    changed |= data
                        .dashboards
                        .set_property(id, DashboardProperty::Query(query));
                }
                _ => {
                    changed |= data.dashboards.query(id).is_some();
                    data.dashboards.delete_property(id, PropertyKey::Query);
                }
            }

            if source.filters.is_empty() {
                changed |= data.dashboards.filters(id).is_some();
                data.dashboards.delete_property(id, PropertyKey::Filters);
            } else {
                changed |= data
                    .dashboards
                    .set_property(id, DashboardProperty::Filters(source.filters));
            }

            match restored_time {
                Some(time) => changed |= self.save_time_locked(&mut data, &snapshot, id, time),
                None => {
                    changed |= data.dashboards.time(id).is_some();
                    data.dashboards.delete_property(id, PropertyKey::Time);
                }
            }

            if changed {
                modified.push(dashboard.id.clone());
            }
        }

        if !modified.is_empty() {
            tracing::info!(dashboards = ?modified, "Dashboards reset to their saved state");
            self.events.publish(StateEvent::Reset {
                dashboard_ids: modified.clone(),
            });
        }
        self.save(false, false).await?;
        Ok(modified)
    }

    // -- outdated filters ---------------------------------------------------

    /// Disable every join filter built with the outdated relational API and
    /// warn about it. Returns how many filters were disabled.
    pub fn disable_filters_if_outdated(
        &self,
        snapshot: &Snapshot,
        filters: &mut [Filter],
        dashboard_id: &str,
    ) -> StateResult<usize> {
        if dashboard_id.is_empty() {
            return Err(StateError::MissingDashboardId);
        }
        // Live filters carry `$state`, stored ones do not.
        let live_filters: Option<Vec<Filter>> = snapshot.app_state_for(dashboard_id).map(|app_state| {
            compact_filters(app_state.filters())
                .0
                .iter()
                .map(Filter::without_private_fields)
                .collect()
        });

        let mut disabled = 0;
        for filter in filters.iter_mut().filter(|filter| filter.is_outdated()) {
            let stored = filter.without_private_fields();
            let dirty = live_filters
                .as_ref()
                .is_some_and(|live| !live.contains(&stored));
            let mut message = if dirty {
                format!(
                    "The Kibi state contains filters that rely on outdated API. Please clean it, \
                     either by going to {}, or by switching to another dashboard.",
                    self.collaborators.navigation.app_url()
                )
            } else {
                format!(
                    "The join filter \"{}\" on dashboard with ID=\"{dashboard_id}\" is invalid \
                     because it relies on outdated API. Please remove it.",
                    filter.meta.alias.as_deref().unwrap_or_default()
                )
            };
            message.push_str(&format!(
                " If the filter keeps on coming back, then it may be saved with the dashboard with ID=\"{dashboard_id}\""
            ));
            tracing::warn!(dashboard_id, dirty, "Outdated join filter disabled");
            self.collaborators.notifier.warning(&message);

            filter.meta.disabled = true;
            disabled += 1;
        }
        Ok(disabled)
    }

    // -- dashboard properties -----------------------------------------------

    /// Store the time of a dashboard. Returns `true` if it changed.
    ///
    /// A `time` event is published for any dashboard other than the open one.
    pub async fn save_time_for_dashboard_id(
        &self,
        dashboard_id: &str,
        mode: TimeMode,
        from: &str,
        to: &str,
    ) -> bool {
        let snapshot = self.snapshot();
        let mut data = self.data.write().await;
        self.save_time_locked(
            &mut data,
            &snapshot,
            dashboard_id,
            TimeSettings::new(mode, from, to),
        )
    }

    fn save_time_locked(
        &self,
        data: &mut KibiStateData,
        snapshot: &Snapshot,
        dashboard_id: &str,
        time: TimeSettings,
    ) -> bool {
        let old_time = data.dashboards.time(dashboard_id).cloned();
        let changed = data
            .dashboards
            .set_property(dashboard_id, DashboardProperty::Time(time.into()));
        // The timefilter already reports changes of the open dashboard.
        if changed && !snapshot.is_current(dashboard_id) {
            self.events.publish(StateEvent::Time {
                dashboard_id: dashboard_id.to_string(),
                new_time: data.dashboards.time(dashboard_id).cloned(),
                old_time,
            });
        }
        changed
    }

    /// Dashboards whose time follows the time of `dashboard_id`. An empty
    /// list removes the property.
    pub async fn set_synced_dashboards(&self, dashboard_id: &str, dashboards: Vec<String>) {
        let mut data = self.data.write().await;
        if dashboards.is_empty() {
            data.dashboards
                .delete_property(dashboard_id, PropertyKey::SyncedDashboards);
        } else {
            data.dashboards
                .set_property(dashboard_id, DashboardProperty::SyncedDashboards(dashboards));
        }
    }

    pub async fn get_synced_dashboards(&self, dashboard_id: &str) -> Option<Vec<String>> {
        self.data
            .read()
            .await
            .dashboards
            .synced_dashboards(dashboard_id)
            .map(<[String]>::to_vec)
    }

    /// Append a filter to the stored filters of a dashboard.
    pub async fn add_filter(&self, dashboard_id: &str, filter: Filter) {
        let mut data = self.data.write().await;
        let mut filters = data
            .dashboards
            .filters(dashboard_id)
            .map(<[Filter]>::to_vec)
            .unwrap_or_default();
        filters.push(filter);
        data.dashboards
            .set_property(dashboard_id, DashboardProperty::Filters(uniq_filters(filters)));
    }

    /// IDs of the dashboards that carry some state. Dashboards in their
    /// saved state are not listed.
    pub async fn get_all_dashboard_ids(&self) -> Vec<String> {
        self.data.read().await.dashboards.dashboard_ids()
    }

    // -- dashboard groups ---------------------------------------------------

    pub async fn get_selected_dashboard_id(&self, group_id: &str) -> Option<String> {
        self.data.read().await.groups.get(group_id).cloned()
    }

    pub async fn set_selected_dashboard_id(&self, group_id: &str, dashboard_id: &str) {
        self.data
            .write()
            .await
            .groups
            .insert(group_id.to_string(), dashboard_id.to_string());
    }

    // -- selected entity ----------------------------------------------------

    /// Select a document. An entity without an ID clears the selection.
    ///
    /// Dashboards and the visualize/management pages keep separate
    /// selections.
    pub async fn set_entity_uri(&self, entity: EntityUri) -> StateResult<()> {
        let page = self.collaborators.navigation.current_page();
        let mut data = self.data.write().await;
        let slot = match page {
            Page::Dashboard => &mut data.selected_entity,
            Page::Visualize | Page::Management => &mut data.test_selected_entity,
            Page::Other => return Err(StateError::WrongPage { action: "set" }),
        };
        *slot = if entity.id.is_empty() { None } else { Some(entity) };
        Ok(())
    }

    pub async fn get_entity_uri(&self) -> StateResult<Option<EntityUri>> {
        let page = self.collaborators.navigation.current_page();
        let data = self.data.read().await;
        match page {
            Page::Dashboard => Ok(data.selected_entity.clone()),
            Page::Visualize | Page::Management => Ok(data.test_selected_entity.clone()),
            Page::Other => Err(StateError::WrongPage { action: "get" }),
        }
    }

    /// Whether the selected entity is exactly this one. Any empty part
    /// yields `false`.
    pub async fn is_entity_selected(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        column: &str,
    ) -> StateResult<bool> {
        let Some(entity) = self.get_entity_uri().await? else {
            return Ok(false);
        };
        if [index, doc_type, id, column].iter().any(|part| part.is_empty()) {
            return Ok(false);
        }
        Ok(entity == EntityUri::new(index, doc_type, id, column))
    }

    pub async fn remove_test_entity_uri(&self) {
        self.data.write().await.test_selected_entity = None;
    }

    pub async fn disable_selected_entity(&self, disable: bool) {
        self.data.write().await.selected_entity_disabled = disable;
    }

    pub async fn is_selected_entity_disabled(&self) -> bool {
        self.data.read().await.selected_entity_disabled
    }
}

fn parse_search_sources(
    dashboards: Vec<SavedDashboard>,
) -> StateResult<Vec<(SavedDashboard, DashboardSearchSource)>> {
    dashboards
        .into_iter()
        .map(|dashboard| {
            let source = dashboard.search_source()?;
            Ok((dashboard, source))
        })
        .collect()
}
