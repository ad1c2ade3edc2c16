//! Per-dashboard filter, query and time resolution.
//!
//! Each resolver merges three sources with a fixed precedence: the live
//! application state when the dashboard is the one captured as current in
//! the [`Snapshot`], then the stored per-dashboard property, then the saved
//! search attached to the dashboard.

use std::sync::Arc;

use kibi_core::filter::{compact_filters, uniq_filters, RangeFilter};
use kibi_core::query::{default_query, is_default_query};
use kibi_core::saved_object::DashboardMeta;
use kibi_core::types::Timestamp;
use kibi_core::{Filter, IndexPatternError, Query, StateError, StateResult, TimeSettings};

use crate::collaborators::{AppStateHandle, FilterContainer};
use crate::synchronizer::KibiState;

/// The route-dependent inputs of an operation, captured once when it starts.
///
/// Navigation that happens while the operation awaits a backend applies to
/// the next operation only.
#[derive(Clone)]
pub struct Snapshot {
    pub current_dashboard_id: Option<String>,
    pub app_state: Option<Arc<dyn AppStateHandle>>,
    /// Timefilter value at capture time.
    pub time: TimeSettings,
    /// Reference instant for relative date math.
    pub now: Timestamp,
}

impl Snapshot {
    pub fn is_current(&self, dashboard_id: &str) -> bool {
        self.current_dashboard_id.as_deref() == Some(dashboard_id)
    }

    /// The application state, if `dashboard_id` is the open dashboard.
    pub fn app_state_for(&self, dashboard_id: &str) -> Option<&Arc<dyn AppStateHandle>> {
        self.app_state.as_ref().filter(|_| self.is_current(dashboard_id))
    }
}

/// Which extra filters [`KibiState::get_filters`] includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterOptions {
    /// Append the pinned filters of the global state.
    pub pinned: bool,
    /// Keep filters whose `meta.disabled` is set.
    pub disabled: bool,
}

/// Filters of a live container with null slots removed.
///
/// When slots were removed, the compacted list is written back and the
/// container's URL is replaced.
pub(crate) fn validated_filters<S: FilterContainer + ?Sized>(state: &S) -> Vec<Filter> {
    let (filters, changed) = compact_filters(state.filters());
    if changed {
        state.set_filters(filters.clone());
        state.replace();
    }
    filters
}

fn check_meta(dashboard_id: &str, meta: Option<&DashboardMeta>) -> StateResult<()> {
    match meta {
        Some(meta) if meta.dashboard.id != dashboard_id => Err(StateError::MismatchedMeta {
            dashboard_id: dashboard_id.to_string(),
            meta_dashboard_id: meta.dashboard.id.clone(),
        }),
        _ => Ok(()),
    }
}

impl KibiState {
    /// The filters that apply to `dashboard_id`, deduplicated.
    pub async fn get_filters(
        &self,
        snapshot: &Snapshot,
        dashboard_id: &str,
        meta: Option<&DashboardMeta>,
        options: FilterOptions,
    ) -> StateResult<Vec<Filter>> {
        let mut filters = match snapshot.app_state_for(dashboard_id) {
            Some(app_state) => validated_filters(app_state.as_ref()),
            None => self
                .data()
                .read()
                .await
                .dashboards
                .filters(dashboard_id)
                .map(<[Filter]>::to_vec)
                .unwrap_or_default(),
        };

        if options.pinned {
            let pinned = validated_filters(self.collaborators().global_state.as_ref());
            filters.extend(pinned.iter().map(Filter::without_private_fields));
        }

        check_meta(dashboard_id, meta)?;
        if let Some(search) = meta.and_then(|meta| meta.saved_search.as_ref()) {
            filters.extend(search.filter.iter().cloned().map(|mut filter| {
                filter.meta.from_saved_search = Some(true);
                filter
            }));
        }

        if !options.disabled {
            filters.retain(|filter| !filter.meta.disabled);
        }
        Ok(uniq_filters(filters))
    }

    /// The queries that apply to `dashboard_id`: the resolved query, followed
    /// by the saved-search query when it adds a distinct, non-default clause.
    pub async fn get_queries(
        &self,
        snapshot: &Snapshot,
        dashboard_id: &str,
        meta: Option<&DashboardMeta>,
    ) -> StateResult<Vec<Query>> {
        let options = self.collaborators().config.query_string_options();

        let resolved = match snapshot.app_state_for(dashboard_id) {
            Some(app_state) => app_state.query(),
            None => self.data().read().await.dashboards.query(dashboard_id).cloned(),
        };
        let query = resolved.unwrap_or_else(|| default_query(&options));

        check_meta(dashboard_id, meta)?;
        let search_query = meta
            .and_then(|meta| meta.saved_search.as_ref())
            .and_then(|search| search.query.as_ref());
        match search_query {
            Some(search_query)
                if *search_query != query && !is_default_query(search_query, &options) =>
            {
                Ok(vec![query, search_query.clone()])
            }
            _ => Ok(vec![query]),
        }
    }

    /// Time settings of `dashboard_id`: the timefilter for the open
    /// dashboard, else the stored time, else the configured defaults.
    pub(crate) async fn resolve_time_settings(
        &self,
        snapshot: &Snapshot,
        dashboard_id: &str,
    ) -> TimeSettings {
        if snapshot.is_current(dashboard_id) {
            return snapshot.time.clone();
        }
        match self.data().read().await.dashboards.time(dashboard_id) {
            Some(time) => time.clone().into(),
            None => self.collaborators().config.time_defaults(),
        }
    }

    /// Range filter on the time field of `index_pattern_id` for the time of
    /// `dashboard_id`.
    ///
    /// `None` when there is no pattern, the pattern has no time field, or it
    /// matches no index.
    pub async fn get_time(
        &self,
        snapshot: &Snapshot,
        dashboard_id: &str,
        index_pattern_id: Option<&str>,
    ) -> StateResult<Option<RangeFilter>> {
        let Some(index_pattern_id) = index_pattern_id else {
            return Ok(None);
        };
        let time = self.resolve_time_settings(snapshot, dashboard_id).await;

        let pattern = match self.collaborators().index_patterns.get(index_pattern_id).await {
            Ok(pattern) => pattern,
            Err(IndexPatternError::MissingIndices(_)) => {
                tracing::debug!(dashboard_id, index_pattern_id, "Pattern matches no index");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let Some(field) = pattern.time_field() else {
            return Ok(None);
        };
        let precision = self.collaborators().config.time_precision();
        let bounds = time.bounds(precision, snapshot.now)?;
        Ok(Some(RangeFilter::from_bounds(field.name.clone(), bounds)))
    }
}
