//! Time bounds of dashboards and their intersection over time-based indices.

use futures::future::try_join_all;
use kibi_core::time::intersect_all;
use kibi_core::{IndexPatternError, StateError, StateResult, TimeBounds};

use crate::resolve::Snapshot;
use crate::synchronizer::KibiState;

impl KibiState {
    /// Absolute time bounds of `dashboard_id`, with the same precedence as
    /// [`get_time`](KibiState::get_time).
    pub async fn get_time_bounds(
        &self,
        snapshot: &Snapshot,
        dashboard_id: &str,
    ) -> StateResult<TimeBounds> {
        if dashboard_id.is_empty() {
            return Err(StateError::MissingDashboardId);
        }
        let time = self.resolve_time_settings(snapshot, dashboard_id).await;
        time.bounds(self.collaborators().config.time_precision(), snapshot.now)
    }

    /// Concrete indices of `index_pattern_id` within the time window shared
    /// by every dashboard in `dashboard_ids`.
    ///
    /// A pattern that is not time-based is returned as is. An empty window,
    /// a missing pattern ID or a pattern matching no index yield no indices.
    pub async fn time_based_indices(
        &self,
        index_pattern_id: Option<&str>,
        dashboard_ids: &[&str],
    ) -> StateResult<Vec<String>> {
        let Some(index_pattern_id) = index_pattern_id else {
            return Ok(Vec::new());
        };
        let snapshot = self.snapshot();

        match self.expand_indices(&snapshot, index_pattern_id, dashboard_ids).await {
            Err(StateError::IndexPattern(IndexPatternError::MissingIndices(_))) => {
                tracing::debug!(index_pattern_id, "Pattern matches no index");
                Ok(Vec::new())
            }
            result => result,
        }
    }

    async fn expand_indices(
        &self,
        snapshot: &Snapshot,
        index_pattern_id: &str,
        dashboard_ids: &[&str],
    ) -> StateResult<Vec<String>> {
        let index_patterns = &self.collaborators().index_patterns;
        let pattern = index_patterns.get(index_pattern_id).await?;
        if !pattern.is_time_based() {
            return Ok(vec![index_pattern_id.to_string()]);
        }

        let bounds = try_join_all(
            dashboard_ids
                .iter()
                .map(|dashboard_id| self.get_time_bounds(snapshot, dashboard_id)),
        )
        .await?;
        let Some(window) = intersect_all(bounds) else {
            return Ok(Vec::new());
        };
        if window.is_empty() {
            tracing::debug!(
                index_pattern_id,
                dashboards = dashboard_ids.len(),
                "Empty intersection of time ranges"
            );
            return Ok(Vec::new());
        }
        Ok(index_patterns.to_index_list(&pattern, window).await?)
    }
}
