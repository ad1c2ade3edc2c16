use crate::index_pattern::IndexPatternError;

/// Errors produced while resolving or persisting Kibi state.
///
/// The type is `Clone` so that a failed entry of a batch resolution can keep
/// its own copy of the error next to the successful entries.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StateError {
    #[error("Missing dashboard ID")]
    MissingDashboardId,

    #[error("The {0} plugin is not installed. Please install the plugin and restart Kibi")]
    PluginNotInstalled(String),

    #[error(
        "Something wrong occurred, got dashboard={dashboard_id} but meta is from dashboard={meta_dashboard_id}"
    )]
    MismatchedMeta {
        dashboard_id: String,
        meta_dashboard_id: String,
    },

    #[error("Unable to retrieve dashboards: {}.", .0.join(","))]
    MissingDashboards(Vec<String>),

    #[error(
        "The dashboard [{title}] is associated with an unknown saved search. \
         It may have been removed or you do not have the rights to access it."
    )]
    UnknownSavedSearch { title: String },

    #[error("Unable to get saved dashboard [{0}]")]
    DashboardNotSaved(String),

    #[error("Invalid searchSourceJSON on saved object {object_id}: {reason}")]
    InvalidSearchSource { object_id: String, reason: String },

    #[error("Invalid date math expression: {0}")]
    InvalidDateMath(String),

    #[error(transparent)]
    IndexPattern(#[from] IndexPatternError),

    #[error("Cannot {action} entity URI because you are not on dashboard/visualize/management")]
    WrongPage { action: &'static str },

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias used throughout the Kibi state crates.
pub type StateResult<T> = Result<T, StateError>;

impl From<serde_json::Error> for StateError {
    fn from(err: serde_json::Error) -> Self {
        StateError::Serialization(err.to_string())
    }
}
