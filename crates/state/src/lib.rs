//! Kibi state synchronization.
//!
//! [`KibiState`] keeps the filters, queries and time ranges of every
//! dashboard in sync between the live application state, the pinned filters
//! of the global state, the persisted URL state and the saved objects.
//! Everything it talks to is injected through [`Collaborators`].

pub mod collaborators;
pub mod config;
pub mod intersect;
pub mod notify;
pub mod plugins;
pub mod resolve;
pub mod synchronizer;

pub use collaborators::Collaborators;
pub use config::{ConfigError, StateConfig};
pub use notify::{Notifier, TracingNotifier};
pub use plugins::{PluginRegistry, PluginSource};
pub use resolve::{FilterOptions, Snapshot};
pub use synchronizer::{DashboardSnapshot, DashboardStateEntry, KibiState};
