//! Domain model of the Kibi state: filters, queries, time ranges, saved
//! objects and the per-dashboard property store.
//!
//! This crate has no async or I/O dependencies; the resolvers and the
//! synchronizer that drive it live in `kibi-state`.

pub mod dashboard_store;
pub mod date_math;
pub mod error;
pub mod filter;
pub mod index_pattern;
pub mod query;
pub mod saved_object;
pub mod state_data;
pub mod time;
pub mod types;

pub use dashboard_store::{DashboardProperty, DashboardPropertyStore, DashboardState, PropertyKey};
pub use error::{StateError, StateResult};
pub use filter::{Filter, FilterMeta, RangeFilter};
pub use index_pattern::{IndexPattern, IndexPatternError};
pub use query::Query;
pub use state_data::{EntityUri, KibiStateData};
pub use time::{TimeBounds, TimeMode, TimeSettings};
