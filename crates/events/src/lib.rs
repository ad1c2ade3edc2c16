//! Change notifications emitted by the Kibi state.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`StateEvent`]: a dashboard time change, a reset of saved dashboards
//!   or a reset of the live query.

pub mod bus;

pub use bus::{EventBus, StateEvent};
