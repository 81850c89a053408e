//! A thread-safe state container in the style of redux.
//!
//! A [Store] serializes every state transition onto one dedicated
//! reduction thread: `Action`s dispatched from any number of threads
//! pass through the [middleware](middleware::Middleware) chain, are
//! queued, and are then reduced one at a time by a [Reducer]. Each new
//! `State` is published to the store's listeners before the next
//! `Action` is reduced.

mod cell;
mod channel;
mod error;
mod lifecycle;
mod listener;
pub mod middleware;
mod reducer;
mod reduction;
mod registry;
mod store;

pub use error::{Result, StoreError};
pub use lifecycle::Lifecycle;
pub use listener::{Callback, Subscription};
pub use reducer::*;
pub use store::{Store, StoreBuilder, StoreHandle};
