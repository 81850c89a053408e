//! Error types for [Store](crate::Store) operations.

use std::any::Any;
use thiserror::Error;

/// Errors produced by a [Store](crate::Store).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store has been closed and no longer admits new work.
    #[error("store is closed")]
    Closed,

    /// The [Reducer](crate::Reducer) panicked while processing an
    /// `Action`. The state was left unchanged.
    #[error("reducer panicked: {0}")]
    ReducerPanic(String),

    /// A listener panicked while being notified of a new state.
    #[error("listener panicked: {0}")]
    ListenerPanic(String),

    /// The reduction thread could not be started.
    #[error("failed to spawn reduction thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Extract a readable message from a panic payload.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
