use crate::registry::ListenerId;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Weak,
};

/// A wrapper for a callback which is notified of changes to
/// [Store](crate::Store) `State`.
///
/// Callbacks are always invoked on the store's reduction thread.
pub struct Callback<State>(Arc<dyn Fn(Arc<State>) + Send + Sync>);

impl<State> Callback<State> {
    pub fn new<C: Fn(Arc<State>) + Send + Sync + 'static>(closure: C) -> Self {
        Callback(Arc::new(closure))
    }

    pub fn emit(&self, state: Arc<State>) {
        (self.0)(state)
    }
}

impl<State> Clone for Callback<State> {
    fn clone(&self) -> Self {
        Callback(self.0.clone())
    }
}

impl<C, State> From<C> for Callback<State>
where
    C: Fn(Arc<State>) + Send + Sync + 'static,
{
    fn from(closure: C) -> Self {
        Callback(Arc::new(closure))
    }
}

/// Removes a listener from the store that registered it, once the
/// states already queued for it have been delivered.
pub(crate) trait Detach: Send + Sync {
    fn detach(&self, id: ListenerId);
}

/// A token for a listener registered with
/// [Store::subscribe()](crate::Store::subscribe()).
///
/// Dropping a [Subscription] does not remove the listener, call
/// [Subscription::unsubscribe()] for that.
pub struct Subscription {
    id: ListenerId,
    active: Arc<AtomicBool>,
    store: Weak<dyn Detach>,
}

impl Subscription {
    pub(crate) fn new(id: ListenerId, active: Arc<AtomicBool>, store: Weak<dyn Detach>) -> Self {
        Self { id, active, store }
    }

    /// Remove the listener from the store.
    ///
    /// The listener still receives every state produced by actions
    /// dispatched before this call, and none after it returns. Calling
    /// this more than once is a no-op.
    pub fn unsubscribe(&self) {
        if !self.is_active() {
            return;
        }

        if let Some(store) = self.store.upgrade() {
            store.detach(self.id);
        }
        self.active.store(false, Ordering::SeqCst);
    }

    /// `true` until [Subscription::unsubscribe()] has been called.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Subscription({:?}, active: {})", self.id, self.is_active())
    }
}
