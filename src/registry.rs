//! The set of listeners notified by the reduction thread.

use crate::{
    error::{panic_message, Result, StoreError},
    Callback,
};
use parking_lot::RwLock;
use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

/// Identifies a listener within a single store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ListenerId(u64);

impl ListenerId {
    #[cfg(test)]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }
}

/// A [Callback] registered with a store. `active` is shared with the
/// [Subscription](crate::Subscription) handed out to the caller.
pub(crate) struct Registration<State> {
    pub(crate) id: ListenerId,
    pub(crate) callback: Callback<State>,
    pub(crate) active: Arc<AtomicBool>,
}

impl<State> Registration<State> {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

pub(crate) struct Registry<State> {
    listeners: RwLock<Vec<Arc<Registration<State>>>>,
    next_id: AtomicU64,
}

impl<State> Registry<State> {
    pub(crate) fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a registration for `callback` without adding it to the
    /// registry, see [Registry::attach()].
    pub(crate) fn registration(&self, callback: Callback<State>) -> Arc<Registration<State>> {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        Arc::new(Registration {
            id,
            callback,
            active: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Call the listener once with `state`, then add it to the end of
    /// the registry. A listener which panics during this first call is
    /// not added.
    pub(crate) fn attach(
        &self,
        registration: Arc<Registration<State>>,
        state: Arc<State>,
    ) -> Result<()> {
        catch_unwind(AssertUnwindSafe(|| registration.callback.emit(state)))
            .map_err(|payload| StoreError::ListenerPanic(panic_message(payload)))?;

        log::trace!("listener {:?} subscribed", registration.id);
        self.listeners.write().push(registration);
        Ok(())
    }

    /// Remove the listener and mark it inactive, so a broadcast already
    /// in progress skips it too.
    pub(crate) fn remove(&self, id: ListenerId) {
        self.listeners.write().retain(|registration| {
            if registration.id != id {
                return true;
            }
            registration.active.store(false, Ordering::SeqCst);
            false
        });
        log::trace!("listener {:?} unsubscribed", id);
    }

    /// Notify every listener, in registration order, of the new
    /// `state`. The registry is snapshotted first so listeners may
    /// subscribe or unsubscribe during the broadcast; a listener
    /// unsubscribed part way through is skipped. Returns the panics
    /// raised by listeners.
    pub(crate) fn broadcast(&self, state: &Arc<State>) -> Vec<StoreError> {
        let snapshot: Vec<Arc<Registration<State>>> = self.listeners.read().clone();
        let mut failures = Vec::new();

        for registration in snapshot {
            if !registration.is_active() {
                continue;
            }

            let state = state.clone();
            if let Err(payload) =
                catch_unwind(AssertUnwindSafe(|| registration.callback.emit(state)))
            {
                failures.push(StoreError::ListenerPanic(panic_message(payload)));
            }
        }

        failures
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.listeners.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::Registry;
    use crate::{Callback, StoreError};
    use parking_lot::Mutex;
    use std::sync::{atomic::Ordering, Arc};

    fn recording(log: &Arc<Mutex<Vec<(&'static str, i32)>>>, name: &'static str) -> Callback<i32> {
        let log = log.clone();
        Callback::new(move |state: Arc<i32>| log.lock().push((name, *state)))
    }

    #[test]
    fn attach_calls_listener_with_current_state() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = Registry::new();

        let registration = registry.registration(recording(&log, "a"));
        registry.attach(registration, Arc::new(5)).unwrap();

        assert_eq!(*log.lock(), vec![("a", 5)]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn broadcast_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = Registry::new();

        for name in ["a", "b", "c"] {
            let registration = registry.registration(recording(&log, name));
            registry.attach(registration, Arc::new(0)).unwrap();
        }
        log.lock().clear();

        assert!(registry.broadcast(&Arc::new(1)).is_empty());
        assert_eq!(*log.lock(), vec![("a", 1), ("b", 1), ("c", 1)]);
    }

    #[test]
    fn listener_unsubscribed_mid_broadcast_is_skipped() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = Arc::new(Registry::new());

        let second = registry.registration(recording(&log, "second"));
        let second_active = second.active.clone();
        let second_id = second.id;

        let registry_copy = registry.clone();
        let log_copy = log.clone();
        let first = registry.registration(Callback::new(move |state: Arc<i32>| {
            log_copy.lock().push(("first", *state));
            if *state > 0 {
                registry_copy.remove(second_id);
            }
        }));

        registry.attach(first, Arc::new(0)).unwrap();
        registry.attach(second, Arc::new(0)).unwrap();
        log.lock().clear();

        registry.broadcast(&Arc::new(1));
        assert_eq!(*log.lock(), vec![("first", 1)]);
        assert_eq!(registry.len(), 1);
        assert!(!second_active.load(Ordering::SeqCst));
    }

    #[test]
    fn panicking_listener_does_not_stop_broadcast() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = Registry::new();

        let panicking = registry.registration(Callback::new(|state: Arc<i32>| {
            if *state == 1 {
                panic!("listener failure");
            }
        }));
        registry.attach(panicking, Arc::new(0)).unwrap();
        let registration = registry.registration(recording(&log, "after"));
        registry.attach(registration, Arc::new(0)).unwrap();
        log.lock().clear();

        let failures = registry.broadcast(&Arc::new(1));
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            &failures[0],
            StoreError::ListenerPanic(message) if message == "listener failure"
        ));
        assert_eq!(*log.lock(), vec![("after", 1)]);
    }

    #[test]
    fn listener_panicking_on_attach_is_not_registered() {
        let registry: Registry<i32> = Registry::new();
        let registration =
            registry.registration(Callback::new(|_: Arc<i32>| panic!("rejected")));

        let result = registry.attach(registration, Arc::new(0));
        assert!(matches!(result, Err(StoreError::ListenerPanic(_))));
        assert_eq!(registry.len(), 0);
    }
}
