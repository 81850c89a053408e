//! [Middleware] used to intercept, transform, fork or drop `Action`s
//! on their way from [Store::dispatch()](crate::Store::dispatch()) to
//! the store's reduction thread. This module also contains some simple
//! middleware implementations which can be used as utilities in an
//! application.

#[cfg(feature = "simple_logger")]
pub mod simple_logger;

use crate::{error::Result, StoreHandle};
use std::sync::Arc;

/// A composed dispatch function: the outermost link of a middleware
/// chain, or the enqueue step at its end.
pub(crate) type DispatchFn<Action> = Arc<dyn Fn(Action) -> Result<()> + Send + Sync>;

/// The continuation handed to a [Middleware]: forwards an `Action` to
/// the rest of the chain (the middleware applied before this one, and
/// finally the reducer).
///
/// It may be called any number of times, and may be cloned and kept to
/// be called later from any thread. Every call behaves like a fresh
/// dispatch entering the remaining links.
pub struct Next<Action>(DispatchFn<Action>);

impl<Action> Next<Action> {
    /// Forward `action` to the rest of the chain.
    pub fn dispatch(&self, action: Action) -> Result<()> {
        (self.0)(action)
    }
}

impl<Action> Clone for Next<Action> {
    fn clone(&self) -> Self {
        Next(self.0.clone())
    }
}

/// `Middleware` used to modify the behaviour of a
/// [Store](crate::Store) during a
/// [Store::dispatch()](crate::Store::dispatch()).
///
/// Middleware runs on the thread which called `dispatch`. The
/// middleware applied most recently sees an `Action` first.
///
/// Any closure of the form
/// `Fn(&StoreHandle<State, Action>, &Next<Action>, Action) -> Result<()>`
/// is middleware.
pub trait Middleware<State, Action>: Send + Sync {
    /// Invoked for every dispatched `Action`. Call `next` to forward the
    /// action (possibly modified), call it several times to fork it,
    /// or not at all to drop it. The `store` handle can be used to read
    /// the current state or to dispatch new actions through the whole
    /// chain.
    fn on_dispatch(
        &self,
        store: &StoreHandle<State, Action>,
        next: &Next<Action>,
        action: Action,
    ) -> Result<()>;
}

impl<F, State, Action> Middleware<State, Action> for F
where
    F: Fn(&StoreHandle<State, Action>, &Next<Action>, Action) -> Result<()> + Send + Sync,
{
    fn on_dispatch(
        &self,
        store: &StoreHandle<State, Action>,
        next: &Next<Action>,
        action: Action,
    ) -> Result<()> {
        (self)(store, next, action)
    }
}

/// Wrap `next` with `middleware`, producing the new outermost link of
/// the chain.
pub(crate) fn wrap<State, Action>(
    middleware: Arc<dyn Middleware<State, Action>>,
    store: StoreHandle<State, Action>,
    next: DispatchFn<Action>,
) -> DispatchFn<Action>
where
    State: Send + Sync + 'static,
    Action: Send + 'static,
{
    let next = Next(next);
    Arc::new(move |action: Action| middleware.on_dispatch(&store, &next, action))
}

#[cfg(test)]
mod tests {
    use super::{wrap, DispatchFn, Middleware, Next};
    use crate::{Result, StoreHandle};
    use parking_lot::Mutex;
    use std::sync::Arc;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recording_end(log: &Log) -> DispatchFn<String> {
        let log = log.clone();
        Arc::new(move |action: String| {
            log.lock().push(format!("end:{}", action));
            Ok(())
        })
    }

    struct Suffix(&'static str, Log);

    impl Middleware<(), String> for Suffix {
        fn on_dispatch(
            &self,
            _store: &StoreHandle<(), String>,
            next: &Next<String>,
            action: String,
        ) -> Result<()> {
            self.1.lock().push(action.clone());
            next.dispatch(action + self.0)
        }
    }

    #[test]
    fn most_recently_wrapped_runs_first() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));

        let mut chain = recording_end(&log);
        for suffix in ["0", "1", "2"] {
            chain = wrap(
                Arc::new(Suffix(suffix, log.clone())),
                StoreHandle::<(), String>::detached(),
                chain,
            );
        }

        chain("action".to_string()).unwrap();
        assert_eq!(
            *log.lock(),
            vec!["action", "action2", "action21", "end:action210"]
        );
    }

    #[test]
    fn closure_middleware_can_fork_and_drop() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));

        let fork = |_: &StoreHandle<(), String>,
                    next: &Next<String>,
                    action: String|
         -> Result<()> {
            if action == "drop" {
                return Ok(());
            }
            next.dispatch(format!("{}-a", action))?;
            next.dispatch(format!("{}-b", action))
        };
        let chain = wrap(
            Arc::new(fork),
            StoreHandle::<(), String>::detached(),
            recording_end(&log),
        );

        chain("x".to_string()).unwrap();
        chain("drop".to_string()).unwrap();
        assert_eq!(*log.lock(), vec!["end:x-a", "end:x-b"]);
    }
}
