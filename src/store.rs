use crate::{
    cell::StateCell,
    channel::{ActionChannel, Message},
    error::{Result, StoreError},
    lifecycle::{Lifecycle, LifecycleController},
    listener::{Callback, Detach, Subscription},
    middleware::{self, DispatchFn, Middleware},
    reduction::ReductionLoop,
    registry::{ListenerId, Registry},
    Reducer,
};
use crossbeam_channel::bounded;
use parking_lot::{Mutex, RwLock};
use std::{
    sync::{Arc, OnceLock, Weak},
    thread::{self, JoinHandle, ThreadId},
};

const DEFAULT_THREAD_NAME: &str = "reactive-store";

/// Everything shared between a [Store], its [StoreHandle]s and the
/// reduction thread.
pub(crate) struct Shared<State, Action> {
    channel: ActionChannel<State, Action>,
    pub(crate) cell: StateCell<State>,
    pub(crate) registry: Registry<State>,
    pub(crate) lifecycle: LifecycleController,
    /// The outermost link of the middleware chain.
    chain: RwLock<DispatchFn<Action>>,
    /// The first failure on the reduction thread not yet reported by
    /// [Store::flush()] or [Store::close()]. Later ones are only logged.
    failure: Mutex<Option<StoreError>>,
    reduction_thread: OnceLock<ThreadId>,
}

impl<State, Action> Shared<State, Action> {
    fn on_reduction_thread(&self) -> bool {
        self.reduction_thread.get() == Some(&thread::current().id())
    }

    fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }

    pub(crate) fn record_failure(&self, failure: StoreError) {
        log::error!("{}", failure);
        self.failure.lock().get_or_insert(failure);
    }

    /// Report the oldest unreported failure.
    fn take_failure(&self) -> Result<()> {
        match self.failure.lock().take() {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    fn begin_close(&self) {
        if self.channel.close() {
            self.lifecycle.advance(Lifecycle::Closing);
            log::debug!("store closing, draining queued actions");
        }
    }
}

impl<State, Action> Shared<State, Action>
where
    State: Send + Sync + 'static,
    Action: Send + 'static,
{
    fn new(initial_state: State, channel: ActionChannel<State, Action>) -> Arc<Self> {
        Arc::new_cyclic(|shared: &Weak<Self>| {
            let shared = shared.clone();
            let enqueue: DispatchFn<Action> =
                Arc::new(move |action: Action| match shared.upgrade() {
                    Some(shared) => shared.channel.send(Message::Action(action)),
                    None => Err(StoreError::Closed),
                });

            Self {
                channel,
                cell: StateCell::new(initial_state),
                registry: Registry::new(),
                lifecycle: LifecycleController::new(),
                chain: RwLock::new(enqueue),
                failure: Mutex::new(None),
                reduction_thread: OnceLock::new(),
            }
        })
    }

    fn dispatch(&self, action: Action) -> Result<()> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }

        // Middleware may dispatch again, so the lock is not held while
        // the chain runs.
        let chain = self.chain.read().clone();
        chain(action)
    }

    fn apply_middleware(
        self: &Arc<Self>,
        middleware: Arc<dyn Middleware<State, Action>>,
    ) -> Result<()> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }

        let store = StoreHandle {
            shared: Arc::downgrade(self),
        };
        let mut chain = self.chain.write();
        *chain = middleware::wrap(middleware, store, chain.clone());
        log::debug!("middleware applied");
        Ok(())
    }

    /// Block until every message queued before this call has been
    /// processed by the reduction thread.
    fn barrier(&self) -> Result<()> {
        let (done, wait) = bounded(1);
        self.channel.send(Message::Barrier(done))?;
        wait.recv().map_err(|_| StoreError::Closed)
    }

    /// Wait until everything dispatched before this call has been
    /// reduced and published. Returns immediately on the reduction
    /// thread.
    fn sync(&self) {
        if self.on_reduction_thread() {
            return;
        }

        if self.barrier().is_err() {
            // Closing: the loop drains the queue before it stops.
            self.lifecycle.wait_closed();
        }
    }

    fn state(&self) -> Arc<State> {
        self.sync();
        self.cell.load()
    }

    fn flush(&self) -> Result<()> {
        self.sync();
        self.take_failure()
    }

    fn subscribe(self: &Arc<Self>, callback: Callback<State>) -> Result<Subscription> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }

        let registration = self.registry.registration(callback);
        let id = registration.id;
        let active = registration.active.clone();

        if self.on_reduction_thread() {
            self.registry.attach(registration, self.cell.load())?;
        } else {
            let (done, wait) = bounded(1);
            self.channel
                .send(Message::Subscribe { registration, done })?;
            wait.recv().map_err(|_| StoreError::Closed)??;
        }

        let store = Arc::downgrade(self) as Weak<dyn Detach>;
        Ok(Subscription::new(id, active, store))
    }
}

impl<State, Action> Detach for Shared<State, Action>
where
    State: Send + Sync + 'static,
    Action: Send + 'static,
{
    fn detach(&self, id: ListenerId) {
        if self.on_reduction_thread() {
            self.registry.remove(id);
            return;
        }

        let (done, wait) = bounded(1);
        let removed = self
            .channel
            .send(Message::Unsubscribe { id, done })
            .and_then(|_| wait.recv().map_err(|_| StoreError::Closed));
        if removed.is_err() {
            // Closing: let the loop deliver what is queued, then remove.
            self.lifecycle.wait_closed();
            self.registry.remove(id);
        }
    }
}

/// A weak reference to a [Store].
///
/// This handle exists to provide a standard interface for re-useable
/// middleware and other components which need a long living reference
/// to the store in order to dispatch actions or read its state,
/// without keeping the store alive. Once the store has been dropped
/// every operation fails with [StoreError::Closed].
pub struct StoreHandle<State, Action> {
    shared: Weak<Shared<State, Action>>,
}

impl<State, Action> Clone for StoreHandle<State, Action> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<State, Action> StoreHandle<State, Action>
where
    State: Send + Sync + 'static,
    Action: Send + 'static,
{
    fn upgrade(&self) -> Result<Arc<Shared<State, Action>>> {
        self.shared.upgrade().ok_or(StoreError::Closed)
    }

    /// See [Store::dispatch()]. The action passes through the whole
    /// middleware chain, including the middleware holding this handle.
    pub fn dispatch<A: Into<Action>>(&self, action: A) -> Result<()> {
        self.upgrade()?.dispatch(action.into())
    }

    /// See [Store::state()]. Returns `None` if the store has been
    /// dropped.
    pub fn state(&self) -> Option<Arc<State>> {
        self.shared.upgrade().map(|shared| shared.state())
    }

    /// See [Store::flush()].
    pub fn flush(&self) -> Result<()> {
        self.upgrade()?.flush()
    }

    /// See [Store::subscribe()].
    pub fn subscribe<L>(&self, listener: L) -> Result<Subscription>
    where
        L: Fn(Arc<State>) + Send + Sync + 'static,
    {
        self.upgrade()?.subscribe(Callback::new(listener))
    }

    /// `true` if the store has been closed or dropped.
    pub fn is_closed(&self) -> bool {
        self.shared
            .upgrade()
            .map_or(true, |shared| shared.is_closed())
    }

    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self {
            shared: Weak::new(),
        }
    }
}

/// Configures and starts a [Store], see [Store::builder()].
pub struct StoreBuilder<State, Action> {
    reducer: Box<dyn Reducer<State, Action>>,
    initial_state: State,
    thread_name: String,
    middleware: Vec<Arc<dyn Middleware<State, Action>>>,
}

impl<State, Action> StoreBuilder<State, Action>
where
    State: Send + Sync + 'static,
    Action: Send + 'static,
{
    /// Name of the reduction thread. Defaults to `reactive-store`.
    pub fn thread_name<S: Into<String>>(mut self, thread_name: S) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    /// Apply [Middleware] before the store starts. Ordering is the same
    /// as for [Store::apply_middleware()].
    pub fn middleware<M: Middleware<State, Action> + 'static>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Start the reduction thread and return the running [Store].
    pub fn build(self) -> Result<Store<State, Action>> {
        let (channel, receiver) = ActionChannel::new();
        let shared = Shared::new(self.initial_state, channel);

        for middleware in self.middleware {
            shared.apply_middleware(middleware)?;
        }

        let reduction = ReductionLoop::new(receiver, self.reducer, shared.clone());
        let reduction_thread = thread::Builder::new()
            .name(self.thread_name)
            .spawn(move || reduction.run())?;

        let _ = shared.reduction_thread.set(reduction_thread.thread().id());
        shared.lifecycle.advance(Lifecycle::Running);

        Ok(Store {
            shared,
            reduction_thread: Mutex::new(Some(reduction_thread)),
        })
    }
}

/// This struct is designed to operate as a central source of truth
/// and "immutable" state shared between the threads of your
/// application.
///
/// The current state of this store ([Store::state()]) can only be
/// modified by dispatching an `Action` via [Store::dispatch()] to the
/// store. Actions are queued, and taken one at a time by a dedicated
/// reduction thread which passes them to the [Reducer] provided to the
/// store at construction, producing a new current state. The previous
/// state is never mutated, and remains valid for anyone still holding
/// it.
///
/// Listeners can subscribe to changes to the `State` in this store with
/// [Store::subscribe()]. They are called on the reduction thread, once
/// straight away with the current state, and then once for every
/// state produced, in order.
///
/// Dropping the store closes it, see [Store::close()].
pub struct Store<State, Action> {
    shared: Arc<Shared<State, Action>>,
    reduction_thread: Mutex<Option<JoinHandle<()>>>,
}

impl<State, Action> Store<State, Action>
where
    State: Send + Sync + 'static,
    Action: Send + 'static,
{
    /// Create a new [Store], which uses the specified `reducer` to
    /// handle `Action`s and produce new states, starting from
    /// `initial_state`.
    ///
    /// # Panics
    ///
    /// Panics if the reduction thread cannot be spawned, like
    /// [std::thread::spawn()]. Use [Store::builder()] to handle that
    /// error instead.
    pub fn new<R: Reducer<State, Action> + 'static>(reducer: R, initial_state: State) -> Self {
        match Self::builder(reducer, initial_state).build() {
            Ok(store) => store,
            Err(error) => panic!("{}", error),
        }
    }

    /// Configure a [Store] before starting it.
    pub fn builder<R: Reducer<State, Action> + 'static>(
        reducer: R,
        initial_state: State,
    ) -> StoreBuilder<State, Action> {
        StoreBuilder {
            reducer: Box::new(reducer),
            initial_state,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            middleware: Vec::new(),
        }
    }

    /// Get the current `State` stored in this store.
    ///
    /// Every `Action` dispatched before this call (by any thread) has
    /// been reduced by the time it returns. Called from a listener this
    /// returns the state being published.
    pub fn state(&self) -> Arc<State> {
        self.shared.state()
    }

    /// Dispatch an `Action` to be passed through the middleware and
    /// then queued for the [Reducer]. This never waits for the reducer.
    pub fn dispatch<A: Into<Action>>(&self, action: A) -> Result<()> {
        self.shared.dispatch(action.into())
    }

    /// Subscribe a listener to changes in the store state.
    ///
    /// The listener is called once with the current state before this
    /// returns, and then with every following state until
    /// [Subscription::unsubscribe()] is called. A panic during that
    /// first call is returned as [StoreError::ListenerPanic] and the
    /// listener is not registered.
    pub fn subscribe<L>(&self, listener: L) -> Result<Subscription>
    where
        L: Fn(Arc<State>) + Send + Sync + 'static,
    {
        self.shared.subscribe(Callback::new(listener))
    }

    /// Subscribe an existing [Callback], see [Store::subscribe()].
    pub fn subscribe_callback(&self, callback: &Callback<State>) -> Result<Subscription> {
        self.shared.subscribe(callback.clone())
    }

    /// Add [Middleware] to modify the behaviour of this [Store] during
    /// a [dispatch()][Store::dispatch()]. The middleware applied last
    /// sees each `Action` first.
    pub fn apply_middleware<M: Middleware<State, Action> + 'static>(
        &self,
        middleware: M,
    ) -> Result<()> {
        self.shared.apply_middleware(Arc::new(middleware))
    }

    /// Block until every `Action` dispatched before this call has been
    /// reduced and its listeners notified, then report the oldest
    /// failure (a reducer or listener panic) since the last report.
    ///
    /// This may wait indefinitely if other threads keep dispatching
    /// faster than the reducer can keep up. Called from a listener it
    /// returns immediately.
    pub fn flush(&self) -> Result<()> {
        self.shared.flush()
    }

    /// A [StoreHandle] to this store.
    pub fn handle(&self) -> StoreHandle<State, Action> {
        StoreHandle {
            shared: Arc::downgrade(&self.shared),
        }
    }
}

impl<State, Action> Store<State, Action> {
    /// Stop admitting actions, wait for the queued ones to be reduced
    /// and published, and stop the reduction thread. Reports the
    /// oldest unreported failure like [Store::flush()].
    ///
    /// Calling this again is a no-op. Called from a listener it only
    /// stops admitting actions; the thread stops once the queue drains.
    pub fn close(&self) -> Result<()> {
        self.shared.begin_close();

        if !self.shared.on_reduction_thread() {
            let reduction_thread = self.reduction_thread.lock().take();
            if let Some(reduction_thread) = reduction_thread {
                if reduction_thread.join().is_err() {
                    log::error!("reduction thread panicked");
                }
            }

            self.shared.lifecycle.wait_closed();
            log::debug!("store closed");
        }

        self.shared.take_failure()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.shared.lifecycle.get()
    }
}

impl<State, Action> Drop for Store<State, Action> {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            log::warn!("unreported store failure: {}", error);
        }
    }
}
