use crate::{
    channel::Message,
    error::{panic_message, StoreError},
    lifecycle::CloseOnDrop,
    store::Shared,
    Reducer,
};
use crossbeam_channel::Receiver;
use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

/// The single consumer of a store's channel. Every reducer call, state
/// write and listener notification happens inside [ReductionLoop::run()].
pub(crate) struct ReductionLoop<State, Action> {
    receiver: Receiver<Message<State, Action>>,
    reducer: Box<dyn Reducer<State, Action>>,
    shared: Arc<Shared<State, Action>>,
}

impl<State, Action> ReductionLoop<State, Action>
where
    State: Send + Sync + 'static,
    Action: Send + 'static,
{
    pub(crate) fn new(
        receiver: Receiver<Message<State, Action>>,
        reducer: Box<dyn Reducer<State, Action>>,
        shared: Arc<Shared<State, Action>>,
    ) -> Self {
        Self {
            receiver,
            reducer,
            shared,
        }
    }

    /// Process messages in arrival order until the channel is closed
    /// and empty.
    pub(crate) fn run(self) {
        let _closed = CloseOnDrop(&self.shared.lifecycle);
        log::debug!("reduction loop started");

        for message in self.receiver.iter() {
            match message {
                Message::Action(action) => self.reduce(action),
                Message::Subscribe { registration, done } => {
                    let result = self
                        .shared
                        .registry
                        .attach(registration, self.shared.cell.load());
                    let _ = done.send(result);
                }
                Message::Unsubscribe { id, done } => {
                    self.shared.registry.remove(id);
                    let _ = done.send(());
                }
                Message::Barrier(done) => {
                    log::trace!("barrier reached");
                    let _ = done.send(());
                }
            }
        }

        log::debug!("reduction loop drained, stopping");
    }

    /// Apply the reducer to one `Action`, publish the new state and
    /// notify the listeners before returning. If the reducer panics the
    /// previous state stays published.
    fn reduce(&self, action: Action) {
        let prev_state = self.shared.cell.load();

        let reduced = catch_unwind(AssertUnwindSafe(|| {
            self.reducer.reduce(&prev_state, &action)
        }));

        match reduced {
            Ok(state) => {
                let state = Arc::new(state);
                self.shared.cell.store(state.clone());
                log::trace!("state published");

                for failure in self.shared.registry.broadcast(&state) {
                    self.shared.record_failure(failure);
                }
            }
            Err(payload) => {
                self.shared
                    .record_failure(StoreError::ReducerPanic(panic_message(payload)));
            }
        }
    }
}
