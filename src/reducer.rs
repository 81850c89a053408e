/// Using the [reduce()](Reducer::reduce()) method, implementors of
/// this trait take an `Action` submitted to a store via
/// [Store::dispatch()](crate::Store::dispatch()) and produce a brand
/// new `State` from the previous one.
///
/// Reducers always run on the store's reduction thread, one `Action`
/// at a time, which is why they need to be [Send] but not [Sync].
///
/// Any closure of the form `Fn(&State, &Action) -> State + Send` is a
/// reducer.
pub trait Reducer<State, Action>: Send {
    /// Take an `Action` submitted to a store via
    /// [Store::dispatch()](crate::Store::dispatch()) and produce the
    /// next `State`. The `prev_state` is a published snapshot and is
    /// only ever borrowed immutably.
    ///
    /// A panic inside this method is caught by the store: the state
    /// stays at `prev_state`, listeners are not notified, and the
    /// failure is reported by the next
    /// [Store::flush()](crate::Store::flush()).
    fn reduce(&self, prev_state: &State, action: &Action) -> State;
}

impl<F, State, Action> Reducer<State, Action> for F
where
    F: Fn(&State, &Action) -> State + Send,
{
    fn reduce(&self, prev_state: &State, action: &Action) -> State {
        (self)(prev_state, action)
    }
}

/// A [Reducer] composed of multiple reducers. Each reducer receives
/// the state produced by the one before it.
pub struct CompositeReducer<State, Action> {
    reducers: Vec<Box<dyn Reducer<State, Action>>>,
}

impl<State, Action> CompositeReducer<State, Action> {
    /// Create a new [CompositeReducer].
    pub fn new(reducers: Vec<Box<dyn Reducer<State, Action>>>) -> Self {
        CompositeReducer { reducers }
    }
}

impl<State, Action> Reducer<State, Action> for CompositeReducer<State, Action>
where
    State: Clone,
{
    fn reduce(&self, prev_state: &State, action: &Action) -> State {
        let mut reducers = self.reducers.iter();

        let mut state = match reducers.next() {
            Some(first) => first.reduce(prev_state, action),
            None => return prev_state.clone(),
        };

        for reducer in reducers {
            state = reducer.reduce(&state, action);
        }

        state
    }
}
