use parking_lot::RwLock;
use std::sync::Arc;

/// Holds the most recently published `State`. Written only by the
/// reduction thread; readers receive a shared snapshot which is never
/// mutated afterwards.
pub(crate) struct StateCell<State> {
    state: RwLock<Arc<State>>,
}

impl<State> StateCell<State> {
    pub(crate) fn new(initial_state: State) -> Self {
        Self {
            state: RwLock::new(Arc::new(initial_state)),
        }
    }

    pub(crate) fn load(&self) -> Arc<State> {
        self.state.read().clone()
    }

    pub(crate) fn store(&self, state: Arc<State>) {
        *self.state.write() = state;
    }
}

#[cfg(test)]
mod tests {
    use super::StateCell;
    use std::sync::Arc;

    #[test]
    fn published_snapshots_are_not_replaced_in_place() {
        let cell = StateCell::new(vec![0]);
        let first = cell.load();

        cell.store(Arc::new(vec![0, 1]));

        assert_eq!(*first, vec![0]);
        assert_eq!(*cell.load(), vec![0, 1]);
    }
}
