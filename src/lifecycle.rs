use parking_lot::{Condvar, Mutex};

/// The stages a [Store](crate::Store) moves through, in order. A store
/// never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Lifecycle {
    /// Constructed, reduction thread not yet started. A [Store](crate::Store)
    /// is only handed out once running, so callers never observe this.
    Created,
    /// Admitting and processing actions.
    Running,
    /// No longer admitting actions, draining the ones already queued.
    Closing,
    /// The reduction thread has stopped.
    Closed,
}

pub(crate) struct LifecycleController {
    stage: Mutex<Lifecycle>,
    changed: Condvar,
}

impl LifecycleController {
    pub(crate) fn new() -> Self {
        Self {
            stage: Mutex::new(Lifecycle::Created),
            changed: Condvar::new(),
        }
    }

    pub(crate) fn get(&self) -> Lifecycle {
        *self.stage.lock()
    }

    /// Move forward to `stage`. Returns `false` (and changes nothing) if
    /// the lifecycle is already at or past `stage`.
    pub(crate) fn advance(&self, stage: Lifecycle) -> bool {
        let mut current = self.stage.lock();
        if *current >= stage {
            return false;
        }

        log::trace!("store lifecycle {:?} -> {:?}", *current, stage);
        *current = stage;
        self.changed.notify_all();
        true
    }

    /// Block until the lifecycle reaches [Lifecycle::Closed].
    pub(crate) fn wait_closed(&self) {
        let mut current = self.stage.lock();
        while *current != Lifecycle::Closed {
            self.changed.wait(&mut current);
        }
    }
}

/// Moves the lifecycle to [Lifecycle::Closed] when dropped, including
/// while unwinding.
pub(crate) struct CloseOnDrop<'a>(pub(crate) &'a LifecycleController);

impl Drop for CloseOnDrop<'_> {
    fn drop(&mut self) {
        self.0.advance(Lifecycle::Closed);
    }
}
