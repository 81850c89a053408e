//! [Middleware] which logs every `Action` dispatched to a
//! [Store](crate::Store) using the [log] crate.

use crate::{
    middleware::{Middleware, Next},
    Result, StoreHandle,
};
use std::fmt::Debug;

pub enum LogLevel {
    Trace,
    Debug,
    Warn,
    Info,
}

impl LogLevel {
    pub fn log<S: AsRef<str>>(&self, message: S) {
        match self {
            LogLevel::Trace => log::trace!("{}", message.as_ref()),
            LogLevel::Debug => log::debug!("{}", message.as_ref()),
            LogLevel::Warn => log::warn!("{}", message.as_ref()),
            LogLevel::Info => log::info!("{}", message.as_ref()),
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Debug
    }
}

pub struct SimpleLoggerMiddleware {
    log_level: LogLevel,
    log_state: bool,
}

impl SimpleLoggerMiddleware {
    pub fn new() -> Self {
        SimpleLoggerMiddleware {
            log_level: LogLevel::default(),
            log_state: false,
        }
    }

    pub fn log_level(mut self, log_level: LogLevel) -> Self {
        self.log_level = log_level;
        self
    }

    /// Also log the current state before each action is forwarded.
    /// Reading the state waits for previously dispatched actions to be
    /// reduced.
    pub fn log_state(mut self, log_state: bool) -> Self {
        self.log_state = log_state;
        self
    }
}

impl Default for SimpleLoggerMiddleware {
    fn default() -> Self {
        SimpleLoggerMiddleware::new()
    }
}

impl<State, Action> Middleware<State, Action> for SimpleLoggerMiddleware
where
    State: Debug + Send + Sync + 'static,
    Action: Debug + Send + 'static,
{
    fn on_dispatch(
        &self,
        store: &StoreHandle<State, Action>,
        next: &Next<Action>,
        action: Action,
    ) -> Result<()> {
        if self.log_state {
            if let Some(state) = store.state() {
                self.log_level.log(format!("prev state: {:?}", state));
            }
        }
        self.log_level.log(format!("action: {:?}", action));

        next.dispatch(action)
    }
}

#[cfg(test)]
mod tests {
    use super::{LogLevel, SimpleLoggerMiddleware};
    use crate::Store;

    #[test]
    fn forwards_actions() {
        let reducer = |state: &Vec<u8>, action: &u8| {
            let mut state = state.clone();
            state.push(*action);
            state
        };
        let store = Store::new(reducer, Vec::new());
        store
            .apply_middleware(
                SimpleLoggerMiddleware::new()
                    .log_level(LogLevel::Trace)
                    .log_state(true),
            )
            .unwrap();

        store.dispatch(1u8).unwrap();
        store.dispatch(2u8).unwrap();
        assert_eq!(*store.state(), vec![1, 2]);
    }
}
