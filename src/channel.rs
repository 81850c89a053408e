//! The queue carrying work from any thread to the reduction thread.

use crate::{
    error::{Result, StoreError},
    registry::{ListenerId, Registration},
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use std::sync::Arc;

/// A unit of work for the reduction thread.
pub(crate) enum Message<State, Action> {
    /// Reduce the `Action` and publish the resulting state.
    Action(Action),
    /// Call the listener with the current state and add it to the
    /// registry, then report back.
    Subscribe {
        registration: Arc<Registration<State>>,
        done: Sender<Result<()>>,
    },
    /// Remove the listener from the registry, then report back. Every
    /// state published before this message still reaches it.
    Unsubscribe { id: ListenerId, done: Sender<()> },
    /// Signalled once every message queued before it has been
    /// processed.
    Barrier(Sender<()>),
}

/// The producer side of an unbounded FIFO channel which can be closed
/// from any thread. Messages queued before [ActionChannel::close()]
/// are still delivered to the receiver.
pub(crate) struct ActionChannel<State, Action> {
    sender: RwLock<Option<Sender<Message<State, Action>>>>,
}

impl<State, Action> ActionChannel<State, Action> {
    pub(crate) fn new() -> (Self, Receiver<Message<State, Action>>) {
        let (sender, receiver) = unbounded();
        (
            Self {
                sender: RwLock::new(Some(sender)),
            },
            receiver,
        )
    }

    /// Enqueue a message, never blocks on the receiver.
    pub(crate) fn send(&self, message: Message<State, Action>) -> Result<()> {
        match self.sender.read().as_ref() {
            Some(sender) => sender.send(message).map_err(|_| StoreError::Closed),
            None => Err(StoreError::Closed),
        }
    }

    /// Stop admitting messages. Returns `false` if the channel was
    /// already closed.
    pub(crate) fn close(&self) -> bool {
        self.sender.write().take().is_some()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.sender.read().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::{ActionChannel, Message};
    use crate::StoreError;
    use std::{sync::Arc, thread};

    fn actions(messages: impl Iterator<Item = Message<(), u32>>) -> Vec<u32> {
        messages
            .filter_map(|message| match message {
                Message::Action(action) => Some(action),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn fifo_and_drained_after_close() {
        let (channel, receiver) = ActionChannel::<(), u32>::new();
        for action in 0..5 {
            channel.send(Message::Action(action)).unwrap();
        }

        assert!(channel.close());
        assert!(!channel.close());
        assert!(channel.is_closed());
        assert!(matches!(
            channel.send(Message::Action(5)),
            Err(StoreError::Closed)
        ));

        assert_eq!(actions(receiver.iter()), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn per_producer_order_is_preserved() {
        let (channel, receiver) = ActionChannel::<(), u32>::new();
        let channel = Arc::new(channel);

        let producers: Vec<_> = (0..4u32)
            .map(|producer| {
                let channel = channel.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        channel.send(Message::Action(producer * 1000 + i)).unwrap();
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }
        channel.close();

        let received = actions(receiver.iter());
        assert_eq!(received.len(), 400);
        for producer in 0..4u32 {
            let own: Vec<u32> = received
                .iter()
                .copied()
                .filter(|action| action / 1000 == producer)
                .collect();
            let expected: Vec<u32> = (0..100).map(|i| producer * 1000 + i).collect();
            assert_eq!(own, expected);
        }
    }
}
