//! Event streaming over unbounded channels.

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};

/// Typed event channel from widgets and background tasks into an Actor.
///
/// Relays follow the `{source}_{event}_relay` naming pattern, e.g.
/// `command_issued_relay` or `backend_replied_relay`. One relay may be fed
/// from many widgets: every toolbar control emits into the same command relay.
#[derive(Clone, Debug)]
pub struct Relay<T>
where
    T: Clone + Send + Sync + 'static,
{
    sender: UnboundedSender<T>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// The receiving Actor is gone.
    ChannelClosed,
}

impl<T> Relay<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> (Self, UnboundedReceiver<T>) {
        let (sender, receiver) = unbounded();
        (Relay { sender }, receiver)
    }

    /// Sends an event; it is dropped silently when the receiver is gone.
    pub fn send(&self, value: T) {
        let _ = self.sender.unbounded_send(value);
    }

    pub fn try_send(&self, value: T) -> Result<(), RelayError> {
        self.sender
            .unbounded_send(value)
            .map_err(|_| RelayError::ChannelClosed)
    }
}

impl<T> Default for Relay<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// A disconnected relay: every event is discarded.
    fn default() -> Self {
        let (relay, _receiver) = Self::new();
        relay
    }
}

/// Creates a relay together with the stream its Actor consumes.
pub fn relay<T>() -> (Relay<T>, UnboundedReceiver<T>)
where
    T: Clone + Send + Sync + 'static,
{
    Relay::new()
}
