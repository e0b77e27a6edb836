use tokio::sync::broadcast;
use tracing::trace;

use crate::dto::sse::ServerEvent;

/// Fan-out of host screen events (`announce`, `play`, `stop`).
///
/// Cloning shares the channel, so the clip relay and the routes publish to the
/// same subscribers.
#[derive(Clone)]
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Hub buffering up to `capacity` events per lagging subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Publish `event`; with no host screen connected it is dropped.
    pub fn broadcast(&self, event: ServerEvent) {
        let name = event.event.clone();
        match self.sender.send(event) {
            Ok(receivers) => trace!(event = ?name, receivers, "host event sent"),
            Err(_) => trace!(event = ?name, "no host screen listening; event dropped"),
        }
    }
}
