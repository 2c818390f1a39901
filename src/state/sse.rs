use tokio::sync::broadcast;

use crate::dto::sse::ServerEvent;

/// Broadcast hub feeding the notification SSE stream.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, returning how many will see it.
    ///
    /// Zero means nobody is connected and the event is dropped.
    pub fn broadcast(&self, event: ServerEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Number of connected stream subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reports_reach() {
        let hub = SseHub::new(4);
        assert_eq!(hub.broadcast(ServerEvent::new(None, "lost".into())), 0);

        let mut receiver = hub.subscribe();
        assert_eq!(hub.broadcast(ServerEvent::new(Some("ping".into()), "{}".into())), 1);
        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some("ping"));
    }
}
