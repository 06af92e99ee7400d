//! In-process event bus carrying `VideoStatusChanged` events from the
//! status updater to anything listening for them (currently only the SSE
//! fan-out). Backed by a broadcast channel; slow/absent subscribers never
//! block a publish.

use clipcraft_shared::VideoStatusChanged;
use tokio::sync::broadcast;

pub struct EventBus {
    sender: broadcast::Sender<VideoStatusChanged>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all current subscribers. Returns the number of
    /// receivers it was delivered to; a publish is never an error, even if
    /// nobody is listening.
    pub fn publish(&self, event: VideoStatusChanged) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VideoStatusChanged> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipcraft_shared::VideoStatus;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        bus.publish(VideoStatusChanged::new("1", "pub-1", "alice", VideoStatus::Ready));
        let event = rx.recv().await.unwrap();
        assert_eq!(event.public_id, "pub-1");
        assert_eq!(event.status, VideoStatus::Ready);
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_error() {
        let bus = EventBus::new(16);
        let delivered = bus.publish(VideoStatusChanged::new("1", "pub-1", "alice", VideoStatus::Ready));
        assert_eq!(delivered, 0);
    }
}
