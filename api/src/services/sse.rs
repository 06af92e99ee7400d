//! Component D — SSE Fan-out. Holds one outbound channel per open
//! `/api/sse/subscribe` connection, keyed by the owning user, and forwards
//! matching events from the event bus to every connection that user has
//! open. axum's `Sse` response has no native idle timeout, so a sweeper
//! task here closes connections that have gone quiet past the configured
//! soft timeout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::response::sse::Event;
use clipcraft_shared::VideoStatusUpdate;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::event_bus::EventBus;

struct Emitter {
    id: Uuid,
    sender: mpsc::UnboundedSender<Event>,
    registered_at: Instant,
}

/// Registry of live SSE connections, generalized from a plain TTL-cache
/// idiom: instead of one value per key, each owner maps to the set of
/// connections currently subscribed for them.
pub struct EmitterRegistry {
    emitters: RwLock<HashMap<String, Vec<Emitter>>>,
    timeout: Duration,
}

impl EmitterRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            emitters: RwLock::new(HashMap::new()),
            timeout,
        }
    }

    /// Registers a new connection for `owner_username` and returns the
    /// receiving half the handler streams back to the client, plus the
    /// emitter id needed to unregister it on disconnect.
    pub async fn add_emitter(&self, owner_username: &str) -> (Uuid, mpsc::UnboundedReceiver<Event>) {
        let id = Uuid::new_v4();
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut emitters = self.emitters.write().await;
        emitters
            .entry(owner_username.to_string())
            .or_default()
            .push(Emitter {
                id,
                sender,
                registered_at: Instant::now(),
            });
        (id, receiver)
    }

    pub async fn remove_emitter(&self, owner_username: &str, id: Uuid) {
        let mut emitters = self.emitters.write().await;
        if let Some(list) = emitters.get_mut(owner_username) {
            list.retain(|e| e.id != id);
            if list.is_empty() {
                emitters.remove(owner_username);
            }
        }
    }

    async fn send_event_to_user(&self, owner_username: &str, event: Event) {
        let emitters = self.emitters.read().await;
        if let Some(list) = emitters.get(owner_username) {
            for emitter in list {
                let _ = emitter.sender.send(event.clone());
            }
        }
    }

    async fn send_heartbeat(&self) {
        let emitters = self.emitters.read().await;
        for list in emitters.values() {
            for emitter in list {
                let _ = emitter.sender.send(Event::default().comment("keep-alive"));
            }
        }
    }

    /// Drops any connection whose sender has been open longer than the
    /// soft timeout. A live connection is expected to be re-established by
    /// the client well before this fires; it exists to reclaim registry
    /// entries for clients that vanished without a clean disconnect.
    async fn sweep(&self) {
        let mut emitters = self.emitters.write().await;
        emitters.retain(|_owner, list| {
            list.retain(|e| e.registered_at.elapsed() < self.timeout || !e.sender.is_closed());
            !list.is_empty()
        });
    }
}

/// Spawns the background tasks that drive the registry: one forwarding
/// bus events to matching connections, one periodic heartbeat, one
/// sweeper. Returns immediately; the tasks run for the lifetime of the
/// process.
pub fn spawn_fanout(
    registry: Arc<EmitterRegistry>,
    event_bus: Arc<EventBus>,
    heartbeat_interval: Duration,
) {
    let forward_registry = registry.clone();
    let mut rx = event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(changed) => {
                    let update = VideoStatusUpdate::from(&changed);
                    let payload = match serde_json::to_string(&update) {
                        Ok(p) => p,
                        Err(e) => {
                            log::error!("failed to serialize status update: {e}");
                            continue;
                        }
                    };
                    let event = Event::default().event("videoStatusUpdate").data(payload);
                    forward_registry.send_event_to_user(&changed.owner_username, event).await;
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("sse fan-out lagged, dropped {skipped} events");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let heartbeat_registry = registry.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(heartbeat_interval);
        loop {
            ticker.tick().await;
            heartbeat_registry.send_heartbeat().await;
        }
    });

    let sweep_registry = registry;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(heartbeat_interval);
        loop {
            ticker.tick().await;
            sweep_registry.sweep().await;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_then_remove_emitter_clears_owner_entry() {
        let registry = EmitterRegistry::new(Duration::from_secs(60));
        let (id, _rx) = registry.add_emitter("alice").await;
        assert_eq!(registry.emitters.read().await.get("alice").map(|l| l.len()), Some(1));
        registry.remove_emitter("alice", id).await;
        assert!(registry.emitters.read().await.get("alice").is_none());
    }

    #[tokio::test]
    async fn send_event_only_reaches_matching_owner() {
        let registry = EmitterRegistry::new(Duration::from_secs(60));
        let (_id_a, mut rx_a) = registry.add_emitter("alice").await;
        let (_id_b, mut rx_b) = registry.add_emitter("bob").await;

        registry
            .send_event_to_user("alice", Event::default().event("videoStatusUpdate").data("{}"))
            .await;

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn sweep_drops_closed_senders() {
        let registry = EmitterRegistry::new(Duration::from_millis(1));
        let (_id, rx) = registry.add_emitter("alice").await;
        drop(rx);
        tokio::time::sleep(Duration::from_millis(5)).await;
        registry.sweep().await;
        assert!(registry.emitters.read().await.get("alice").is_none());
    }
}
