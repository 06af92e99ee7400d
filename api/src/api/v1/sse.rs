//! GET /api/sse/subscribe — opens a long-lived SSE connection that
//! receives `videoStatusUpdate` events for the authenticated user's own
//! videos plus periodic heartbeat comments.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::Stream;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::middleware::AuthenticatedUser;
use crate::services::sse::EmitterRegistry;
use crate::state::AppState;

/// Wraps the per-connection receiver so the emitter is unregistered the
/// moment the stream is dropped (client disconnect, or the sweeper closing
/// it), not just when it's explicitly removed.
struct GuardedReceiver {
    owner_username: String,
    id: Uuid,
    registry: Arc<EmitterRegistry>,
    receiver: mpsc::UnboundedReceiver<Event>,
}

impl Stream for GuardedReceiver {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx).map(|opt| opt.map(Ok))
    }
}

impl Drop for GuardedReceiver {
    fn drop(&mut self) {
        let registry = self.registry.clone();
        let owner_username = self.owner_username.clone();
        let id = self.id;
        tokio::spawn(async move {
            registry.remove_emitter(&owner_username, id).await;
        });
    }
}

pub async fn subscribe(
    AuthenticatedUser(user): AuthenticatedUser,
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (id, receiver) = state.emitters.add_emitter(&user.username).await;
    let stream = GuardedReceiver {
        owner_username: user.username,
        id,
        registry: state.emitters.clone(),
        receiver,
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
