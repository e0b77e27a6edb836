use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc, watch,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::{
    dto::{
        session::SessionView,
        sse::{Handshake, ServerEvent},
    },
    state::{SharedState, session::GameSession},
};

/// SSE event name carrying the session: the live one on the host stream, the
/// mirrored one on the viewer stream.
pub const SESSION_EVENT: &str = "session";

/// Identifies the target SSE stream for logging on teardown.
#[derive(Clone, Copy, Debug)]
pub enum StreamKind {
    /// Host screen: live session, announcement and playback events.
    Host,
    /// Viewer screen: mirrored session snapshots.
    Viewer,
}

impl StreamKind {
    fn name(self) -> &'static str {
        match self {
            StreamKind::Host => "host",
            StreamKind::Viewer => "viewer",
        }
    }
}

/// Subscribe to the host event stream.
pub fn subscribe_host(state: &SharedState) -> broadcast::Receiver<ServerEvent> {
    state.host_sse().subscribe()
}

/// Handshake event sent first on every stream.
pub fn handshake(state: &SharedState, kind: StreamKind) -> Option<ServerEvent> {
    let payload = Handshake {
        stream: kind.name().to_string(),
        message: format!("{} stream connected", kind.name()),
        unsynced: state.is_unsynced(),
    };
    match ServerEvent::json("handshake".to_string(), &payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(error = %err, "failed to encode handshake");
            None
        }
    }
}

/// Encode a mirrored snapshot; `null` tells the viewer to show its placeholder.
pub fn session_event(snapshot: Option<&GameSession>) -> serde_json::Result<ServerEvent> {
    let view = snapshot.map(SessionView::from);
    ServerEvent::json(SESSION_EVENT.to_string(), &view)
}

/// Events a host screen receives on connect: handshake, then the live session.
pub async fn host_greeting(state: &SharedState) -> Vec<ServerEvent> {
    let mut events: Vec<ServerEvent> = handshake(state, StreamKind::Host).into_iter().collect();
    let engine = state.engine().lock().await;
    match session_event(Some(engine.session())) {
        Ok(event) => events.push(event),
        Err(err) => warn!(error = %err, "failed to encode host session"),
    }
    events
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

fn keep_alive() -> KeepAlive {
    KeepAlive::new()
        .interval(Duration::from_secs(15))
        .text("keep-alive")
}

/// Convert a broadcast receiver into an SSE response, forwarding events and
/// cleaning up once the client disconnects. `initial` events go out first.
pub fn to_sse_stream(
    initial: Vec<ServerEvent>,
    mut receiver: broadcast::Receiver<ServerEvent>,
    kind: StreamKind,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        for event in initial {
            if tx.send(Ok(to_event(event))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        // Skip lagged messages but keep the stream alive.
                        Err(RecvError::Lagged(_)) => continue,
                    }
                }
            }
        }

        info!(stream = kind.name(), "SSE stream disconnected");
    });

    Sse::new(ReceiverStream::new(rx)).keep_alive(keep_alive())
}

/// Stream the mirrored session: the current snapshot first, then every change.
pub fn viewer_stream(
    first: Option<ServerEvent>,
    mut snapshots: watch::Receiver<Option<GameSession>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        if let Some(first) = first {
            yield Ok(to_event(first));
        }

        loop {
            let encoded = {
                let snapshot = snapshots.borrow_and_update();
                session_event(snapshot.as_ref())
            };
            match encoded {
                Ok(event) => yield Ok(to_event(event)),
                Err(err) => warn!(error = %err, "failed to encode viewer snapshot"),
            }

            if snapshots.changed().await.is_err() {
                break;
            }
        }

        info!(stream = StreamKind::Viewer.name(), "SSE stream disconnected");
    };

    Sse::new(stream).keep_alive(keep_alive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::memory_state;

    #[tokio::test]
    async fn host_screens_are_greeted_with_the_live_session() {
        let state = memory_state().await;
        crate::services::host_service::draw(&state).await.unwrap();

        let greeting = host_greeting(&state).await;
        let names: Vec<_> = greeting.iter().map(|e| e.event.as_deref()).collect();
        assert_eq!(names, [Some("handshake"), Some(SESSION_EVENT)]);
        let session: serde_json::Value = serde_json::from_str(&greeting[1].data).unwrap();
        assert_eq!(session["called"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn missing_snapshots_encode_as_null() {
        let event = session_event(None).unwrap();
        assert_eq!(event.event.as_deref(), Some(SESSION_EVENT));
        assert_eq!(event.data, "null");
    }

    #[test]
    fn snapshots_carry_the_session_view() {
        let mut session = GameSession::fresh("order");
        session.take_remaining(4);
        let event = session_event(Some(&session)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&event.data).unwrap();
        assert_eq!(value["current"], 5);
        assert_eq!(value["name"], "order");
    }
}
