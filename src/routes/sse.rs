use std::convert::Infallible;

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::{
    services::sse_service::{self, StreamKind},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/sse/host",
    tag = "sse",
    responses((status = 200, description = "Host SSE stream: handshake, session, announce, play and stop events", content_type = "text/event-stream", body = String))
)]
/// Stream the live session, announcement and playback events to the host screen.
pub async fn host_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let receiver = sse_service::subscribe_host(&state);
    info!("New host SSE connection");
    let greeting = sse_service::host_greeting(&state).await;
    sse_service::to_sse_stream(greeting, receiver, StreamKind::Host)
}

#[utoipa::path(
    get,
    path = "/sse/viewer",
    tag = "sse",
    responses((status = 200, description = "Viewer SSE stream: session snapshots", content_type = "text/event-stream", body = String))
)]
/// Stream the mirrored session to the viewer screen.
pub async fn viewer_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    info!("New viewer SSE connection");
    let handshake = sse_service::handshake(&state, StreamKind::Viewer);
    sse_service::viewer_stream(handshake, state.viewer().subscribe())
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/sse/host", get(host_stream))
        .route("/sse/viewer", get(viewer_stream))
}
