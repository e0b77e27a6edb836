use tracing::{info, warn};

use crate::{
    dto::session::{DrawResponse, HostSessionResponse, SessionView},
    error::ServiceError,
    services::{announce_service, sse_service},
    state::{
        SharedState,
        engine::{DrawOutcome, GameEngine},
    },
};

fn host_view(engine: &GameEngine) -> HostSessionResponse {
    HostSessionResponse {
        session: SessionView::from(engine.session()),
        unsynced: engine.is_unsynced(),
    }
}

/// Push the live session to connected host screens.
///
/// Runs after every mutation, saved or not: the in-memory session is what the
/// host is playing.
fn publish_session(state: &SharedState, engine: &GameEngine) {
    match sse_service::session_event(Some(engine.session())) {
        Ok(event) => state.host_sse().broadcast(event),
        Err(err) => warn!(error = %err, "failed to encode host session event"),
    }
}

/// Current host session.
pub async fn session(state: &SharedState) -> HostSessionResponse {
    let engine = state.engine().lock().await;
    host_view(&engine)
}

/// Call the next number; calling after the last one is a no-op.
pub async fn draw(state: &SharedState) -> Result<DrawResponse, ServiceError> {
    let mut engine = state.engine().lock().await;
    let outcome = engine.call_next().await;
    if !matches!(outcome, Ok(DrawOutcome::AlreadyFinished)) {
        publish_session(state, &engine);
    }
    Ok(outcome?.into())
}

/// Rename the session and return it.
pub async fn rename(state: &SharedState, name: &str) -> Result<HostSessionResponse, ServiceError> {
    let mut engine = state.engine().lock().await;
    let renamed = engine.rename(name).await;
    publish_session(state, &engine);
    renamed?;
    Ok(host_view(&engine))
}

/// Start over with the same name, closing any open announcement first.
pub async fn reset(state: &SharedState) -> Result<HostSessionResponse, ServiceError> {
    announce_service::close(state).await;

    let mut engine = state.engine().lock().await;
    let reset = engine.reset().await;
    publish_session(state, &engine);
    reset?;
    info!(name = %engine.session().name, "host reset the game");
    Ok(host_view(&engine))
}
