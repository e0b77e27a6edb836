use axum::{Json, Router, extract::State, routing::get};

use crate::{dto::session::SessionView, state::SharedState};

/// Read-only routes for the viewer screen.
pub fn router() -> Router<SharedState> {
    Router::new().route("/viewer/session", get(get_viewer_session))
}

#[utoipa::path(
    get,
    path = "/viewer/session",
    tag = "viewer",
    responses((status = 200, description = "Last mirrored session, or null when none is saved", body = Option<SessionView>))
)]
/// Return the session as last read from storage.
pub async fn get_viewer_session(State(state): State<SharedState>) -> Json<Option<SessionView>> {
    let snapshot = state.viewer().current();
    Json(snapshot.as_ref().map(SessionView::from))
}
