use axum::{
    Json, Router,
    extract::State,
    routing::{get, post, put},
};
use validator::Validate;

use crate::{
    dto::session::{DrawResponse, HostSessionResponse, RenameRequest},
    error::AppError,
    services::host_service,
    state::SharedState,
};

/// Routes driving the game from the host screen.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/host/session", get(get_session))
        .route("/host/session/name", put(rename_session))
        .route("/host/draw", post(draw))
        .route("/host/reset", post(reset))
}

#[utoipa::path(
    get,
    path = "/host/session",
    tag = "host",
    responses((status = 200, description = "Live session", body = HostSessionResponse))
)]
/// Return the live session and whether it is saved.
pub async fn get_session(State(state): State<SharedState>) -> Json<HostSessionResponse> {
    Json(host_service::session(&state).await)
}

#[utoipa::path(
    post,
    path = "/host/draw",
    tag = "host",
    responses(
        (status = 200, description = "Number called, or every number already called", body = DrawResponse),
        (status = 503, description = "Number called but the game could not be saved")
    )
)]
/// Call the next number.
pub async fn draw(State(state): State<SharedState>) -> Result<Json<DrawResponse>, AppError> {
    let outcome = host_service::draw(&state).await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    put,
    path = "/host/session/name",
    tag = "host",
    request_body = RenameRequest,
    responses(
        (status = 200, description = "Session renamed", body = HostSessionResponse),
        (status = 400, description = "Name too long")
    )
)]
/// Rename the session; a blank name becomes the placeholder.
pub async fn rename_session(
    State(state): State<SharedState>,
    Json(payload): Json<RenameRequest>,
) -> Result<Json<HostSessionResponse>, AppError> {
    payload.validate()?;
    let session = host_service::rename(&state, &payload.name).await?;
    Ok(Json(session))
}

#[utoipa::path(
    post,
    path = "/host/reset",
    tag = "host",
    responses(
        (status = 200, description = "Game restarted", body = HostSessionResponse),
        (status = 503, description = "Game restarted but could not be saved")
    )
)]
/// Discard the game and start over under the same name.
///
/// Clients must confirm with the host before calling this.
pub async fn reset(State(state): State<SharedState>) -> Result<Json<HostSessionResponse>, AppError> {
    let session = host_service::reset(&state).await?;
    Ok(Json(session))
}
