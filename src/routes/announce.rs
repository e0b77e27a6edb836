use axum::{
    Json, Router,
    extract::{Path, State},
    http::header::{CACHE_CONTROL, CONTENT_TYPE},
    response::IntoResponse,
    routing::{get, post},
};
use validator::Validate;

use crate::{
    dto::{
        announce::{LeasePath, PlaybackEndedRequest},
        validation::NumberPath,
    },
    error::AppError,
    services::announce_service,
    state::{SharedState, announce::AnnouncementView},
};

/// Routes backing the "play song" prompt on the host screen.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/host/announce", get(get_announcement))
        .route("/host/announce/{number}/open", post(open_announcement))
        .route("/host/announce/play", post(play_clip))
        .route("/host/announce/ended", post(playback_ended))
        .route("/host/announce/close", post(close_announcement))
        .route("/host/announce/clip/{token}", get(relayed_clip))
}

#[utoipa::path(
    get,
    path = "/host/announce",
    tag = "announce",
    responses((status = 200, description = "Current prompt", body = AnnouncementView))
)]
/// Return the current prompt state.
pub async fn get_announcement(State(state): State<SharedState>) -> Json<AnnouncementView> {
    Json(announce_service::current(&state).await)
}

#[utoipa::path(
    post,
    path = "/host/announce/{number}/open",
    tag = "announce",
    params(NumberPath),
    responses(
        (status = 200, description = "Prompt opened; availability arrives on /sse/host", body = AnnouncementView),
        (status = 400, description = "Not a ball number")
    )
)]
/// Open the prompt for a number and start checking for its clip.
pub async fn open_announcement(
    State(state): State<SharedState>,
    Path(path): Path<NumberPath>,
) -> Result<Json<AnnouncementView>, AppError> {
    path.validate()?;
    Ok(Json(announce_service::open(&state, path.number).await))
}

#[utoipa::path(
    post,
    path = "/host/announce/play",
    tag = "announce",
    responses(
        (status = 200, description = "Clip started", body = AnnouncementView),
        (status = 404, description = "No clip for this number"),
        (status = 409, description = "No prompt open or playback in progress")
    )
)]
/// Play the clip for the open prompt.
pub async fn play_clip(State(state): State<SharedState>) -> Result<Json<AnnouncementView>, AppError> {
    let view = announce_service::play(&state).await?;
    Ok(Json(view))
}

#[utoipa::path(
    post,
    path = "/host/announce/ended",
    tag = "announce",
    request_body = PlaybackEndedRequest,
    responses(
        (status = 200, description = "Playback recorded as finished", body = AnnouncementView),
        (status = 404, description = "Lease is not the current playback")
    )
)]
/// Report that the host screen finished or failed playing a clip.
pub async fn playback_ended(
    State(state): State<SharedState>,
    Json(payload): Json<PlaybackEndedRequest>,
) -> Result<Json<AnnouncementView>, AppError> {
    let view = announce_service::ended(&state, payload.lease, payload.failed).await?;
    Ok(Json(view))
}

#[utoipa::path(
    post,
    path = "/host/announce/close",
    tag = "announce",
    responses((status = 200, description = "Prompt closed", body = AnnouncementView))
)]
/// Close the prompt and stop playback.
pub async fn close_announcement(State(state): State<SharedState>) -> Json<AnnouncementView> {
    Json(announce_service::close(&state).await)
}

#[utoipa::path(
    get,
    path = "/host/announce/clip/{token}",
    tag = "announce",
    params(LeasePath),
    responses(
        (status = 200, description = "Clip bytes", content_type = "audio/mpeg", body = Vec<u8>),
        (status = 404, description = "Lease released or unknown")
    )
)]
/// Serve the bytes of a playing clip.
pub async fn relayed_clip(
    State(state): State<SharedState>,
    Path(path): Path<LeasePath>,
) -> Result<impl IntoResponse, AppError> {
    let clip = announce_service::relayed_clip(&state, path.token)?;
    Ok((
        [
            (CONTENT_TYPE, clip.content_type),
            (CACHE_CONTROL, "no-store".to_string()),
        ],
        clip.bytes,
    ))
}
