use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, FromRequest, Multipart, Path, Request, State},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    routing::{delete, get, post},
};
use tracing::{info, warn};
use validator::Validate;

use crate::{
    dao::clip_store::ClipStore,
    dto::{
        clips::{AvailabilityResponse, UploadResponse},
        validation::{NumberPath, validate_file_name},
    },
    error::{AppError, ServiceError},
    services::clip_service::{self, UploadedFile},
    state::SharedState,
};

/// Header naming the file when a single clip is sent as the raw body.
pub const FILE_NAME_HEADER: &str = "x-file-name";

/// Routes managing uploaded clips.
pub fn router(max_upload_bytes: usize) -> Router<SharedState> {
    Router::new()
        .route(
            "/host/clips",
            post(upload_clips).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/host/clips", delete(clear_clips))
        .route("/host/clips/{number}/availability", get(clip_availability))
}

#[utoipa::path(
    post,
    path = "/host/clips",
    tag = "clips",
    request_body(content = String, description = "multipart/form-data with one file per clip, or a raw body named by the x-file-name header"),
    responses(
        (status = 200, description = "Upload summary", body = UploadResponse),
        (status = 400, description = "Malformed upload"),
        (status = 503, description = "Upload failed. Try again.")
    )
)]
/// Store clips named `1.mp3` to `90.mp3`; other files are skipped.
pub async fn upload_clips(
    State(state): State<SharedState>,
    headers: HeaderMap,
    request: Request,
) -> Result<Json<UploadResponse>, AppError> {
    let is_multipart = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"));

    let files = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|err| AppError::BadRequest(err.body_text()))?;
        read_multipart(multipart).await?
    } else {
        read_raw(&headers, request, &state).await?
    };

    let report = clip_service::import_clips(state.clips().as_ref(), files)
        .await
        .map_err(|err| {
            warn!(error = %err, "clip upload failed");
            ServiceError::UploadFailed(err)
        })?;
    Ok(Json(report.into()))
}

async fn read_multipart(mut multipart: Multipart) -> Result<Vec<UploadedFile>, AppError> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::BadRequest(err.body_text()))?
    {
        let Some(name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppError::BadRequest(err.body_text()))?;
        files.push(UploadedFile { name, bytes });
    }
    Ok(files)
}

async fn read_raw(
    headers: &HeaderMap,
    request: Request,
    state: &SharedState,
) -> Result<Vec<UploadedFile>, AppError> {
    let name = headers
        .get(FILE_NAME_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "send multipart/form-data or name the file in {FILE_NAME_HEADER}"
            ))
        })?
        .to_string();
    validate_file_name(&name).map_err(|err| AppError::BadRequest(err.to_string()))?;

    let bytes = Bytes::from_request(request, state)
        .await
        .map_err(|err| AppError::BadRequest(err.body_text()))?;
    Ok(vec![UploadedFile { name, bytes }])
}

#[utoipa::path(
    delete,
    path = "/host/clips",
    tag = "clips",
    responses(
        (status = 204, description = "All uploaded clips removed"),
        (status = 503, description = "Clip storage unavailable")
    )
)]
/// Remove every uploaded clip.
pub async fn clear_clips(State(state): State<SharedState>) -> Result<StatusCode, AppError> {
    state.clips().clear().await.map_err(ServiceError::from)?;
    info!("cleared uploaded clips");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/host/clips/{number}/availability",
    tag = "clips",
    params(NumberPath),
    responses(
        (status = 200, description = "Whether a clip exists", body = AvailabilityResponse),
        (status = 400, description = "Not a ball number")
    )
)]
/// Check whether a number has an uploaded or bundled clip.
pub async fn clip_availability(
    State(state): State<SharedState>,
    Path(path): Path<NumberPath>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    path.validate()?;
    let availability = state.resolver().availability(path.number).await;
    Ok(Json(AvailabilityResponse::new(path.number, availability)))
}
