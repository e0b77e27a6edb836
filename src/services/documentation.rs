use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Boombox Bingo Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::host_stream,
        crate::routes::sse::viewer_stream,
        crate::routes::host::get_session,
        crate::routes::host::draw,
        crate::routes::host::rename_session,
        crate::routes::host::reset,
        crate::routes::clips::upload_clips,
        crate::routes::clips::clear_clips,
        crate::routes::clips::clip_availability,
        crate::routes::announce::get_announcement,
        crate::routes::announce::open_announcement,
        crate::routes::announce::play_clip,
        crate::routes::announce::playback_ended,
        crate::routes::announce::close_announcement,
        crate::routes::announce::relayed_clip,
        crate::routes::viewer::get_viewer_session,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::session::SessionView,
            crate::dto::session::HostSessionResponse,
            crate::dto::session::DrawResponse,
            crate::dto::session::RenameRequest,
            crate::dto::clips::UploadResponse,
            crate::dto::clips::AvailabilityResponse,
            crate::dto::announce::PlaybackEndedRequest,
            crate::dto::sse::Handshake,
            crate::dto::sse::PlayEvent,
            crate::dto::sse::StopEvent,
            crate::dto::sse::ClipOrigin,
            crate::state::announce::AnnouncementView,
            crate::state::announce::ClipAvailability,
            crate::state::announce::PlaybackStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "host", description = "Game control from the host screen"),
        (name = "clips", description = "Uploaded song clips"),
        (name = "announce", description = "Play-song prompt after each draw"),
        (name = "viewer", description = "Read-only mirror for the viewer screen"),
    )
)]
pub struct ApiDoc;
