/// Play-song prompt flows and the clip relay player.
pub mod announce_service;
/// Clip upload and number to audio resolution.
pub mod clip_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Host-side game operations.
pub mod host_service;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Read-only session mirror for the viewer.
pub mod viewer_sync;
