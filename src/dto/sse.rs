use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{services::clip_service::ClipSource, state::session::BallNumber};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    /// SSE event name; unnamed events arrive as `message`.
    pub event: Option<String>,
    /// JSON payload.
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream (`host` or `viewer`).
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the saved session lags behind the host's game.
    pub unsynced: bool,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
/// Origin of a relayed clip.
pub enum ClipOrigin {
    /// Uploaded by the host.
    Uploaded,
    /// Bundled static asset.
    Fallback,
}

impl From<ClipSource> for ClipOrigin {
    fn from(source: ClipSource) -> Self {
        match source {
            ClipSource::Uploaded => ClipOrigin::Uploaded,
            ClipSource::Fallback => ClipOrigin::Fallback,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Tells the host screen to fetch and play a clip.
pub struct PlayEvent {
    /// Lease to report back on `/host/announce/ended`.
    pub lease: Uuid,
    /// Announced ball.
    #[schema(value_type = u8)]
    pub number: BallNumber,
    /// Where the clip came from.
    pub source: ClipOrigin,
    /// Relative URL serving the clip bytes while the lease lives.
    pub url: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Tells the host screen to stop a clip; its URL no longer resolves.
pub struct StopEvent {
    /// Lease that was released.
    pub lease: Uuid,
}
