use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Payload for `POST /host/announce/ended`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PlaybackEndedRequest {
    /// Lease received in the `play` event.
    pub lease: Uuid,
    /// Set when the clip failed to decode or play.
    #[serde(default)]
    pub failed: bool,
}

/// Path parameter for relayed clip downloads.
#[derive(Debug, Deserialize, IntoParams)]
pub struct LeasePath {
    /// Lease received in the `play` event.
    pub token: Uuid,
}
