use serde::Serialize;
use utoipa::ToSchema;

/// Overall service status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Every change is saved.
    Ok,
    /// The game keeps running but the last change is not saved.
    Degraded,
}

/// Health payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall status.
    pub status: HealthStatus,
    /// True while the saved session lags behind the live game.
    pub unsynced: bool,
}

impl HealthResponse {
    /// Everything is saved.
    pub fn ok() -> Self {
        Self {
            status: HealthStatus::Ok,
            unsynced: false,
        }
    }

    /// The saved session is behind the live game.
    pub fn degraded() -> Self {
        Self {
            status: HealthStatus::Degraded,
            unsynced: true,
        }
    }
}
