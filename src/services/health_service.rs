use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report `ok`, or `degraded` while the saved session lags behind the game.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    if state.is_unsynced() {
        warn!("health check: saved session is behind the live game");
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::session_store::memory::MemorySessionStore, dto::health::HealthStatus,
        services::host_service, state::test_support::memory_state_with,
    };

    #[tokio::test]
    async fn degraded_while_unsynced() {
        let store = MemorySessionStore::new();
        let state = memory_state_with(store.clone()).await;
        assert_eq!(health_status(&state).await.status, HealthStatus::Ok);

        store.set_fail_writes(true);
        let _ = host_service::draw(&state).await;
        let health = health_status(&state).await;
        assert_eq!(health.status, HealthStatus::Degraded);
        assert!(health.unsynced);
    }
}
