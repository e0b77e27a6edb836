use axum::Router;

use crate::state::SharedState;

pub mod announce;
pub mod clips;
pub mod docs;
pub mod health;
pub mod host;
pub mod sse;
pub mod viewer;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(host::router())
        .merge(clips::router(state.max_upload_bytes()))
        .merge(announce::router())
        .merge(viewer::router())
        .merge(docs::router());

    api_router.with_state(state)
}
