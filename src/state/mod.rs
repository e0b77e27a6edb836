pub mod announce;
pub mod draw;
pub mod engine;
pub mod session;
mod sse;

use std::{sync::Arc, time::Duration};

use tokio::sync::{Mutex, watch};
use tracing::info;

use crate::{
    dao::{clip_store::ClipStore, fallback::FallbackSource, session_store::SessionStore},
    services::{announce_service::RelayPlayer, clip_service::ClipResolver, viewer_sync::ViewerSync},
    state::{announce::Announcer, draw::DrawSource, engine::GameEngine},
};

pub use self::sse::SseHub;

/// Cheaply clonable handle on [`AppState`].
pub type SharedState = Arc<AppState>;

/// Capacity of the host SSE broadcast channel.
const HOST_SSE_CAPACITY: usize = 32;

/// Everything [`AppState::new`] needs, chosen by the binary or a test.
pub struct AppParts {
    /// Durable home of the game session.
    pub session_store: Arc<dyn SessionStore>,
    /// Uploaded clips.
    pub clip_store: Arc<dyn ClipStore>,
    /// Bundled clips used when nothing was uploaded.
    pub fallback: Option<Arc<dyn FallbackSource>>,
    /// Randomness for draws.
    pub draw: Box<dyn DrawSource>,
    /// Viewer poll interval.
    pub poll_interval: Duration,
    /// Largest accepted upload request, in bytes.
    pub max_upload_bytes: usize,
}

/// Central application state shared by every handler.
///
/// The host side owns the engine; the viewer side only sees the store through
/// [`ViewerSync`].
pub struct AppState {
    engine: Mutex<GameEngine>,
    unsynced: watch::Receiver<bool>,
    viewer: ViewerSync,
    clips: Arc<dyn ClipStore>,
    resolver: ClipResolver,
    announcer: Mutex<Announcer>,
    player: RelayPlayer,
    host_sse: SseHub,
    max_upload_bytes: usize,
}

impl AppState {
    /// Restore or start the game and spawn the viewer mirror.
    pub async fn new(parts: AppParts) -> SharedState {
        let engine = GameEngine::initialize(parts.session_store.clone(), parts.draw).await;
        let unsynced = engine.subscribe_unsynced();
        let viewer = ViewerSync::spawn(parts.session_store, parts.poll_interval);
        let host_sse = SseHub::new(HOST_SSE_CAPACITY);
        let resolver = ClipResolver::new(parts.clip_store.clone(), parts.fallback);

        info!(
            name = %engine.session().name,
            called = engine.session().called.len(),
            "application state ready"
        );

        Arc::new(Self {
            engine: Mutex::new(engine),
            unsynced,
            viewer,
            clips: parts.clip_store,
            resolver,
            announcer: Mutex::new(Announcer::new()),
            player: RelayPlayer::new(host_sse.clone()),
            host_sse,
            max_upload_bytes: parts.max_upload_bytes,
        })
    }

    /// The single writer of the game session.
    pub fn engine(&self) -> &Mutex<GameEngine> {
        &self.engine
    }

    /// Whether the saved session lags behind the host's game.
    pub fn is_unsynced(&self) -> bool {
        *self.unsynced.borrow()
    }

    /// Read-only mirror used by the viewer routes.
    pub fn viewer(&self) -> &ViewerSync {
        &self.viewer
    }

    /// Uploaded clip repository.
    pub fn clips(&self) -> &Arc<dyn ClipStore> {
        &self.clips
    }

    /// Number to clip resolution.
    pub fn resolver(&self) -> &ClipResolver {
        &self.resolver
    }

    /// Announcement prompt state.
    pub fn announcer(&self) -> &Mutex<Announcer> {
        &self.announcer
    }

    /// Player relaying clips to the host screen.
    pub fn player(&self) -> &RelayPlayer {
        &self.player
    }

    /// Broadcast hub used for the host SSE stream.
    pub fn host_sse(&self) -> &SseHub {
        &self.host_sse
    }

    /// Largest accepted upload request, in bytes.
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }
}
