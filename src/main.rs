//! Boombox Bingo Back binary entrypoint wiring REST, SSE, and storage layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use boombox_bingo_back::{
    config::AppConfig,
    dao::{
        clip_store::{ClipStore, file::FileClipStore, memory::MemoryClipStore},
        fallback::FallbackSource,
        session_store::{SessionStore, file::FileSessionStore, memory::MemorySessionStore},
    },
    routes,
    state::{AppParts, AppState, SharedState, draw::SystemDrawSource},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let app_state = AppState::new(build_parts(&config)?).await;

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Pick storage backends and the fallback source from the configuration.
fn build_parts(config: &AppConfig) -> anyhow::Result<AppParts> {
    let (session_store, clip_store): (Arc<dyn SessionStore>, Arc<dyn ClipStore>) =
        if config.ephemeral {
            warn!("ephemeral mode: the game and clips are lost on restart");
            (
                Arc::new(MemorySessionStore::new()),
                Arc::new(MemoryClipStore::new()),
            )
        } else {
            info!(data_dir = %config.data_dir.display(), "using on-disk storage");
            (
                Arc::new(FileSessionStore::new(&config.data_dir)),
                Arc::new(FileClipStore::new(&config.data_dir)),
            )
        };

    Ok(AppParts {
        session_store,
        clip_store,
        fallback: build_fallback(config)?,
        draw: Box::new(SystemDrawSource::new()),
        poll_interval: config.poll_interval,
        max_upload_bytes: config.max_upload_bytes,
    })
}

#[cfg(feature = "http-fallback")]
fn build_fallback(config: &AppConfig) -> anyhow::Result<Option<Arc<dyn FallbackSource>>> {
    use boombox_bingo_back::dao::fallback::HttpFallback;

    let Some(root) = config.assets_root.as_deref() else {
        info!("no assets root configured; only uploaded clips will play");
        return Ok(None);
    };
    let fallback = HttpFallback::new(root).context("building fallback client")?;
    info!(assets_root = root, "bundled clips enabled");
    Ok(Some(Arc::new(fallback)))
}

#[cfg(not(feature = "http-fallback"))]
fn build_fallback(config: &AppConfig) -> anyhow::Result<Option<Arc<dyn FallbackSource>>> {
    if config.assets_root.is_some() {
        warn!("assets root configured but built without http-fallback; ignoring it");
    }
    Ok(None)
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
