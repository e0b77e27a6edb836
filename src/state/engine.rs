use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{
    dao::{session_store::SessionStore, storage::StorageError},
    state::{
        draw::DrawSource,
        session::{BallNumber, DEFAULT_SESSION_NAME, GameSession, normalize_name},
    },
};

/// Result of asking the engine for the next ball.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    /// A ball was drawn and committed.
    Called {
        /// The ball that was drawn.
        number: BallNumber,
        /// Balls left in the pool afterwards.
        remaining: usize,
    },
    /// Every ball has already been called; nothing changed.
    AlreadyFinished,
}

/// Failures surfaced by engine mutations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The in-memory session advanced but the durable copy is behind it.
    #[error("session changed but could not be saved")]
    Unsynced(#[source] StorageError),
}

/// Sole writer of the game session.
///
/// Every mutation updates the in-memory session, then overwrites the whole
/// durable record before returning.
pub struct GameEngine {
    session: GameSession,
    store: Arc<dyn SessionStore>,
    draw: Box<dyn DrawSource>,
    unsynced: watch::Sender<bool>,
}

impl GameEngine {
    /// Restore the saved session, or start a fresh one when none is usable.
    pub async fn initialize(store: Arc<dyn SessionStore>, draw: Box<dyn DrawSource>) -> Self {
        let restored = match store.read().await {
            Ok(restored) => restored,
            Err(err) => {
                warn!(error = %err, "failed to read saved session; starting fresh");
                None
            }
        };

        let (unsynced, _rx) = watch::channel(false);
        match restored {
            Some(session) => {
                info!(
                    name = %session.name,
                    called = session.called.len(),
                    "restored saved session"
                );
                Self {
                    session,
                    store,
                    draw,
                    unsynced,
                }
            }
            None => {
                info!("no saved session; starting fresh");
                let mut engine = Self {
                    session: GameSession::fresh(DEFAULT_SESSION_NAME),
                    store,
                    draw,
                    unsynced,
                };
                if let Err(err) = engine.persist().await {
                    warn!(error = %err, "fresh session not saved yet");
                }
                engine
            }
        }
    }

    /// Current in-memory session.
    pub fn session(&self) -> &GameSession {
        &self.session
    }

    /// Whether the durable record lags behind the in-memory session.
    pub fn is_unsynced(&self) -> bool {
        *self.unsynced.borrow()
    }

    /// Watch the unsynced flag.
    pub fn subscribe_unsynced(&self) -> watch::Receiver<bool> {
        self.unsynced.subscribe()
    }

    /// Draw one ball uniformly from the remaining pool and commit it.
    pub async fn call_next(&mut self) -> Result<DrawOutcome, EngineError> {
        if self.session.is_finished() {
            debug!("draw requested after the last ball; ignoring");
            return Ok(DrawOutcome::AlreadyFinished);
        }

        let index = self.draw.pick_index(self.session.remaining.len());
        let number = self.session.take_remaining(index);
        let remaining = self.session.remaining.len();
        info!(number, remaining, "called number");

        self.persist().await?;
        Ok(DrawOutcome::Called { number, remaining })
    }

    /// Rename the session; blank input falls back to the default name.
    pub async fn rename(&mut self, raw: &str) -> Result<String, EngineError> {
        self.session.name = normalize_name(raw);
        self.session.touch();
        info!(name = %self.session.name, "renamed session");

        self.persist().await?;
        Ok(self.session.name.clone())
    }

    /// Wipe the saved game and start over, keeping only the session name.
    ///
    /// Confirmation is the caller's job; this runs unconditionally.
    pub async fn reset(&mut self) -> Result<(), EngineError> {
        if let Err(err) = self.store.erase().await {
            warn!(error = %err, "failed to erase saved session before reset");
        }

        self.session = GameSession::fresh(&self.session.name);
        info!(name = %self.session.name, "reset session");

        self.persist().await
    }

    async fn persist(&mut self) -> Result<(), EngineError> {
        match self.store.write(&self.session).await {
            Ok(()) => {
                let recovered = self
                    .unsynced
                    .send_if_modified(|flag| std::mem::replace(flag, false));
                if recovered {
                    info!("session saved again; durable copy is current");
                }
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "failed to save session; durable copy is stale");
                self.unsynced.send_replace(true);
                Err(EngineError::Unsynced(err))
            }
        }
    }
}
