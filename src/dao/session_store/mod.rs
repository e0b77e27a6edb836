pub mod file;
pub mod memory;

use futures::future::BoxFuture;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::{
    dao::{
        models::SessionRecord,
        storage::{StorageError, StorageResult},
    },
    state::session::GameSession,
};

/// Fixed address of the one live session on this device.
pub const SESSION_KEY: &str = "bingo_host_save_v1";

/// Durable home of the game session, shared by the host and the viewer.
///
/// `read` validates what it finds: missing, unparsable, foreign-version or
/// structurally inconsistent documents all come back as `Ok(None)`.
pub trait SessionStore: Send + Sync {
    /// Load the saved session, if a valid one exists.
    fn read(&self) -> BoxFuture<'static, StorageResult<Option<GameSession>>>;
    /// Overwrite the saved session with `session`.
    fn write(&self, session: &GameSession) -> BoxFuture<'static, StorageResult<()>>;
    /// Delete the saved session.
    fn erase(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Revision counter bumped after every successful write or erase made through this store.
    fn subscribe(&self) -> watch::Receiver<u64>;
}

/// Serialize a session into its durable JSON document.
pub(crate) fn encode_record(session: &GameSession) -> StorageResult<String> {
    serde_json::to_string(&SessionRecord::from(session))
        .map_err(|source| StorageError::Encode { source })
}

/// Parse and validate a raw document, treating anything unusable as absent.
pub(crate) fn decode_record(raw: &str) -> Option<GameSession> {
    if raw.trim().is_empty() {
        return None;
    }

    let record = match serde_json::from_str::<SessionRecord>(raw) {
        Ok(record) => record,
        Err(err) => {
            debug!(error = %err, "persisted session is not a session record; ignoring");
            return None;
        }
    };

    match GameSession::try_from(record) {
        Ok(session) => Some(session),
        Err(err) => {
            warn!(error = %err, "persisted session rejected; treating as absent");
            None
        }
    }
}

/// Change notifier shared by the store implementations.
#[derive(Debug)]
pub(crate) struct Revision {
    tx: watch::Sender<u64>,
}

impl Revision {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx }
    }

    pub(crate) fn bump(&self) {
        self.tx.send_modify(|revision| *revision = revision.wrapping_add(1));
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}
