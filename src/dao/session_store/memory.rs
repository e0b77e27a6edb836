use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use futures::future::BoxFuture;
use tokio::sync::{RwLock, watch};

use crate::{
    dao::{
        session_store::{Revision, SessionStore, decode_record, encode_record},
        storage::{StorageError, StorageResult},
    },
    state::session::GameSession,
};

/// Volatile session store holding the encoded document in memory.
///
/// Used for ephemeral runs and tests; writes can be made to fail on demand.
#[derive(Clone)]
pub struct MemorySessionStore {
    document: Arc<RwLock<Option<String>>>,
    fail_writes: Arc<AtomicBool>,
    revision: Arc<Revision>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            document: Arc::new(RwLock::new(None)),
            fail_writes: Arc::new(AtomicBool::new(false)),
            revision: Arc::new(Revision::new()),
        }
    }

    /// Replace the stored document with arbitrary text, bypassing validation.
    pub async fn put_raw(&self, raw: impl Into<String>) {
        *self.document.write().await = Some(raw.into());
        self.revision.bump();
    }

    /// Current stored document, exactly as written.
    pub async fn raw(&self) -> Option<String> {
        self.document.read().await.clone()
    }

    /// Make subsequent writes fail (simulates a full or unavailable disk).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemorySessionStore {
    fn read(&self) -> BoxFuture<'static, StorageResult<Option<GameSession>>> {
        let document = self.document.clone();
        Box::pin(async move {
            let guard = document.read().await;
            Ok(guard.as_deref().and_then(decode_record))
        })
    }

    fn write(&self, session: &GameSession) -> BoxFuture<'static, StorageResult<()>> {
        let encoded = encode_record(session);
        let store = self.clone();
        Box::pin(async move {
            let raw = encoded?;
            if store.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::unavailable(
                    "writing in-memory session",
                    io::Error::new(io::ErrorKind::StorageFull, "quota exceeded"),
                ));
            }
            *store.document.write().await = Some(raw);
            store.revision.bump();
            Ok(())
        })
    }

    fn erase(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.document.write().await.take();
            store.revision.bump();
            Ok(())
        })
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}
