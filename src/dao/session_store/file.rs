use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::future::BoxFuture;
use tokio::sync::watch;

use crate::{
    dao::{
        atomic::{remove_if_exists, write_atomic},
        session_store::{Revision, SESSION_KEY, SessionStore, decode_record, encode_record},
        storage::{StorageError, StorageResult},
    },
    state::session::GameSession,
};

/// Session store backed by a single JSON file inside the data directory.
///
/// Separate processes pointing at the same directory see each other's writes;
/// change notifications only reach subscribers of the same instance.
#[derive(Clone)]
pub struct FileSessionStore {
    path: Arc<PathBuf>,
    revision: Arc<Revision>,
}

impl FileSessionStore {
    /// Store the session at `<data_dir>/bingo_host_save_v1.json`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let path = data_dir.as_ref().join(format!("{SESSION_KEY}.json"));
        Self {
            path: Arc::new(path),
            revision: Arc::new(Revision::new()),
        }
    }

    /// Location of the session document.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn read(&self) -> BoxFuture<'static, StorageResult<Option<GameSession>>> {
        let path = self.path.clone();
        Box::pin(async move {
            match tokio::fs::read_to_string(path.as_path()).await {
                Ok(raw) => Ok(decode_record(&raw)),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
                // Non UTF-8 content is a corrupt document, not an unavailable store.
                Err(err) if err.kind() == ErrorKind::InvalidData => Ok(None),
                Err(err) => Err(StorageError::unavailable(
                    format!("reading {}", path.display()),
                    err,
                )),
            }
        })
    }

    fn write(&self, session: &GameSession) -> BoxFuture<'static, StorageResult<()>> {
        let encoded = encode_record(session);
        let path = self.path.clone();
        let revision = self.revision.clone();
        Box::pin(async move {
            let raw = encoded?;
            write_atomic(&path, raw.as_bytes()).await.map_err(|err| {
                StorageError::unavailable(format!("writing {}", path.display()), err)
            })?;
            revision.bump();
            Ok(())
        })
    }

    fn erase(&self) -> BoxFuture<'static, StorageResult<()>> {
        let path = self.path.clone();
        let revision = self.revision.clone();
        Box::pin(async move {
            remove_if_exists(&path).await.map_err(|err| {
                StorageError::unavailable(format!("removing {}", path.display()), err)
            })?;
            revision.bump();
            Ok(())
        })
    }

    fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        assert!(store.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        let mut session = GameSession::fresh("order");
        session.take_remaining(20);
        session.take_remaining(0);

        store.write(&session).await.unwrap();

        let other_process = FileSessionStore::new(dir.path());
        assert_eq!(other_process.read().await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn erase_removes_the_document_and_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        let rx = store.subscribe();

        store.write(&GameSession::fresh("order")).await.unwrap();
        store.erase().await.unwrap();
        store.erase().await.unwrap();

        assert!(!store.path().exists());
        assert!(store.read().await.unwrap().is_none());
        assert_eq!(*rx.borrow(), 3);
    }

    #[tokio::test]
    async fn wrong_version_on_disk_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        store.write(&GameSession::fresh("order")).await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        std::fs::write(
            store.path(),
            raw.replace("\"schemaVersion\":1", "\"schemaVersion\":7"),
        )
        .unwrap();

        assert!(store.read().await.unwrap().is_none());
    }
}
