use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use bytes::Bytes;
use futures::future::BoxFuture;
use tracing::debug;

use crate::{
    dao::{
        atomic::write_atomic,
        clip_store::{ClipStore, clip_key},
        storage::{StorageError, StorageResult},
    },
    state::session::BallNumber,
};

/// Clip store keeping one file per ball under `<data_dir>/clips`.
#[derive(Clone)]
pub struct FileClipStore {
    dir: Arc<PathBuf>,
}

impl FileClipStore {
    /// Store clips inside `<data_dir>/clips`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: Arc::new(data_dir.as_ref().join("clips")),
        }
    }

    fn clip_path(&self, number: BallNumber) -> PathBuf {
        self.dir.join(clip_key(number))
    }
}

impl ClipStore for FileClipStore {
    fn put(&self, number: BallNumber, clip: Bytes) -> BoxFuture<'static, StorageResult<()>> {
        let path = self.clip_path(number);
        Box::pin(async move {
            write_atomic(&path, &clip).await.map_err(|err| {
                StorageError::unavailable(format!("writing clip {}", path.display()), err)
            })?;
            debug!(number, size = clip.len(), "stored clip");
            Ok(())
        })
    }

    fn get(&self, number: BallNumber) -> BoxFuture<'static, StorageResult<Option<Bytes>>> {
        let path = self.clip_path(number);
        Box::pin(async move {
            match tokio::fs::read(&path).await {
                Ok(bytes) => Ok(Some(Bytes::from(bytes))),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
                Err(err) => Err(StorageError::unavailable(
                    format!("reading clip {}", path.display()),
                    err,
                )),
            }
        })
    }

    fn clear(&self) -> BoxFuture<'static, StorageResult<()>> {
        let dir = self.dir.clone();
        Box::pin(async move {
            match tokio::fs::remove_dir_all(dir.as_path()).await {
                Err(err) if err.kind() != ErrorKind::NotFound => Err(StorageError::unavailable(
                    format!("clearing {}", dir.display()),
                    err,
                )),
                _ => Ok(()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn last_write_wins_and_clear_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileClipStore::new(dir.path());

        assert!(store.get(7).await.unwrap().is_none());
        store.put(7, Bytes::from_static(b"old")).await.unwrap();
        store.put(7, Bytes::from_static(b"new")).await.unwrap();
        store.put(8, Bytes::from_static(b"eight")).await.unwrap();
        assert_eq!(store.get(7).await.unwrap().unwrap(), "new");

        store.clear().await.unwrap();
        assert!(store.get(7).await.unwrap().is_none());
        assert!(store.get(8).await.unwrap().is_none());
        store.clear().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn overlapping_uploads_of_one_number_keep_a_whole_clip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileClipStore::new(dir.path());
        let long = Bytes::from(vec![b'A'; 4 * 1024 * 1024]);
        let short = Bytes::from(vec![b'B'; 1024 * 1024]);

        for _ in 0..10 {
            let (first, second) = tokio::join!(
                tokio::spawn(store.put(7, long.clone())),
                tokio::spawn(store.put(7, short.clone())),
            );
            first.unwrap().unwrap();
            second.unwrap().unwrap();

            let stored = store.get(7).await.unwrap().unwrap();
            assert!(stored == long || stored == short, "stored clip mixes two uploads");
        }

        let leftovers = std::fs::read_dir(dir.path().join("clips")).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[tokio::test]
    async fn clips_are_stored_under_their_ball_number() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileClipStore::new(dir.path());
        store.put(42, Bytes::from_static(b"x")).await.unwrap();
        assert!(dir.path().join("clips").join("42").exists());
    }
}
