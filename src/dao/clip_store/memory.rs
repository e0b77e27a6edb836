use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use futures::future::BoxFuture;

use crate::{
    dao::{
        clip_store::{ClipStore, clip_key},
        storage::StorageResult,
    },
    state::session::BallNumber,
};

/// Volatile clip store for ephemeral runs and tests.
#[derive(Clone, Default)]
pub struct MemoryClipStore {
    clips: Arc<DashMap<String, Bytes>>,
}

impl MemoryClipStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored clips.
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Whether no clip is stored.
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

impl ClipStore for MemoryClipStore {
    fn put(&self, number: BallNumber, clip: Bytes) -> BoxFuture<'static, StorageResult<()>> {
        self.clips.insert(clip_key(number), clip);
        Box::pin(async { Ok(()) })
    }

    fn get(&self, number: BallNumber) -> BoxFuture<'static, StorageResult<Option<Bytes>>> {
        let clip = self
            .clips
            .get(&clip_key(number))
            .map(|entry| entry.value().clone());
        Box::pin(async move { Ok(clip) })
    }

    fn clear(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.clips.clear();
        Box::pin(async { Ok(()) })
    }
}
