pub mod file;
pub mod memory;

use bytes::Bytes;
use futures::future::BoxFuture;

use crate::{dao::storage::StorageResult, state::session::BallNumber};

/// Durable store of uploaded audio clips keyed by ball number.
///
/// Independent from the game session: clips survive resets and the last upload
/// for a number wins.
pub trait ClipStore: Send + Sync {
    /// Store `clip` for `number`, replacing any previous upload.
    fn put(&self, number: BallNumber, clip: Bytes) -> BoxFuture<'static, StorageResult<()>>;
    /// Uploaded clip for `number`, if any.
    fn get(&self, number: BallNumber) -> BoxFuture<'static, StorageResult<Option<Bytes>>>;
    /// Remove every uploaded clip.
    fn clear(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// External key of a clip: the decimal ball number ("1".."90").
pub fn clip_key(number: BallNumber) -> String {
    number.to_string()
}
