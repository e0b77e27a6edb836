//! Clip upload and number→audio resolution.
//!
//! Resolution precedence:
//!
//! 1. **Uploaded clip** in the clip store
//! 2. **Fallback asset** at `<assets-root>/audio/<n>.mp3`, only when the server
//!    labels it as audio
//! 3. **Missing**: the host is asked to upload the clip

use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};

use crate::{
    dao::{
        clip_store::ClipStore,
        fallback::{FallbackSource, is_audio_content_type},
        storage::StorageResult,
    },
    state::session::{BallNumber, is_ball},
};

/// Content type served for uploaded clips.
pub const UPLOADED_CLIP_CONTENT_TYPE: &str = "audio/mpeg";

/// Where a resolved clip came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipSource {
    /// Uploaded by the host.
    Uploaded,
    /// Bundled static asset.
    Fallback,
}

/// Playable clip for one ball.
#[derive(Debug, Clone)]
pub struct ResolvedClip {
    /// Ball the clip announces.
    pub number: BallNumber,
    /// Origin of the clip.
    pub source: ClipSource,
    /// Media type to serve the bytes with.
    pub content_type: String,
    /// Audio payload.
    pub bytes: Bytes,
}

/// Outcome of resolving a ball number to audio.
#[derive(Debug, Clone)]
pub enum ClipResolution {
    /// A playable clip exists.
    Found(ResolvedClip),
    /// Neither an upload nor a valid fallback exists.
    Missing,
}

/// Lightweight availability answer for the announcement prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// A clip can be played, from the given source.
    Found(ClipSource),
    /// Nothing playable for this number.
    Missing,
}

/// Resolves ball numbers to audio following the precedence above.
#[derive(Clone)]
pub struct ClipResolver {
    clips: Arc<dyn ClipStore>,
    fallback: Option<Arc<dyn FallbackSource>>,
}

impl ClipResolver {
    /// Build a resolver; without a fallback only uploaded clips are found.
    pub fn new(clips: Arc<dyn ClipStore>, fallback: Option<Arc<dyn FallbackSource>>) -> Self {
        Self { clips, fallback }
    }

    /// Resolve `number` to a playable clip.
    pub async fn resolve(&self, number: BallNumber) -> ClipResolution {
        match self.clips.get(number).await {
            Ok(Some(bytes)) => {
                return ClipResolution::Found(ResolvedClip {
                    number,
                    source: ClipSource::Uploaded,
                    content_type: UPLOADED_CLIP_CONTENT_TYPE.to_string(),
                    bytes,
                });
            }
            Ok(None) => {}
            Err(err) => warn!(number, error = %err, "clip store lookup failed; trying fallback"),
        }

        let Some(fallback) = &self.fallback else {
            return ClipResolution::Missing;
        };

        match fallback.fetch(number).await {
            Some(asset) if is_audio_content_type(&asset.content_type) => {
                ClipResolution::Found(ResolvedClip {
                    number,
                    source: ClipSource::Fallback,
                    content_type: asset.content_type,
                    bytes: asset.bytes,
                })
            }
            Some(asset) => {
                warn!(
                    number,
                    content_type = %asset.content_type,
                    "fallback asset is not audio; treating as missing"
                );
                ClipResolution::Missing
            }
            None => ClipResolution::Missing,
        }
    }

    /// Check whether `number` has a playable clip.
    pub async fn availability(&self, number: BallNumber) -> Availability {
        match self.resolve(number).await {
            ClipResolution::Found(clip) => Availability::Found(clip.source),
            ClipResolution::Missing => Availability::Missing,
        }
    }
}

/// File picked by the host for upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Original file name, used to find the ball number.
    pub name: String,
    /// File contents.
    pub bytes: Bytes,
}

/// Counts of accepted and skipped files in one upload batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// Files stored as clips.
    pub saved: usize,
    /// Files whose name did not yield a ball number.
    pub skipped: usize,
}

impl UploadReport {
    /// Human readable summary shown next to the upload button.
    pub fn message(&self) -> String {
        let mut message = if self.saved > 0 {
            format!("Uploaded {} clip(s).", self.saved)
        } else {
            "No valid files found (name them 1.mp3 ... 90.mp3).".to_string()
        };
        if self.skipped > 0 {
            message.push_str(&format!(" Skipped {}.", self.skipped));
        }
        message
    }
}

/// Store every file whose name starts with a ball number, skipping the rest.
///
/// Stops at the first storage failure; clips stored before it are kept.
pub async fn import_clips(
    clips: &dyn ClipStore,
    files: impl IntoIterator<Item = UploadedFile>,
) -> StorageResult<UploadReport> {
    let mut report = UploadReport::default();
    for file in files {
        let Some(number) = parse_ball_number(&file.name) else {
            report.skipped += 1;
            continue;
        };
        clips.put(number, file.bytes).await?;
        report.saved += 1;
    }

    info!(saved = report.saved, skipped = report.skipped, "imported clips");
    Ok(report)
}

/// Extract the ball number from names like `36.mp3` or `7 sample.mp3`.
///
/// The name must start with one or two digits that are not followed by another
/// letter, digit or underscore, and the value must be a valid ball.
pub fn parse_ball_number(file_name: &str) -> Option<BallNumber> {
    let digits = file_name
        .bytes()
        .take_while(|byte| byte.is_ascii_digit())
        .count();
    if !(1..=2).contains(&digits) {
        return None;
    }

    let boundary = file_name[digits..]
        .chars()
        .next()
        .is_none_or(|next| !(next.is_ascii_alphanumeric() || next == '_'));
    if !boundary {
        return None;
    }

    file_name[..digits]
        .parse::<BallNumber>()
        .ok()
        .filter(|number| is_ball(*number))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use futures::future::BoxFuture;

    use super::*;
    use crate::dao::{clip_store::memory::MemoryClipStore, fallback::FallbackAsset};

    #[derive(Default)]
    struct StubFallback {
        assets: HashMap<BallNumber, FallbackAsset>,
    }

    impl StubFallback {
        fn with(mut self, number: BallNumber, content_type: &str, body: &'static [u8]) -> Self {
            self.assets.insert(
                number,
                FallbackAsset {
                    content_type: content_type.to_string(),
                    bytes: Bytes::from_static(body),
                },
            );
            self
        }
    }

    impl FallbackSource for StubFallback {
        fn fetch(&self, number: BallNumber) -> BoxFuture<'static, Option<FallbackAsset>> {
            let asset = self.assets.get(&number).cloned();
            Box::pin(async move { asset })
        }
    }

    fn file(name: &str) -> UploadedFile {
        UploadedFile {
            name: name.to_string(),
            bytes: Bytes::from(name.to_string()),
        }
    }

    #[test]
    fn parses_leading_ball_numbers() {
        assert_eq!(parse_ball_number("7 sample.mp3"), Some(7));
        assert_eq!(parse_ball_number("36.mp3"), Some(36));
        assert_eq!(parse_ball_number("09-intro.mp3"), Some(9));
        assert_eq!(parse_ball_number("90"), Some(90));
    }

    #[test]
    fn rejects_names_without_a_valid_ball() {
        assert_eq!(parse_ball_number("91.mp3"), None);
        assert_eq!(parse_ball_number("0.mp3"), None);
        assert_eq!(parse_ball_number("song.mp3"), None);
        assert_eq!(parse_ball_number("123.mp3"), None);
        assert_eq!(parse_ball_number("7a.mp3"), None);
        assert_eq!(parse_ball_number("7_take2.mp3"), None);
        assert_eq!(parse_ball_number(""), None);
    }

    #[tokio::test]
    async fn import_counts_saved_and_skipped_files() {
        let store = MemoryClipStore::new();
        assert!(store.is_empty());
        let report = import_clips(
            &store,
            [file("7 sample.mp3"), file("91.mp3"), file("song.mp3"), file("12.mp3")],
        )
        .await
        .unwrap();

        assert_eq!(report, UploadReport { saved: 2, skipped: 2 });
        assert_eq!(store.len(), 2);
        assert_eq!(report.message(), "Uploaded 2 clip(s). Skipped 2.");
        assert_eq!(store.get(7).await.unwrap().unwrap(), "7 sample.mp3");
        assert!(store.get(91).await.unwrap().is_none());
    }

    #[test]
    fn empty_batches_explain_the_naming_rule() {
        let report = UploadReport { saved: 0, skipped: 1 };
        assert_eq!(
            report.message(),
            "No valid files found (name them 1.mp3 ... 90.mp3). Skipped 1."
        );
    }

    #[tokio::test]
    async fn uploaded_clips_win_over_fallback_assets() {
        let store = MemoryClipStore::new();
        store.put(5, Bytes::from_static(b"uploaded")).await.unwrap();
        let fallback = StubFallback::default().with(5, "audio/mpeg", b"bundled");
        let resolver = ClipResolver::new(Arc::new(store), Some(Arc::new(fallback)));

        match resolver.resolve(5).await {
            ClipResolution::Found(clip) => {
                assert_eq!(clip.source, ClipSource::Uploaded);
                assert_eq!(clip.bytes, "uploaded");
            }
            ClipResolution::Missing => panic!("expected uploaded clip"),
        }
    }

    #[tokio::test]
    async fn audio_fallbacks_are_used_when_nothing_was_uploaded() {
        let fallback = StubFallback::default().with(6, "audio/mpeg", b"bundled");
        let resolver = ClipResolver::new(Arc::new(MemoryClipStore::new()), Some(Arc::new(fallback)));

        match resolver.resolve(6).await {
            ClipResolution::Found(clip) => {
                assert_eq!(clip.source, ClipSource::Fallback);
                assert_eq!(clip.content_type, "audio/mpeg");
            }
            ClipResolution::Missing => panic!("expected fallback clip"),
        }
    }

    #[tokio::test]
    async fn non_audio_fallbacks_count_as_missing() {
        let fallback = StubFallback::default().with(8, "text/html", b"<html>index</html>");
        let resolver = ClipResolver::new(Arc::new(MemoryClipStore::new()), Some(Arc::new(fallback)));

        assert_eq!(resolver.availability(8).await, Availability::Missing);
        assert_eq!(resolver.availability(9).await, Availability::Missing);
    }

    #[tokio::test]
    async fn without_fallback_only_uploads_resolve() {
        let store = MemoryClipStore::new();
        store.put(1, Bytes::from_static(b"one")).await.unwrap();
        let resolver = ClipResolver::new(Arc::new(store), None);

        assert_eq!(
            resolver.availability(1).await,
            Availability::Found(ClipSource::Uploaded)
        );
        assert_eq!(resolver.availability(2).await, Availability::Missing);
    }
}
