//! Static-asset fallback for clips that were never uploaded.

use bytes::Bytes;
use futures::future::BoxFuture;

use crate::state::session::BallNumber;

/// Asset returned by a successful fallback fetch, before any content check.
#[derive(Debug, Clone)]
pub struct FallbackAsset {
    /// `Content-Type` reported by the asset server (empty when absent).
    pub content_type: String,
    /// Response body.
    pub bytes: Bytes,
}

/// Source of bundled per-number clips at `<assets-root>/audio/<n>.mp3`.
///
/// Implementations return `None` for any failed fetch; whether the asset is
/// really audio is checked by the caller.
pub trait FallbackSource: Send + Sync {
    /// Fetch the bundled asset for `number`, if the server has one.
    fn fetch(&self, number: BallNumber) -> BoxFuture<'static, Option<FallbackAsset>>;
}

/// Relative path of the fallback clip for `number`.
pub fn fallback_path(number: BallNumber) -> String {
    format!("audio/{number}.mp3")
}

/// Accept only media types in the `audio/` family.
pub fn is_audio_content_type(content_type: &str) -> bool {
    content_type
        .trim()
        .to_ascii_lowercase()
        .starts_with("audio/")
}

#[cfg(feature = "http-fallback")]
pub use http::HttpFallback;

#[cfg(feature = "http-fallback")]
mod http {
    use std::sync::Arc;

    use futures::future::BoxFuture;
    use reqwest::{
        Client,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    };
    use tracing::{debug, warn};

    use super::{FallbackAsset, FallbackSource, fallback_path};
    use crate::{dao::storage::StorageError, state::session::BallNumber};

    /// Fetches fallback clips over HTTP from a static asset server.
    #[derive(Clone)]
    pub struct HttpFallback {
        client: Client,
        assets_root: Arc<str>,
    }

    impl HttpFallback {
        /// Build a fetcher rooted at `assets_root` (e.g. `http://localhost:5173/`).
        pub fn new(assets_root: &str) -> Result<Self, StorageError> {
            let client = Client::builder()
                .build()
                .map_err(|err| StorageError::unavailable("building asset client", err))?;
            Ok(Self {
                client,
                assets_root: Arc::from(assets_root.trim_end_matches('/')),
            })
        }

        fn url(&self, number: BallNumber) -> String {
            format!("{}/{}", self.assets_root, fallback_path(number))
        }
    }

    impl FallbackSource for HttpFallback {
        fn fetch(&self, number: BallNumber) -> BoxFuture<'static, Option<FallbackAsset>> {
            let client = self.client.clone();
            let url = self.url(number);
            Box::pin(async move {
                let response = match client.get(&url).header(CACHE_CONTROL, "no-store").send().await
                {
                    Ok(response) => response,
                    Err(err) => {
                        warn!(%url, error = %err, "fallback clip request failed");
                        return None;
                    }
                };

                if !response.status().is_success() {
                    debug!(%url, status = %response.status(), "no fallback clip");
                    return None;
                }

                let content_type = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or_default()
                    .to_string();

                match response.bytes().await {
                    Ok(bytes) => Some(FallbackAsset {
                        content_type,
                        bytes,
                    }),
                    Err(err) => {
                        warn!(%url, error = %err, "failed to read fallback clip body");
                        None
                    }
                }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_audio_media_types_pass() {
        assert!(is_audio_content_type("audio/mpeg"));
        assert!(is_audio_content_type("Audio/MP3"));
        assert!(is_audio_content_type(" audio/wav; charset=binary"));
        assert!(!is_audio_content_type("text/html; charset=utf-8"));
        assert!(!is_audio_content_type("application/octet-stream"));
        assert!(!is_audio_content_type(""));
    }

    #[test]
    fn fallback_paths_follow_the_number() {
        assert_eq!(fallback_path(7), "audio/7.mp3");
        assert_eq!(fallback_path(90), "audio/90.mp3");
    }
}
