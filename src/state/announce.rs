//! Lifecycle of the "play song" prompt opened after each draw.
//!
//! At most one announcement is open at a time. Opening a new one, or closing
//! the current one, aborts its pending availability check and releases any
//! playback it still holds. Async work (the availability check, resolving the
//! clip) runs outside the lock and reports back with the generation it was
//! started for; results for a replaced announcement are discarded.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    services::clip_service::{Availability, ResolvedClip},
    state::session::BallNumber,
};

/// Shown when a clip was found but could not be played.
pub const PLAYBACK_FAILED_MESSAGE: &str = "Audio failed to play. Try re-exporting the mp3.";

/// Guidance shown when no clip exists for `number`.
pub fn missing_clip_guidance(number: BallNumber) -> String {
    format!("Upload {number}.mp3 using Upload Song Clips")
}

/// Whether a clip exists for the announced number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClipAvailability {
    /// No check has run.
    Unknown,
    /// A check is in flight.
    Checking,
    /// A playable clip exists.
    Found,
    /// Nothing to play.
    Missing,
}

/// Playback state of the announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    /// Ready to play.
    Idle,
    /// Clip is being resolved and started.
    Loading,
    /// Clip is playing.
    Playing,
    /// The last attempt failed.
    Error,
}

/// Errors raised by announcement operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnnounceError {
    /// No announcement is open.
    #[error("no announcement is open")]
    NotOpen,
    /// Playback is loading or already running.
    #[error("playback already in progress")]
    Busy,
    /// No clip exists for the number.
    #[error("Upload {number}.mp3 using Upload Song Clips")]
    ClipMissing {
        /// Number without a clip.
        number: BallNumber,
    },
    /// The announcement was closed or replaced while work was in flight.
    #[error("announcement was closed or replaced")]
    Superseded,
    /// The lease does not belong to the current playback.
    #[error("unknown playback lease {0}")]
    UnknownLease(Uuid),
    /// The player could not start the clip.
    #[error("player failed: {0}")]
    Player(String),
}

/// Handle on a started clip; dropping it releases the clip.
pub struct PlaybackLease {
    id: Uuid,
    release: Option<Box<dyn FnOnce(Uuid) + Send>>,
}

impl PlaybackLease {
    /// Create a lease whose `release` runs exactly once, when it is dropped.
    pub fn new(release: impl FnOnce(Uuid) + Send + 'static) -> Self {
        Self {
            id: Uuid::new_v4(),
            release: Some(Box::new(release)),
        }
    }

    /// Token identifying this playback.
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl fmt::Debug for PlaybackLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackLease").field("id", &self.id).finish()
    }
}

impl Drop for PlaybackLease {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release(self.id);
        }
    }
}

/// Something that can start a resolved clip.
pub trait ClipPlayer: Send + Sync {
    /// Start `clip`; the returned lease keeps it alive until dropped.
    fn start(&self, clip: ResolvedClip) -> Result<PlaybackLease, AnnounceError>;
}

/// Read-only view of the announcement for clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AnnouncementView {
    /// Whether an announcement is open.
    pub open: bool,
    /// Announced number.
    #[schema(value_type = Option<u8>)]
    pub number: Option<BallNumber>,
    /// Clip availability.
    pub availability: ClipAvailability,
    /// Playback status.
    pub status: PlaybackStatus,
    /// Lease of the running playback.
    pub lease: Option<Uuid>,
    /// Text to show under the prompt.
    pub message: Option<String>,
}

struct Announcement {
    generation: u64,
    number: BallNumber,
    availability: ClipAvailability,
    status: PlaybackStatus,
    lease: Option<PlaybackLease>,
    check: Option<AbortHandle>,
}

impl Announcement {
    fn message(&self) -> Option<String> {
        if self.status == PlaybackStatus::Error {
            return Some(PLAYBACK_FAILED_MESSAGE.to_string());
        }
        match self.availability {
            ClipAvailability::Found => Some(format!("Ready to play {}.mp3", self.number)),
            ClipAvailability::Missing => Some(missing_clip_guidance(self.number)),
            ClipAvailability::Unknown | ClipAvailability::Checking => None,
        }
    }
}

/// Owner of the single open announcement.
#[derive(Default)]
pub struct Announcer {
    active: Option<Announcement>,
    generation: u64,
}

impl Announcer {
    /// Start with nothing open.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the prompt for `number`, replacing any open one.
    ///
    /// Returns the generation the availability check must report with.
    pub fn open(&mut self, number: BallNumber) -> u64 {
        self.close();
        self.generation = self.generation.wrapping_add(1);
        self.active = Some(Announcement {
            generation: self.generation,
            number,
            availability: ClipAvailability::Checking,
            status: PlaybackStatus::Idle,
            lease: None,
            check: None,
        });
        info!(number, "announcement opened");
        self.generation
    }

    /// Remember the availability check task so it can be aborted.
    pub fn track_check(&mut self, generation: u64, check: AbortHandle) {
        match self.active_for(generation) {
            Some(active) => active.check = Some(check),
            None => check.abort(),
        }
    }

    /// Record the result of an availability check; stale results are ignored.
    pub fn complete_check(&mut self, generation: u64, availability: Availability) -> bool {
        let Some(active) = self.active_for(generation) else {
            debug!(generation, "discarding stale availability check");
            return false;
        };
        active.check = None;
        active.availability = match availability {
            Availability::Found(_) => ClipAvailability::Found,
            Availability::Missing => ClipAvailability::Missing,
        };
        true
    }

    /// Move to `Loading` and release any previous playback.
    ///
    /// Returns the generation and number the caller must resolve.
    pub fn begin_playback(&mut self) -> Result<(u64, BallNumber), AnnounceError> {
        let active = self.active.as_mut().ok_or(AnnounceError::NotOpen)?;
        if matches!(
            active.status,
            PlaybackStatus::Loading | PlaybackStatus::Playing
        ) {
            return Err(AnnounceError::Busy);
        }
        if active.availability == ClipAvailability::Missing {
            return Err(AnnounceError::ClipMissing {
                number: active.number,
            });
        }

        active.lease = None;
        active.status = PlaybackStatus::Loading;
        Ok((active.generation, active.number))
    }

    /// Record how starting playback went.
    ///
    /// A lease for a replaced announcement is dropped, which releases it.
    pub fn playback_started(
        &mut self,
        generation: u64,
        started: Result<PlaybackLease, AnnounceError>,
    ) -> Result<Uuid, AnnounceError> {
        let Some(active) = self.active_for(generation) else {
            return Err(AnnounceError::Superseded);
        };

        match started {
            Ok(lease) => {
                let id = lease.id();
                info!(number = active.number, lease = %id, "playback started");
                active.lease = Some(lease);
                active.status = PlaybackStatus::Playing;
                Ok(id)
            }
            Err(err @ AnnounceError::ClipMissing { .. }) => {
                active.availability = ClipAvailability::Missing;
                active.status = PlaybackStatus::Idle;
                Err(err)
            }
            Err(err) => {
                warn!(number = active.number, error = %err, "playback failed to start");
                active.status = PlaybackStatus::Error;
                Err(err)
            }
        }
    }

    /// Playback of `lease` ended, successfully or not.
    pub fn finish(&mut self, lease: Uuid, ok: bool) -> Result<(), AnnounceError> {
        let active = self.active.as_mut().ok_or(AnnounceError::NotOpen)?;
        if active.lease.as_ref().map(PlaybackLease::id) != Some(lease) {
            return Err(AnnounceError::UnknownLease(lease));
        }

        active.lease = None;
        active.status = if ok {
            PlaybackStatus::Idle
        } else {
            warn!(number = active.number, "clip failed during playback");
            PlaybackStatus::Error
        };
        Ok(())
    }

    /// Close the prompt, stopping playback and any pending check.
    pub fn close(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        if let Some(check) = active.check.take() {
            check.abort();
        }
        drop(active.lease.take());
        info!(number = active.number, "announcement closed");
    }

    /// Current view for clients.
    pub fn view(&self) -> AnnouncementView {
        match &self.active {
            Some(active) => AnnouncementView {
                open: true,
                number: Some(active.number),
                availability: active.availability,
                status: active.status,
                lease: active.lease.as_ref().map(PlaybackLease::id),
                message: active.message(),
            },
            None => AnnouncementView {
                open: false,
                number: None,
                availability: ClipAvailability::Unknown,
                status: PlaybackStatus::Idle,
                lease: None,
                message: None,
            },
        }
    }

    fn active_for(&mut self, generation: u64) -> Option<&mut Announcement> {
        self.active
            .as_mut()
            .filter(|active| active.generation == generation)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::services::clip_service::ClipSource;

    fn counting_lease(released: &Arc<AtomicUsize>) -> PlaybackLease {
        let released = released.clone();
        PlaybackLease::new(move |_| {
            released.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn opened_and_found(announcer: &mut Announcer, number: BallNumber) -> u64 {
        let generation = announcer.open(number);
        assert!(announcer.complete_check(generation, Availability::Found(ClipSource::Uploaded)));
        generation
    }

    #[test]
    fn open_starts_checking_and_reports_found() {
        let mut announcer = Announcer::new();
        let generation = announcer.open(12);
        assert_eq!(announcer.view().availability, ClipAvailability::Checking);

        announcer.complete_check(generation, Availability::Found(ClipSource::Fallback));
        let view = announcer.view();
        assert_eq!(view.availability, ClipAvailability::Found);
        assert_eq!(view.message.as_deref(), Some("Ready to play 12.mp3"));
    }

    #[test]
    fn stale_checks_are_discarded() {
        let mut announcer = Announcer::new();
        let first = announcer.open(3);
        let second = announcer.open(4);

        assert!(!announcer.complete_check(first, Availability::Missing));
        assert_eq!(announcer.view().availability, ClipAvailability::Checking);
        assert!(announcer.complete_check(second, Availability::Missing));
        assert_eq!(
            announcer.view().message.as_deref(),
            Some("Upload 4.mp3 using Upload Song Clips")
        );
    }

    #[test]
    fn missing_clips_cannot_be_played() {
        let mut announcer = Announcer::new();
        let generation = announcer.open(36);
        announcer.complete_check(generation, Availability::Missing);

        assert_eq!(
            announcer.begin_playback(),
            Err(AnnounceError::ClipMissing { number: 36 })
        );
        assert_eq!(announcer.view().status, PlaybackStatus::Idle);
    }

    #[test]
    fn playback_is_exclusive_while_loading_or_playing() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut announcer = Announcer::new();
        opened_and_found(&mut announcer, 8);

        let (generation, number) = announcer.begin_playback().unwrap();
        assert_eq!(number, 8);
        assert_eq!(announcer.begin_playback(), Err(AnnounceError::Busy));

        announcer
            .playback_started(generation, Ok(counting_lease(&released)))
            .unwrap();
        assert_eq!(announcer.view().status, PlaybackStatus::Playing);
        assert_eq!(announcer.begin_playback(), Err(AnnounceError::Busy));
        assert_eq!(released.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn finishing_releases_the_lease() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut announcer = Announcer::new();
        opened_and_found(&mut announcer, 8);
        let (generation, _) = announcer.begin_playback().unwrap();
        let lease = announcer
            .playback_started(generation, Ok(counting_lease(&released)))
            .unwrap();

        let stranger = Uuid::new_v4();
        assert_eq!(
            announcer.finish(stranger, true),
            Err(AnnounceError::UnknownLease(stranger))
        );
        assert_eq!(released.load(Ordering::SeqCst), 0);

        announcer.finish(lease, true).unwrap();
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert_eq!(announcer.view().status, PlaybackStatus::Idle);
        assert_eq!(announcer.view().lease, None);
    }

    #[test]
    fn playback_errors_surface_the_failure_message() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut announcer = Announcer::new();
        opened_and_found(&mut announcer, 9);
        let (generation, _) = announcer.begin_playback().unwrap();
        let lease = announcer
            .playback_started(generation, Ok(counting_lease(&released)))
            .unwrap();

        announcer.finish(lease, false).unwrap();
        let view = announcer.view();
        assert_eq!(view.status, PlaybackStatus::Error);
        assert_eq!(view.message.as_deref(), Some(PLAYBACK_FAILED_MESSAGE));
        assert_eq!(released.load(Ordering::SeqCst), 1);

        let (generation, _) = announcer.begin_playback().unwrap();
        let err = announcer
            .playback_started(generation, Err(AnnounceError::Player("decoder".into())))
            .unwrap_err();
        assert_eq!(err, AnnounceError::Player("decoder".into()));
        assert_eq!(announcer.view().status, PlaybackStatus::Error);
    }

    #[test]
    fn missing_clip_at_play_time_marks_availability() {
        let mut announcer = Announcer::new();
        opened_and_found(&mut announcer, 20);
        let (generation, number) = announcer.begin_playback().unwrap();

        announcer
            .playback_started(generation, Err(AnnounceError::ClipMissing { number }))
            .unwrap_err();
        let view = announcer.view();
        assert_eq!(view.availability, ClipAvailability::Missing);
        assert_eq!(view.status, PlaybackStatus::Idle);
    }

    #[test]
    fn leases_for_replaced_announcements_are_released() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut announcer = Announcer::new();
        opened_and_found(&mut announcer, 1);
        let (generation, _) = announcer.begin_playback().unwrap();
        announcer.close();

        assert_eq!(
            announcer.playback_started(generation, Ok(counting_lease(&released))),
            Err(AnnounceError::Superseded)
        );
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn close_and_reopen_release_playback() {
        let released = Arc::new(AtomicUsize::new(0));
        let mut announcer = Announcer::new();

        opened_and_found(&mut announcer, 5);
        let (generation, _) = announcer.begin_playback().unwrap();
        announcer
            .playback_started(generation, Ok(counting_lease(&released)))
            .unwrap();
        announcer.open(6);
        assert_eq!(released.load(Ordering::SeqCst), 1);

        opened_and_found(&mut announcer, 7);
        let (generation, _) = announcer.begin_playback().unwrap();
        announcer
            .playback_started(generation, Ok(counting_lease(&released)))
            .unwrap();
        announcer.close();
        assert_eq!(released.load(Ordering::SeqCst), 2);
        assert!(!announcer.view().open);
        assert_eq!(announcer.finish(Uuid::new_v4(), true), Err(AnnounceError::NotOpen));
    }

    #[tokio::test]
    async fn reopening_aborts_the_pending_check() {
        let mut announcer = Announcer::new();
        let generation = announcer.open(10);
        let check = tokio::spawn(std::future::pending::<()>());
        announcer.track_check(generation, check.abort_handle());

        announcer.open(11);
        assert!(check.await.unwrap_err().is_cancelled());

        let late = tokio::spawn(std::future::pending::<()>());
        announcer.track_check(generation, late.abort_handle());
        assert!(late.await.unwrap_err().is_cancelled());
    }
}
