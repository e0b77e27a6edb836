use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    dto::sse::{PlayEvent, ServerEvent, StopEvent},
    error::ServiceError,
    services::clip_service::{ClipResolution, ResolvedClip},
    state::{
        SharedState, SseHub,
        announce::{AnnounceError, AnnouncementView, ClipPlayer, PlaybackLease},
        session::BallNumber,
    },
};

/// SSE event name for announcement view changes.
pub const ANNOUNCE_EVENT: &str = "announce";
/// SSE event name telling the host screen to play a clip.
pub const PLAY_EVENT: &str = "play";
/// SSE event name telling the host screen to stop a clip.
pub const STOP_EVENT: &str = "stop";

/// Plays clips on the host screen by relaying them over the host SSE stream.
///
/// Each started clip is parked under its lease id and served from
/// `/host/announce/clip/{lease}` until the lease is dropped.
#[derive(Clone)]
pub struct RelayPlayer {
    clips: Arc<DashMap<Uuid, ResolvedClip>>,
    hub: SseHub,
}

impl RelayPlayer {
    /// Relay clips through `hub`.
    pub fn new(hub: SseHub) -> Self {
        Self {
            clips: Arc::new(DashMap::new()),
            hub,
        }
    }

    /// Clip parked under `lease`, if it is still playing.
    pub fn clip(&self, lease: Uuid) -> Option<ResolvedClip> {
        self.clips.get(&lease).map(|entry| entry.value().clone())
    }

    /// Number of clips currently parked.
    pub fn active(&self) -> usize {
        self.clips.len()
    }
}

impl ClipPlayer for RelayPlayer {
    fn start(&self, clip: ResolvedClip) -> Result<PlaybackLease, AnnounceError> {
        let clips = self.clips.clone();
        let hub = self.hub.clone();
        let lease = PlaybackLease::new(move |id| {
            if clips.remove(&id).is_some() {
                debug!(lease = %id, "released relayed clip");
            }
            match ServerEvent::json(STOP_EVENT.to_string(), &StopEvent { lease: id }) {
                Ok(event) => hub.broadcast(event),
                Err(err) => warn!(error = %err, "failed to encode stop event"),
            }
        });

        let id = lease.id();
        let play = PlayEvent {
            lease: id,
            number: clip.number,
            source: clip.source.into(),
            url: format!("/host/announce/clip/{id}"),
        };
        let event = ServerEvent::json(PLAY_EVENT.to_string(), &play)
            .map_err(|err| AnnounceError::Player(err.to_string()))?;

        self.clips.insert(id, clip);
        self.hub.broadcast(event);
        Ok(lease)
    }
}

/// Current announcement view.
pub async fn current(state: &SharedState) -> AnnouncementView {
    state.announcer().lock().await.view()
}

/// Open the prompt for `number` and start checking for its clip in the background.
pub async fn open(state: &SharedState, number: BallNumber) -> AnnouncementView {
    let mut announcer = state.announcer().lock().await;
    let generation = announcer.open(number);

    let task_state = state.clone();
    let check = tokio::spawn(async move {
        let availability = task_state.resolver().availability(number).await;
        let view = {
            let mut announcer = task_state.announcer().lock().await;
            if !announcer.complete_check(generation, availability) {
                return;
            }
            announcer.view()
        };
        publish(&task_state, &view);
    });
    // The check cannot finish before this runs: it needs the lock held here.
    announcer.track_check(generation, check.abort_handle());

    let view = announcer.view();
    drop(announcer);
    publish(state, &view);
    view
}

/// Resolve and start the clip for the open announcement.
pub async fn play(state: &SharedState) -> Result<AnnouncementView, ServiceError> {
    let (generation, number) = state.announcer().lock().await.begin_playback()?;
    publish(state, &current(state).await);

    let started = match state.resolver().resolve(number).await {
        ClipResolution::Found(clip) => state.player().start(clip),
        ClipResolution::Missing => Err(AnnounceError::ClipMissing { number }),
    };

    let (outcome, view) = {
        let mut announcer = state.announcer().lock().await;
        let outcome = announcer.playback_started(generation, started);
        (outcome, announcer.view())
    };
    publish(state, &view);

    outcome?;
    Ok(view)
}

/// Report that playback of `lease` ended, with or without an error.
pub async fn ended(
    state: &SharedState,
    lease: Uuid,
    failed: bool,
) -> Result<AnnouncementView, ServiceError> {
    let view = {
        let mut announcer = state.announcer().lock().await;
        announcer.finish(lease, !failed)?;
        announcer.view()
    };
    publish(state, &view);
    Ok(view)
}

/// Close the prompt, stopping playback and any pending check.
pub async fn close(state: &SharedState) -> AnnouncementView {
    let view = {
        let mut announcer = state.announcer().lock().await;
        announcer.close();
        announcer.view()
    };
    publish(state, &view);
    view
}

/// Clip bytes for a live lease.
pub fn relayed_clip(state: &SharedState, lease: Uuid) -> Result<ResolvedClip, ServiceError> {
    state
        .player()
        .clip(lease)
        .ok_or_else(|| ServiceError::NotFound(format!("no clip is playing under {lease}")))
}

fn publish(state: &SharedState, view: &AnnouncementView) {
    match ServerEvent::json(ANNOUNCE_EVENT.to_string(), view) {
        Ok(event) => state.host_sse().broadcast(event),
        Err(err) => warn!(error = %err, "failed to encode announcement event"),
    }
}
