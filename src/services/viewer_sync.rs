//! Read-only mirror of the durable session for the viewer screen.
//!
//! The viewer shares nothing with the engine but the store. It re-reads the
//! record whenever the store reports a change and, as a fallback for writes it
//! cannot hear about (another process, a missed notification), on a fixed poll
//! interval. The worst-case staleness is therefore one poll interval.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info};

use crate::{dao::session_store::SessionStore, state::session::GameSession};

/// Poll interval used when the configuration does not override it.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(300);

/// Handle on the background mirror task; dropping it stops the task.
pub struct ViewerSync {
    snapshot: watch::Receiver<Option<GameSession>>,
    task: JoinHandle<()>,
}

impl ViewerSync {
    /// Start mirroring `store`, re-reading at least every `poll_interval`.
    pub fn spawn(store: Arc<dyn SessionStore>, poll_interval: Duration) -> Self {
        let (tx, snapshot) = watch::channel(None);
        let task = tokio::spawn(run(store, poll_interval, tx));
        info!(poll_ms = poll_interval.as_millis() as u64, "viewer sync started");
        Self { snapshot, task }
    }

    /// Subscribe to mirrored snapshots; `None` means no valid session exists.
    pub fn subscribe(&self) -> watch::Receiver<Option<GameSession>> {
        self.snapshot.clone()
    }

    /// Latest mirrored snapshot.
    pub fn current(&self) -> Option<GameSession> {
        self.snapshot.borrow().clone()
    }
}

impl Drop for ViewerSync {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    store: Arc<dyn SessionStore>,
    poll_interval: Duration,
    tx: watch::Sender<Option<GameSession>>,
) {
    let mut changes = Some(store.subscribe());
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = wait_for_change(&mut changes) => {}
        }
        refresh(store.as_ref(), &tx).await;
    }
}

/// Resolve on the next store notification; pend forever once the notifier is gone.
async fn wait_for_change(changes: &mut Option<watch::Receiver<u64>>) {
    let closed = match changes.as_mut() {
        Some(rx) => rx.changed().await.is_err(),
        None => std::future::pending::<bool>().await,
    };
    if closed {
        debug!("store notifier dropped; relying on polling");
        *changes = None;
    }
}

async fn refresh(store: &dyn SessionStore, tx: &watch::Sender<Option<GameSession>>) {
    let next = match store.read().await {
        Ok(next) => next,
        Err(err) => {
            debug!(error = %err, "viewer read failed; keeping last snapshot");
            return;
        }
    };

    tx.send_if_modified(|shown| accept_snapshot(shown, next));
}

/// Replace the shown snapshot unless `next` is identical.
///
/// Reads run one at a time and each returns the latest record, so the mirror
/// only moves forward. Timestamps are not compared: a host clock stepping back
/// must not freeze the viewer.
fn accept_snapshot(shown: &mut Option<GameSession>, next: Option<GameSession>) -> bool {
    if *shown == next {
        return false;
    }
    *shown = next;
    true
}

#[cfg(test)]
mod tests {
    use time::Duration as TimeDuration;
    use tokio::time::timeout;

    use super::*;
    use crate::{
        dao::session_store::{file::FileSessionStore, memory::MemorySessionStore},
        state::session::BALL_COUNT,
    };

    async fn wait_until(
        rx: &mut watch::Receiver<Option<GameSession>>,
        predicate: impl Fn(&Option<GameSession>) -> bool,
    ) {
        timeout(Duration::from_secs(5), rx.wait_for(|snapshot| predicate(snapshot)))
            .await
            .expect("viewer did not converge")
            .expect("viewer task stopped");
    }

    #[tokio::test]
    async fn notifications_are_reflected_without_waiting_for_a_poll() {
        let store = MemorySessionStore::new();
        let viewer = ViewerSync::spawn(Arc::new(store.clone()), Duration::from_secs(3600));
        let mut rx = viewer.subscribe();

        let mut session = GameSession::fresh("order");
        session.take_remaining(10);
        store.write(&session).await.unwrap();

        wait_until(&mut rx, |snapshot| {
            snapshot.as_ref().and_then(|s| s.current) == Some(11)
        })
        .await;
    }

    #[tokio::test]
    async fn polling_picks_up_writes_from_another_process() {
        let dir = tempfile::tempdir().unwrap();
        let host = FileSessionStore::new(dir.path());
        let viewer_store = FileSessionStore::new(dir.path());
        let viewer = ViewerSync::spawn(Arc::new(viewer_store), Duration::from_millis(20));
        let mut rx = viewer.subscribe();

        let mut session = GameSession::fresh("order");
        while !session.is_finished() {
            session.take_remaining(0);
            host.write(&session).await.unwrap();
        }

        wait_until(&mut rx, |snapshot| {
            snapshot
                .as_ref()
                .is_some_and(|s| s.called.len() == BALL_COUNT && s.is_finished())
        })
        .await;
    }

    #[tokio::test]
    async fn invalid_or_missing_records_show_placeholder() {
        let store = MemorySessionStore::new();
        store.put_raw(r#"{"schemaVersion":2}"#).await;
        let viewer = ViewerSync::spawn(Arc::new(store.clone()), Duration::from_millis(20));
        let mut rx = viewer.subscribe();

        store.write(&GameSession::fresh("order")).await.unwrap();
        wait_until(&mut rx, Option::is_some).await;

        store.erase().await.unwrap();
        wait_until(&mut rx, Option::is_none).await;
        assert!(viewer.current().is_none());
    }

    #[tokio::test]
    async fn viewer_never_writes_to_the_store() {
        let store = MemorySessionStore::new();
        let viewer = ViewerSync::spawn(Arc::new(store.clone()), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(60)).await;
        drop(viewer);
        assert!(store.raw().await.is_none());
    }

    #[test]
    fn only_changed_snapshots_are_published() {
        let mut first = GameSession::fresh("order");
        first.take_remaining(0);
        let mut shown = Some(first.clone());
        assert!(!accept_snapshot(&mut shown, Some(first.clone())));

        let mut next = first.clone();
        next.take_remaining(0);
        assert!(accept_snapshot(&mut shown, Some(next.clone())));
        assert_eq!(shown, Some(next));

        assert!(accept_snapshot(&mut shown, None));
        assert!(shown.is_none());
    }

    #[test]
    fn host_clock_stepping_back_does_not_freeze_the_mirror() {
        let mut shown_session = GameSession::fresh("order");
        shown_session.take_remaining(0);
        let mut next = shown_session.clone();
        next.take_remaining(0);
        next.updated_at = shown_session.updated_at - TimeDuration::minutes(10);

        let mut shown = Some(shown_session);
        assert!(accept_snapshot(&mut shown, Some(next.clone())));
        assert_eq!(shown, Some(next));
    }

    #[tokio::test]
    async fn records_written_with_an_earlier_clock_still_reach_the_viewer() {
        let store = MemorySessionStore::new();
        let viewer = ViewerSync::spawn(Arc::new(store.clone()), Duration::from_millis(20));
        let mut rx = viewer.subscribe();

        let mut session = GameSession::fresh("order");
        session.take_remaining(0);
        store.write(&session).await.unwrap();
        wait_until(&mut rx, |snapshot| {
            snapshot.as_ref().is_some_and(|s| s.called.len() == 1)
        })
        .await;

        session.take_remaining(0);
        session.updated_at -= TimeDuration::hours(1);
        store.write(&session).await.unwrap();
        wait_until(&mut rx, |snapshot| {
            snapshot.as_ref().is_some_and(|s| s.called.len() == 2)
        })
        .await;
    }
}
