use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::state::{
    engine::DrawOutcome,
    session::{BallNumber, GameSession},
};

/// Longest accepted session name, in characters.
pub const MAX_SESSION_NAME_LEN: u64 = 80;

/// Session as shown on either screen.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionView {
    /// Session name shown on both screens.
    pub name: String,
    /// Called numbers, earliest first.
    #[schema(value_type = Vec<u8>)]
    pub called: Vec<BallNumber>,
    /// Numbers still in the pool.
    #[schema(value_type = Vec<u8>)]
    pub remaining: Vec<BallNumber>,
    /// Most recent number, absent before the first draw.
    #[schema(value_type = Option<u8>)]
    pub current: Option<BallNumber>,
    /// Last ten numbers, most recent first.
    #[schema(value_type = Vec<u8>)]
    pub recent: Vec<BallNumber>,
    /// RFC 3339 time of the last change.
    pub updated_at: String,
    /// True once every number has been called.
    pub finished: bool,
}

/// Number of past calls shown in the recent strip.
const RECENT_CALLS: usize = 10;

impl From<&GameSession> for SessionView {
    fn from(session: &GameSession) -> Self {
        Self {
            name: session.name.clone(),
            called: session.called.clone(),
            remaining: session.remaining.clone(),
            current: session.current,
            recent: session.called.iter().rev().take(RECENT_CALLS).copied().collect(),
            updated_at: session.updated_at_rfc3339(),
            finished: session.is_finished(),
        }
    }
}

/// Host view of the session, including save status.
#[derive(Debug, Serialize, ToSchema)]
pub struct HostSessionResponse {
    /// The session itself.
    #[serde(flatten)]
    pub session: SessionView,
    /// True while the saved copy lags behind this session.
    pub unsynced: bool,
}

/// Result of `POST /host/draw`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DrawResponse {
    /// A number was called.
    Called {
        #[schema(value_type = u8)]
        number: BallNumber,
        remaining: usize,
    },
    /// Every number had already been called; nothing changed.
    AlreadyFinished,
}

impl From<DrawOutcome> for DrawResponse {
    fn from(outcome: DrawOutcome) -> Self {
        match outcome {
            DrawOutcome::Called { number, remaining } => DrawResponse::Called { number, remaining },
            DrawOutcome::AlreadyFinished => DrawResponse::AlreadyFinished,
        }
    }
}

/// Payload for `PUT /host/session/name`; blank names fall back to the placeholder.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RenameRequest {
    /// New name, at most 80 characters.
    #[validate(length(max = MAX_SESSION_NAME_LEN))]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_calls_are_newest_first_and_capped() {
        let mut session = GameSession::fresh("order");
        for _ in 0..15 {
            session.take_remaining(0);
        }
        let view = SessionView::from(&session);
        assert_eq!(view.recent.len(), RECENT_CALLS);
        assert_eq!(view.recent[0], 15);
        assert_eq!(view.recent[9], 6);
        assert_eq!(view.current, Some(15));
        assert!(!view.finished);
    }

    #[test]
    fn draw_responses_are_tagged_by_outcome() {
        let called = serde_json::to_value(DrawResponse::from(DrawOutcome::Called {
            number: 7,
            remaining: 89,
        }))
        .unwrap();
        assert_eq!(called["outcome"], "called");
        assert_eq!(called["number"], 7);

        let finished = serde_json::to_value(DrawResponse::AlreadyFinished).unwrap();
        assert_eq!(finished, serde_json::json!({ "outcome": "already_finished" }));
    }

    #[test]
    fn overlong_names_fail_validation() {
        let request = RenameRequest {
            name: "x".repeat(MAX_SESSION_NAME_LEN as usize + 1),
        };
        assert!(request.validate().is_err());
        assert!(RenameRequest { name: "   ".into() }.validate().is_ok());
    }
}
