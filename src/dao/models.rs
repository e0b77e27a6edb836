use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::state::session::{BallNumber, GameSession, InvariantViolation};

/// Only schema version this build reads and writes.
pub const SCHEMA_VERSION: u32 = 1;

/// Durable JSON document holding the live session of this device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Layout version of the document; anything but [`SCHEMA_VERSION`] is ignored.
    pub schema_version: u32,
    /// Display name of the session.
    pub session_name: String,
    /// Called balls in call order.
    pub called_numbers: Vec<BallNumber>,
    /// Balls not yet called.
    pub remaining_numbers: Vec<BallNumber>,
    /// Last called ball, `null` before the first draw.
    pub current_number: Option<BallNumber>,
    /// RFC 3339 timestamp of the last mutation.
    pub last_updated: String,
}

/// Reasons a persisted record is not trusted.
#[derive(Debug, Error)]
pub enum RecordRejected {
    /// The document was written by another layout version.
    #[error("unsupported schema version {0}")]
    UnsupportedVersion(u32),
    /// `lastUpdated` is not an RFC 3339 timestamp.
    #[error("invalid lastUpdated `{value}`")]
    Timestamp {
        value: String,
        #[source]
        source: time::error::Parse,
    },
    /// The numbers do not form a valid partition of the pool.
    #[error("inconsistent session: {0}")]
    Inconsistent(#[from] InvariantViolation),
}

impl From<&GameSession> for SessionRecord {
    fn from(session: &GameSession) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            session_name: session.name.clone(),
            called_numbers: session.called.clone(),
            remaining_numbers: session.remaining.clone(),
            current_number: session.current,
            last_updated: session.updated_at_rfc3339(),
        }
    }
}

impl TryFrom<SessionRecord> for GameSession {
    type Error = RecordRejected;

    fn try_from(record: SessionRecord) -> Result<Self, Self::Error> {
        if record.schema_version != SCHEMA_VERSION {
            return Err(RecordRejected::UnsupportedVersion(record.schema_version));
        }

        let updated_at = OffsetDateTime::parse(&record.last_updated, &Rfc3339).map_err(
            |source| RecordRejected::Timestamp {
                value: record.last_updated.clone(),
                source,
            },
        )?;

        let session = GameSession {
            name: record.session_name,
            called: record.called_numbers,
            remaining: record.remaining_numbers,
            current: record.current_number,
            updated_at,
        };
        session.check_invariants()?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_uses_camel_case_keys() {
        let mut session = GameSession::fresh("order");
        session.take_remaining(6);
        let json = serde_json::to_value(SessionRecord::from(&session)).unwrap();

        assert_eq!(json["schemaVersion"], 1);
        assert_eq!(json["sessionName"], "order");
        assert_eq!(json["calledNumbers"], serde_json::json!([7]));
        assert_eq!(json["currentNumber"], 7);
        assert_eq!(json["remainingNumbers"].as_array().unwrap().len(), 89);
        assert!(json["lastUpdated"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn record_converts_back_to_identical_session() {
        let mut session = GameSession::fresh("friday");
        for index in [10, 0, 33] {
            session.take_remaining(index);
        }
        let restored = GameSession::try_from(SessionRecord::from(&session)).unwrap();
        assert_eq!(restored, session);
    }

    #[test]
    fn other_schema_versions_are_rejected() {
        let mut record = SessionRecord::from(&GameSession::fresh("order"));
        record.schema_version = 2;
        assert!(matches!(
            GameSession::try_from(record),
            Err(RecordRejected::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn inconsistent_records_are_rejected() {
        let mut record = SessionRecord::from(&GameSession::fresh("order"));
        record.called_numbers.push(12);
        record.current_number = Some(12);
        assert!(matches!(
            GameSession::try_from(record),
            Err(RecordRejected::Inconsistent(InvariantViolation::Duplicate(12)))
        ));

        let mut record = SessionRecord::from(&GameSession::fresh("order"));
        record.last_updated = "yesterday".into();
        assert!(matches!(
            GameSession::try_from(record),
            Err(RecordRejected::Timestamp { .. })
        ));
    }
}
