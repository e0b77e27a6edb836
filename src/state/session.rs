use std::collections::HashSet;

use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Number printed on a bingo ball.
pub type BallNumber = u8;

/// Lowest ball in the draw pool.
pub const MIN_BALL: BallNumber = 1;
/// Highest ball in the draw pool.
pub const MAX_BALL: BallNumber = 90;
/// Number of balls in a complete game.
pub const BALL_COUNT: usize = MAX_BALL as usize;
/// Placeholder name used when the host leaves the session name blank.
pub const DEFAULT_SESSION_NAME: &str = "order";

/// Complete state of one bingo game on this device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSession {
    /// Display name of the session, never blank.
    pub name: String,
    /// Balls drawn so far, earliest first.
    pub called: Vec<BallNumber>,
    /// Balls still in the pool.
    pub remaining: Vec<BallNumber>,
    /// Most recently called ball, `None` before the first draw.
    pub current: Option<BallNumber>,
    /// Time of the last mutation.
    pub updated_at: OffsetDateTime,
}

/// Structural problem found in a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// A ball outside 1..=90 was found.
    #[error("ball {0} is outside {MIN_BALL}..={MAX_BALL}")]
    OutOfRange(BallNumber),
    /// A ball appears twice across called and remaining.
    #[error("ball {0} appears more than once")]
    Duplicate(BallNumber),
    /// Called and remaining do not cover the whole pool.
    #[error("called and remaining cover {0} balls instead of {BALL_COUNT}")]
    Incomplete(usize),
    /// `current` is not the last called ball.
    #[error("current number {current:?} does not match last called {last:?}")]
    CurrentMismatch {
        /// Stored current number.
        current: Option<BallNumber>,
        /// Last entry of the called list.
        last: Option<BallNumber>,
    },
    /// The session name is empty or whitespace.
    #[error("session name is blank")]
    BlankName,
}

impl GameSession {
    /// Start a new game with the whole pool available and nothing called yet.
    pub fn fresh(name: &str) -> Self {
        Self {
            name: normalize_name(name),
            called: Vec::with_capacity(BALL_COUNT),
            remaining: (MIN_BALL..=MAX_BALL).collect(),
            current: None,
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    /// True once every ball has been called.
    pub fn is_finished(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Refresh the mutation timestamp.
    pub fn touch(&mut self) {
        self.updated_at = OffsetDateTime::now_utc();
    }

    /// Move the ball at `index` of the remaining pool to the end of the called list.
    ///
    /// Panics if `index` is out of bounds; callers derive it from the pool length.
    pub fn take_remaining(&mut self, index: usize) -> BallNumber {
        let number = self.remaining.remove(index);
        self.called.push(number);
        self.current = Some(number);
        self.touch();
        number
    }

    /// RFC 3339 rendering of [`GameSession::updated_at`].
    pub fn updated_at_rfc3339(&self) -> String {
        self.updated_at
            .format(&Rfc3339)
            .unwrap_or_else(|_| "invalid-timestamp".into())
    }

    /// Verify the pool partition, ordering and naming rules.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if self.name.trim().is_empty() {
            return Err(InvariantViolation::BlankName);
        }

        let mut seen = HashSet::with_capacity(BALL_COUNT);
        for &number in self.called.iter().chain(self.remaining.iter()) {
            if !is_ball(number) {
                return Err(InvariantViolation::OutOfRange(number));
            }
            if !seen.insert(number) {
                return Err(InvariantViolation::Duplicate(number));
            }
        }
        if seen.len() != BALL_COUNT {
            return Err(InvariantViolation::Incomplete(seen.len()));
        }

        let last = self.called.last().copied();
        if self.current != last {
            return Err(InvariantViolation::CurrentMismatch {
                current: self.current,
                last,
            });
        }

        Ok(())
    }
}

/// Trim a user supplied name, substituting [`DEFAULT_SESSION_NAME`] when nothing is left.
pub fn normalize_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        DEFAULT_SESSION_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Whether `number` is a valid ball.
pub fn is_ball(number: BallNumber) -> bool {
    (MIN_BALL..=MAX_BALL).contains(&number)
}
