use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::engine::MAX_SCORE;
use crate::model::{Category, Mode, PlayerId};

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("score {score} is outside the valid range 0..={max}", max = MAX_SCORE)]
    InvalidScore { score: f64 },
}

/// Final score of one completed or abandoned play-through, attributable
/// to a player, category, and mode. Immutable after creation; owned by
/// the score ledger once recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    player: PlayerId,
    category: Category,
    mode: Mode,
    score: f64,
    played_at: DateTime<Utc>,
}

impl Session {
    /// # Errors
    ///
    /// Returns `SessionError::InvalidScore` if the score falls outside
    /// `[0, 100]`.
    pub fn new(
        player: PlayerId,
        category: Category,
        mode: Mode,
        score: f64,
        played_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if !(0.0..=MAX_SCORE).contains(&score) {
            return Err(SessionError::InvalidScore { score });
        }
        Ok(Self {
            player,
            category,
            mode,
            score,
            played_at,
        })
    }

    #[must_use]
    pub fn player(&self) -> PlayerId {
        self.player
    }

    #[must_use]
    pub fn category(&self) -> Category {
        self.category
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn score(&self) -> f64 {
        self.score
    }

    #[must_use]
    pub fn played_at(&self) -> DateTime<Utc> {
        self.played_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn rejects_out_of_range_scores() {
        for score in [-0.1, 100.1, f64::NAN] {
            let result = Session::new(
                PlayerId::new(1),
                Category::Csc111,
                Mode::Classic,
                score,
                fixed_now(),
            );
            assert!(result.is_err(), "score {score} should be rejected");
        }
    }

    #[test]
    fn accepts_boundary_scores() {
        for score in [0.0, 100.0] {
            Session::new(
                PlayerId::new(1),
                Category::Csc111,
                Mode::Timed,
                score,
                fixed_now(),
            )
            .unwrap();
        }
    }
}
