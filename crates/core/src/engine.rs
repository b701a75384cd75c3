use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::model::{Category, Mode, Question, QuestionSet};
use crate::time::Clock;

/// Rounds per game. Matches [`QuestionSet::SIZE`].
pub const TOTAL_ROUNDS: u32 = QuestionSet::SIZE as u32;

/// Score ceiling; also the win-by-score threshold.
pub const MAX_SCORE: f64 = 100.0;

/// Points a round is worth before attempt penalties.
pub const POINTS_PER_ROUND: f64 = 10.0;

/// Classic mode: points forfeited per incorrect guess within a round.
pub const POINTS_PER_MISS: f64 = 2.0;

/// Classic mode: guesses allowed per round before the round is forfeited.
pub const MAX_ATTEMPTS_PER_ROUND: u32 = 5;

/// Timed mode: wall-clock allotment per round. The budget is the total
/// across all rounds, counted from game start, never paused or extended.
pub const SECONDS_PER_TIMED_ROUND: i64 = 120;

/// Upper bound on guess length, in bytes.
pub const MAX_GUESS_LEN: usize = 200;

/// Lifecycle of a single play-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    InProgress,
    Finished,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GameError {
    // Validation: rejected synchronously, state unchanged.
    #[error("guess is empty")]
    EmptyGuess,
    #[error("guess is {len} bytes, limit is {limit}", limit = MAX_GUESS_LEN)]
    GuessTooLong { len: usize },

    // Sequence: the operation is not legal in the current phase.
    #[error("game is not in progress")]
    NotInProgress,
    #[error("a game is already in progress")]
    AlreadyActive,
    #[error("game is already paused")]
    AlreadyPaused,
    #[error("game is already running")]
    AlreadyRunning,
    #[error("cannot change mode while a game is in progress")]
    ModeLocked,
    #[error("cannot change category while a game is in progress")]
    CategoryLocked,

    // Integrity: the engine's own bookkeeping is inconsistent.
    #[error("question set is empty")]
    EmptyQuestionSet,
    #[error("no question available for round {round}")]
    NoCurrentQuestion { round: u32 },
}

/// Single-player quiz game state machine.
///
/// One live instance per play-through; mutated only through its
/// operations, destroyed on reset. Time expiry in `Timed` mode is polled
/// against the captured start timestamp; [`QuizGame::is_finished`] never
/// mutates, so callers commit a time-based transition via
/// [`QuizGame::guess`] or [`QuizGame::tick`].
#[derive(Debug, Clone)]
pub struct QuizGame {
    mode: Mode,
    category: Category,
    clock: Clock,
    phase: Phase,
    active: bool,
    round: u32,
    score: f64,
    incorrect_rounds: u32,
    incorrect_guesses: u32,
    questions: Option<QuestionSet>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl QuizGame {
    #[must_use]
    pub fn new(mode: Mode, category: Category, clock: Clock) -> Self {
        Self {
            mode,
            category,
            clock,
            phase: Phase::Idle,
            active: false,
            round: 0,
            score: 0.0,
            incorrect_rounds: 0,
            incorrect_guesses: 0,
            questions: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Total wall-clock budget for a `Timed` game.
    #[must_use]
    pub fn time_limit() -> Duration {
        Duration::seconds(SECONDS_PER_TIMED_ROUND * i64::from(TOTAL_ROUNDS))
    }

    /// Begin a new game over the given question set.
    ///
    /// # Errors
    ///
    /// Returns `GameError::AlreadyActive` if a game is in progress and
    /// `GameError::EmptyQuestionSet` if the set holds no questions.
    pub fn start(&mut self, set: QuestionSet) -> Result<(), GameError> {
        if self.phase == Phase::InProgress {
            return Err(GameError::AlreadyActive);
        }
        if set.is_empty() {
            return Err(GameError::EmptyQuestionSet);
        }

        self.round = 1;
        self.score = 0.0;
        self.incorrect_rounds = 0;
        self.incorrect_guesses = 0;
        self.questions = Some(set);
        self.started_at = Some(self.clock.now());
        self.finished_at = None;
        self.phase = Phase::InProgress;
        self.active = true;
        Ok(())
    }

    /// Grade one guess and advance the state machine.
    ///
    /// In `Timed` mode an expired budget is observed here, but the
    /// in-flight guess is still graded: expiry forces termination after
    /// this guess, it never retroactively invalidates it.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty/oversized guesses and a
    /// sequence error when no game is in progress; neither mutates state.
    pub fn guess(&mut self, guess: &str) -> Result<bool, GameError> {
        if guess.is_empty() {
            return Err(GameError::EmptyGuess);
        }
        if guess.len() > MAX_GUESS_LEN {
            return Err(GameError::GuessTooLong { len: guess.len() });
        }
        if self.phase != Phase::InProgress {
            return Err(GameError::NotInProgress);
        }

        let expired = self.time_expired();
        let correct = self
            .current_question()
            .ok_or(GameError::NoCurrentQuestion { round: self.round })?
            .grade(guess);

        match self.mode {
            Mode::Classic => {
                if correct {
                    self.score +=
                        POINTS_PER_ROUND - f64::from(self.incorrect_guesses) * POINTS_PER_MISS;
                    self.round += 1;
                    self.incorrect_guesses = 0;
                } else {
                    self.incorrect_guesses += 1;
                    if self.incorrect_guesses >= MAX_ATTEMPTS_PER_ROUND {
                        // Round forfeited: no points, advance, reset attempts.
                        self.incorrect_rounds += 1;
                        self.round += 1;
                        self.incorrect_guesses = 0;
                    }
                }
            }
            Mode::Timed => {
                if correct {
                    self.score += POINTS_PER_ROUND;
                } else {
                    self.incorrect_rounds += 1;
                }
                self.round += 1;
            }
        }
        self.score = self.score.clamp(0.0, MAX_SCORE);

        if expired || self.round > TOTAL_ROUNDS || self.score >= MAX_SCORE {
            self.finish();
        }
        Ok(correct)
    }

    /// Commit a pending time-based transition without submitting a guess.
    pub fn tick(&mut self) {
        if self.phase == Phase::InProgress && self.time_expired() {
            self.finish();
        }
    }

    /// Pure terminal-state predicate; never mutates, even on time expiry.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        match self.phase {
            Phase::Finished => true,
            Phase::Idle => false,
            Phase::InProgress => {
                self.round > TOTAL_ROUNDS || self.score >= MAX_SCORE || self.time_expired()
            }
        }
    }

    /// True only for a game that reached the final round with points on
    /// the board, and (in `Timed` mode) inside the time budget.
    #[must_use]
    pub fn has_won(&self) -> bool {
        self.round >= TOTAL_ROUNDS
            && self.score > 0.0
            && (self.mode == Mode::Classic || !self.time_expired())
    }

    /// Return to `Idle`, keeping the configured mode and category.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.active = false;
        self.round = 0;
        self.score = 0.0;
        self.incorrect_rounds = 0;
        self.incorrect_guesses = 0;
        self.questions = None;
        self.started_at = None;
        self.finished_at = None;
    }

    /// # Errors
    ///
    /// Returns `GameError::AlreadyPaused` if the game is not running.
    pub fn pause(&mut self) -> Result<(), GameError> {
        if !self.active {
            return Err(GameError::AlreadyPaused);
        }
        self.active = false;
        Ok(())
    }

    /// Resuming does not stretch the `Timed` countdown; the budget keeps
    /// running from the original start.
    ///
    /// # Errors
    ///
    /// Returns `GameError::AlreadyRunning` if the game is running.
    pub fn resume(&mut self) -> Result<(), GameError> {
        if self.active {
            return Err(GameError::AlreadyRunning);
        }
        self.active = true;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `GameError::ModeLocked` while a game is in progress.
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), GameError> {
        if self.phase == Phase::InProgress {
            return Err(GameError::ModeLocked);
        }
        self.mode = mode;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `GameError::CategoryLocked` while a game is in progress.
    pub fn set_category(&mut self, category: Category) -> Result<(), GameError> {
        if self.phase == Phase::InProgress {
            return Err(GameError::CategoryLocked);
        }
        self.category = category;
        Ok(())
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.as_ref()?.for_round(self.round)
    }

    /// Classic mode: guesses left before the current round is forfeited.
    #[must_use]
    pub fn remaining_attempts(&self) -> u32 {
        match self.mode {
            Mode::Classic => MAX_ATTEMPTS_PER_ROUND - self.incorrect_guesses,
            Mode::Timed => 0,
        }
    }

    /// Timed mode: wall-clock budget left, floored at zero.
    #[must_use]
    pub fn remaining_time(&self) -> Duration {
        match self.mode {
            Mode::Timed => (Self::time_limit() - self.elapsed()).max(Duration::zero()),
            Mode::Classic => Duration::zero(),
        }
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn category(&self) -> Category {
        self.category
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Current round, 1-based. Zero before the first start.
    #[must_use]
    pub fn round(&self) -> u32 {
        self.round
    }

    #[must_use]
    pub fn score(&self) -> f64 {
        self.score
    }

    #[must_use]
    pub fn incorrect_rounds(&self) -> u32 {
        self.incorrect_rounds
    }

    fn finish(&mut self) {
        self.phase = Phase::Finished;
        self.active = false;
        self.finished_at = Some(self.clock.now());
    }

    /// Elapsed time, frozen at the finish timestamp once the game ends so
    /// that later queries do not drift.
    fn elapsed(&self) -> Duration {
        match self.started_at {
            Some(start) => self.finished_at.unwrap_or_else(|| self.clock.now()) - start,
            None => Duration::zero(),
        }
    }

    fn time_expired(&self) -> bool {
        self.mode == Mode::Timed && self.started_at.is_some() && self.elapsed() >= Self::time_limit()
    }
}
