use std::sync::Arc;

use quiz_core::engine::QuizGame;
use quiz_core::model::{Category, Mode, QuestionSet};
use quiz_core::time::Clock;
use storage::repository::QuestionRepository;

use crate::error::{GameFlowError, LedgerError};
use crate::ledger::ScoreLedger;

/// The result of wrapping up a finished game.
///
/// Persistence is best effort: a storage failure lands in `save_error`
/// instead of discarding the outcome the player just earned.
#[derive(Debug)]
pub struct GameOutcome {
    pub score: f64,
    pub won: bool,
    pub new_high_score: bool,
    pub save_error: Option<LedgerError>,
}

/// Drives a game from question draw to ledger write.
pub struct GameFlow {
    clock: Clock,
    questions: Arc<dyn QuestionRepository>,
    ledger: ScoreLedger,
}

impl GameFlow {
    pub fn new(clock: Clock, questions: Arc<dyn QuestionRepository>, ledger: ScoreLedger) -> Self {
        Self {
            clock,
            questions,
            ledger,
        }
    }

    pub fn ledger(&self) -> &ScoreLedger {
        &self.ledger
    }

    /// Draws a fresh question set for `category` and starts a game with it.
    pub async fn start_game(
        &self,
        mode: Mode,
        category: Category,
    ) -> Result<QuizGame, GameFlowError> {
        let bank = self.questions.questions_for_category(category).await?;
        let set = QuestionSet::draw(bank, &mut rand::rng())?;
        let mut game = QuizGame::new(mode, category, self.clock);
        game.start(set)?;
        Ok(game)
    }

    /// Wraps up a finished game, recording the score when a player name
    /// was given.
    ///
    /// An empty or whitespace-only name skips persistence entirely, so
    /// anonymous games still get a full outcome.
    pub async fn finish_game(&self, game: &QuizGame, player_name: Option<&str>) -> GameOutcome {
        let mut outcome = GameOutcome {
            score: game.score(),
            won: game.has_won(),
            new_high_score: false,
            save_error: None,
        };
        let Some(name) = player_name.map(str::trim).filter(|n| !n.is_empty()) else {
            return outcome;
        };
        match self.save(game, name).await {
            Ok(new_high) => outcome.new_high_score = new_high,
            Err(err) => outcome.save_error = Some(err),
        }
        outcome
    }

    async fn save(&self, game: &QuizGame, name: &str) -> Result<bool, LedgerError> {
        let player = self.ledger.ensure_player(name).await?;
        // The high-score check has to happen before the session is
        // recorded, or the fresh session beats the comparison.
        let new_high = self.ledger.is_new_high_score(game, player).await?;
        self.ledger
            .record(player, game.category(), game.mode(), game.score())
            .await?;
        Ok(new_high)
    }
}
