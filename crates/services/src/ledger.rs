use std::sync::Arc;

use quiz_core::engine::QuizGame;
use quiz_core::model::{Category, Mode, PlayerId, Session, SessionId};
use quiz_core::time::Clock;
use storage::repository::{
    LeaderboardEntry, NewSessionRecord, PlayerRepository, ScoreRepository,
};

use crate::error::LedgerError;

/// Application-facing view of the per-(category, mode) top-ten ledger.
///
/// All writes go through [`ScoreLedger::record`], which stamps the session
/// with the ledger's clock so tests can pin time deterministically.
pub struct ScoreLedger {
    clock: Clock,
    players: Arc<dyn PlayerRepository>,
    scores: Arc<dyn ScoreRepository>,
}

impl ScoreLedger {
    pub fn new(
        clock: Clock,
        players: Arc<dyn PlayerRepository>,
        scores: Arc<dyn ScoreRepository>,
    ) -> Self {
        Self {
            clock,
            players,
            scores,
        }
    }

    /// Resolves `name` to a player id, creating the player on first sight.
    pub async fn ensure_player(&self, name: &str) -> Result<PlayerId, LedgerError> {
        Ok(self.players.ensure_player(name).await?)
    }

    /// Records a finished game's score for `player`, stamped with the
    /// ledger clock's current time.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Session` if the score falls outside `[0, 100]`.
    pub async fn record(
        &self,
        player: PlayerId,
        category: Category,
        mode: Mode,
        score: f64,
    ) -> Result<SessionId, LedgerError> {
        let session = Session::new(player, category, mode, score, self.clock.now())?;
        let record = NewSessionRecord {
            player: session.player(),
            category: session.category(),
            mode: session.mode(),
            score: session.score(),
            played_at: session.played_at(),
        };
        Ok(self.scores.record_session(record).await?)
    }

    /// The top `limit` ledger entries for a pair, best score first and
    /// oldest entry first among ties.
    pub async fn leaderboard(
        &self,
        category: Category,
        mode: Mode,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, LedgerError> {
        Ok(self.scores.top_scores(category, mode, limit).await?)
    }

    /// The player's best ledgered score for a pair, 0.0 when they hold
    /// no ledger slot.
    pub async fn high_score(
        &self,
        player: PlayerId,
        category: Category,
        mode: Mode,
    ) -> Result<f64, LedgerError> {
        Ok(self.scores.high_score(player, category, mode).await?)
    }

    /// Whether `game`'s final score would beat the player's current best.
    ///
    /// Must be asked before [`ScoreLedger::record`] persists the session,
    /// otherwise the session compares against itself and the answer is
    /// always `false`. Unfinished and zero-score games never qualify.
    pub async fn is_new_high_score(
        &self,
        game: &QuizGame,
        player: PlayerId,
    ) -> Result<bool, LedgerError> {
        if !game.is_finished() || game.score() <= 0.0 {
            return Ok(false);
        }
        let best = self
            .high_score(player, game.category(), game.mode())
            .await?;
        Ok(game.score() > best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_clock;
    use storage::repository::Storage;

    fn ledger_over(storage: &Storage) -> ScoreLedger {
        ScoreLedger::new(
            fixed_clock(),
            storage.players.clone(),
            storage.scores.clone(),
        )
    }

    #[tokio::test]
    async fn out_of_range_scores_are_rejected() {
        let storage = Storage::in_memory();
        let ledger = ledger_over(&storage);
        let ann = ledger.ensure_player("Ann").await.unwrap();

        for bad in [-0.1, 100.1, f64::NAN] {
            let err = ledger
                .record(ann, Category::Csc111, Mode::Classic, bad)
                .await
                .unwrap_err();
            assert!(matches!(err, LedgerError::Session(_)));
        }
    }

    #[tokio::test]
    async fn recorded_scores_surface_on_the_leaderboard() {
        let storage = Storage::in_memory();
        let ledger = ledger_over(&storage);
        let ann = ledger.ensure_player("Ann").await.unwrap();
        let ben = ledger.ensure_player("Ben").await.unwrap();

        ledger
            .record(ann, Category::Csc211, Mode::Timed, 70.0)
            .await
            .unwrap();
        ledger
            .record(ben, Category::Csc211, Mode::Timed, 90.0)
            .await
            .unwrap();

        let board = ledger
            .leaderboard(Category::Csc211, Mode::Timed, 10)
            .await
            .unwrap();
        let names: Vec<&str> = board.iter().map(|e| e.player_name.as_str()).collect();
        assert_eq!(names, ["Ben", "Ann"]);
        assert_eq!(
            ledger
                .high_score(ann, Category::Csc211, Mode::Timed)
                .await
                .unwrap(),
            70.0
        );
    }

    #[tokio::test]
    async fn high_score_defaults_to_zero_for_new_players() {
        let storage = Storage::in_memory();
        let ledger = ledger_over(&storage);
        let ann = ledger.ensure_player("Ann").await.unwrap();

        assert_eq!(
            ledger
                .high_score(ann, Category::Csc111, Mode::Classic)
                .await
                .unwrap(),
            0.0
        );
    }
}
