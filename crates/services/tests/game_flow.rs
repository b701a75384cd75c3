use async_trait::async_trait;
use quiz_core::model::{Category, Mode, PlayerId, Question, SessionId};
use quiz_core::time::fixed_clock;
use services::error::GameFlowError;
use services::{GameFlow, ScoreLedger};
use storage::repository::{
    LeaderboardEntry, LedgerRow, NewSessionRecord, ScoreRepository, Storage, StorageError,
};

fn bank(n: usize) -> Vec<Question> {
    (0..n)
        .map(|i| Question::new(format!("prompt {i}"), format!("answer {i}")))
        .collect()
}

async fn flow_over(storage: &Storage) -> GameFlow {
    let ledger = ScoreLedger::new(
        fixed_clock(),
        storage.players.clone(),
        storage.scores.clone(),
    );
    GameFlow::new(fixed_clock(), storage.questions.clone(), ledger)
}

async fn seeded_flow(questions: usize) -> GameFlow {
    let storage = Storage::in_memory();
    storage
        .questions
        .insert_questions(Category::Csc111, &bank(questions))
        .await
        .unwrap();
    flow_over(&storage).await
}

#[tokio::test]
async fn perfect_game_wins_and_sets_a_high_score() {
    let flow = seeded_flow(12).await;
    let mut game = flow
        .start_game(Mode::Classic, Category::Csc111)
        .await
        .unwrap();

    while !game.is_finished() {
        let answer = game.current_question().unwrap().answer().to_string();
        assert!(game.guess(&answer).unwrap());
    }

    let outcome = flow.finish_game(&game, Some("Ann")).await;
    assert_eq!(outcome.score, 100.0);
    assert!(outcome.won);
    assert!(outcome.new_high_score);
    assert!(outcome.save_error.is_none());

    let board = flow
        .ledger()
        .leaderboard(Category::Csc111, Mode::Classic, 10)
        .await
        .unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].player_name, "Ann");
    assert_eq!(board[0].score, 100.0);
}

#[tokio::test]
async fn matching_an_existing_best_is_not_a_new_high_score() {
    let flow = seeded_flow(10).await;

    let mut outcomes = Vec::new();
    for _ in 0..2 {
        let mut game = flow
            .start_game(Mode::Classic, Category::Csc111)
            .await
            .unwrap();
        while !game.is_finished() {
            let answer = game.current_question().unwrap().answer().to_string();
            game.guess(&answer).unwrap();
        }
        let outcome = flow.finish_game(&game, Some("Ann")).await;
        assert_eq!(outcome.score, 100.0);
        assert!(outcome.save_error.is_none());
        outcomes.push(outcome);
    }

    assert!(outcomes[0].new_high_score);
    // The second run only ties the first and must not count as new.
    assert!(!outcomes[1].new_high_score);
}

#[tokio::test]
async fn anonymous_games_are_never_persisted() {
    let flow = seeded_flow(10).await;
    let mut game = flow
        .start_game(Mode::Timed, Category::Csc111)
        .await
        .unwrap();
    while !game.is_finished() {
        let answer = game.current_question().unwrap().answer().to_string();
        game.guess(&answer).unwrap();
    }

    for name in [None, Some(""), Some("   ")] {
        let outcome = flow.finish_game(&game, name).await;
        assert!(outcome.won);
        assert!(!outcome.new_high_score);
        assert!(outcome.save_error.is_none());
    }

    let board = flow
        .ledger()
        .leaderboard(Category::Csc111, Mode::Timed, 10)
        .await
        .unwrap();
    assert!(board.is_empty());
}

#[tokio::test]
async fn losing_every_round_records_a_zero_without_a_win() {
    let flow = seeded_flow(10).await;
    let mut game = flow
        .start_game(Mode::Classic, Category::Csc111)
        .await
        .unwrap();
    while !game.is_finished() {
        assert!(!game.guess("definitely wrong").unwrap());
    }

    let outcome = flow.finish_game(&game, Some("Ben")).await;
    assert_eq!(outcome.score, 0.0);
    assert!(!outcome.won);
    assert!(!outcome.new_high_score);
    assert!(outcome.save_error.is_none());

    let board = flow
        .ledger()
        .leaderboard(Category::Csc111, Mode::Classic, 10)
        .await
        .unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].score, 0.0);
}

struct UnreachableScores;

#[async_trait]
impl ScoreRepository for UnreachableScores {
    async fn record_session(&self, _record: NewSessionRecord) -> Result<SessionId, StorageError> {
        Err(StorageError::Connection("ledger offline".into()))
    }

    async fn top_scores(
        &self,
        _category: Category,
        _mode: Mode,
        _limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, StorageError> {
        Err(StorageError::Connection("ledger offline".into()))
    }

    async fn high_score(
        &self,
        _player: PlayerId,
        _category: Category,
        _mode: Mode,
    ) -> Result<f64, StorageError> {
        Err(StorageError::Connection("ledger offline".into()))
    }

    async fn ledger_rows(
        &self,
        _category: Category,
        _mode: Mode,
    ) -> Result<Vec<LedgerRow>, StorageError> {
        Err(StorageError::Connection("ledger offline".into()))
    }
}

#[tokio::test]
async fn a_broken_ledger_does_not_swallow_the_outcome() {
    let storage = Storage::in_memory();
    storage
        .questions
        .insert_questions(Category::Csc111, &bank(10))
        .await
        .unwrap();
    let ledger = ScoreLedger::new(
        fixed_clock(),
        storage.players.clone(),
        std::sync::Arc::new(UnreachableScores),
    );
    let flow = GameFlow::new(fixed_clock(), storage.questions.clone(), ledger);

    let mut game = flow
        .start_game(Mode::Classic, Category::Csc111)
        .await
        .unwrap();
    while !game.is_finished() {
        let answer = game.current_question().unwrap().answer().to_string();
        game.guess(&answer).unwrap();
    }

    let outcome = flow.finish_game(&game, Some("Ann")).await;
    assert_eq!(outcome.score, 100.0);
    assert!(outcome.won);
    assert!(outcome.save_error.is_some());
}

#[tokio::test]
async fn start_fails_when_the_bank_is_too_small() {
    let flow = seeded_flow(9).await;
    let err = flow
        .start_game(Mode::Classic, Category::Csc111)
        .await
        .unwrap_err();
    assert!(matches!(err, GameFlowError::Questions(_)));
}

#[tokio::test]
async fn categories_draw_from_their_own_banks() {
    let storage = Storage::in_memory();
    storage
        .questions
        .insert_questions(Category::Csc111, &bank(10))
        .await
        .unwrap();
    let flow = flow_over(&storage).await;

    assert!(
        flow.start_game(Mode::Classic, Category::Csc111)
            .await
            .is_ok()
    );
    let err = flow
        .start_game(Mode::Classic, Category::Csc211)
        .await
        .unwrap_err();
    assert!(matches!(err, GameFlowError::Questions(_)));
}
