use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{Category, Mode, PlayerId, Question, SessionId};
use rand::seq::SliceRandom;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Session data handed to the ledger for recording. The score must
/// already be validated to `[0, 100]` by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSessionRecord {
    pub player: PlayerId,
    pub category: Category,
    pub mode: Mode,
    pub score: f64,
    pub played_at: DateTime<Utc>,
}

/// One row of the read-side leaderboard view.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub player_name: String,
    pub score: f64,
}

/// One ledger slot, joined with its session. Exposed mainly so callers
/// and tests can check the top-10 invariants.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRow {
    pub session: SessionId,
    pub rank: u32,
    pub player: PlayerId,
    pub score: f64,
}

/// Category-scoped question bank access.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Bulk-insert questions for one category, skipping any row that
    /// duplicates an existing `(category, prompt)` pair. Returns the
    /// number of rows actually inserted, making reloads idempotent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the bank cannot be written.
    async fn insert_questions(
        &self,
        category: Category,
        questions: &[Question],
    ) -> Result<u64, StorageError>;

    /// The complete bank for a category in random order. The caller
    /// performs the without-replacement draw; this only shuffles.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the bank cannot be read.
    async fn questions_for_category(
        &self,
        category: Category,
    ) -> Result<Vec<Question>, StorageError>;
}

/// Display-name to identity mapping.
#[async_trait]
pub trait PlayerRepository: Send + Sync {
    /// Look up a player by unique display name, creating it when absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lookup or insert fails.
    async fn ensure_player(&self, name: &str) -> Result<PlayerId, StorageError>;
}

/// Append-only session history plus the pruned top-10 ledger over it.
#[async_trait]
pub trait ScoreRepository: Send + Sync {
    /// Append a session and maintain the ledger atomically: compute the
    /// session's dense rank among all sessions of its (category, mode),
    /// and if it ranks in the top 10, evict the player's stale
    /// identical-score entry, insert the new slot, then re-rank within
    /// the ledger and drop anything past rank 10. A failure anywhere
    /// rolls the whole sequence back.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the rank of the freshly
    /// inserted session cannot be read back, or other storage errors.
    async fn record_session(&self, record: NewSessionRecord) -> Result<SessionId, StorageError>;

    /// Ledgered entries ordered by `(score DESC, played_at ASC)`. The
    /// display tie-break favors the oldest entry, intentionally the
    /// opposite of the newest-first retention tie-break used on write.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the ledger cannot be read.
    async fn top_scores(
        &self,
        category: Category,
        mode: Mode,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, StorageError>;

    /// The player's best ledgered score for the pair, `0.0` when none.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the ledger cannot be read.
    async fn high_score(
        &self,
        player: PlayerId,
        category: Category,
        mode: Mode,
    ) -> Result<f64, StorageError>;

    /// All ledger slots for a pair, ordered by stored rank.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the ledger cannot be read.
    async fn ledger_rows(&self, category: Category, mode: Mode)
    -> Result<Vec<LedgerRow>, StorageError>;
}

#[derive(Debug, Clone)]
struct StoredSession {
    id: SessionId,
    player: PlayerId,
    category: Category,
    mode: Mode,
    score: f64,
    played_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct LedgerSlot {
    session: SessionId,
    rank: u32,
}

#[derive(Default)]
struct Inner {
    players: Vec<String>,
    questions: Vec<(Category, Question)>,
    sessions: Vec<StoredSession>,
    ledger: Vec<LedgerSlot>,
}

/// In-memory repository with the same observable semantics as the
/// `SQLite` backend, including the two-phase ledger maintenance. Used in
/// tests and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StorageError> {
        self.inner
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

/// Ordering used for rank computation: score descending, then newest
/// first.
fn retention_order(a: &(f64, DateTime<Utc>), b: &(f64, DateTime<Utc>)) -> std::cmp::Ordering {
    b.0.total_cmp(&a.0).then_with(|| b.1.cmp(&a.1))
}

fn dense_ranks(keys: &[(f64, DateTime<Utc>)]) -> Vec<u32> {
    let mut ranks = Vec::with_capacity(keys.len());
    let mut rank = 0_u32;
    let mut previous: Option<(f64, DateTime<Utc>)> = None;
    for key in keys {
        if previous != Some(*key) {
            rank += 1;
            previous = Some(*key);
        }
        ranks.push(rank);
    }
    ranks
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn insert_questions(
        &self,
        category: Category,
        questions: &[Question],
    ) -> Result<u64, StorageError> {
        let mut inner = self.lock()?;
        let mut inserted = 0_u64;
        for question in questions {
            let duplicate = inner
                .questions
                .iter()
                .any(|(c, q)| *c == category && q.prompt() == question.prompt());
            if !duplicate {
                inner.questions.push((category, question.clone()));
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn questions_for_category(
        &self,
        category: Category,
    ) -> Result<Vec<Question>, StorageError> {
        let inner = self.lock()?;
        let mut bank: Vec<Question> = inner
            .questions
            .iter()
            .filter(|(c, _)| *c == category)
            .map(|(_, q)| q.clone())
            .collect();
        drop(inner);
        bank.shuffle(&mut rand::rng());
        Ok(bank)
    }
}

#[async_trait]
impl PlayerRepository for InMemoryRepository {
    async fn ensure_player(&self, name: &str) -> Result<PlayerId, StorageError> {
        let mut inner = self.lock()?;
        if let Some(index) = inner.players.iter().position(|n| n == name) {
            return Ok(PlayerId::new(index as u64 + 1));
        }
        inner.players.push(name.to_string());
        Ok(PlayerId::new(inner.players.len() as u64))
    }
}

#[async_trait]
impl ScoreRepository for InMemoryRepository {
    async fn record_session(&self, record: NewSessionRecord) -> Result<SessionId, StorageError> {
        let mut inner = self.lock()?;

        let id = SessionId::new(inner.sessions.len() as u64 + 1);
        inner.sessions.push(StoredSession {
            id,
            player: record.player,
            category: record.category,
            mode: record.mode,
            score: record.score,
            played_at: record.played_at,
        });

        // Phase one: dense rank among ALL sessions of the pair.
        let mut keys: Vec<(f64, DateTime<Utc>)> = inner
            .sessions
            .iter()
            .filter(|s| s.category == record.category && s.mode == record.mode)
            .map(|s| (s.score, s.played_at))
            .collect();
        keys.sort_by(retention_order);
        keys.dedup();
        let rank = keys
            .iter()
            .position(|k| *k == (record.score, record.played_at))
            .ok_or(StorageError::NotFound)? as u32
            + 1;

        if rank > 10 {
            return Ok(id);
        }

        // The player's stale tie is replaced by the fresh one.
        let sessions = inner.sessions.clone();
        inner.ledger.retain(|slot| {
            sessions
                .iter()
                .find(|s| s.id == slot.session)
                .is_none_or(|s| {
                    !(s.player == record.player
                        && s.category == record.category
                        && s.mode == record.mode
                        && s.score == record.score
                        && s.id < id)
                })
        });
        inner.ledger.push(LedgerSlot { session: id, rank });

        // Phase two: re-rank within the ledger only; evict past 10 and
        // rewrite the surviving ranks so the stored ledger stays a
        // contiguous dense ranking.
        let mut entries: Vec<(SessionId, (f64, DateTime<Utc>))> = inner
            .ledger
            .iter()
            .filter_map(|slot| {
                sessions
                    .iter()
                    .find(|s| s.id == slot.session)
                    .filter(|s| s.category == record.category && s.mode == record.mode)
                    .map(|s| (s.id, (s.score, s.played_at)))
            })
            .collect();
        entries.sort_by(|a, b| retention_order(&a.1, &b.1));
        let ledger_keys: Vec<(f64, DateTime<Utc>)> = entries.iter().map(|e| e.1).collect();
        let ranks = dense_ranks(&ledger_keys);
        let mut evicted = Vec::new();
        let mut rewritten = Vec::new();
        for ((session, _), new_rank) in entries.iter().zip(ranks) {
            if new_rank > 10 {
                evicted.push(*session);
            } else {
                rewritten.push((*session, new_rank));
            }
        }
        inner
            .ledger
            .retain(|slot| !evicted.contains(&slot.session));
        for slot in &mut inner.ledger {
            if let Some((_, new_rank)) = rewritten.iter().find(|(s, _)| *s == slot.session) {
                slot.rank = *new_rank;
            }
        }

        Ok(id)
    }

    async fn top_scores(
        &self,
        category: Category,
        mode: Mode,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, StorageError> {
        let inner = self.lock()?;
        let mut rows: Vec<(f64, DateTime<Utc>, String)> = inner
            .ledger
            .iter()
            .filter_map(|slot| {
                let session = inner.sessions.iter().find(|s| s.id == slot.session)?;
                if session.category != category || session.mode != mode {
                    return None;
                }
                let name = inner.players.get(session.player.value() as usize - 1)?;
                Some((session.score, session.played_at, name.clone()))
            })
            .collect();
        // Display tie-break: oldest entry first.
        rows.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        Ok(rows
            .into_iter()
            .take(limit as usize)
            .map(|(score, _, player_name)| LeaderboardEntry { player_name, score })
            .collect())
    }

    async fn high_score(
        &self,
        player: PlayerId,
        category: Category,
        mode: Mode,
    ) -> Result<f64, StorageError> {
        let inner = self.lock()?;
        let best = inner
            .ledger
            .iter()
            .filter_map(|slot| {
                inner
                    .sessions
                    .iter()
                    .find(|s| s.id == slot.session)
                    .filter(|s| s.player == player && s.category == category && s.mode == mode)
                    .map(|s| s.score)
            })
            .fold(0.0_f64, f64::max);
        Ok(best)
    }

    async fn ledger_rows(
        &self,
        category: Category,
        mode: Mode,
    ) -> Result<Vec<LedgerRow>, StorageError> {
        let inner = self.lock()?;
        let mut rows: Vec<LedgerRow> = inner
            .ledger
            .iter()
            .filter_map(|slot| {
                let session = inner.sessions.iter().find(|s| s.id == slot.session)?;
                if session.category != category || session.mode != mode {
                    return None;
                }
                Some(LedgerRow {
                    session: session.id,
                    rank: slot.rank,
                    player: session.player,
                    score: session.score,
                })
            })
            .collect();
        rows.sort_by_key(|row| (row.rank, row.session));
        Ok(rows)
    }
}

/// Aggregates the repositories behind trait objects for backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub players: Arc<dyn PlayerRepository>,
    pub scores: Arc<dyn ScoreRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let players: Arc<dyn PlayerRepository> = Arc::new(repo.clone());
        let scores: Arc<dyn ScoreRepository> = Arc::new(repo);
        Self {
            questions,
            players,
            scores,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_now;

    fn record(player: u64, score: f64, at_offset: i64) -> NewSessionRecord {
        NewSessionRecord {
            player: PlayerId::new(player),
            category: Category::Csc111,
            mode: Mode::Classic,
            score,
            played_at: fixed_now() + chrono::Duration::seconds(at_offset),
        }
    }

    #[tokio::test]
    async fn question_reload_is_idempotent() {
        let repo = InMemoryRepository::new();
        let bank = vec![Question::new("q1", "a1"), Question::new("q2", "a2")];

        assert_eq!(
            repo.insert_questions(Category::Csc111, &bank).await.unwrap(),
            2
        );
        assert_eq!(
            repo.insert_questions(Category::Csc111, &bank).await.unwrap(),
            0
        );
        // Same prompts under another category are distinct rows.
        assert_eq!(
            repo.insert_questions(Category::Csc211, &bank).await.unwrap(),
            2
        );

        let stored = repo.questions_for_category(Category::Csc111).await.unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn ensure_player_reuses_existing_identity() {
        let repo = InMemoryRepository::new();
        let first = repo.ensure_player("Ann").await.unwrap();
        let second = repo.ensure_player("Ann").await.unwrap();
        let other = repo.ensure_player("Ben").await.unwrap();
        assert_eq!(first, second);
        assert_ne!(first, other);
    }

    #[tokio::test]
    async fn stale_identical_score_is_replaced_by_the_fresh_session() {
        let repo = InMemoryRepository::new();
        repo.ensure_player("Ann").await.unwrap();

        let first = repo.record_session(record(1, 80.0, 0)).await.unwrap();
        let second = repo.record_session(record(1, 80.0, 60)).await.unwrap();
        assert_ne!(first, second);

        let rows = repo
            .ledger_rows(Category::Csc111, Mode::Classic)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].session, second);
        assert_eq!(rows[0].rank, 1);
    }

    #[tokio::test]
    async fn eleventh_ranked_score_leaves_the_ledger_unchanged() {
        let repo = InMemoryRepository::new();
        for i in 0..10_u64 {
            repo.ensure_player(&format!("p{i}")).await.unwrap();
            repo.record_session(record(i + 1, 90.0 - i as f64, i as i64))
                .await
                .unwrap();
        }
        let before = repo
            .ledger_rows(Category::Csc111, Mode::Classic)
            .await
            .unwrap();
        assert_eq!(before.len(), 10);

        repo.ensure_player("straggler").await.unwrap();
        repo.record_session(record(11, 10.0, 100)).await.unwrap();

        let after = repo
            .ledger_rows(Category::Csc111, Mode::Classic)
            .await
            .unwrap();
        assert_eq!(after, before);
    }
}
