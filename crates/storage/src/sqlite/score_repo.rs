use quiz_core::model::{Category, Mode, PlayerId, SessionId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    category_id, conn_err, mode_id, player_id_from_i64, player_id_to_i64, rank_from_i64,
    session_id_from_i64, ser,
};
use crate::repository::{LeaderboardEntry, LedgerRow, NewSessionRecord, ScoreRepository, StorageError};

#[async_trait::async_trait]
impl ScoreRepository for SqliteRepository {
    /// Appends the session and maintains the top-10 ledger in one
    /// transaction. Rank computation is two-phase on purpose: the new
    /// session is ranked against ALL sessions of the pair, while the
    /// final eviction re-ranks within the ledger only. Collapsing the
    /// two changes behavior at the rank-10 boundary.
    async fn record_session(&self, record: NewSessionRecord) -> Result<SessionId, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn_err)?;

        let category_id = category_id(&mut *tx, record.category).await?;
        let mode_id = mode_id(&mut *tx, record.mode).await?;
        let player_id = player_id_to_i64(record.player)?;

        let session_id = sqlx::query(
            r"
            INSERT INTO sessions (player_id, category_id, mode_id, score, played_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(player_id)
        .bind(category_id)
        .bind(mode_id)
        .bind(record.score)
        .bind(record.played_at)
        .execute(&mut *tx)
        .await
        .map_err(conn_err)?
        .last_insert_rowid();

        // Dense rank among all sessions of the pair, newest-first on
        // ties. The freshly inserted row must be visible here.
        let rank_row = sqlx::query(
            r"
            WITH ranked AS (
                SELECT
                    id,
                    DENSE_RANK() OVER (ORDER BY score DESC, played_at DESC) AS rank
                FROM sessions
                WHERE category_id = ?1 AND mode_id = ?2
            )
            SELECT rank FROM ranked WHERE id = ?3
            ",
        )
        .bind(category_id)
        .bind(mode_id)
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(conn_err)?;
        let rank: i64 = rank_row
            .ok_or(StorageError::NotFound)?
            .try_get("rank")
            .map_err(ser)?;

        if rank <= 10 {
            // The player's stale tie at the same score is replaced by
            // the fresh session; older same-score entries leave the
            // ledger but stay in the session history.
            sqlx::query(
                r"
                DELETE FROM high_scores
                WHERE session_id IN (
                    SELECT hs.session_id
                    FROM high_scores hs
                    JOIN sessions s ON s.id = hs.session_id
                    WHERE s.player_id = ?1
                      AND s.category_id = ?2
                      AND s.mode_id = ?3
                      AND s.score = ?4
                      AND s.id < ?5
                )
                ",
            )
            .bind(player_id)
            .bind(category_id)
            .bind(mode_id)
            .bind(record.score)
            .bind(session_id)
            .execute(&mut *tx)
            .await
            .map_err(conn_err)?;

            sqlx::query("INSERT INTO high_scores (session_id, rank) VALUES (?1, ?2)")
                .bind(session_id)
                .bind(rank)
                .execute(&mut *tx)
                .await
                .map_err(conn_err)?;

            // Re-rank within the ledger only; evict anything past 10,
            // then rewrite the surviving ranks so the stored ledger
            // stays a contiguous dense ranking.
            sqlx::query(
                r"
                WITH ranked AS (
                    SELECT
                        hs.id AS high_score_id,
                        DENSE_RANK() OVER (ORDER BY s.score DESC, s.played_at DESC) AS new_rank
                    FROM high_scores hs
                    JOIN sessions s ON s.id = hs.session_id
                    WHERE s.category_id = ?1 AND s.mode_id = ?2
                )
                DELETE FROM high_scores
                WHERE id IN (
                    SELECT high_score_id FROM ranked WHERE new_rank > 10
                )
                ",
            )
            .bind(category_id)
            .bind(mode_id)
            .execute(&mut *tx)
            .await
            .map_err(conn_err)?;

            sqlx::query(
                r"
                WITH ranked AS (
                    SELECT
                        hs.id AS high_score_id,
                        DENSE_RANK() OVER (ORDER BY s.score DESC, s.played_at DESC) AS new_rank
                    FROM high_scores hs
                    JOIN sessions s ON s.id = hs.session_id
                    WHERE s.category_id = ?1 AND s.mode_id = ?2
                )
                UPDATE high_scores
                SET rank = (
                    SELECT new_rank FROM ranked WHERE ranked.high_score_id = high_scores.id
                )
                WHERE id IN (SELECT high_score_id FROM ranked)
                ",
            )
            .bind(category_id)
            .bind(mode_id)
            .execute(&mut *tx)
            .await
            .map_err(conn_err)?;
        }

        tx.commit().await.map_err(conn_err)?;
        session_id_from_i64(session_id)
    }

    async fn top_scores(
        &self,
        category: Category,
        mode: Mode,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT p.name AS player_name, s.score
            FROM high_scores hs
            JOIN sessions s ON s.id = hs.session_id
            JOIN players p ON p.id = s.player_id
            JOIN categories c ON c.id = s.category_id
            JOIN modes m ON m.id = s.mode_id
            WHERE c.name = ?1 AND m.name = ?2
            ORDER BY s.score DESC, s.played_at ASC
            LIMIT ?3
            ",
        )
        .bind(category.as_str())
        .bind(mode.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn_err)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push(LeaderboardEntry {
                player_name: row.try_get("player_name").map_err(ser)?,
                score: row.try_get("score").map_err(ser)?,
            });
        }
        Ok(entries)
    }

    async fn high_score(
        &self,
        player: PlayerId,
        category: Category,
        mode: Mode,
    ) -> Result<f64, StorageError> {
        let row = sqlx::query(
            r"
            SELECT s.score
            FROM high_scores hs
            JOIN sessions s ON s.id = hs.session_id
            JOIN categories c ON c.id = s.category_id
            JOIN modes m ON m.id = s.mode_id
            WHERE s.player_id = ?1 AND c.name = ?2 AND m.name = ?3
            ORDER BY s.score DESC
            LIMIT 1
            ",
        )
        .bind(player_id_to_i64(player)?)
        .bind(category.as_str())
        .bind(mode.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn_err)?;

        match row {
            Some(row) => row.try_get("score").map_err(ser),
            None => Ok(0.0),
        }
    }

    async fn ledger_rows(
        &self,
        category: Category,
        mode: Mode,
    ) -> Result<Vec<LedgerRow>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT hs.session_id, hs.rank, s.player_id, s.score
            FROM high_scores hs
            JOIN sessions s ON s.id = hs.session_id
            JOIN categories c ON c.id = s.category_id
            JOIN modes m ON m.id = s.mode_id
            WHERE c.name = ?1 AND m.name = ?2
            ORDER BY hs.rank ASC, hs.session_id ASC
            ",
        )
        .bind(category.as_str())
        .bind(mode.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn_err)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(LedgerRow {
                session: session_id_from_i64(row.try_get("session_id").map_err(ser)?)?,
                rank: rank_from_i64(row.try_get("rank").map_err(ser)?)?,
                player: player_id_from_i64(row.try_get("player_id").map_err(ser)?)?,
                score: row.try_get("score").map_err(ser)?,
            });
        }
        Ok(out)
    }
}
