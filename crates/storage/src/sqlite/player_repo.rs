use chrono::Utc;
use quiz_core::model::PlayerId;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn_err, player_id_from_i64, ser};
use crate::repository::{PlayerRepository, StorageError};

#[async_trait::async_trait]
impl PlayerRepository for SqliteRepository {
    async fn ensure_player(&self, name: &str) -> Result<PlayerId, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn_err)?;

        let existing = sqlx::query("SELECT id FROM players WHERE name = ?1")
            .bind(name)
            .fetch_optional(&mut *tx)
            .await
            .map_err(conn_err)?;

        let id = match existing {
            Some(row) => row.try_get::<i64, _>("id").map_err(ser)?,
            None => sqlx::query("INSERT INTO players (name, created_at) VALUES (?1, ?2)")
                .bind(name)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await
                .map_err(conn_err)?
                .last_insert_rowid(),
        };

        tx.commit().await.map_err(conn_err)?;
        player_id_from_i64(id)
    }
}
