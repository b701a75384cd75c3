use quiz_core::model::{Category, Mode, PlayerId, SessionId};
use sqlx::{Row, SqliteConnection};

use crate::repository::StorageError;

pub(crate) fn conn_err<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn player_id_to_i64(id: PlayerId) -> Result<i64, StorageError> {
    i64::try_from(id.value())
        .map_err(|_| StorageError::Serialization("player_id overflow".into()))
}

pub(crate) fn player_id_from_i64(v: i64) -> Result<PlayerId, StorageError> {
    u64::try_from(v)
        .map(PlayerId::new)
        .map_err(|_| StorageError::Serialization(format!("invalid player_id: {v}")))
}

pub(crate) fn session_id_from_i64(v: i64) -> Result<SessionId, StorageError> {
    u64::try_from(v)
        .map(SessionId::new)
        .map_err(|_| StorageError::Serialization(format!("invalid session_id: {v}")))
}

pub(crate) fn rank_from_i64(v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid rank: {v}")))
}

/// Resolves the reference-table id for a category. The row is seeded by
/// the migration; its absence is an integrity failure, not a default.
pub(crate) async fn category_id(
    conn: &mut SqliteConnection,
    category: Category,
) -> Result<i64, StorageError> {
    let row = sqlx::query("SELECT id FROM categories WHERE name = ?1")
        .bind(category.as_str())
        .fetch_optional(&mut *conn)
        .await
        .map_err(conn_err)?;
    row.ok_or(StorageError::NotFound)?.try_get("id").map_err(ser)
}

pub(crate) async fn mode_id(conn: &mut SqliteConnection, mode: Mode) -> Result<i64, StorageError> {
    let row = sqlx::query("SELECT id FROM modes WHERE name = ?1")
        .bind(mode.as_str())
        .fetch_optional(&mut *conn)
        .await
        .map_err(conn_err)?;
    row.ok_or(StorageError::NotFound)?.try_get("id").map_err(ser)
}
