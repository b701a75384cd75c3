use quiz_core::model::{Category, Question};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{category_id, conn_err, ser};
use crate::repository::{QuestionRepository, StorageError};

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn insert_questions(
        &self,
        category: Category,
        questions: &[Question],
    ) -> Result<u64, StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn_err)?;
        let category_id = category_id(&mut *tx, category).await?;

        let mut inserted = 0_u64;
        for question in questions {
            let result = sqlx::query(
                r"
                INSERT INTO questions (category_id, prompt, answer)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(category_id, prompt) DO NOTHING
                ",
            )
            .bind(category_id)
            .bind(question.prompt())
            .bind(question.answer())
            .execute(&mut *tx)
            .await
            .map_err(conn_err)?;
            inserted += result.rows_affected();
        }

        tx.commit().await.map_err(conn_err)?;
        Ok(inserted)
    }

    async fn questions_for_category(
        &self,
        category: Category,
    ) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT q.prompt, q.answer
            FROM questions q
            JOIN categories c ON c.id = q.category_id
            WHERE c.name = ?1
            ORDER BY RANDOM()
            ",
        )
        .bind(category.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn_err)?;

        let mut bank = Vec::with_capacity(rows.len());
        for row in rows {
            bank.push(Question::new(
                row.try_get::<String, _>("prompt").map_err(ser)?,
                row.try_get::<String, _>("answer").map_err(ser)?,
            ));
        }
        Ok(bank)
    }
}
