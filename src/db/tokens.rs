use sqlx::{Pool, Sqlite};

use crate::db::now_millis;
use crate::error::AppError;

pub struct TokenRepository;

impl TokenRepository {
    pub async fn insert(
        pool: &Pool<Sqlite>,
        user_id: &str,
        token: &str,
    ) -> Result<(), AppError> {
        sqlx::query("INSERT INTO tokens (user_id, token, created_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(token)
            .bind(now_millis())
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Idempotent: deleting an absent token affects zero rows and succeeds.
    pub async fn delete(
        pool: &Pool<Sqlite>,
        user_id: &str,
        token: &str,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM tokens WHERE user_id = ? AND token = ?")
            .bind(user_id)
            .bind(token)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Drop token rows whose signed lifetime has elapsed. The signature check
    /// already rejects them; this keeps the table from growing unbounded.
    pub async fn purge_issued_before(
        pool: &Pool<Sqlite>,
        cutoff_millis: i64,
    ) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM tokens WHERE created_at <= ?")
            .bind(cutoff_millis)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
