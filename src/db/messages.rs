use sqlx::{Pool, QueryBuilder, Sqlite};
use uuid::Uuid;

use crate::db::filter::MessageFilter;
use crate::db::models::{Message, MessageRow};
use crate::db::now_millis;
use crate::error::AppError;

const LIST_SELECT: &str = r#"
SELECT m.id, m.text, m.updated_at, m.sender_id,
       su.first_name AS sender_first_name, su.last_name AS sender_last_name,
       m.receiver_id,
       ru.first_name AS receiver_first_name, ru.last_name AS receiver_last_name
FROM messages m
LEFT JOIN users su ON su.id = m.sender_id
LEFT JOIN users ru ON ru.id = m.receiver_id
WHERE "#;

pub struct MessageRepository;

impl MessageRepository {
    pub async fn create(
        pool: &Pool<Sqlite>,
        sender_id: &str,
        receiver_id: Option<&str>,
        text: &str,
    ) -> Result<Message, AppError> {
        let id = Uuid::new_v4().to_string();
        let now = now_millis();

        let message = sqlx::query_as::<_, Message>(
            r#"
INSERT INTO messages (id, sender_id, receiver_id, text, created_at, updated_at)
VALUES (?, ?, ?, ?, ?, ?)
RETURNING *
            "#,
        )
        .bind(&id)
        .bind(sender_id)
        .bind(receiver_id)
        .bind(text)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(message)
    }

    /// Matching messages, newest update first, with sender/receiver names
    /// resolved in the same query. LEFT JOINs: a deleted participant yields
    /// NULL name columns for that row, never a missing row.
    pub async fn list(
        pool: &Pool<Sqlite>,
        filter: &MessageFilter,
    ) -> Result<Vec<MessageRow>, AppError> {
        let mut qb = QueryBuilder::<Sqlite>::new(LIST_SELECT);
        filter.push_predicate(&mut qb);

        qb.push(" ORDER BY m.updated_at DESC");
        qb.push(" LIMIT ").push_bind(filter.limit.unwrap_or(-1));
        qb.push(" OFFSET ").push_bind(filter.skip);

        let rows = qb.build_query_as::<MessageRow>().fetch_all(pool).await?;
        Ok(rows)
    }

    /// Total matches for the same predicate, ignoring skip/limit. Kept as its
    /// own query: a paginated page length says nothing about the true total.
    pub async fn count(pool: &Pool<Sqlite>, filter: &MessageFilter) -> Result<i64, AppError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM messages m WHERE ");
        filter.push_predicate(&mut qb);

        let total = qb.build_query_scalar::<i64>().fetch_one(pool).await?;
        Ok(total)
    }
}
