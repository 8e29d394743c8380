use sqlx::{Pool, QueryBuilder, Sqlite};
use uuid::Uuid;

use crate::db::models::User;
use crate::db::now_millis;
use crate::error::AppError;

pub struct NewUser {
    pub email: String,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: [u8; 32],
    pub password_salt: [u8; 32],
}

/// Search directive for the user listing endpoint: case-insensitive substring
/// clauses over a fixed set of columns, optional single-column sort.
pub struct UserSearch {
    pub clauses: Vec<(&'static str, String)>,
    pub sort: Option<(&'static str, bool)>,
    pub skip: i64,
    pub limit: Option<i64>,
}

#[derive(Debug, sqlx::FromRow, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
}

fn searchable_column(field: &str) -> Result<&'static str, AppError> {
    match field {
        "firstName" => Ok("first_name"),
        "lastName" => Ok("last_name"),
        "userName" => Ok("user_name"),
        other => Err(AppError::Validation(format!(
            "Unknown search field: {}",
            other
        ))),
    }
}

impl UserSearch {
    /// Parse `search=field1|field2:text` and `sortBy=field:asc|desc`.
    pub fn parse(
        search: Option<&str>,
        sort_by: Option<&str>,
        skip: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Self, AppError> {
        let mut clauses = Vec::new();
        if let Some(raw) = search {
            let (fields, text) = raw
                .split_once(':')
                .ok_or_else(|| AppError::Validation("Malformed search parameter".to_string()))?;
            for field in fields.split('|') {
                clauses.push((searchable_column(field)?, text.to_string()));
            }
        }

        let sort = match sort_by {
            Some(raw) => {
                let (field, direction) = raw
                    .split_once(':')
                    .ok_or_else(|| AppError::Validation("Malformed sortBy parameter".to_string()))?;
                Some((searchable_column(field)?, direction == "asc"))
            }
            None => None,
        };

        let skip = skip.unwrap_or(0);
        if skip < 0 {
            return Err(AppError::Validation("skip must be non-negative".to_string()));
        }
        if let Some(limit) = limit {
            if limit <= 0 {
                return Err(AppError::Validation("limit must be positive".to_string()));
            }
        }

        Ok(UserSearch {
            clauses,
            sort,
            skip,
            limit,
        })
    }
}

pub struct UserRepository;

impl UserRepository {
    pub async fn create(pool: &Pool<Sqlite>, new: NewUser) -> Result<User, AppError> {
        let id = Uuid::new_v4().to_string();
        let now = now_millis();

        let user = sqlx::query_as::<_, User>(
            r#"
INSERT INTO users (id, email, user_name, first_name, last_name, password_hash, password_salt, created_at, updated_at)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&new.email)
        .bind(&new.user_name)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(new.password_hash.as_slice())
        .bind(new.password_salt.as_slice())
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(user)
    }

    pub async fn get_by_email(
        pool: &Pool<Sqlite>,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    pub async fn get_by_id(pool: &Pool<Sqlite>, id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// The authenticated lookup: the user must match the token subject AND
    /// still hold the exact token string. A revoked token finds nothing even
    /// while its signature validates.
    pub async fn get_authenticated(
        pool: &Pool<Sqlite>,
        id: &str,
        token: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
SELECT u.* FROM users u
JOIN tokens t ON t.user_id = u.id
WHERE u.id = ? AND t.token = ?
            "#,
        )
        .bind(id)
        .bind(token)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Write back every mutable column. `updated_at` is bumped here.
    pub async fn update(pool: &Pool<Sqlite>, user: &User) -> Result<User, AppError> {
        let updated = sqlx::query_as::<_, User>(
            r#"
UPDATE users
SET email = ?, user_name = ?, first_name = ?, last_name = ?,
    password_hash = ?, password_salt = ?, updated_at = ?
WHERE id = ?
RETURNING *
            "#,
        )
        .bind(&user.email)
        .bind(&user.user_name)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(&user.password_salt)
        .bind(now_millis())
        .bind(&user.id)
        .fetch_one(pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(updated)
    }

    /// Delete the user and the token rows it owns, atomically. Authored
    /// messages are preserved; listing tolerates the dangling sender.
    pub async fn delete_with_tokens(pool: &Pool<Sqlite>, id: &str) -> Result<(), AppError> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM tokens WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn search(
        pool: &Pool<Sqlite>,
        search: &UserSearch,
    ) -> Result<Vec<UserSummary>, AppError> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, first_name, last_name, user_name FROM users",
        );

        let mut clauses = search.clauses.iter();
        if let Some((column, text)) = clauses.next() {
            qb.push(" WHERE (")
                .push(*column)
                .push(" LIKE ")
                .push_bind(format!("%{}%", text));
            for (column, text) in clauses {
                qb.push(" OR ")
                    .push(*column)
                    .push(" LIKE ")
                    .push_bind(format!("%{}%", text));
            }
            qb.push(")");
        }

        if let Some((column, ascending)) = search.sort {
            qb.push(" ORDER BY ")
                .push(column)
                .push(if ascending { " ASC" } else { " DESC" });
        }

        qb.push(" LIMIT ").push_bind(search.limit.unwrap_or(-1));
        qb.push(" OFFSET ").push_bind(search.skip);

        let users = qb.build_query_as::<UserSummary>().fetch_all(pool).await?;
        Ok(users)
    }
}

fn map_unique_violation(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Validation("email or user name already in use".to_string())
        }
        _ => AppError::Database(err),
    }
}
