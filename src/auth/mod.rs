pub mod password;
pub mod token;

use sqlx::{Pool, Sqlite};

use crate::db::TokenRepository;
use crate::error::AppError;

/// Sign a fresh session token for `user_id` and record it in the user's
/// active-token list. Every call produces a distinct token string.
pub async fn issue_token(
    pool: &Pool<Sqlite>,
    secret: &str,
    expiry_hours: i64,
    user_id: &str,
) -> Result<String, AppError> {
    let token = token::sign(secret, expiry_hours, user_id)?;
    TokenRepository::insert(pool, user_id, &token).await?;
    Ok(token)
}

/// Remove `token` from the user's active list. Removing an absent token is a
/// no-op, not an error.
pub async fn revoke_token(
    pool: &Pool<Sqlite>,
    user_id: &str,
    token: &str,
) -> Result<(), AppError> {
    TokenRepository::delete(pool, user_id, token).await
}
