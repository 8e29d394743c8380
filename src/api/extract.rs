use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::api::state::AppState;
use crate::auth::token;
use crate::db::models::User;
use crate::db::UserRepository;
use crate::error::AppError;

/// The authenticated caller, threaded explicitly into handlers.
///
/// Carries the raw token alongside the user so logout can revoke exactly the
/// credential the request presented. Extraction is read-only: signature and
/// expiry are checked first, then the token must still be present in the
/// user's active-token list (revocation wins over a valid signature).
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Auth("Missing Authorization header".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Auth("Invalid Authorization format".to_string()))?;

        let claims = token::verify(&state.config.token_secret, token)?;

        let user = UserRepository::get_authenticated(&state.db, &claims.sub, token)
            .await?
            .ok_or_else(|| AppError::Auth("Revoked or unknown token".to_string()))?;

        Ok(AuthSession {
            user,
            token: token.to_string(),
        })
    }
}
