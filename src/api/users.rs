use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::extract::AuthSession;
use crate::api::state::AppState;
use crate::auth::{self, password};
use crate::db::models::User;
use crate::db::users::{NewUser, UserSearch, UserSummary};
use crate::db::UserRepository;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The allowed mutable profile fields, and nothing else: an unknown key is
/// rejected at deserialization instead of through a runtime allow-list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub user_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchUsersQuery {
    pub search: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// Wire shape of a user record. The hashed secret and token list never leave
/// the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        UserProfile {
            id: user.id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            user_name: user.user_name.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: UserProfile,
    pub token: String,
}

fn validate_email(email: &str) -> Result<String, AppError> {
    let normalized = email.trim().to_lowercase();
    let valid = match normalized.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !normalized.contains(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(AppError::Validation("Email is invalid.".to_string()));
    }
    Ok(normalized)
}

fn validate_password(password: &str) -> Result<&str, AppError> {
    let trimmed = password.trim();
    if trimmed.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    Ok(trimmed)
}

fn validate_name(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// POST /user
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let email = validate_email(&req.email)?;
    let plaintext = validate_password(&req.password)?;
    let first_name = validate_name("firstName", &req.first_name)?;
    let last_name = validate_name("lastName", &req.last_name)?;
    let user_name = validate_name("userName", &req.user_name)?.to_lowercase();

    let password_salt = password::generate_salt();
    let password_hash = password::hash_password(plaintext, &password_salt)?;

    let user = UserRepository::create(
        &state.db,
        NewUser {
            email,
            user_name,
            first_name,
            last_name,
            password_hash,
            password_salt,
        },
    )
    .await?;

    // Registration implies login.
    let token = auth::issue_token(
        &state.db,
        &state.config.token_secret,
        state.config.token_expiry_hours,
        &user.id,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            user: UserProfile::from(&user),
            token,
        }),
    ))
}

/// POST /user/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    // One undifferentiated failure whether the email is unknown or the
    // password is wrong.
    let unable = || AppError::Validation("Unable to login".to_string());

    let email = req.email.trim().to_lowercase();
    let user = UserRepository::get_by_email(&state.db, &email)
        .await?
        .ok_or_else(unable)?;

    let matches =
        password::verify_password(req.password.trim(), &user.password_hash, &user.password_salt)?;
    if !matches {
        return Err(unable());
    }

    let token = auth::issue_token(
        &state.db,
        &state.config.token_secret,
        state.config.token_expiry_hours,
        &user.id,
    )
    .await?;

    Ok(Json(SessionResponse {
        user: UserProfile::from(&user),
        token,
    }))
}

/// POST /user/logout
pub async fn logout(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<serde_json::Value>, AppError> {
    auth::revoke_token(&state.db, &session.user.id, &session.token).await?;
    Ok(Json(serde_json::json!({})))
}

/// GET /user
pub async fn me(session: AuthSession) -> Json<UserProfile> {
    Json(UserProfile::from(&session.user))
}

/// PATCH /user
pub async fn update(
    State(state): State<AppState>,
    session: AuthSession,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserProfile>, AppError> {
    let mut user = session.user;

    if let Some(email) = &req.email {
        user.email = validate_email(email)?;
    }
    if let Some(first_name) = &req.first_name {
        user.first_name = validate_name("firstName", first_name)?;
    }
    if let Some(last_name) = &req.last_name {
        user.last_name = validate_name("lastName", last_name)?;
    }
    if let Some(user_name) = &req.user_name {
        user.user_name = validate_name("userName", user_name)?.to_lowercase();
    }
    if let Some(plaintext) = &req.password {
        // Re-hash only when the secret itself changes.
        let plaintext = validate_password(plaintext)?;
        let salt = password::generate_salt();
        user.password_hash = password::hash_password(plaintext, &salt)?.to_vec();
        user.password_salt = salt.to_vec();
    }

    let updated = UserRepository::update(&state.db, &user).await?;
    Ok(Json(UserProfile::from(&updated)))
}

/// DELETE /user
pub async fn delete(
    State(state): State<AppState>,
    session: AuthSession,
) -> Result<Json<UserProfile>, AppError> {
    UserRepository::delete_with_tokens(&state.db, &session.user.id).await?;
    Ok(Json(UserProfile::from(&session.user)))
}

/// GET /users
pub async fn search(
    State(state): State<AppState>,
    _session: AuthSession,
    Query(query): Query<SearchUsersQuery>,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    let search = UserSearch::parse(
        query.search.as_deref(),
        query.sort_by.as_deref(),
        query.skip,
        query.limit,
    )?;

    let users = UserRepository::search(&state.db, &search).await?;
    Ok(Json(users))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert_eq!(
            validate_email("  Ada@Example.COM ").unwrap(),
            "ada@example.com"
        );
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ada@nodot").is_err());
        assert!(validate_email("ada@.com").is_err());
    }

    #[test]
    fn test_validate_password_minimum_length() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }

    #[test]
    fn test_validate_name_rejects_blank() {
        assert!(validate_name("firstName", "   ").is_err());
        assert_eq!(validate_name("firstName", " Ada ").unwrap(), "Ada");
    }

    #[test]
    fn test_update_request_rejects_unknown_fields() {
        let err = serde_json::from_str::<UpdateUserRequest>(r#"{"id": "forged"}"#);
        assert!(err.is_err());

        let ok = serde_json::from_str::<UpdateUserRequest>(r#"{"firstName": "Ada"}"#);
        assert!(ok.is_ok());
    }

    use crate::api::testing;
    use crate::auth::token;

    fn register_request(email: &str, user_name: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "hunter2hunter2".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            user_name: user_name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_hashes_secret_and_issues_token() {
        let state = testing::state().await;

        let (status, Json(session)) = register(
            State(state.clone()),
            Json(register_request("ada@example.com", "Ada")),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert!(!session.token.is_empty());
        assert_eq!(session.user.user_name, "ada");

        // Stored secret is a hash, never the plaintext.
        let stored = UserRepository::get_by_email(&state.db, "ada@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_ne!(stored.password_hash, b"hunter2hunter2".to_vec());

        // The wire shape never carries the secret field.
        let body = serde_json::to_value(&session).unwrap();
        assert!(body["user"].get("password").is_none());
        assert!(body["user"].get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn test_login_failure_is_undifferentiated() {
        let state = testing::state().await;
        register(
            State(state.clone()),
            Json(register_request("ada@example.com", "ada")),
        )
        .await
        .unwrap();

        let unknown_email = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "nobody@example.com".to_string(),
                password: "hunter2hunter2".to_string(),
            }),
        )
        .await;
        let wrong_password = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "ada@example.com".to_string(),
                password: "wrong-password".to_string(),
            }),
        )
        .await;

        for result in [unknown_email, wrong_password] {
            match result {
                Err(AppError::Validation(msg)) => assert_eq!(msg, "Unable to login"),
                _ => panic!("expected uniform login failure"),
            }
        }
    }

    #[tokio::test]
    async fn test_token_valid_until_revoked() {
        let state = testing::state().await;
        let (_, Json(session)) = register(
            State(state.clone()),
            Json(register_request("ada@example.com", "ada")),
        )
        .await
        .unwrap();

        // Signature checks out and the token row exists.
        let claims = token::verify(&state.config.token_secret, &session.token).unwrap();
        assert_eq!(claims.sub, session.user.id);
        assert!(
            UserRepository::get_authenticated(&state.db, &claims.sub, &session.token)
                .await
                .unwrap()
                .is_some()
        );

        // Logout revokes exactly this token; the identical string now fails
        // the revocation-list check even though its signature is still valid.
        let auth = AuthSession {
            user: UserRepository::get_by_id(&state.db, &session.user.id)
                .await
                .unwrap()
                .unwrap(),
            token: session.token.clone(),
        };
        logout(State(state.clone()), auth).await.unwrap();

        assert!(token::verify(&state.config.token_secret, &session.token).is_ok());
        assert!(
            UserRepository::get_authenticated(&state.db, &session.user.id, &session.token)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_update_rehashes_password() {
        let state = testing::state().await;
        let (_, Json(session)) = register(
            State(state.clone()),
            Json(register_request("ada@example.com", "ada")),
        )
        .await
        .unwrap();
        let before = UserRepository::get_by_id(&state.db, &session.user.id)
            .await
            .unwrap()
            .unwrap();

        let auth = AuthSession {
            user: before.clone(),
            token: session.token.clone(),
        };
        update(
            State(state.clone()),
            auth,
            Json(UpdateUserRequest {
                email: None,
                password: Some("correct-horse-battery".to_string()),
                first_name: Some("Augusta".to_string()),
                last_name: None,
                user_name: None,
            }),
        )
        .await
        .unwrap();

        let after = UserRepository::get_by_id(&state.db, &session.user.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.first_name, "Augusta");
        assert_ne!(after.password_hash, before.password_hash);

        // The new secret logs in, the old one does not.
        assert!(login(
            State(state.clone()),
            Json(LoginRequest {
                email: "ada@example.com".to_string(),
                password: "correct-horse-battery".to_string(),
            }),
        )
        .await
        .is_ok());
        assert!(login(
            State(state.clone()),
            Json(LoginRequest {
                email: "ada@example.com".to_string(),
                password: "hunter2hunter2".to_string(),
            }),
        )
        .await
        .is_err());
    }

    #[tokio::test]
    async fn test_delete_removes_account_and_tokens() {
        let state = testing::state().await;
        let (_, Json(session)) = register(
            State(state.clone()),
            Json(register_request("ada@example.com", "ada")),
        )
        .await
        .unwrap();

        let auth = AuthSession {
            user: UserRepository::get_by_id(&state.db, &session.user.id)
                .await
                .unwrap()
                .unwrap(),
            token: session.token.clone(),
        };
        delete(State(state.clone()), auth).await.unwrap();

        assert!(UserRepository::get_by_id(&state.db, &session.user.id)
            .await
            .unwrap()
            .is_none());
        assert!(
            UserRepository::get_authenticated(&state.db, &session.user.id, &session.token)
                .await
                .unwrap()
                .is_none()
        );
    }
}
