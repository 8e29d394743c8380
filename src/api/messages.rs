use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::extract::AuthSession;
use crate::api::state::AppState;
use crate::db::filter::{parse_peer, ConversationScope, ListParams, MessageFilter};
use crate::db::models::MessageRow;
use crate::db::{MessageRepository, UserRepository};
use crate::error::AppError;

const MAX_TEXT_CHARS: usize = 280;

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageCreated {
    pub id: String,
    pub text: String,
    pub sender_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<String>,
    pub updated_at: i64,
}

/// Wire shape of one listing result. Receiver fields appear only for
/// private-thread listings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: String,
    pub text: String,
    pub updated_at: i64,
    pub sender_id: String,
    pub sender_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub results: Vec<MessageView>,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub total: i64,
}

fn validate_text(text: &str) -> Result<&str, AppError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("text is required".to_string()));
    }
    if trimmed.chars().count() > MAX_TEXT_CHARS {
        return Err(AppError::Validation(format!(
            "text must be at most {} characters",
            MAX_TEXT_CHARS
        )));
    }
    Ok(trimmed)
}

fn project(rows: Vec<MessageRow>, include_receiver: bool) -> Vec<MessageView> {
    rows.into_iter()
        .map(|row| {
            let sender_name = row.sender_name();
            let (receiver_id, receiver_name) = if include_receiver {
                (row.receiver_id.clone(), Some(row.receiver_name()))
            } else {
                (None, None)
            };
            MessageView {
                id: row.id,
                text: row.text,
                updated_at: row.updated_at,
                sender_id: row.sender_id,
                sender_name,
                receiver_id,
                receiver_name,
            }
        })
        .collect()
}

/// POST /message
pub async fn post_public(
    State(state): State<AppState>,
    session: AuthSession,
    Json(req): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<MessageCreated>), AppError> {
    let text = validate_text(&req.text)?;

    let message = MessageRepository::create(&state.db, &session.user.id, None, text).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageCreated {
            id: message.id,
            text: message.text,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            updated_at: message.updated_at,
        }),
    ))
}

/// POST /message/:peer_id
pub async fn post_private(
    State(state): State<AppState>,
    session: AuthSession,
    Path(peer_id): Path<String>,
    Json(req): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<MessageCreated>), AppError> {
    let text = validate_text(&req.text)?;

    // Syntactic check before any store access, then resolve the peer. Both
    // failures surface as the same generic bad request.
    let peer_id = parse_peer(&peer_id)?;
    UserRepository::get_by_id(&state.db, &peer_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let message =
        MessageRepository::create(&state.db, &session.user.id, Some(&peer_id), text).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageCreated {
            id: message.id,
            text: message.text,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            updated_at: message.updated_at,
        }),
    ))
}

/// GET /messages
pub async fn list_public(
    State(state): State<AppState>,
    _session: AuthSession,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, AppError> {
    let filter = MessageFilter::build(ConversationScope::Public, &params)?;

    let rows = MessageRepository::list(&state.db, &filter).await?;
    let total = MessageRepository::count(&state.db, &filter).await?;

    Ok(Json(ListResponse {
        results: project(rows, false),
        total,
    }))
}

/// GET /messages/:peer_id
pub async fn list_thread(
    State(state): State<AppState>,
    session: AuthSession,
    Path(peer_id): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, AppError> {
    let scope = ConversationScope::thread(&session.user.id, &peer_id)?;
    let filter = MessageFilter::build(scope, &params)?;

    let rows = MessageRepository::list(&state.db, &filter).await?;
    let total = MessageRepository::count(&state.db, &filter).await?;

    Ok(Json(ListResponse {
        results: project(rows, true),
        total,
    }))
}

/// GET /messages/count
pub async fn count_public(
    State(state): State<AppState>,
    _session: AuthSession,
    Query(params): Query<ListParams>,
) -> Result<Json<CountResponse>, AppError> {
    let filter = MessageFilter::build(ConversationScope::Public, &params)?;
    let total = MessageRepository::count(&state.db, &filter).await?;
    Ok(Json(CountResponse { total }))
}

/// GET /messages/:peer_id/count
pub async fn count_thread(
    State(state): State<AppState>,
    session: AuthSession,
    Path(peer_id): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<CountResponse>, AppError> {
    let scope = ConversationScope::thread(&session.user.id, &peer_id)?;
    let filter = MessageFilter::build(scope, &params)?;
    let total = MessageRepository::count(&state.db, &filter).await?;
    Ok(Json(CountResponse { total }))
}
