use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: Vec<u8>,
    #[serde(skip_serializing)]
    pub password_salt: Vec<u8>,
    #[serde(skip_serializing)]
    pub avatar: Option<Vec<u8>>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: Option<String>,
    pub text: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One listing-query result row: a message joined with the sender's (and
/// receiver's) name columns. Name columns are nullable because the referenced
/// user may have been deleted.
#[derive(Debug, Clone, FromRow)]
pub struct MessageRow {
    pub id: String,
    pub text: String,
    pub updated_at: i64,
    pub sender_id: String,
    pub sender_first_name: Option<String>,
    pub sender_last_name: Option<String>,
    pub receiver_id: Option<String>,
    pub receiver_first_name: Option<String>,
    pub receiver_last_name: Option<String>,
}

impl MessageRow {
    /// "first last", or empty when the referenced user no longer exists.
    pub fn sender_name(&self) -> String {
        join_name(&self.sender_first_name, &self.sender_last_name)
    }

    pub fn receiver_name(&self) -> String {
        join_name(&self.receiver_first_name, &self.receiver_last_name)
    }
}

fn join_name(first: &Option<String>, last: &Option<String>) -> String {
    match (first, last) {
        (Some(f), Some(l)) => format!("{} {}", f, l),
        _ => String::new(),
    }
}
