use chrono::DateTime;
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

use crate::error::AppError;

/// Which conversation a listing request targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationScope {
    /// Broadcast messages: no receiver.
    Public,
    /// The bidirectional thread between the caller and one peer.
    Thread { user_id: String, peer_id: String },
}

impl ConversationScope {
    /// Thread scope from a raw peer path segment. The peer must parse as a
    /// UUID before any store access happens.
    pub fn thread(user_id: &str, peer_id: &str) -> Result<Self, AppError> {
        Ok(ConversationScope::Thread {
            user_id: user_id.to_string(),
            peer_id: parse_peer(peer_id)?,
        })
    }
}

/// Syntactic check on a peer reference. Failure is indistinguishable from an
/// unknown peer on the wire.
pub fn parse_peer(peer_id: &str) -> Result<String, AppError> {
    Uuid::parse_str(peer_id)
        .map(|id| id.to_string())
        .map_err(|_| AppError::NotFound)
}

/// Raw listing query parameters as they arrive on the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub before: Option<String>,
    pub after: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// A normalized message predicate plus ordering/pagination directive.
///
/// Ordering is fixed: most-recently-updated first. `skip`/`limit` apply after
/// that sort; the count query ignores them but honors the time window.
#[derive(Debug, Clone)]
pub struct MessageFilter {
    pub scope: ConversationScope,
    pub before: Option<i64>,
    pub after: Option<i64>,
    pub skip: i64,
    pub limit: Option<i64>,
}

impl MessageFilter {
    pub fn build(scope: ConversationScope, params: &ListParams) -> Result<Self, AppError> {
        let before = params.before.as_deref().map(parse_time_bound).transpose()?;
        let after = params.after.as_deref().map(parse_time_bound).transpose()?;

        let skip = params.skip.unwrap_or(0);
        if skip < 0 {
            return Err(AppError::Validation("skip must be non-negative".to_string()));
        }

        if let Some(limit) = params.limit {
            if limit <= 0 {
                return Err(AppError::Validation("limit must be positive".to_string()));
            }
        }

        Ok(MessageFilter {
            scope,
            before,
            after,
            skip,
            limit: params.limit,
        })
    }

    /// Append the WHERE body for this filter. The caller has already pushed
    /// `WHERE `; this never leaves it empty.
    pub fn push_predicate(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        match &self.scope {
            ConversationScope::Public => {
                qb.push("m.receiver_id IS NULL");
            }
            ConversationScope::Thread { user_id, peer_id } => {
                qb.push("((m.sender_id = ")
                    .push_bind(user_id.clone())
                    .push(" AND m.receiver_id = ")
                    .push_bind(peer_id.clone())
                    .push(") OR (m.sender_id = ")
                    .push_bind(peer_id.clone())
                    .push(" AND m.receiver_id = ")
                    .push_bind(user_id.clone())
                    .push("))");
            }
        }

        if let Some(before) = self.before {
            qb.push(" AND m.updated_at < ").push_bind(before);
        }

        if let Some(after) = self.after {
            qb.push(" AND m.updated_at > ").push_bind(after);
        }
    }
}

fn parse_time_bound(raw: &str) -> Result<i64, AppError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.timestamp_millis())
        .map_err(|_| AppError::Validation(format!("Invalid timestamp: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(
        before: Option<&str>,
        after: Option<&str>,
        skip: Option<i64>,
        limit: Option<i64>,
    ) -> ListParams {
        ListParams {
            before: before.map(String::from),
            after: after.map(String::from),
            skip,
            limit,
        }
    }

    #[test]
    fn test_defaults() {
        let filter =
            MessageFilter::build(ConversationScope::Public, &ListParams::default()).unwrap();

        assert_eq!(filter.skip, 0);
        assert_eq!(filter.limit, None);
        assert_eq!(filter.before, None);
        assert_eq!(filter.after, None);
    }

    #[test]
    fn test_time_bounds_parsed() {
        let filter = MessageFilter::build(
            ConversationScope::Public,
            &params(
                Some("2024-03-01T00:00:00Z"),
                Some("2024-02-01T00:00:00Z"),
                None,
                None,
            ),
        )
        .unwrap();

        assert_eq!(filter.before, Some(1709251200000));
        assert_eq!(filter.after, Some(1706745600000));
    }

    #[test]
    fn test_malformed_time_bound_rejected() {
        let result = MessageFilter::build(
            ConversationScope::Public,
            &params(Some("yesterday"), None, None, None),
        );
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_negative_skip_rejected() {
        let result =
            MessageFilter::build(ConversationScope::Public, &params(None, None, Some(-1), None));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_non_positive_limit_rejected() {
        let result =
            MessageFilter::build(ConversationScope::Public, &params(None, None, None, Some(0)));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_thread_scope_requires_valid_peer() {
        assert!(ConversationScope::thread("me", "not-a-uuid").is_err());

        let peer = Uuid::new_v4().to_string();
        let scope = ConversationScope::thread("me", &peer).unwrap();
        assert_eq!(
            scope,
            ConversationScope::Thread {
                user_id: "me".to_string(),
                peer_id: peer,
            }
        );
    }
}
