use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing, malformed, invalid, or revoked credential. The detail string
    /// is for logs; callers always see the same generic 401 body.
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced record does not resolve. Surfaced as a generic bad
    /// request so callers cannot probe for existence.
    #[error("Referenced record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let (status, message) = match self {
            AppError::Auth(detail) => {
                tracing::debug!(%detail, "authentication failed");
                (StatusCode::UNAUTHORIZED, "Please authenticate.".to_string())
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound => (StatusCode::BAD_REQUEST, "Bad request.".to_string()),
            AppError::Database(err) => {
                tracing::error!(error = %err, "database failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.".to_string())
            }
            AppError::Config(msg) | AppError::Internal(msg) => {
                tracing::error!(%msg, "internal failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
