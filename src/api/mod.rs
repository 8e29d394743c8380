pub mod extract;
pub mod messages;
pub mod state;
pub mod users;

pub use state::AppState;

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

pub fn create_router(state: AppState) -> Router {
    let request_timeout = Duration::from_secs(state.config.request_timeout_secs);

    Router::new()
        // Unauthenticated probe
        .route("/health", get(health))
        // Account endpoints
        .route(
            "/user",
            post(users::register)
                .get(users::me)
                .patch(users::update)
                .delete(users::delete),
        )
        .route("/user/login", post(users::login))
        .route("/user/logout", post(users::logout))
        .route("/users", get(users::search))
        // Message endpoints
        .route("/message", post(messages::post_public))
        .route("/message/:peer_id", post(messages::post_private))
        .route("/messages", get(messages::list_public))
        .route("/messages/count", get(messages::count_public))
        .route("/messages/:peer_id", get(messages::list_thread))
        .route("/messages/:peer_id/count", get(messages::count_thread))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> axum::Json<HealthResponse> {
    axum::Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
