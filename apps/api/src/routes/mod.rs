pub mod chat;
pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::resume::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Chat API
        .route("/api/v1/chat", post(chat::handle_chat))
        // Resume API
        .route("/api/v1/resume", post(handlers::handle_upload))
        .route("/api/v1/resume/:user_id", get(handlers::handle_list))
        .route(
            "/api/v1/resume/:user_id/:resume_id",
            delete(handlers::handle_delete),
        )
        .with_state(state)
}
