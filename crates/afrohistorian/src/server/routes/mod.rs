//! Routes for the chat server

pub mod admin;
pub mod ask;
pub mod ws;

use axum::{
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::root))
        .route("/ask", post(ask::ask))
        .route("/admin/connections", get(admin::connections))
        .route("/ws/chat/:user_id", get(ws::chat))
        .route("/ws/chat-stream/:user_id", get(ws::chat_stream))
}
