//! Monitoring endpoints

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::server::connections::ConnectionsSnapshot;
use crate::server::state::AppState;

/// GET / - health check
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": format!("{} API with WebSocket support", state.config().assistant.name)
    }))
}

/// GET /admin/connections - active sockets and registered users
pub async fn connections(State(state): State<AppState>) -> Json<ConnectionsSnapshot> {
    Json(state.connections().snapshot())
}
