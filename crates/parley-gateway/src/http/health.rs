use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health: liveness check, returns server metadata.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "commit": env!("PARLEY_GIT_SHA"),
        "online": state.engine.online_count(),
        "connections": state.engine.connection_count(),
        "history": state.engine.history_len(),
    }))
}
