use axum::{extract::State, Json};
use serde_json::json;

use crate::state::AppState;

/// Reports `{status, timestamp, uptime}`. `indexerState` is additional —
/// useful for operators, and harmless since unknown response fields aren't
/// part of any documented contract.
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "indexerState": state.indexer_state.current().to_string(),
        "timestamp": chrono::Utc::now().timestamp(),
        "uptime": state.started_at.elapsed().as_secs(),
    }))
}
