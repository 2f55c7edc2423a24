use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::{error::ApiError, state::AppState};

const DEFAULT_HISTORY_LIMIT: i64 = 50;
const DEFAULT_FILTERED_LIMIT: i64 = 50;
const MIN_LIMIT: i64 = 1;
const MAX_LIMIT: i64 = 500;

fn clamp_limit(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|raw| raw.parse::<i64>().ok())
        .filter(|&limit| (MIN_LIMIT..=MAX_LIMIT).contains(&limit))
        .unwrap_or(default)
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    limit: Option<String>,
    #[serde(rename = "actionType")]
    action_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    limit: Option<String>,
}

pub async fn get_corporate_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = clamp_limit(query.limit.as_deref(), DEFAULT_HISTORY_LIMIT);

    let actions = match query.action_type.as_deref() {
        Some(action_type) => state.store.get_corporate_actions_by_type(action_type, limit).await?,
        None => state.store.get_corporate_actions(limit).await?,
    };

    Ok(Json(json!({ "actions": actions })))
}

pub async fn get_corporate_splits(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = clamp_limit(query.limit.as_deref(), DEFAULT_FILTERED_LIMIT);
    let actions = state.store.get_corporate_actions_by_type("StockSplit", limit).await?;
    Ok(Json(json!({ "actions": actions })))
}

pub async fn get_corporate_symbols(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = clamp_limit(query.limit.as_deref(), DEFAULT_FILTERED_LIMIT);
    let actions = state.store.get_corporate_actions_by_type("SymbolChange", limit).await?;
    Ok(Json(json!({ "actions": actions })))
}

pub async fn get_corporate_names(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = clamp_limit(query.limit.as_deref(), DEFAULT_FILTERED_LIMIT);
    let actions = state.store.get_corporate_actions_by_type("NameChange", limit).await?;
    Ok(Json(json!({ "actions": actions })))
}
