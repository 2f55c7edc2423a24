use axum::{
    extract::{Path, Query, State},
    Json,
};
use chainequity_captable::balance_change_history;
use serde::Deserialize;
use serde_json::json;

use crate::{error::ApiError, state::AppState};

const DEFAULT_LIMIT: i64 = 10;
const MIN_LIMIT: i64 = 1;
const MAX_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    limit: Option<String>,
}

fn resolve_limit(query: &LimitQuery) -> i64 {
    query
        .limit
        .as_deref()
        .and_then(|raw| raw.parse::<i64>().ok())
        .filter(|&limit| (MIN_LIMIT..=MAX_LIMIT).contains(&limit))
        .unwrap_or(DEFAULT_LIMIT)
}

pub async fn get_events(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let events = state.store.get_events_paginated(resolve_limit(&query), 0).await?;
    Ok(Json(json!({ "events": events, "count": events.len() })))
}

pub async fn get_events_transfers(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let events = state.store.get_events_by_type("Transfer", resolve_limit(&query)).await?;
    Ok(Json(json!({ "events": events, "count": events.len() })))
}

pub async fn get_events_wallet_approvals(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = resolve_limit(&query);
    let mut events = state.store.get_events_by_type("WalletApproved", limit).await?;
    events.extend(state.store.get_events_by_type("WalletRevoked", limit).await?);
    events.sort_by(|a, b| b.block_number.cmp(&a.block_number).then(b.log_index.cmp(&a.log_index)));
    events.truncate(limit.max(0) as usize);

    Ok(Json(json!({ "events": events, "count": events.len() })))
}

pub async fn get_events_corporate(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = resolve_limit(&query);
    let mut events = Vec::new();
    for event_type in ["StockSplit", "SymbolChanged", "NameChanged"] {
        events.extend(state.store.get_events_by_type(event_type, limit).await?);
    }
    events.sort_by(|a, b| b.block_number.cmp(&a.block_number).then(b.log_index.cmp(&a.log_index)));
    events.truncate(limit.max(0) as usize);

    Ok(Json(json!({ "events": events, "count": events.len() })))
}

pub async fn get_events_by_address(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    chainequity_types::Address::parse(&address)
        .map_err(|_| ApiError::InvalidRequest(format!("invalid address: {address}")))?;

    let history = balance_change_history(&state.store, &address, resolve_limit(&query)).await?;
    Ok(Json(json!({ "history": history })))
}
