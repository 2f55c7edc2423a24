use axum::{
    extract::{Query, State},
    Json,
};
use chainequity_captable::{
    concentration_category, current_snapshot, decentralization_score, distribution_buckets,
    gini_coefficient, herfindahl_hirschman_index, overview, top_n_concentration,
};
use serde::Deserialize;
use serde_json::json;

use crate::{error::ApiError, state::AppState};

const DEFAULT_EVENT_LIMIT: i64 = 100;
const MAX_EVENT_LIMIT: i64 = 1000;
const RECENT_CORPORATE_ACTIONS: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    limit: Option<String>,
    offset: Option<String>,
}

pub async fn get_analytics_overview(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let snapshot = current_snapshot(&state.store).await?;
    let recent_actions = state.store.get_corporate_actions(RECENT_CORPORATE_ACTIONS).await?;

    Ok(Json(json!({
        "overview": overview(&snapshot),
        "recentActions": recent_actions,
    })))
}

pub async fn get_analytics_holders(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let snapshot = current_snapshot(&state.store).await?;
    let hhi = herfindahl_hirschman_index(&snapshot);

    Ok(Json(json!({
        "holderCount": snapshot.holder_count,
        "top10Concentration": top_n_concentration(&snapshot, 10),
        "hhi": hhi,
        "gini": gini_coefficient(&snapshot),
        "concentrationCategory": concentration_category(hhi),
    })))
}

pub async fn get_analytics_supply(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let snapshot = current_snapshot(&state.store).await?;
    Ok(Json(json!({
        "totalSupply": snapshot.total_supply,
        "totalSupplyFormatted": snapshot.total_supply_formatted,
        "splitMultiplier": snapshot.split_multiplier,
        "blockNumber": snapshot.block_number,
    })))
}

pub async fn get_analytics_distribution(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let snapshot = current_snapshot(&state.store).await?;
    Ok(Json(json!({
        "buckets": distribution_buckets(&snapshot),
        "gini": gini_coefficient(&snapshot),
        "decentralizationScore": decentralization_score(&snapshot),
    })))
}

/// Lenient limit/offset parsing: a malformed value (e.g. `limit=abc`) falls
/// back to the default rather than 400ing the whole request.
pub async fn get_analytics_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = query
        .limit
        .as_deref()
        .and_then(|raw| raw.parse::<i64>().ok())
        .filter(|&limit| (1..=MAX_EVENT_LIMIT).contains(&limit))
        .unwrap_or(DEFAULT_EVENT_LIMIT);

    let offset = query
        .offset
        .as_deref()
        .and_then(|raw| raw.parse::<i64>().ok())
        .filter(|&offset| offset >= 0)
        .unwrap_or(0);

    let events = state.store.get_events_paginated(limit, offset).await?;
    Ok(Json(json!({ "events": events, "count": events.len() })))
}
