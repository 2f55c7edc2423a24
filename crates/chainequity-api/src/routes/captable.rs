use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chainequity_captable::{
    current_snapshot, decentralization_score, gini_coefficient, herfindahl_hirschman_index,
    historical_snapshot_at_block, mean_balance, median_balance, top_n_concentration,
    balance_change_history, CapTableSnapshot,
};
use serde::Deserialize;
use serde_json::json;

use crate::{csv::export_csv, error::ApiError, state::AppState};

const DEFAULT_HOLDERS_LIMIT: i64 = 100;
const MAX_HOLDERS_LIMIT: i64 = 1000;
const DEFAULT_HISTORY_LIMIT: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct CaptableQuery {
    block: Option<String>,
    limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    format: Option<String>,
    block: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HoldersQuery {
    limit: Option<String>,
}

/// Parses an optional `?block=H` query param. A non-numeric value is
/// ignored, falling back to the current snapshot; a valid but negative
/// value is a hard validation error.
fn parse_block_param(raw: Option<&str>) -> Result<Option<u64>, ApiError> {
    let Some(raw) = raw else { return Ok(None) };
    let Ok(parsed) = raw.parse::<i64>() else { return Ok(None) };
    if parsed < 0 {
        return Err(ApiError::InvalidRequest(format!("block number must be non-negative, got {parsed}")));
    }
    Ok(Some(parsed as u64))
}

async fn resolve_snapshot(state: &AppState, block: Option<u64>) -> Result<CapTableSnapshot, ApiError> {
    match block {
        Some(block) => Ok(historical_snapshot_at_block(&state.store, block).await?),
        None => Ok(current_snapshot(&state.store).await?),
    }
}

pub async fn get_captable(
    State(state): State<AppState>,
    Query(query): Query<CaptableQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let block = parse_block_param(query.block.as_deref())?;
    let mut snapshot = resolve_snapshot(&state, block).await?;

    if let Some(limit) = query.limit.as_deref().and_then(|raw| raw.parse::<usize>().ok()) {
        snapshot.holders.truncate(limit);
    }

    Ok(Json(serde_json::to_value(snapshot).unwrap()))
}

pub async fn get_captable_at_block(
    State(state): State<AppState>,
    Path(block): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if block < 0 {
        return Err(ApiError::InvalidRequest(format!("block number must be non-negative, got {block}")));
    }

    let snapshot = historical_snapshot_at_block(&state.store, block as u64).await?;
    Ok(Json(serde_json::to_value(snapshot).unwrap()))
}

pub async fn get_captable_export(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let format = query.format.as_deref().unwrap_or("csv");
    if format != "csv" && format != "json" {
        return Err(ApiError::InvalidRequest(format!("unknown export format: {format}")));
    }

    let block = parse_block_param(query.block.as_deref())?;
    let snapshot = resolve_snapshot(&state, block).await?;
    let generated_at = chrono::Utc::now().timestamp() as u64;

    if format == "json" {
        return Ok((
            [(header::CONTENT_TYPE, "application/json")],
            Json(json!({ "snapshot": snapshot, "generatedAt": generated_at })),
        )
            .into_response());
    }

    let csv = export_csv(&snapshot, generated_at);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"captable.csv\""),
        ],
        csv,
    )
        .into_response())
}

pub async fn get_captable_holders(
    State(state): State<AppState>,
    Query(query): Query<HoldersQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = query
        .limit
        .as_deref()
        .and_then(|raw| raw.parse::<i64>().ok())
        .filter(|&limit| (1..=MAX_HOLDERS_LIMIT).contains(&limit))
        .unwrap_or(DEFAULT_HOLDERS_LIMIT);

    let mut snapshot = current_snapshot(&state.store).await?;
    snapshot.holders.truncate(limit as usize);

    Ok(Json(json!({ "holders": snapshot.holders, "holderCount": snapshot.holders.len() })))
}

pub async fn get_captable_holder(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let normalized = chainequity_types::Address::parse(&address)
        .map_err(|_| ApiError::InvalidRequest(format!("invalid address: {address}")))?;

    let snapshot = current_snapshot(&state.store).await?;
    let holder = snapshot
        .holders
        .into_iter()
        .find(|h| h.address == normalized.as_str())
        .ok_or_else(|| ApiError::NotFound(format!("no holder found for address {address}")))?;

    let history = balance_change_history(&state.store, normalized.as_str(), DEFAULT_HISTORY_LIMIT).await?;

    let mut body = serde_json::to_value(holder).unwrap();
    body["balanceHistory"] = serde_json::to_value(history).unwrap();
    Ok(Json(body))
}

pub async fn get_captable_top(
    State(state): State<AppState>,
    Path(n): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if n < 1 {
        return Err(ApiError::InvalidRequest(format!("top N must be at least 1, got {n}")));
    }

    let snapshot = current_snapshot(&state.store).await?;
    let top: Vec<_> = snapshot.holders.into_iter().take(n as usize).collect();
    Ok(Json(json!({ "holders": top })))
}

pub async fn get_captable_summary(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let snapshot = current_snapshot(&state.store).await?;
    let hhi = herfindahl_hirschman_index(&snapshot);

    Ok(Json(json!({
        "holderCount": snapshot.holder_count,
        "totalSupply": snapshot.total_supply,
        "totalSupplyFormatted": snapshot.total_supply_formatted,
        "median": median_balance(&snapshot),
        "avg": mean_balance(&snapshot),
        "top10": top_n_concentration(&snapshot, 10),
        "hhi": hhi,
        "gini": gini_coefficient(&snapshot),
        "decentralizationScore": decentralization_score(&snapshot),
        "splitMultiplier": snapshot.split_multiplier,
        "generatedAt": chrono::Utc::now().timestamp(),
    })))
}
