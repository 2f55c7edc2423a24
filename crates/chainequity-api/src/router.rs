use std::time::Duration;

use axum::{http::HeaderValue, routing::get, Router};
use tower::timeout::TimeoutLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{routes, state::AppState};

/// Builds the full route tree under the `/api` base path. `/health`
/// is mounted both at `/health` and `/api/health` since liveness probes
/// conventionally hit the bare path.
///
/// `cors_origin` mirrors the `CORS_ORIGIN` env var: `None` (or `*`)
/// allows any origin, matching a permissive dev default; any
/// other value restricts `Access-Control-Allow-Origin` to exactly that
/// origin.
pub fn build_router(state: AppState, cors_origin: Option<&str>) -> Router {
    let cors = match cors_origin {
        None | Some("*") => CorsLayer::permissive(),
        Some(origin) => CorsLayer::new().allow_origin(
            origin
                .parse::<HeaderValue>()
                .unwrap_or_else(|_| HeaderValue::from_static("*")),
        ),
    };

    let api = Router::new()
        .route("/health", get(routes::health::health))
        .route("/captable", get(routes::captable::get_captable))
        .route("/captable/block/:block", get(routes::captable::get_captable_at_block))
        .route("/captable/export", get(routes::captable::get_captable_export))
        .route("/captable/holders", get(routes::captable::get_captable_holders))
        .route("/captable/holder/:address", get(routes::captable::get_captable_holder))
        .route("/captable/top/:n", get(routes::captable::get_captable_top))
        .route("/captable/summary", get(routes::captable::get_captable_summary))
        .route("/analytics/overview", get(routes::analytics::get_analytics_overview))
        .route("/analytics/holders", get(routes::analytics::get_analytics_holders))
        .route("/analytics/supply", get(routes::analytics::get_analytics_supply))
        .route("/analytics/distribution", get(routes::analytics::get_analytics_distribution))
        .route("/analytics/events", get(routes::analytics::get_analytics_events))
        .route("/corporate/history", get(routes::corporate::get_corporate_history))
        .route("/corporate/splits", get(routes::corporate::get_corporate_splits))
        .route("/corporate/symbols", get(routes::corporate::get_corporate_symbols))
        .route("/corporate/names", get(routes::corporate::get_corporate_names))
        .route("/events", get(routes::events::get_events))
        .route("/events/transfers", get(routes::events::get_events_transfers))
        .route("/events/wallet-approvals", get(routes::events::get_events_wallet_approvals))
        .route("/events/corporate", get(routes::events::get_events_corporate))
        .route("/events/address/:address", get(routes::events::get_events_by_address));

    Router::new()
        .route("/health", get(routes::health::health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state)
}
