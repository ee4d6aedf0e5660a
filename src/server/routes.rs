//! REST routes: token listing and health

use crate::aggregator::Aggregator;
use crate::pagination::{paginate, TokensQuery};
use crate::server::ws;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Builds the application router
pub fn create_router(aggregator: Arc<Aggregator>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tokens", get(list_tokens))
        .merge(ws::routes())
        .with_state(aggregator)
}

/// `GET /tokens` — one page of the merged view.
///
/// Serves from the cache when warm; a cold cache triggers a fetch. A cycle
/// where every source failed maps to 502, everything else degrades to
/// defaults rather than failing the request.
async fn list_tokens(
    State(aggregator): State<Arc<Aggregator>>,
    Query(query): Query<TokensQuery>,
) -> Response {
    match aggregator.merged_view().await {
        Ok(records) => Json(paginate(records, &query)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Read request could not produce a merged view");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// `GET /health` — service status with per-source fetch metrics
async fn health(State(aggregator): State<Arc<Aggregator>>) -> Json<serde_json::Value> {
    let metrics = aggregator.source_metrics().await;
    let all_failing = !metrics.is_empty()
        && metrics
            .iter()
            .all(|m| m.total_fetches > 0 && m.success_rate == 0.0);

    Json(json!({
        "status": if all_failing { "degraded" } else { "ok" },
        "sources": metrics,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
