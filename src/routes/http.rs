// GET handlers: banner, version, realtime stats, bucketed history

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::AppState;
use crate::models::HistoryRange;
use crate::version::{NAME, VERSION};

pub(super) async fn index_handler() -> impl IntoResponse {
    format!(
        "{} {} running. Local time: {}",
        NAME,
        VERSION,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    )
}

/// GET /version — returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/stats — every known service with cumulative counters and current rates.
pub(super) async fn stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.snapshot())
}

#[derive(Debug, Deserialize)]
pub(super) struct HistoryQuery {
    range: Option<String>,
}

/// GET /api/history?range=short|medium|long — bucket label -> service -> totals.
pub(super) async fn history_handler(
    State(state): State<AppState>,
    Query(q): Query<HistoryQuery>,
) -> Response {
    let range = match q.range.as_deref() {
        None => HistoryRange::default(),
        Some(s) => match HistoryRange::parse(s) {
            Some(r) => r,
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({ "error": format!("unknown range: {}", s) })),
                )
                    .into_response();
            }
        },
    };

    match state.history_repo.history(range).await {
        Ok(h) => Json(h).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, operation = "history", "history query failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "history unavailable" })),
            )
                .into_response()
        }
    }
}
