// HTTP routes: read-only views of the stats store and history

mod http;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::history_repo::HistoryRepo;
use crate::stats_store::StatsStore;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<StatsStore>,
    pub(crate) history_repo: Arc<HistoryRepo>,
}

pub fn app(store: Arc<StatsStore>, history_repo: Arc<HistoryRepo>) -> Router {
    let state = AppState {
        store,
        history_repo,
    };
    Router::new()
        .route("/", get(http::index_handler)) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/stats", get(http::stats_handler)) // GET /api/stats
        .route("/api/history", get(http::history_handler)) // GET /api/history?range=
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
