// HTTP read API: metric names and per-metric series

mod http;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::store::Store;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) config: AppConfig,
}

pub fn app(store: Arc<dyn Store>, config: AppConfig) -> Router {
    let state = AppState { store, config };
    Router::new()
        .route("/", get(|| async { "chilada metrics collector" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/names", get(http::names_handler)) // GET /api/names
        // Wildcard so names containing `/` stay addressable.
        .route("/api/metrics/{*name}", get(http::metric_handler)) // GET /api/metrics/{name}?start=&end=
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
