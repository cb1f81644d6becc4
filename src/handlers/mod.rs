pub mod compress;
pub mod download;
pub mod health;
pub mod index;
pub mod info;
pub mod merge;
pub mod split;
pub mod upload;

pub use compress::*;
pub use health::*;
pub use index::*;
pub use info::*;
pub use merge::*;
pub use split::*;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::middleware::{logging_middleware, rate_limit_middleware, RequestLimiter};
use crate::services::{CompressionService, GhostscriptCompressor, PdfCompressor};

/// Shared, read-only handles every handler can reach. Nothing in here is
/// mutated per request apart from the limiter's counters.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub compression: CompressionService,
    pub limiter: Arc<RequestLimiter>,
}

impl AppState {
    pub fn new(config: Config, compressor: Arc<dyn PdfCompressor>) -> Self {
        let limiter = RequestLimiter::new(config.max_concurrent_requests);
        Self {
            config: Arc::new(config),
            compression: CompressionService::new(compressor),
            limiter: Arc::new(limiter),
        }
    }

    /// State backed by the Ghostscript binary named in the configuration.
    pub fn from_config(config: Config) -> Self {
        let compressor = Arc::new(GhostscriptCompressor::from_config(&config));
        Self::new(config, compressor)
    }
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/v1/info", post(info_handler))
        .route("/api/v1/compress", post(compress_handler))
        .route("/api/v1/split", post(split_handler))
        .route("/api/v1/merge", post(merge_handler))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    let body_limit = state.config.max_request_size_bytes();

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .merge(api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(body_limit))
                .layer(axum::middleware::from_fn(logging_middleware)),
        )
        .with_state(state)
}
