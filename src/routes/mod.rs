use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    services::{Enricher, RecommendationPipeline, SearchIndex},
};

pub mod autocomplete;
pub mod recommendations;

/// Long-lived components shared by all requests
///
/// Built once at startup; the warehouse pool, search index client and
/// metadata provider inside are safe to use concurrently.
pub struct AppState {
    pub pipeline: RecommendationPipeline,
    pub enricher: Enricher,
    pub search_index: Arc<dyn SearchIndex>,
    pub suggestion_limit: usize,
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/recommend", post(recommendations::recommend))
        .route("/autocomplete", get(autocomplete::autocomplete))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
