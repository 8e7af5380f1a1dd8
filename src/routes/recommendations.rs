use axum::{extract::rejection::JsonRejection, extract::State, Extension, Json};
use serde_json::Value;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{ItemSelection, RecommendResponse},
    routes::AppState,
};

/// Handler for `POST /recommend`
///
/// The body is validated by hand so that malformed selections get the same
/// 400 error shape as every other failure.
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<RecommendResponse>> {
    let Json(body) = body.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    let selection = ItemSelection::from_request_body(&body)?;

    tracing::info!(
        request_id = %request_id,
        selected = selection.ids().len(),
        "Processing recommendation request"
    );

    let candidates = state.pipeline.recommend(&selection).await?;
    let enriched = state.enricher.enrich(candidates).await;

    tracing::info!(
        request_id = %request_id,
        recommended = enriched.len(),
        "Recommendation completed"
    );

    Ok(Json(enriched.into()))
}
