use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{routes::AppState, services::suggestions};

#[derive(Debug, Deserialize)]
pub struct AutocompleteQuery {
    #[serde(default)]
    query: String,
}

/// Handler for `GET /autocomplete`; always answers with a (possibly empty) list
pub async fn autocomplete(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AutocompleteQuery>,
) -> Json<Vec<String>> {
    let titles = suggestions::suggest(
        state.search_index.clone(),
        &params.query,
        state.suggestion_limit,
    )
    .await;

    Json(titles)
}
