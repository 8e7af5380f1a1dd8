use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Query execution failed: {0}")]
    QueryExecution(#[from] QueryExecutionError),

    #[error("Search index error: {0}")]
    SearchIndex(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::QueryExecution(_)
            | AppError::SearchIndex(_)
            | AppError::HttpClient(_)
            | AppError::Internal(_) => {
                // The cause stays in the logs; callers only see a generic failure
                tracing::error!(error = %self, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error while processing the request".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Failure to build, run, or read back an analytical warehouse query
#[derive(thiserror::Error, Debug)]
pub enum QueryExecutionError {
    #[error("warehouse error: {0}")]
    Engine(#[from] sqlx::Error),

    #[error("could not decode result row: {0}")]
    RowDecode(String),
}

/// Per-item poster resolution failure.
///
/// Never surfaced to callers: the enrichment boundary turns every variant into
/// the placeholder poster.
#[derive(thiserror::Error, Debug)]
pub enum EnrichmentDegraded {
    #[error("provider returned status {0}")]
    Status(u16),

    #[error("provider response has no poster path")]
    NoPosterPath,

    #[error("provider poster path is not a string")]
    InvalidPosterPath,

    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider did not answer within {0:?}")]
    TimedOut(std::time::Duration),

    #[error("enrichment task failed: {0}")]
    TaskFailed(String),

    #[error("enrichment deadline exceeded")]
    DeadlineExceeded,
}
