/// TMDB (The Movie Database) metadata provider
///
/// Uses `GET /movie/{id}?api_key=...` and reads `poster_path` from the
/// response. The whole lookup, connect through body, is bounded by
/// `request_timeout`.
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::time::Duration;

use crate::{
    error::EnrichmentDegraded,
    models::{TmdbId, TmdbMovieDetails},
    services::providers::MetadataProvider,
};

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    request_timeout: Duration,
}

impl TmdbProvider {
    pub fn new(api_key: String, api_url: String, request_timeout: Duration) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            request_timeout,
        }
    }

    async fn request_poster_path(&self, tmdb_id: TmdbId) -> Result<String, EnrichmentDegraded> {
        let url = format!("{}/movie/{}", self.api_url.trim_end_matches('/'), tmdb_id);

        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(EnrichmentDegraded::Status(response.status().as_u16()));
        }

        let details: TmdbMovieDetails = response.json().await?;
        let path = poster_path(details)?;

        tracing::debug!(tmdb_id, poster_path = %path, provider = "tmdb", "Poster path resolved");

        Ok(path)
    }
}

/// Extracts a usable poster path; empty strings count as missing
fn poster_path(details: TmdbMovieDetails) -> Result<String, EnrichmentDegraded> {
    match details.poster_path {
        None | Some(Value::Null) => Err(EnrichmentDegraded::NoPosterPath),
        Some(Value::String(path)) if path.is_empty() => Err(EnrichmentDegraded::NoPosterPath),
        Some(Value::String(path)) => Ok(path),
        Some(_) => Err(EnrichmentDegraded::InvalidPosterPath),
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbProvider {
    async fn fetch_poster_path(&self, tmdb_id: TmdbId) -> Result<String, EnrichmentDegraded> {
        tokio::time::timeout(self.request_timeout, self.request_poster_path(tmdb_id))
            .await
            .map_err(|_| EnrichmentDegraded::TimedOut(self.request_timeout))?
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
