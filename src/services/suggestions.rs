/// Prefix-based title suggestions over the search index
use reqwest::Client as HttpClient;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::EsSearchResponse,
};

/// Indexed field holding the movie title
pub const TITLE_FIELD: &str = "title";

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SearchIndex: Send + Sync {
    /// Values of `field` for documents whose `field` starts with the phrase `query`
    async fn match_phrase_prefix(
        &self,
        field: &str,
        query: &str,
        limit: usize,
    ) -> AppResult<Vec<String>>;

    /// Index backend name for logging
    fn name(&self) -> &'static str;
}

/// [`SearchIndex`] over an Elasticsearch index via its REST API
#[derive(Clone)]
pub struct ElasticsearchIndex {
    http_client: HttpClient,
    endpoint: String,
    index: String,
    api_key: Option<String>,
    request_timeout: Duration,
}

impl ElasticsearchIndex {
    pub fn new(
        endpoint: String,
        index: String,
        api_key: Option<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            http_client: HttpClient::new(),
            endpoint,
            index,
            api_key,
            request_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.es_endpoint.clone(),
            config.es_index.clone(),
            config.es_api_key.clone(),
            config.es_timeout(),
        )
    }
}

#[async_trait::async_trait]
impl SearchIndex for ElasticsearchIndex {
    async fn match_phrase_prefix(
        &self,
        field: &str,
        query: &str,
        limit: usize,
    ) -> AppResult<Vec<String>> {
        let url = format!("{}/{}/_search", self.endpoint.trim_end_matches('/'), self.index);
        let body = json!({
            "size": limit,
            "_source": [field],
            "query": {
                "match_phrase_prefix": {
                    field: { "query": query }
                }
            }
        });

        let mut request = self
            .http_client
            .post(&url)
            .json(&body)
            .timeout(self.request_timeout);
        if let Some(api_key) = &self.api_key {
            request = request.header("Authorization", format!("ApiKey {}", api_key));
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::SearchIndex(format!(
                "Elasticsearch returned status {}: {}",
                status, body
            )));
        }

        let results: EsSearchResponse = response.json().await?;
        let values = results
            .hits
            .hits
            .into_iter()
            .filter_map(|hit| hit.source.get(field)?.as_str().map(str::to_string))
            .collect();

        Ok(values)
    }

    fn name(&self) -> &'static str {
        "elasticsearch"
    }
}

/// Title suggestions for `prefix`.
///
/// A blank prefix yields nothing. Index failures are logged and also yield
/// nothing, so an empty list means "no signal", not "no matches".
pub async fn suggest(index: Arc<dyn SearchIndex>, prefix: &str, limit: usize) -> Vec<String> {
    let prefix = prefix.trim();
    if prefix.is_empty() {
        return Vec::new();
    }

    match index.match_phrase_prefix(TITLE_FIELD, prefix, limit).await {
        Ok(titles) => {
            tracing::debug!(prefix = %prefix, results = titles.len(), "Autocomplete completed");
            titles
        }
        Err(e) => {
            tracing::warn!(
                prefix = %prefix,
                index = index.name(),
                error = %e,
                "Autocomplete lookup failed"
            );
            Vec::new()
        }
    }
}
