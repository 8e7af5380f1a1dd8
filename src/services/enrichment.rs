use std::sync::Arc;
use std::time::Duration;

use tokio::{sync::Semaphore, task::JoinHandle, time::Instant};

use crate::{
    config::Config,
    error::EnrichmentDegraded,
    models::{Candidate, EnrichedCandidate, TmdbId},
    services::providers::MetadataProvider,
};

/// Attaches a poster URL to every candidate
///
/// Lookups run concurrently (bounded by `concurrency`) and are reassembled by
/// position. Every failure is absorbed into the placeholder URL for that item
/// alone.
#[derive(Clone)]
pub struct Enricher {
    provider: Arc<dyn MetadataProvider>,
    image_base_url: String,
    placeholder_url: String,
    permits: Arc<Semaphore>,
    deadline: Option<Duration>,
}

impl Enricher {
    pub fn new(
        provider: Arc<dyn MetadataProvider>,
        image_base_url: String,
        placeholder_url: String,
        concurrency: usize,
    ) -> Self {
        Self {
            provider,
            image_base_url,
            placeholder_url,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            deadline: None,
        }
    }

    pub fn from_config(provider: Arc<dyn MetadataProvider>, config: &Config) -> Self {
        Self::new(
            provider,
            config.tmdb_image_base_url.clone(),
            config.placeholder_poster_url.clone(),
            config.enrichment_concurrency,
        )
        .with_deadline(config.enrichment_deadline())
    }

    /// Bounds the whole batch; slots still pending at the deadline get the
    /// placeholder
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn placeholder_url(&self) -> &str {
        &self.placeholder_url
    }

    /// Returns one enriched candidate per input, in input order
    pub async fn enrich(&self, candidates: Vec<Candidate>) -> Vec<EnrichedCandidate> {
        let deadline = self.deadline.map(|d| Instant::now() + d);

        // One slot per candidate: `None` when there is nothing to look up
        let tasks: Vec<_> = candidates
            .iter()
            .map(|candidate| candidate.tmdb_id.map(|tmdb_id| self.spawn_lookup(tmdb_id)))
            .collect();

        let mut enriched = Vec::with_capacity(candidates.len());
        for (candidate, task) in candidates.into_iter().zip(tasks) {
            let poster_url = match task {
                None => self.placeholder_url.clone(),
                Some(mut task) => {
                    let outcome = join_lookup(&mut task, deadline).await;
                    self.resolve(&candidate, outcome)
                }
            };

            enriched.push(EnrichedCandidate {
                candidate,
                poster_url,
            });
        }

        enriched
    }

    fn spawn_lookup(&self, tmdb_id: TmdbId) -> LookupTask {
        let provider = self.provider.clone();
        let permits = self.permits.clone();

        LookupTask(tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| EnrichmentDegraded::TaskFailed(e.to_string()))?;
            provider.fetch_poster_path(tmdb_id).await
        }))
    }

    fn resolve(&self, candidate: &Candidate, outcome: Result<String, EnrichmentDegraded>) -> String {
        match outcome {
            Ok(path) => join_image_url(&self.image_base_url, &path),
            Err(reason) => {
                tracing::warn!(
                    tmdb_id = ?candidate.tmdb_id,
                    title = %candidate.title,
                    provider = self.provider.name(),
                    reason = %reason,
                    "Poster lookup degraded to placeholder"
                );
                self.placeholder_url.clone()
            }
        }
    }
}

/// A spawned lookup owned by one `enrich` call.
///
/// Dropping it aborts the task, so lookups never outlive the request that
/// started them (deadline hit, or the request future dropped on disconnect).
struct LookupTask(JoinHandle<Result<String, EnrichmentDegraded>>);

impl Drop for LookupTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn join_lookup(
    task: &mut LookupTask,
    deadline: Option<Instant>,
) -> Result<String, EnrichmentDegraded> {
    let joined = match deadline {
        Some(deadline) => match tokio::time::timeout_at(deadline, &mut task.0).await {
            Ok(joined) => joined,
            Err(_) => return Err(EnrichmentDegraded::DeadlineExceeded),
        },
        None => (&mut task.0).await,
    };

    joined.map_err(|e| EnrichmentDegraded::TaskFailed(e.to_string()))?
}

/// Appends a provider image path to the configured base URL
pub fn join_image_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}
