/// Third-party movie metadata providers
///
/// A provider resolves the poster image path for a TMDB id. Failures are
/// returned as [`EnrichmentDegraded`] values; deciding what to show instead is
/// left to the enrichment service.
use crate::{error::EnrichmentDegraded, models::TmdbId};

pub mod tmdb;

pub use tmdb::TmdbProvider;

#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Looks up the poster path (e.g. `/abc.jpg`) for one movie.
    ///
    /// Makes a single attempt; no retries on failure.
    async fn fetch_poster_path(&self, tmdb_id: TmdbId) -> Result<String, EnrichmentDegraded>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
