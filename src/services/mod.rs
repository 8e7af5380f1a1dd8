pub mod enrichment;
pub mod normalizer;
pub mod providers;
pub mod recommendations;
pub mod selection;
pub mod suggestions;
pub mod warehouse;

pub use enrichment::Enricher;
pub use recommendations::RecommendationPipeline;
pub use suggestions::{ElasticsearchIndex, SearchIndex};
pub use warehouse::{AnalyticalEngine, PgWarehouse};
