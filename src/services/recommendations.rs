use futures::TryStreamExt;
use std::sync::Arc;
use std::time::Instant;

use crate::{
    error::QueryExecutionError,
    models::{Candidate, ItemSelection},
    services::{
        normalizer::{self, RowOutcome},
        selection::{self, CatalogSchema},
        warehouse::AnalyticalEngine,
    },
};

/// Selection → execution → normalization for one recommendation request
#[derive(Clone)]
pub struct RecommendationPipeline {
    engine: Arc<dyn AnalyticalEngine>,
    schema: CatalogSchema,
}

impl RecommendationPipeline {
    pub fn new(engine: Arc<dyn AnalyticalEngine>, schema: CatalogSchema) -> Self {
        Self { engine, schema }
    }

    /// Returns the ranked candidates for `selection`.
    ///
    /// An empty list is a valid answer. Any engine failure aborts the whole
    /// batch: partial results are never returned.
    pub async fn recommend(
        &self,
        selection: &ItemSelection,
    ) -> Result<Vec<Candidate>, QueryExecutionError> {
        let start = Instant::now();
        let plan = selection::plan(selection, &self.schema);

        tracing::info!(
            mode = %plan.mode,
            selected = selection.ids().len(),
            engine = self.engine.name(),
            "Running recommendation query"
        );

        let rows: Vec<_> = self
            .engine
            .execute(&plan.query)
            .try_collect()
            .await
            .inspect_err(|e| {
                tracing::error!(mode = %plan.mode, error = %e, "Recommendation query failed");
            })?;

        let outcomes: Vec<RowOutcome> = rows.iter().map(normalizer::extract).collect();
        let candidates = if is_legacy_string_batch(&outcomes) {
            coerce_legacy_strings(outcomes)
        } else {
            outcomes.into_iter().map(RowOutcome::into_candidate).collect()
        };

        tracing::info!(
            mode = %plan.mode,
            rows = rows.len(),
            candidates = candidates.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Recommendation query completed"
        );

        Ok(candidates)
    }
}

/// Legacy result shape: every row is a bare string instead of a record.
///
/// Neither selection query produces this; the shim keeps an older degraded
/// path working and can go once rows are guaranteed structured. An empty
/// batch is not considered legacy.
fn is_legacy_string_batch(outcomes: &[RowOutcome]) -> bool {
    !outcomes.is_empty()
        && outcomes
            .iter()
            .all(|outcome| matches!(outcome, RowOutcome::PlainString(_)))
}

fn coerce_legacy_strings(outcomes: Vec<RowOutcome>) -> Vec<Candidate> {
    tracing::warn!(rows = outcomes.len(), "Legacy string rows, coercing to title-only candidates");

    outcomes
        .into_iter()
        .map(|outcome| match outcome {
            RowOutcome::PlainString(s) => Candidate::title_only(s.trim_matches('"')),
            other => other.into_candidate(),
        })
        .collect()
}
