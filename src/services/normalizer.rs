/// Turns raw warehouse rows into [`Candidate`]s without ever failing
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::{
    models::{Candidate, MovieId, TmdbId},
    services::warehouse::RawRow,
};

/// The row shape both selection queries produce.
///
/// `movie_id` and `tmdb_id` must be present (null is allowed); `avg_rating`
/// may be missing entirely.
#[derive(Debug, Deserialize)]
struct CandidateRow {
    title: String,
    #[serde(deserialize_with = "required_nullable")]
    movie_id: Option<MovieId>,
    #[serde(deserialize_with = "required_nullable")]
    tmdb_id: Option<TmdbId>,
    #[serde(default)]
    avg_rating: Option<f64>,
}

fn required_nullable<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer)
}

impl From<CandidateRow> for Candidate {
    fn from(row: CandidateRow) -> Self {
        Candidate {
            title: row.title,
            movie_id: row.movie_id,
            tmdb_id: row.tmdb_id,
            score: row.avg_rating,
        }
    }
}

/// What structured extraction made of one row
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    /// The row had the expected fields
    Structured(Candidate),
    /// The row was a bare JSON string instead of a record
    PlainString(String),
    /// Anything else; the candidate carries the rendered row as its title
    Degraded(Candidate),
}

impl RowOutcome {
    /// Collapses the outcome into the best-effort candidate
    pub fn into_candidate(self) -> Candidate {
        match self {
            RowOutcome::Structured(candidate) | RowOutcome::Degraded(candidate) => candidate,
            RowOutcome::PlainString(s) => Candidate::title_only(Value::String(s).to_string()),
        }
    }
}

/// Attempts structured extraction of a raw row
pub fn extract(raw: &RawRow) -> RowOutcome {
    if let Value::String(s) = raw {
        return RowOutcome::PlainString(s.clone());
    }

    match CandidateRow::deserialize(raw) {
        Ok(row) => RowOutcome::Structured(row.into()),
        Err(e) => {
            tracing::warn!(error = %e, row = %raw, "Unparseable result row, keeping it as raw text");
            RowOutcome::Degraded(Candidate::title_only(raw.to_string()))
        }
    }
}

/// Total normalization: every row becomes a candidate
pub fn normalize(raw: &RawRow) -> Candidate {
    extract(raw).into_candidate()
}
