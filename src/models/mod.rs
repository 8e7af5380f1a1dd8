use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, AppResult};

/// Catalog identifier of a movie in the warehouse
pub type MovieId = i64;

/// TMDB identifier used to look up artwork
pub type TmdbId = i64;

/// The caller's prior selection of movies, in the order given
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemSelection(Vec<MovieId>);

impl ItemSelection {
    pub fn new(ids: Vec<MovieId>) -> Self {
        Self(ids)
    }

    pub fn ids(&self) -> &[MovieId] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Extracts the selection from a `/recommend` request body.
    ///
    /// A missing `movie_ids` key is the empty selection. Anything other than a
    /// list of integers is rejected rather than coerced.
    pub fn from_request_body(body: &Value) -> AppResult<Self> {
        let object = body
            .as_object()
            .ok_or_else(|| AppError::InvalidInput("request body must be a JSON object".to_string()))?;

        let raw_ids = match object.get("movie_ids") {
            None => return Ok(Self::default()),
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(AppError::InvalidInput(
                    "movie_ids must be a list".to_string(),
                ))
            }
        };

        raw_ids
            .iter()
            .map(|item| {
                item.as_i64().ok_or_else(|| {
                    AppError::InvalidInput(format!("movie_ids must contain integers, got {}", item))
                })
            })
            .collect::<AppResult<Vec<_>>>()
            .map(Self)
    }
}

/// A catalog item proposed as a recommendation, before artwork is attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub title: String,
    pub movie_id: Option<MovieId>,
    pub tmdb_id: Option<TmdbId>,
    /// Mean rating (popularity) or mean predicted rating (similarity)
    #[serde(rename = "rating")]
    pub score: Option<f64>,
}

impl Candidate {
    /// Candidate carrying nothing but a title
    pub fn title_only(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            movie_id: None,
            tmdb_id: None,
            score: None,
        }
    }
}

/// A candidate with its resolved poster URL (never empty: the placeholder
/// stands in for any failed lookup)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub poster_url: String,
}

/// Response body of `POST /recommend`
///
/// `posters[i]` is the artwork for `recommended_movies[i]`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub recommended_movies: Vec<Candidate>,
    pub posters: Vec<String>,
}

impl From<Vec<EnrichedCandidate>> for RecommendResponse {
    fn from(enriched: Vec<EnrichedCandidate>) -> Self {
        let (recommended_movies, posters) = enriched
            .into_iter()
            .map(|item| (item.candidate, item.poster_url))
            .unzip();

        Self {
            recommended_movies,
            posters,
        }
    }
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Subset of the TMDB `GET /movie/{id}` response
///
/// `poster_path` is kept untyped so a non-string value can be told apart from
/// a missing one.
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovieDetails {
    #[serde(default)]
    pub poster_path: Option<Value>,
}

// ============================================================================
// Elasticsearch Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct EsSearchResponse {
    pub hits: EsHits,
}

#[derive(Debug, Deserialize)]
pub struct EsHits {
    #[serde(default)]
    pub hits: Vec<EsHit>,
}

#[derive(Debug, Deserialize)]
pub struct EsHit {
    #[serde(rename = "_source", default)]
    pub source: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_selection_from_body() {
        let selection = ItemSelection::from_request_body(&json!({ "movie_ids": [1, 7, 42] })).unwrap();
        assert_eq!(selection.ids(), &[1, 7, 42]);
    }

    #[test]
    fn test_selection_missing_key_is_empty() {
        let selection = ItemSelection::from_request_body(&json!({})).unwrap();
        assert!(selection.is_empty());
    }

    #[test]
    fn test_selection_rejects_non_list() {
        let result = ItemSelection::from_request_body(&json!({ "movie_ids": "1,7,42" }));
        assert!(matches!(result, Err(AppError::InvalidInput(_))));

        let result = ItemSelection::from_request_body(&json!({ "movie_ids": null }));
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_selection_rejects_non_integer_ids() {
        let result = ItemSelection::from_request_body(&json!({ "movie_ids": [1, "7"] }));
        assert!(matches!(result, Err(AppError::InvalidInput(_))));

        let result = ItemSelection::from_request_body(&json!({ "movie_ids": [1.5] }));
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_selection_rejects_non_object_body() {
        let result = ItemSelection::from_request_body(&json!([1, 2]));
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_candidate_wire_names() {
        let candidate = Candidate {
            title: "The Matrix".to_string(),
            movie_id: Some(2571),
            tmdb_id: Some(603),
            score: Some(0.93),
        };

        let json = serde_json::to_value(&candidate).unwrap();
        assert_eq!(
            json,
            json!({ "title": "The Matrix", "movieId": 2571, "tmdbId": 603, "rating": 0.93 })
        );
    }

    #[test]
    fn test_response_splits_posters_by_position() {
        let enriched = vec![
            EnrichedCandidate {
                candidate: Candidate::title_only("A"),
                poster_url: "https://img/a.jpg".to_string(),
            },
            EnrichedCandidate {
                candidate: Candidate::title_only("B"),
                poster_url: "https://img/b.jpg".to_string(),
            },
        ];

        let response = RecommendResponse::from(enriched);
        assert_eq!(response.recommended_movies[0].title, "A");
        assert_eq!(response.recommended_movies[1].title, "B");
        assert_eq!(response.posters, vec!["https://img/a.jpg", "https://img/b.jpg"]);
    }
}
