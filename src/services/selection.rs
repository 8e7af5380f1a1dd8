/// Candidate selection: decides between popularity and similarity ranking
/// and builds the matching warehouse query.
///
/// Caller-supplied movie ids only ever travel as a bound `bigint[]`
/// parameter. The catalog identifiers spliced into the SQL text come from
/// validated configuration.
use crate::{
    config::Config,
    models::ItemSelection,
    services::warehouse::{BoundQuery, QueryParam},
};

/// Number of recommendations either mode returns at most
pub const RECOMMENDATION_LIMIT: i64 = 10;
/// Minimum number of ratings for a movie to count as popular
pub const MIN_VOTE_COUNT: i64 = 10;
/// Minimum (normalized) rating for popularity and for user similarity
pub const MIN_RATING: f64 = 0.8;
/// Number of similar users whose predicted ratings are averaged
pub const SIMILAR_USER_LIMIT: i64 = 10;

/// Warehouse tables and the rating model used by the generated queries
///
/// Expected columns: `ratings(user_id, movie_id, rating)`,
/// `movies(movie_id, title)`, `links(movie_id, tmdb_id)`.
#[derive(Debug, Clone)]
pub struct CatalogSchema {
    pub ratings_table: String,
    pub movies_table: String,
    pub links_table: String,
    pub prediction_function: String,
    pub prediction_model: String,
}

impl CatalogSchema {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ratings_table: config.ratings_table.clone(),
            movies_table: config.movies_table.clone(),
            links_table: config.links_table.clone(),
            prediction_function: config.prediction_function.clone(),
            prediction_model: config.prediction_model.clone(),
        }
    }
}

impl Default for CatalogSchema {
    fn default() -> Self {
        Self {
            ratings_table: "ratings".to_string(),
            movies_table: "movies".to_string(),
            links_table: "links".to_string(),
            prediction_function: "pgml.predict".to_string(),
            prediction_model: "reco_model".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// No prior selection: best-rated movies with enough votes
    Popularity,
    /// Rank unseen movies by the model's predictions for similar users
    Similarity,
}

impl std::fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionMode::Popularity => write!(f, "popularity"),
            SelectionMode::Similarity => write!(f, "similarity"),
        }
    }
}

/// The query chosen for one selection
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub mode: SelectionMode,
    pub query: BoundQuery,
}

/// Picks the mode for `selection` and builds its query
pub fn plan(selection: &ItemSelection, schema: &CatalogSchema) -> QueryPlan {
    if selection.is_empty() {
        QueryPlan {
            mode: SelectionMode::Popularity,
            query: popularity_query(schema),
        }
    } else {
        QueryPlan {
            mode: SelectionMode::Similarity,
            query: similarity_query(selection, schema),
        }
    }
}

/// Top-rated movies among those with enough votes.
///
/// Ties on the mean rating are broken by ascending `movie_id` so the order is
/// stable for a given warehouse snapshot.
fn popularity_query(schema: &CatalogSchema) -> BoundQuery {
    let sql = format!(
        r#"
        SELECT
            m.movie_id,
            m.title,
            l.tmdb_id,
            AVG(r.rating)::float8 AS avg_rating,
            COUNT(r.user_id) AS vote_count
        FROM {ratings} r
        JOIN {movies} m ON r.movie_id = m.movie_id
        JOIN {links} l ON m.movie_id = l.movie_id
        WHERE l.tmdb_id IS NOT NULL
        GROUP BY m.movie_id, m.title, l.tmdb_id
        HAVING COUNT(r.user_id) >= $1 AND AVG(r.rating) >= $2
        ORDER BY avg_rating DESC, m.movie_id ASC
        LIMIT $3
        "#,
        ratings = schema.ratings_table,
        movies = schema.movies_table,
        links = schema.links_table,
    );

    BoundQuery::new(
        sql,
        vec![
            QueryParam::Int(MIN_VOTE_COUNT),
            QueryParam::Float(MIN_RATING),
            QueryParam::Int(RECOMMENDATION_LIMIT),
        ],
    )
}

/// Movies the selection's similar users are predicted to rate highest.
///
/// Similar users rated at least one selected movie at or above `MIN_RATING`,
/// ranked by how many such ratings they gave. The model scores every
/// (similar user, unseen movie) pair; scores are averaged per movie. Movies
/// without a TMDB id are dropped after ranking, so fewer than
/// `RECOMMENDATION_LIMIT` rows may come back.
fn similarity_query(selection: &ItemSelection, schema: &CatalogSchema) -> BoundQuery {
    let sql = format!(
        r#"
        WITH similar_users AS (
            SELECT r.user_id
            FROM {ratings} r
            WHERE r.movie_id = ANY($1) AND r.rating >= $2
            GROUP BY r.user_id
            ORDER BY COUNT(*) DESC, r.user_id ASC
            LIMIT $3
        ),
        candidate_movies AS (
            SELECT DISTINCT r.movie_id
            FROM {ratings} r
            WHERE NOT (r.movie_id = ANY($1))
        ),
        predictions AS (
            SELECT
                su.user_id,
                cm.movie_id,
                {predict}($4, ARRAY[su.user_id, cm.movie_id]::float8[])::float8 AS predicted_rating
            FROM similar_users su
            CROSS JOIN candidate_movies cm
        ),
        aggregated AS (
            SELECT movie_id, AVG(predicted_rating) AS avg_rating
            FROM predictions
            GROUP BY movie_id
            ORDER BY avg_rating DESC, movie_id ASC
            LIMIT $5
        )
        SELECT m.movie_id, m.title, l.tmdb_id, a.avg_rating
        FROM aggregated a
        JOIN {movies} m ON a.movie_id = m.movie_id
        JOIN {links} l ON m.movie_id = l.movie_id
        WHERE l.tmdb_id IS NOT NULL
        ORDER BY a.avg_rating DESC, m.movie_id ASC
        "#,
        ratings = schema.ratings_table,
        movies = schema.movies_table,
        links = schema.links_table,
        predict = schema.prediction_function,
    );

    BoundQuery::new(
        sql,
        vec![
            QueryParam::IdArray(selection.ids().to_vec()),
            QueryParam::Float(MIN_RATING),
            QueryParam::Int(SIMILAR_USER_LIMIT),
            QueryParam::Text(schema.prediction_model.clone()),
            QueryParam::Int(RECOMMENDATION_LIMIT),
        ],
    )
}
