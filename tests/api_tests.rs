use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use movie_reco_api::{
    error::{AppError, AppResult, QueryExecutionError},
    routes::{create_router, AppState},
    services::{
        providers::TmdbProvider,
        selection::CatalogSchema,
        warehouse::{BoundQuery, QueryParam, RowStream},
        AnalyticalEngine, Enricher, RecommendationPipeline, SearchIndex,
    },
};

const IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";
const PLACEHOLDER: &str = "https://via.placeholder.com/300x450.png?text=Aucune+affiche";

/// Warehouse stand-in returning canned rows and recording queries
struct FakeWarehouse {
    rows: Vec<Value>,
    fail: bool,
    executed: Mutex<Vec<BoundQuery>>,
}

impl AnalyticalEngine for FakeWarehouse {
    fn execute<'a>(&'a self, query: &'a BoundQuery) -> RowStream<'a> {
        self.executed.lock().unwrap().push(query.clone());
        if self.fail {
            return futures::stream::once(async {
                Err(QueryExecutionError::RowDecode("connection reset".to_string()))
            })
            .boxed();
        }
        futures::stream::iter(self.rows.clone().into_iter().map(Ok)).boxed()
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Search index stand-in matching titles by prefix
struct FakeIndex {
    titles: Vec<&'static str>,
    fail: bool,
}

#[async_trait::async_trait]
impl SearchIndex for FakeIndex {
    async fn match_phrase_prefix(
        &self,
        _field: &str,
        query: &str,
        limit: usize,
    ) -> AppResult<Vec<String>> {
        if self.fail {
            return Err(AppError::SearchIndex("index unavailable".to_string()));
        }
        let query = query.to_lowercase();
        Ok(self
            .titles
            .iter()
            .filter(|t| t.to_lowercase().starts_with(&query))
            .take(limit)
            .map(|t| t.to_string())
            .collect())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

struct TestApp {
    server: TestServer,
    warehouse: Arc<FakeWarehouse>,
}

fn create_test_app(rows: Vec<Value>, fail: bool, tmdb_url: &str, index: FakeIndex) -> TestApp {
    let warehouse = Arc::new(FakeWarehouse {
        rows,
        fail,
        executed: Mutex::new(Vec::new()),
    });

    let provider = TmdbProvider::new(
        "test_key".to_string(),
        tmdb_url.to_string(),
        Duration::from_secs(5),
    );

    let state = Arc::new(AppState {
        pipeline: RecommendationPipeline::new(warehouse.clone(), CatalogSchema::default()),
        enricher: Enricher::new(
            Arc::new(provider),
            IMAGE_BASE.to_string(),
            PLACEHOLDER.to_string(),
            4,
        ),
        search_index: Arc::new(index),
        suggestion_limit: 10,
    });

    TestApp {
        server: TestServer::new(create_router(state)).unwrap(),
        warehouse,
    }
}

fn empty_index() -> FakeIndex {
    FakeIndex {
        titles: vec![],
        fail: false,
    }
}

async fn mount_poster(server: &MockServer, tmdb_id: i64, poster: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/movie/{}", tmdb_id)))
        .and(query_param("api_key", "test_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": tmdb_id,
            "poster_path": poster
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app(vec![], false, "http://127.0.0.1:1", empty_index());
    let response = app.server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_recommend_empty_selection_uses_popularity() {
    let tmdb = MockServer::start().await;
    mount_poster(&tmdb, 278, "/shawshank.jpg").await;

    let app = create_test_app(
        vec![json!({
            "movie_id": 318,
            "title": "Shawshank Redemption, The (1994)",
            "tmdb_id": 278,
            "avg_rating": 0.95,
            "vote_count": 300
        })],
        false,
        &tmdb.uri(),
        empty_index(),
    );

    let response = app.server.post("/recommend").json(&json!({ "movie_ids": [] })).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(
        body,
        json!({
            "recommended_movies": [{
                "title": "Shawshank Redemption, The (1994)",
                "movieId": 318,
                "tmdbId": 278,
                "rating": 0.95
            }],
            "posters": ["https://image.tmdb.org/t/p/w500/shawshank.jpg"]
        })
    );

    let executed = app.warehouse.executed.lock().unwrap();
    assert_eq!(executed.len(), 1);
    assert!(!executed[0].sql.contains("predict"));
}

#[tokio::test]
async fn test_recommend_binds_selection_and_isolates_poster_failures() {
    let tmdb = MockServer::start().await;
    mount_poster(&tmdb, 862, "/abc.jpg").await;
    Mock::given(method("GET"))
        .and(path("/movie/603"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&tmdb)
        .await;

    let app = create_test_app(
        vec![
            json!({ "movie_id": 2571, "title": "Matrix, The (1999)", "tmdb_id": 603, "avg_rating": 0.9 }),
            json!({ "movie_id": 1, "title": "Toy Story (1995)", "tmdb_id": 862, "avg_rating": 0.85 }),
            json!({ "movie_id": 5, "title": "Unlinked", "tmdb_id": null, "avg_rating": 0.8 }),
        ],
        false,
        &tmdb.uri(),
        empty_index(),
    );

    let response = app
        .server
        .post("/recommend")
        .json(&json!({ "movie_ids": [1, 7, 42] }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    let movies = body["recommended_movies"].as_array().unwrap();
    let posters = body["posters"].as_array().unwrap();

    assert_eq!(movies.len(), 3);
    assert_eq!(posters.len(), 3);
    assert_eq!(movies[0]["title"], "Matrix, The (1999)");
    assert_eq!(posters[0], PLACEHOLDER);
    assert_eq!(movies[1]["title"], "Toy Story (1995)");
    assert_eq!(posters[1], "https://image.tmdb.org/t/p/w500/abc.jpg");
    assert_eq!(posters[2], PLACEHOLDER);

    let executed = app.warehouse.executed.lock().unwrap();
    assert_eq!(executed[0].params[0], QueryParam::IdArray(vec![1, 7, 42]));
}

#[tokio::test]
async fn test_recommend_no_results_is_not_an_error() {
    let app = create_test_app(vec![], false, "http://127.0.0.1:1", empty_index());

    let response = app.server.post("/recommend").json(&json!({})).await;
    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>(),
        json!({ "recommended_movies": [], "posters": [] })
    );
}

#[tokio::test]
async fn test_recommend_rejects_non_list_selection() {
    let app = create_test_app(vec![], false, "http://127.0.0.1:1", empty_index());

    let response = app
        .server
        .post("/recommend")
        .json(&json!({ "movie_ids": "1,7,42" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["status"], 400);
    assert!(app.warehouse.executed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_recommend_rejects_non_json_body() {
    let app = create_test_app(vec![], false, "http://127.0.0.1:1", empty_index());

    let response = app.server.post("/recommend").text("movie_ids=1").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(app.warehouse.executed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_recommend_query_failure_is_server_error() {
    let app = create_test_app(vec![], true, "http://127.0.0.1:1", empty_index());

    let response = app
        .server
        .post("/recommend")
        .json(&json!({ "movie_ids": [1] }))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["status"], 500);
    assert!(body.get("recommended_movies").is_none());
    // The underlying cause is not leaked to the client
    assert!(!body["error"].as_str().unwrap().contains("connection reset"));
}

#[tokio::test]
async fn test_recommend_echoes_request_id() {
    let app = create_test_app(vec![], false, "http://127.0.0.1:1", empty_index());
    let request_id = "5f0c6f5e-3b4a-4c3e-9a57-2a9d4a0d2f11";

    let response = app
        .server
        .post("/recommend")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static(request_id),
        )
        .json(&json!({ "movie_ids": [] }))
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("x-request-id"), request_id);
}

#[tokio::test]
async fn test_autocomplete_prefix() {
    let index = FakeIndex {
        titles: vec!["Matrix, The (1999)", "Mask, The (1994)", "Heat (1995)"],
        fail: false,
    };
    let app = create_test_app(vec![], false, "http://127.0.0.1:1", index);

    let response = app
        .server
        .get("/autocomplete")
        .add_query_param("query", "Ma")
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.json::<Vec<String>>(),
        vec!["Matrix, The (1999)", "Mask, The (1994)"]
    );
}

#[tokio::test]
async fn test_autocomplete_blank_query() {
    let index = FakeIndex {
        titles: vec!["Heat (1995)"],
        fail: false,
    };
    let app = create_test_app(vec![], false, "http://127.0.0.1:1", index);

    let response = app.server.get("/autocomplete").await;
    response.assert_status_ok();
    assert!(response.json::<Vec<String>>().is_empty());

    let response = app
        .server
        .get("/autocomplete")
        .add_query_param("query", "   ")
        .await;
    assert!(response.json::<Vec<String>>().is_empty());
}

#[tokio::test]
async fn test_autocomplete_index_failure_is_empty() {
    let index = FakeIndex {
        titles: vec![],
        fail: true,
    };
    let app = create_test_app(vec![], false, "http://127.0.0.1:1", index);

    let response = app
        .server
        .get("/autocomplete")
        .add_query_param("query", "heat")
        .await;

    response.assert_status_ok();
    assert!(response.json::<Vec<String>>().is_empty());
}
