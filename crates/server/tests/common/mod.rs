#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, Request, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use filmlog_server::{app, config::Config, db::Database, AppState};

/// Stand-in for the TMDB API, counting movie detail requests.
#[derive(Clone, Default)]
pub struct StubCatalog {
    pub movie_calls: Arc<AtomicUsize>,
}

impl StubCatalog {
    pub fn movie_calls(&self) -> usize {
        self.movie_calls.load(Ordering::SeqCst)
    }
}

async fn stub_movie(
    State(stub): State<StubCatalog>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, StatusCode> {
    stub.movie_calls.fetch_add(1, Ordering::SeqCst);
    if id == 404 {
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(Json(json!({
        "id": id,
        "title": format!("Movie {id}"),
        "original_title": format!("Original {id}"),
        "overview": "A stub movie.",
        "poster_path": "/poster.jpg",
        "backdrop_path": null,
        "release_date": "2010-07-15",
        "runtime": 120,
        "vote_average": 7.5,
        "vote_count": 1000,
        "genres": [{"id": 18, "name": "Drama"}],
        "production_countries": [{"iso_3166_1": "FR", "name": "France"}]
    })))
}

async fn stub_discover(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let page: i64 = params
        .get("page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(1);

    if params.contains_key("with_origin_country") {
        return Json(json!({
            "page": page,
            "results": [
                {"id": 101, "title": "Movie 101"},
                {"id": 102, "title": "Movie 102"}
            ]
        }));
    }

    let genre = params.get("with_genres").cloned().unwrap_or_default();
    Json(json!({
        "page": page,
        "results": [{
            "id": page,
            "title": format!("Genre {genre} page {page}"),
            "overview": "Listed by genre.",
            "vote_average": 6.0,
            "poster_path": format!("/{page}.jpg")
        }]
    }))
}

async fn spawn_catalog(stub: StubCatalog) -> String {
    let router = Router::new()
        .route("/movie/:id", get(stub_movie))
        .route("/discover/movie", get(stub_discover))
        .with_state(stub);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{addr}")
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub db: Database,
    pub stub: StubCatalog,
}

pub async fn test_app() -> TestApp {
    let stub = StubCatalog::default();
    let base_url = spawn_catalog(stub.clone()).await;

    let db = Database::in_memory().await.unwrap();
    let config = Config {
        port: 0,
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test-secret".to_string(),
        token_ttl_hours: 1,
        tmdb_api_key: "test-key".to_string(),
        tmdb_base_url: base_url,
        tmdb_image_base_url: "https://img.test/w500".to_string(),
    };

    let state = AppState::new(db.clone(), config);
    TestApp {
        router: app(state.clone()),
        state,
        db,
        stub,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).unwrap()).await
    }

    /// Sends `raw` as a JSON-typed body without checking that it parses.
    pub async fn request_raw(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        raw: &str,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        self.send(builder.body(Body::from(raw.to_string())).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request("GET", uri, None, None).await
    }

    /// Registers a user and returns `(id, token)`.
    pub async fn register(&self, username: &str) -> (String, String) {
        let (status, body) = self
            .request(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "password123",
                    "country": "Turkey"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

        (
            body["user"]["id"].as_str().unwrap().to_string(),
            body["token"].as_str().unwrap().to_string(),
        )
    }

    pub async fn insert_film(&self, id: &str, title: &str, rating: Option<f64>, vote_count: i64) {
        sqlx::query(
            "INSERT INTO films (id, title, rating, vote_count, created_at, updated_at) \
             VALUES (?, ?, ?, ?, '2024-01-01T00:00:00.000000Z', '2024-01-01T00:00:00.000000Z')",
        )
        .bind(id)
        .bind(title)
        .bind(rating)
        .bind(vote_count)
        .execute(&self.db.pool)
        .await
        .unwrap();
    }

    /// Drops a table so the next query touching it fails.
    pub async fn drop_table(&self, table: &str) {
        sqlx::query(&format!("DROP TABLE {table}"))
            .execute(&self.db.pool)
            .await
            .unwrap();
    }

    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.db.pool)
            .await
            .unwrap()
    }
}
