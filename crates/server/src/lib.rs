use axum::{middleware as axum_middleware, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;

use services::{
    catalog::{Catalog, TmdbClient},
    comments::CommentService,
    engagement::EngagementService,
    films::FilmAggregator,
};

#[derive(Clone)]
pub struct AppState {
    pub db: db::Database,
    pub config: config::Config,
    pub films: FilmAggregator,
    pub comments: CommentService,
    pub engagement: EngagementService,
    pub catalog: Catalog,
}

impl AppState {
    pub fn new(db: db::Database, config: config::Config) -> Self {
        let tmdb = TmdbClient::new(&config);
        Self {
            films: FilmAggregator::new(db.clone()),
            comments: CommentService::new(db.clone()),
            engagement: EngagementService::new(db.clone()),
            catalog: Catalog::new(tmdb, db.clone()),
            db,
            config,
        }
    }
}

pub fn app(state: AppState) -> Router {
    let api_router = Router::new()
        .nest("/auth", routes::auth::router())
        .nest("/films/comments", routes::comments::film_router())
        .nest("/films", routes::films::router())
        .nest("/movies", routes::films::legacy_router())
        .nest("/lists/comments", routes::comments::list_router())
        .nest("/lists", routes::lists::router())
        .nest("/users", routes::users::router())
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::identify,
        ));

    Router::new()
        .route("/", get(|| async { "Hello, Movie API!" }))
        .route("/health", get(health_check))
        .nest("/api", api_router)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn health_check() -> &'static str {
    "OK"
}
