use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::{
    error::{AppError, Result},
    middleware::auth::AuthUser,
    services::{
        catalog::GenreMovie,
        engagement::Engagement,
        films::FilmView,
    },
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(all_films))
        .route("/popular", get(popular_films))
        .route("/top-rated", get(top_rated_films))
        .route("/country/:country", get(country_films))
        .route("/genre/:id", get(movies_by_genre))
        .route("/:id", get(film_detail))
        .route("/like/:id", post(like_film))
        .route("/watch/:id", post(watch_film))
        .route("/watchlist/:id", post(add_to_watchlist))
}

/// Deprecated `/movies` mount, kept as an alias of the genre listing.
pub fn legacy_router() -> Router<AppState> {
    Router::new().route("/genre/:id", get(movies_by_genre))
}

#[derive(Debug, Serialize)]
pub struct FilmListResponse {
    pub films: Vec<FilmView>,
}

#[derive(Debug, Serialize)]
pub struct FilmResponse {
    pub film: FilmView,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

async fn ranked_films(state: &AppState, sql: &str) -> Result<Vec<FilmView>> {
    let ids = sqlx::query_scalar::<_, String>(sql)
        .fetch_all(&state.db.pool)
        .await?;
    state.films.format_films(&ids).await
}

async fn all_films(State(state): State<AppState>) -> Result<Json<FilmListResponse>> {
    let films = ranked_films(
        &state,
        "SELECT id FROM films ORDER BY vote_count DESC, rating DESC, created_at DESC LIMIT 100",
    )
    .await
    .map_err(|e| e.masked("Failed to load films"))?;

    Ok(Json(FilmListResponse { films }))
}

async fn popular_films(State(state): State<AppState>) -> Result<Json<FilmListResponse>> {
    let films = ranked_films(
        &state,
        "SELECT id FROM films WHERE vote_count > 0 ORDER BY vote_count DESC, rating DESC LIMIT 50",
    )
    .await
    .map_err(|e| e.masked("Failed to load popular films"))?;

    Ok(Json(FilmListResponse { films }))
}

async fn top_rated_films(State(state): State<AppState>) -> Result<Json<FilmListResponse>> {
    let films = ranked_films(
        &state,
        r#"
        SELECT id FROM films
        WHERE rating IS NOT NULL AND vote_count >= 100
        ORDER BY rating DESC, vote_count DESC
        LIMIT 50
        "#,
    )
    .await
    .map_err(|e| e.masked("Failed to load top rated films"))?;

    Ok(Json(FilmListResponse { films }))
}

/// Stores the first catalog discover page for a country and aggregates it
/// in catalog order.
async fn store_country_films(state: &AppState, country: &str) -> Result<Vec<FilmView>> {
    let tmdb_ids = state.catalog.country_ids(country).await?;
    for tmdb_id in &tmdb_ids {
        state.catalog.fetch_and_store(*tmdb_id).await?;
    }

    let ids: Vec<String> = tmdb_ids.iter().map(i64::to_string).collect();
    state.films.format_films(&ids).await
}

async fn country_films(
    State(state): State<AppState>,
    Path(country): Path<String>,
) -> Result<Json<FilmListResponse>> {
    let films = store_country_films(&state, &country)
        .await
        .map_err(|e| e.masked("Failed to load country films"))?;

    Ok(Json(FilmListResponse { films }))
}

async fn movies_by_genre(
    State(state): State<AppState>,
    Path(genre_id): Path<String>,
) -> Result<Json<Vec<GenreMovie>>> {
    let movies = state
        .catalog
        .movies_by_genre(&genre_id)
        .await
        .map_err(|e| e.masked("Failed to load movies"))?;

    Ok(Json(movies))
}

async fn film_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FilmResponse>> {
    let mask = |e: AppError| e.masked("Failed to load film detail");

    if let Some(film) = state.films.format_film(&id).await.map_err(mask)? {
        return Ok(Json(FilmResponse { film }));
    }

    // Not stored yet: pull it from the catalog once and retry
    if let Ok(tmdb_id) = id.parse::<i64>() {
        match state.catalog.fetch_and_store(tmdb_id).await {
            Ok(_) => {
                if let Some(film) = state.films.format_film(&id).await.map_err(mask)? {
                    return Ok(Json(FilmResponse { film }));
                }
            }
            Err(e) => tracing::warn!("catalog lookup for film {id} failed: {e}"),
        }
    }

    Err(AppError::NotFound("Film not found".to_string()))
}

async fn toggle(
    state: &AppState,
    kind: Engagement,
    film_id: &str,
    user: Option<AuthUser>,
    failure: &str,
) -> Result<Json<MessageResponse>> {
    let toggle = state
        .engagement
        .toggle(kind, film_id, user.as_ref().map(|u| u.id.as_str()))
        .await
        .map_err(|e| e.masked(failure))?;

    Ok(Json(MessageResponse {
        message: kind.message(toggle).to_string(),
    }))
}

async fn like_film(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    toggle(&state, Engagement::Like, &id, user, "Failed to like film").await
}

async fn watch_film(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    toggle(&state, Engagement::Watched, &id, user, "Failed to mark film as watched").await
}

async fn add_to_watchlist(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    toggle(&state, Engagement::Watchlist, &id, user, "Failed to add to watchlist").await
}
